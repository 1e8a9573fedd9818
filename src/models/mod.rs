//! Data models for Shelfmark

pub mod book;
pub mod record;
pub mod user;

// Re-export commonly used types
pub use book::{Book, BookDetails};
pub use record::{BorrowRecord, BorrowStatus, RecordDetails};
pub use user::{User, UserClaims};
