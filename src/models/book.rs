//! Book model and inventory logic

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Book model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub publisher: Option<String>,
    pub publication_year: Option<i32>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub total_copies: i32,
    pub available_copies: i32,
    pub created_at: DateTime<Utc>,
}

impl Book {
    /// True iff at least one copy is on the shelf
    pub fn is_available(&self) -> bool {
        self.available_copies > 0
    }

    /// Number of copies currently out on loan
    pub fn borrowed_copies(&self) -> i32 {
        self.total_copies - self.available_copies
    }

    /// Take one copy off the shelf. Returns false (and changes nothing) when no
    /// copy is available; callers validate availability first, but the operation
    /// stays safe on its own.
    pub fn borrow(&mut self) -> bool {
        if self.available_copies > 0 {
            self.available_copies -= 1;
            true
        } else {
            false
        }
    }

    /// Put one copy back on the shelf. Refuses to go past total_copies, which
    /// absorbs duplicate return events.
    pub fn return_copy(&mut self) -> bool {
        if self.available_copies < self.total_copies {
            self.available_copies += 1;
            true
        } else {
            false
        }
    }

    /// Change the total copy count, keeping availability consistent with the
    /// copies currently out: new_available = max(0, new_total - borrowed).
    pub fn reconcile_copies(&mut self, new_total: i32) {
        let borrowed = self.borrowed_copies();
        self.total_copies = new_total;
        self.available_copies = (new_total - borrowed).max(0);
    }
}

/// Book projection for API responses: plain data only, field set per the
/// presentation contract.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BookDetails {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub publisher: Option<String>,
    pub publication_year: Option<i32>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub total_copies: i32,
    pub available_copies: i32,
    pub is_available: bool,
}

impl From<Book> for BookDetails {
    fn from(book: Book) -> Self {
        let is_available = book.is_available();
        BookDetails {
            id: book.id,
            title: book.title,
            author: book.author,
            isbn: book.isbn,
            publisher: book.publisher,
            publication_year: book.publication_year,
            category: book.category,
            description: book.description,
            total_copies: book.total_copies,
            available_copies: book.available_copies,
            is_available,
        }
    }
}

/// Create book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Author is required"))]
    pub author: String,
    #[validate(length(min = 1, message = "ISBN is required"))]
    pub isbn: String,
    pub publisher: Option<String>,
    pub publication_year: Option<i32>,
    pub category: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 0, message = "Copy count cannot be negative"))]
    pub total_copies: Option<i32>,
}

/// Update book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Author is required"))]
    pub author: String,
    #[validate(length(min = 1, message = "ISBN is required"))]
    pub isbn: String,
    pub publisher: Option<String>,
    pub publication_year: Option<i32>,
    pub category: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 0, message = "Copy count cannot be negative"))]
    pub total_copies: Option<i32>,
}

/// Book search parameters
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct BookQuery {
    /// Substring match over title, author or ISBN
    pub q: Option<String>,
    pub category: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(total: i32, available: i32) -> Book {
        Book {
            id: 1,
            title: "The Rust Programming Language".to_string(),
            author: "Steve Klabnik".to_string(),
            isbn: "9781593278281".to_string(),
            publisher: None,
            publication_year: Some(2019),
            category: Some("Programming".to_string()),
            description: None,
            total_copies: total,
            available_copies: available,
            created_at: Utc::now(),
        }
    }

    fn assert_bounds(b: &Book) {
        assert!(b.available_copies >= 0);
        assert!(b.available_copies <= b.total_copies);
    }

    #[test]
    fn borrow_decrements_until_exhausted() {
        let mut b = book(2, 2);
        assert!(b.borrow());
        assert!(b.borrow());
        assert!(!b.is_available());
        // defensive call on an exhausted book changes nothing
        assert!(!b.borrow());
        assert_eq!(b.available_copies, 0);
        assert_bounds(&b);
    }

    #[test]
    fn return_copy_refuses_over_return() {
        let mut b = book(1, 1);
        assert!(!b.return_copy());
        assert_eq!(b.available_copies, 1);

        assert!(b.borrow());
        assert!(b.return_copy());
        // duplicate return event
        assert!(!b.return_copy());
        assert_eq!(b.available_copies, 1);
        assert_bounds(&b);
    }

    #[test]
    fn borrow_then_return_round_trips() {
        let mut b = book(5, 3);
        assert!(b.borrow());
        assert!(b.return_copy());
        assert_eq!(b.available_copies, 3);
        assert_bounds(&b);
    }

    #[test]
    fn shrinking_total_below_borrowed_floors_available_at_zero() {
        let mut b = book(5, 1); // 4 borrowed
        b.reconcile_copies(2);
        assert_eq!(b.total_copies, 2);
        assert_eq!(b.available_copies, 0);
        assert_bounds(&b);
    }

    #[test]
    fn growing_total_adds_available_copies() {
        let mut b = book(3, 1); // 2 borrowed
        b.reconcile_copies(6);
        assert_eq!(b.available_copies, 4);
        assert_bounds(&b);
    }

    #[test]
    fn invariant_holds_under_mixed_operation_sequences() {
        let mut b = book(3, 3);
        b.borrow();
        b.borrow();
        b.reconcile_copies(1);
        assert_bounds(&b);
        b.return_copy();
        b.return_copy();
        b.return_copy();
        assert_bounds(&b);
        b.reconcile_copies(4);
        assert_bounds(&b);
        assert_eq!(b.borrowed_copies(), 0);
    }
}
