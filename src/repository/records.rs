//! Borrow records repository.
//!
//! Borrow and return touch a record and the book's copy counts together, so both
//! run inside a transaction with the book row locked: two simultaneous borrow
//! attempts on the last copy serialize on the lock and the second one sees an
//! exhausted book.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Pool, Postgres, Row};

use crate::{
    error::{AppError, AppResult},
    models::{
        book::Book,
        record::{BorrowRecord, BorrowStatus, RecordDetails},
    },
};

#[derive(Clone)]
pub struct RecordsRepository {
    pool: Pool<Postgres>,
}

impl RecordsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get record by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<BorrowRecord> {
        sqlx::query_as::<_, BorrowRecord>("SELECT * FROM borrow_records WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Borrow record with id {} not found", id)))
    }

    /// Create a borrow record and take a copy off the shelf, atomically.
    pub async fn borrow(
        &self,
        user_id: i32,
        book_id: i32,
        now: DateTime<Utc>,
        due_date: DateTime<Utc>,
    ) -> AppResult<(BorrowRecord, Book)> {
        let mut tx = self.pool.begin().await?;

        let mut book = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1 FOR UPDATE")
            .bind(book_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book_id)))?;

        if !book.is_available() {
            return Err(AppError::Unavailable(format!(
                "\"{}\" is not available for borrowing",
                book.title
            )));
        }

        let already_borrowed: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM borrow_records WHERE user_id = $1 AND book_id = $2 AND status = 'borrowed')",
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_one(&mut *tx)
        .await?;

        if already_borrowed {
            return Err(AppError::DuplicateLoan(format!(
                "You have already borrowed \"{}\"",
                book.title
            )));
        }

        let record = sqlx::query_as::<_, BorrowRecord>(
            r#"
            INSERT INTO borrow_records (user_id, book_id, borrow_date, due_date, status, fine_amount)
            VALUES ($1, $2, $3, $4, 'borrowed', 0)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .bind(now)
        .bind(due_date)
        .fetch_one(&mut *tx)
        .await?;

        book.borrow();
        sqlx::query("UPDATE books SET available_copies = $1 WHERE id = $2")
            .bind(book.available_copies)
            .bind(book_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok((record, book))
    }

    /// Mark a record returned and put the copy back, atomically. The final fine
    /// is locked in from the stamped return date.
    pub async fn return_record(
        &self,
        record_id: i32,
        now: DateTime<Utc>,
        fine_per_day: Decimal,
    ) -> AppResult<BorrowRecord> {
        let mut tx = self.pool.begin().await?;

        let mut record = sqlx::query_as::<_, BorrowRecord>(
            "SELECT * FROM borrow_records WHERE id = $1 FOR UPDATE",
        )
        .bind(record_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Borrow record with id {} not found", record_id)))?;

        if record.status == BorrowStatus::Returned {
            return Err(AppError::AlreadyReturned(
                "This book has already been returned".to_string(),
            ));
        }

        record.mark_returned(now, fine_per_day);

        sqlx::query(
            "UPDATE borrow_records SET return_date = $1, status = $2, fine_amount = $3 WHERE id = $4",
        )
        .bind(record.return_date)
        .bind(record.status)
        .bind(record.fine_amount)
        .bind(record_id)
        .execute(&mut *tx)
        .await?;

        let mut book = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1 FOR UPDATE")
            .bind(record.book_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Book with id {} not found", record.book_id))
            })?;

        // return_copy refuses to go past total_copies, absorbing duplicate
        // return events
        book.return_copy();
        sqlx::query("UPDATE books SET available_copies = $1 WHERE id = $2")
            .bind(book.available_copies)
            .bind(book.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(record)
    }

    /// All records still out on loan
    pub async fn list_active(&self) -> AppResult<Vec<BorrowRecord>> {
        let records = sqlx::query_as::<_, BorrowRecord>(
            "SELECT * FROM borrow_records WHERE status IN ('borrowed', 'overdue')",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    /// Records still out on loan for one user
    pub async fn list_active_for_user(&self, user_id: i32) -> AppResult<Vec<BorrowRecord>> {
        let records = sqlx::query_as::<_, BorrowRecord>(
            "SELECT * FROM borrow_records WHERE user_id = $1 AND status IN ('borrowed', 'overdue')",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    /// Records borrowed by one user on or after the given instant
    pub async fn list_for_user_since(
        &self,
        user_id: i32,
        since: DateTime<Utc>,
    ) -> AppResult<Vec<BorrowRecord>> {
        let records = sqlx::query_as::<_, BorrowRecord>(
            "SELECT * FROM borrow_records WHERE user_id = $1 AND borrow_date >= $2",
        )
        .bind(user_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    /// Persist recomputed cache columns for a record
    pub async fn save_derived(&self, record: &BorrowRecord) -> AppResult<()> {
        sqlx::query("UPDATE borrow_records SET status = $1, fine_amount = $2 WHERE id = $3")
            .bind(record.status)
            .bind(record.fine_amount)
            .bind(record.id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// All records with book/borrower context, optionally filtered by status,
    /// newest borrow first
    pub async fn list_details(&self, status: Option<BorrowStatus>) -> AppResult<Vec<RecordDetails>> {
        let rows = sqlx::query(
            r#"
            SELECT r.id, r.book_id, b.title as book_title, b.isbn as book_isbn, u.username,
                   r.borrow_date, r.due_date, r.return_date, r.status, r.fine_amount
            FROM borrow_records r
            JOIN books b ON r.book_id = b.id
            JOIN users u ON r.user_id = u.id
            WHERE ($1::text IS NULL OR r.status = $1)
            ORDER BY r.borrow_date DESC
            "#,
        )
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Self::details_from_row).collect())
    }

    /// One user's records with book context, newest borrow first
    pub async fn list_details_for_user(&self, user_id: i32) -> AppResult<Vec<RecordDetails>> {
        let rows = sqlx::query(
            r#"
            SELECT r.id, r.book_id, b.title as book_title, b.isbn as book_isbn, u.username,
                   r.borrow_date, r.due_date, r.return_date, r.status, r.fine_amount
            FROM borrow_records r
            JOIN books b ON r.book_id = b.id
            JOIN users u ON r.user_id = u.id
            WHERE r.user_id = $1
            ORDER BY r.borrow_date DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Self::details_from_row).collect())
    }

    fn details_from_row(row: sqlx::postgres::PgRow) -> RecordDetails {
        RecordDetails {
            id: row.get("id"),
            book_id: row.get("book_id"),
            book_title: row.get("book_title"),
            book_isbn: row.get("book_isbn"),
            username: row.get("username"),
            borrow_date: row.get("borrow_date"),
            due_date: row.get("due_date"),
            return_date: row.get("return_date"),
            status: row.get("status"),
            fine_amount: row.get("fine_amount"),
        }
    }

    /// Count records in one status, optionally for one user
    pub async fn count_by_status(
        &self,
        status: BorrowStatus,
        user_id: Option<i32>,
    ) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM borrow_records WHERE status = $1 AND ($2::int IS NULL OR user_id = $2)",
        )
        .bind(status.as_str())
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Count all records still out on loan
    pub async fn count_active(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM borrow_records WHERE status IN ('borrowed', 'overdue')",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Count overdue records whose due date is older than the given cutoff,
    /// optionally for one user. Feeds the presumed-lost report only; no record
    /// state changes.
    pub async fn count_overdue_before(
        &self,
        cutoff: DateTime<Utc>,
        user_id: Option<i32>,
    ) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM borrow_records
            WHERE status = 'overdue' AND due_date < $1 AND ($2::int IS NULL OR user_id = $2)
            "#,
        )
        .bind(cutoff)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
