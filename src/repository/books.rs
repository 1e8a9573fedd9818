//! Books repository for database operations

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookQuery, CreateBook, UpdateBook},
};

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get book by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Check if ISBN already exists (optionally excluding one book id)
    pub async fn isbn_exists(&self, isbn: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = if let Some(id) = exclude_id {
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE isbn = $1 AND id != $2)")
                .bind(isbn)
                .bind(id)
                .fetch_one(&self.pool)
                .await?
        } else {
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE isbn = $1)")
                .bind(isbn)
                .fetch_one(&self.pool)
                .await?
        };
        Ok(exists)
    }

    /// Search books by title/author/ISBN substring and category
    pub async fn search(&self, query: &BookQuery) -> AppResult<Vec<Book>> {
        let pattern = query.q.as_ref().map(|q| format!("%{}%", q));

        let books = sqlx::query_as::<_, Book>(
            r#"
            SELECT * FROM books
            WHERE ($1::text IS NULL OR title ILIKE $1 OR author ILIKE $1 OR isbn ILIKE $1)
              AND ($2::text IS NULL OR category = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(pattern)
        .bind(query.category.as_deref())
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }

    /// Distinct non-empty categories for search filters
    pub async fn list_categories(&self) -> AppResult<Vec<String>> {
        let categories = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT category FROM books WHERE category IS NOT NULL ORDER BY category",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    /// Create a new book; all copies start available
    pub async fn create(&self, book: &CreateBook) -> AppResult<Book> {
        let total = book.total_copies.unwrap_or(1);

        let created = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (title, author, isbn, publisher, publication_year,
                               category, description, total_copies, available_copies)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            RETURNING *
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .bind(&book.publisher)
        .bind(book.publication_year)
        .bind(&book.category)
        .bind(&book.description)
        .bind(total)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    /// Update a book. When the total copy count changes, availability is
    /// reconciled against the copies currently out, under a row lock so a
    /// concurrent borrow cannot interleave.
    pub async fn update(&self, id: i32, update: &UpdateBook) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;

        let mut book = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;

        if let Some(new_total) = update.total_copies {
            book.reconcile_copies(new_total);
        }

        let updated = sqlx::query_as::<_, Book>(
            r#"
            UPDATE books
            SET title = $1, author = $2, isbn = $3, publisher = $4,
                publication_year = $5, category = $6, description = $7,
                total_copies = $8, available_copies = $9
            WHERE id = $10
            RETURNING *
            "#,
        )
        .bind(&update.title)
        .bind(&update.author)
        .bind(&update.isbn)
        .bind(&update.publisher)
        .bind(update.publication_year)
        .bind(&update.category)
        .bind(&update.description)
        .bind(book.total_copies)
        .bind(book.available_copies)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(updated)
    }

    /// Delete a book. Refused while any referencing record is still out.
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let book = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;

        let active_loans: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM borrow_records WHERE book_id = $1 AND status IN ('borrowed', 'overdue')",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if active_loans > 0 {
            return Err(AppError::Conflict(format!(
                "Cannot delete \"{}\": {} active borrow(s)",
                book.title, active_loans
            )));
        }

        // Settled records go with the book
        sqlx::query("DELETE FROM borrow_records WHERE book_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(())
    }

    /// Count all books
    pub async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
