//! Catalog service: book inventory CRUD

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookDetails, BookQuery, CreateBook, UpdateBook},
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Search the catalog
    pub async fn search_books(&self, query: &BookQuery) -> AppResult<Vec<BookDetails>> {
        let books = self.repository.books.search(query).await?;
        Ok(books.into_iter().map(BookDetails::from).collect())
    }

    /// Distinct categories for search filters
    pub async fn categories(&self) -> AppResult<Vec<String>> {
        self.repository.books.list_categories().await
    }

    /// Book details by id
    pub async fn get_book(&self, id: i32) -> AppResult<BookDetails> {
        let book = self.repository.books.get_by_id(id).await?;
        Ok(book.into())
    }

    /// Add a book to the catalog. ISBN must be unique.
    pub async fn create_book(&self, request: CreateBook) -> AppResult<Book> {
        request
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        if self.repository.books.isbn_exists(&request.isbn, None).await? {
            return Err(AppError::Validation(
                "A book with this ISBN already exists".to_string(),
            ));
        }

        let book = self.repository.books.create(&request).await?;
        tracing::info!(book_id = book.id, title = %book.title, "book added");
        Ok(book)
    }

    /// Edit a book. A changed total copy count is reconciled against the copies
    /// currently out on loan.
    pub async fn update_book(&self, id: i32, request: UpdateBook) -> AppResult<Book> {
        request
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        if self.repository.books.isbn_exists(&request.isbn, Some(id)).await? {
            return Err(AppError::Validation(
                "A book with this ISBN already exists".to_string(),
            ));
        }

        self.repository.books.update(id, &request).await
    }

    /// Remove a book. Refused with a conflict while copies are still out.
    pub async fn delete_book(&self, id: i32) -> AppResult<()> {
        self.repository.books.delete(id).await
    }
}
