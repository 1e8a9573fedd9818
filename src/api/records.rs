//! Borrow/return endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::record::{RecordDetails, RecordQuery},
};

use super::AuthenticatedUser;

/// Borrow response with the fixed due date
#[derive(Serialize, ToSchema)]
pub struct BorrowResponse {
    /// Borrow record ID
    pub id: i32,
    /// Due date (ISO 8601 format)
    pub due_date: DateTime<Utc>,
    /// Status message
    pub message: String,
}

/// Return response with the finalized fine
#[derive(Serialize, ToSchema)]
pub struct ReturnResponse {
    /// Return status
    pub status: String,
    /// Fine locked in at return time
    pub fine_amount: Decimal,
    /// Status message
    pub message: String,
}

/// Borrow a book as the authenticated user
#[utoipa::path(
    post,
    path = "/books/{id}/borrow",
    tag = "records",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 201, description = "Book borrowed", body = BorrowResponse),
        (status = 404, description = "Book not found"),
        (status = 409, description = "No copies available or already borrowed by this user")
    )
)]
pub async fn borrow_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(book_id): Path<i32>,
) -> AppResult<(StatusCode, Json<BorrowResponse>)> {
    let (record, book) = state
        .services
        .circulation
        .borrow_book(claims.user_id, book_id)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(BorrowResponse {
            id: record.id,
            due_date: record.due_date,
            message: format!(
                "Successfully borrowed \"{}\". Due date: {}",
                book.title,
                record.due_date.format("%Y-%m-%d")
            ),
        }),
    ))
}

/// Mark a borrow record returned
#[utoipa::path(
    post,
    path = "/records/{id}/return",
    tag = "records",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Borrow record ID")
    ),
    responses(
        (status = 200, description = "Book returned", body = ReturnResponse),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Record not found"),
        (status = 409, description = "Already returned")
    )
)]
pub async fn return_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(record_id): Path<i32>,
) -> AppResult<Json<ReturnResponse>> {
    claims.require_admin()?;

    let record = state.services.circulation.return_book(record_id).await?;

    let message = if record.fine_amount > Decimal::ZERO {
        format!("Book returned successfully. Fine: {}", record.fine_amount)
    } else {
        "Book returned successfully".to_string()
    };

    Ok(Json(ReturnResponse {
        status: "returned".to_string(),
        fine_amount: record.fine_amount,
        message,
    }))
}

/// All borrow records, optionally filtered by status
#[utoipa::path(
    get,
    path = "/records",
    tag = "records",
    security(("bearer_auth" = [])),
    params(RecordQuery),
    responses(
        (status = 200, description = "Borrow records", body = Vec<RecordDetails>),
        (status = 403, description = "Admin only")
    )
)]
pub async fn list_records(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<RecordQuery>,
) -> AppResult<Json<Vec<RecordDetails>>> {
    claims.require_admin()?;

    let records = state.services.circulation.list_records(query.status).await?;
    Ok(Json(records))
}

/// The authenticated user's own borrow records
#[utoipa::path(
    get,
    path = "/records/mine",
    tag = "records",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Own borrow records", body = Vec<RecordDetails>)
    )
)]
pub async fn my_records(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<RecordDetails>>> {
    let records = state.services.circulation.user_records(claims.user_id).await?;
    Ok(Json(records))
}

/// Borrow records for a specific user
#[utoipa::path(
    get,
    path = "/users/{id}/records",
    tag = "records",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User's borrow records", body = Vec<RecordDetails>),
        (status = 403, description = "Admin only"),
        (status = 404, description = "User not found")
    )
)]
pub async fn user_records(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(user_id): Path<i32>,
) -> AppResult<Json<Vec<RecordDetails>>> {
    claims.require_admin()?;

    let records = state.services.circulation.user_records(user_id).await?;
    Ok(Json(records))
}
