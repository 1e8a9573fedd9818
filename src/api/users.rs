//! User management endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{error::AppResult, models::user::UserOverview};

use super::{auth::UserInfo, AuthenticatedUser};

/// Circulation aggregates for one user
#[derive(Serialize, ToSchema)]
pub struct UserAccountStats {
    /// Records currently in state `borrowed`
    pub active_borrows: i64,
    /// Sum of positive fines across all records, returned ones included
    pub outstanding_fines: Decimal,
}

/// All member accounts with circulation aggregates
#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Member accounts", body = Vec<UserOverview>),
        (status = 403, description = "Admin only")
    )
)]
pub async fn list_users(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<UserOverview>>> {
    claims.require_admin()?;

    let users = state.services.accounts.list_users().await?;
    Ok(Json(users))
}

/// Get a user by id
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User", body = UserInfo),
        (status = 403, description = "Admin only"),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(user_id): Path<i32>,
) -> AppResult<Json<UserInfo>> {
    claims.require_admin()?;

    let user = state.services.accounts.get_user(user_id).await?;
    Ok(Json(user.into()))
}

/// Circulation aggregates for a user
#[utoipa::path(
    get,
    path = "/users/{id}/stats",
    tag = "users",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User circulation aggregates", body = UserAccountStats),
        (status = 403, description = "Admin only"),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user_stats(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(user_id): Path<i32>,
) -> AppResult<Json<UserAccountStats>> {
    claims.require_admin()?;

    let user = state.services.accounts.get_user(user_id).await?;
    let active_borrows = state.services.accounts.active_borrow_count(user.id).await?;
    let outstanding_fines = state.services.accounts.total_outstanding_fines(user.id).await?;

    Ok(Json(UserAccountStats {
        active_borrows,
        outstanding_fines,
    }))
}

/// Delete a user and every record it owns
#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 204, description = "User deleted"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "User not found")
    )
)]
pub async fn delete_user(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(user_id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_admin()?;

    state.services.accounts.delete_user(user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
