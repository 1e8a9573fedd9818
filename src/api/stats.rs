//! Statistics endpoints

use axum::{extract::State, Json};
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::AppResult;

use super::AuthenticatedUser;

/// Library-wide statistics
#[derive(Serialize, ToSchema)]
pub struct LibraryStats {
    pub total_books: i64,
    /// Member accounts (admins excluded)
    pub total_users: i64,
    /// Records currently out, overdue ones included
    pub active_borrows: i64,
    pub overdue_books: i64,
}

/// Per-user dashboard aggregates
#[derive(Serialize, ToSchema)]
pub struct UserDashboard {
    pub active_borrows: i64,
    pub overdue_borrows: i64,
    pub books_returned: i64,
    /// Overdue past the lost-book threshold; a report classification, the
    /// records themselves stay `overdue`
    pub books_lost: i64,
    /// Fine accrued on this month's borrows, recomputed for display
    pub current_month_fine: Decimal,
}

/// Library statistics
#[utoipa::path(
    get,
    path = "/stats",
    tag = "stats",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Library statistics", body = LibraryStats),
        (status = 403, description = "Admin only")
    )
)]
pub async fn get_stats(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<LibraryStats>> {
    claims.require_admin()?;

    let stats = state.services.stats.library_stats().await?;
    Ok(Json(stats))
}

/// Dashboard aggregates for the authenticated user
#[utoipa::path(
    get,
    path = "/stats/dashboard",
    tag = "stats",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "User dashboard", body = UserDashboard)
    )
)]
pub async fn get_dashboard(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<UserDashboard>> {
    let dashboard = state.services.stats.user_dashboard(claims.user_id).await?;
    Ok(Json(dashboard))
}
