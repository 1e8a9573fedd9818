//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, books, health, records, stats, users};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Shelfmark API",
        version = "0.1.0",
        description = "Library Circulation Tracker REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::login,
        auth::signup,
        auth::me,
        // Books
        books::list_books,
        books::list_categories,
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        // Records
        records::borrow_book,
        records::return_book,
        records::list_records,
        records::my_records,
        records::user_records,
        // Users
        users::list_users,
        users::get_user,
        users::get_user_stats,
        users::delete_user,
        // Stats
        stats::get_stats,
        stats::get_dashboard,
    ),
    components(
        schemas(
            // Auth
            auth::LoginRequest,
            auth::LoginResponse,
            auth::UserInfo,
            crate::models::user::CreateUser,
            crate::models::user::UserOverview,
            users::UserAccountStats,
            // Books
            crate::models::book::Book,
            crate::models::book::BookDetails,
            crate::models::book::CreateBook,
            crate::models::book::UpdateBook,
            // Records
            crate::models::record::BorrowRecord,
            crate::models::record::BorrowStatus,
            crate::models::record::RecordDetails,
            records::BorrowResponse,
            records::ReturnResponse,
            // Stats
            stats::LibraryStats,
            stats::UserDashboard,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Service health"),
        (name = "auth", description = "Authentication"),
        (name = "books", description = "Catalog management"),
        (name = "records", description = "Borrow and return"),
        (name = "users", description = "User accounts"),
        (name = "stats", description = "Statistics")
    )
)]
pub struct ApiDoc;

/// Create the Swagger UI router
pub fn create_openapi_router() -> Router {
    Router::new().merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
