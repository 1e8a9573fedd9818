//! User account service and circulation aggregates

use rust_decimal::Decimal;

use crate::{
    error::AppResult,
    models::user::{User, UserOverview},
    repository::Repository,
    services::circulation::CirculationService,
};

#[derive(Clone)]
pub struct AccountsService {
    repository: Repository,
    circulation: CirculationService,
}

impl AccountsService {
    pub fn new(repository: Repository, circulation: CirculationService) -> Self {
        Self { repository, circulation }
    }

    /// Get user by id
    pub async fn get_user(&self, id: i32) -> AppResult<User> {
        self.repository.users.get_by_id(id).await
    }

    /// All member accounts with their aggregates. Fines are derived values, so
    /// active records are refreshed before the sums are read.
    pub async fn list_users(&self) -> AppResult<Vec<UserOverview>> {
        self.circulation.refresh_all_active().await?;
        self.repository.users.list_with_stats().await
    }

    /// Count of the user's records currently in state `borrowed`
    pub async fn active_borrow_count(&self, user_id: i32) -> AppResult<i64> {
        self.repository.users.active_borrow_count(user_id).await
    }

    /// Sum of the user's positive fines, refreshed first. Returned records keep
    /// their historical fine and are included.
    pub async fn total_outstanding_fines(&self, user_id: i32) -> AppResult<Decimal> {
        self.circulation.refresh_active_for_user(user_id).await?;
        self.repository.users.total_outstanding_fines(user_id).await
    }

    /// Delete a user and the borrow records it owns, in one unit of work.
    pub async fn delete_user(&self, id: i32) -> AppResult<()> {
        // Verify user exists first for a clean not-found
        self.repository.users.get_by_id(id).await?;
        self.repository.users.delete_with_records(id).await
    }
}
