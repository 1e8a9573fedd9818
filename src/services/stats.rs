//! Statistics service

use chrono::{Datelike, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::{
    api::stats::{LibraryStats, UserDashboard},
    config::CirculationConfig,
    error::AppResult,
    models::record::{derive_status, BorrowStatus},
    repository::Repository,
    services::circulation::CirculationService,
};

#[derive(Clone)]
pub struct StatsService {
    repository: Repository,
    circulation: CirculationService,
    config: CirculationConfig,
}

impl StatsService {
    pub fn new(
        repository: Repository,
        circulation: CirculationService,
        config: CirculationConfig,
    ) -> Self {
        Self { repository, circulation, config }
    }

    /// Per-user dashboard aggregates. Derived state is refreshed before any of
    /// the counts are read.
    pub async fn user_dashboard(&self, user_id: i32) -> AppResult<UserDashboard> {
        self.circulation.refresh_active_for_user(user_id).await?;

        let now = Utc::now();

        let active_borrows = self
            .repository
            .records
            .count_by_status(BorrowStatus::Borrowed, Some(user_id))
            .await?;
        let overdue_borrows = self
            .repository
            .records
            .count_by_status(BorrowStatus::Overdue, Some(user_id))
            .await?;
        let books_returned = self
            .repository
            .records
            .count_by_status(BorrowStatus::Returned, Some(user_id))
            .await?;

        // Fine accrued on records borrowed since the first of the month,
        // recomputed in memory; a display figure, nothing is persisted here
        let month_start = NaiveDate::from_ymd_opt(now.year(), now.month(), 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            .and_utc();
        let month_records = self
            .repository
            .records
            .list_for_user_since(user_id, month_start)
            .await?;
        let current_month_fine: Decimal = month_records
            .iter()
            .map(|r| derive_status(r, now, self.config.fine_per_day).1)
            .sum();

        // Presumed lost: overdue past the configured threshold. A report-level
        // classification, the record itself stays `overdue`.
        let lost_cutoff = now - Duration::days(self.config.lost_after_days);
        let books_lost = self
            .repository
            .records
            .count_overdue_before(lost_cutoff, Some(user_id))
            .await?;

        Ok(UserDashboard {
            active_borrows,
            overdue_borrows,
            books_returned,
            books_lost,
            current_month_fine,
        })
    }

    /// Library-wide statistics for the admin dashboard
    pub async fn library_stats(&self) -> AppResult<LibraryStats> {
        self.circulation.refresh_all_active().await?;

        let total_books = self.repository.books.count().await?;
        let total_users = self.repository.users.count_members().await?;
        let active_borrows = self.repository.records.count_active().await?;
        let overdue_books = self
            .repository
            .records
            .count_by_status(BorrowStatus::Overdue, None)
            .await?;

        Ok(LibraryStats {
            total_books,
            total_users,
            active_borrows,
            overdue_books,
        })
    }
}
