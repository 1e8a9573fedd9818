//! Circulation service: the borrow/return lifecycle.

use chrono::{Duration, Utc};

use crate::{
    config::CirculationConfig,
    error::AppResult,
    models::{
        book::Book,
        record::{BorrowRecord, BorrowStatus, RecordDetails},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct CirculationService {
    repository: Repository,
    config: CirculationConfig,
}

impl CirculationService {
    pub fn new(repository: Repository, config: CirculationConfig) -> Self {
        Self { repository, config }
    }

    /// Borrow a book for a user. The record and the copy decrement commit
    /// together or not at all.
    pub async fn borrow_book(&self, user_id: i32, book_id: i32) -> AppResult<(BorrowRecord, Book)> {
        // Verify user exists
        self.repository.users.get_by_id(user_id).await?;

        let now = Utc::now();
        let due_date = now + Duration::days(self.config.loan_period_days);

        let (record, book) = self.repository.records.borrow(user_id, book_id, now, due_date).await?;

        tracing::info!(user_id, book_id, record_id = record.id, "book borrowed");
        Ok((record, book))
    }

    /// Return a borrowed book. Finalizes the fine from the return date and puts
    /// the copy back, atomically.
    pub async fn return_book(&self, record_id: i32) -> AppResult<BorrowRecord> {
        let record = self
            .repository
            .records
            .return_record(record_id, Utc::now(), self.config.fine_per_day)
            .await?;

        tracing::info!(record_id, fine = %record.fine_amount, "book returned");
        Ok(record)
    }

    /// Recompute fine/status for every record in the slice that is still out,
    /// persisting the ones that changed. Status and fine are derived values;
    /// every listing and dashboard goes through here before reading them.
    pub async fn refresh_overdue_statuses(&self, records: &mut [BorrowRecord]) -> AppResult<()> {
        let now = Utc::now();
        for record in records.iter_mut() {
            if !record.status.is_active() {
                continue;
            }
            if record.recalculate(now, self.config.fine_per_day) {
                self.repository.records.save_derived(record).await?;
            }
        }
        Ok(())
    }

    /// Refresh every active record in the store
    pub async fn refresh_all_active(&self) -> AppResult<()> {
        let mut records = self.repository.records.list_active().await?;
        self.refresh_overdue_statuses(&mut records).await
    }

    /// Refresh one user's active records
    pub async fn refresh_active_for_user(&self, user_id: i32) -> AppResult<()> {
        let mut records = self.repository.records.list_active_for_user(user_id).await?;
        self.refresh_overdue_statuses(&mut records).await
    }

    /// All borrow records, optionally filtered by status, fines refreshed first
    pub async fn list_records(&self, status: Option<BorrowStatus>) -> AppResult<Vec<RecordDetails>> {
        self.refresh_all_active().await?;
        self.repository.records.list_details(status).await
    }

    /// One user's borrow records, fines refreshed first
    pub async fn user_records(&self, user_id: i32) -> AppResult<Vec<RecordDetails>> {
        // Verify user exists
        self.repository.users.get_by_id(user_id).await?;
        self.refresh_active_for_user(user_id).await?;
        self.repository.records.list_details_for_user(user_id).await
    }
}
