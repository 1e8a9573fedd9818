//! Business logic services

pub mod accounts;
pub mod auth;
pub mod catalog;
pub mod circulation;
pub mod stats;

use crate::{config::AppConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub auth: auth::AuthService,
    pub catalog: catalog::CatalogService,
    pub circulation: circulation::CirculationService,
    pub accounts: accounts::AccountsService,
    pub stats: stats::StatsService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, config: &AppConfig) -> Self {
        let circulation =
            circulation::CirculationService::new(repository.clone(), config.circulation.clone());
        Self {
            auth: auth::AuthService::new(repository.clone(), config.auth.clone()),
            catalog: catalog::CatalogService::new(repository.clone()),
            accounts: accounts::AccountsService::new(repository.clone(), circulation.clone()),
            stats: stats::StatsService::new(
                repository,
                circulation.clone(),
                config.circulation.clone(),
            ),
            circulation,
        }
    }
}
