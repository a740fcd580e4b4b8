//! Application state shared by all handlers.

use evia_core::Config;
use evia_services::{AuthService, ComplaintService, DrugService};
use sqlx::PgPool;

pub struct AppState {
    pub config: Config,
    pub pool: PgPool,
    pub auth: AuthService,
    pub complaints: ComplaintService,
    pub drugs: DrugService,
}
