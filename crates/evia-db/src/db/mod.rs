//! Database repositories for data access layer
//!
//! Each repository owns one table and implements the matching store trait.
//
// Account repositories (users, sessions, password reset codes)
pub mod one_time_code;
pub mod session;
pub mod user;
//
// Complaint and catalogue repositories
pub mod complaint;
pub mod drug;
//
// Transaction utilities
pub mod transaction;

pub use complaint::{ComplaintRepository, ComplaintStore};
pub use drug::{DrugRepository, DrugStore};
pub use one_time_code::{OneTimeCodeRepository, OneTimeCodeStore};
pub use session::{SessionRepository, SessionStore};
pub use transaction::TransactionGuard;
pub use user::{UserRepository, UserStore};
