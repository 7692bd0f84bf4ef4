//! Shared domain core for the forestry operations platform
//!
//! Unit conversion, the production-run state machine and the input
//! availability ledger. Everything here is pure: persistence, locking and
//! authorization belong to the backend, which calls into this crate.

pub mod error;
pub mod ledger;
pub mod models;
pub mod types;
pub mod units;
pub mod validation;

pub use error::*;
pub use ledger::*;
pub use models::*;
pub use types::*;
pub use units::*;
pub use validation::*;
