//! Domain models for forestry production operations

mod catalog;
mod consumption;
mod production;
mod project;
mod stock;

pub use catalog::*;
pub use consumption::*;
pub use production::*;
pub use project::*;
pub use stock::*;
