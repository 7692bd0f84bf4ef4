//! Business logic services for the forestry operations server

pub mod availability;
pub mod catalog;
pub mod mix;
pub mod production;
pub mod project;
pub mod stock;

pub use availability::AvailabilityService;
pub use catalog::CatalogService;
pub use mix::MixService;
pub use production::ProductionService;
pub use project::ProjectService;
pub use stock::StockService;
