//! HTTP request handlers

pub mod catalog;
pub mod health;
pub mod mix;
pub mod production;
pub mod project;
pub mod stock;

pub use catalog::*;
pub use health::*;
pub use mix::*;
pub use production::*;
pub use project::*;
pub use stock::*;
