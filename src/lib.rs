//! Boomer Oracle - price feed reader for the price-chat contracts
//! Built with Domain-Driven Design principles

pub mod domain;
pub mod infrastructure;
pub mod application;
pub mod shared;

// Re-export main types for convenience
pub use application::OracleSession;
pub use domain::integration::IntegrationStatusReader;
pub use domain::network::NetworkRegistry;
pub use domain::price::{PriceAggregator, PriceUpdateListener};
pub use shared::utils::format_units;
