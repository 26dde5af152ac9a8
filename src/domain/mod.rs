//! Domain layer - core business logic and entities

pub mod integration;
pub mod network;
pub mod price;
