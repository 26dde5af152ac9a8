//! Infrastructure layer - blockchain access

pub mod blockchain;
