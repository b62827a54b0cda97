//! Domain layer: pure models and ports with no infrastructure dependencies.

pub mod models;
pub mod ports;
