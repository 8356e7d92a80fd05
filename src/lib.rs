pub mod aggregate;
pub mod config;
pub mod contract;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod msk64;
pub mod regional;
pub mod scenarios;
pub mod scoring;
pub mod seasonality;
pub mod synthetic;
pub mod types;

pub use engine::RiskEngine;
