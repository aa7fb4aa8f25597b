//! # tagstore
//!
//! Application layer over `tagstore-core`: HTTP API, CLI, configuration
//! and the background write-back worker.

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod services;
pub mod worker;

pub use error::AppError;
