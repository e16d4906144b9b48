//! Sage Core Library
//!
//! Foundational utilities shared by every Sage crate:
//! - Error kinds (`AppError`, `AppResult`, `Failure`)
//! - Logging (`init_logging`, `LogFormat`)
//! - Configuration management

pub mod config;
pub mod error;
pub mod logging;

pub use config::AppConfig;
pub use error::{AppError, AppResult, ErrorKind, Failure};
