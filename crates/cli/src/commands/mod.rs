//! Command handlers for the Sage CLI.

pub mod ask;
pub mod chat;
pub mod health;
pub mod index;
pub mod stats;

pub use ask::AskCommand;
pub use chat::ChatCommand;
pub use health::HealthCommand;
pub use index::IndexCommand;
pub use stats::StatsCommand;

use sage_core::{AppError, AppResult};
use serde::Serialize;

/// Print a value as pretty JSON on stdout.
pub(crate) fn print_json<T: Serialize>(value: &T) -> AppResult<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

/// Print the structured failure for `error` on stdout and hand the error back.
pub(crate) fn report_failure(error: AppError) -> AppError {
    if let Ok(json) = serde_json::to_string_pretty(&error.to_failure()) {
        println!("{}", json);
    }
    error
}
