//! Application entry point.
//!
//! Replace the body of [`main_logic`] with the real work of the program. It
//! runs after configuration and logging are ready, and its return value
//! becomes the process exit code.
use crate::{config::Config, error::ApplicationError};

/// Main logic of the application.
pub fn main_logic(_config: &Config) -> Result<i32, ApplicationError> {
    Ok(0)
}
