//! Full configuration validation.
//!
//! Each section has its own submodule; this orchestrator calls them all
//! and collects errors into a single `ConfigError`.

mod helpers;
mod map;
mod presence;

#[cfg(test)]
mod tests;

use crate::schema::RideLinkConfig;
use ridelink_common::ConfigError;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &RideLinkConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    presence::validate_presence(&mut errors, config);
    map::validate_map(&mut errors, config);
    map::validate_location(&mut errors, config);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}
