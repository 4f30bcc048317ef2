//! Shared helpers for the refresher integration tests.

#![allow(dead_code)]

pub mod mocks;

use std::time::Duration;

use appconfig_helper::{RefresherConfig, SourceIdentity};

pub const APPLICATION: &str = "AppConfig-App";
pub const ENVIRONMENT: &str = "AppConfig-Env";
pub const PROFILE: &str = "AppConfig-Profile";

/// Settings for the canonical test source with a 15 second floor.
pub fn test_config() -> RefresherConfig {
    RefresherConfig::new(
        SourceIdentity::new(APPLICATION, ENVIRONMENT, PROFILE),
        Duration::from_secs(15),
    )
}
