//! # geodns-settings
//!
//! Layered configuration for the Geo-DNS router.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`GeoDnsSettings::default()`]
//! 2. **User file**: `~/.geodns/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `GEODNS_*` overrides (highest priority)
//!
//! The binary applies its CLI flags on top of the loaded value.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, deep_merge, load_settings, load_settings_from_path, settings_path,
};
pub use types::{GeoDnsSettings, LoggingSettings, ServerSettings};
