//! # Configuration Module
//!
//! This module handles application configuration loading and management.
//! Configuration can be loaded from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default.toml, config/{environment}.toml)
//! - .env files (via dotenvy)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use hive_realtime::config::Settings;
//!
//! let settings = Settings::load()?;
//! println!("Event bus capacity: {}", settings.realtime.bus_capacity);
//! ```

mod settings;

pub use settings::*;
