//! Configuration module
//!
//! Loads the swap configuration file: monitor timing settings and the seven
//! trigger lists.

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{ConfigLimits, ConfigLoader, LoadResult, LoadWarning, LoaderOptions};
pub use schema::{MonitorSettings, RawSwapConfig, RawTrigger, SwapConfig, TRIGGER_LISTS};
pub use validation::{ValidationResult, Validator, suggest_key};
