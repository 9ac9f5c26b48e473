//! Configuration for the folio engine.
//!
//! Loads the pagination and sort defaults every provider starts from, checks
//! them against guard rails, and installs the tracing subscriber used by
//! hosts that embed the engine.

pub mod models;
pub mod telemetry;
pub mod util;
pub mod validation;

pub use models::engine::{EngineConfig, EngineConfigSource};
pub use telemetry::init_tracing;
pub use validation::{ConfigGuardRailError, ConfigWarning, ConfigWarnings};
