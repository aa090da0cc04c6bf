//! Configuration and ambient setup for docgate.
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`config`] | [`DocGateConfig`], [`MountConfig`] and their environment loading |
//! | [`error`] | [`DocGateConfigError`] |
//! | [`telemetry`] | [`init_tracing`] |

pub mod config;
pub mod error;
pub mod telemetry;

pub use config::{DocGateConfig, MountConfig};
pub use error::{DocGateConfigError, DocGateConfigResult};
pub use telemetry::init_tracing;
