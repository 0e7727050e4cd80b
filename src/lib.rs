pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(test)]
mod test_support;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::{DictConfig, FileConfig, NullConfig};

pub use adapters::{register_default_carriers, HttpTransport};
pub use core::disambiguation::ProbeStrategy;
pub use core::package::Package;
pub use core::registry::CarrierRegistry;
pub use domain::model::{TrackingEvent, TrackingInfo};
pub use domain::ports::{Carrier, ConfigProvider, Transport};
pub use utils::error::{ConfigError, Result, TrackingError};
