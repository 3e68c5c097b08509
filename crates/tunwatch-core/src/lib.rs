pub mod config;
pub mod error;
pub mod registry;
pub mod types;

pub use config::{RestartPolicy, Settings, WatchConfig};
pub use error::{ConfigError, RegistryError};
pub use registry::Registry;
pub use types::*;
