//! Configuration management

mod settings;
mod store;

pub use settings::{
    default_config_path, AppConfig, DeviceSettings, SchedulerSettings, CONFIG_VERSION,
};
pub use store::{ChangeKind, ConfigStore, InstanceUpdate, PlaylistUpdate, StoreError};
