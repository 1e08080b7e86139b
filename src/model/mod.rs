pub mod model_metadata;
pub mod model_storage;
pub mod config;

pub use model_metadata::{ModelMetadata, NORMALIZATION_UNIT};
pub use model_storage::{
    format_metadata_info, is_bundle_path, load_metadata, load_model_binary, load_model_with_metadata,
    save_model_with_metadata,
};
pub use config::{AppConfig, DeviceType, ModelSettings, TimestampSettings};
