pub mod loader;
#[cfg(feature = "ml")]
pub mod ml_model;
#[cfg(feature = "ml")]
pub mod inference;

pub use loader::ClassifierLoader;
#[cfg(feature = "ml")]
pub use ml_model::{model_summary, DigitClassifier, ModelConfig};
#[cfg(feature = "ml")]
pub use inference::{model_to_bytes, InferenceEngine, SharedEngine};
