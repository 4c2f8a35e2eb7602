pub mod analysis;
pub mod classifier;
pub mod image_codec;
pub mod metrics;
pub mod providers;

pub use analysis::{AnalysisError, AnalysisService, UploadedImage};
pub use metrics::{get_metrics, init_metrics};
