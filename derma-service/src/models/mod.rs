pub mod analysis;
pub mod labels;

pub use analysis::{format_percent, round_confidence, AnalysisResponse, ClassificationResult};
pub use labels::{LabelTable, DEFAULT_CLASS_LABELS, UNKNOWN_LABEL};
