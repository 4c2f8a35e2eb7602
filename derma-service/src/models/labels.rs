//! Class label table mapping classifier output indices to condition names.

/// Labels of the bundled skin-condition classifier, in output order.
pub const DEFAULT_CLASS_LABELS: &[&str] = &[
    "Acne",
    "Actinic_Keratosis",
    "DrugEruption",
    "Eczema",
    "Lupus",
    "Psoriasis",
    "Seborrh_Keratoses",
    "SkinCancer",
    "Tinea",
    "Vitiligo",
];

/// Shown when the classifier reports an index the table does not cover.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Ordered, immutable list of class labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelTable {
    labels: Vec<String>,
}

impl LabelTable {
    pub fn new(labels: Vec<String>) -> Self {
        Self { labels }
    }

    /// Parse a comma-separated label list, ignoring blank entries.
    pub fn from_csv(raw: &str) -> Self {
        Self::new(
            raw.split(',')
                .map(str::trim)
                .filter(|label| !label.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Raw label as the model was trained with it.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    /// User-facing label: underscores become spaces, nothing else changes.
    pub fn display_label(&self, index: usize) -> String {
        match self.get(index) {
            Some(label) => label.replace('_', " "),
            None => UNKNOWN_LABEL.to_string(),
        }
    }
}

impl Default for LabelTable {
    fn default() -> Self {
        Self::new(DEFAULT_CLASS_LABELS.iter().map(|s| s.to_string()).collect())
    }
}
