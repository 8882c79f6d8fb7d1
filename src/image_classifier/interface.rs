use crate::error::Result;
use crate::frame_source::interface::Frame;
use crate::image_classifier::snapshot::{ClassLabel, Snapshot};
use std::sync::Arc;

/// A loaded, ready-to-query classification model.
pub trait ImageClassifier: Send + Sync {
    /// Class labels in the model's own order.
    fn class_labels(&self) -> &[ClassLabel];

    fn class_count(&self) -> usize {
        self.class_labels().len()
    }

    /// Must return exactly `class_count()` records.
    fn infer(&self, frame: &Frame) -> Result<Snapshot>;
}

pub trait ClassifierLoader: Send + Sync {
    /// Fails with `Error::ModelLoad` when either resource is unreachable or malformed.
    fn load(&self, model_ref: &str, metadata_ref: &str) -> Result<Arc<dyn ImageClassifier>>;
}
