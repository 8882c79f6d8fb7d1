use crate::error::{Error, Result};
use crate::frame_source::interface::Frame;
use crate::image_classifier::interface::{ClassifierLoader, ImageClassifier};
use crate::image_classifier::metadata::ClassMetadata;
use crate::image_classifier::snapshot::{ClassLabel, Snapshot};
use crate::image_classifier::tract::image::frame_to_tensor;
use crate::library::logger::interface::Logger;
use std::path::Path;
use std::sync::Arc;
use tract_onnx::prelude::*;

/// ONNX export of an image model whose single output is one probability per
/// label listed in the accompanying metadata.
pub struct ImageClassifierTractOnnx {
    model: TypedRunnableModel<TypedModel>,
    metadata: ClassMetadata,
}

impl ImageClassifierTractOnnx {
    pub fn new(model_path: &str, metadata: ClassMetadata) -> Result<Self> {
        if !Path::new(model_path).exists() {
            return Err(Error::ModelLoad(format!("model not found: {}", model_path)));
        }

        let size = metadata.image_size as usize;
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .and_then(|model| model.with_input_fact(0, f32::fact([1, size, size, 3]).into()))
            .and_then(|model| model.into_optimized())
            .and_then(|model| model.into_runnable())
            .map_err(|e| Error::ModelLoad(format!("cannot load {}: {}", model_path, e)))?;

        Ok(Self { model, metadata })
    }
}

impl ImageClassifier for ImageClassifierTractOnnx {
    fn class_labels(&self) -> &[ClassLabel] {
        &self.metadata.labels
    }

    fn infer(&self, frame: &Frame) -> Result<Snapshot> {
        if frame.width() == 0 || frame.height() == 0 {
            return Err(Error::Inference("frame is empty".to_string()));
        }

        let input = frame_to_tensor(frame, self.metadata.image_size)
            .map_err(|e| Error::Inference(e.to_string()))?;

        let outputs = self
            .model
            .run(tvec!(input.into_tvalue()))
            .map_err(|e| Error::Inference(e.to_string()))?;

        let output = outputs
            .first()
            .ok_or_else(|| Error::Inference("model produced no outputs".to_string()))?;
        let probabilities: Vec<f32> = output
            .to_array_view::<f32>()
            .map_err(|e| Error::Inference(e.to_string()))?
            .iter()
            .copied()
            .collect();

        Snapshot::from_probabilities(self.class_labels(), &probabilities)
    }
}

pub struct ClassifierLoaderTractOnnx {
    logger: Arc<dyn Logger + Send + Sync>,
}

impl ClassifierLoaderTractOnnx {
    pub fn new(logger: Arc<dyn Logger + Send + Sync>) -> Self {
        Self {
            logger: logger.with_namespace("image_classifier").with_namespace("tract_onnx"),
        }
    }
}

impl ClassifierLoader for ClassifierLoaderTractOnnx {
    fn load(&self, model_ref: &str, metadata_ref: &str) -> Result<Arc<dyn ImageClassifier>> {
        let _ = self.logger.info(&format!("Loading class metadata from {}", metadata_ref));
        let metadata = ClassMetadata::from_path(metadata_ref)?;

        let _ = self.logger.info(&format!("Loading model from {}", model_ref));
        let classifier = ImageClassifierTractOnnx::new(model_ref, metadata)?;

        let _ = self.logger.info(&format!(
            "Model loaded with {} classes",
            classifier.class_count()
        ));
        Ok(Arc::new(classifier))
    }
}
