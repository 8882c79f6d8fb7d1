use crate::error::{Error, Result};
use crate::frame_source::interface::Frame;
use crate::image_classifier::interface::{ClassifierLoader, ImageClassifier};
use crate::image_classifier::snapshot::{ClassLabel, Snapshot};
use crate::library::logger::interface::Logger;
use rand::distr::{Distribution, Uniform};
use std::sync::Arc;

/// Produces random but well-formed probabilities for a fixed label set.
pub struct ImageClassifierFake {
    labels: Vec<ClassLabel>,
    logger: Arc<dyn Logger + Send + Sync>,
}

impl ImageClassifierFake {
    pub fn new(labels: Vec<ClassLabel>, logger: Arc<dyn Logger + Send + Sync>) -> Self {
        Self {
            labels,
            logger: logger.with_namespace("image_classifier").with_namespace("fake"),
        }
    }
}

/// Numerically stable softmax.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.iter().map(|e| e / sum).collect()
}

impl ImageClassifier for ImageClassifierFake {
    fn class_labels(&self) -> &[ClassLabel] {
        &self.labels
    }

    fn infer(&self, frame: &Frame) -> Result<Snapshot> {
        if frame.width() == 0 || frame.height() == 0 {
            return Err(Error::Inference("frame is empty".to_string()));
        }

        let logit_dist =
            Uniform::new(-2.0f32, 2.0f32).map_err(|e| Error::Inference(e.to_string()))?;
        let mut rng = rand::rng();
        let logits: Vec<f32> = self
            .labels
            .iter()
            .map(|_| logit_dist.sample(&mut rng))
            .collect();

        let snapshot = Snapshot::from_probabilities(&self.labels, &softmax(&logits))?;
        let _ = self.logger.info(&format!(
            "Classified frame, top class: {}",
            snapshot.top_record().class_name
        ));
        Ok(snapshot)
    }
}

pub struct ClassifierLoaderFake {
    labels: Vec<ClassLabel>,
    logger: Arc<dyn Logger + Send + Sync>,
}

impl ClassifierLoaderFake {
    pub fn new(labels: Vec<ClassLabel>, logger: Arc<dyn Logger + Send + Sync>) -> Self {
        Self { labels, logger }
    }
}

impl ClassifierLoader for ClassifierLoaderFake {
    fn load(&self, model_ref: &str, metadata_ref: &str) -> Result<Arc<dyn ImageClassifier>> {
        if self.labels.is_empty() {
            return Err(Error::ModelLoad("fake model has no classes".to_string()));
        }
        let _ = self.logger.info(&format!(
            "Loading fake model (model: {}, metadata: {})",
            model_ref, metadata_ref
        ));
        Ok(Arc::new(ImageClassifierFake::new(
            self.labels.clone(),
            self.logger.clone(),
        )))
    }
}
