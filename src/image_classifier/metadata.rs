use crate::error::{Error, Result};
use crate::image_classifier::snapshot::ClassLabel;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

fn default_image_size() -> u32 {
    224
}

/// Class metadata published next to an exported model.
///
/// Only the fields the classifier needs are read; unknown keys such as
/// `tfjsVersion` or `timeStamp` are ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassMetadata {
    pub labels: Vec<ClassLabel>,
    #[serde(default = "default_image_size")]
    pub image_size: u32,
    #[serde(default)]
    pub model_name: Option<String>,
}

impl ClassMetadata {
    pub fn from_json(json: &str) -> Result<Self> {
        let metadata: ClassMetadata = serde_json::from_str(json)
            .map_err(|e| Error::ModelLoad(format!("malformed class metadata: {}", e)))?;
        metadata.validate()?;
        Ok(metadata)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            Error::ModelLoad(format!("cannot read metadata {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    fn validate(&self) -> Result<()> {
        if self.labels.is_empty() {
            return Err(Error::ModelLoad("metadata lists no classes".to_string()));
        }
        let mut seen = HashSet::new();
        for label in &self.labels {
            if !seen.insert(label) {
                return Err(Error::ModelLoad(format!("duplicate class label '{}'", label)));
            }
        }
        if self.image_size == 0 {
            return Err(Error::ModelLoad("imageSize must be positive".to_string()));
        }
        Ok(())
    }
}
