use crate::error::{Error, Result};
use std::collections::HashSet;

pub type ClassLabel = String;

const PROBABILITY_TOLERANCE: f32 = 1e-5;

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRecord {
    pub class_name: ClassLabel,
    pub probability: f32,
}

impl PredictionRecord {
    pub fn new(class_name: impl Into<ClassLabel>, probability: f32) -> Self {
        Self {
            class_name: class_name.into(),
            probability,
        }
    }
}

/// Every class of a model exactly once, in the model's class order.
///
/// Construction validates the records, so a `Snapshot` that exists is never
/// partial: it is non-empty, class names are unique and every probability is
/// a finite value in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    records: Vec<PredictionRecord>,
}

impl Snapshot {
    pub fn new(records: Vec<PredictionRecord>) -> Result<Self> {
        if records.is_empty() {
            return Err(Error::Inference("snapshot has no records".to_string()));
        }

        let mut seen = HashSet::new();
        let mut validated = Vec::with_capacity(records.len());
        for record in records {
            if !seen.insert(record.class_name.clone()) {
                return Err(Error::Inference(format!(
                    "class '{}' appears more than once",
                    record.class_name
                )));
            }
            let p = record.probability;
            if !p.is_finite() || p < -PROBABILITY_TOLERANCE || p > 1.0 + PROBABILITY_TOLERANCE {
                return Err(Error::Inference(format!(
                    "probability {} for class '{}' is outside [0, 1]",
                    p, record.class_name
                )));
            }
            validated.push(PredictionRecord {
                probability: p.clamp(0.0, 1.0),
                ..record
            });
        }

        Ok(Self { records: validated })
    }

    /// Pairs `labels` with `probabilities` positionally.
    pub fn from_probabilities(labels: &[ClassLabel], probabilities: &[f32]) -> Result<Self> {
        if labels.len() != probabilities.len() {
            return Err(Error::Inference(format!(
                "model produced {} probabilities for {} classes",
                probabilities.len(),
                labels.len()
            )));
        }

        Self::new(
            labels
                .iter()
                .zip(probabilities)
                .map(|(label, &probability)| PredictionRecord::new(label.clone(), probability))
                .collect(),
        )
    }

    pub fn records(&self) -> &[PredictionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Highest probability; on a tie the class earlier in model order wins.
    pub fn top_record(&self) -> &PredictionRecord {
        let mut top = &self.records[0];
        for record in &self.records[1..] {
            if record.probability > top.probability {
                top = record;
            }
        }
        top
    }

    pub fn probability_sum(&self) -> f32 {
        self.records.iter().map(|r| r.probability).sum()
    }
}
