//! Driver State Classification
//!
//! Turns one frame into one label, `Alert` or `Drowsy`:
//! - Model-backed classification (ONNX, behind the `onnx` feature)
//! - Probability thresholding
//! - Scripted label sequences for deterministic runs

pub mod config;
pub mod model;
pub mod preprocess;
pub mod scripted;

pub use config::ClassifierConfig;
pub use model::ModelClassifier;
pub use preprocess::preprocess;
pub use scripted::ScriptedClassifier;

use frame_source::VideoFrame;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classifier error types
#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Image processing failed: {0}")]
    ImageProcessing(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Driver state for a single frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    #[default]
    Alert,
    Drowsy,
}

impl Label {
    /// Threshold a drowsiness probability
    pub fn from_probability(probability: f32, threshold: f32) -> Self {
        if probability >= threshold {
            Label::Drowsy
        } else {
            Label::Alert
        }
    }

    pub fn is_drowsy(&self) -> bool {
        matches!(self, Label::Drowsy)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Alert => "alert",
            Label::Drowsy => "drowsy",
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Label produced for one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// Index of the classified frame
    pub frame_index: u64,
    /// Driver state
    pub label: Label,
    /// Drowsiness probability, when the classifier produces one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

impl Classification {
    pub fn new(frame_index: u64, label: Label) -> Self {
        Self {
            frame_index,
            label,
            confidence: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }
}

/// A frame classifier.
///
/// Called once per frame, strictly in frame order. An error aborts the
/// run that requested the classification.
pub trait Classifier: Send {
    fn classify(&mut self, frame: &VideoFrame) -> Result<Classification, ClassifierError>;
}

impl<C: Classifier + ?Sized> Classifier for Box<C> {
    fn classify(&mut self, frame: &VideoFrame) -> Result<Classification, ClassifierError> {
        (**self).classify(frame)
    }
}
