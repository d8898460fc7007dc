//! Model-backed frame classifier

use frame_source::VideoFrame;
#[cfg(feature = "onnx")]
use ort::{GraphOptimizationLevel, Session};
use tracing::{debug, info, warn};

use crate::{Classification, Classifier, ClassifierConfig, ClassifierError, Label};
#[cfg(feature = "onnx")]
use crate::preprocess;

/// Drowsiness classifier backed by an ONNX model.
///
/// The model takes a `(1, N, N, 3)` input scaled to `0..=1` and its last
/// output element is the drowsy probability.
pub struct ModelClassifier {
    config: ClassifierConfig,
    #[cfg(feature = "onnx")]
    session: Option<Session>,
}

impl ModelClassifier {
    pub fn new(config: ClassifierConfig) -> Result<Self, ClassifierError> {
        config.validate()?;

        #[cfg(feature = "onnx")]
        let session = match &config.model_path {
            Some(path) => {
                info!("Loading drowsiness model from {}", path.display());
                let session = Session::builder()
                    .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
                    .and_then(|b| b.commit_from_file(path))
                    .map_err(|e| ClassifierError::ModelLoad(e.to_string()))?;
                Some(session)
            }
            None => {
                warn!(
                    "No model path configured. Every frame is labelled {}.",
                    config.fallback_label
                );
                None
            }
        };

        #[cfg(not(feature = "onnx"))]
        match &config.model_path {
            Some(path) => {
                return Err(ClassifierError::ModelLoad(format!(
                    "{}: built without the `onnx` feature",
                    path.display()
                )));
            }
            None => warn!(
                "No model path configured. Every frame is labelled {}.",
                config.fallback_label
            ),
        }

        info!(
            "Classifier ready: input={}x{}, threshold={}",
            config.input_size, config.input_size, config.drowsy_threshold
        );

        Ok(Self {
            config,
            #[cfg(feature = "onnx")]
            session,
        })
    }

    /// Whether a model is loaded (vs. the fixed fallback label)
    pub fn has_model(&self) -> bool {
        #[cfg(feature = "onnx")]
        {
            self.session.is_some()
        }
        #[cfg(not(feature = "onnx"))]
        {
            false
        }
    }

    #[cfg(feature = "onnx")]
    fn drowsy_probability(&self, frame: &VideoFrame) -> Result<Option<f32>, ClassifierError> {
        let Some(session) = &self.session else {
            return Ok(None);
        };

        let input = preprocess(frame, self.config.input_size)?;
        let outputs = session
            .run(ort::inputs![input].map_err(|e| ClassifierError::Inference(e.to_string()))?)
            .map_err(|e| ClassifierError::Inference(e.to_string()))?;
        let scores = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| ClassifierError::Inference(e.to_string()))?;

        scores
            .iter()
            .last()
            .copied()
            .map(Some)
            .ok_or_else(|| ClassifierError::Inference("model produced an empty output".into()))
    }

    #[cfg(not(feature = "onnx"))]
    fn drowsy_probability(&self, _frame: &VideoFrame) -> Result<Option<f32>, ClassifierError> {
        Ok(None)
    }
}

impl Classifier for ModelClassifier {
    fn classify(&mut self, frame: &VideoFrame) -> Result<Classification, ClassifierError> {
        let classification = match self.drowsy_probability(frame)? {
            Some(p) => Classification::new(
                frame.index,
                Label::from_probability(p, self.config.drowsy_threshold),
            )
            .with_confidence(p),
            None => Classification::new(frame.index, self.config.fallback_label),
        };
        debug!(
            "Frame {} classified {} (p={:?})",
            frame.index, classification.label, classification.confidence
        );
        Ok(classification)
    }
}
