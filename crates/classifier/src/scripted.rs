//! Scripted label sequences

use frame_source::VideoFrame;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::{Classification, Classifier, ClassifierError, Label};

/// Replays a fixed label sequence, one label per call.
///
/// Once the script runs out it keeps repeating the last label, or fails
/// when built with [`ScriptedClassifier::strict`].
#[derive(Debug, Clone)]
pub struct ScriptedClassifier {
    labels: Vec<Label>,
    strict: bool,
    calls: Arc<AtomicUsize>,
}

impl ScriptedClassifier {
    pub fn new(labels: Vec<Label>) -> Self {
        Self {
            labels,
            strict: false,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Fail once the script is exhausted
    pub fn strict(labels: Vec<Label>) -> Self {
        Self {
            strict: true,
            ..Self::new(labels)
        }
    }

    /// Same label for every frame
    pub fn constant(label: Label) -> Self {
        Self::new(vec![label])
    }

    /// Parse a pattern such as `"AADD D"`: `A` alert, `D` drowsy,
    /// whitespace ignored.
    pub fn from_pattern(pattern: &str) -> Result<Self, ClassifierError> {
        let labels = pattern
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| match c.to_ascii_uppercase() {
                'A' => Ok(Label::Alert),
                'D' => Ok(Label::Drowsy),
                other => Err(ClassifierError::Config(format!(
                    "unexpected label '{}' in pattern",
                    other
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(labels))
    }

    /// Shared count of `classify` calls
    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

impl Classifier for ScriptedClassifier {
    fn classify(&mut self, frame: &VideoFrame) -> Result<Classification, ClassifierError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let label = match self.labels.get(call) {
            Some(label) => *label,
            None if self.strict => {
                return Err(ClassifierError::Inference(format!(
                    "script exhausted after {} labels",
                    self.labels.len()
                )))
            }
            None => self.labels.last().copied().unwrap_or_default(),
        };
        Ok(Classification::new(frame.index, label))
    }
}
