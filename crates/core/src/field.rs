use serde::{Deserialize, Serialize};

/// A single extracted value with an associated confidence score (0.0–1.0).
///
/// A confidence of 0.0 means nothing was found and `value` holds a
/// placeholder; callers tell a weak guess from a miss only through it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractedField<T> {
    pub value: T,
    /// Confidence in this extraction (0.0 = nothing found, 1.0 = certain).
    pub confidence: f32,
    /// Index into the trimmed, non-empty receipt lines the value came from.
    pub source_line: Option<usize>,
}

impl<T> ExtractedField<T> {
    pub fn new(value: T, confidence: f32, source_line: Option<usize>) -> Self {
        let confidence = if confidence.is_nan() { 0.0 } else { confidence.clamp(0.0, 1.0) };
        Self { value, confidence, source_line }
    }

    pub fn at_line(value: T, confidence: f32, line: usize) -> Self {
        Self::new(value, confidence, Some(line))
    }

    /// The "nothing extracted" value: a placeholder with zero confidence.
    pub fn missing(value: T) -> Self {
        Self { value, confidence: 0.0, source_line: None }
    }

    pub fn is_missing(&self) -> bool {
        self.confidence == 0.0
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ExtractedField<U> {
        ExtractedField { value: f(self.value), confidence: self.confidence, source_line: self.source_line }
    }
}
