use serde::Serialize;

/// One ranked label as produced by the classifier.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Prediction {
    pub label: String,
    pub confidence: f32,
}

impl Prediction {
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }

    /// Confidence as a percentage with two decimals, e.g. `87.00%`.
    pub fn confidence_percent(&self) -> String {
        format!("{:.2}%", self.confidence * 100.0)
    }
}

/// What the rendering layer shows for a prediction.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DisplayPrediction {
    pub label: String,
    pub confidence_percent: String,
}

impl From<&Prediction> for DisplayPrediction {
    fn from(prediction: &Prediction) -> Self {
        Self {
            label: prediction.label.clone(),
            confidence_percent: prediction.confidence_percent(),
        }
    }
}
