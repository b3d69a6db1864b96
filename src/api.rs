use serde::{
    Deserialize, Serialize, Serializer,
    ser::SerializeMap,
};

/// The single most probable class for a text.
///
/// Serializes as a one-entry object mapping the label to its probability.
///
/// # Examples
///
/// ```
/// use text_classifier_service::api::Prediction;
///
/// let p = Prediction::new("positive", 0.75);
/// assert_eq!(serde_json::to_string(&p).unwrap(), r#"{"positive":0.75}"#);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub label: String,
    pub probability: f32,
}

impl Prediction {
    #[must_use]
    pub fn new(label: impl Into<String>, probability: f32) -> Self {
        Self {
            label: label.into(),
            probability,
        }
    }
}

impl Serialize for Prediction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.label, &self.probability)?;
        map.end()
    }
}

/// Body accepted by the prediction route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictRequest {
    pub text: String,
}

/// Trait for classifying a single text.
pub trait TextClassifier: Send + Sync {
    /// Error type returned when classification fails.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Classify `text`, returning the most probable label.
    ///
    /// # Errors
    ///
    /// Returns an error if any inference stage fails.
    fn classify(&self, text: &str) -> Result<Prediction, Self::Error>;
}
