use crate::errors::InferenceError;
use image::RgbImage;
use serde::Serialize;

/// The label a classifier picked for a whole image.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Classification {
    pub label: String,
    pub confidence: f32,
}

/// A model that assigns one label out of a fixed list to an image.
pub trait ImageClassifier: Send + Sync {
    fn classify(&self, image: &RgbImage) -> Result<Classification, InferenceError>;

    fn labels(&self) -> &[String];
}

/// Index and value of the largest probability. `None` for an empty vector.
pub fn argmax_and_max(probabilities: &[f32]) -> Option<(usize, f32)> {
    probabilities
        .iter()
        .copied()
        .enumerate()
        .reduce(|best, current| if current.1 > best.1 { current } else { best })
}

/// Picks the most probable label.
pub fn classification_from_probabilities(
    probabilities: &[f32],
    labels: &[String],
) -> Result<Classification, InferenceError> {
    if probabilities.len() != labels.len() {
        return Err(InferenceError::InvalidOutput(format!(
            "classifier produced {} probabilities for {} labels",
            probabilities.len(),
            labels.len()
        )));
    }
    let (index, confidence) = argmax_and_max(probabilities).ok_or_else(|| {
        InferenceError::InvalidOutput("classifier produced no probabilities".to_string())
    })?;
    Ok(Classification {
        label: labels[index].clone(),
        confidence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels() -> Vec<String> {
        vec!["Tom".to_string(), "Jerry".to_string(), "Spike".to_string()]
    }

    #[test]
    fn argmax_picks_first_maximum() {
        assert_eq!(argmax_and_max(&[0.2, 0.4, 0.4]), Some((1, 0.4)));
        assert_eq!(argmax_and_max(&[]), None);
    }

    #[test]
    fn classification_uses_argmax_label() {
        let classification =
            classification_from_probabilities(&[0.1, 0.7, 0.2], &labels()).unwrap();
        assert_eq!(
            classification,
            Classification {
                label: "Jerry".to_string(),
                confidence: 0.7,
            }
        );
    }

    #[test]
    fn probability_count_must_match_labels() {
        let result = classification_from_probabilities(&[0.5, 0.5], &labels());
        assert!(matches!(result, Err(InferenceError::InvalidOutput(_))));
    }

    #[test]
    fn no_labels_is_an_error() {
        let result = classification_from_probabilities(&[], &[]);
        assert!(matches!(result, Err(InferenceError::InvalidOutput(_))));
    }
}
