use image::RgbImage;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Label reported when the detector does not see an issue
pub const NO_ISSUE_LABEL: &str = "No Issue";

/// Issue classes, in the output order of the classification models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum IssueLabel {
    Garbage,
    Potholes,
}

impl IssueLabel {
    /// Index i of a classifier output corresponds to `ALL[i]`
    pub const ALL: [IssueLabel; 2] = [IssueLabel::Garbage, IssueLabel::Potholes];

    pub fn as_str(&self) -> &'static str {
        match self {
            IssueLabel::Garbage => "Garbage",
            IssueLabel::Potholes => "Potholes",
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Overlay color used when drawing this class
    pub fn color(&self) -> [u8; 3] {
        match self {
            IssueLabel::Garbage => [46, 204, 113],
            IssueLabel::Potholes => [230, 126, 34],
        }
    }
}

impl std::fmt::Display for IssueLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of running the pipeline on one image
#[derive(Debug, Clone)]
pub struct InferenceOutcome {
    /// `None` means the detector decided there is no issue
    pub label: Option<IssueLabel>,
    pub confidence: f32,
    pub issue_probability: f32,
    /// Image with segmentation overlay, present only when an issue was found
    pub annotated: Option<RgbImage>,
}

impl InferenceOutcome {
    pub fn no_issue(issue_probability: f32) -> Self {
        Self {
            label: None,
            confidence: 1.0 - issue_probability,
            issue_probability,
            annotated: None,
        }
    }

    pub fn label_text(&self) -> &'static str {
        self.label.map(|l| l.as_str()).unwrap_or(NO_ISSUE_LABEL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_order_matches_model_output() {
        assert_eq!(IssueLabel::from_index(0), Some(IssueLabel::Garbage));
        assert_eq!(IssueLabel::from_index(1), Some(IssueLabel::Potholes));
        assert_eq!(IssueLabel::from_index(2), None);
    }

    #[test]
    fn test_no_issue_outcome() {
        let outcome = InferenceOutcome::no_issue(0.25);
        assert!(outcome.label.is_none());
        assert_eq!(outcome.label_text(), "No Issue");
        assert!((outcome.confidence - 0.75).abs() < 1e-6);
        assert!(outcome.annotated.is_none());
    }

    #[test]
    fn test_label_serializes_as_class_name() {
        assert_eq!(
            serde_json::to_string(&IssueLabel::Potholes).unwrap(),
            "\"Potholes\""
        );
    }
}
