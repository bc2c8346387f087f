use crate::graph::NodeId;
use crate::property::ValueKind;

pub type Result<T, E = AnimatorError> = std::result::Result<T, E>;

/// Failures surfaced to tree builders and keypath tooling. Frame evaluation
/// itself never fails.
#[derive(thiserror::Error, Debug)]
pub enum AnimatorError {
    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    #[error("unknown keypath `{0}`")]
    UnknownKeypath(String),

    #[error("keypath `{keypath}` expects a {expected} value")]
    ValueKindMismatch {
        keypath: String,
        expected: ValueKind,
    },

    #[error("layer {0} is its own ancestor")]
    ParentCycle(u32),

    #[error("layer index {0} is used more than once")]
    DuplicateLayerIndex(u32),

    #[error("invalid animation document: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages_name_the_offender() {
        assert_eq!(
            AnimatorError::UnknownKeypath("Skew".into()).to_string(),
            "unknown keypath `Skew`"
        );
        assert_eq!(
            AnimatorError::ValueKindMismatch {
                keypath: "Opacity".into(),
                expected: ValueKind::Scalar,
            }
            .to_string(),
            "keypath `Opacity` expects a scalar value"
        );
        assert!(AnimatorError::ParentCycle(7).to_string().contains('7'));
    }

    #[test]
    fn json_errors_convert() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: AnimatorError = err.into();
        assert!(err.to_string().starts_with("invalid animation document"));
    }
}
