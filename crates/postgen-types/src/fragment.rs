use serde::{Deserialize, Serialize};

/// One incremental unit of generated text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    pub content: String,
}

impl Fragment {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

/// Payload carried by a single relay event.
///
/// A relay stream is zero or more `Fragment` payloads, optionally followed by
/// exactly one terminal `Failure` when the upstream broke off mid-stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RelayPayload {
    Fragment(Fragment),
    Failure { error: String },
}

impl RelayPayload {
    pub fn failure(error: impl Into<String>) -> Self {
        Self::Failure {
            error: error.into(),
        }
    }
}

impl From<Fragment> for RelayPayload {
    fn from(fragment: Fragment) -> Self {
        Self::Fragment(fragment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragment_wire_shape() {
        let json = serde_json::to_string(&RelayPayload::from(Fragment::new("Grow"))).unwrap();
        assert_eq!(json, r#"{"content":"Grow"}"#);
    }

    #[test]
    fn test_failure_wire_shape() {
        let json = serde_json::to_string(&RelayPayload::failure("boom")).unwrap();
        assert_eq!(json, r#"{"error":"boom"}"#);
    }

    #[test]
    fn test_untagged_deserialization_picks_variant() {
        let fragment: RelayPayload = serde_json::from_str(r#"{"content":" your"}"#).unwrap();
        assert_eq!(fragment, RelayPayload::Fragment(Fragment::new(" your")));

        let failure: RelayPayload = serde_json::from_str(r#"{"error":"x"}"#).unwrap();
        assert_eq!(failure, RelayPayload::failure("x"));
    }

    #[test]
    fn test_unknown_shape_rejected() {
        assert!(serde_json::from_str::<RelayPayload>(r#"{"text":"nope"}"#).is_err());
    }
}
