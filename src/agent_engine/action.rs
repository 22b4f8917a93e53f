use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// STATUS values that end the run.
pub const TERMINAL_STATUSES: &[&str] = &["finish", "impossible"];

/// One decoded model step. Fields are independent: several may be present in
/// a single descriptor and each executes once, in declaration order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ActionDescriptor {
    /// Free-form reasoning the model emits before acting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought: Option<String>,

    /// Normalized [0,1000]^2 location to tap, or the start of a swipe.
    #[serde(rename = "POINT", default, skip_serializing_if = "Option::is_none")]
    pub point: Option<[i64; 2]>,

    /// Swipe target: an explicit end point or a symbolic direction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<SwipeTarget>,

    /// Swipe duration in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,

    /// Symbolic key name (HOME, BACK, ...).
    #[serde(rename = "PRESS", default, skip_serializing_if = "Option::is_none")]
    pub press: Option<String>,

    /// URL-encoded text payload.
    #[serde(rename = "TYPE", default, skip_serializing_if = "Option::is_none")]
    pub type_text: Option<String>,

    /// Clear the focused input field when truthy.
    #[serde(rename = "CLEAR", default, skip_serializing_if = "Option::is_none")]
    pub clear: Option<serde_json::Value>,

    /// Task status marker; "finish" and "impossible" are terminal.
    #[serde(rename = "STATUS", default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Swipe destination. The direction arrives as an open string so an unknown
/// value surfaces as a protocol error at dispatch instead of silently failing
/// the whole decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum SwipeTarget {
    Point([i64; 2]),
    Direction(String),
}

impl ActionDescriptor {
    pub fn is_terminal(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|s| TERMINAL_STATUSES.contains(&s))
    }

    /// CLEAR triggers on presence of any truthy value.
    pub fn wants_clear(&self) -> bool {
        match &self.clear {
            None => false,
            Some(serde_json::Value::Null) => false,
            Some(serde_json::Value::Bool(b)) => *b,
            Some(serde_json::Value::Number(n)) => n.as_f64() != Some(0.0),
            Some(serde_json::Value::String(s)) => !s.is_empty(),
            Some(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_tap_with_status() {
        let a: ActionDescriptor =
            serde_json::from_str(r#"{"POINT":[500,500],"STATUS":"continue"}"#).unwrap();
        assert_eq!(a.point, Some([500, 500]));
        assert_eq!(a.status.as_deref(), Some("continue"));
        assert!(!a.is_terminal());
    }

    #[test]
    fn decodes_directional_and_pointwise_swipes() {
        let a: ActionDescriptor =
            serde_json::from_str(r#"{"POINT":[500,900],"to":"up"}"#).unwrap();
        assert_eq!(a.to, Some(SwipeTarget::Direction("up".into())));

        let b: ActionDescriptor =
            serde_json::from_str(r#"{"POINT":[100,100],"to":[800,800],"duration":300}"#).unwrap();
        assert_eq!(b.to, Some(SwipeTarget::Point([800, 800])));
        assert_eq!(b.duration, Some(300));
    }

    #[test]
    fn terminal_iff_finish_or_impossible() {
        for (status, terminal) in [
            ("finish", true),
            ("impossible", true),
            ("continue", false),
            ("FINISH", false),
        ] {
            let a = ActionDescriptor {
                status: Some(status.into()),
                ..Default::default()
            };
            assert_eq!(a.is_terminal(), terminal, "status {status}");
        }
        assert!(!ActionDescriptor::default().is_terminal());
    }

    #[test]
    fn clear_requires_a_truthy_value() {
        for (raw, wants) in [
            (r#"{"CLEAR":true}"#, true),
            (r#"{"CLEAR":1}"#, true),
            (r#"{"CLEAR":"yes"}"#, true),
            (r#"{"CLEAR":false}"#, false),
            (r#"{"CLEAR":null}"#, false),
            (r#"{"CLEAR":0}"#, false),
            (r#"{}"#, false),
        ] {
            let a: ActionDescriptor = serde_json::from_str(raw).unwrap();
            assert_eq!(a.wants_clear(), wants, "raw {raw}");
        }
    }

    #[test]
    fn press_and_type_can_cooccur() {
        let a: ActionDescriptor =
            serde_json::from_str(r#"{"PRESS":"ENTER","TYPE":"hello%20world"}"#).unwrap();
        assert_eq!(a.press.as_deref(), Some("ENTER"));
        assert_eq!(a.type_text.as_deref(), Some("hello%20world"));
    }
}
