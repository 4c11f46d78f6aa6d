//! Control directives embedded in conversational replies.
//!
//! Two formats are understood. A structured line is tried first:
//!
//! ```text
//! DIRECTIVES: {"next_state": "COO_ENVIRONMENT", "user_name": "민수", "topic": "모바일 앱"}
//! ```
//!
//! Without one, line-anchored markers are scanned:
//!
//! ```text
//! METADATA: NEXT_STATE=COO_ENVIRONMENT
//! METADATA: USER_NAME=[민수]
//! METADATA: TOPIC=모바일 앱 마케팅]
//! ```
//!
//! Marker values end at the first `]`, lose a leading `[` and are trimmed. Only the
//! first occurrence of each key counts. Anything malformed is skipped.

use crate::dispatch::session::ConversationState;
use crate::intent::IntentField;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use tracing::debug;

static METADATA_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[\s\[*>\-]*METADATA:\s*([A-Za-z_]+)\s*=(.*)$").expect("valid regex")
});

static DIRECTIVES_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[\s\[*>\-]*DIRECTIVES:\s*(\{.*\})\s*$").expect("valid regex")
});

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directives {
    /// Validated state transition
    pub next_state: Option<ConversationState>,
    /// State name the model announced that is not a known state
    pub rejected_state: Option<String>,
    pub user_name: Option<String>,
    /// Intent-field updates in announcement order
    pub fields: Vec<(IntentField, String)>,
}

impl Directives {
    pub fn is_empty(&self) -> bool {
        self.next_state.is_none()
            && self.rejected_state.is_none()
            && self.user_name.is_none()
            && self.fields.is_empty()
    }

    fn apply(&mut self, key: &str, value: &str) {
        let key = key.trim().to_ascii_uppercase();
        let value = clean_value(value);
        if value.is_empty() {
            debug!("Skipping empty directive {}", key);
            return;
        }

        match key.as_str() {
            "NEXT_STATE" => {
                if self.next_state.is_some() || self.rejected_state.is_some() {
                    return;
                }
                match ConversationState::from_directive(&value) {
                    Some(state) => self.next_state = Some(state),
                    None => self.rejected_state = Some(value),
                }
            }
            "USER_NAME" => {
                if self.user_name.is_none() {
                    self.user_name = Some(value);
                }
            }
            other => {
                let Some(field) = IntentField::DIRECTIVE_FIELDS
                    .iter()
                    .copied()
                    .find(|f| f.directive_key() == other)
                else {
                    debug!("Ignoring unknown directive {}", other);
                    return;
                };
                if !self.fields.iter().any(|(f, _)| *f == field) {
                    self.fields.push((field, value));
                }
            }
        }
    }
}

fn clean_value(raw: &str) -> String {
    let cut = raw.split(']').next().unwrap_or_default();
    cut.trim()
        .trim_start_matches('[')
        .trim_end_matches('*')
        .trim()
        .to_string()
}

/// Parse every directive in a conversational reply
pub fn parse_directives(text: &str) -> Directives {
    if let Some(directives) = parse_structured(text) {
        return directives;
    }

    let mut directives = Directives::default();
    for caps in METADATA_LINE.captures_iter(text) {
        let (Some(key), Some(value)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        directives.apply(key.as_str(), value.as_str());
    }
    directives
}

fn parse_structured(text: &str) -> Option<Directives> {
    let caps = DIRECTIVES_LINE.captures(text)?;
    let object = match serde_json::from_str::<Value>(caps.get(1)?.as_str()) {
        Ok(Value::Object(object)) => object,
        _ => {
            debug!("Malformed DIRECTIVES line, falling back to METADATA markers");
            return None;
        }
    };

    let mut directives = Directives::default();
    for (key, value) in &object {
        if let Value::String(value) = value {
            directives.apply(key, value);
        }
    }
    Some(directives)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_topic_value_cut_at_bracket() {
        let d = parse_directives("좋아요!\nMETADATA: TOPIC=모바일 앱 마케팅]");
        assert_eq!(
            d.fields,
            vec![(IntentField::Topic, "모바일 앱 마케팅".to_string())]
        );
    }

    #[test]
    fn test_state_and_name() {
        let d = parse_directives(
            "반가워요 민수님!\nMETADATA: USER_NAME=[민수]\nMETADATA: NEXT_STATE=COO_ENVIRONMENT",
        );
        assert_eq!(d.user_name.as_deref(), Some("민수"));
        assert_eq!(d.next_state, Some(ConversationState::Environment));
        assert!(d.rejected_state.is_none());
    }

    #[test]
    fn test_unknown_state_rejected() {
        let d = parse_directives("METADATA: NEXT_STATE=CFO_BUDGET");
        assert_eq!(d.next_state, None);
        assert_eq!(d.rejected_state.as_deref(), Some("CFO_BUDGET"));
    }

    #[test]
    fn test_first_occurrence_wins() {
        let d = parse_directives("METADATA: GOAL=첫번째 목표\nMETADATA: GOAL=두번째 목표");
        assert_eq!(d.fields, vec![(IntentField::Goal, "첫번째 목표".to_string())]);
    }

    #[rstest]
    #[case("METADATA: TOPIC=")]
    #[case("METADATA: TOPIC=]")]
    #[case("METADATA TOPIC=앱")]
    #[case("METADATA: FAVORITE_COLOR=blue")]
    #[case("그냥 대화입니다")]
    #[case("설명: METADATA: TOPIC=앱")]
    fn test_malformed_directives_ignored(#[case] text: &str) {
        assert!(parse_directives(text).is_empty());
    }

    #[test]
    fn test_decorated_lines_accepted() {
        let d = parse_directives("**METADATA: PURPOSE=부업 수익**\n[METADATA: RESOURCES=노트북]");
        assert_eq!(
            d.fields,
            vec![
                (IntentField::Purpose, "부업 수익".to_string()),
                (IntentField::Resources, "노트북".to_string()),
            ]
        );
    }

    #[test]
    fn test_structured_line_takes_precedence() {
        let text = "좋아요\nDIRECTIVES: {\"next_state\": \"READINESS\", \"goal\": \"앱 출시\", \"user_name\": \"지민\"}\nMETADATA: TOPIC=무시됨";
        let d = parse_directives(text);
        assert_eq!(d.next_state, Some(ConversationState::Readiness));
        assert_eq!(d.user_name.as_deref(), Some("지민"));
        assert_eq!(d.fields, vec![(IntentField::Goal, "앱 출시".to_string())]);
    }

    #[test]
    fn test_malformed_structured_line_falls_back() {
        let d = parse_directives("DIRECTIVES: {not json}\nMETADATA: TOPIC=헬스케어");
        assert_eq!(d.fields, vec![(IntentField::Topic, "헬스케어".to_string())]);
    }
}
