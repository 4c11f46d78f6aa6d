use crate::intent::IntentModel;
use crate::types::Message;
use std::fmt;

/// Intake progression; transitions are announced by the conversational model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConversationState {
    #[default]
    Interview,
    Environment,
    Readiness,
    ResearchActive,
}

impl ConversationState {
    pub const ALL: [ConversationState; 4] = [
        ConversationState::Interview,
        ConversationState::Environment,
        ConversationState::Readiness,
        ConversationState::ResearchActive,
    ];

    /// Name used in directives and shown as the state badge
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationState::Interview => "CEO_INTERVIEW",
            ConversationState::Environment => "COO_ENVIRONMENT",
            ConversationState::Readiness => "CSO_READINESS",
            ConversationState::ResearchActive => "RESEARCH_ACTIVE",
        }
    }

    /// Validate a state name announced by the model against the closed set of states.
    pub fn from_directive(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "CEO_INTERVIEW" | "INTERVIEW" => Some(ConversationState::Interview),
            "COO_ENVIRONMENT" | "ENVIRONMENT" => Some(ConversationState::Environment),
            "CSO_READINESS" | "READINESS" => Some(ConversationState::Readiness),
            "RESEARCH_ACTIVE" => Some(ConversationState::ResearchActive),
            _ => None,
        }
    }
}

impl fmt::Display for ConversationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything one logical session carries between turns
#[derive(Debug, Clone)]
pub struct Session {
    /// Storage key suffix for the intent record
    pub id: String,
    pub state: ConversationState,
    pub user_name: Option<String>,
    pub history: Vec<Message>,
    /// Most recent user text that was not a trigger phrase
    pub last_mission_text: Option<String>,
    /// Latest image description, fed into the research briefing
    pub image_context: Option<String>,
    pub intent: IntentModel,
}

impl Session {
    pub fn new(id: impl Into<String>, intent: IntentModel, user_name: Option<String>) -> Self {
        Self {
            id: id.into(),
            state: ConversationState::Interview,
            user_name,
            history: Vec::new(),
            last_mission_text: None,
            image_context: None,
            intent,
        }
    }

    /// Back to intake. The intent record and user name survive.
    pub fn reset(&mut self) {
        self.state = ConversationState::Interview;
        self.history.clear();
        self.last_mission_text = None;
        self.image_context = None;
    }

    /// How the model should address the user
    pub fn addressing(&self) -> String {
        match self.user_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => format!("{}님", name),
            _ => "사용자분".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("CEO_INTERVIEW", Some(ConversationState::Interview))]
    #[case("COO_ENVIRONMENT", Some(ConversationState::Environment))]
    #[case("readiness", Some(ConversationState::Readiness))]
    #[case(" RESEARCH_ACTIVE ", Some(ConversationState::ResearchActive))]
    #[case("CFO_BUDGET", None)]
    #[case("", None)]
    fn test_state_validation(#[case] name: &str, #[case] expected: Option<ConversationState>) {
        assert_eq!(ConversationState::from_directive(name), expected);
    }

    #[test]
    fn test_names_round_trip() {
        for state in ConversationState::ALL {
            assert_eq!(ConversationState::from_directive(state.as_str()), Some(state));
        }
    }

    #[test]
    fn test_reset_keeps_intent_and_name() {
        let mut intent = IntentModel::default();
        intent.topic = Some("모바일 앱".to_string());
        let mut session = Session::new("default", intent, Some("민수".to_string()));
        session.state = ConversationState::ResearchActive;
        session.history.push(Message::user("안녕"));
        session.last_mission_text = Some("앱 수익화".to_string());
        session.image_context = Some("사진".to_string());

        session.reset();

        assert_eq!(session.state, ConversationState::Interview);
        assert!(session.history.is_empty());
        assert!(session.last_mission_text.is_none());
        assert!(session.image_context.is_none());
        assert_eq!(session.intent.topic.as_deref(), Some("모바일 앱"));
        assert_eq!(session.user_name.as_deref(), Some("민수"));
    }

    #[test]
    fn test_addressing() {
        let mut session = Session::new("default", IntentModel::default(), None);
        assert_eq!(session.addressing(), "사용자분");
        session.user_name = Some("지민".to_string());
        assert_eq!(session.addressing(), "지민님");
    }
}
