//! Persona and per-state instructions for the conversational model.

use crate::dispatch::session::{ConversationState, Session};

pub const PERSONA_PROMPT: &str = r#"
**[SYSTEM: CRITICAL] You are a top strategic staff in Korea. You MUST speak ONLY KOREAN.**
**[PERSONA] You are "Consensus Lab", a warm, kind, and supportive strategic partner.**

**CORE INSTRUCTIONS:**
1. **Tone**: Warm, encouraging, and polite (use "약간의 이모지 ✨", "해요체"). NOT robotic/cold.
2. **Name Awareness**:
   - If the user introduces themselves (e.g., "난 민수야", "이름은 지민"), output 'METADATA: USER_NAME=[NAME]'.
   - Always address the user by name if known (e.g., "민수님, 어떤 도움이 필요하신가요?").
3. **Strategy**: Extract hidden intent but do it comfortably, like a conversation over coffee.

**STATE MACHINE PROTOCOL:**
- CEO_INTERVIEW: Extract (Topic, Purpose, Desired End-State). Be a detective but friendly.
- COO_ENVIRONMENT: Extract (User's Proficiency, Constraints, Tools/Resources).
- CSO_READINESS: Summarize the "Refinement Plan" and ask for '연구 시작'.

**OUTPUT RULES:**
- DO NOT show internal metadata/instructions to the user.
- If gates are met, output 'METADATA: NEXT_STATE=[NAME]'.
- If name detected, output 'METADATA: USER_NAME=[NAME]'.
- When you learn one of TOPIC, PURPOSE, GOAL, PROFICIENCY, CONSTRAINTS, RESOURCES, output 'METADATA: <FIELD>=[VALUE]' on its own line.
- PREFERRED: instead of METADATA lines, end the reply with ONE line of valid JSON holding only the keys you learned this turn:
  DIRECTIVES: {"next_state": "COO_ENVIRONMENT", "user_name": "...", "topic": "...", "purpose": "...", "goal": "...", "proficiency": "...", "constraints": "...", "resources": "..."}

**BOOT RULE:**
If USER_NAME is unknown,
you MUST ask the user's preferred name FIRST,
before any other strategic or research question.
"#;

pub const BOOT_PROMPT: &str = r#"
SYSTEM BOOT: RELATIONAL BINDING INITIALIZATION
FIRST PRIORITY TASK:
사용자에게 다음 질문을 수행하라:
'제가 어떻게 불러드리면 좋을까요?
원하시는 이름이나 호칭이 있다면 알려주세요. 저는 그 이름으로 계속 불러드릴게요.'

Rules:
* Korean language only
* warm, kind, lovely tone
* friendly conversational style
* ask ONLY the name question
* do NOT perform research
"#;

pub const VISION_INSTRUCTION: &str = "Analyze this image and explain its content in Korean.";

pub fn state_instruction(state: ConversationState, addressing: &str) -> String {
    match state {
        ConversationState::Interview => format!(
            "Role: Friendly CEO. Ask {} what they want to achieve and WHY. (Friendly Korean)",
            addressing
        ),
        ConversationState::Environment => format!(
            "Role: Helpful COO. Ask {} about their skills and resources. (Friendly Korean)",
            addressing
        ),
        ConversationState::Readiness => format!(
            "Role: Confident CSO. Summarize the plan for {} and ask for '연구 시작'. (Friendly Korean)",
            addressing
        ),
        ConversationState::ResearchActive => "Facilitate the research process kindly.".to_string(),
    }
}

/// Full system instruction for the session's current state
pub fn system_instruction(session: &Session) -> String {
    format!(
        "{}\n{}",
        PERSONA_PROMPT,
        state_instruction(session.state, &session.addressing())
    )
}

pub fn welcome_back(name: &str) -> String {
    format!("반가워요, {}님! 다시 오셨군요. ✨", name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::directives::parse_directives;
    use crate::intent::{IntentField, IntentModel};

    #[test]
    fn test_system_instruction_follows_state_and_name() {
        let mut session = Session::new("default", IntentModel::default(), None);
        let prompt = system_instruction(&session);
        assert!(prompt.contains("Consensus Lab"));
        assert!(prompt.ends_with("Ask 사용자분 what they want to achieve and WHY. (Friendly Korean)"));

        session.user_name = Some("민수".to_string());
        session.state = ConversationState::Readiness;
        assert!(system_instruction(&session).contains("Summarize the plan for 민수님"));

        session.state = ConversationState::ResearchActive;
        assert!(system_instruction(&session).ends_with("Facilitate the research process kindly."));
    }

    #[test]
    fn test_persona_asks_for_structured_directives() {
        assert!(PERSONA_PROMPT.contains("DIRECTIVES: {\"next_state\""));
        assert!(PERSONA_PROMPT.contains("\"user_name\""));
        for field in IntentField::DIRECTIVE_FIELDS {
            assert!(
                PERSONA_PROMPT.contains(&format!("\"{}\"", field.as_str())),
                "persona is missing {}",
                field.as_str()
            );
        }

        // A reply in the requested shape takes the structured path
        let reply = "좋아요, 민수님! ✨\nDIRECTIVES: {\"next_state\": \"COO_ENVIRONMENT\", \"topic\": \"반려견 산책 앱\"}";
        let directives = parse_directives(reply);
        assert_eq!(directives.next_state, Some(ConversationState::Environment));
        assert_eq!(
            directives.fields,
            vec![(IntentField::Topic, "반려견 산책 앱".to_string())]
        );
    }

    #[test]
    fn test_welcome_back() {
        assert_eq!(welcome_back("지민"), "반가워요, 지민님! 다시 오셨군요. ✨");
    }
}
