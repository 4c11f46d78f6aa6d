//! Mock implementations for testing.
//!
//! Scripted LLM and search doubles shared by the integration tests. The LLM mock
//! recognises which pipeline stage is calling it from the prompt text, so one
//! instance can stand in for a provider across a whole research run.

use acip::llm::{LLMClient, VisionClient};
use acip::tools::{SearchHit, SearchProvider, SearchResponse};
use acip::types::{AppError, Message, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Which kind of call the mock is answering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Profile,
    Analysis,
    Synthesis,
    Conversation,
    Other,
}

impl Stage {
    fn of(prompt: &str) -> Self {
        if prompt.contains("[Role: Mission Profiler]") {
            Stage::Profile
        } else if prompt.contains("[Agent: Reviewer]") {
            Stage::Analysis
        } else if prompt.contains("Chief Strategic Synthesizer") {
            Stage::Synthesis
        } else {
            Stage::Other
        }
    }
}

pub const REPORT_JSON: &str = r#"```json
{
  "verified_truth": "반려견 산책 앱은 구독과 제휴 광고로 수익화한다",
  "conflicts": "광고 과다 시 이탈 위험",
  "plan_a": {"title": "프리미엄 구독", "content": "산책 기록 분석 유료화"},
  "plan_b": {"title": "제휴 커머스", "content": "사료 브랜드 제휴"},
  "plan_c": {"title": "지역 광고", "content": "동네 동물병원 광고"},
  "next_action": "경쟁 앱 3곳 가격표 조사"
}
```"#;

/// Scripted LLM client.
///
/// ```ignore
/// let llm = MockLLMClient::new().with_reply("반가워요").failing_on(Stage::Synthesis);
/// ```
#[derive(Clone)]
pub struct MockLLMClient {
    model: String,
    mode: String,
    reply: String,
    analysis: String,
    synthesis: String,
    profile: Option<String>,
    fail_on: Vec<Stage>,
    stall_on: Vec<Stage>,
    prompts: Arc<Mutex<Vec<String>>>,
    systems: Arc<Mutex<Vec<String>>>,
    histories: Arc<Mutex<Vec<Vec<Message>>>>,
}

impl Default for MockLLMClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLLMClient {
    pub fn new() -> Self {
        Self {
            model: "mock-primary".to_string(),
            mode: "DEEP".to_string(),
            reply: "좋아요! 조금 더 알려주세요.".to_string(),
            analysis: "주요 사실: 시장 성장 중".to_string(),
            synthesis: REPORT_JSON.to_string(),
            profile: None,
            fail_on: Vec::new(),
            stall_on: Vec::new(),
            prompts: Arc::default(),
            systems: Arc::default(),
            histories: Arc::default(),
        }
    }

    pub fn named(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    /// Conversational reply
    pub fn with_reply(mut self, reply: &str) -> Self {
        self.reply = reply.to_string();
        self
    }

    pub fn with_analysis(mut self, analysis: &str) -> Self {
        self.analysis = analysis.to_string();
        self
    }

    pub fn with_synthesis(mut self, synthesis: &str) -> Self {
        self.synthesis = synthesis.to_string();
        self
    }

    /// Fixed profiler reply; by default the profiler echoes the input as the query
    pub fn with_profile(mut self, profile: &str) -> Self {
        self.profile = Some(profile.to_string());
        self
    }

    pub fn with_mode(mut self, mode: &str) -> Self {
        self.mode = mode.to_string();
        self
    }

    pub fn failing_on(mut self, stage: Stage) -> Self {
        self.fail_on.push(stage);
        self
    }

    /// Calls for `stage` never resolve
    pub fn stalling_on(mut self, stage: Stage) -> Self {
        self.stall_on.push(stage);
        self
    }

    /// Fails every call
    pub fn failing() -> Self {
        let mut client = Self::new();
        client.fail_on = vec![
            Stage::Profile,
            Stage::Analysis,
            Stage::Synthesis,
            Stage::Conversation,
            Stage::Other,
        ];
        client
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    pub fn prompts_for(&self, stage: Stage) -> Vec<String> {
        self.prompts
            .lock()
            .iter()
            .filter(|p| Stage::of(p) == stage)
            .cloned()
            .collect()
    }

    pub fn systems(&self) -> Vec<String> {
        self.systems.lock().clone()
    }

    pub fn histories(&self) -> Vec<Vec<Message>> {
        self.histories.lock().clone()
    }

    fn fail(&self, stage: Stage) -> Result<String> {
        Err(AppError::Provider(format!("Mock {:?} failure", stage)))
    }

    fn profile_for(&self, prompt: &str) -> String {
        if let Some(profile) = &self.profile {
            return profile.clone();
        }
        let input = prompt
            .split("User Input:")
            .nth(1)
            .unwrap_or_default()
            .trim();
        serde_json::json!({
            "type": "BUSINESS",
            "mode": self.mode,
            "depth": "DEEP",
            "risk": "MEDIUM",
            "search_query": input,
        })
        .to_string()
    }
}

#[async_trait]
impl LLMClient for MockLLMClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().push(prompt.to_string());
        let stage = Stage::of(prompt);
        if self.stall_on.contains(&stage) {
            std::future::pending::<()>().await;
        }
        if self.fail_on.contains(&stage) {
            return self.fail(stage);
        }

        Ok(match stage {
            Stage::Profile => self.profile_for(prompt),
            Stage::Analysis => self.analysis.clone(),
            Stage::Synthesis => self.synthesis.clone(),
            Stage::Conversation | Stage::Other => self.reply.clone(),
        })
    }

    async fn generate_with_history(&self, system: &str, history: &[Message]) -> Result<String> {
        self.systems.lock().push(system.to_string());
        self.histories.lock().push(history.to_vec());
        if self.stall_on.contains(&Stage::Conversation) {
            std::future::pending::<()>().await;
        }
        if self.fail_on.contains(&Stage::Conversation) {
            return self.fail(Stage::Conversation);
        }
        Ok(self.reply.clone())
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Vision double returning a fixed description
pub struct MockVision {
    pub description: Option<String>,
}

#[async_trait]
impl VisionClient for MockVision {
    async fn describe_image(
        &self,
        _instruction: &str,
        _image: &[u8],
        _mime_type: &str,
    ) -> Result<String> {
        self.description
            .clone()
            .ok_or_else(|| AppError::Provider("Mock vision failure".to_string()))
    }
}

/// Search double: canned hits, an empty result, or an outage (`None`)
#[derive(Clone)]
pub struct MockSearch {
    response: Option<SearchResponse>,
    stall: bool,
    cancels: Option<CancellationToken>,
    queries: Arc<Mutex<Vec<String>>>,
}

impl MockSearch {
    pub fn with_hits(hits: &[(&str, &str)]) -> Self {
        let results = hits
            .iter()
            .map(|(title, url)| SearchHit {
                title: title.to_string(),
                url: url.to_string(),
                content: format!("{} 요약", title),
                score: Some(0.9),
            })
            .collect();
        Self {
            response: Some(SearchResponse {
                answer: None,
                results,
            }),
            stall: false,
            cancels: None,
            queries: Arc::default(),
        }
    }

    pub fn empty() -> Self {
        Self {
            response: Some(SearchResponse::default()),
            stall: false,
            cancels: None,
            queries: Arc::default(),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            response: None,
            stall: false,
            cancels: None,
            queries: Arc::default(),
        }
    }

    /// Never answers
    pub fn stalled() -> Self {
        Self {
            stall: true,
            ..Self::unavailable()
        }
    }

    /// Cancels `token` mid-search, as Ctrl-C would, then never answers
    pub fn cancelling(token: CancellationToken) -> Self {
        Self {
            cancels: Some(token),
            ..Self::stalled()
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }
}

#[async_trait]
impl SearchProvider for MockSearch {
    async fn search(&self, query: &str) -> Option<SearchResponse> {
        self.queries.lock().push(query.to_string());
        if let Some(token) = &self.cancels {
            token.cancel();
        }
        if self.stall {
            std::future::pending::<()>().await;
        }
        self.response.clone()
    }

    fn name(&self) -> &str {
        "mock"
    }
}
