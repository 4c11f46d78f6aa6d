//! Intent-gated dispatch controller
//!
//! Per user turn, the [`DispatchController`] decides between continuing the
//! conversational intake and launching the research pipeline:
//!
//! 1. A trigger phrase ("연구 시작", "리서치 시작") forces research. The mission seed
//!    is the last non-trigger user text, else the intent goal, topic or purpose, else a
//!    fixed default.
//! 2. In `ResearchActive` every turn goes to the pipeline.
//! 3. Otherwise the input is profiled and the readiness gate decides: research when the
//!    intent record is ready, conversation when it is not.
//!
//! Conversational replies carry control directives (state transitions, the user's
//! name, intent fields) which are applied to the session and persisted before the
//! sanitized reply is returned.

pub mod directives;
pub mod prompts;
pub mod session;

pub use directives::{parse_directives, Directives};
pub use session::{ConversationState, Session};

use crate::db::KvStore;
use crate::intent::{IntentField, IntentModel, IntentStore, ReadinessPolicy};
use crate::llm::{CallGuard, LLMClient, Provider, Timeouts, VisionClient};
use crate::memory::{format_history, recent, truncate_history};
use crate::profiler::MissionProfile;
use crate::research::{Report, ResearchPipeline, ResearchProgress};
use crate::sanitizer::sanitize;
use crate::tools::{SearchProvider, TavilySearch};
use crate::types::{AppError, Message, Result};
use crate::utils::credentials::resolve_credential;
use crate::utils::text::non_empty;
use crate::utils::toml_config::{AcipConfig, DispatchConfig, SearchBackend};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, trace, warn, Instrument};
use uuid::Uuid;

/// Shown instead of running a turn when the primary provider has no credential
pub const MISSING_KEY_MESSAGE: &str = "앗, 먼저 API 키를 입력해 주세요! 🔑";

pub const IMAGE_FAILURE_MESSAGE: &str = "이미지 분석 중 오류가 발생했습니다.";

/// Seed used by the forced trigger when nothing else is known
pub const FORCED_DEFAULT_SEED: &str = "앱 수익화 전략";

/// Gating knobs; reloadable between turns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchPolicy {
    pub triggers: Vec<String>,
    pub readiness: ReadinessPolicy,
    pub history_window: usize,
}

impl Default for DispatchPolicy {
    fn default() -> Self {
        Self::from_config(&DispatchConfig::default())
    }
}

impl DispatchPolicy {
    pub fn from_config(config: &DispatchConfig) -> Self {
        Self {
            triggers: config
                .trigger_phrases
                .iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
            readiness: ReadinessPolicy {
                threshold: config.readiness_threshold,
                min_chars: config.min_field_chars,
            },
            history_window: config.history_window.max(1),
        }
    }

    pub fn is_trigger(&self, text: &str) -> bool {
        self.triggers.iter().any(|t| text.contains(t.as_str()))
    }
}

/// What a turn produced for the presentation layer
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// Sanitized conversational reply
    Reply(String),
    Report(Report),
    /// User-facing apology after a provider failure
    Apology(String),
    /// Nothing to show (empty input, or the reply sanitized to nothing)
    Silent,
    Cancelled,
}

pub struct DispatchController {
    conversational: Arc<dyn LLMClient>,
    vision: Option<Arc<dyn VisionClient>>,
    pipeline: ResearchPipeline,
    intents: IntentStore,
    policy: DispatchPolicy,
    session_id: String,
    timeouts: Timeouts,
}

impl DispatchController {
    pub fn new(
        conversational: Arc<dyn LLMClient>,
        pipeline: ResearchPipeline,
        intents: IntentStore,
        session_id: impl Into<String>,
        timeouts: Timeouts,
    ) -> Self {
        Self {
            conversational,
            vision: None,
            pipeline,
            intents,
            policy: DispatchPolicy::default(),
            session_id: session_id.into(),
            timeouts,
        }
    }

    pub fn with_vision(mut self, vision: Arc<dyn VisionClient>) -> Self {
        self.vision = Some(vision);
        self
    }

    pub fn with_policy(mut self, policy: DispatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_progress(mut self, progress: UnboundedSender<ResearchProgress>) -> Self {
        self.pipeline = self.pipeline.with_progress(progress);
        self
    }

    /// Wire providers, search and storage from configuration.
    ///
    /// # Errors
    ///
    /// `AppError::CredentialMissing` when the primary provider has no credential;
    /// `AppError::Config` when a research role names an unknown provider.
    pub async fn from_config(config: &AcipConfig, store: Arc<dyn KvStore>) -> Result<Self> {
        let primary_name = config.research.primary.as_str();
        let primary_config = config.get_provider(primary_name).ok_or_else(|| {
            AppError::Config(format!("Unknown primary provider '{}'", primary_name))
        })?;
        let primary_key = match primary_config.credential_env() {
            Some(env) => resolve_credential(env, store.as_ref()).await,
            None => None,
        };
        let primary = Provider::from_config(primary_config, primary_key)?;
        info!("Primary provider: {} ({})", primary_name, primary.name());

        let timeouts = Timeouts::from_config(config);
        let mut pipeline = ResearchPipeline::new(primary.create_client(), timeouts)
            .with_max_query_chars(config.research.max_query_chars);

        if let Some(secondary_name) = config.research.secondary_name() {
            let secondary_config = config.get_provider(secondary_name).ok_or_else(|| {
                AppError::Config(format!("Unknown secondary provider '{}'", secondary_name))
            })?;
            let key = match secondary_config.credential_env() {
                Some(env) => resolve_credential(env, store.as_ref()).await,
                None => None,
            };
            match Provider::from_config(secondary_config, key) {
                Ok(secondary) => {
                    info!("Secondary provider: {} ({})", secondary_name, secondary.name());
                    pipeline = pipeline.with_secondary(secondary.create_client());
                }
                Err(AppError::CredentialMissing(env)) => {
                    info!("Secondary provider disabled: {} not set", env);
                }
                Err(e) => return Err(e),
            }
        }

        if let Some(search) = Self::search_from_config(config, store.as_ref()).await {
            pipeline = pipeline.with_search(search);
        }

        let mut controller = Self::new(
            primary.create_client(),
            pipeline,
            IntentStore::new(store, &config.app.session_id),
            config.app.session_id.clone(),
            timeouts,
        )
        .with_policy(DispatchPolicy::from_config(&config.dispatch));

        if let Some(vision) = primary.create_vision_client() {
            controller = controller.with_vision(vision);
        }

        Ok(controller)
    }

    async fn search_from_config(
        config: &AcipConfig,
        store: &dyn KvStore,
    ) -> Option<Arc<dyn SearchProvider>> {
        match config.search.provider {
            SearchBackend::Tavily => {
                let Some(key) = resolve_credential(&config.search.api_key_env, store).await else {
                    info!(
                        "Web search disabled: {} not set",
                        config.search.api_key_env
                    );
                    return None;
                };
                Some(Arc::new(
                    TavilySearch::new(key)
                        .with_api_base(config.search.api_base.clone())
                        .with_max_results(config.search.max_results)
                        .with_search_depth(config.search.search_depth.clone()),
                ))
            }
            #[cfg(feature = "duckduckgo")]
            SearchBackend::DuckDuckGo => Some(Arc::new(crate::tools::DuckDuckGoSearch::new(
                config.search.max_results,
            ))),
            #[cfg(not(feature = "duckduckgo"))]
            SearchBackend::DuckDuckGo => {
                warn!("DuckDuckGo search requested but the `duckduckgo` feature is disabled");
                None
            }
            SearchBackend::None => None,
        }
    }

    pub fn policy(&self) -> &DispatchPolicy {
        &self.policy
    }

    pub fn set_policy(&mut self, policy: DispatchPolicy) {
        if policy != self.policy {
            info!("Dispatch policy updated");
            self.policy = policy;
        }
    }

    pub fn pipeline(&self) -> &ResearchPipeline {
        &self.pipeline
    }

    pub fn intents(&self) -> &IntentStore {
        &self.intents
    }

    /// Restore the persisted intent record and user name into a fresh session
    pub async fn open_session(&self) -> Session {
        let intent = self.intents.load().await;
        let user_name = match non_empty(intent.user_name.as_deref()) {
            Some(name) => Some(name.to_string()),
            None => self.intents.load_user_name().await,
        };
        Session::new(self.session_id.clone(), intent, user_name)
    }

    /// Greet a returning user, or ask a new one for their preferred name.
    pub async fn boot(&self, session: &mut Session, cancel: &CancellationToken) -> TurnOutcome {
        if let Some(name) = session.user_name.as_deref() {
            return TurnOutcome::Reply(prompts::welcome_back(name));
        }

        info!("[Boot] Unknown user, asking for a name");
        match self.exchange(session, prompts::BOOT_PROMPT, cancel).await {
            Ok(reply) => self.finish_reply(session, &reply).await,
            Err(AppError::Cancelled) => TurnOutcome::Cancelled,
            Err(e) => {
                error!("[Boot] Boot sequence failed: {}", e);
                TurnOutcome::Silent
            }
        }
    }

    /// Handle one user turn
    pub async fn handle_turn(
        &self,
        session: &mut Session,
        text: &str,
        cancel: &CancellationToken,
    ) -> TurnOutcome {
        let text = text.trim();
        if text.is_empty() {
            return TurnOutcome::Silent;
        }

        let span = info_span!("turn", id = %Uuid::new_v4(), state = %session.state);
        self.dispatch(session, text, cancel).instrument(span).await
    }

    async fn dispatch(
        &self,
        session: &mut Session,
        text: &str,
        cancel: &CancellationToken,
    ) -> TurnOutcome {
        if self.policy.is_trigger(text) {
            info!("[Dispatch] Force research trigger");
            return self.research_now(session, cancel).await;
        }
        session.last_mission_text = Some(text.to_string());

        if session.state == ConversationState::ResearchActive {
            debug!("[Dispatch] Research active, routing to pipeline");
            return self.research_from_seed(session, text, cancel).await;
        }

        let profile = match self.pipeline.profiler().classify(text, cancel).await {
            Ok(profile) => profile,
            Err(_) => return TurnOutcome::Cancelled,
        };

        let ready = self.policy.readiness.is_ready(&session.intent);
        info!("[Dispatch] Intent readiness: {}", ready);
        if ready {
            info!("[Dispatch] IntentModel ready, launching research");
            return self.research(session, Some(profile), cancel).await;
        }

        debug!("[Dispatch] IntentModel incomplete, continuing intake");
        self.converse(session, text, cancel).await
    }

    /// Mission seed for a forced trigger
    pub fn forced_seed(session: &Session) -> String {
        let intent = &session.intent;
        [
            session.last_mission_text.as_deref(),
            intent.goal.as_deref(),
            intent.topic.as_deref(),
            intent.purpose.as_deref(),
        ]
        .into_iter()
        .find_map(non_empty)
        .unwrap_or(FORCED_DEFAULT_SEED)
        .to_string()
    }

    /// Run research immediately, whatever the intake state
    pub async fn research_now(&self, session: &mut Session, cancel: &CancellationToken) -> TurnOutcome {
        let seed = Self::forced_seed(session);
        info!("[Dispatch] Mission seed: {}", seed);
        self.research_from_seed(session, &seed, cancel).await
    }

    async fn research_from_seed(
        &self,
        session: &mut Session,
        seed: &str,
        cancel: &CancellationToken,
    ) -> TurnOutcome {
        match self.pipeline.profiler().classify(seed, cancel).await {
            Ok(profile) => self.research(session, Some(profile), cancel).await,
            Err(_) => TurnOutcome::Cancelled,
        }
    }

    async fn research(
        &self,
        session: &mut Session,
        profile: Option<MissionProfile>,
        cancel: &CancellationToken,
    ) -> TurnOutcome {
        let previous = session.state;
        if previous != ConversationState::ResearchActive {
            info!("[Dispatch] State {} -> {}", previous, ConversationState::ResearchActive);
            session.state = ConversationState::ResearchActive;
        }

        match self
            .pipeline
            .run(&session.intent, profile, session.image_context.as_deref(), cancel)
            .await
        {
            Ok(report) => TurnOutcome::Report(report),
            Err(AppError::Cancelled) => {
                // A cancelled turn leaves the session as it found it
                session.state = previous;
                TurnOutcome::Cancelled
            }
            Err(e) => {
                error!("[Dispatch] Research failed: {}", e);
                TurnOutcome::Apology(format!("자동 리서치 실행 중 오류가 발생했습니다: {}", e.message()))
            }
        }
    }

    async fn converse(&self, session: &mut Session, text: &str, cancel: &CancellationToken) -> TurnOutcome {
        match self.exchange(session, text, cancel).await {
            Ok(reply) => self.finish_reply(session, &reply).await,
            Err(AppError::Cancelled) => TurnOutcome::Cancelled,
            Err(e) => {
                warn!("[Dispatch] Conversational call failed: {}", e);
                TurnOutcome::Apology(format!("앗, 문제가 생겼어요: {} 🥺", e.message()))
            }
        }
    }

    /// One conversational round trip. The user message is kept in history only when
    /// the call succeeds.
    async fn exchange(
        &self,
        session: &mut Session,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<String> {
        session.history.push(Message::user(text));
        let system = prompts::system_instruction(session);
        let guard = CallGuard::new(self.timeouts.llm, cancel.clone());

        let window = recent(&session.history, self.policy.history_window);
        trace!("[Dispatch] Conversation window:\n{}", format_history(window));
        let result = guard
            .run(
                "conversation",
                self.conversational.generate_with_history(&system, window),
            )
            .await;

        match result {
            Ok(reply) => {
                session.history.push(Message::assistant(reply.clone()));
                truncate_history(&mut session.history, self.policy.history_window);
                Ok(reply)
            }
            Err(e) => {
                session.history.pop();
                Err(e)
            }
        }
    }

    async fn finish_reply(&self, session: &mut Session, reply: &str) -> TurnOutcome {
        let directives = parse_directives(reply);
        if !directives.is_empty() {
            self.apply_directives(session, &directives).await;
        }

        let visible = sanitize(reply);
        if visible.is_empty() {
            debug!("[Dispatch] Reply sanitized to nothing");
            TurnOutcome::Silent
        } else {
            TurnOutcome::Reply(visible)
        }
    }

    /// Apply parsed directives. Persistence failures are logged, not surfaced.
    pub async fn apply_directives(&self, session: &mut Session, directives: &Directives) {
        if let Some(state) = directives.next_state {
            if state != session.state {
                info!("[Dispatch] State {} -> {}", session.state, state);
                session.state = state;
            }
        }
        if let Some(rejected) = &directives.rejected_state {
            warn!("[Dispatch] Ignoring unknown state '{}'", rejected);
        }

        if let Some(name) = &directives.user_name {
            info!("[Dispatch] User name set");
            session.user_name = Some(name.clone());
            if let Err(e) = self.intents.save_user_name(name).await {
                warn!("Failed to persist user name: {}", e);
            }
            if let Err(e) = self
                .intents
                .update(&mut session.intent, IntentField::UserName, name)
                .await
            {
                warn!("Failed to persist intent model: {}", e);
            }
        }

        for (field, value) in &directives.fields {
            if let Err(e) = self.intents.update(&mut session.intent, *field, value).await {
                warn!("Failed to persist intent field {}: {}", field.as_str(), e);
            }
        }
    }

    /// Describe an uploaded image and keep the description as research context
    pub async fn describe_image(
        &self,
        session: &mut Session,
        image: &[u8],
        mime_type: &str,
        cancel: &CancellationToken,
    ) -> TurnOutcome {
        let Some(vision) = &self.vision else {
            warn!("[Vision] Primary provider cannot describe images");
            return TurnOutcome::Apology(IMAGE_FAILURE_MESSAGE.to_string());
        };

        let guard = CallGuard::new(self.timeouts.llm, cancel.clone());
        match guard
            .run(
                "vision",
                vision.describe_image(prompts::VISION_INSTRUCTION, image, mime_type),
            )
            .await
        {
            Ok(description) => {
                info!("[Vision] Image described ({} bytes, {})", image.len(), mime_type);
                session.image_context = Some(description.clone());
                let visible = sanitize(&description);
                if visible.is_empty() {
                    TurnOutcome::Silent
                } else {
                    TurnOutcome::Reply(visible)
                }
            }
            Err(AppError::Cancelled) => TurnOutcome::Cancelled,
            Err(e) => {
                error!("[Vision] Image analysis failed: {}", e);
                TurnOutcome::Apology(IMAGE_FAILURE_MESSAGE.to_string())
            }
        }
    }

    /// Clear the persisted intent record and restart intake
    pub async fn reset_intent(&self, session: &mut Session) -> Result<()> {
        self.intents.reset().await?;
        session.intent = IntentModel::default();
        if let Some(name) = session.user_name.clone() {
            session.intent.user_name = Some(name);
        }
        session.reset();
        Ok(())
    }
}
