use crate::intent::IntentModel;
use crate::llm::{CallGuard, LLMClient, Timeouts};
use crate::profiler::{MissionProfile, MissionProfiler};
use crate::research::prompts::{
    analysis_prompt, briefing, synthesis_prompt, DEFAULT_PIPELINE_MISSION, NO_LIVE_DATA,
    SECONDARY_UNAVAILABLE,
};
use crate::research::report::{Evidence, Report, ResearchProgress};
use crate::tools::SearchProvider;
use crate::types::{AppError, Result};
use crate::utils::text::{non_empty, strip_code_fences, trimmed_char_len, truncate_chars};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Search, parallel analysis and synthesis into a [`Report`].
///
/// Every stage degrades instead of failing: no search data becomes a placeholder,
/// a failing secondary analysis becomes a placeholder, a failing secondary synthesis
/// is retried on the primary, and unparseable synthesis output becomes a degraded
/// report. Only primary-provider failures and cancellation surface as `Err`.
pub struct ResearchPipeline {
    primary: Arc<dyn LLMClient>,
    secondary: Option<Arc<dyn LLMClient>>,
    search: Option<Arc<dyn SearchProvider>>,
    profiler: MissionProfiler,
    timeouts: Timeouts,
    max_query_chars: usize,
    progress: Option<UnboundedSender<ResearchProgress>>,
}

impl ResearchPipeline {
    pub fn new(primary: Arc<dyn LLMClient>, timeouts: Timeouts) -> Self {
        Self {
            profiler: MissionProfiler::new(primary.clone(), timeouts.llm),
            primary,
            secondary: None,
            search: None,
            timeouts,
            max_query_chars: 100,
            progress: None,
        }
    }

    pub fn with_secondary(mut self, secondary: Arc<dyn LLMClient>) -> Self {
        self.secondary = Some(secondary);
        self
    }

    pub fn with_search(mut self, search: Arc<dyn SearchProvider>) -> Self {
        self.search = Some(search);
        self
    }

    pub fn with_progress(mut self, progress: UnboundedSender<ResearchProgress>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_max_query_chars(mut self, max_query_chars: usize) -> Self {
        self.max_query_chars = max_query_chars.max(1);
        self
    }

    pub fn profiler(&self) -> &MissionProfiler {
        &self.profiler
    }

    pub fn has_secondary(&self) -> bool {
        self.secondary.is_some()
    }

    /// Research brief for the current intent; used for self-profiling
    pub fn briefing(&self, intent: &IntentModel, image_context: Option<&str>) -> String {
        briefing(intent, image_context)
    }

    /// Pick the mission text: a usable profile query first, then the intent record,
    /// then a fixed default.
    pub fn resolve_mission(&self, profile: &MissionProfile, intent: &IntentModel) -> String {
        if trimmed_char_len(&profile.search_query) > 5 {
            debug!("Mission from profile search query");
            return profile.search_query.clone();
        }

        let mut mission = String::new();
        if non_empty(intent.goal.as_deref()).is_some() || non_empty(intent.topic.as_deref()).is_some() {
            mission = format!(
                "Topic: {}\nGoal: {}\nPurpose: {}",
                intent.topic.as_deref().unwrap_or_default(),
                intent.goal.as_deref().unwrap_or_default(),
                intent.purpose.as_deref().unwrap_or_default(),
            )
            .trim()
            .to_string();
            debug!("Mission from intent record");
        }

        if trimmed_char_len(&mission) < 5 {
            info!("Falling back to default mission");
            mission = DEFAULT_PIPELINE_MISSION.to_string();
        }
        mission
    }

    /// Run one research invocation.
    ///
    /// Without a `profile`, the briefing built from `intent` is profiled first.
    pub async fn run(
        &self,
        intent: &IntentModel,
        profile: Option<MissionProfile>,
        image_context: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Report> {
        let profile = match profile {
            Some(profile) => profile,
            None => {
                info!("[Research] Auto-profiling mission");
                let brief = self.briefing(intent, image_context);
                self.profiler
                    .classify(&format!("Check mode for: {}", brief), cancel)
                    .await?
            }
        };

        self.emit(ResearchProgress::Started {
            mode: profile.mode,
            user_name: intent.user_name.clone(),
        });

        let mission = self.resolve_mission(&profile, intent);
        info!("[Research] Mission: {} ({} mode)", mission, profile.mode);

        // Stage 1: search
        self.emit(ResearchProgress::Searching);
        let (search_results, evidence) = self.gather(&profile, &mission, cancel).await?;

        // Stage 2: analysis fan-out
        self.emit(ResearchProgress::Analyzing {
            cross_check: self.secondary.is_some(),
        });
        let prompt = analysis_prompt(&mission, profile.mode, &search_results);
        let (primary_analysis, secondary_analysis) = self.analyze(&prompt, cancel).await?;

        // Stage 3: synthesis
        self.emit(ResearchProgress::Synthesizing { mode: profile.mode });
        let prompt = synthesis_prompt(
            &mission,
            profile.mode,
            &primary_analysis,
            &secondary_analysis,
        );
        let raw = self.synthesize(&prompt, cancel).await?;
        let clean = strip_code_fences(&raw);

        let report = match Report::parse(&clean, evidence.clone()) {
            Some(report) => report,
            None => {
                warn!("[Research] Synthesis output is not a JSON object, degrading report");
                Report::degraded(&clean, evidence)
            }
        };

        self.emit(ResearchProgress::Completed);
        info!("[Research] Completed");
        Ok(report)
    }

    async fn gather(
        &self,
        profile: &MissionProfile,
        mission: &str,
        cancel: &CancellationToken,
    ) -> Result<(String, Vec<Evidence>)> {
        let Some(search) = &self.search else {
            debug!("[Research] No search provider configured");
            return Ok(Self::no_live_data());
        };

        let query = match non_empty(Some(profile.search_query.as_str())) {
            Some(query) => query.to_string(),
            None => truncate_chars(mission, self.max_query_chars),
        };
        info!("[Research] Searching via {}: {}", search.name(), query);

        let guard = CallGuard::new(self.timeouts.search, cancel.clone());
        match guard
            .run("web search", async { Ok(search.search(&query).await) })
            .await
        {
            Ok(Some(response)) if !response.results.is_empty() => {
                let evidence = response
                    .results
                    .iter()
                    .map(|hit| Evidence {
                        title: hit.title.clone(),
                        url: hit.url.clone(),
                    })
                    .collect();
                let results = serde_json::to_string_pretty(&response.results).unwrap_or_default();
                info!("[Research] {} search results", response.results.len());
                Ok((results, evidence))
            }
            Ok(_) => {
                warn!("[Research] Search returned no data, using internal knowledge");
                Ok(Self::no_live_data())
            }
            Err(AppError::Cancelled) => Err(AppError::Cancelled),
            Err(e) => {
                warn!("[Research] Search unavailable ({}), using internal knowledge", e);
                Ok(Self::no_live_data())
            }
        }
    }

    fn no_live_data() -> (String, Vec<Evidence>) {
        (NO_LIVE_DATA.to_string(), vec![Evidence::internal_knowledge()])
    }

    /// Primary and secondary analyses run concurrently; both are joined before returning.
    async fn analyze(&self, prompt: &str, cancel: &CancellationToken) -> Result<(String, String)> {
        let guard = CallGuard::new(self.timeouts.llm, cancel.clone());

        let primary = guard.run("primary analysis", self.primary.generate(prompt));
        let secondary = async {
            match &self.secondary {
                Some(client) => Some(guard.run("secondary analysis", client.generate(prompt)).await),
                None => None,
            }
        };

        let (primary, secondary) = tokio::join!(primary, secondary);
        let primary = primary?;

        let secondary = match secondary {
            Some(Ok(text)) => text,
            Some(Err(AppError::Cancelled)) => return Err(AppError::Cancelled),
            Some(Err(e)) => {
                warn!("[Research] Secondary analysis failed: {}", e);
                SECONDARY_UNAVAILABLE.to_string()
            }
            None => SECONDARY_UNAVAILABLE.to_string(),
        };

        Ok((primary, secondary))
    }

    /// Prefer the secondary provider; fall back to the primary if it fails.
    async fn synthesize(&self, prompt: &str, cancel: &CancellationToken) -> Result<String> {
        let guard = CallGuard::new(self.timeouts.llm, cancel.clone());

        if let Some(secondary) = &self.secondary {
            info!("[Research] Synthesizing with {}", secondary.model_name());
            match guard.run("secondary synthesis", secondary.generate(prompt)).await {
                Ok(raw) => return Ok(raw),
                Err(AppError::Cancelled) => return Err(AppError::Cancelled),
                Err(e) => warn!("[Research] Secondary synthesis failed ({}), retrying on primary", e),
            }
        }

        info!("[Research] Synthesizing with {}", self.primary.model_name());
        guard.run("primary synthesis", self.primary.generate(prompt)).await
    }

    fn emit(&self, event: ResearchProgress) {
        if let Some(tx) = &self.progress {
            // A dropped receiver only means nobody is rendering progress
            let _ = tx.send(event);
        }
    }
}
