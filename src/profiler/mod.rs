//! Mission profiler.
//!
//! Classifies free text into a [`MissionProfile`] with a single LLM call. The profiler
//! never fails its caller: any call or parse failure falls back to a CASUAL/LIGHT/LOW
//! profile whose search query is the raw input. Only turn cancellation propagates.

use crate::llm::{CallGuard, LLMClient};
use crate::types::{AppError, Result};
use crate::utils::text::strip_code_fences;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MissionMode {
    #[serde(alias = "casual", alias = "Casual")]
    Casual,
    #[serde(alias = "deep", alias = "Deep")]
    Deep,
}

impl fmt::Display for MissionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissionMode::Casual => write!(f, "CASUAL"),
            MissionMode::Deep => write!(f, "DEEP"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Depth {
    #[default]
    #[serde(alias = "light")]
    Light,
    #[serde(alias = "deep")]
    Deep,
    #[serde(alias = "paper")]
    Paper,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Risk {
    #[default]
    #[serde(alias = "low")]
    Low,
    #[serde(alias = "medium")]
    Medium,
    #[serde(alias = "high")]
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionProfile {
    /// Domain label (BUSINESS, SHOPPING, ...); free-form
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
    pub mode: MissionMode,
    #[serde(default)]
    pub depth: Depth,
    #[serde(default)]
    pub risk: Risk,
    #[serde(default)]
    pub search_query: String,
}

fn default_kind() -> String {
    "ETC".to_string()
}

impl MissionProfile {
    /// Profile used whenever classification fails
    pub fn fallback(input: &str) -> Self {
        Self {
            kind: "CASUAL".to_string(),
            mode: MissionMode::Casual,
            depth: Depth::Light,
            risk: Risk::Low,
            search_query: input.to_string(),
        }
    }
}

pub fn profiler_prompt(input: &str) -> String {
    format!(
        r#"
[Role: Mission Profiler]

Determine the user's intent mode:

1. **CASUAL**: Shopping, daily life, simple recommendations, travel tips, hobbies.
   - Tone: Friendly, practical, easy to read.
   - Output focus: Brand names, prices, locations, how-to.

2. **DEEP**: Market research, academic analysis, business strategy, financial report, dev/code.
   - Tone: Professional, analytical, data-driven.
   - Output focus: Statistics, trends, strategies, conflicts, source links.

Respond ONLY in JSON:

{{
"type": "BUSINESS/FINANCE/ACADEMIC/DEV/SHOPPING/LIFE/TRAVEL/ETC",
"mode": "CASUAL" or "DEEP",
"depth": "LIGHT" or "DEEP" or "PAPER",
"risk": "LOW" or "MEDIUM" or "HIGH",
"search_query": "Optimized search query for web search (Korean)"
}}

User Input:
{}
"#,
        input
    )
}

/// Parse a model reply into a profile. `None` when the reply is not a usable profile.
pub fn parse_profile(raw: &str, input: &str) -> Option<MissionProfile> {
    let clean = strip_code_fences(raw);
    let mut profile: MissionProfile = serde_json::from_str(&clean).ok()?;
    if profile.search_query.trim().is_empty() {
        profile.search_query = input.to_string();
    }
    Some(profile)
}

pub struct MissionProfiler {
    llm: Arc<dyn LLMClient>,
    timeout: Duration,
}

impl MissionProfiler {
    pub fn new(llm: Arc<dyn LLMClient>, timeout: Duration) -> Self {
        Self { llm, timeout }
    }

    /// Classify `input`. Errors only with [`AppError::Cancelled`].
    pub async fn classify(&self, input: &str, cancel: &CancellationToken) -> Result<MissionProfile> {
        let guard = CallGuard::new(self.timeout, cancel.clone());
        let prompt = profiler_prompt(input);

        match guard.run("mission profiler", self.llm.generate(&prompt)).await {
            Ok(raw) => match parse_profile(&raw, input) {
                Some(profile) => {
                    info!(
                        "[MissionProfiler] Classified: type={} mode={} depth={:?} risk={:?}",
                        profile.kind, profile.mode, profile.depth, profile.risk
                    );
                    Ok(profile)
                }
                None => {
                    warn!("[MissionProfiler] Unparseable classification, fallback");
                    Ok(MissionProfile::fallback(input))
                }
            },
            Err(AppError::Cancelled) => Err(AppError::Cancelled),
            Err(e) => {
                warn!("[MissionProfiler] Failed ({}), fallback", e);
                Ok(MissionProfile::fallback(input))
            }
        }
    }
}
