//! Prompt templates and fixed texts used by the research pipeline.

use crate::intent::IntentModel;
use crate::profiler::MissionMode;

/// Search placeholder used when no live results are available
pub const NO_LIVE_DATA: &str =
    "실시간 검색 결과를 가져올 수 없습니다. AI의 내부 지식을 사용하여 분석합니다.";

/// Stand-in for the secondary analysis when no cross-check provider answered
pub const SECONDARY_UNAVAILABLE: &str = "GPT Analysis Not Available";

/// Mission used when neither the profile nor the intent record yields one
pub const DEFAULT_PIPELINE_MISSION: &str = "강아지 산책 앱 수익화 전략 시장 분석 및 경쟁 앱 조사";

pub fn analysis_prompt(mission: &str, mode: MissionMode, results: &str) -> String {
    format!(
        r#"
[Agent: Reviewer]
Mission: {mission}
Mode: {mode}

Search Results:
{results}

Task:
Analyze the search results to answer the mission.
- If CASUAL: Focus on practical info, prices, specs, reviews.
- If DEEP: Focus on market trends, statistics, strategic implications.
Identify key facts and potential risks/conflicts.
IMPORTANT: Write in Korean.
"#
    )
}

pub fn synthesis_instructions(mode: MissionMode) -> &'static str {
    match mode {
        MissionMode::Casual => {
            "Tone: Friendly, helpful, easy to understand.\n\
             Constraint: NO professional jargon, NO \"stakeholder analysis\", NO \"economic outlook\" unless asked.\n\
             Focus: Practical Advice, Recommendations, Pros/Cons."
        }
        MissionMode::Deep => {
            "Tone: Professional, strategic, data-driven.\n\
             Constraint: Strict business/academic structure.\n\
             Focus: Strategic Insights, Market Data, Actionable Plan."
        }
    }
}

pub fn synthesis_prompt(
    mission: &str,
    mode: MissionMode,
    primary_analysis: &str,
    secondary_analysis: &str,
) -> String {
    let instructions = synthesis_instructions(mode);
    format!(
        r#"
You are the Chief Strategic Synthesizer of Consensus Lab.

PRIMARY USER MISSION:
{mission}

MODE: {mode}
{instructions}

SOURCES:
Gemini Analysis: {primary_analysis}
GPT Analysis: {secondary_analysis}

TASK:
Synthesize a final response based on the analysis of search results.
Ensure the content is strictly relevant to the User Mission.
DO NOT HALLUCINATE about waiting times (e.g. "24 hours").
Write in Korean.

Respond ONLY in JSON format:
{{
"verified_truth": "Key Takeaway / Core Answer",
"conflicts": "Conflicting info or Risks (if any)",
"plan_a": {{"title": "Recommendation 1", "content": "Detail..."}},
"plan_b": {{"title": "Recommendation 2", "content": "Detail..."}},
"plan_c": {{"title": "Recommendation 3", "content": "Detail..."}},
"next_action": "Suggested Next Step"
}}
"#
    )
}

/// Research brief assembled from the intent record
pub fn briefing(intent: &IntentModel, image_context: Option<&str>) -> String {
    format!(
        r#"
USER CONTEXT:
User Name: {}
Topic: {}

PRIMARY GOAL:
{}

PURPOSE:
{}

VISUAL CONTEXT (Image Analysis):
{}

CONSTRAINT:
Research ONLY this specific goal.
Provide valid sources and concrete strategies.
Avoid generic advice.
"#,
        intent.user_name.as_deref().unwrap_or("User"),
        intent.topic.as_deref().unwrap_or("General"),
        intent.goal.as_deref().unwrap_or_default(),
        intent.purpose.as_deref().unwrap_or_default(),
        image_context.unwrap_or("None"),
    )
}
