//! Report shape produced by the research pipeline.
//!
//! A [`Report`] is always fully populated. Synthesis output is parsed leniently: a
//! JSON object with missing fields is completed with `"..."`, non-string values are
//! rendered as pretty JSON, and anything that is not a JSON object becomes a
//! [`Report::degraded`] report carrying the raw text.

use crate::profiler::MissionMode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const PLACEHOLDER: &str = "...";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub title: String,
    pub content: String,
}

impl Plan {
    fn placeholder() -> Self {
        Self {
            title: PLACEHOLDER.to_string(),
            content: PLACEHOLDER.to_string(),
        }
    }

    fn from_value(value: Option<&Value>) -> Self {
        match value {
            Some(Value::Object(map)) => Self {
                title: text_field(map.get("title")),
                content: text_field(map.get("content")),
            },
            Some(Value::String(s)) if !s.trim().is_empty() => Self {
                title: PLACEHOLDER.to_string(),
                content: s.clone(),
            },
            _ => Self::placeholder(),
        }
    }
}

/// A reference link shown under the report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    pub title: String,
    pub url: String,
}

impl Evidence {
    /// Synthetic entry used when the analysis had no live search data
    pub fn internal_knowledge() -> Self {
        Self {
            title: "AI Internal Knowledge".to_string(),
            url: "#".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub verified_truth: String,
    pub conflicts: String,
    pub plan_a: Plan,
    pub plan_b: Plan,
    pub plan_c: Plan,
    pub next_action: String,
    pub evidence: Vec<Evidence>,
}

/// Marker stored in `conflicts` when synthesis output could not be parsed
pub const PARSE_ERROR_MARKER: &str = "JSON 파싱 오류";

fn text_field(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => PLACEHOLDER.to_string(),
        Some(Value::String(s)) if s.trim().is_empty() => PLACEHOLDER.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

impl Report {
    /// Parse fence-stripped synthesis output. `None` when it is not a JSON object.
    pub fn parse(clean: &str, evidence: Vec<Evidence>) -> Option<Self> {
        let value: Value = serde_json::from_str(clean).ok()?;
        let map = value.as_object()?;

        Some(Self {
            verified_truth: text_field(map.get("verified_truth")),
            conflicts: text_field(map.get("conflicts")),
            plan_a: Plan::from_value(map.get("plan_a")),
            plan_b: Plan::from_value(map.get("plan_b")),
            plan_c: Plan::from_value(map.get("plan_c")),
            next_action: text_field(map.get("next_action")),
            evidence,
        })
    }

    /// Report shown when synthesis output is unusable; `raw` ends up in plan A.
    pub fn degraded(raw: &str, evidence: Vec<Evidence>) -> Self {
        Self {
            verified_truth: "분석 결과를 처리하는 도중 문제가 발생했습니다.".to_string(),
            conflicts: PARSE_ERROR_MARKER.to_string(),
            plan_a: Plan {
                title: "Raw Output".to_string(),
                content: raw.to_string(),
            },
            plan_b: Plan::placeholder(),
            plan_c: Plan::placeholder(),
            next_action: "다시 시도해주세요.".to_string(),
            evidence,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.conflicts == PARSE_ERROR_MARKER && self.plan_a.title == "Raw Output"
    }

    pub fn plans(&self) -> [&Plan; 3] {
        [&self.plan_a, &self.plan_b, &self.plan_c]
    }
}

/// Stage events emitted while a research run is in flight
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResearchProgress {
    Started {
        mode: MissionMode,
        user_name: Option<String>,
    },
    Searching,
    Analyzing {
        /// Whether a secondary provider takes part in the analysis
        cross_check: bool,
    },
    Synthesizing {
        mode: MissionMode,
    },
    Completed,
}

impl ResearchProgress {
    /// User-facing status line
    pub fn message(&self) -> String {
        match self {
            ResearchProgress::Started {
                mode,
                user_name: Some(name),
            } => format!("{}님의 요청을 분석 중입니다... ({} Mode) 🚀", name, mode),
            ResearchProgress::Started { mode, .. } => {
                format!("리서치 엔진 가동... ({} Mode) 🚀", mode)
            }
            ResearchProgress::Searching => "🌍 [1/3] 실시간 웹 정보를 평행 수집 중...".to_string(),
            ResearchProgress::Analyzing { .. } => {
                "⚡ [2/3] 수집된 정보의 교차 검증 및 심층 분석 수행...".to_string()
            }
            ResearchProgress::Synthesizing { mode } => {
                let kind = match mode {
                    MissionMode::Casual => "답변",
                    MissionMode::Deep => "보고서",
                };
                format!("📝 [3/3] 최종 {} 작성 중...", kind)
            }
            ResearchProgress::Completed => "✅ 리서치 완료".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_complete_report() {
        let raw = r#"{
            "verified_truth": "핵심 결론",
            "conflicts": "리스크 없음",
            "plan_a": {"title": "A", "content": "a"},
            "plan_b": {"title": "B", "content": "b"},
            "plan_c": {"title": "C", "content": "c"},
            "next_action": "시장 조사"
        }"#;
        let report = Report::parse(raw, vec![Evidence::internal_knowledge()]).unwrap();
        assert_eq!(report.verified_truth, "핵심 결론");
        assert_eq!(report.plan_b.title, "B");
        assert_eq!(report.evidence.len(), 1);
        assert!(!report.is_degraded());
    }

    #[test]
    fn test_parse_fills_missing_and_renders_non_strings() {
        let raw = r#"{"verified_truth": "ok", "conflicts": ["가격 변동", "규제"], "plan_a": "단일 계획"}"#;
        let report = Report::parse(raw, vec![]).unwrap();
        assert!(report.conflicts.contains("가격 변동"));
        assert!(report.conflicts.starts_with('['));
        assert_eq!(report.plan_a.content, "단일 계획");
        assert_eq!(report.plan_b, Plan::placeholder());
        assert_eq!(report.next_action, "...");
    }

    #[test]
    fn test_parse_blank_strings_become_placeholders() {
        let raw = r#"{"verified_truth": "", "conflicts": "  ", "plan_a": {"title": "", "content": "a"}, "next_action": "조사"}"#;
        let report = Report::parse(raw, vec![]).unwrap();
        assert_eq!(report.verified_truth, "...");
        assert_eq!(report.conflicts, "...");
        assert_eq!(report.plan_a.title, "...");
        assert_eq!(report.plan_a.content, "a");
        assert_eq!(report.next_action, "조사");
    }

    #[test]
    fn test_parse_rejects_non_objects() {
        assert!(Report::parse("not json", vec![]).is_none());
        assert!(Report::parse("[1, 2]", vec![]).is_none());
        assert!(Report::parse("\"string\"", vec![]).is_none());
    }

    #[test]
    fn test_degraded_report() {
        let report = Report::degraded("garbled output", vec![Evidence::internal_knowledge()]);
        assert_eq!(report.conflicts, PARSE_ERROR_MARKER);
        assert_eq!(report.plan_a.content, "garbled output");
        assert_eq!(report.plan_c.title, "...");
        assert_eq!(report.next_action, "다시 시도해주세요.");
        assert!(report.is_degraded());
    }

    #[test]
    fn test_progress_messages() {
        let started = ResearchProgress::Started {
            mode: MissionMode::Deep,
            user_name: Some("민수".to_string()),
        };
        assert_eq!(started.message(), "민수님의 요청을 분석 중입니다... (DEEP Mode) 🚀");

        let anon = ResearchProgress::Started {
            mode: MissionMode::Casual,
            user_name: None,
        };
        assert!(anon.message().starts_with("리서치 엔진 가동"));

        assert!(ResearchProgress::Synthesizing {
            mode: MissionMode::Casual
        }
        .message()
        .contains("답변"));
    }
}
