//! Intent model and its persistent store.
//!
//! The [`IntentModel`] is the structured record of what the user wants (topic,
//! purpose, goal, proficiency, constraints, resources). It is versioned: a stored
//! record whose version differs from [`INTENT_MODEL_VERSION`] is discarded, never
//! migrated. [`ReadinessPolicy`] decides when enough intent has been gathered for
//! research to start on its own.

use crate::db::KvStore;
use crate::types::{AppError, Result};
use crate::utils::text::trimmed_char_len;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const INTENT_MODEL_VERSION: &str = "1.0";
pub const INTENT_MODEL_KEY: &str = "ACIP_INTENT_MODEL";
pub const USER_NAME_KEY: &str = "ACIP_USER_NAME";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IntentModel {
    pub version: String,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub purpose: Option<String>,
    #[serde(default)]
    pub goal: Option<String>,
    #[serde(default)]
    pub proficiency: Option<String>,
    #[serde(default)]
    pub constraints: Option<String>,
    #[serde(default)]
    pub resources: Option<String>,
    /// Set on first save, never overwritten
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for IntentModel {
    fn default() -> Self {
        Self {
            version: INTENT_MODEL_VERSION.to_string(),
            user_name: None,
            topic: None,
            purpose: None,
            goal: None,
            proficiency: None,
            constraints: None,
            resources: None,
            created_at: None,
            updated_at: None,
        }
    }
}

/// Mutable intent fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntentField {
    UserName,
    Topic,
    Purpose,
    Goal,
    Proficiency,
    Constraints,
    Resources,
}

impl IntentField {
    /// Fields that can be announced through a `METADATA: <KEY>=` directive
    pub const DIRECTIVE_FIELDS: [IntentField; 6] = [
        IntentField::Topic,
        IntentField::Purpose,
        IntentField::Goal,
        IntentField::Proficiency,
        IntentField::Constraints,
        IntentField::Resources,
    ];

    /// Fields counted by the readiness gate
    pub const READINESS_FIELDS: [IntentField; 3] =
        [IntentField::Topic, IntentField::Purpose, IntentField::Goal];

    pub fn directive_key(&self) -> &'static str {
        match self {
            IntentField::UserName => "USER_NAME",
            IntentField::Topic => "TOPIC",
            IntentField::Purpose => "PURPOSE",
            IntentField::Goal => "GOAL",
            IntentField::Proficiency => "PROFICIENCY",
            IntentField::Constraints => "CONSTRAINTS",
            IntentField::Resources => "RESOURCES",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IntentField::UserName => "user_name",
            IntentField::Topic => "topic",
            IntentField::Purpose => "purpose",
            IntentField::Goal => "goal",
            IntentField::Proficiency => "proficiency",
            IntentField::Constraints => "constraints",
            IntentField::Resources => "resources",
        }
    }
}

impl IntentModel {
    pub fn get(&self, field: IntentField) -> Option<&str> {
        match field {
            IntentField::UserName => self.user_name.as_deref(),
            IntentField::Topic => self.topic.as_deref(),
            IntentField::Purpose => self.purpose.as_deref(),
            IntentField::Goal => self.goal.as_deref(),
            IntentField::Proficiency => self.proficiency.as_deref(),
            IntentField::Constraints => self.constraints.as_deref(),
            IntentField::Resources => self.resources.as_deref(),
        }
    }

    pub fn set(&mut self, field: IntentField, value: impl Into<String>) {
        let slot = match field {
            IntentField::UserName => &mut self.user_name,
            IntentField::Topic => &mut self.topic,
            IntentField::Purpose => &mut self.purpose,
            IntentField::Goal => &mut self.goal,
            IntentField::Proficiency => &mut self.proficiency,
            IntentField::Constraints => &mut self.constraints,
            IntentField::Resources => &mut self.resources,
        };
        *slot = Some(value.into());
    }

    /// Refresh `updated_at`; `created_at` is only ever set the first time
    pub fn touch(&mut self) {
        let now = Utc::now();
        self.updated_at = Some(now);
        self.created_at.get_or_insert(now);
    }
}

/// Readiness gate: `threshold` of {topic, purpose, goal} must be longer than
/// `min_chars` characters after trimming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessPolicy {
    pub threshold: usize,
    pub min_chars: usize,
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        Self {
            threshold: 2,
            min_chars: 5,
        }
    }
}

impl ReadinessPolicy {
    pub fn filled_count(&self, model: &IntentModel) -> usize {
        IntentField::READINESS_FIELDS
            .iter()
            .filter(|field| {
                model
                    .get(**field)
                    .is_some_and(|v| trimmed_char_len(v) > self.min_chars)
            })
            .count()
    }

    pub fn is_ready(&self, model: &IntentModel) -> bool {
        self.filled_count(model) >= self.threshold
    }
}

/// Persists the intent record and session user name for one session id
#[derive(Clone)]
pub struct IntentStore {
    store: Arc<dyn KvStore>,
    intent_key: String,
    user_name_key: String,
}

impl IntentStore {
    pub fn new(store: Arc<dyn KvStore>, session_id: &str) -> Self {
        let (intent_key, user_name_key) = if session_id.is_empty() || session_id == "default" {
            (INTENT_MODEL_KEY.to_string(), USER_NAME_KEY.to_string())
        } else {
            (
                format!("{}:{}", INTENT_MODEL_KEY, session_id),
                format!("{}:{}", USER_NAME_KEY, session_id),
            )
        };

        Self {
            store,
            intent_key,
            user_name_key,
        }
    }

    /// Load the persisted record.
    ///
    /// Never fails: a missing, undecodable or wrong-version record yields a fresh
    /// default, and the bad copy is cleared.
    pub async fn load(&self) -> IntentModel {
        let raw = match self.store.get(&self.intent_key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return IntentModel::default(),
            Err(e) => {
                warn!("Failed to read intent model, starting fresh: {}", e);
                return IntentModel::default();
            }
        };

        match serde_json::from_str::<IntentModel>(&raw) {
            Ok(model) if model.version == INTENT_MODEL_VERSION => {
                info!("IntentModel loaded");
                debug!("IntentModel: {:?}", model);
                model
            }
            Ok(model) => {
                info!(
                    "Discarding intent model with version {} (current {})",
                    model.version, INTENT_MODEL_VERSION
                );
                self.discard().await;
                IntentModel::default()
            }
            Err(e) => {
                warn!("Discarding undecodable intent model: {}", e);
                self.discard().await;
                IntentModel::default()
            }
        }
    }

    async fn discard(&self) {
        if let Err(e) = self.store.remove(&self.intent_key).await {
            warn!("Failed to clear intent model: {}", e);
        }
    }

    /// Stamp and persist the whole record
    pub async fn save(&self, model: &mut IntentModel) -> Result<()> {
        model.touch();
        let raw = serde_json::to_string(model)
            .map_err(|e| AppError::Internal(format!("Failed to encode intent model: {}", e)))?;
        self.store.set(&self.intent_key, &raw).await?;
        debug!("IntentModel saved");
        Ok(())
    }

    /// Set one field and persist immediately
    pub async fn update(
        &self,
        model: &mut IntentModel,
        field: IntentField,
        value: &str,
    ) -> Result<()> {
        let value = value.trim();
        if value.is_empty() {
            return Err(AppError::InvalidInput(format!(
                "Empty value for intent field {}",
                field.as_str()
            )));
        }
        model.set(field, value);
        self.save(model).await?;
        info!("IntentModel updated: {} = {}", field.as_str(), value);
        Ok(())
    }

    /// Clear the persisted record
    pub async fn reset(&self) -> Result<()> {
        self.store.remove(&self.intent_key).await?;
        info!("IntentModel reset");
        Ok(())
    }

    pub async fn load_user_name(&self) -> Option<String> {
        match self.store.get(&self.user_name_key).await {
            Ok(name) => name.filter(|n| !n.trim().is_empty()),
            Err(e) => {
                warn!("Failed to read user name: {}", e);
                None
            }
        }
    }

    pub async fn save_user_name(&self, name: &str) -> Result<()> {
        self.store.set(&self.user_name_key, name).await
    }

    pub async fn clear_user_name(&self) -> Result<()> {
        self.store.remove(&self.user_name_key).await
    }
}
