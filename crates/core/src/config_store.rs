//! The four configuration documents (§6): `llm_settings`, `scoring_config`,
//! `domain_model`, `app_state`. Each is a JSON file under
//! `AppConfig::config_dir`, guarded by a `tokio::sync::RwLock` for reads and
//! written atomically (`.tmp` then rename) so a failed write never corrupts
//! the document on disk.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use mastery_shared::error::{EngineError, EngineResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderPhaseSettings {
    pub default_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRate {
    pub input_per_1k: f64,
    pub output_per_1k: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    /// Ordered fallback chain of provider ids, e.g. `["O", "A", "G"]`.
    pub fallback_chain: Vec<String>,
    /// Per-provider, per-phase call settings. Outer key is provider id.
    pub phase_settings: HashMap<String, HashMap<String, ProviderPhaseSettings>>,
    pub rates: HashMap<String, ProviderRate>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        let default_phase_settings = |phase_defaults: &[(&str, f32, u32)]| -> HashMap<String, ProviderPhaseSettings> {
            phase_defaults
                .iter()
                .map(|(phase, temp, max_tokens)| {
                    (
                        phase.to_string(),
                        ProviderPhaseSettings {
                            default_model: "default".to_string(),
                            temperature: *temp,
                            max_tokens: *max_tokens,
                            timeout_secs: 60,
                        },
                    )
                })
                .collect()
        };
        let phases: &[(&str, f32, u32)] = &[
            ("combined", 0.1, 6000),
            ("intelligent_feedback", 0.7, 4000),
        ];

        let mut phase_settings = HashMap::new();
        for provider in ["O", "A", "G"] {
            phase_settings.insert(provider.to_string(), default_phase_settings(phases));
        }

        let mut rates = HashMap::new();
        rates.insert(
            "A".to_string(),
            ProviderRate { input_per_1k: 0.003, output_per_1k: 0.015 },
        );
        rates.insert(
            "O".to_string(),
            ProviderRate { input_per_1k: 0.0025, output_per_1k: 0.01 },
        );
        rates.insert(
            "G".to_string(),
            ProviderRate { input_per_1k: 0.00125, output_per_1k: 0.005 },
        );

        Self {
            fallback_chain: vec!["O".to_string(), "A".to_string(), "G".to_string()],
            phase_settings,
            rates,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateThresholdsConfig {
    pub passed: f64,
    pub approaching: f64,
    pub developing: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Evidence-volume decay factor `d ∈ (0,1]`, applied as `d^evidence_after`.
    pub decay_factor: f64,
    /// Score used when a skill has no history rows yet.
    pub prior_mean: f64,
    pub gate_1: GateThresholdsConfig,
    pub gate_2: GateThresholdsConfig,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            decay_factor: 0.9,
            prior_mean: 0.0,
            gate_1: GateThresholdsConfig { passed: 0.75, approaching: 0.65, developing: 0.50 },
            gate_2: GateThresholdsConfig { passed: 30.0, approaching: 20.0, developing: 10.0 },
        }
    }
}

impl From<&GateThresholdsConfig> for crate::scoring::gates::GateThresholds {
    fn from(c: &GateThresholdsConfig) -> Self {
        Self { passed: c.passed, approaching: c.approaching, developing: c.developing }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Subskill {
    pub subskill_id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Skill {
    pub skill_id: String,
    pub name: String,
    #[serde(default)]
    pub subskills: Vec<Subskill>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Competency {
    pub competency_id: String,
    pub name: String,
    #[serde(default)]
    pub skills: Vec<Skill>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DomainModel {
    pub competencies: Vec<Competency>,
}

impl DomainModel {
    /// Look up a skill's display name, falling back to the raw id when the
    /// domain model has no entry (keeps the engine usable with a sparse or
    /// not-yet-populated domain model).
    pub fn skill_name(&self, skill_id: &str) -> String {
        self.competencies
            .iter()
            .flat_map(|c| &c.skills)
            .find(|s| s.skill_id == skill_id)
            .map(|s| s.name.clone())
            .unwrap_or_else(|| skill_id.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppState {
    pub maintenance_mode: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Which of the four documents is being addressed, used by the HTTP handlers
/// (`GET/PUT /api/config/:doc`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigDoc {
    LlmSettings,
    ScoringConfig,
    DomainModel,
    AppState,
}

impl ConfigDoc {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "llm_settings" => Some(Self::LlmSettings),
            "scoring_config" => Some(Self::ScoringConfig),
            "domain_model" => Some(Self::DomainModel),
            "app_state" => Some(Self::AppState),
            _ => None,
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            Self::LlmSettings => "llm_settings.json",
            Self::ScoringConfig => "scoring_config.json",
            Self::DomainModel => "domain_model.json",
            Self::AppState => "app_state.json",
        }
    }
}

/// Loads, reads, and atomically saves the four config documents under one
/// directory. Each document is independently lockable.
pub struct ConfigStore {
    dir: PathBuf,
    llm_settings: Arc<RwLock<LlmSettings>>,
    scoring_config: Arc<RwLock<ScoringConfig>>,
    domain_model: Arc<RwLock<DomainModel>>,
    app_state: Arc<RwLock<AppState>>,
}

async fn load_or_default<T>(path: &Path) -> EngineResult<T>
where
    T: Default + serde::de::DeserializeOwned,
{
    match tokio::fs::read_to_string(path).await {
        Ok(contents) => serde_json::from_str(&contents).map_err(EngineError::from),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
        Err(e) => Err(EngineError::ConfigurationError(format!(
            "failed to read {}: {e}",
            path.display()
        ))),
    }
}

/// Write `value` to `path` atomically: serialize to `path.tmp`, then rename
/// over the destination. A failure during serialize/write never touches the
/// existing file; a failure during rename removes the `.tmp` before
/// propagating the error, so no orphaned `.tmp` survives either failure mode
/// (§8 property 10).
async fn save_atomic<T: Serialize>(path: &Path, value: &T) -> EngineResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| EngineError::ConfigurationError(format!("failed to create {}: {e}", parent.display())))?;
    }
    let tmp_path = path.with_extension("tmp");
    let serialized = serde_json::to_string_pretty(value)?;
    tokio::fs::write(&tmp_path, serialized)
        .await
        .map_err(|e| EngineError::ConfigurationError(format!("failed to write {}: {e}", tmp_path.display())))?;
    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(EngineError::ConfigurationError(format!("failed to rename into {}: {e}", path.display())));
    }
    Ok(())
}

impl ConfigStore {
    pub async fn load(dir: PathBuf) -> EngineResult<Self> {
        let llm_settings = load_or_default(&dir.join(ConfigDoc::LlmSettings.file_name())).await?;
        let scoring_config = load_or_default(&dir.join(ConfigDoc::ScoringConfig.file_name())).await?;
        let domain_model = load_or_default(&dir.join(ConfigDoc::DomainModel.file_name())).await?;
        let app_state = load_or_default(&dir.join(ConfigDoc::AppState.file_name())).await?;

        info!(dir = %dir.display(), "loaded configuration documents");

        Ok(Self {
            dir,
            llm_settings: Arc::new(RwLock::new(llm_settings)),
            scoring_config: Arc::new(RwLock::new(scoring_config)),
            domain_model: Arc::new(RwLock::new(domain_model)),
            app_state: Arc::new(RwLock::new(app_state)),
        })
    }

    pub async fn llm_settings(&self) -> LlmSettings {
        self.llm_settings.read().await.clone()
    }

    pub async fn scoring_config(&self) -> ScoringConfig {
        self.scoring_config.read().await.clone()
    }

    pub async fn domain_model(&self) -> Arc<DomainModel> {
        Arc::new(self.domain_model.read().await.clone())
    }

    pub async fn app_state(&self) -> AppState {
        self.app_state.read().await.clone()
    }

    /// Read the raw JSON value of a document, for the generic `GET /api/config/:doc` handler.
    pub async fn get_raw(&self, doc: ConfigDoc) -> EngineResult<serde_json::Value> {
        Ok(match doc {
            ConfigDoc::LlmSettings => serde_json::to_value(self.llm_settings().await)?,
            ConfigDoc::ScoringConfig => serde_json::to_value(self.scoring_config().await)?,
            ConfigDoc::DomainModel => serde_json::to_value(&*self.domain_model().await)?,
            ConfigDoc::AppState => serde_json::to_value(self.app_state().await)?,
        })
    }

    /// Replace a document wholesale and persist it atomically.
    pub async fn put_raw(&self, doc: ConfigDoc, value: serde_json::Value) -> EngineResult<()> {
        let path = self.dir.join(doc.file_name());
        match doc {
            ConfigDoc::LlmSettings => {
                let parsed: LlmSettings = serde_json::from_value(value)?;
                save_atomic(&path, &parsed).await?;
                *self.llm_settings.write().await = parsed;
            }
            ConfigDoc::ScoringConfig => {
                let parsed: ScoringConfig = serde_json::from_value(value)?;
                save_atomic(&path, &parsed).await?;
                *self.scoring_config.write().await = parsed;
            }
            ConfigDoc::DomainModel => {
                let parsed: DomainModel = serde_json::from_value(value)?;
                save_atomic(&path, &parsed).await?;
                *self.domain_model.write().await = parsed;
            }
            ConfigDoc::AppState => {
                let parsed: AppState = serde_json::from_value(value)?;
                save_atomic(&path, &parsed).await?;
                *self.app_state.write().await = parsed;
            }
        }
        warn!(doc = doc.file_name(), "configuration document replaced");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_documents_fall_back_to_defaults() {
        let dir = std::env::temp_dir().join(format!("mastery-cfg-test-{}", std::process::id()));
        let store = ConfigStore::load(dir.clone()).await.unwrap();
        assert_eq!(store.scoring_config().await.decay_factor, 0.9);
        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = std::env::temp_dir().join(format!("mastery-cfg-test2-{}", std::process::id()));
        let store = ConfigStore::load(dir.clone()).await.unwrap();
        let mut cfg = store.scoring_config().await;
        cfg.decay_factor = 0.8;
        store
            .put_raw(ConfigDoc::ScoringConfig, serde_json::to_value(&cfg).unwrap())
            .await
            .unwrap();

        let reloaded = ConfigStore::load(dir.clone()).await.unwrap();
        assert_eq!(reloaded.scoring_config().await.decay_factor, 0.8);

        // No stray .tmp file should remain after a successful save.
        assert!(!dir.join("scoring_config.tmp").exists());
        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn save_atomic_cleans_up_tmp_on_rename_failure() {
        let dir = std::env::temp_dir().join(format!("mastery-cfg-test3-{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join("scoring_config.json");
        // A directory at the destination path makes the rename fail.
        tokio::fs::create_dir_all(&path).await.unwrap();

        let result = save_atomic(&path, &ScoringConfig::default()).await;
        assert!(result.is_err());
        assert!(!dir.join("scoring_config.tmp").exists());

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}
