use ccg_core::error::AppError;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::OnceLock;

const DEFAULT_BASE_URL: &str = "https://open.bigmodel.cn/api/anthropic";
const DEFAULT_MODEL: &str = "glm-4.7";

/// Resolved, validated configuration. Cheap to clone; loaded once per process.
#[derive(Debug, Clone)]
pub struct GlobalConfig {
    pub api_token: String,
    pub base_url: String,
    pub model: String,
    pub env: HashMap<String, String>,
}

impl GlobalConfig {
    /// Environment overlay consumed by the code-executor adapter: bearer token,
    /// base URL, the four model-alias variables (this system has one model per
    /// config, so all four alias the same value), then user extras layered last
    /// so `[coder.env]` can override any built-in.
    pub fn coder_env_overlay(&self) -> HashMap<String, String> {
        let mut overlay = HashMap::with_capacity(4 + self.env.len());
        overlay.insert("ANTHROPIC_AUTH_TOKEN".to_string(), self.api_token.clone());
        overlay.insert("ANTHROPIC_BASE_URL".to_string(), self.base_url.clone());
        overlay.insert(
            "ANTHROPIC_DEFAULT_OPUS_MODEL".to_string(),
            self.model.clone(),
        );
        overlay.insert(
            "ANTHROPIC_DEFAULT_SONNET_MODEL".to_string(),
            self.model.clone(),
        );
        overlay.insert(
            "ANTHROPIC_DEFAULT_HAIKU_MODEL".to_string(),
            self.model.clone(),
        );
        overlay.insert(
            "CLAUDE_CODE_SUBAGENT_MODEL".to_string(),
            self.model.clone(),
        );
        overlay.extend(self.env.clone());
        overlay
    }
}

#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    #[serde(default)]
    coder: Option<CoderSection>,
}

#[derive(Debug, Deserialize, Default)]
struct CoderSection {
    api_token: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    #[serde(default)]
    env: HashMap<String, String>,
}

#[derive(Debug, Default)]
struct EnvOverrides {
    api_token: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
}

fn env_overrides() -> EnvOverrides {
    EnvOverrides {
        api_token: std::env::var("CODER_API_TOKEN").ok(),
        base_url: std::env::var("CODER_BASE_URL").ok(),
        model: std::env::var("CODER_MODEL").ok(),
    }
}

/// Exposed for callers (e.g. `config validate`) that want raw env fallback
/// values without going through the cached, validated [`GlobalConfig`].
pub fn env_var_overrides() -> (Option<String>, Option<String>, Option<String>) {
    let e = env_overrides();
    (e.api_token, e.base_url, e.model)
}

static CACHE: OnceLock<GlobalConfig> = OnceLock::new();

fn config_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|dirs| dirs.home_dir().join(".ccg-mcp").join("config.toml"))
}

fn load_from_sources(path: Option<PathBuf>) -> Result<GlobalConfig, AppError> {
    let file = path
        .filter(|p| p.exists())
        .map(|path| {
            let content = std::fs::read_to_string(&path).unwrap_or_default();
            toml::from_str::<FileConfig>(&content).map_err(|source| AppError::ConfigParse {
                path: path.display().to_string(),
                source,
            })
        })
        .transpose()?
        .unwrap_or_default();

    let coder = file.coder.unwrap_or_default();
    let env = env_overrides();

    let api_token = coder
        .api_token
        .or(env.api_token)
        .ok_or(AppError::MissingApiToken)?;
    let base_url = coder
        .base_url
        .or(env.base_url)
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    let model = coder
        .model
        .or(env.model)
        .unwrap_or_else(|| DEFAULT_MODEL.to_string());

    Ok(GlobalConfig {
        api_token,
        base_url,
        model,
        env: coder.env,
    })
}

/// Load the config, consulting the process-wide cache first.
///
/// Validated eagerly on first access and never hot-reloaded afterward; a
/// missing token re-attempts resolution on every call until it succeeds, at
/// which point the successful result is cached for the rest of the process.
pub fn load() -> Result<GlobalConfig, AppError> {
    if let Some(cfg) = CACHE.get() {
        return Ok(cfg.clone());
    }
    let cfg = load_from_sources(config_path())?;
    let _ = CACHE.set(cfg.clone());
    Ok(cfg)
}
