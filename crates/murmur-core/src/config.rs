use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 18600;
pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_TEXT_PORT: u16 = 18601;

/// Top-level config (murmur.toml + MURMUR_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MurmurConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    pub assistant: AssistantConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub extensions: ExtensionsConfig,
    #[serde(default)]
    pub text_server: TextServerConfig,
    #[serde(default)]
    pub ipc: IpcIngressConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

/// The assistant itself: persona and completion endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// Optional persona paragraph injected as a system entry.
    pub persona: Option<String>,
    pub completion: CompletionConfig,
}

/// OpenAI-compatible chat-completions endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    pub api_key: String,
    #[serde(default = "default_completion_base_url")]
    pub base_url: String,
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Pipeline policy knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// What happens to retrieval-augmentation caches after a completion.
    #[serde(default)]
    pub rag_cache: RagCachePolicy,
    /// Serialize turns for the same room (one in flight per room).
    #[serde(default = "bool_true")]
    pub serialize_rooms: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            rag_cache: RagCachePolicy::default(),
            serialize_rooms: true,
        }
    }
}

/// Retention policy for retrieval-augmentation caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RagCachePolicy {
    /// Purge each augmenter's cache key once its fragments reached a completion.
    #[default]
    ClearAfterUse,
    /// Leave caches in place across turns.
    Retain,
}

/// Enumerated list of enabled built-in extensions.
///
/// There is no dynamic discovery: every name here is matched to an explicit
/// constructor at startup, and an unknown name is a fatal config error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionsConfig {
    #[serde(default = "default_enabled_extensions")]
    pub enabled: Vec<String>,
}

impl Default for ExtensionsConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled_extensions(),
        }
    }
}

/// Interactive text server (line-framed TCP).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextServerConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_text_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for TextServerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: DEFAULT_TEXT_PORT,
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

/// Authentication mode for an inbound IPC source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum IpcAuthMode {
    /// HMAC-SHA256 over the raw request body (GitHub-style X-Hub-Signature-256).
    HmacSha256,
    /// Static bearer token in the Authorization header.
    BearerToken,
    /// No authentication — use only on trusted networks.
    None,
}

/// One allowed IPC ingress source and its auth settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpcSourceConfig {
    /// Platform name used in the route, e.g. "webhook" → POST /ipc/webhook.
    pub platform: String,
    /// HMAC signing secret or bearer token value.
    pub secret: Option<String>,
    pub auth_mode: IpcAuthMode,
}

/// Inbound IPC (control-plane) subsystem configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IpcIngressConfig {
    /// When false the /ipc/:platform route returns 404.
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub sources: Vec<IpcSourceConfig>,
}

fn bool_true() -> bool {
    true
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_text_port() -> u16 {
    DEFAULT_TEXT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_completion_base_url() -> String {
    "https://api.groq.com/openai".to_string()
}
fn default_temperature() -> f64 {
    0.7
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.murmur/murmur.db", home)
}
fn default_enabled_extensions() -> Vec<String> {
    [
        "directory_bootstrap",
        "text_handler",
        "thread_reset",
        "datetime_context",
        "persona_context",
        "known_users_context",
        "task_markers",
        "status_ipc",
        "relay_ipc",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl MurmurConfig {
    /// Load config from a TOML file with MURMUR_* env var overrides.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: MurmurConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("MURMUR_").split("_"))
            .extract()
            .map_err(|e| crate::error::MurmurError::Config(e.to_string()))?;

        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.murmur/murmur.toml", home)
}
