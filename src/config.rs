use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub notes: NotesConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub transcript: TranscriptConfig,
    #[serde(default)]
    pub script: ScriptConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_provider_url")]
    pub base_url: String,
    #[serde(default)]
    pub agent_id: Option<String>,
    /// Server-held secret; overridable via the environment, never served.
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_provider_url(),
            agent_id: None,
            api_key: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NotesConfig {
    #[serde(default = "default_notes_url")]
    pub base_url: String,
    #[serde(default = "default_notes_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for NotesConfig {
    fn default() -> Self {
        Self {
            base_url: default_notes_url(),
            model: default_notes_model(),
            api_key: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AudioConfig {
    /// WAV file to stream as the capture source; microphone when unset.
    #[serde(default)]
    pub source_path: Option<String>,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default = "default_channels")]
    pub channels: u16,
    #[serde(default = "default_buffer_ms")]
    pub buffer_duration_ms: u64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            source_path: None,
            sample_rate: default_sample_rate(),
            channels: default_channels(),
            buffer_duration_ms: default_buffer_ms(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TranscriptConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for TranscriptConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            max_attempts: default_max_attempts(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ScriptConfig {
    #[serde(default = "default_script_path")]
    pub path: String,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            path: default_script_path(),
        }
    }
}

fn default_provider_url() -> String {
    "https://api.elevenlabs.io".to_string()
}

fn default_notes_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_notes_model() -> String {
    "gpt-3.5-turbo-0125".to_string()
}

fn default_sample_rate() -> u32 {
    16000
}

fn default_channels() -> u16 {
    1
}

fn default_buffer_ms() -> u64 {
    100
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_max_attempts() -> u32 {
    60
}

fn default_script_path() -> String {
    "interview-script.yaml".to_string()
}

impl Config {
    /// Load from a config file plus an `INTERVIEW`-prefixed environment
    /// overlay (e.g. `INTERVIEW__PROVIDER__API_KEY`).
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("INTERVIEW").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
