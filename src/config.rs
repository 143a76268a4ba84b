use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// System-wide configuration, read once at startup and never mutated. The
/// `cluster` name tags every event this process emits.
#[derive(Debug, Clone, Deserialize)]
pub struct SystemConfig {
    pub cluster: String,
    #[serde(default)]
    pub scribe: ScribeConfig,
}

/// `[scribe]` section: where the event stream lives and which logical stream
/// receives OOM events.
#[derive(Debug, Clone, Deserialize)]
pub struct ScribeConfig {
    #[serde(default = "default_scribe_host")]
    pub host: String,
    #[serde(default = "default_scribe_port")]
    pub port: u16,
    #[serde(default = "default_stream")]
    pub stream: String,
}

fn default_scribe_host() -> String {
    "169.254.255.254".to_string()
}

fn default_scribe_port() -> u16 {
    1463
}

fn default_stream() -> String {
    "tmp_paasta_oom_events".to_string()
}

impl Default for ScribeConfig {
    fn default() -> Self {
        Self {
            host: default_scribe_host(),
            port: default_scribe_port(),
            stream: default_stream(),
        }
    }
}

impl SystemConfig {
    fn try_init_from_string(val: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(val)?)
    }

    pub fn try_init() -> Result<Self, ConfigError> {
        use std::io::Read;
        let mut config = String::new();
        std::fs::File::open(&crate::cli::get_cli_args().config)?.read_to_string(&mut config)?;
        Self::try_init_from_string(&config)
    }
}
