use crate::error::{to_env_var, ConfigError};
use crate::state::SessionLimits;
use beach::adapters::places::{PlacesConfig, PLACES_BASE_URL};
use beach::adapters::tides::{TidesConfig, NOAA_TIDES_BASE_URL};
use beach::adapters::weather::{WeatherConfig, NWS_BASE_URL, NWS_USER_AGENT};
use beach::memory::DEFAULT_MAX_MESSAGES;
use beach::providers::configs::ProviderConfig;
use config::{Config, Environment};
use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_environment")]
    pub environment: String,
    #[serde(default)]
    pub debug: bool,
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            environment: default_environment(),
            debug: false,
            cors_origins: default_cors_origins(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerSettings {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::InvalidValue {
                env_var: to_env_var("server.host"),
                reason: e.to_string(),
            })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NoaaSettings {
    #[serde(default = "default_noaa_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for NoaaSettings {
    fn default() -> Self {
        Self {
            base_url: default_noaa_url(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl NoaaSettings {
    pub fn into_config(self) -> TidesConfig {
        TidesConfig {
            base_url: self.base_url,
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NwsSettings {
    #[serde(default = "default_nws_url")]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for NwsSettings {
    fn default() -> Self {
        Self {
            base_url: default_nws_url(),
            user_agent: default_user_agent(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl NwsSettings {
    pub fn into_config(self) -> WeatherConfig {
        WeatherConfig {
            base_url: self.base_url,
            user_agent: self.user_agent,
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlacesSettings {
    #[serde(default = "default_places_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for PlacesSettings {
    fn default() -> Self {
        Self {
            base_url: default_places_url(),
            api_key: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl PlacesSettings {
    /// None without an API key: the places search is then left out.
    pub fn into_config(self) -> Option<PlacesConfig> {
        let api_key = self.api_key.filter(|key| !key.trim().is_empty())?;
        Some(PlacesConfig {
            api_key,
            base_url: self.base_url,
            timeout: Duration::from_secs(self.timeout_secs),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentSettings {
    #[serde(default = "default_max_memory")]
    pub max_memory: usize,
    /// Treat the last word of a message as the beach name when nothing else matched
    #[serde(default)]
    pub last_word_fallback: bool,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_memory: DEFAULT_MAX_MESSAGES,
            last_word_fallback: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionSettings {
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            max_sessions: default_max_sessions(),
            idle_timeout_secs: default_idle_timeout_secs(),
        }
    }
}

impl SessionSettings {
    pub fn limits(&self) -> SessionLimits {
        SessionLimits {
            max_sessions: self.max_sessions,
            idle_timeout: Duration::from_secs(self.idle_timeout_secs),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub app: AppSettings,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub noaa: NoaaSettings,
    #[serde(default)]
    pub nws: NwsSettings,
    #[serde(default)]
    pub places: PlacesSettings,
    #[serde(default)]
    pub agent: AgentSettings,
    #[serde(default)]
    pub sessions: SessionSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::load_and_validate()
    }

    fn load_and_validate() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port())?
            .set_default("provider.type", "ollama")?
            .add_source(
                Environment::with_prefix("BEACH")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("app.cors_origins"),
            )
            .build()?;

        let result: Result<Self, config::ConfigError> = config.try_deserialize();

        match result {
            Ok(settings) => {
                if settings.sessions.max_sessions == 0 {
                    return Err(ConfigError::InvalidValue {
                        env_var: to_env_var("sessions.max_sessions"),
                        reason: "must be at least 1".to_string(),
                    });
                }
                if settings.agent.max_memory == 0 {
                    return Err(ConfigError::InvalidValue {
                        env_var: to_env_var("agent.max_memory"),
                        reason: "must be at least 1".to_string(),
                    });
                }
                Ok(settings)
            }
            Err(err) => {
                tracing::debug!("Configuration error: {:?}", &err);

                // "missing field `api_key`" names the field without its section
                let error_str = err.to_string();
                if error_str.starts_with("missing field") {
                    let field = error_str
                        .trim_start_matches("missing field `")
                        .trim_end_matches('`');
                    Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(&format!("provider.{}", field)),
                    })
                } else if let config::ConfigError::NotFound(field) = &err {
                    Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(field),
                    })
                } else {
                    Err(ConfigError::Other(err))
                }
            }
        }
    }
}

fn default_app_name() -> String {
    "Beach Assistant".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_noaa_url() -> String {
    NOAA_TIDES_BASE_URL.to_string()
}

fn default_nws_url() -> String {
    NWS_BASE_URL.to_string()
}

fn default_user_agent() -> String {
    NWS_USER_AGENT.to_string()
}

fn default_places_url() -> String {
    PLACES_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_max_memory() -> usize {
    DEFAULT_MAX_MESSAGES
}

fn default_max_sessions() -> usize {
    1000
}

fn default_idle_timeout_secs() -> u64 {
    60 * 60
}

#[cfg(test)]
mod tests {
    use super::*;
    use beach::providers::configs::{OLLAMA_HOST, OLLAMA_MODEL};
    use serial_test::serial;
    use std::env;

    fn clean_env() {
        for (key, _) in env::vars() {
            if key.starts_with("BEACH_") {
                env::remove_var(&key);
            }
        }
    }

    #[test]
    #[serial]
    fn test_default_settings() {
        clean_env();

        let settings = Settings::new().unwrap();
        assert_eq!(settings.app.name, "Beach Assistant");
        assert_eq!(settings.app.environment, "development");
        assert!(!settings.app.debug);
        assert_eq!(settings.app.cors_origins, vec!["*"]);
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.server.port, 3000);
        assert_eq!(settings.agent.max_memory, 20);
        assert!(!settings.agent.last_word_fallback);
        assert_eq!(settings.sessions.max_sessions, 1000);
        assert_eq!(settings.sessions.limits().idle_timeout, Duration::from_secs(3600));
        assert!(settings.places.clone().into_config().is_none());

        if let ProviderConfig::Ollama(config) = settings.provider {
            assert_eq!(config.host, OLLAMA_HOST);
            assert_eq!(config.model, OLLAMA_MODEL);
            assert_eq!(config.temperature, Some(0.7));
            assert_eq!(config.max_tokens, Some(1000));
        } else {
            panic!("Expected Ollama provider");
        }
    }

    #[test]
    #[serial]
    fn test_openai_settings() {
        clean_env();
        env::set_var("BEACH_PROVIDER__TYPE", "openai");
        env::set_var("BEACH_PROVIDER__API_KEY", "test-key");
        env::set_var("BEACH_PROVIDER__MODEL", "gpt-4o");
        env::set_var("BEACH_PROVIDER__MAX_TOKENS", "500");

        let settings = Settings::new().unwrap();
        if let ProviderConfig::OpenAi(config) = settings.provider {
            assert_eq!(config.host, "https://api.openai.com");
            assert_eq!(config.api_key, "test-key");
            assert_eq!(config.model, "gpt-4o");
            assert_eq!(config.max_tokens, Some(500));
        } else {
            panic!("Expected OpenAI provider");
        }

        clean_env();
    }

    #[test]
    #[serial]
    fn test_missing_api_key_names_env_var() {
        clean_env();
        env::set_var("BEACH_PROVIDER__TYPE", "openai");

        let error = Settings::new().unwrap_err();
        assert!(matches!(
            error,
            ConfigError::MissingEnvVar { ref env_var } if env_var == "BEACH_PROVIDER__API_KEY"
        ));

        clean_env();
    }

    #[test]
    #[serial]
    fn test_environment_override() {
        clean_env();
        env::set_var("BEACH_SERVER__PORT", "8080");
        env::set_var("BEACH_APP__ENVIRONMENT", "production");
        env::set_var("BEACH_APP__DEBUG", "true");
        env::set_var("BEACH_APP__CORS_ORIGINS", "https://a.example,https://b.example");
        env::set_var("BEACH_PLACES__API_KEY", "places-key");
        env::set_var("BEACH_NOAA__TIMEOUT_SECS", "3");
        env::set_var("BEACH_AGENT__MAX_MEMORY", "8");
        env::set_var("BEACH_SESSIONS__MAX_SESSIONS", "50");

        let settings = Settings::new().unwrap();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.app.environment, "production");
        assert!(settings.app.debug);
        assert_eq!(
            settings.app.cors_origins,
            vec!["https://a.example", "https://b.example"]
        );
        assert_eq!(settings.agent.max_memory, 8);
        assert_eq!(settings.sessions.limits().max_sessions, 50);
        assert_eq!(
            settings.noaa.clone().into_config().timeout,
            Duration::from_secs(3)
        );

        let places = settings.places.into_config().unwrap();
        assert_eq!(places.api_key, "places-key");
        assert_eq!(places.base_url, PLACES_BASE_URL);

        clean_env();
    }

    #[test]
    #[serial]
    fn test_zero_memory_rejected() {
        clean_env();
        env::set_var("BEACH_AGENT__MAX_MEMORY", "0");

        let error = Settings::new().unwrap_err();
        assert!(matches!(error, ConfigError::InvalidValue { .. }));

        clean_env();
    }

    #[test]
    fn test_socket_addr_conversion() {
        let server_settings = ServerSettings {
            host: "127.0.0.1".to_string(),
            port: 3000,
        };
        let addr = server_settings.socket_addr().unwrap();
        assert_eq!(addr.to_string(), "127.0.0.1:3000");

        let bad = ServerSettings {
            host: "not a host".to_string(),
            port: 3000,
        };
        assert!(bad.socket_addr().is_err());
    }

    #[test]
    fn test_blank_places_key_is_ignored() {
        let settings = PlacesSettings {
            api_key: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(settings.into_config().is_none());
    }
}
