use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default = "default_host_label")]
    pub host_label: String,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourcesConfig {
    #[serde(default = "default_thermal_path")]
    pub thermal_path: PathBuf,
    #[serde(default = "default_loadavg_path")]
    pub loadavg_path: PathBuf,
    #[serde(default = "default_cpuinfo_path")]
    pub cpuinfo_path: PathBuf,
    #[serde(default = "default_meminfo_path")]
    pub meminfo_path: PathBuf,
    #[serde(default = "default_uptime_path")]
    pub uptime_path: PathBuf,
    #[serde(default = "default_disk_command")]
    pub disk: CommandConfig,
    #[serde(default = "default_interfaces_command")]
    pub interfaces: CommandConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CommandConfig {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(
        default = "default_command_timeout",
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub timeout: Duration,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_listen")]
    pub listen: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_bot_token_env")]
    pub bot_token_env: String,
    #[serde(default)]
    pub bot_token: Option<String>,
    // Пустой список пускает всех пользователей.
    #[serde(default)]
    pub allowed_user_ids: Vec<u64>,
    #[serde(default = "default_rate_limit_per_minute")]
    pub rate_limit_per_minute: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host_label: default_host_label(),
            sources: SourcesConfig::default(),
            http: HttpConfig::default(),
            telegram: TelegramConfig::default(),
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            thermal_path: default_thermal_path(),
            loadavg_path: default_loadavg_path(),
            cpuinfo_path: default_cpuinfo_path(),
            meminfo_path: default_meminfo_path(),
            uptime_path: default_uptime_path(),
            disk: default_disk_command(),
            interfaces: default_interfaces_command(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen: default_listen(),
        }
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bot_token_env: default_bot_token_env(),
            bot_token: None,
            allowed_user_ids: Vec::new(),
            rate_limit_per_minute: default_rate_limit_per_minute(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("не удалось прочитать файл конфигурации {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("не удалось разобрать YAML в {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },
    #[error("ошибка валидации конфигурации: {0}")]
    Validation(String),
}

impl Config {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let path_display = path_ref.display().to_string();
        let text = fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
            path: path_display.clone(),
            source,
        })?;
        Self::load_from_str(&text, &path_display)
    }

    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        if !path_ref.exists() {
            return Ok(Self::default());
        }
        Self::load_from_file(path_ref)
    }

    pub fn load_from_str(text: &str, origin: &str) -> Result<Self, ConfigError> {
        let cfg: Config = serde_yaml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_string(),
            source,
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host_label.trim().is_empty() {
            return Err(ConfigError::Validation(
                "поле host_label не должно быть пустым".to_string(),
            ));
        }

        validate_sources(&self.sources)?;

        if self.http.enabled && SocketAddr::from_str(&self.http.listen).is_err() {
            return Err(ConfigError::Validation(
                "http.listen должно быть корректным адресом host:port".to_string(),
            ));
        }

        if self.telegram.rate_limit_per_minute < 1 {
            return Err(ConfigError::Validation(
                "telegram.rate_limit_per_minute должно быть >= 1".to_string(),
            ));
        }
        if self.telegram.bot_token_env.trim().is_empty() {
            return Err(ConfigError::Validation(
                "telegram.bot_token_env не должен быть пустым".to_string(),
            ));
        }

        Ok(())
    }

    pub fn example_yaml() -> &'static str {
        include_str!("../config.yaml.example")
    }
}

fn validate_sources(sources: &SourcesConfig) -> Result<(), ConfigError> {
    let paths = [
        ("sources.thermal_path", &sources.thermal_path),
        ("sources.loadavg_path", &sources.loadavg_path),
        ("sources.cpuinfo_path", &sources.cpuinfo_path),
        ("sources.meminfo_path", &sources.meminfo_path),
        ("sources.uptime_path", &sources.uptime_path),
    ];
    for (name, path) in paths {
        if path.as_os_str().is_empty() {
            return Err(ConfigError::Validation(format!(
                "{name} не должен быть пустым"
            )));
        }
    }

    validate_command("sources.disk", &sources.disk)?;
    validate_command("sources.interfaces", &sources.interfaces)?;
    Ok(())
}

fn validate_command(name: &str, cmd: &CommandConfig) -> Result<(), ConfigError> {
    if cmd.program.trim().is_empty() {
        return Err(ConfigError::Validation(format!(
            "{name}.program не должен быть пустым"
        )));
    }
    if cmd.timeout.is_zero() {
        return Err(ConfigError::Validation(format!(
            "{name}.timeout должен быть > 0"
        )));
    }
    if cmd.timeout > Duration::from_secs(300) {
        return Err(ConfigError::Validation(format!(
            "{name}.timeout не должен превышать 5m"
        )));
    }
    Ok(())
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    humantime::parse_duration(raw.trim()).map_err(serde::de::Error::custom)
}

fn serialize_duration<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&humantime::format_duration(*value).to_string())
}

fn default_host_label() -> String {
    "Raspberry Pi".to_string()
}

fn default_thermal_path() -> PathBuf {
    PathBuf::from("/sys/class/thermal/thermal_zone0/temp")
}

fn default_loadavg_path() -> PathBuf {
    PathBuf::from("/proc/loadavg")
}

fn default_cpuinfo_path() -> PathBuf {
    PathBuf::from("/proc/cpuinfo")
}

fn default_meminfo_path() -> PathBuf {
    PathBuf::from("/proc/meminfo")
}

fn default_uptime_path() -> PathBuf {
    PathBuf::from("/proc/uptime")
}

fn default_disk_command() -> CommandConfig {
    CommandConfig {
        program: "df".to_string(),
        args: vec!["-h".to_string(), "/".to_string()],
        timeout: default_command_timeout(),
    }
}

fn default_interfaces_command() -> CommandConfig {
    CommandConfig {
        program: "ip".to_string(),
        args: vec!["addr".to_string(), "show".to_string()],
        timeout: default_command_timeout(),
    }
}

const fn default_command_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_listen() -> String {
    "127.0.0.1:9108".to_string()
}

fn default_bot_token_env() -> String {
    "TELEGRAM_BOT_TOKEN".to_string()
}

const fn default_rate_limit_per_minute() -> u32 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn example_config_is_valid() {
        let cfg = Config::load_from_str(Config::example_yaml(), "config.yaml.example")
            .expect("пример конфигурации должен проходить валидацию");
        assert_eq!(cfg.host_label, "Raspberry Pi");
        assert_eq!(cfg.sources.disk.program, "df");
        assert_eq!(cfg.sources.disk.timeout, Duration::from_secs(10));
    }

    #[test]
    fn empty_document_falls_back_to_defaults() {
        let cfg = Config::load_from_str("{}", "inline").expect("пустой конфиг допустим");
        assert_eq!(cfg.sources.meminfo_path, PathBuf::from("/proc/meminfo"));
        assert_eq!(cfg.sources.disk.args, vec!["-h", "/"]);
        assert!(!cfg.telegram.enabled);
        assert!(cfg.telegram.allowed_user_ids.is_empty());
        assert_eq!(cfg.telegram.rate_limit_per_minute, 30);
    }

    #[test]
    fn humantime_timeout_is_parsed() {
        let yaml = "sources:\n  disk:\n    program: df\n    args: [\"-h\", \"/\"]\n    timeout: 2s 500ms\n";
        let cfg = Config::load_from_str(yaml, "inline").expect("валидный конфиг");
        assert_eq!(cfg.sources.disk.timeout, Duration::from_millis(2500));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let yaml = "sources:\n  disk:\n    program: df\n    timeout: 0s\n";
        let err = Config::load_from_str(yaml, "inline").unwrap_err();
        assert!(err.to_string().contains("sources.disk.timeout"));
    }

    #[test]
    fn bad_listen_is_rejected_only_when_http_enabled() {
        let mut cfg = Config::default();
        cfg.http.listen = "not-an-address".to_string();
        cfg.validate().expect("http выключен, адрес не проверяется");

        cfg.http.enabled = true;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("http.listen"));
    }

    #[test]
    fn zero_rate_limit_is_rejected() {
        let mut cfg = Config::default();
        cfg.telegram.rate_limit_per_minute = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = Config::load_or_default(dir.path().join("absent.yaml")).expect("defaults");
        assert_eq!(cfg.host_label, "Raspberry Pi");
    }
}
