use std::{path::Path, time::Duration};

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::logging::LoggingConfig;

/// Префикс переменных окружения: `ZUMIC_PUBSUB_POLL_TIMEOUT_MS`,
/// `ZUMIC_PUBSUB_LOG__LEVEL` и т.д.
pub const ENV_PREFIX: &str = "ZUMIC_PUBSUB";

/// Настройки клиента кластерного pub/sub.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PubSubSettings {
    /// Таймаут ожидания события в миллисекундах; 0 значит без ограничения
    pub poll_timeout_ms: u64,
    /// Ёмкость буфера канала брокера локального узла
    pub broker_capacity: usize,
    #[serde(default)]
    pub log: LoggingConfig,
}

impl PubSubSettings {
    /// Загружает настройки из значений по умолчанию и переменных окружения.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// То же, что [`PubSubSettings::load`], но сначала читает файл
    /// (формат определяется по расширению). Переменные окружения важнее
    /// файла.
    pub fn load_from(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            // Добавляем значения по умолчанию
            .set_default("poll_timeout_ms", 1000_i64)?
            .set_default("broker_capacity", 128_i64)?;

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }

        let cfg = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("log.directives"),
            )
            .build()?;

        cfg.try_deserialize()
    }

    /// Таймаут для `next_event`: `Some(Duration::ZERO)` при нулевом
    /// значении означает ожидание без ограничения.
    pub fn poll_timeout(&self) -> Option<Duration> {
        Some(Duration::from_millis(self.poll_timeout_ms))
    }
}

impl Default for PubSubSettings {
    fn default() -> Self {
        Self {
            poll_timeout_ms: 1000,
            broker_capacity: 128,
            log: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{env, io::Write};

    use serial_test::serial;

    use super::*;
    use crate::logging::LogFormat;

    fn clear_env() {
        for (key, _) in env::vars() {
            if key.starts_with(ENV_PREFIX) {
                env::remove_var(key);
            }
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        let settings = PubSubSettings::load().unwrap();
        assert_eq!(settings.poll_timeout_ms, 1000);
        assert_eq!(settings.broker_capacity, 128);
        assert_eq!(settings.log.level, "info");
        assert_eq!(settings.poll_timeout(), Some(Duration::from_secs(1)));
    }

    /// Тест проверяет переопределение через переменные окружения, включая
    /// вложенные ключи логирования.
    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_env();
        env::set_var("ZUMIC_PUBSUB_POLL_TIMEOUT_MS", "0");
        env::set_var("ZUMIC_PUBSUB_BROKER_CAPACITY", "16");
        env::set_var("ZUMIC_PUBSUB_LOG__LEVEL", "debug");
        env::set_var("ZUMIC_PUBSUB_LOG__CONSOLE__FORMAT", "json");
        env::set_var(
            "ZUMIC_PUBSUB_LOG__DIRECTIVES",
            "zumic_cluster_pubsub=trace,tokio=warn",
        );

        let settings = PubSubSettings::load();
        clear_env();
        let settings = settings.unwrap();

        assert_eq!(settings.poll_timeout_ms, 0);
        assert_eq!(settings.poll_timeout(), Some(Duration::ZERO));
        assert_eq!(settings.broker_capacity, 16);
        assert_eq!(settings.log.level, "debug");
        assert_eq!(settings.log.console.format, LogFormat::Json);
        assert_eq!(
            settings.log.directives,
            vec!["zumic_cluster_pubsub=trace", "tokio=warn"]
        );
    }

    #[test]
    #[serial]
    fn test_file_then_env() {
        clear_env();
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "poll_timeout_ms = 250\nbroker_capacity = 8\n\n[log]\nlevel = \"warn\""
        )
        .unwrap();

        env::set_var("ZUMIC_PUBSUB_BROKER_CAPACITY", "32");
        let settings = PubSubSettings::load_from(Some(file.path()));
        clear_env();
        let settings = settings.unwrap();

        assert_eq!(settings.poll_timeout_ms, 250);
        assert_eq!(settings.broker_capacity, 32);
        assert_eq!(settings.log.level, "warn");
    }

    #[test]
    #[serial]
    fn test_missing_file_is_error() {
        clear_env();
        let res = PubSubSettings::load_from(Some(Path::new("/definitely/missing/pubsub.toml")));
        assert!(res.is_err());
    }
}
