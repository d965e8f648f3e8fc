//! Логирование на `tracing`: фильтр из `RUST_LOG` или конфигурации,
//! консольный вывод и опциональный файл через non-blocking appender.

pub mod config;
mod filters;
mod formatter;
pub mod handle;

pub use config::{ConsoleConfig, FileConfig, LogFormat, LoggingConfig, LoggingError, Rotation};
pub use handle::LoggingHandle;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Registry};

/// Инициализация глобального subscriber-а по конфигурации.
///
/// Возвращённый [`LoggingHandle`] нужно держать до завершения программы,
/// иначе файловый вывод остановится.
pub fn init_logging(config: &LoggingConfig) -> Result<LoggingHandle, LoggingError> {
    config.validate()?;
    config.ensure_log_dir()?;

    let env_filter = filters::build_filter(config)?;
    let mut layers: Vec<formatter::BoxedLayer<Registry>> = Vec::new();

    if config.console.enabled {
        layers.push(formatter::console_layer(&config.console));
    }

    let file_guard = if config.file.enabled {
        let (layer, guard) = formatter::file_layer(&config.file);
        layers.push(layer);
        Some(guard)
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .try_init()
        .map_err(|e| LoggingError::Init(e.to_string()))?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        log_level = %config.level,
        console_format = %config.console.format,
        file_enabled = config.file.enabled,
        "Logging system initialized"
    );

    Ok(LoggingHandle::new(file_guard))
}
