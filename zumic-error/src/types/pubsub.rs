use std::any::Any;

use crate::{ErrorExt, StatusCode};

/// Ошибки построения и проверки pub/sub команд.
#[derive(Debug, Clone)]
pub enum PubSubError {
    /// Команда без аргументов
    EmptyCommand,
    /// Неверные аргументы команды (арность, формат)
    InvalidArgument { command: String, reason: String },
    /// Невалидный glob-шаблон подписки
    InvalidPattern { pattern: String, reason: String },
}

impl std::fmt::Display for PubSubError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            Self::EmptyCommand => write!(f, "can't issue an empty command"),
            Self::InvalidArgument { command, reason } => {
                write!(f, "Invalid arguments for '{command}': {reason}")
            }
            Self::InvalidPattern { pattern, reason } => {
                write!(f, "Invalid glob pattern '{pattern}': {reason}")
            }
        }
    }
}

impl std::error::Error for PubSubError {}

impl ErrorExt for PubSubError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::EmptyCommand => StatusCode::EmptyCommand,
            Self::InvalidArgument { .. } => StatusCode::InvalidArgs,
            Self::InvalidPattern { .. } => StatusCode::InvalidPattern,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn metrics_tags(&self) -> Vec<(&'static str, String)> {
        let mut tags = vec![
            ("error_type", "pubsub".to_string()),
            ("status_code", self.status_code().to_string()),
        ];

        match self {
            Self::InvalidArgument { command, .. } => tags.push(("command", command.clone())),
            Self::InvalidPattern { pattern, .. } => tags.push(("pattern", pattern.clone())),
            Self::EmptyCommand => {}
        }

        tags
    }
}
