use crate::{ErrorExt, StatusCode};

/// Ошибки сессии узла (транспортный уровень).
#[derive(Debug, Clone)]
pub enum ClientError {
    /// Сессия уже закрыта
    ConnectionClosed { node_id: String },
    /// Команда не поддерживается сессией
    UnknownCommand { command: String },
    /// Ответ узла не удалось интерпретировать
    UnexpectedReply { reason: String },
}

impl std::fmt::Display for ClientError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            Self::ConnectionClosed { node_id } => {
                write!(f, "Pub/sub session with {node_id} is closed")
            }
            Self::UnknownCommand { command } => write!(f, "Unknown command: {command}"),
            Self::UnexpectedReply { reason } => write!(f, "Unexpected reply: {reason}"),
        }
    }
}

impl std::error::Error for ClientError {}

impl ErrorExt for ClientError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::ConnectionClosed { .. } => StatusCode::ConnectionClosed,
            Self::UnknownCommand { .. } => StatusCode::InvalidCommand,
            Self::UnexpectedReply { .. } => StatusCode::ProtocolError,
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn client_message(&self) -> String {
        match self {
            Self::ConnectionClosed { .. } => "Session closed".to_string(),
            Self::UnknownCommand { command } => format!("Unknown command: {command}"),
            Self::UnexpectedReply { .. } => "Protocol error".to_string(),
        }
    }

    fn metrics_tags(&self) -> Vec<(&'static str, String)> {
        let mut tags = vec![
            ("error_type", "client".to_string()),
            ("status_code", self.status_code().to_string()),
        ];

        match self {
            Self::ConnectionClosed { node_id } => tags.push(("node_id", node_id.clone())),
            Self::UnknownCommand { command } => tags.push(("command", command.clone())),
            Self::UnexpectedReply { .. } => {}
        }

        tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_closed() {
        let err = ClientError::ConnectionClosed {
            node_id: "10.0.0.2:7001".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::ConnectionClosed);
        assert!(err.status_code().is_retryable());
        assert!(err.to_string().contains("10.0.0.2:7001"));

        let tags = err.metrics_tags();
        assert!(tags
            .iter()
            .any(|(k, v)| *k == "node_id" && v == "10.0.0.2:7001"));
    }

    #[test]
    fn test_unknown_command_is_client_error() {
        let err = ClientError::UnknownCommand {
            command: "FLUSHALL".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::InvalidCommand);
        assert!(err.status_code().is_client_error());
        assert_eq!(err.client_message(), "Unknown command: FLUSHALL");
    }

    #[test]
    fn test_unexpected_reply_hides_reason_from_client() {
        let err = ClientError::UnexpectedReply {
            reason: "array length -3".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::ProtocolError);
        assert!(!err.status_code().is_retryable());
        assert!(!err.client_message().contains("-3"));
        assert!(err.to_string().contains("-3"));
    }
}
