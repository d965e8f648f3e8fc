use std::fmt;

use num_enum::TryFromPrimitive;

/// Коды статуса для категоризации ошибок клиента.
///
/// # Диапазоны:
/// - 0xxx: Успех
/// - 1xxx: Общие ошибки
/// - 6xxx: Сессии узлов
/// - 7xxx: Кластерные ошибки (маршрутизация)
/// - 8xxx: Протокольные ошибки и ошибки pub/sub команд
///
/// `num_enum::TryFromPrimitive` даёт `TryFrom<u32>`, что удобно при
/// пробросе кода через границы процесса.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive)]
#[repr(u32)]
#[non_exhaustive]
pub enum StatusCode {
    // === 0xxx: Успех ===
    Success = 0,

    // === 1xxx: Общие ошибки ===
    Unknown = 1000,
    Unsupported = 1001,
    Unexpected = 1002,
    Internal = 1003,
    InvalidArgs = 1004,

    // === 6xxx: Сессии узлов ===
    ConnectionClosed = 6001,
    ProtocolError = 6003,

    // === 7xxx: Кластер ===
    ClusterDown = 7000,
    CrossSlot = 7002,
    InvalidShard = 7004,
    InvalidSlot = 7005,

    // === 8xxx: Протокол / pub/sub ===
    InvalidCommand = 8001,
    EmptyCommand = 8002,
    InvalidPattern = 8003,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl StatusCode {
    /// Числовое представление кода статуса.
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Пытается получить `StatusCode` из `u32`; `None`, если такого кода нет.
    pub fn from_u32(v: u32) -> Option<Self> {
        Self::try_from(v).ok()
    }

    /// Имеет ли смысл повторить операцию с этим кодом.
    ///
    /// Мультиплексор сам ничего не повторяет, но вызывающий код может
    /// опираться на этот признак.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConnectionClosed | Self::ClusterDown)
    }

    /// Вернёт `true`, если `code` означает успешный результат.
    pub fn is_success(code: u32) -> bool {
        Self::Success as u32 == code
    }

    /// Ошибка в запросе вызывающего (аргументы, команда, шаблон).
    pub fn is_client_error(&self) -> bool {
        let c = self.code();
        (8000..=8999).contains(&c) || *self == Self::InvalidArgs
    }

    /// Ошибка маршрутизации по кластеру (диапазон 7xxx).
    pub fn is_cluster_error(&self) -> bool {
        (7000..=7999).contains(&self.code())
    }

    /// Ошибка транспорта/сессии узла (диапазон 6xxx).
    pub fn is_transport_error(&self) -> bool {
        (6000..=6999).contains(&self.code())
    }

    /// Рекомендуемый уровень логирования для данного кода.
    pub fn log_level(&self) -> LogLevel {
        match self {
            Self::Success => LogLevel::Trace,
            Self::InvalidArgs
            | Self::InvalidCommand
            | Self::EmptyCommand
            | Self::InvalidPattern
            | Self::CrossSlot => LogLevel::Info,
            Self::ConnectionClosed => LogLevel::Debug,
            Self::Internal | Self::ClusterDown => LogLevel::Error,
            _ => LogLevel::Warn,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов для StatusCode
////////////////////////////////////////////////////////////////////////////////

impl From<StatusCode> for u32 {
    fn from(c: StatusCode) -> Self {
        c.code()
    }
}

impl fmt::Display for StatusCode {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{:?} ({})", self, self.code())
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
