mod arg;
mod builder;

use std::fmt;

use bytes::Bytes;

pub use arg::CommandArg;
pub use builder::{CommandBuilder, DefaultCommandBuilder};

/// Вид pub/sub команды, определяемый по её имени.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Subscribe,
    PSubscribe,
    SSubscribe,
    Unsubscribe,
    PUnsubscribe,
    SUnsubscribe,
    Publish,
    SPublish,
    Ping,
    Other,
}

impl CommandKind {
    pub fn from_name(name: &[u8]) -> Self {
        match name.to_ascii_uppercase().as_slice() {
            b"SUBSCRIBE" => Self::Subscribe,
            b"PSUBSCRIBE" => Self::PSubscribe,
            b"SSUBSCRIBE" => Self::SSubscribe,
            b"UNSUBSCRIBE" => Self::Unsubscribe,
            b"PUNSUBSCRIBE" => Self::PUnsubscribe,
            b"SUNSUBSCRIBE" => Self::SUnsubscribe,
            b"PUBLISH" => Self::Publish,
            b"SPUBLISH" => Self::SPublish,
            b"PING" => Self::Ping,
            _ => Self::Other,
        }
    }

    /// Команды шардированного pub/sub: все каналы обязаны лежать в одном
    /// слоте.
    pub fn is_sharded(self) -> bool {
        matches!(self, Self::SSubscribe | Self::SUnsubscribe | Self::SPublish)
    }
}

/// Каноническая команда: непустой список байтовых аргументов, первый из
/// которых имя команды.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    args: Vec<Bytes>,
}

impl Command {
    /// Собирает команду из готовых аргументов без проверки. Пустые команды
    /// отклоняются на этапе [`CommandBuilder::normalize`].
    pub fn new<I, B>(args: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Имя команды в верхнем регистре (пустая строка для пустой команды).
    pub fn name(&self) -> String {
        self.args
            .first()
            .map(|n| String::from_utf8_lossy(n).to_ascii_uppercase())
            .unwrap_or_default()
    }

    pub fn kind(&self) -> CommandKind {
        self.args
            .first()
            .map(|n| CommandKind::from_name(n))
            .unwrap_or(CommandKind::Other)
    }

    /// Все аргументы, включая имя команды.
    pub fn args(&self) -> &[Bytes] {
        &self.args
    }

    /// Аргументы после имени команды.
    pub fn params(&self) -> &[Bytes] {
        self.args.get(1..).unwrap_or(&[])
    }

    /// Каналы (или шаблоны), которых касается команда.
    ///
    /// Для `PUBLISH`/`SPUBLISH` это только первый параметр, для подписок все
    /// параметры, для остальных команд пусто.
    pub fn channels(&self) -> &[Bytes] {
        let params = self.params();
        match self.kind() {
            CommandKind::Publish | CommandKind::SPublish => &params[..params.len().min(1)],
            CommandKind::Ping | CommandKind::Other => &[],
            _ => params,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }
}

impl fmt::Display for Command {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", String::from_utf8_lossy(arg))?;
        }
        Ok(())
    }
}
