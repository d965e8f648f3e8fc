use bytes::Bytes;

/// Сырой аргумент команды до нормализации.
///
/// Помимо обычных значений поддерживает keyword-аргументы: флаг, который
/// попадает в команду только если включён, и именованную опцию, которая
/// попадает в команду парой `name value` только при наличии значения.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandArg {
    Bulk(Bytes),
    Int(i64),
    Float(f64),
    Flag { name: String, enabled: bool },
    Keyword { name: String, value: Option<Bytes> },
}

impl CommandArg {
    pub fn flag(
        name: impl Into<String>,
        enabled: bool,
    ) -> Self {
        Self::Flag {
            name: name.into(),
            enabled,
        }
    }

    pub fn keyword<V: Into<Bytes>>(
        name: impl Into<String>,
        value: Option<V>,
    ) -> Self {
        Self::Keyword {
            name: name.into(),
            value: value.map(Into::into),
        }
    }

    /// Раскладывает аргумент в байтовые строки команды.
    pub(crate) fn flatten_into(
        self,
        out: &mut Vec<Bytes>,
    ) {
        match self {
            Self::Bulk(b) => out.push(b),
            Self::Int(i) => out.push(Bytes::from(i.to_string())),
            Self::Float(f) => out.push(Bytes::from(f.to_string())),
            Self::Flag { name, enabled } => {
                if enabled {
                    out.push(Bytes::from(name));
                }
            }
            Self::Keyword { name, value } => {
                if let Some(value) = value {
                    out.push(Bytes::from(name));
                    out.push(value);
                }
            }
        }
    }
}

impl From<&str> for CommandArg {
    fn from(s: &str) -> Self {
        Self::Bulk(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl From<String> for CommandArg {
    fn from(s: String) -> Self {
        Self::Bulk(Bytes::from(s))
    }
}

impl From<&String> for CommandArg {
    fn from(s: &String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<&[u8]> for CommandArg {
    fn from(b: &[u8]) -> Self {
        Self::Bulk(Bytes::copy_from_slice(b))
    }
}

impl From<Vec<u8>> for CommandArg {
    fn from(b: Vec<u8>) -> Self {
        Self::Bulk(Bytes::from(b))
    }
}

impl From<Bytes> for CommandArg {
    fn from(b: Bytes) -> Self {
        Self::Bulk(b)
    }
}

impl From<f64> for CommandArg {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

macro_rules! int_arg {
    ($($t:ty),*) => {
        $(
            impl From<$t> for CommandArg {
                fn from(i: $t) -> Self {
                    Self::Int(i64::from(i))
                }
            }
        )*
    };
}

int_arg!(i8, i16, i32, i64, u8, u16, u32);
