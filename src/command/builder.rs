use zumic_error::{ensure, PubSubError, ZumicResult};

use super::{Command, CommandArg};

/// Приводит сырые аргументы к канонической [`Command`].
pub trait CommandBuilder: Send + Sync {
    fn generate(
        &self,
        args: Vec<CommandArg>,
    ) -> ZumicResult<Command>;

    fn normalize(
        &self,
        command: Command,
    ) -> ZumicResult<Command>;
}

/// Построитель по умолчанию: раскладывает аргументы в байтовые строки и
/// отклоняет пустые команды.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultCommandBuilder;

impl CommandBuilder for DefaultCommandBuilder {
    fn generate(
        &self,
        args: Vec<CommandArg>,
    ) -> ZumicResult<Command> {
        let mut flat = Vec::with_capacity(args.len());
        for arg in args {
            arg.flatten_into(&mut flat);
        }
        self.normalize(Command { args: flat })
    }

    fn normalize(
        &self,
        command: Command,
    ) -> ZumicResult<Command> {
        ensure!(!command.is_empty(), PubSubError::EmptyCommand);
        Ok(command)
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use zumic_error::StatusCode;

    use super::*;

    #[test]
    fn test_generate_mixed_args() {
        let cmd = DefaultCommandBuilder
            .generate(vec![
                "PUBLISH".into(),
                "metrics".into(),
                CommandArg::from(17i64),
            ])
            .unwrap();
        assert_eq!(
            cmd.args(),
            &[
                Bytes::from("PUBLISH"),
                Bytes::from("metrics"),
                Bytes::from("17")
            ]
        );
    }

    /// Тест проверяет, что команда из одних выключенных флагов считается
    /// пустой.
    #[test]
    fn test_generate_empty_after_flatten() {
        let err = DefaultCommandBuilder
            .generate(vec![CommandArg::flag("NOACK", false)])
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::EmptyCommand);
        assert_eq!(err.to_string(), "can't issue an empty command");
    }

    #[test]
    fn test_normalize() {
        let cmd = Command::new(["PING"]);
        assert_eq!(DefaultCommandBuilder.normalize(cmd.clone()).unwrap(), cmd);
        assert!(DefaultCommandBuilder
            .normalize(Command::new(Vec::<Bytes>::new()))
            .is_err());
    }
}
