//! Command-line parsing
//!
//! ```text
//! procgen demo <out>
//! procgen eval <file> [--seed N] [--view L] [--render L] [--config path]
//! procgen info <file>
//! ```

use std::path::PathBuf;

use thiserror::Error;

pub const USAGE: &str = "\
usage:
  procgen demo <out>
  procgen eval <file> [--seed N] [--view L] [--render L] [--config path]
  procgen info <file>";

/// Errors surfaced by the binary
#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),

    #[error(transparent)]
    Engine(#[from] procgen_engine::ProcEngineError),

    #[error("failed to write output: {0}")]
    Output(#[from] serde_json::Error),
}

/// Overrides applied before evaluating
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvalOptions {
    pub seed: Option<i64>,
    pub view_level: Option<i32>,
    pub rendering_level: Option<i32>,
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Demo { out: PathBuf },
    Eval { file: PathBuf, options: EvalOptions },
    Info { file: PathBuf },
}

fn usage(msg: impl Into<String>) -> CliError {
    CliError::Usage(msg.into())
}

fn value<T: std::str::FromStr>(flag: &str, raw: Option<&String>) -> Result<T, CliError> {
    let raw = raw.ok_or_else(|| usage(format!("{} needs a value", flag)))?;
    raw.parse()
        .map_err(|_| usage(format!("invalid value for {}: {}", flag, raw)))
}

/// Parse `args` as received by `main`, program name included
pub fn parse(args: &[String]) -> Result<Command, CliError> {
    let mut rest = args.iter().skip(1);
    let command = rest.next().ok_or_else(|| usage("missing command"))?;
    let path = rest
        .next()
        .map(PathBuf::from)
        .ok_or_else(|| usage(format!("{} needs a file argument", command)))?;

    match command.as_str() {
        "demo" => no_more(rest).map(|()| Command::Demo { out: path }),
        "info" => no_more(rest).map(|()| Command::Info { file: path }),
        "eval" => {
            let mut options = EvalOptions::default();
            while let Some(flag) = rest.next() {
                match flag.as_str() {
                    "--seed" => options.seed = Some(value(flag, rest.next())?),
                    "--view" => options.view_level = Some(value(flag, rest.next())?),
                    "--render" => options.rendering_level = Some(value(flag, rest.next())?),
                    "--config" => options.config = Some(value(flag, rest.next())?),
                    other => return Err(usage(format!("unknown option {}", other))),
                }
            }
            Ok(Command::Eval { file: path, options })
        }
        other => Err(usage(format!("unknown command {}", other))),
    }
}

fn no_more<'a>(mut rest: impl Iterator<Item = &'a String>) -> Result<(), CliError> {
    match rest.next() {
        Some(extra) => Err(usage(format!("unexpected argument {}", extra))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(line: &str) -> Vec<String> {
        std::iter::once("procgen").chain(line.split_whitespace()).map(String::from).collect()
    }

    #[test]
    fn test_parse_eval_with_options() {
        let command = parse(&args("eval yard.proc --seed -7 --view 2 --config c.json")).unwrap();
        assert_eq!(
            command,
            Command::Eval {
                file: PathBuf::from("yard.proc"),
                options: EvalOptions {
                    seed: Some(-7),
                    view_level: Some(2),
                    rendering_level: None,
                    config: Some(PathBuf::from("c.json")),
                },
            }
        );
    }

    #[test]
    fn test_parse_demo_and_info() {
        assert_eq!(parse(&args("demo out.proc")).unwrap(), Command::Demo { out: "out.proc".into() });
        assert_eq!(parse(&args("info a.proc")).unwrap(), Command::Info { file: "a.proc".into() });
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(parse(&args("")), Err(CliError::Usage(_))));
        assert!(matches!(parse(&args("eval")), Err(CliError::Usage(_))));
        assert!(matches!(parse(&args("eval a --seed")), Err(CliError::Usage(_))));
        assert!(matches!(parse(&args("eval a --seed x")), Err(CliError::Usage(_))));
        assert!(matches!(parse(&args("eval a --fast")), Err(CliError::Usage(_))));
        assert!(matches!(parse(&args("info a b")), Err(CliError::Usage(_))));
        assert!(matches!(parse(&args("paint a")), Err(CliError::Usage(_))));
    }
}
