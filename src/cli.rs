//! Command-line interface for tty-share.
//!
//! Uses lexopt to keep the argument parser small.

use std::ffi::OsString;
use std::net::IpAddr;
use std::path::PathBuf;

/// What the binary was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subcommand {
    /// Attach the local terminal to a shared session.
    Connect {
        /// WebSocket URL of the session.
        url: String,
    },
    /// Share a command over HTTP/WebSocket.
    Serve,
}

/// Command-line arguments.
#[derive(Debug, Clone, Default)]
pub struct Args {
    pub subcommand: Option<Subcommand>,
    /// Host address to bind to.
    pub host: Option<IpAddr>,
    /// Port to listen on.
    pub port: Option<u16>,
    /// Command to share.
    pub command: Option<String>,
    /// Arguments for the shared command.
    pub command_args: Option<Vec<String>>,
    /// Stop the server after the first receiver leaves.
    pub once: bool,
    /// Path to configuration file.
    pub config: Option<PathBuf>,
    /// Log level (error, warn, info, debug, trace).
    pub log_level: Option<String>,
    /// Show version and exit.
    pub version: bool,
    /// Show help and exit.
    pub help: bool,
}

/// Parse command-line arguments.
pub fn parse_args() -> Result<Args, ArgsError> {
    parse_args_from(std::env::args_os())
}

/// Parse arguments from an iterator (for testing).
pub fn parse_args_from<I>(args: I) -> Result<Args, ArgsError>
where
    I: IntoIterator<Item = OsString>,
{
    use lexopt::prelude::*;

    let mut result = Args::default();
    let mut parser = lexopt::Parser::from_iter(args);
    let mut positional: Vec<String> = Vec::new();

    while let Some(arg) = parser.next()? {
        match arg {
            Short('h') | Long("help") => {
                result.help = true;
            }
            Short('V') | Long("version") => {
                result.version = true;
            }
            Short('H') | Long("host") => {
                let value: String = parser.value()?.parse()?;
                result.host = Some(
                    value
                        .parse()
                        .map_err(|_| ArgsError::InvalidValue("host", value))?,
                );
            }
            Short('p') | Long("port") => {
                let value: String = parser.value()?.parse()?;
                result.port = Some(
                    value
                        .parse()
                        .map_err(|_| ArgsError::InvalidValue("port", value))?,
                );
            }
            Long("command") => {
                result.command = Some(parser.value()?.parse()?);
            }
            Long("args") => {
                let value: String = parser.value()?.parse()?;
                result.command_args = Some(split_args(&value));
            }
            Long("once") => {
                result.once = true;
            }
            Short('c') | Long("config") => {
                result.config = Some(parser.value()?.parse()?);
            }
            Short('l') | Long("log-level") => {
                result.log_level = Some(parser.value()?.parse()?);
            }
            Value(val) => {
                positional.push(val.to_string_lossy().into_owned());
            }
            _ => return Err(arg.unexpected().into()),
        }
    }

    if result.help || result.version {
        return Ok(result);
    }

    let mut positional = positional.into_iter();
    result.subcommand = match positional.next().as_deref() {
        None => None,
        Some("serve") => Some(Subcommand::Serve),
        Some("connect") => {
            let url = positional.next().ok_or(ArgsError::MissingValue("url"))?;
            Some(Subcommand::Connect {
                url: websocket_url(&url)?,
            })
        }
        Some(other) => return Err(ArgsError::UnexpectedArgument(other.to_string())),
    };

    if let Some(extra) = positional.next() {
        return Err(ArgsError::UnexpectedArgument(extra));
    }

    Ok(result)
}

/// Split a `--args` value on whitespace, the way the server passes it on.
pub fn split_args(value: &str) -> Vec<String> {
    value.split_whitespace().map(str::to_string).collect()
}

/// Normalize a session URL to a WebSocket URL.
///
/// `http` and `https` map to `ws` and `wss`, so a URL copied from a browser
/// works too.
pub fn websocket_url(url: &str) -> Result<String, ArgsError> {
    if url.starts_with("ws://") || url.starts_with("wss://") {
        Ok(url.to_string())
    } else if let Some(rest) = url.strip_prefix("http://") {
        Ok(format!("ws://{}", rest))
    } else if let Some(rest) = url.strip_prefix("https://") {
        Ok(format!("wss://{}", rest))
    } else {
        Err(ArgsError::InvalidValue("url", url.to_string()))
    }
}

/// Print help message.
pub fn print_help() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        r#"tty-share {version}
Share a terminal session over WebSocket

USAGE:
    tty-share connect <URL> [OPTIONS]
    tty-share serve [OPTIONS]

COMMANDS:
    connect <URL>           Attach this terminal to a session (ws://host:port/ws/<id>)
    serve                   Share a command, one PTY per session id

OPTIONS:
    -H, --host <ADDR>       Host address to bind [default: 127.0.0.1]
    -p, --port <PORT>       Port to listen on [default: 8000]
        --command <CMD>     Command to share [default: $SHELL]
        --args <ARGS>       Arguments for the command, space separated
        --once              Stop serving after the first receiver leaves
    -c, --config <FILE>     Path to configuration file (JSON)
    -l, --log-level <LVL>   Log level (error, warn, info, debug, trace)
    -h, --help              Print help
    -V, --version           Print version

ENVIRONMENT VARIABLES:
    TTY_SHARE_HOST          Host address (overrides config)
    TTY_SHARE_PORT          Port number (overrides config)
    TTY_SHARE_COMMAND       Command to share (overrides config)
    TTY_SHARE_LOG_LEVEL     Log level (overrides config)
    RUST_LOG                Alternative log level setting

EXAMPLES:
    # Share a shell on localhost:8000
    tty-share serve

    # Share htop once, on all interfaces
    tty-share serve -H 0.0.0.0 --command htop --once

    # Attach to session 1
    tty-share connect ws://127.0.0.1:8000/ws/1
"#
    );
}

/// Print version.
pub fn print_version() {
    println!("tty-share {}", env!("CARGO_PKG_VERSION"));
}

/// Argument parsing errors.
#[derive(Debug)]
pub enum ArgsError {
    /// Lexopt parsing error.
    Lexopt(lexopt::Error),
    /// Invalid argument value.
    InvalidValue(&'static str, String),
    /// A required positional value is missing.
    MissingValue(&'static str),
    /// Unexpected positional argument.
    UnexpectedArgument(String),
}

impl std::fmt::Display for ArgsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lexopt(e) => write!(f, "{}", e),
            Self::InvalidValue(name, value) => {
                write!(f, "invalid value for {}: '{}'", name, value)
            }
            Self::MissingValue(name) => write!(f, "missing <{}>", name),
            Self::UnexpectedArgument(arg) => {
                write!(f, "unexpected argument: '{}'", arg)
            }
        }
    }
}

impl std::error::Error for ArgsError {}

impl From<lexopt::Error> for ArgsError {
    fn from(e: lexopt::Error) -> Self {
        Self::Lexopt(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(args: &[&str]) -> Vec<OsString> {
        std::iter::once("tty-share")
            .chain(args.iter().copied())
            .map(OsString::from)
            .collect()
    }

    #[test]
    fn test_no_subcommand() {
        let result = parse_args_from(args(&[])).unwrap();
        assert!(result.subcommand.is_none());
        assert!(result.host.is_none());
        assert!(result.port.is_none());
        assert!(!result.once);
    }

    #[test]
    fn test_serve_host_port() {
        let result = parse_args_from(args(&["serve", "-H", "0.0.0.0", "-p", "8080"])).unwrap();
        assert_eq!(result.subcommand, Some(Subcommand::Serve));
        assert_eq!(result.host.unwrap().to_string(), "0.0.0.0");
        assert_eq!(result.port, Some(8080));
    }

    #[test]
    fn test_serve_command_and_args() {
        let result = parse_args_from(args(&[
            "serve",
            "--command",
            "htop",
            "--args",
            "-d  10 --no-color",
            "--once",
        ]))
        .unwrap();
        assert_eq!(result.command, Some("htop".to_string()));
        assert_eq!(
            result.command_args,
            Some(vec![
                "-d".to_string(),
                "10".to_string(),
                "--no-color".to_string()
            ])
        );
        assert!(result.once);
    }

    #[test]
    fn test_options_before_subcommand() {
        let result = parse_args_from(args(&["-l", "debug", "serve"])).unwrap();
        assert_eq!(result.subcommand, Some(Subcommand::Serve));
        assert_eq!(result.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_connect_url() {
        let result = parse_args_from(args(&["connect", "ws://localhost:8000/ws/1"])).unwrap();
        assert_eq!(
            result.subcommand,
            Some(Subcommand::Connect {
                url: "ws://localhost:8000/ws/1".to_string()
            })
        );
    }

    #[test]
    fn test_connect_http_url_is_normalized() {
        let result = parse_args_from(args(&["connect", "https://example.com/ws/7"])).unwrap();
        assert_eq!(
            result.subcommand,
            Some(Subcommand::Connect {
                url: "wss://example.com/ws/7".to_string()
            })
        );
    }

    #[test]
    fn test_connect_missing_url() {
        let result = parse_args_from(args(&["connect"]));
        assert!(matches!(result, Err(ArgsError::MissingValue("url"))));
    }

    #[test]
    fn test_connect_bad_scheme() {
        let result = parse_args_from(args(&["connect", "ftp://example.com"]));
        assert!(matches!(result, Err(ArgsError::InvalidValue("url", _))));
    }

    #[test]
    fn test_unknown_subcommand() {
        let result = parse_args_from(args(&["share"]));
        assert!(matches!(result, Err(ArgsError::UnexpectedArgument(_))));
    }

    #[test]
    fn test_extra_positional() {
        let result = parse_args_from(args(&["serve", "extra"]));
        assert!(matches!(result, Err(ArgsError::UnexpectedArgument(_))));
    }

    #[test]
    fn test_config_file() {
        let result = parse_args_from(args(&["serve", "-c", "/etc/config.json"])).unwrap();
        assert_eq!(result.config, Some(PathBuf::from("/etc/config.json")));
    }

    #[test]
    fn test_help_flag() {
        let result = parse_args_from(args(&["-h"])).unwrap();
        assert!(result.help);

        let result = parse_args_from(args(&["connect", "--help"])).unwrap();
        assert!(result.help);
    }

    #[test]
    fn test_version_flag() {
        let result = parse_args_from(args(&["-V"])).unwrap();
        assert!(result.version);

        let result = parse_args_from(args(&["--version"])).unwrap();
        assert!(result.version);
    }

    #[test]
    fn test_invalid_port() {
        let result = parse_args_from(args(&["serve", "-p", "invalid"]));
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_host() {
        let result = parse_args_from(args(&["serve", "-H", "not-an-ip"]));
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_flag() {
        let result = parse_args_from(args(&["serve", "--bogus"]));
        assert!(matches!(result, Err(ArgsError::Lexopt(_))));
    }
}
