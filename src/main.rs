//! tty-share binary entry point.

use std::process::ExitCode;

use tracing::{error, info};
use tty_share::cli::{self, Subcommand};
use tty_share::config::Config;
use tty_share::server::{self, ServerConfig};
use tty_share::logging;

#[tokio::main]
async fn main() -> ExitCode {
    let args = match cli::parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {}", e);
            eprintln!("Run 'tty-share --help' for usage.");
            return ExitCode::from(2);
        }
    };

    if args.help {
        cli::print_help();
        return ExitCode::SUCCESS;
    }
    if args.version {
        cli::print_version();
        return ExitCode::SUCCESS;
    }

    let Some(subcommand) = args.subcommand.clone() else {
        cli::print_help();
        return ExitCode::from(2);
    };

    let config = match Config::load(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = match subcommand {
        Subcommand::Serve => {
            let server_config = match config.to_server_config() {
                Ok(server_config) => server_config,
                Err(e) => {
                    eprintln!("error: {}", e);
                    return ExitCode::FAILURE;
                }
            };
            let _ = logging::try_init_with(config.log_filter());
            serve(server_config).await
        }
        Subcommand::Connect { url } => {
            // stdout belongs to the remote session
            let _ = logging::try_init_stderr(config.log_filter());
            connect(url).await
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn serve(server_config: ServerConfig) -> tty_share::Result<()> {
    info!("tty-share v{}", env!("CARGO_PKG_VERSION"));
    server::serve(server_config).await
}

#[cfg(unix)]
async fn connect(url: String) -> tty_share::Result<()> {
    use tokio::sync::mpsc;
    use tty_share::receiver::{run, ResizeSubscription, TtyReceiver, WsTransport};
    use tty_share::widget::local::{LocalTerminal, StdinReader};

    let (tx, mut events) = mpsc::channel(64);
    let stdin = StdinReader::spawn(tx.clone());
    let _resize = ResizeSubscription::window_changes(tx)?;

    let mut receiver = TtyReceiver::new(url.clone(), LocalTerminal::new());
    let mut transport = WsTransport::new();

    tokio::select! {
        result = run(&mut receiver, &mut transport, &mut events) => result,
        () = stdin.detached() => {
            info!(url = %url, "detached from session");
            Ok(())
        }
    }
}

#[cfg(not(unix))]
async fn connect(_url: String) -> tty_share::Result<()> {
    Err(tty_share::TtyShareError::Io(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "connect needs a Unix terminal",
    )))
}
