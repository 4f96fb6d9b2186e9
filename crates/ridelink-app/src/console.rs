//! Line-oriented console that drives a session from stdin.

use ridelink_driver::SessionHandle;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    Toggle,
    Start,
    Stop,
    Destroy,
    Dismiss,
    Status,
    Help,
    Quit,
}

impl ConsoleCommand {
    pub fn parse(line: &str) -> Option<Self> {
        let command = match line.trim().to_ascii_lowercase().as_str() {
            "toggle" | "t" => Self::Toggle,
            "start" => Self::Start,
            "stop" => Self::Stop,
            "destroy" => Self::Destroy,
            "dismiss" => Self::Dismiss,
            "status" | "s" => Self::Status,
            "help" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            _ => return None,
        };
        Some(command)
    }
}

const HELP: &str = "commands: toggle, start, stop, destroy, dismiss, status, quit";

/// Read commands until `quit` or end of input.
pub async fn run(handle: &SessionHandle) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("{HELP}");

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "failed to read stdin");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let Some(command) = ConsoleCommand::parse(&line) else {
            println!("unknown command: {}. {HELP}", line.trim());
            continue;
        };

        let result = match command {
            ConsoleCommand::Toggle => handle.toggle().await,
            ConsoleCommand::Start => handle.start().await,
            ConsoleCommand::Stop => handle.stop().await,
            ConsoleCommand::Destroy => handle.destroy().await,
            ConsoleCommand::Dismiss => handle.dismiss_permission_notice().await,
            ConsoleCommand::Status => match handle.snapshot().await {
                Ok(view) => {
                    match serde_json::to_string_pretty(&view) {
                        Ok(json) => println!("{json}"),
                        Err(e) => warn!(error = %e, "failed to render status"),
                    }
                    Ok(())
                }
                Err(e) => Err(e),
            },
            ConsoleCommand::Help => {
                println!("{HELP}");
                Ok(())
            }
            ConsoleCommand::Quit => break,
        };

        if let Err(e) = result {
            warn!(error = %e, "session unavailable");
            break;
        }
    }
    info!("console closed");
}
