use log::info;
use tokio::io::{ AsyncBufRead, AsyncBufReadExt, BufReader };
use tokio::task::JoinSet;

use crate::session::{ Dispatch, GhostController };

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Share,
    Stop,
    Learn,
    Analyze,
    Status,
    Dismiss,
    Quit,
    Chat(String),
    Unknown(String),
}

impl ConsoleCommand {
    pub fn parse(line: &str) -> Option<Self> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }
        let command = match trimmed {
            "/share" => ConsoleCommand::Share,
            "/stop" => ConsoleCommand::Stop,
            "/learn" => ConsoleCommand::Learn,
            "/analyze" => ConsoleCommand::Analyze,
            "/status" => ConsoleCommand::Status,
            "/dismiss" => ConsoleCommand::Dismiss,
            "/quit" | "/exit" => ConsoleCommand::Quit,
            other if other.starts_with('/') => ConsoleCommand::Unknown(other.to_string()),
            _ => ConsoleCommand::Chat(line.to_string()),
        };
        Some(command)
    }
}

const HELP: &str = "commands: /share /stop /learn /analyze /status /dismiss /quit, anything else is chat";

async fn print_status(controller: &GhostController) {
    let snapshot = controller.snapshot().await;
    println!("[{}] learning: {}", controller.phase().await, snapshot.learning);
    println!("  suggested: {}", snapshot.action);
    if let Some(tip) = &snapshot.coaching_tip {
        println!("  tip: {}", tip);
    }
    if let Some(frame) = &snapshot.captured_frame {
        println!("  frame: {}x{} at {}", frame.width, frame.height, frame.captured_at);
    }
    if let Some(err) = controller.error().await {
        println!("  error: {} (/dismiss to clear)", err);
    }
}

/// Reads commands from stdin until `/quit` or EOF.
pub async fn run_console(controller: GhostController) -> std::io::Result<()> {
    run_console_with(controller, BufReader::new(tokio::io::stdin())).await
}

/// Drives the controller from `input`. Chat replies still pending when input
/// ends are awaited before returning.
pub async fn run_console_with<R>(controller: GhostController, input: R) -> std::io::Result<()>
    where R: AsyncBufRead + Unpin
{
    println!("{}", HELP);
    let mut lines = input.lines();
    let mut pending_replies = JoinSet::new();

    let result = loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break Ok(()),
            Err(e) => break Err(e),
        };
        while pending_replies.try_join_next().is_some() {}

        let Some(command) = ConsoleCommand::parse(&line) else {
            continue;
        };
        match command {
            ConsoleCommand::Share => {
                match controller.start_screen_capture().await {
                    Ok(id) => println!("sharing (session {})", id),
                    Err(e) => println!("Connection Error: {}", e),
                }
            }
            ConsoleCommand::Stop => controller.stop_screen_capture().await,
            ConsoleCommand::Learn => {
                let on = controller.toggle_learning().await;
                println!("auto-learn: {}", if on { "ON" } else { "OFF" });
            }
            ConsoleCommand::Analyze => {
                println!("cycle: {:?}", controller.analyze_now().await);
            }
            ConsoleCommand::Status => print_status(&controller).await,
            ConsoleCommand::Dismiss => controller.dismiss_error().await,
            ConsoleCommand::Quit => break Ok(()),
            ConsoleCommand::Unknown(cmd) => println!("unknown command {}; {}", cmd, HELP),
            ConsoleCommand::Chat(text) => {
                // Replies print when ready so a slow call never blocks input.
                let controller = controller.clone();
                pending_replies.spawn(async move {
                    if let Dispatch::Replied { assistant, .. } = controller.send_message(&text).await {
                        println!("ghost> {}", assistant.content());
                    }
                });
            }
        }
    };

    if !pending_replies.is_empty() {
        info!("waiting for {} pending replies", pending_replies.len());
    }
    while pending_replies.join_next().await.is_some() {}

    info!("console closed");
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands_and_chat() {
        assert_eq!(ConsoleCommand::parse("  /learn "), Some(ConsoleCommand::Learn));
        assert_eq!(ConsoleCommand::parse("/exit"), Some(ConsoleCommand::Quit));
        assert_eq!(
            ConsoleCommand::parse("how do I beat Papyrus?"),
            Some(ConsoleCommand::Chat("how do I beat Papyrus?".to_string()))
        );
        assert_eq!(ConsoleCommand::parse("/dance"), Some(ConsoleCommand::Unknown("/dance".to_string())));
        assert_eq!(ConsoleCommand::parse("   "), None);
    }
}
