//! Slash commands for interactive mode

mod locale;

pub use locale::LocaleCommand;

use manus_session::Locale;

/// Result of executing a slash command
#[derive(Debug, PartialEq, Eq)]
pub enum CommandResult {
    /// Create a new agent and start over
    NewAgent,
    /// Show a shell session's output
    ViewShell(String),
    /// Show a file from the sandbox
    ViewFile(String),
    /// Print the remote desktop URL
    ShowVnc,
    /// Change the display language
    ChangeLocale(Locale),
    /// Print the conversation so far
    ShowHistory,
    /// Print the conversation title
    ShowTitle,
    /// Show a message to the user (not sent to agent)
    Message(String),
    /// Exit the application
    Exit,
    /// Unknown command
    Unknown(String),
}

/// Parse and execute a slash command
pub fn execute_command(input: &str, current_locale: Locale) -> Option<CommandResult> {
    let input = input.trim();

    let rest = input.strip_prefix('/')?;
    let parts: Vec<&str> = rest.splitn(2, ' ').collect();
    let command = parts[0].to_lowercase();
    let args = parts.get(1).map(|s| s.trim()).unwrap_or("");

    Some(match command.as_str() {
        "help" | "h" | "?" => CommandResult::Message(help_message()),

        "new" | "n" => CommandResult::NewAgent,

        "shell" => {
            if args.is_empty() {
                CommandResult::Message("Usage: /shell <session id>".to_string())
            } else {
                CommandResult::ViewShell(args.to_string())
            }
        }

        "file" | "f" => {
            if args.is_empty() {
                CommandResult::Message("Usage: /file <path>".to_string())
            } else {
                CommandResult::ViewFile(args.to_string())
            }
        }

        "vnc" => CommandResult::ShowVnc,

        "locale" | "l" => LocaleCommand::execute(args, current_locale),

        "history" => CommandResult::ShowHistory,

        "title" => CommandResult::ShowTitle,

        "quit" | "exit" | "q" => CommandResult::Exit,

        _ => CommandResult::Unknown(command),
    })
}

fn help_message() -> String {
    r#"Available commands:
  /help, /h, /?        Show this help message
  /new, /n             Create a new agent and start a fresh conversation
  /shell <id>          Show output of a shell session
  /file, /f <path>     Show a file from the agent's sandbox
  /vnc                 Print the remote desktop WebSocket URL
  /locale, /l [lang]   Show or set display language (en/zh)
  /history             Show the conversation so far
  /title               Show the conversation title
  /quit, /exit, /q     Exit manus

Anything else is sent to the agent. Ctrl-C stops a running turn,
or exits at the prompt."#
        .to_string()
}
