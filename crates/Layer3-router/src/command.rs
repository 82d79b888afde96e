//! Command table
//!
//! 채팅 텍스트 → [`Command`]. 인자를 받는 명령어는 `/name <arg>` 형태만
//! 인식하고, 인자가 없는 명령어 뒤에 텍스트가 붙으면 일반 prompt로 취급한다.

pub const HELP_TEXT: &str = "\
Commands:
  /task <prompt>  — run Claude Code (continues current session)
  /new            — start a fresh Claude session
  /shell <cmd>    — run a shell command
  /confirm        — confirm a dangerous shell command
  /deny           — cancel a pending shell command
  /cancel         — terminate the running task
  /cd <path>      — change working directory (clears session)
  /status         — show current state
  /help           — show this message";

/// Parsed inbound command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/task <prompt>` or plain text
    Task(String),
    Shell(String),
    New,
    Confirm,
    Deny,
    Cancel,
    Cd(String),
    Status,
    Help,
    /// Argument command sent without its argument
    Usage(&'static str),
}

/// Commands that take an argument, with their usage line
const WITH_ARGUMENT: &[(&str, &str)] = &[
    ("/task", "Usage: /task <prompt>"),
    ("/shell", "Usage: /shell <command>"),
    ("/cd", "Usage: /cd <path>"),
];

impl Command {
    /// Parse trimmed chat text. Blank text is not a command.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let (head, rest) = match text.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (text, ""),
        };

        if let Some((_, usage)) = WITH_ARGUMENT.iter().find(|(name, _)| *name == head) {
            if rest.is_empty() {
                return Some(Command::Usage(usage));
            }
            let arg = rest.to_string();
            return Some(match head {
                "/task" => Command::Task(arg),
                "/shell" => Command::Shell(arg),
                _ => Command::Cd(arg),
            });
        }

        if !rest.is_empty() {
            return Some(Command::Task(text.to_string()));
        }
        Some(match head {
            "/new" => Command::New,
            "/confirm" => Command::Confirm,
            "/deny" => Command::Deny,
            "/cancel" => Command::Cancel,
            "/status" => Command::Status,
            "/help" | "/start" => Command::Help,
            _ => Command::Task(text.to_string()),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Task(_) => "task",
            Command::Shell(_) => "shell",
            Command::New => "new",
            Command::Confirm => "confirm",
            Command::Deny => "deny",
            Command::Cancel => "cancel",
            Command::Cd(_) => "cd",
            Command::Status => "status",
            Command::Help => "help",
            Command::Usage(_) => "usage",
        }
    }
}
