//! Line parsing for the interactive shell.

/// One line of shell input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Plain text for the bot.
    Say(String),
    /// `#N`: send quick reply N (1-based).
    QuickReply(usize),
    Open,
    Close,
    Replies,
    Export,
    Help,
    Quit,
    /// A `/` command nobody recognises.
    Unknown(String),
}

pub const HELP: &str = "\
Commands:
  /open      expand the chat and clear the unread badge
  /close     collapse the chat
  /replies   list quick replies for the last bot message
  /export    print the transcript as JSON
  /help      show this help
  /quit      leave
  #N         send quick reply N
Anything else is sent to CraneBot.";

pub fn parse_command(line: &str) -> Command {
    let trimmed = line.trim();
    if let Some(rest) = trimmed.strip_prefix('#') {
        if let Ok(n) = rest.trim().parse::<usize>() {
            return Command::QuickReply(n);
        }
    }
    if let Some(name) = trimmed.strip_prefix('/') {
        return match name.to_ascii_lowercase().as_str() {
            "open" => Command::Open,
            "close" => Command::Close,
            "replies" => Command::Replies,
            "export" => Command::Export,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            _ => Command::Unknown(trimmed.to_string()),
        };
    }
    // Sent as typed; the session decides what blank means.
    Command::Say(line.to_string())
}

/// Pick quick reply `n` (1-based).
pub fn pick_quick_reply(replies: &[String], n: usize) -> Option<&str> {
    n.checked_sub(1)
        .and_then(|i| replies.get(i))
        .map(String::as_str)
}
