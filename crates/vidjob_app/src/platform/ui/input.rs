//! Prompt commands, one per stdin line.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Submit(String),
    Endpoint(String),
    Download,
    Status,
    Quit,
    Empty,
    /// Anything else; carries the offending line for the error message.
    Unknown(String),
}

pub const USAGE: &str =
    "commands: submit <url> | endpoint <url> | download | status | quit (a bare URL submits it)";

pub fn parse_line(line: &str) -> Command {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    match (word.to_ascii_lowercase().as_str(), rest) {
        ("", _) => Command::Empty,
        ("submit", url) if !url.is_empty() => Command::Submit(url.to_string()),
        ("endpoint", url) if !url.is_empty() => Command::Endpoint(url.to_string()),
        ("download", "") => Command::Download,
        ("status", "") => Command::Status,
        ("quit" | "exit", "") => Command::Quit,
        (_, "") if looks_like_url(word) => Command::Submit(word.to_string()),
        _ => Command::Unknown(line.to_string()),
    }
}

fn looks_like_url(word: &str) -> bool {
    word.contains("://") || word.contains('.')
}
