//! Slash command parsing for the chat client.
//!
//! Input that starts with `/` controls the client locally and is never sent to the backend.

/// A parsed chat command.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Clear the visible transcript and ask the backend to forget the session.
    Clear,

    /// Show the current session identifier.
    Session,

    /// Print replies as rendered markup (`true`) or plain text (`false`).
    Markup(bool),

    /// Display help information.
    Help,

    /// Exit the chat client.
    Quit,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a command, or `None` if it should be sent as
/// a regular message.
///
/// # Examples
///
/// ```
/// # use chatrelay::chat::parse_command;
/// assert!(parse_command("/quit").is_some());
/// assert!(parse_command("/html on").is_some());
/// assert!(parse_command("Hello there!").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();

    let rest = input.strip_prefix('/')?;
    let mut parts = rest.splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "clear" => ChatCommand::Clear,
        "session" => ChatCommand::Session,
        "html" => match argument.and_then(parse_on_off) {
            Some(value) => ChatCommand::Markup(value),
            None => ChatCommand::Invalid("/html expects 'on' or 'off'".to_string()),
        },
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        _ => ChatCommand::Invalid(format!("Unknown command: /{}", command)),
    };

    Some(result)
}

fn parse_on_off(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "on" | "true" | "yes" => Some(true),
        "off" | "false" | "no" => Some(false),
        _ => None,
    }
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /clear                 Clear the conversation (here and on the server)
  /session               Show the current session id
  /html on|off           Print replies as rendered markup or plain text
  /help                  Show this help message
  /quit                  Exit the chat"#
}
