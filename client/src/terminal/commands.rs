use std::path::PathBuf;

/// One line of user input on the chat screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Plain text for the active contact.
    Send(String),
    Contacts,
    Search(String),
    Open(String),
    /// React to the `index`th message (1-based, as printed).
    React { index: usize, emoji: String },
    Clear,
    Backgrounds,
    SelectBackground(String),
    UploadBackground(PathBuf),
    Profile,
    Logout,
    Quit,
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("unknown command: /{0} (try /help)")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
}

pub const HELP: &str = "\
Type a message and press enter to send it to the open chat.

  /contacts            list contacts
  /search <text>       find contacts by name
  /open <id>           open a chat
  /react <n> <emoji>   toggle a reaction on message n
  /clear               clear the open chat
  /bg                  list backgrounds
  /bg <id>             choose a background
  /bg upload <path>    use an image file as background
  /profile             show your profile
  /logout              sign out
  /quit                exit";

impl Command {
    /// Parses a line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Ok(Some(Self::Send(line.to_string())));
        };

        let (name, args) = match rest.split_once(char::is_whitespace) {
            Some((name, args)) => (name, args.trim()),
            None => (rest, ""),
        };

        let command = match name {
            "contacts" => Self::Contacts,
            "search" => Self::Search(args.to_string()),
            "open" if !args.is_empty() => Self::Open(args.to_string()),
            "open" => return Err(CommandError::Usage("/open <id>")),
            "react" => parse_react(args)?,
            "clear" => Self::Clear,
            "bg" => parse_background(args)?,
            "profile" => Self::Profile,
            "logout" => Self::Logout,
            "quit" | "exit" => Self::Quit,
            "help" | "?" => Self::Help,
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(Some(command))
    }
}

fn parse_react(args: &str) -> Result<Command, CommandError> {
    const USAGE: &str = "/react <n> <emoji>";
    let mut parts = args.split_whitespace();
    let index = parts
        .next()
        .and_then(|n| n.parse::<usize>().ok())
        .filter(|n| *n > 0)
        .ok_or(CommandError::Usage(USAGE))?;
    let emoji = parts.next().ok_or(CommandError::Usage(USAGE))?;
    if parts.next().is_some() {
        return Err(CommandError::Usage(USAGE));
    }
    Ok(Command::React {
        index,
        emoji: emoji.to_string(),
    })
}

fn parse_background(args: &str) -> Result<Command, CommandError> {
    if args.is_empty() {
        return Ok(Command::Backgrounds);
    }
    match args.split_once(char::is_whitespace) {
        Some(("upload", path)) => Ok(Command::UploadBackground(PathBuf::from(path.trim()))),
        None if args == "upload" => Err(CommandError::Usage("/bg upload <path>")),
        None => Ok(Command::SelectBackground(args.to_string())),
        Some(_) => Err(CommandError::Usage("/bg [<id> | upload <path>]")),
    }
}
