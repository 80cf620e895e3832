use std::path::PathBuf;

use thiserror::Error;

/// One line of terminal input. Indexes are 1-based on the line and 0-based here.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Login { username: String, password: String },
    Logout,
    Agents,
    Agent(String),
    New,
    History,
    Open(usize),
    Delete(usize),
    Attach(Vec<PathBuf>),
    Paste(Vec<PathBuf>),
    Detach(usize),
    Private,
    Thinking(usize),
    Show,
    Errors,
    Help,
    Quit,
    Send(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command: /{0}")]
    Unknown(String),

    #[error("usage: {0}")]
    Usage(&'static str),
}

impl Command {
    /// Parse a line. Blank lines yield `None`; anything not starting with `/`
    /// is a message to send.
    pub fn parse(line: &str) -> Result<Option<Command>, CommandError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Ok(Some(Command::Send(line.to_string())));
        };

        let mut parts = rest.split_whitespace();
        let name = parts.next().unwrap_or_default();
        let args: Vec<&str> = parts.collect();

        let command = match name {
            "login" => match args.as_slice() {
                [username, password] => Command::Login {
                    username: username.to_string(),
                    password: password.to_string(),
                },
                _ => return Err(CommandError::Usage("/login <username> <password>")),
            },
            "logout" => Command::Logout,
            "agents" => Command::Agents,
            "agent" => match args.as_slice() {
                [id] => Command::Agent(id.to_string()),
                _ => return Err(CommandError::Usage("/agent <id>")),
            },
            "new" | "clear" => Command::New,
            "history" => Command::History,
            "open" => Command::Open(index(&args, "/open <n>")?),
            "delete" => Command::Delete(index(&args, "/delete <n>")?),
            "attach" => Command::Attach(paths(&args, "/attach <path>...")?),
            "paste" => Command::Paste(paths(&args, "/paste <path>...")?),
            "detach" => Command::Detach(index(&args, "/detach <n>")?),
            "private" => Command::Private,
            "thinking" => Command::Thinking(index(&args, "/thinking <n>")?),
            "show" => Command::Show,
            "errors" => Command::Errors,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(Some(command))
    }
}

fn index(args: &[&str], usage: &'static str) -> Result<usize, CommandError> {
    match args {
        [n] => n
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .ok_or(CommandError::Usage(usage)),
        _ => Err(CommandError::Usage(usage)),
    }
}

fn paths(args: &[&str], usage: &'static str) -> Result<Vec<PathBuf>, CommandError> {
    if args.is_empty() {
        return Err(CommandError::Usage(usage));
    }
    Ok(args.iter().map(PathBuf::from).collect())
}
