//! Slash command parsing.

use std::path::PathBuf;

/// A parsed slash command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Persona(String),
    Key(String),
    SoulShow,
    SoulSet(String),
    /// `None` toggles, `Some` forces a direction.
    Sovereign(Option<bool>),
    Attach(PathBuf),
    /// Unstage the given attachment, or the last one when `None`.
    Detach(Option<usize>),
    Clear,
    Help,
    Quit,
}

pub const HELP_TEXT: &str = "commands:\n\
    /persona <name>     switch persona\n\
    /key <token>        store the sovereign API key\n\
    /soul [text]        show or replace the soul memory\n\
    /sovereign [on|off] toggle sovereign mode\n\
    /attach <path>      stage a file for the next prompt\n\
    /detach [n]         unstage the last (or n-th) attachment\n\
    /clear              wipe the transcript and archive\n\
    /quit               leave";

/// Parse one input line. `None` means ordinary chat text; `Some(Err)`
/// carries a user-facing message for a bad or unknown command.
pub fn parse_command(input: &str) -> Option<Result<Command, String>> {
    let rest = input.trim().strip_prefix('/')?;
    let (name, args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (rest, ""),
    };

    let command = match name {
        "persona" => {
            if args.is_empty() {
                return Some(Err("usage: /persona <name>".to_string()));
            }
            Command::Persona(args.to_string())
        }
        "key" => {
            if args.is_empty() {
                return Some(Err("usage: /key <token>".to_string()));
            }
            Command::Key(args.to_string())
        }
        "soul" => {
            if args.is_empty() {
                Command::SoulShow
            } else {
                Command::SoulSet(args.to_string())
            }
        }
        "sovereign" => match args {
            "" => Command::Sovereign(None),
            "on" => Command::Sovereign(Some(true)),
            "off" => Command::Sovereign(Some(false)),
            other => return Some(Err(format!("unknown sovereign flag: {other}"))),
        },
        "attach" => {
            if args.is_empty() {
                return Some(Err("usage: /attach <path>".to_string()));
            }
            Command::Attach(PathBuf::from(args))
        }
        "detach" => {
            if args.is_empty() {
                Command::Detach(None)
            } else {
                match args.parse::<usize>() {
                    Ok(index) => Command::Detach(Some(index)),
                    Err(_) => return Some(Err("usage: /detach [index]".to_string())),
                }
            }
        }
        "clear" => Command::Clear,
        "help" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Some(Err(format!("unknown command: /{other}"))),
    };
    Some(Ok(command))
}
