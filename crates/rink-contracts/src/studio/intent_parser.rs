use std::path::PathBuf;

use super::command_registry::is_known;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StudioCommand {
    Noop,
    SetText(String),
    SetColors(String),
    SetCount(usize),
    SetSlot { index: usize, color: String },
    AutoPalette,
    SetStyle(String),
    SetMode(String),
    SetReference(PathBuf),
    ClearReference,
    Generate,
    Randomize,
    History,
    Select(String),
    Delete(String),
    Show,
    Download(Option<PathBuf>),
    Copy,
    Diff { from: String, to: String },
    Dismiss,
    Params,
    Styles,
    Help,
    Quit,
    Invalid { command: String, message: String },
    Unknown { command: String, arg: String },
}

fn parse_args(arg: &str) -> Vec<String> {
    if arg.trim().is_empty() {
        return Vec::new();
    }
    match shell_words::split(arg) {
        Ok(parts) => parts
            .into_iter()
            .filter(|value| !value.is_empty())
            .collect(),
        Err(_) => arg
            .split_whitespace()
            .map(str::to_string)
            .filter(|value| !value.is_empty())
            .collect(),
    }
}

fn parse_single_arg(arg: &str) -> String {
    parse_args(arg).join(" ")
}

/// Turns the two-character escapes `\n` and `\\` into a newline and a backslash.
pub fn unescape_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

fn invalid(command: &str, message: impl Into<String>) -> StudioCommand {
    StudioCommand::Invalid {
        command: command.to_string(),
        message: message.into(),
    }
}

fn require_arg(command: &str, arg: &str) -> Result<String, StudioCommand> {
    let value = parse_single_arg(arg);
    if value.is_empty() {
        return Err(invalid(command, format!("/{command} needs an argument")));
    }
    Ok(value)
}

fn parse_slash_command(command: &str, arg: &str) -> StudioCommand {
    let parsed = match command {
        "text" => Ok(StudioCommand::SetText(unescape_text(arg))),
        "colors" => Ok(StudioCommand::SetColors(arg.to_string())),
        "count" => require_arg(command, arg).and_then(|value| {
            value
                .parse::<usize>()
                .map(StudioCommand::SetCount)
                .map_err(|_| invalid(command, format!("'{value}' is not a number")))
        }),
        "slot" => {
            // plain whitespace split: shell-words would read "#RRGGBB" as a comment
            let parts: Vec<&str> = arg.split_whitespace().collect();
            match parts.as_slice() {
                [index, color] => match index.parse::<usize>() {
                    Ok(index) if index >= 1 => Ok(StudioCommand::SetSlot {
                        index: index - 1,
                        color: color.to_string(),
                    }),
                    _ => Err(invalid(command, format!("'{index}' is not a slot number"))),
                },
                _ => Err(invalid(command, "usage: /slot <n> <color>")),
            }
        }
        "auto" => Ok(StudioCommand::AutoPalette),
        "style" => require_arg(command, arg).map(StudioCommand::SetStyle),
        "mode" => require_arg(command, arg).map(StudioCommand::SetMode),
        "ref" => require_arg(command, arg).map(|path| StudioCommand::SetReference(path.into())),
        "clear_ref" => Ok(StudioCommand::ClearReference),
        "generate" => Ok(StudioCommand::Generate),
        "randomize" => Ok(StudioCommand::Randomize),
        "history" => Ok(StudioCommand::History),
        "select" => require_arg(command, arg).map(StudioCommand::Select),
        "delete" => require_arg(command, arg).map(StudioCommand::Delete),
        "show" => Ok(StudioCommand::Show),
        "download" => {
            let dir = parse_single_arg(arg);
            Ok(StudioCommand::Download(if dir.is_empty() {
                None
            } else {
                Some(PathBuf::from(dir))
            }))
        }
        "copy" => Ok(StudioCommand::Copy),
        "diff" => match parse_args(arg).as_slice() {
            [from, to] => Ok(StudioCommand::Diff {
                from: from.clone(),
                to: to.clone(),
            }),
            _ => Err(invalid(command, "usage: /diff <id> <id>")),
        },
        "dismiss" => Ok(StudioCommand::Dismiss),
        "params" => Ok(StudioCommand::Params),
        "styles" => Ok(StudioCommand::Styles),
        "help" => Ok(StudioCommand::Help),
        "quit" | "exit" => Ok(StudioCommand::Quit),
        _ => Err(StudioCommand::Unknown {
            command: command.to_string(),
            arg: arg.to_string(),
        }),
    };
    parsed.unwrap_or_else(|err| err)
}

pub fn parse_command(text: &str) -> StudioCommand {
    let raw_trimmed = text.trim();
    if raw_trimmed.is_empty() {
        return StudioCommand::Noop;
    }

    if let Some(slash_tail) = raw_trimmed.strip_prefix('/') {
        let command_len = slash_tail
            .chars()
            .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
            .count();
        if command_len > 0 {
            let command = slash_tail[..command_len].to_ascii_lowercase();
            let arg = slash_tail[command_len..].trim();
            if !is_known(&command) {
                return StudioCommand::Unknown {
                    command,
                    arg: arg.to_string(),
                };
            }
            return parse_slash_command(&command, arg);
        }
    }

    StudioCommand::SetText(unescape_text(raw_trimmed))
}
