use crate::models::session_types::UserIntent;
use std::path::PathBuf;

pub const HELP: &str = "\
Commands:
  file <path> [path...]   pick image file(s); the first one is used, none clears the image
  url <text>              type an image URL (or data: URL, or local path); empty clears
  identify                classify the current image
  history <n>             re-select history entry n (0 is the most recent)
  reload                  retry loading the model
  status                  print the current view as JSON
  help                    show this text
  quit                    leave";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Intent(UserIntent),
    Status,
    Help,
}

/// Parses one line typed at the prompt.
pub fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim_end_matches(['\r', '\n']);
    let trimmed = line.trim_start();
    let (word, rest) = match trimmed.split_once(' ') {
        Some((word, rest)) => (word, rest),
        None => (trimmed, ""),
    };

    let command = match word {
        "file" => Command::Intent(UserIntent::FileSelected(
            rest.split_whitespace().map(PathBuf::from).collect(),
        )),
        // Everything after the separator is the text field content, untouched.
        "url" => Command::Intent(UserIntent::TextChanged(rest.to_string())),
        "identify" => Command::Intent(UserIntent::IdentifyClicked),
        "history" => {
            let index = rest
                .trim()
                .parse::<usize>()
                .map_err(|_| format!("history expects an entry number, got {:?}", rest.trim()))?;
            Command::Intent(UserIntent::HistoryItemClicked(index))
        }
        "reload" => Command::Intent(UserIntent::ReloadModel),
        "quit" | "exit" => Command::Intent(UserIntent::Shutdown),
        "status" => Command::Status,
        "help" | "" => Command::Help,
        other => return Err(format!("unknown command {:?}, try `help`", other)),
    };
    Ok(command)
}
