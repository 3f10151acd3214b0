//! Console front end: turns typed lines into dashboard actions.

pub mod console;

pub use console::{run_console, Console, TextSurface};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Prompt(String),
    File(Option<String>),
    Files,
    Column(String),
    Date(String),
    Formula(String),
    Suggest(usize),
    Submit,
    Layout,
    Width(u32),
    Health,
    Help,
    Quit,
}

pub const HELP: &str = "\
Type a question to generate a dashboard, or:
  /file [NAME]      switch dataset file (no name: backend default)
  /files            list files of the report
  /col NAME         insert a column into the formula (date columns pair up)
  /date NAME        pick a date column for date_diff
  /formula TEXT     replace the formula draft
  /suggest N        use formula suggestion N
  /submit           create the column from the draft
  /layout           show chart placement
  /width PX         resize the viewport
  /health           check the analysis backend
  /quit";

fn required(arg: &str, usage: &str) -> Result<String, String> {
    if arg.is_empty() {
        Err(format!("Usage: {}", usage))
    } else {
        Ok(arg.to_string())
    }
}

pub fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Command::Prompt(line.to_string()));
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    match name {
        "file" => Ok(Command::File((!arg.is_empty()).then(|| arg.to_string()))),
        "files" => Ok(Command::Files),
        "col" => required(arg, "/col NAME").map(Command::Column),
        "date" => required(arg, "/date NAME").map(Command::Date),
        // An empty formula is a valid edit: it clears the draft.
        "formula" => Ok(Command::Formula(arg.to_string())),
        "suggest" => arg
            .parse::<usize>()
            .ok()
            .filter(|n| *n >= 1)
            .map(Command::Suggest)
            .ok_or_else(|| "Usage: /suggest N (N starts at 1)".to_string()),
        "submit" => Ok(Command::Submit),
        "layout" => Ok(Command::Layout),
        "width" => arg
            .parse::<u32>()
            .map(Command::Width)
            .map_err(|_| "Usage: /width PX".to_string()),
        "health" => Ok(Command::Health),
        "help" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(format!("Unknown command: /{}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_prompt() {
        assert_eq!(
            parse_command("  show cost by region "),
            Ok(Command::Prompt("show cost by region".into()))
        );
        assert_eq!(parse_command(""), Ok(Command::Prompt(String::new())));
    }

    #[test]
    fn test_commands_with_arguments() {
        assert_eq!(parse_command("/col Unit Price"), Ok(Command::Column("Unit Price".into())));
        assert_eq!(parse_command("/date Start"), Ok(Command::Date("Start".into())));
        assert_eq!(parse_command("/formula x = y*2"), Ok(Command::Formula("x = y*2".into())));
        assert_eq!(parse_command("/suggest 2"), Ok(Command::Suggest(2)));
        assert_eq!(parse_command("/width 900"), Ok(Command::Width(900)));
        assert_eq!(parse_command("/file"), Ok(Command::File(None)));
        assert_eq!(parse_command("/files"), Ok(Command::Files));
        assert_eq!(parse_command("/file q3.xlsx"), Ok(Command::File(Some("q3.xlsx".into()))));
    }

    #[test]
    fn test_bad_usage() {
        assert!(parse_command("/col").is_err());
        assert!(parse_command("/suggest 0").is_err());
        assert!(parse_command("/width wide").is_err());
        assert_eq!(parse_command("/dance"), Err("Unknown command: /dance".into()));
    }
}
