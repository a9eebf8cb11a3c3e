//! Parsing of interactive command lines.

use thiserror::Error;

use crate::protocol::{
    CupColor, ParseVariantError, QuestionDefinition, QuestionId, QuestionModification,
};

pub const USAGE: &str = "\
Commands:
  cup <green|yellow|red>                         show a cup
  create <title> | <option> | <option>...        create a question
  publish <id> <secs>                            publish a question for <secs> seconds
  answer <id> <index>                            answer a published question
  delete <id>                                    delete a question
  modify <id> [title=<title>] [options=<a>|<b>]  change a question
  help                                           show this help
  quit                                           leave the room";

/// One parsed line of user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Cup(CupColor),
    Create(QuestionDefinition),
    Publish { id: QuestionId, secs: u64 },
    Answer { id: QuestionId, answer: usize },
    Delete(QuestionId),
    Modify(QuestionModification),
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("Empty input")]
    Empty,

    #[error("Unknown command '{0}'")]
    UnknownCommand(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("'{0}' is not a valid number")]
    InvalidNumber(String),

    #[error(transparent)]
    InvalidColor(#[from] ParseVariantError),
}

/// Parse one line typed at the prompt
pub fn parse(line: &str) -> Result<Input, InputError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(InputError::Empty);
    }

    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    match word.to_lowercase().as_str() {
        "cup" => parse_cup(rest),
        "create" => parse_create(rest),
        "publish" => {
            let (id, secs) = two_args(rest, "publish <id> <secs>")?;
            Ok(Input::Publish {
                id: parse_id(id)?,
                secs: parse_number(secs)?,
            })
        }
        "answer" => {
            let (id, answer) = two_args(rest, "answer <id> <index>")?;
            Ok(Input::Answer {
                id: parse_id(id)?,
                answer: parse_number(answer)?,
            })
        }
        "delete" => {
            if rest.is_empty() || rest.contains(char::is_whitespace) {
                return Err(InputError::Usage("delete <id>"));
            }
            Ok(Input::Delete(parse_id(rest)?))
        }
        "modify" => parse_modify(rest),
        "help" | "?" => Ok(Input::Help),
        "quit" | "exit" => Ok(Input::Quit),
        _ => Err(InputError::UnknownCommand(word.to_string())),
    }
}

fn parse_cup(rest: &str) -> Result<Input, InputError> {
    if rest.is_empty() || rest.contains(char::is_whitespace) {
        return Err(InputError::Usage("cup <green|yellow|red>"));
    }
    Ok(Input::Cup(rest.parse()?))
}

fn parse_create(rest: &str) -> Result<Input, InputError> {
    const USAGE: &str = "create <title> | <option> | <option>...";

    let mut parts = rest.split('|').map(str::trim);
    let title = parts.next().unwrap_or_default();
    let options: Vec<String> = parts
        .filter(|option| !option.is_empty())
        .map(str::to_string)
        .collect();

    if title.is_empty() || options.is_empty() {
        return Err(InputError::Usage(USAGE));
    }

    Ok(Input::Create(QuestionDefinition {
        title: title.to_string(),
        options,
    }))
}

fn parse_modify(rest: &str) -> Result<Input, InputError> {
    const USAGE: &str = "modify <id> [title=<title>] [options=<a>|<b>...]";
    const TITLE: &str = "title=";
    const OPTIONS: &str = "options=";

    let (id, fields) = match rest.split_once(char::is_whitespace) {
        Some((id, fields)) => (id, fields.trim()),
        None => (rest, ""),
    };
    if id.is_empty() {
        return Err(InputError::Usage(USAGE));
    }
    let id = parse_id(id)?;

    let title_at = fields.find(TITLE);
    let options_at = fields.find(OPTIONS);

    // Each value runs until the next key or the end of the line
    let value_at = |start: usize, key: &str| -> &str {
        let end = [title_at, options_at]
            .into_iter()
            .flatten()
            .filter(|&at| at > start)
            .min()
            .unwrap_or(fields.len());
        fields[start + key.len()..end].trim()
    };

    let first_key = [title_at, options_at].into_iter().flatten().min();
    if first_key.is_none_or(|at| !fields[..at].trim().is_empty()) {
        return Err(InputError::Usage(USAGE));
    }

    let title = title_at
        .map(|at| value_at(at, TITLE))
        .filter(|title| !title.is_empty())
        .map(str::to_string);
    let options = options_at
        .map(|at| {
            value_at(at, OPTIONS)
                .split('|')
                .map(str::trim)
                .filter(|option| !option.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .filter(|options| !options.is_empty());

    if title.is_none() && options.is_none() {
        return Err(InputError::Usage(USAGE));
    }

    Ok(Input::Modify(QuestionModification { id, title, options }))
}

fn two_args<'a>(rest: &'a str, usage: &'static str) -> Result<(&'a str, &'a str), InputError> {
    let mut args = rest.split_whitespace();
    match (args.next(), args.next(), args.next()) {
        (Some(first), Some(second), None) => Ok((first, second)),
        _ => Err(InputError::Usage(usage)),
    }
}

/// Accepts `3` as well as `#3`, the way ids are displayed
fn parse_id(raw: &str) -> Result<QuestionId, InputError> {
    let digits = raw.strip_prefix('#').unwrap_or(raw);
    parse_number(digits).map(QuestionId)
}

fn parse_number<T: std::str::FromStr>(raw: &str) -> Result<T, InputError> {
    raw.parse()
        .map_err(|_| InputError::InvalidNumber(raw.to_string()))
}
