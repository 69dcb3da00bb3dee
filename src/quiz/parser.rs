use std::sync::LazyLock;

use log::debug;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

use super::{Question, QuizError, OPTIONS_PER_QUESTION};

static JSON_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```json(.*?)```").expect("valid regex"));
static ANY_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(.*?)```").expect("valid regex"));

#[derive(Debug, Error)]
enum StrategyError {
    #[error("no fenced block")]
    NoBlock,
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("payload is not a JSON array")]
    NotAnArray,
}

type Strategy = fn(&str) -> Result<Vec<Value>, StrategyError>;

/// Tried in order, the first one that yields a JSON array wins.
const STRATEGIES: [(&str, Strategy); 3] = [
    ("json fence", json_fence),
    ("any fence", any_fence),
    ("whole text", whole_text),
];

fn json_fence(raw: &str) -> Result<Vec<Value>, StrategyError> {
    fenced(&JSON_FENCE, raw)
}

fn any_fence(raw: &str) -> Result<Vec<Value>, StrategyError> {
    fenced(&ANY_FENCE, raw)
}

fn whole_text(raw: &str) -> Result<Vec<Value>, StrategyError> {
    json_array(raw)
}

fn fenced(fence: &Regex, raw: &str) -> Result<Vec<Value>, StrategyError> {
    let captures = fence.captures(raw).ok_or(StrategyError::NoBlock)?;
    json_array(&captures[1])
}

fn json_array(candidate: &str) -> Result<Vec<Value>, StrategyError> {
    match serde_json::from_str::<Value>(candidate.trim())? {
        Value::Array(entries) => Ok(entries),
        _ => Err(StrategyError::NotAnArray),
    }
}

/// Text form of a scalar JSON value, `None` for arrays and objects.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null => Some(String::new()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// Keeps an entry when it has all four keys, exactly four options and an
/// answer equal to one of them. Option and answer values are compared as
/// JSON, before being turned into text.
fn to_question(entry: Value) -> Option<Question> {
    let Value::Object(fields) = entry else {
        return None;
    };
    let question = fields.get("question")?;
    let Value::Array(options) = fields.get("options")? else {
        return None;
    };
    let answer = fields.get("answer")?;
    let explanation = fields.get("explanation")?;

    if options.len() != OPTIONS_PER_QUESTION || !options.contains(answer) {
        return None;
    }

    Question::new(
        scalar_text(question)?,
        options.iter().map(scalar_text).collect::<Option<Vec<_>>>()?,
        scalar_text(answer)?,
        scalar_text(explanation)?,
    )
}

/// Extracts quiz questions from a free-form model reply.
///
/// Entries that are not well-formed questions are dropped, so the result can
/// be shorter than what was asked for, or empty. `ParseFailure` means no
/// JSON array could be found at all.
pub fn parse_questions(raw: &str) -> Result<Vec<Question>, QuizError> {
    let entries = STRATEGIES
        .iter()
        .find_map(|(name, strategy)| match strategy(raw) {
            Ok(entries) => Some(entries),
            Err(err) => {
                debug!("{} strategy failed: {}", name, err);
                None
            }
        })
        .ok_or(QuizError::ParseFailure)?;

    let total = entries.len();
    let questions: Vec<Question> = entries.into_iter().filter_map(to_question).collect();
    if questions.len() < total {
        debug!("Dropped {} malformed questions", total - questions.len());
    }
    Ok(questions)
}
