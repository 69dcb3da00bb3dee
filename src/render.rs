//! Message texts and keyboards sent to the chat.

use teloxide::types::{KeyboardButton, KeyboardMarkup};
use teloxide::utils::html::escape;

use crate::quiz::{
    language::UiStrings, session::AnswerRecord, Language, Performance, Question, QuizSession,
};

/// Telegram rejects messages longer than 4096 characters.
pub const MESSAGE_LIMIT: usize = 4000;

pub const MAIN_MENU: &str = "🏠 Home / முகப்பு";
pub const PRACTICE_QUIZ: &str = "📝 Practice Quiz / பயிற்சி வினாடி வினா";
pub const PERSONALIZED_STUDY: &str = "🎯 Personalized Study / தனிப்பயன் படிப்பு";
pub const TUTOR_CHAT: &str = "💬 AI Tutor Chat / AI ஆசிரியர் அரட்டை";
pub const START_QUIZ: &str = "Start Quiz";
pub const CHAT_HISTORY: &str = "📜 History";
/// Prefix of the per-question "explain" buttons on the results screen.
pub const EXPLAIN_PREFIX: &str = "💡 ";

const EXPLAIN_BUTTONS_PER_ROW: usize = 5;

pub fn main_menu_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![
        vec![KeyboardButton::new(PRACTICE_QUIZ)],
        vec![KeyboardButton::new(PERSONALIZED_STUDY)],
        vec![KeyboardButton::new(TUTOR_CHAT)],
    ])
}

/// A single row of buttons followed by the way back home.
pub fn keyboard_with_home(buttons: &[&str]) -> KeyboardMarkup {
    let mut rows = Vec::new();
    if !buttons.is_empty() {
        rows.push(buttons.iter().map(|b| KeyboardButton::new(*b)).collect());
    }
    rows.push(vec![KeyboardButton::new(MAIN_MENU)]);
    KeyboardMarkup::new(rows)
}

/// One option per row so long answers stay readable.
pub fn answer_keyboard(question: &Question) -> KeyboardMarkup {
    let mut rows: Vec<Vec<KeyboardButton>> = question
        .options()
        .iter()
        .map(|option| vec![KeyboardButton::new(option.clone())])
        .collect();
    rows.push(vec![KeyboardButton::new(MAIN_MENU)]);
    KeyboardMarkup::new(rows)
}

pub fn results_keyboard(session: &QuizSession, language: Language) -> KeyboardMarkup {
    let explain: Vec<KeyboardButton> = session
        .answers()
        .map(|(index, _)| KeyboardButton::new(format!("{}{}", EXPLAIN_PREFIX, index + 1)))
        .collect();
    let mut rows: Vec<Vec<KeyboardButton>> = explain
        .chunks(EXPLAIN_BUTTONS_PER_ROW)
        .map(|row| row.to_vec())
        .collect();
    rows.push(vec![KeyboardButton::new(language.strings().take_again)]);
    rows.push(vec![KeyboardButton::new(MAIN_MENU)]);
    KeyboardMarkup::new(rows)
}

/// Reads the question number off an explain button, 0-based.
pub fn parse_explain_request(text: &str) -> Option<usize> {
    let number: usize = text.strip_prefix(EXPLAIN_PREFIX)?.trim().parse().ok()?;
    number.checked_sub(1)
}

pub fn question_message(index: usize, question: &Question, language: Language) -> String {
    let strings = language.strings();
    format!(
        "<b>{} {}</b>\n\n<b>{}</b>\n\n{}",
        strings.question,
        index + 1,
        escape(question.text()),
        strings.select
    )
}

pub fn results_message(session: &QuizSession, language: Language) -> String {
    let strings = language.strings();
    let percent = session.score() * 100 / session.len();
    let verdict = match session.performance() {
        Performance::Excellent => strings.excellent,
        Performance::Good => strings.good,
        Performance::KeepStudying => strings.keep_studying,
    };
    format!(
        "🎉 {} {} {}/{} ({}%)\n{}",
        strings.quiz_completed,
        strings.your_score,
        session.score(),
        session.len(),
        percent,
        verdict
    )
}

/// One outgoing message of a reply that may span several.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    pub html: bool,
}

impl Chunk {
    pub fn plain(text: String) -> Self {
        Self { text, html: false }
    }

    fn html(text: String) -> Self {
        Self { text, html: true }
    }
}

/// Per-question breakdown shown after the results, as HTML messages of at
/// most `limit` characters.
///
/// Messages are only cut between entries so that no tag or entity is split.
/// An entry that alone exceeds the limit is sent as plain text instead.
pub fn review_chunks(session: &QuizSession, language: Language, limit: usize) -> Vec<Chunk> {
    let strings = language.strings();
    let mut chunks = Vec::new();
    let mut current = format!("<b>{}</b>", strings.explanations);

    for (index, answer) in session.answers() {
        let entry = review_entry(index, answer, strings, true);
        let entry_len = entry.chars().count();

        if entry_len > limit {
            if !current.is_empty() {
                chunks.push(Chunk::html(std::mem::take(&mut current)));
            }
            let plain = review_entry(index, answer, strings, false);
            chunks.extend(split_message(&plain, limit).into_iter().map(Chunk::plain));
            continue;
        }

        if !current.is_empty() && current.chars().count() + 2 + entry_len > limit {
            chunks.push(Chunk::html(std::mem::take(&mut current)));
        }
        if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(&entry);
    }
    if !current.is_empty() {
        chunks.push(Chunk::html(current));
    }
    chunks
}

fn review_entry(index: usize, answer: &AnswerRecord, strings: &UiStrings, html: bool) -> String {
    let text = |value: &str| if html { escape(value) } else { value.to_string() };
    let (bold, end_bold, italic, end_italic) = if html {
        ("<b>", "</b>", "<i>", "</i>")
    } else {
        ("", "", "", "")
    };

    let mark = if answer.is_correct { "✅" } else { "❌" };
    let mut entry = format!(
        "{}{} {}{}: {}\n{} {} {}",
        bold,
        strings.question,
        index + 1,
        end_bold,
        text(&answer.question),
        strings.your_answer,
        mark,
        text(&answer.user_answer),
    );
    if !answer.is_correct {
        entry.push_str(&format!(
            "\n{} {}",
            strings.correct_answer,
            text(&answer.correct_answer)
        ));
    }
    entry.push_str(&format!(
        "\n{}{}{} {}",
        italic,
        strings.explanation,
        end_italic,
        text(&answer.explanation)
    ));
    entry
}

pub fn chat_history_message(history: &[(String, String)]) -> String {
    history
        .iter()
        .map(|(question, answer)| format!("🙋 {}\n\n🤖 {}", question, answer))
        .collect::<Vec<_>>()
        .join("\n\n———\n\n")
}

/// Splits `text` into pieces of at most `limit` characters, preferring line
/// breaks. A line longer than the limit is cut on character boundaries.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split('\n') {
        let line_len = line.chars().count();
        let separator = usize::from(!current.is_empty());
        if current_len + separator + line_len <= limit {
            if separator == 1 {
                current.push('\n');
            }
            current.push_str(line);
            current_len += separator + line_len;
            continue;
        }

        if !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        let chars: Vec<char> = line.chars().collect();
        let mut pieces = chars.chunks(limit.max(1)).peekable();
        while let Some(piece) = pieces.next() {
            let piece: String = piece.iter().collect();
            if pieces.peek().is_some() {
                chunks.push(piece);
            } else {
                current_len = piece.chars().count();
                current = piece;
            }
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
