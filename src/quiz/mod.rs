pub mod ai_helper;
pub mod bank;
pub mod error;
pub mod language;
pub mod parser;
pub mod prompts;
pub mod session;

pub use error::{GenerationError, QuizError};
pub use language::{detect_language, Language};
pub use session::{Performance, QuizSession, SessionState};

/// Every question is multiple choice with exactly this many options.
pub const OPTIONS_PER_QUESTION: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Question {
    text: String,
    options: Vec<String>,
    correct_answer: String,
    explanation: String,
}

impl Question {
    /// Returns `None` unless there are exactly four options and
    /// `correct_answer` is one of them.
    pub fn new(
        text: String,
        options: Vec<String>,
        correct_answer: String,
        explanation: String,
    ) -> Option<Self> {
        if options.len() != OPTIONS_PER_QUESTION || !options.contains(&correct_answer) {
            return None;
        }
        Some(Self {
            text,
            options,
            correct_answer,
            explanation,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn correct_answer(&self) -> &str {
        &self.correct_answer
    }

    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    /// The reply if it is exactly one of the options, `None` for anything
    /// else so that free text counts as no selection.
    pub fn selection<'a>(&self, reply: Option<&'a str>) -> Option<&'a str> {
        reply.filter(|reply| self.options.iter().any(|option| option == reply))
    }
}

#[cfg(test)]
pub(crate) fn sample_question(text: &str, correct: &str) -> Question {
    let options = ["A", "B", "C", "D"].map(String::from).to_vec();
    Question::new(
        text.to_string(),
        options,
        correct.to_string(),
        format!("{} is right", correct),
    )
    .expect("valid test question")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> Vec<String> {
        vec!["1".into(), "2".into(), "3".into(), "4".into()]
    }

    #[test]
    fn question_requires_answer_among_options() {
        assert!(Question::new("Q".into(), options(), "2".into(), "E".into()).is_some());
        assert!(Question::new("Q".into(), options(), "5".into(), "E".into()).is_none());
        // hard equality, no trimming
        assert!(Question::new("Q".into(), options(), " 2".into(), "E".into()).is_none());
    }

    #[test]
    fn only_an_offered_option_is_a_selection() {
        let question = Question::new("Q".into(), options(), "2".into(), "E".into()).unwrap();
        assert_eq!(question.selection(Some("3")), Some("3"));
        assert_eq!(question.selection(Some("3 ")), None);
        assert_eq!(question.selection(Some("What is the answer?")), None);
        assert_eq!(question.selection(Some("")), None);
        assert_eq!(question.selection(None), None);
    }

    #[test]
    fn question_requires_four_options() {
        let three = vec!["1".into(), "2".into(), "3".into()];
        assert!(Question::new("Q".into(), three, "1".into(), "E".into()).is_none());
    }
}
