use std::collections::BTreeMap;

use log::{debug, warn};

use super::ai_helper::TextGenerator;
use super::{detect_language, prompts, Language, Question, QuizError};

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AnswerRecord {
    pub question: String,
    pub user_answer: String,
    pub correct_answer: String,
    pub is_correct: bool,
    pub explanation: String,
    /// Filled in lazily when the user asks for it.
    pub ai_explanation: Option<String>,
    pub language: Language,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    InProgress(usize),
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Performance {
    Excellent,
    Good,
    KeepStudying,
}

/// Progress through one quiz: the questions, where the user is, and what
/// they answered so far.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct QuizSession {
    questions: Vec<Question>,
    current_index: usize,
    score: usize,
    answers: BTreeMap<usize, AnswerRecord>,
    completed: bool,
}

impl QuizSession {
    pub fn new(questions: Vec<Question>) -> Result<Self, QuizError> {
        if questions.is_empty() {
            return Err(QuizError::EmptyQuiz);
        }
        Ok(Self {
            questions,
            current_index: 0,
            score: 0,
            answers: BTreeMap::new(),
            completed: false,
        })
    }

    pub fn state(&self) -> SessionState {
        if self.completed {
            SessionState::Completed
        } else {
            SessionState::InProgress(self.current_index)
        }
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn score(&self) -> usize {
        self.score
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// The question waiting for an answer, `None` once completed.
    pub fn current_question(&self) -> Option<&Question> {
        if self.completed {
            return None;
        }
        self.questions.get(self.current_index)
    }

    pub fn answers(&self) -> impl Iterator<Item = (usize, &AnswerRecord)> {
        self.answers.iter().map(|(index, record)| (*index, record))
    }

    pub fn answer(&self, index: usize) -> Option<&AnswerRecord> {
        self.answers.get(&index)
    }

    /// Records the answer to the current question and moves on.
    ///
    /// `None` means nothing was selected: the session is left untouched and
    /// `InvalidSelection` is returned. The choice is compared to the correct
    /// answer with plain string equality.
    pub fn submit_answer(&mut self, choice: Option<&str>) -> Result<&AnswerRecord, QuizError> {
        if self.completed {
            return Err(QuizError::AlreadyCompleted);
        }
        let choice = choice.ok_or(QuizError::InvalidSelection)?;

        let index = self.current_index;
        let question = &self.questions[index];
        let is_correct = choice == question.correct_answer();
        let record = AnswerRecord {
            question: question.text().to_string(),
            user_answer: choice.to_string(),
            correct_answer: question.correct_answer().to_string(),
            is_correct,
            explanation: question.explanation().to_string(),
            ai_explanation: None,
            language: detect_language(question.text()),
        };
        debug!("Question {} answered, correct: {}", index + 1, is_correct);

        if is_correct {
            self.score += 1;
        }
        self.answers.insert(index, record);
        if index + 1 < self.questions.len() {
            self.current_index += 1;
        } else {
            self.completed = true;
        }
        Ok(&self.answers[&index])
    }

    /// Asks the generator for a detailed explanation of an answered question.
    ///
    /// A generator failure is not an error here: the localized failure text is
    /// returned in place of the explanation and nothing is stored, so the user
    /// can ask again.
    pub async fn request_explanation(
        &mut self,
        index: usize,
        generator: &dyn TextGenerator,
    ) -> Result<String, QuizError> {
        let record = self
            .answers
            .get_mut(&index)
            .ok_or(QuizError::UnknownQuestion(index))?;
        let prompt = prompts::explanation(&record.question, &record.correct_answer, record.language);

        match generator.generate(&prompt).await {
            Ok(text) => {
                record.ai_explanation = Some(text.clone());
                Ok(text)
            }
            Err(err) => {
                warn!("Explanation for question {} failed: {}", index + 1, err);
                Ok(format!("{} {}", record.language.strings().explanation_failed, err))
            }
        }
    }

    /// Discards a completed session and hands back its questions so the
    /// caller can build a fresh one. An unfinished session is returned as is.
    pub fn restart(self) -> Result<Vec<Question>, Self> {
        if !self.completed {
            return Err(self);
        }
        Ok(self.questions)
    }

    pub fn performance(&self) -> Performance {
        let ratio = self.score as f64 / self.questions.len() as f64;
        if ratio >= 0.8 {
            Performance::Excellent
        } else if ratio >= 0.6 {
            Performance::Good
        } else {
            Performance::KeepStudying
        }
    }
}
