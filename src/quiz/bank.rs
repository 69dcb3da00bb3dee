use std::path::PathBuf;

use async_trait::async_trait;
use log::{debug, info, warn};
use rand::seq::SliceRandom;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::OnceCell;

use super::{Question, QuizError};

const ROWS_ENDPOINT: &str = "https://datasets-server.huggingface.co/rows";
const ROWS_PER_PAGE: usize = 100;
const NO_EXPLANATION: &str = "No explanation available";

/// Pool of quiz questions that can be sampled from.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    /// `amount` distinct questions in random order.
    async fn sample(&self, amount: usize) -> Result<Vec<Question>, QuizError>;
}

/// One row of the exam dataset. `answer` is the 1-based position of the
/// correct option, stored either as a number or as a numeric string.
#[derive(Debug, Clone, Deserialize)]
pub struct DatasetRow {
    pub question: String,
    pub options: Vec<String>,
    pub answer: Value,
    #[serde(default)]
    pub explanation: Option<String>,
}

impl DatasetRow {
    pub fn into_question(self) -> Option<Question> {
        let position = match &self.answer {
            Value::Number(number) => number.as_u64().and_then(|n| usize::try_from(n).ok()),
            Value::String(text) => text.trim().parse::<usize>().ok(),
            _ => None,
        }?;
        let correct_answer = self.options.get(position.checked_sub(1)?)?.clone();
        let explanation = self
            .explanation
            .filter(|explanation| !explanation.trim().is_empty())
            .unwrap_or_else(|| NO_EXPLANATION.to_string());

        Question::new(self.question, self.options, correct_answer, explanation)
    }
}

pub struct QuestionBank {
    questions: Vec<Question>,
}

impl QuestionBank {
    pub fn new(questions: Vec<Question>) -> Self {
        Self { questions }
    }

    /// Keeps the rows that make a valid question.
    pub fn from_rows(rows: impl IntoIterator<Item = DatasetRow>) -> Self {
        let mut skipped = 0;
        let questions = rows
            .into_iter()
            .filter_map(|row| {
                let question = row.into_question();
                if question.is_none() {
                    skipped += 1;
                }
                question
            })
            .collect();
        if skipped > 0 {
            warn!("Skipped {} dataset rows that do not form a valid question", skipped);
        }
        Self::new(questions)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Random draw without replacement.
    pub fn draw(&self, amount: usize) -> Result<Vec<Question>, QuizError> {
        if amount > self.questions.len() {
            return Err(QuizError::DataUnavailable(format!(
                "asked for {} questions, only {} available",
                amount,
                self.questions.len()
            )));
        }
        Ok(self
            .questions
            .choose_multiple(&mut rand::thread_rng(), amount)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl QuestionSource for QuestionBank {
    async fn sample(&self, amount: usize) -> Result<Vec<Question>, QuizError> {
        self.draw(amount)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetLocation {
    /// A JSON array of [`DatasetRow`]s on disk.
    File(PathBuf),
    /// A dataset repository served by the Hugging Face datasets server.
    Hub { repo: String },
}

#[derive(Deserialize)]
struct RowsPage {
    rows: Vec<RowEntry>,
    num_rows_total: usize,
}

#[derive(Deserialize)]
struct RowEntry {
    row: Value,
}

impl RowsPage {
    /// Appends the rows that deserialize, returns how many did not.
    fn read_into(self, rows: &mut Vec<DatasetRow>) -> usize {
        let mut unreadable = 0;
        for entry in self.rows {
            match serde_json::from_value::<DatasetRow>(entry.row) {
                Ok(row) => rows.push(row),
                Err(err) => {
                    debug!("Unreadable dataset row: {}", err);
                    unreadable += 1;
                }
            }
        }
        unreadable
    }
}

/// Loads the exam dataset on first use and keeps it for the lifetime of the
/// bot. A failed load is not remembered, the next request tries again.
pub struct DatasetSource {
    location: DatasetLocation,
    client: reqwest::Client,
    bank: OnceCell<QuestionBank>,
}

impl DatasetSource {
    pub fn new(location: DatasetLocation) -> Self {
        Self {
            location,
            client: reqwest::Client::new(),
            bank: OnceCell::new(),
        }
    }

    async fn bank(&self) -> Result<&QuestionBank, QuizError> {
        self.bank.get_or_try_init(|| self.load()).await
    }

    async fn load(&self) -> Result<QuestionBank, QuizError> {
        let rows = match &self.location {
            DatasetLocation::File(path) => {
                info!("Loading questions from {}", path.display());
                let content = tokio::fs::read_to_string(path)
                    .await
                    .map_err(|err| unavailable(path.display(), err))?;
                serde_json::from_str::<Vec<DatasetRow>>(&content)
                    .map_err(|err| unavailable(path.display(), err))?
            }
            DatasetLocation::Hub { repo } => {
                info!("Downloading questions from {}", repo);
                self.fetch_rows(repo)
                    .await
                    .map_err(|err| unavailable(repo, err))?
            }
        };

        let bank = QuestionBank::from_rows(rows);
        if bank.is_empty() {
            return Err(QuizError::DataUnavailable(
                "the dataset contains no usable questions".to_string(),
            ));
        }
        info!("Loaded {} questions", bank.len());
        Ok(bank)
    }

    async fn fetch_rows(&self, repo: &str) -> Result<Vec<DatasetRow>, reqwest::Error> {
        let mut rows = Vec::new();
        let mut offset = 0;
        let mut unreadable = 0usize;
        loop {
            let page: RowsPage = self
                .client
                .get(ROWS_ENDPOINT)
                .query(&[
                    ("dataset", repo),
                    ("config", "default"),
                    ("split", "train"),
                    ("offset", offset.to_string().as_str()),
                    ("length", ROWS_PER_PAGE.to_string().as_str()),
                ])
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;

            if page.rows.is_empty() {
                break;
            }
            offset += page.rows.len();
            let total = page.num_rows_total;
            unreadable += page.read_into(&mut rows);
            if offset >= total {
                break;
            }
        }
        if unreadable > 0 {
            warn!("Skipped {} dataset rows that could not be read", unreadable);
        }
        Ok(rows)
    }
}

fn unavailable(what: impl std::fmt::Display, err: impl std::fmt::Display) -> QuizError {
    QuizError::DataUnavailable(format!("{}: {}", what, err))
}

#[async_trait]
impl QuestionSource for DatasetSource {
    async fn sample(&self, amount: usize) -> Result<Vec<Question>, QuizError> {
        self.bank().await?.draw(amount)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use serde_json::json;

    use super::*;
    use crate::quiz::sample_question;

    fn row(answer: Value) -> DatasetRow {
        serde_json::from_value(json!({
            "question": "இந்தியாவின் தலைநகரம் எது?",
            "options": ["மும்பை", "புது தில்லி", "சென்னை", "கொல்கத்தா"],
            "answer": answer,
            "explanation": "புது தில்லி தலைநகரம்."
        }))
        .unwrap()
    }

    #[test]
    fn answer_is_a_one_based_position() {
        let question = row(json!(2)).into_question().unwrap();
        assert_eq!(question.correct_answer(), "புது தில்லி");
        assert_eq!(question.options().len(), 4);
    }

    #[test]
    fn numeric_string_answer_is_accepted() {
        let question = row(json!(" 4 ")).into_question().unwrap();
        assert_eq!(question.correct_answer(), "கொல்கத்தா");
    }

    #[test]
    fn out_of_range_answer_is_rejected() {
        assert!(row(json!(0)).into_question().is_none());
        assert!(row(json!(5)).into_question().is_none());
        assert!(row(json!("B")).into_question().is_none());
        assert!(row(json!(null)).into_question().is_none());
    }

    #[test]
    fn missing_explanation_gets_a_placeholder() {
        let row: DatasetRow = serde_json::from_value(json!({
            "question": "Q",
            "options": ["A", "B", "C", "D"],
            "answer": "1"
        }))
        .unwrap();
        assert_eq!(row.into_question().unwrap().explanation(), NO_EXPLANATION);
    }

    #[test]
    fn unreadable_hub_rows_are_counted() {
        let page: RowsPage = serde_json::from_value(json!({
            "rows": [
                {"row_idx": 0, "row": {"question": "Q1", "options": ["A", "B", "C", "D"], "answer": 1}},
                {"row_idx": 1, "row": {"question": "Q2", "answer": 2}},
                {"row_idx": 2, "row": "not a row"}
            ],
            "num_rows_total": 3
        }))
        .unwrap();
        let mut rows = Vec::new();
        assert_eq!(page.read_into(&mut rows), 2);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].question, "Q1");
    }

    #[test]
    fn bank_skips_invalid_rows() {
        let bank = QuestionBank::from_rows(vec![row(json!(1)), row(json!(9)), row(json!("3"))]);
        assert_eq!(bank.len(), 2);
    }

    #[tokio::test]
    async fn sample_draws_distinct_questions() {
        let bank = QuestionBank::new(
            (0..30)
                .map(|i| sample_question(&format!("Q{}", i), "A"))
                .collect(),
        );
        let drawn = bank.sample(10).await.unwrap();
        assert_eq!(drawn.len(), 10);
        let distinct: HashSet<&str> = drawn.iter().map(|q| q.text()).collect();
        assert_eq!(distinct.len(), 10);
    }

    #[tokio::test]
    async fn sample_larger_than_pool_is_unavailable() {
        let bank = QuestionBank::new(vec![sample_question("Q", "A")]);
        assert!(matches!(
            bank.sample(2).await,
            Err(QuizError::DataUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn missing_dataset_file_is_unavailable_and_retried() {
        let source = DatasetSource::new(DatasetLocation::File(PathBuf::from(
            "/nonexistent/tnpsc-questions.json",
        )));
        assert!(matches!(
            source.sample(1).await,
            Err(QuizError::DataUnavailable(_))
        ));
        assert!(source.bank.get().is_none());
    }

    #[tokio::test]
    async fn dataset_file_is_loaded_once() {
        let path = std::env::temp_dir().join(format!("tnpsc-bank-{}.json", std::process::id()));
        let rows = json!([
            {"question": "Q1", "options": ["A", "B", "C", "D"], "answer": 1},
            {"question": "Q2", "options": ["A", "B", "C", "D"], "answer": "2", "explanation": "B"},
            {"question": "Q3", "options": ["A", "B"], "answer": 1}
        ]);
        std::fs::write(&path, rows.to_string()).unwrap();

        let source = DatasetSource::new(DatasetLocation::File(path.clone()));
        let drawn = source.sample(2).await.unwrap();
        assert_eq!(drawn.len(), 2);

        std::fs::remove_file(&path).unwrap();
        // served from memory now
        assert_eq!(source.sample(1).await.unwrap().len(), 1);
        assert!(source.sample(3).await.is_err());
    }
}
