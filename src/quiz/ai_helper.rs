use async_trait::async_trait;
use chatgpt::client::ChatGPT;
use chatgpt::types::CompletionResponse;
use log::{debug, warn};

use super::{detect_language, parser, prompts, GenerationError, Language, Question, QuizError};

/// Anything that turns a prompt into free-form text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

#[async_trait]
impl TextGenerator for ChatGPT {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        debug!("Sending prompt of {} chars", prompt.len());
        let response: CompletionResponse = self
            .send_message(prompt)
            .await
            .map_err(|err| GenerationError(err.to_string()))?;
        let content = response.message().clone().content;

        debug!("Completion: {:?}", content);

        Ok(content)
    }
}

pub const BLANK_CHAT_REPLY: &str = "Please ask a question about TNPSC exam preparation.";
const CHAT_HISTORY_LIMIT: usize = 10;

/// The latest tutor exchanges of one chat, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ChatHistory {
    exchanges: Vec<(String, String)>,
}

impl ChatHistory {
    /// Appends an exchange, forgetting the oldest ones past the limit.
    pub fn push(&mut self, question: String, answer: String) {
        self.exchanges.push((question, answer));
        if self.exchanges.len() > CHAT_HISTORY_LIMIT {
            let excess = self.exchanges.len() - CHAT_HISTORY_LIMIT;
            self.exchanges.drain(..excess);
        }
    }

    pub fn exchanges(&self) -> &[(String, String)] {
        &self.exchanges
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }
}

/// Study material, generated quizzes and tutor answers, each in the language
/// the user wrote in.
pub struct StudyHelper {
    generator: Box<dyn TextGenerator>,
}

impl StudyHelper {
    pub fn new(generator: Box<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    pub fn generator(&self) -> &dyn TextGenerator {
        self.generator.as_ref()
    }

    /// Returns the material and the language it was requested in. A failed
    /// generation yields the localized error text instead of the material.
    pub async fn study_material(&self, topics: &str) -> (String, Language) {
        let language = detect_language(topics);
        debug!("Generating study material in {} for: {:?}", language.name(), topics);

        let prompt = prompts::study_material(topics, language);
        let material = match self.generator.generate(&prompt).await {
            Ok(material) => material,
            Err(err) => {
                warn!("Study material generation failed: {}", err);
                format!("{} {}", language.strings().study_material_failed, err)
            }
        };
        (material, language)
    }

    /// Asks for `count` questions on `topics`. The list may come back shorter
    /// than `count`, or empty, when the model produces malformed entries.
    pub async fn generate_quiz(
        &self,
        topics: &str,
        count: usize,
    ) -> Result<Vec<Question>, QuizError> {
        let language = detect_language(topics);
        debug!("Generating {} questions in {} for: {:?}", count, language.name(), topics);

        let prompt = prompts::quiz_generation(topics, count, language);
        let reply = self.generator.generate(&prompt).await?;
        let questions = parser::parse_questions(&reply).map_err(|err| {
            let preview: String = reply.chars().take(200).collect();
            warn!("Failed to extract valid JSON: {}...", preview);
            err
        })?;

        debug!("Generated {} of {} questions", questions.len(), count);
        Ok(questions)
    }

    /// Answers a free-form tutor question. Never fails: a blank query gets a
    /// nudge and a failed generation gets an apology with the cause.
    pub async fn chat(&self, query: &str) -> String {
        if query.trim().is_empty() {
            return BLANK_CHAT_REPLY.to_string();
        }

        let language = detect_language(query);
        let prompt = prompts::chat(query, language);
        match self.generator.generate(&prompt).await {
            Ok(reply) => reply,
            Err(err) => {
                warn!("Chat reply failed: {}", err);
                format!("{} {}", language.strings().chat_failed, err)
            }
        }
    }
}
