use thiserror::Error;

/// Failure of the generative model call (network, quota, malformed request).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct GenerationError(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuizError {
    #[error("question dataset is unavailable: {0}")]
    DataUnavailable(String),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("the model reply contained no readable quiz data")]
    ParseFailure,

    #[error("no answer was selected")]
    InvalidSelection,

    #[error("a quiz needs at least one question")]
    EmptyQuiz,

    #[error("the quiz is already completed")]
    AlreadyCompleted,

    #[error("question {0} has not been answered")]
    UnknownQuestion(usize),
}
