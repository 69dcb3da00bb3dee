mod config;
mod quiz;
mod render;

use std::sync::Arc;

use chatgpt::client::ChatGPT;
use dotenv::dotenv;
use log::{error, info, warn};
use quiz::{
    ai_helper::{ChatHistory, StudyHelper, BLANK_CHAT_REPLY},
    bank::{DatasetSource, QuestionSource},
    detect_language, Language, QuizError, QuizSession, SessionState,
};
use render::{
    Chunk, CHAT_HISTORY, MAIN_MENU, MESSAGE_LIMIT, PERSONALIZED_STUDY, PRACTICE_QUIZ,
    START_QUIZ, TUTOR_CHAT,
};
use teloxide::{
    dispatching::dialogue::{serializer::Json, ErasedStorage, InMemStorage, SqliteStorage, Storage},
    prelude::*,
    types::{ChatAction, KeyboardMarkup, ParseMode},
};

use crate::config::Config;

type QuizDialogue = Dialogue<State, ErasedStorage<State>>;
type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;
type DialogueStorage = Arc<ErasedStorage<State>>;

/// The two quizzes a chat can take. Both run on the same [`QuizSession`].
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub enum QuizFlow {
    /// Questions sampled from the exam dataset.
    Practice,
    /// Questions generated for the user's own topics.
    Personalized { topics: String, language: Language },
}

impl QuizFlow {
    fn question_language(&self, question_text: &str) -> Language {
        match self {
            QuizFlow::Practice => detect_language(question_text),
            QuizFlow::Personalized { language, .. } => *language,
        }
    }

    fn results_language(&self) -> Language {
        match self {
            QuizFlow::Practice => Language::English,
            QuizFlow::Personalized { language, .. } => *language,
        }
    }
}

#[derive(Clone, Default, serde::Serialize, serde::Deserialize)]
pub enum State {
    #[default]
    Start,
    Home {
        history: ChatHistory,
    },
    PracticeLobby,
    Quiz {
        flow: QuizFlow,
        session: QuizSession,
    },
    StudyTopics,
    StudyMaterial {
        topics: String,
        language: Language,
    },
    TutorChat {
        history: ChatHistory,
    },
}

impl State {
    /// Tutor exchanges survive trips through the home menu.
    fn into_chat_history(self) -> ChatHistory {
        match self {
            State::Home { history } | State::TutorChat { history } => history,
            _ => ChatHistory::default(),
        }
    }
}

/// Shared by every chat.
pub struct Services {
    questions: Box<dyn QuestionSource>,
    helper: StudyHelper,
    practice_quiz_size: usize,
    generated_quiz_size: usize,
}

#[tokio::main]
async fn main() {
    dotenv().ok();

    pretty_env_logger::init();
    info!("Starting TNPSC tutor bot...");

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!("Invalid configuration: {}", err);
            std::process::exit(1);
        }
    };

    let bot = Bot::from_env();

    let storage: DialogueStorage = match &config.dialogue_db {
        Some(path) => {
            info!("Opening dialogue storage at {}", path);
            match SqliteStorage::open(path, Json).await {
                Ok(storage) => storage.erase(),
                Err(err) => {
                    error!("Failed to open dialogue storage: {}", err);
                    std::process::exit(1);
                }
            }
        }
        None => InMemStorage::<State>::new().erase(),
    };

    let gpt = match ChatGPT::new(&config.chatgpt_api_key) {
        Ok(mut gpt) => {
            gpt.config.engine = config.chatgpt_engine;
            gpt.config.timeout = config.chatgpt_timeout;
            gpt
        }
        Err(err) => {
            error!("Unable to set up ChatGPT: {}", err);
            std::process::exit(1);
        }
    };

    let services = Arc::new(Services {
        questions: Box::new(DatasetSource::new(config.dataset.clone())),
        helper: StudyHelper::new(Box::new(gpt)),
        practice_quiz_size: config.practice_quiz_size,
        generated_quiz_size: config.generated_quiz_size,
    });

    let handler = Update::filter_message()
        .enter_dialogue::<Message, ErasedStorage<State>, State>()
        .branch(dptree::filter(|msg: Message| msg.text() == Some("/start")).endpoint(start))
        .branch(dptree::filter(|msg: Message| msg.text() == Some(MAIN_MENU)).endpoint(go_home))
        .branch(dptree::case![State::Start].endpoint(start))
        .branch(dptree::case![State::Home { history }].endpoint(receive_section_choice))
        .branch(dptree::case![State::PracticeLobby].endpoint(practice_lobby))
        .branch(dptree::case![State::Quiz { flow, session }].endpoint(quiz_turn))
        .branch(dptree::case![State::StudyTopics].endpoint(receive_topics))
        .branch(dptree::case![State::StudyMaterial { topics, language }].endpoint(study_material_menu))
        .branch(dptree::case![State::TutorChat { history }].endpoint(tutor_chat));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![storage, services])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

const GREETING_TEXT: &str = "🏛️ TNPSC Quiz & Study Platform
தமிழ்நாடு பொதுப் பணியாளர் தேர்வாணையம்

Features / அம்சங்கள்:
- Practice with real TNPSC questions
- AI-generated personalized quizzes
- Study materials in Tamil & English
- Interactive AI tutor
- Detailed explanations";
const CHOOSE_SECTION: &str = "Choose Section / பிரிவைத் தேர்ந்தெடுக்கவும்:";
const CHOOSE_OPTION: &str = "Please choose one of the options / தயவு செய்து ஒரு விருப்பத்தைத் தேர்ந்தெடுக்கவும்";
const PRACTICE_INTRO: &str =
    "This quiz will test your knowledge of Tamil Nadu Public Service Commission exam topics.";
const TOPICS_PROMPT: &str = "Topics You Want to Study / நீங்கள் படிக்க விரும்பும் தலைப்புகள்

Enter topics in English or Tamil (e.g., Indian History, Tamil Culture, இந்திய வரலாறு, தமிழ் கலாச்சாரம்)";
const TOPICS_MISSING: &str = "Please enter at least one topic to study / தயவு செய்து குறைந்தது ஒரு தலைப்பையும் உள்ளிடவும்";
const GENERATING_MATERIAL: &str =
    "Generating study material... / படிப்பு பொருள் உருவாக்கப்படுகிறது...";
const GENERATING_QUIZ: &str =
    "Generating quiz questions... / வினாடி வினா கேள்விகள் உருவாக்கப்படுகின்றன...";
const TUTOR_INTRO: &str = "AI TNPSC Tutor / AI TNPSC ஆசிரியர்

Ask me anything about TNPSC exam preparation! / TNPSC தேர்வு தயாரிப்பு பற்றி எதையும் கேளுங்கள்!";
const NO_CHAT_HISTORY: &str = "No questions yet. / இதுவரை கேள்விகள் இல்லை.";

async fn start(bot: Bot, dialogue: QuizDialogue, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, GREETING_TEXT).await?;
    show_home(&bot, &dialogue, msg.chat.id, ChatHistory::default()).await
}

async fn go_home(bot: Bot, dialogue: QuizDialogue, state: State, msg: Message) -> HandlerResult {
    show_home(&bot, &dialogue, msg.chat.id, state.into_chat_history()).await
}

async fn show_home(
    bot: &Bot,
    dialogue: &QuizDialogue,
    chat_id: ChatId,
    history: ChatHistory,
) -> HandlerResult {
    bot.send_message(chat_id, CHOOSE_SECTION)
        .reply_markup(render::main_menu_keyboard())
        .await?;
    dialogue.update(State::Home { history }).await?;
    Ok(())
}

async fn receive_section_choice(
    bot: Bot,
    dialogue: QuizDialogue,
    history: ChatHistory,
    msg: Message,
) -> HandlerResult {
    match msg.text() {
        Some(PRACTICE_QUIZ) => {
            bot.send_message(msg.chat.id, PRACTICE_INTRO)
                .reply_markup(render::keyboard_with_home(&[START_QUIZ]))
                .await?;
            dialogue.update(State::PracticeLobby).await?;
        }
        Some(PERSONALIZED_STUDY) => {
            bot.send_message(msg.chat.id, TOPICS_PROMPT)
                .reply_markup(render::keyboard_with_home(&[]))
                .await?;
            dialogue.update(State::StudyTopics).await?;
        }
        Some(TUTOR_CHAT) => {
            bot.send_message(msg.chat.id, TUTOR_INTRO)
                .reply_markup(render::keyboard_with_home(&[CHAT_HISTORY]))
                .await?;
            dialogue.update(State::TutorChat { history }).await?;
        }
        _ => {
            bot.send_message(msg.chat.id, CHOOSE_OPTION)
                .reply_markup(render::main_menu_keyboard())
                .await?;
        }
    }
    Ok(())
}

async fn practice_lobby(
    bot: Bot,
    dialogue: QuizDialogue,
    services: Arc<Services>,
    msg: Message,
) -> HandlerResult {
    if msg.text() != Some(START_QUIZ) {
        bot.send_message(msg.chat.id, CHOOSE_OPTION)
            .reply_markup(render::keyboard_with_home(&[START_QUIZ]))
            .await?;
        return Ok(());
    }

    // Only a nicety, the quiz works without it
    let _ = bot.send_chat_action(msg.chat.id, ChatAction::Typing).await;

    let session = services
        .questions
        .sample(services.practice_quiz_size)
        .await
        .and_then(QuizSession::new);
    match session {
        Ok(session) => {
            let flow = QuizFlow::Practice;
            send_question(&bot, msg.chat.id, &flow, &session).await?;
            dialogue.update(State::Quiz { flow, session }).await?;
        }
        Err(err) => {
            error!("Failed to start practice quiz: {}", err);
            bot.send_message(msg.chat.id, format!("Error loading dataset: {}", err))
                .reply_markup(render::keyboard_with_home(&[START_QUIZ]))
                .await?;
        }
    }
    Ok(())
}

async fn quiz_turn(
    bot: Bot,
    dialogue: QuizDialogue,
    services: Arc<Services>,
    (flow, mut session): (QuizFlow, QuizSession),
    msg: Message,
) -> HandlerResult {
    if session.state() == SessionState::Completed {
        return results_turn(bot, dialogue, services, flow, session, msg).await;
    }

    let Some(question) = session.current_question() else {
        return Ok(());
    };
    let language = flow.question_language(question.text());
    let choice = question.selection(msg.text());

    match session.submit_answer(choice).map(|_| ()) {
        Ok(_) => {}
        Err(QuizError::InvalidSelection) => {
            if let Some(question) = session.current_question() {
                bot.send_message(msg.chat.id, language.strings().warning)
                    .reply_markup(render::answer_keyboard(question))
                    .await?;
            }
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    }

    if session.is_completed() {
        send_results(&bot, msg.chat.id, &flow, &session).await?;
    } else {
        send_question(&bot, msg.chat.id, &flow, &session).await?;
    }
    dialogue.update(State::Quiz { flow, session }).await?;
    Ok(())
}

async fn results_turn(
    bot: Bot,
    dialogue: QuizDialogue,
    services: Arc<Services>,
    flow: QuizFlow,
    mut session: QuizSession,
    msg: Message,
) -> HandlerResult {
    let language = flow.results_language();
    let text = msg.text().unwrap_or_default();

    if let Some(index) = render::parse_explain_request(text) {
        let _ = bot.send_chat_action(msg.chat.id, ChatAction::Typing).await;
        match session
            .request_explanation(index, services.helper.generator())
            .await
        {
            Ok(explanation) => {
                let strings = session
                    .answer(index)
                    .map(|answer| answer.language.strings())
                    .unwrap_or(language.strings());
                let reply = format!("{}\n\n{}", strings.ai_explanation, explanation);
                send_long(
                    &bot,
                    msg.chat.id,
                    &reply,
                    render::results_keyboard(&session, language),
                )
                .await?;
                dialogue.update(State::Quiz { flow, session }).await?;
            }
            Err(err) => {
                warn!("Explanation request rejected: {}", err);
                bot.send_message(msg.chat.id, CHOOSE_OPTION)
                    .reply_markup(render::results_keyboard(&session, language))
                    .await?;
            }
        }
        return Ok(());
    }

    if text == language.strings().take_again {
        let keyboard = render::results_keyboard(&session, language);
        let Ok(questions) = session.restart() else {
            return Ok(());
        };
        match flow {
            QuizFlow::Practice => {
                bot.send_message(msg.chat.id, PRACTICE_INTRO)
                    .reply_markup(render::keyboard_with_home(&[START_QUIZ]))
                    .await?;
                dialogue.update(State::PracticeLobby).await?;
            }
            QuizFlow::Personalized { .. } => match QuizSession::new(questions) {
                Ok(session) => {
                    send_question(&bot, msg.chat.id, &flow, &session).await?;
                    dialogue.update(State::Quiz { flow, session }).await?;
                }
                Err(err) => {
                    warn!("Could not restart personalized quiz: {}", err);
                    bot.send_message(msg.chat.id, language.strings().quiz_generation_failed)
                        .reply_markup(keyboard)
                        .await?;
                }
            },
        }
        return Ok(());
    }

    bot.send_message(msg.chat.id, CHOOSE_OPTION)
        .reply_markup(render::results_keyboard(&session, language))
        .await?;
    Ok(())
}

async fn receive_topics(
    bot: Bot,
    dialogue: QuizDialogue,
    services: Arc<Services>,
    msg: Message,
) -> HandlerResult {
    match msg.text().map(str::trim).filter(|topics| !topics.is_empty()) {
        Some(topics) => send_study_material(&bot, &dialogue, &services, msg.chat.id, topics).await,
        None => {
            bot.send_message(msg.chat.id, TOPICS_MISSING).await?;
            Ok(())
        }
    }
}

async fn study_material_menu(
    bot: Bot,
    dialogue: QuizDialogue,
    services: Arc<Services>,
    (topics, language): (String, Language),
    msg: Message,
) -> HandlerResult {
    let strings = language.strings();
    let text = msg.text().map(str::trim).unwrap_or_default();

    if text.is_empty() {
        bot.send_message(msg.chat.id, TOPICS_MISSING).await?;
        return Ok(());
    }
    if text != strings.generate_quiz {
        // Anything else is a new set of topics
        return send_study_material(&bot, &dialogue, &services, msg.chat.id, text).await;
    }

    bot.send_message(msg.chat.id, GENERATING_QUIZ).await?;
    let _ = bot.send_chat_action(msg.chat.id, ChatAction::Typing).await;

    let session = services
        .helper
        .generate_quiz(&topics, services.generated_quiz_size)
        .await
        .and_then(QuizSession::new);
    match session {
        Ok(session) => {
            bot.send_message(
                msg.chat.id,
                format!("{}\n\n{}", strings.quiz_generated, strings.interactive_quiz),
            )
            .await?;
            let flow = QuizFlow::Personalized { topics, language };
            send_question(&bot, msg.chat.id, &flow, &session).await?;
            dialogue.update(State::Quiz { flow, session }).await?;
        }
        Err(err) => {
            warn!("Quiz generation failed: {}", err);
            bot.send_message(msg.chat.id, strings.quiz_generation_failed)
                .reply_markup(render::keyboard_with_home(&[strings.generate_quiz]))
                .await?;
        }
    }
    Ok(())
}

async fn tutor_chat(
    bot: Bot,
    dialogue: QuizDialogue,
    services: Arc<Services>,
    mut history: ChatHistory,
    msg: Message,
) -> HandlerResult {
    let keyboard = render::keyboard_with_home(&[CHAT_HISTORY]);
    let query = msg.text().unwrap_or_default();

    if query == CHAT_HISTORY {
        let replay = if history.is_empty() {
            NO_CHAT_HISTORY.to_string()
        } else {
            render::chat_history_message(history.exchanges())
        };
        return send_long(&bot, msg.chat.id, &replay, keyboard).await;
    }
    if query.trim().is_empty() {
        bot.send_message(msg.chat.id, BLANK_CHAT_REPLY)
            .reply_markup(keyboard)
            .await?;
        return Ok(());
    }

    let _ = bot.send_chat_action(msg.chat.id, ChatAction::Typing).await;
    let reply = services.helper.chat(query).await;
    send_long(&bot, msg.chat.id, &reply, keyboard).await?;

    history.push(query.to_string(), reply);
    dialogue.update(State::TutorChat { history }).await?;
    Ok(())
}

async fn send_study_material(
    bot: &Bot,
    dialogue: &QuizDialogue,
    services: &Services,
    chat_id: ChatId,
    topics: &str,
) -> HandlerResult {
    bot.send_message(chat_id, GENERATING_MATERIAL).await?;
    let _ = bot.send_chat_action(chat_id, ChatAction::Typing).await;

    let (material, language) = services.helper.study_material(topics).await;

    bot.send_message(
        chat_id,
        format!("Study Material for / படிப்பு பொருள்: {}", topics),
    )
    .await?;
    let keyboard = render::keyboard_with_home(&[language.strings().generate_quiz]);
    send_long(bot, chat_id, &material, keyboard).await?;

    dialogue
        .update(State::StudyMaterial {
            topics: topics.to_string(),
            language,
        })
        .await?;
    Ok(())
}

async fn send_question(
    bot: &Bot,
    chat_id: ChatId,
    flow: &QuizFlow,
    session: &QuizSession,
) -> HandlerResult {
    let Some(question) = session.current_question() else {
        return Ok(());
    };
    let language = flow.question_language(question.text());
    bot.send_message(
        chat_id,
        render::question_message(session.current_index(), question, language),
    )
    .parse_mode(ParseMode::Html)
    .reply_markup(render::answer_keyboard(question))
    .await?;
    Ok(())
}

async fn send_results(
    bot: &Bot,
    chat_id: ChatId,
    flow: &QuizFlow,
    session: &QuizSession,
) -> HandlerResult {
    let language = flow.results_language();
    bot.send_message(chat_id, render::results_message(session, language))
        .await?;
    send_chunks(
        bot,
        chat_id,
        render::review_chunks(session, language, MESSAGE_LIMIT),
        render::results_keyboard(session, language),
    )
    .await
}

/// Sends plain `text` in as many messages as needed; the keyboard goes with
/// the last one.
async fn send_long(
    bot: &Bot,
    chat_id: ChatId,
    text: &str,
    keyboard: KeyboardMarkup,
) -> HandlerResult {
    let chunks = render::split_message(text, MESSAGE_LIMIT)
        .into_iter()
        .map(Chunk::plain)
        .collect();
    send_chunks(bot, chat_id, chunks, keyboard).await
}

async fn send_chunks(
    bot: &Bot,
    chat_id: ChatId,
    mut chunks: Vec<Chunk>,
    keyboard: KeyboardMarkup,
) -> HandlerResult {
    if chunks.is_empty() {
        chunks.push(Chunk::plain("…".to_string()));
    }
    let last = chunks.len() - 1;
    for (i, chunk) in chunks.into_iter().enumerate() {
        let mut request = bot.send_message(chat_id, chunk.text);
        if chunk.html {
            request = request.parse_mode(ParseMode::Html);
        }
        if i == last {
            request = request.reply_markup(keyboard.clone());
        }
        request.await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history() -> ChatHistory {
        let mut history = ChatHistory::default();
        history.push("Who wrote Thirukkural?".to_string(), "Thiruvalluvar".to_string());
        history
    }

    #[test]
    fn tutor_history_survives_going_home() {
        let home = State::Home {
            history: State::TutorChat { history: history() }.into_chat_history(),
        };
        assert_eq!(home.into_chat_history(), history());
    }

    #[test]
    fn other_states_start_a_fresh_history() {
        assert!(State::Start.into_chat_history().is_empty());
        assert!(State::PracticeLobby.into_chat_history().is_empty());
        assert!(State::StudyTopics.into_chat_history().is_empty());
    }
}
