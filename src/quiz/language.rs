use std::{ops::RangeInclusive, sync::LazyLock};

use regex::Regex;

/// Tamil Unicode block
const TAMIL_BLOCK: RangeInclusive<u32> = 0x0B80..=0x0BFF;

/// Letters only: vowel signs and the virama are marks, not letters.
static LETTER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\p{L}").expect("valid regex"));

/// Output language of everything the bot says or asks the model to say.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Language {
    Tamil,
    #[default]
    English,
}

/// Picks Tamil when more than 10% of the letters of `text` are in the Tamil
/// block. A few native words are enough to route the answer into
/// Tamil, so the threshold is kept low.
pub fn detect_language(text: &str) -> Language {
    let (tamil, total) = LETTER
        .find_iter(text)
        .filter_map(|letter| letter.as_str().chars().next())
        .fold((0usize, 0usize), |(tamil, total), c| {
            let is_tamil = TAMIL_BLOCK.contains(&(c as u32));
            (tamil + usize::from(is_tamil), total + 1)
        });

    // ratio > 0.1, kept in integers so the boundary is exact
    if total > 0 && tamil * 10 > total {
        Language::Tamil
    } else {
        Language::English
    }
}

impl Language {
    /// The name used inside prompts ("Respond ONLY in ...").
    pub fn name(&self) -> &'static str {
        match self {
            Language::Tamil => "Tamil",
            Language::English => "English",
        }
    }

    pub fn strings(&self) -> &'static UiStrings {
        match self {
            Language::Tamil => &TAMIL_STRINGS,
            Language::English => &ENGLISH_STRINGS,
        }
    }
}

/// Localized labels and messages of the quiz and study screens.
#[derive(Debug)]
pub struct UiStrings {
    pub question: &'static str,
    pub select: &'static str,
    pub warning: &'static str,
    pub quiz_completed: &'static str,
    pub your_score: &'static str,
    pub explanations: &'static str,
    pub explanation: &'static str,
    pub your_answer: &'static str,
    pub correct_answer: &'static str,
    pub take_again: &'static str,
    pub excellent: &'static str,
    pub good: &'static str,
    pub keep_studying: &'static str,
    pub ai_explanation: &'static str,
    pub explanation_failed: &'static str,
    pub study_material_failed: &'static str,
    pub chat_failed: &'static str,
    pub generate_quiz: &'static str,
    pub quiz_generated: &'static str,
    pub quiz_generation_failed: &'static str,
    pub interactive_quiz: &'static str,
}

const ENGLISH_STRINGS: UiStrings = UiStrings {
    question: "Question",
    select: "Select your answer:",
    warning: "Please select an answer before submitting.",
    quiz_completed: "Quiz Completed!",
    your_score: "Your Score:",
    explanations: "Explanations",
    explanation: "Explanation:",
    your_answer: "Your answer:",
    correct_answer: "Correct answer:",
    take_again: "Take Quiz Again",
    excellent: "Excellent performance! 🏆",
    good: "Good job! Keep practicing. 👍",
    keep_studying: "Keep studying - you'll improve! 📚",
    ai_explanation: "AI Explanation:",
    explanation_failed: "Could not generate explanation:",
    study_material_failed: "Could not generate study material:",
    chat_failed: "Sorry, I couldn't process your request:",
    generate_quiz: "Generate 10 Quiz Questions",
    quiz_generated: "Quiz generated successfully! Let's start.",
    quiz_generation_failed: "Failed to generate quiz questions. Please try again.",
    interactive_quiz: "Interactive Quiz",
};

const TAMIL_STRINGS: UiStrings = UiStrings {
    question: "கேள்வி",
    select: "தேர்வு செய்யவும்:",
    warning: "தயவு செய்து ஒரு பதிலைத் தேர்ந்தெடுக்கவும்",
    quiz_completed: "வினாடி வினா முடிந்தது!",
    your_score: "உங்கள் மதிப்பெண்:",
    explanations: "விளக்கங்கள்",
    explanation: "விளக்கம்:",
    your_answer: "உங்கள் பதில்:",
    correct_answer: "சரியான பதில்:",
    take_again: "மீண்டும் முயற்சிக்கவும்",
    excellent: "சிறப்பான செயல்திறன்! 🏆",
    good: "நல்லது! தொடர்ந்து பயிற்சி செய்யுங்கள். 👍",
    keep_studying: "தொடர்ந்து படியுங்கள் - நீங்கள் மேம்படுவீர்கள்! 📚",
    ai_explanation: "விரிவான AI விளக்கம்:",
    explanation_failed: "விளக்கம் உருவாக்க முடியவில்லை:",
    study_material_failed: "பாடப்பொருள் உருவாக்க முடியவில்லை:",
    chat_failed: "மன்னிக்கவும், உங்கள் கோரிக்கையை செயல்படுத்த முடியவில்லை:",
    generate_quiz: "10 வினாடி வினா கேள்விகளை உருவாக்கவும்",
    quiz_generated: "வினாடி வினா வெற்றிகரமாக உருவாக்கப்பட்டது! தொடங்குவோம்.",
    quiz_generation_failed: "வினாடி வினா கேள்விகளை உருவாக்க முடியவில்லை. மீண்டும் முயற்சிக்கவும்.",
    interactive_quiz: "ஊடாடும் வினாடி வினா",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_alphabetic_characters_is_english() {
        assert_eq!(detect_language(""), Language::English);
        assert_eq!(detect_language("1234 !? -- 56"), Language::English);
        assert_eq!(detect_language("   \n\t"), Language::English);
    }

    #[test]
    fn tamil_text_is_tamil() {
        assert_eq!(detect_language("இந்திய வரலாறு"), Language::Tamil);
        assert_eq!(detect_language("தமிழ் கலாச்சாரம் 2024"), Language::Tamil);
    }

    #[test]
    fn english_text_is_english() {
        assert_eq!(detect_language("Indian History"), Language::English);
    }

    #[test]
    fn mostly_tamil_with_latin_noise_is_tamil() {
        // 9 Tamil letters, 1 Latin letter
        assert_eq!(detect_language("கசடதபறயரல x"), Language::Tamil);
    }

    #[test]
    fn ratio_of_exactly_one_tenth_is_english() {
        // 1 Tamil letter out of 10 alphabetic characters
        assert_eq!(detect_language("க abcdefghi"), Language::English);
        // 2 out of 11 is just above the threshold
        assert_eq!(detect_language("கச abcdefghi"), Language::Tamil);
    }

    #[test]
    fn vowel_signs_are_not_counted_as_letters() {
        // "கி" is one letter plus a vowel sign, so 1 of 10 letters is Tamil
        assert_eq!(detect_language("abcdefghi கி"), Language::English);
        assert_eq!(detect_language("abcdefgh கி"), Language::Tamil);
        // the virama in "க்" is not a letter either
        assert_eq!(detect_language("abcdefghi க்"), Language::English);
    }

    #[test]
    fn a_few_tamil_words_in_english_route_to_tamil() {
        assert_eq!(
            detect_language("TNPSC group 4 தமிழ் இலக்கணம்"),
            Language::Tamil
        );
    }

    #[test]
    fn strings_follow_language() {
        assert_eq!(Language::English.strings().question, "Question");
        assert_eq!(Language::Tamil.strings().question, "கேள்வி");
        assert_eq!(Language::Tamil.name(), "Tamil");
    }
}
