//! Prompts sent to the text generator. Every prompt pins the answer to a
//! single language and embeds the user's text verbatim.

use super::Language;

const TUTOR: &str = "You are an expert Tamil Nadu Public Service Commission (TNPSC) exam tutor.";

fn language_rule(language: Language) -> String {
    let name = language.name();
    format!(
        "IMPORTANT: Respond ONLY in {name}. Do not mix languages.
If the language is Tamil, use proper Tamil script exclusively and avoid English words.
If the language is English, use clear English exclusively without Tamil words."
    )
}

pub fn explanation(question: &str, correct_answer: &str, language: Language) -> String {
    let name = language.name();
    format!(
        "{TUTOR}
Explain the following question and its correct answer to a student in a clear, concise manner.

{rule}

Question: {question}
Correct Answer: {correct_answer}

Provide a detailed explanation in {name} that includes:
- Why this answer is correct
- Additional context or background information
- Related concepts that might help in understanding

Response in {name}:",
        rule = language_rule(language),
    )
}

pub fn study_material(topic: &str, language: Language) -> String {
    let name = language.name();
    format!(
        "{TUTOR}
Create comprehensive study material on the topic: {topic}

{rule}

Include the following sections in {name}:
- முக்கிய கருத்துகள் மற்றும் வரையறைகள் (Key concepts and definitions)
- வரலாற்று பின்னணி (Historical context - if applicable)
- முக்கிய உண்மைகள் மற்றும் புள்ளிவிவரங்கள் (Important facts and figures)
- TNPSC தேர்வுகளுக்கான தொடர்பு (Relevance to TNPSC exams)
- மாதிரி கேள்விகள் (Sample questions - if applicable)

Structure the content with clear headings. Use simple language suitable for exam preparation.

Study material in {name}:",
        rule = language_rule(language),
    )
}

/// The reply is expected to be a bare JSON array that
/// [`parse_questions`](super::parser::parse_questions) can read.
pub fn quiz_generation(topic: &str, count: usize, language: Language) -> String {
    let name = language.name();
    format!(
        "Generate {count} multiple-choice questions for TNPSC exam preparation on the topic: {topic}

{rule}

Format each question as a JSON object with the following keys:
- \"question\": the question text in {name}
- \"options\": array of exactly 4 options in {name}
- \"answer\": the correct answer (must be one of the 4 options, exact match)
- \"explanation\": a brief explanation in {name} of why this is the correct answer

Example format:
[
    {{
        \"question\": \"Question text in {name}\",
        \"options\": [\"Option 1\", \"Option 2\", \"Option 3\", \"Option 4\"],
        \"answer\": \"Option 2\",
        \"explanation\": \"Explanation in {name}\"
    }}
]

Return ONLY a valid JSON array of exactly {count} objects. No other text before or after.",
        rule = language_rule(language),
    )
}

pub fn chat(query: &str, language: Language) -> String {
    let name = language.name();
    format!(
        "You are an expert tutor for Tamil Nadu Public Service Commission (TNPSC) exams.

{rule}

Answer the following question in a helpful, educational manner.
If the question is not related to TNPSC exams, politely decline to answer and redirect to TNPSC topics.

User Question: {query}

Response in {name}:",
        rule = language_rule(language),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompts_pin_the_language() {
        for language in [Language::Tamil, Language::English] {
            let expected = format!("Respond ONLY in {}", language.name());
            assert!(explanation("Q", "A", language).contains(&expected));
            assert!(study_material("T", language).contains(&expected));
            assert!(quiz_generation("T", 10, language).contains(&expected));
            assert!(chat("Q", language).contains(&expected));
        }
    }

    #[test]
    fn user_content_is_embedded_verbatim() {
        let topic = "இந்திய வரலாறு, \"Sangam\" age";
        assert!(study_material(topic, Language::Tamil).contains(topic));
        assert!(quiz_generation(topic, 3, Language::Tamil).contains(topic));
        assert!(chat("Who wrote Thirukkural?", Language::English)
            .contains("User Question: Who wrote Thirukkural?"));

        let prompt = explanation("Capital of India?", "New Delhi", Language::English);
        assert!(prompt.contains("Question: Capital of India?"));
        assert!(prompt.contains("Correct Answer: New Delhi"));
    }

    #[test]
    fn quiz_prompt_states_the_output_contract() {
        let prompt = quiz_generation("Indian Polity", 7, Language::English);
        assert!(prompt.starts_with("Generate 7 multiple-choice questions"));
        assert!(prompt.contains("exactly 4 options"));
        assert!(prompt.contains("exact match"));
        assert!(prompt.contains("\"explanation\""));
        assert!(prompt.contains("exactly 7 objects"));
        // escaped braces survive formatting
        assert!(prompt.contains("    {\n"));
    }

    #[test]
    fn every_prompt_names_the_tnpsc_persona() {
        assert!(explanation("Q", "A", Language::English).contains("TNPSC"));
        assert!(study_material("T", Language::English).contains("TNPSC"));
        assert!(quiz_generation("T", 1, Language::English).contains("TNPSC"));
        assert!(chat("Q", Language::English).contains("TNPSC"));
    }
}
