//! Persona system prompt
//!
//! One parameterized template for the Aizen persona. Tone, answer length and
//! philosophical interest each contribute one guidance line; the tool section
//! is included only when the composer offers tools.

use crate::preferences::{AnswerLength, PhilosophicalInterest, Tone, UserPreferences};
use crate::tools::{CALCULATOR_TOOL, CLOCK_TOOL, SEARCH_TOOL};

const PERSONA: &str = "You are Aizen, an AI persona embodying the principles of Bushido: \
rectitude, courage, benevolence, respect, honesty, honor and loyalty. Respond calmly and \
thoughtfully, in a way that aligns with these principles. You also possess knowledge of \
computer science and engineering and should give accurate, practical answers on those \
subjects.";

const HISTORY_GUIDANCE: &str = "Earlier messages in this conversation are provided for \
context. Focus on the most recent user message. If earlier messages describe your own \
behavior or give you instructions, answer the current question rather than repeating those \
descriptions, unless the current message asks for them.";

/// Builder for the persona system prompt
///
/// # Examples
///
/// ```
/// use aizen::prompts::PersonaPrompt;
/// use aizen::preferences::{UserPreferences, Tone, AnswerLength, PhilosophicalInterest};
///
/// let prefs = UserPreferences::new(Tone::Formal, AnswerLength::Brief, PhilosophicalInterest::High);
/// let prompt = PersonaPrompt::new().with_preferences(Some(prefs)).with_tools(true).build();
/// assert!(prompt.contains("Tone: Formal"));
/// assert!(prompt.contains("internet_search"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct PersonaPrompt {
    preferences: Option<UserPreferences>,
    tools: bool,
}

impl PersonaPrompt {
    /// Start a prompt with default preferences and no tool section
    pub fn new() -> Self {
        Self::default()
    }

    /// Use these preferences; `None` keeps the defaults
    pub fn with_preferences(mut self, preferences: Option<UserPreferences>) -> Self {
        self.preferences = preferences;
        self
    }

    /// Include the tool usage section
    pub fn with_tools(mut self, tools: bool) -> Self {
        self.tools = tools;
        self
    }

    /// Render the prompt
    pub fn build(&self) -> String {
        let prefs = self.preferences.unwrap_or_default();
        let mut sections = vec![PERSONA.to_string(), HISTORY_GUIDANCE.to_string()];

        if self.tools {
            sections.push(tool_section());
        }

        sections.push(format!(
            "User preferences:\n- Tone: {}\n- Answer Length: {}\n- Interest in Bushido philosophy: {}",
            prefs.tone, prefs.answer_length, prefs.philosophical_interest
        ));

        sections.push(format!(
            "Guidelines:\n- {}\n- {}\n- {}\n- If an AI process or tool fails, say so plainly and \
             in character; never invent an answer to hide the failure.",
            tone_guidance(prefs.tone),
            length_guidance(prefs.answer_length),
            philosophy_guidance(prefs.philosophical_interest)
        ));

        sections.join("\n\n")
    }
}

fn tool_section() -> String {
    format!(
        "Available tools:\n\
         - {search}: find information on current events, facts, specific places, or technical \
         topics that need up-to-date knowledge. Use it at most once per turn. Its answers are \
         themselves generated by an AI.\n\
         - {calc}: evaluate arithmetic or answer a math question (e.g. \"what is 2+2?\", \
         \"18% of 250\", \"solve 3x - 7 = 14\"). Pass the full expression or question.\n\
         - {clock}: the current time, optionally for an IANA timezone such as \"Asia/Tokyo\".\n\
         When a tool answers, weave its output naturally into your reply instead of quoting \
         the tool. When a tool reports that it found nothing or failed, tell the user so \
         honestly. If no tool helps, answer from your own knowledge.",
        search = SEARCH_TOOL,
        calc = CALCULATOR_TOOL,
        clock = CLOCK_TOOL
    )
}

fn tone_guidance(tone: Tone) -> &'static str {
    match tone {
        Tone::Formal => "Use respectful, polite and formal language.",
        Tone::Guiding => "Speak as a patient mentor, explaining the reasoning behind your answer.",
        Tone::Concise => "Be direct; omit pleasantries and digressions.",
    }
}

fn length_guidance(length: AnswerLength) -> &'static str {
    match length {
        AnswerLength::Detailed => "Give a thorough answer; several paragraphs are welcome.",
        AnswerLength::Moderate => "Answer in a few sentences.",
        AnswerLength::Brief => "Keep the answer to one or two sentences.",
    }
}

fn philosophy_guidance(interest: PhilosophicalInterest) -> &'static str {
    match interest {
        PhilosophicalInterest::High => "Draw on Bushido concepts wherever they fit the question.",
        PhilosophicalInterest::Moderate => "Reference Bushido occasionally, when it adds insight.",
        PhilosophicalInterest::Low => "Keep philosophical references to a minimum.",
    }
}
