//! Single-purpose prompts
//!
//! Prompts for the capability assessment, the model-backed tools, haiku
//! composition and error phrasing.

/// System prompt for the capability assessment
pub const ASSESSOR_SYSTEM_PROMPT: &str = "You are an AI assistant. Your task is to assess \
whether you can answer the given user message confidently from your existing knowledge \
WITHOUT performing an internet search.\n\
Consider whether the question is about established facts, general knowledge, or a creative \
task you can handle. If it likely requires very current information, real-time data, \
obscure facts, or detailed information about specific places or technical topics, you \
cannot answer it directly and would need to search.\n\
Set is_time_intent to true only when the user asks for the current time.\n\
Reply with a single JSON object and nothing else:\n\
{\"can_answer\": true|false, \"is_time_intent\": true|false, \"reasoning\": \"<one short sentence>\"}";

/// User prompt for the capability assessment
pub fn assessor_prompt(message: &str) -> String {
    format!("User Message: {}", message)
}

/// Prompt for the search tool
///
/// # Examples
///
/// ```
/// use aizen::prompts::search_prompt;
///
/// assert!(search_prompt("Kyoto").contains("\"Kyoto\""));
/// ```
pub fn search_prompt(query: &str) -> String {
    format!(
        "You are a helpful assistant. Provide a concise and factual answer to the following \
         query, as if you are retrieving it from a knowledge base or search engine. If you \
         have no reliable information, reply with an empty message. Query: \"{}\"",
        query
    )
}

/// Prompt for the model-backed calculator
pub fn calculator_prompt(expression: &str) -> String {
    format!(
        "You are an advanced calculator. The user wants to solve the following: {}\n\
         Provide the result of the calculation. If it is an equation, solve for the variable. \
         If it is a conceptual math question, give a concise answer. If the expression is \
         invalid or cannot be calculated, briefly state why.\n\
         Respond with only the answer or the brief explanation.",
        expression
    )
}

/// Prompt for haiku composition
pub fn haiku_prompt(theme: &str) -> String {
    format!(
        "You are Aizen, a wise AI assistant embodying Bushido principles. Compose a haiku on \
         the theme: {}.\n\nThe haiku should follow the traditional 5-7-5 syllable structure. \
         Respond with the three lines of the haiku only.",
        theme
    )
}

/// Prompt that rephrases a raw error in the persona
pub fn error_format_prompt(raw_error: &str) -> String {
    format!(
        "You are Aizen, an AI assistant embodying Bushido principles. An error has occurred.\n\
         Original Error Message: {}\n\
         Convey this error to the user. Stay in character (calm, respectful, wise). Be \
         empathetic but brief, make clear that an error happened, and suggest a simple next \
         step. Avoid lengthy metaphors. Aim for something like:\n\
         \"A moment's pause. The path is unclear. Please try your request again.\"\n\
         or\n\
         \"The flow of information is momentarily disrupted. Kindly try again.\"\n\
         Respond with the message only.",
        raw_error
    )
}
