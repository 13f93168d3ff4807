//! Prompts used by Aizen
//!
//! The persona system prompt is built by `PersonaPrompt`; the assessor, the
//! model-backed tools, haiku composition and error phrasing each have a
//! dedicated prompt function.

pub mod persona_prompt;
pub mod task_prompts;

pub use persona_prompt::PersonaPrompt;
pub use task_prompts::{
    assessor_prompt, calculator_prompt, error_format_prompt, haiku_prompt, search_prompt,
    ASSESSOR_SYSTEM_PROMPT,
};

use crate::preferences::UserPreferences;

/// Builds the persona system prompt used by the response composer
///
/// # Examples
///
/// ```
/// use aizen::prompts::build_system_prompt;
///
/// let prompt = build_system_prompt(None);
/// assert!(prompt.contains("Aizen"));
/// assert!(prompt.contains("internet_search"));
/// ```
pub fn build_system_prompt(preferences: Option<UserPreferences>) -> String {
    PersonaPrompt::new()
        .with_preferences(preferences)
        .with_tools(true)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_system_prompt_not_empty() {
        let prompt = build_system_prompt(None);
        assert!(!prompt.is_empty());
        assert!(prompt.contains("Bushido"));
    }
}
