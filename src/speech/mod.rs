//! Speech input and output
//!
//! Both directions are optional and never fatal: failures are reported to
//! the user and the text conversation continues.

pub mod stt;
pub mod tts;

pub use stt::{
    CommandRecognizer, RecognitionErrorCode, RecognitionEvent, SpeechRecognizer,
    TranscriptComposer,
};
pub use tts::{CommandSynthesizer, SpeechSynthesizer};

use crate::config::SpeechConfig;
use std::sync::Arc;

/// Build the synthesizer described by the speech configuration
pub fn synthesizer_from_config(config: &SpeechConfig) -> Arc<dyn SpeechSynthesizer> {
    Arc::new(CommandSynthesizer::new(
        config.tts_command.clone(),
        config.voice.clone(),
    ))
}

/// Build the recognizer described by the speech configuration
///
/// Returns `None` when no transcriber command is configured.
pub fn recognizer_from_config(config: &SpeechConfig) -> Option<Arc<dyn SpeechRecognizer>> {
    let recognizer = CommandRecognizer::from_command_line(config.stt_command.as_deref()?)?;
    Some(Arc::new(recognizer))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recognizer_requires_command() {
        assert!(recognizer_from_config(&SpeechConfig::default()).is_none());
        let config = SpeechConfig {
            stt_command: Some("transcribe --once".to_string()),
            ..SpeechConfig::default()
        };
        assert!(recognizer_from_config(&config).is_some());
    }
}
