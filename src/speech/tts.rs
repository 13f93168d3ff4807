//! Text-to-speech through a system speech program

use crate::error::{AizenError, Result};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::{Child, Command};
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;

/// Speaks text aloud
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Speak `text`, interrupting anything still being spoken
    async fn speak(&self, text: &str) -> Result<()>;

    /// Stop the current utterance, if any
    async fn cancel(&self);

    /// Change the voice used for subsequent utterances
    async fn set_voice(&self, voice: Option<String>);
}

/// Default speech program for the platform
pub fn default_program() -> &'static str {
    if cfg!(target_os = "macos") {
        "say"
    } else {
        "espeak"
    }
}

/// A running speech process and the task that reaps it
#[derive(Debug)]
struct Utterance {
    stop: oneshot::Sender<()>,
    reaper: JoinHandle<()>,
}

impl Utterance {
    /// Wait for the child in the background so it is reaped as soon as it
    /// exits, killing it instead if `stop` fires first
    fn watch(mut child: Child) -> Self {
        let (stop, stopped) = oneshot::channel();
        let reaper = tokio::spawn(async move {
            tokio::select! {
                status = child.wait() => {
                    if let Err(e) = status {
                        tracing::debug!("Speech process wait failed: {}", e);
                    }
                }
                _ = stopped => {
                    if let Err(e) = child.kill().await {
                        tracing::debug!("Failed to stop utterance: {}", e);
                    }
                }
            }
        });
        Self { stop, reaper }
    }

    async fn stop(self) {
        let _ = self.stop.send(());
        if let Err(e) = self.reaper.await {
            tracing::debug!("Speech reaper ended abnormally: {}", e);
        }
    }
}

/// Synthesizer that runs `say`, `espeak` or a configured program
///
/// The program receives `-v <voice>` when a voice is set, followed by the
/// text as its final argument. Utterances run in the background.
#[derive(Debug)]
pub struct CommandSynthesizer {
    program: String,
    voice: Mutex<Option<String>>,
    current: Mutex<Option<Utterance>>,
}

impl CommandSynthesizer {
    /// Create a synthesizer
    ///
    /// `program` defaults to `default_program()`.
    pub fn new(program: Option<String>, voice: Option<String>) -> Self {
        Self {
            program: program.unwrap_or_else(|| default_program().to_string()),
            voice: Mutex::new(voice),
            current: Mutex::new(None),
        }
    }

    /// Program used for speech
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments for one utterance
    pub fn arguments(voice: Option<&str>, text: &str) -> Vec<String> {
        let mut args = Vec::with_capacity(3);
        if let Some(voice) = voice.filter(|v| !v.trim().is_empty()) {
            args.push("-v".to_string());
            args.push(voice.to_string());
        }
        args.push(text.to_string());
        args
    }

    /// Whether an utterance is still playing
    pub async fn is_speaking(&self) -> bool {
        self.current
            .lock()
            .await
            .as_ref()
            .is_some_and(|utterance| !utterance.reaper.is_finished())
    }
}

#[async_trait]
impl SpeechSynthesizer for CommandSynthesizer {
    async fn speak(&self, text: &str) -> Result<()> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }

        self.cancel().await;

        let voice = self.voice.lock().await.clone();
        let child = Command::new(&self.program)
            .args(Self::arguments(voice.as_deref(), text))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                tracing::warn!(program = %self.program, "Failed to start speech: {}", e);
                AizenError::Speech(format!("Failed to start {}: {}", self.program, e))
            })?;

        tracing::debug!(chars = text.len(), "Speaking");
        *self.current.lock().await = Some(Utterance::watch(child));
        Ok(())
    }

    async fn cancel(&self) {
        let utterance = self.current.lock().await.take();
        if let Some(utterance) = utterance {
            utterance.stop().await;
        }
    }

    async fn set_voice(&self, voice: Option<String>) {
        *self.voice.lock().await = voice;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arguments_with_and_without_voice() {
        assert_eq!(
            CommandSynthesizer::arguments(Some("Kyoko"), "hello"),
            vec!["-v", "Kyoko", "hello"]
        );
        assert_eq!(CommandSynthesizer::arguments(None, "hello"), vec!["hello"]);
        assert_eq!(CommandSynthesizer::arguments(Some(" "), "hello"), vec!["hello"]);
    }

    #[test]
    fn test_default_program() {
        let synth = CommandSynthesizer::new(None, None);
        assert_eq!(synth.program(), default_program());
    }

    #[tokio::test]
    async fn test_missing_program_is_speech_error() {
        let synth = CommandSynthesizer::new(Some("aizen-no-such-voice".to_string()), None);
        let err = synth.speak("hello").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AizenError>(),
            Some(AizenError::Speech(_))
        ));
        assert!(!synth.is_speaking().await);
    }

    #[tokio::test]
    async fn test_blank_text_is_ignored() {
        let synth = CommandSynthesizer::new(Some("aizen-no-such-voice".to_string()), None);
        assert!(synth.speak("   ").await.is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cancel_stops_utterance() {
        let synth = CommandSynthesizer::new(Some("sleep".to_string()), None);
        synth.speak("5").await.unwrap();
        assert!(synth.is_speaking().await);
        synth.cancel().await;
        assert!(!synth.is_speaking().await);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_finished_utterance_is_reaped_without_cancel() {
        let synth = CommandSynthesizer::new(Some("true".to_string()), None);
        synth.speak("done").await.unwrap();
        let finished = tokio::time::timeout(std::time::Duration::from_secs(5), async {
            while synth.is_speaking().await {
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            }
        })
        .await;
        assert!(finished.is_ok());
    }
}
