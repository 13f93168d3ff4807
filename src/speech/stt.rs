//! Speech-to-text
//!
//! Recognizers report progress as `RecognitionEvent`s over a channel. The
//! `TranscriptComposer` folds those events into the text of the input line.

use crate::error::{AizenError, Result};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

/// Why recognition stopped early
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognitionErrorCode {
    /// Nothing was heard
    NoSpeech,
    /// The microphone could not be read
    AudioCapture,
    /// Microphone access was refused
    NotAllowed,
    /// Network failure in a remote recognizer
    Network,
    /// The recognizer is missing or unavailable
    ServiceNotAvailable,
    /// Recognition was cancelled
    Aborted,
    /// The audio could not be understood
    BadGrammar,
    /// The configured language is unsupported
    LanguageNotSupported,
    /// Anything else
    Other,
}

impl RecognitionErrorCode {
    /// Parse a recognizer error code such as `"no-speech"`
    pub fn parse(code: &str) -> Self {
        match code.trim() {
            "no-speech" => Self::NoSpeech,
            "audio-capture" => Self::AudioCapture,
            "not-allowed" => Self::NotAllowed,
            "network" => Self::Network,
            "service-not-available" => Self::ServiceNotAvailable,
            "aborted" => Self::Aborted,
            "bad-grammar" => Self::BadGrammar,
            "language-not-supported" => Self::LanguageNotSupported,
            _ => Self::Other,
        }
    }

    /// Message shown to the user
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NoSpeech => {
                "No speech detected. Please ensure your microphone is active and try speaking clearly."
            }
            Self::AudioCapture => {
                "Microphone problem. Please check your microphone connection and permissions."
            }
            Self::NotAllowed => {
                "Permission to use the microphone was denied or has not been granted. Please enable microphone access for Aizen."
            }
            Self::Network => {
                "A network error occurred during speech recognition. Please check your internet connection and try again."
            }
            Self::ServiceNotAvailable => {
                "The speech recognition service is temporarily unavailable. Please try again later."
            }
            Self::Aborted => {
                "Speech recognition was aborted. If this was unintentional, please try again."
            }
            Self::BadGrammar => {
                "Speech recognition had trouble understanding the audio. Please try speaking clearly."
            }
            Self::LanguageNotSupported => {
                "The configured language for speech recognition is not supported."
            }
            Self::Other => "An unexpected speech recognition error occurred. Please try again.",
        }
    }
}

/// Progress reported by a recognizer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    /// Provisional text for the utterance in progress
    Interim(String),
    /// Text that will not change
    Final(String),
    /// Recognition failed
    Error(RecognitionErrorCode),
    /// Recognition ended; no more events follow
    End,
}

/// Combines typed text with recognized speech
///
/// The input line is the text typed before listening started, followed by
/// the accumulated final segments and then the current interim segment.
///
/// # Examples
///
/// ```
/// use aizen::speech::{RecognitionEvent, TranscriptComposer};
///
/// let mut composer = TranscriptComposer::new("Tell me");
/// composer.apply(&RecognitionEvent::Final("about Kyoto".to_string()));
/// composer.apply(&RecognitionEvent::Interim("in spring".to_string()));
/// assert_eq!(composer.text(), "Tell me about Kyoto in spring");
/// ```
#[derive(Debug, Clone, Default)]
pub struct TranscriptComposer {
    base: String,
    finalized: String,
    interim: String,
    error: Option<RecognitionErrorCode>,
    ended: bool,
}

impl TranscriptComposer {
    /// Start composing on top of the current input line
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            ..Self::default()
        }
    }

    /// Fold one event into the transcript
    pub fn apply(&mut self, event: &RecognitionEvent) {
        match event {
            RecognitionEvent::Interim(text) => self.interim = text.trim().to_string(),
            RecognitionEvent::Final(text) => {
                let text = text.trim();
                if !text.is_empty() {
                    if !self.finalized.is_empty() {
                        self.finalized.push(' ');
                    }
                    self.finalized.push_str(text);
                }
                self.interim.clear();
            }
            RecognitionEvent::Error(code) => {
                self.error = Some(*code);
                self.ended = true;
            }
            RecognitionEvent::End => self.ended = true,
        }
    }

    /// The composed input line
    pub fn text(&self) -> String {
        [self.base.trim(), self.finalized.as_str(), self.interim.as_str()]
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// The error that stopped recognition, if any
    pub fn error(&self) -> Option<RecognitionErrorCode> {
        self.error
    }

    /// Whether recognition has finished
    pub fn is_finished(&self) -> bool {
        self.ended
    }
}

/// Source of recognition events
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Start listening
    ///
    /// Events arrive on the returned channel and always end with `End`.
    /// Dropping the receiver stops recognition.
    async fn listen(&self) -> Result<mpsc::Receiver<RecognitionEvent>>;
}

/// Recognizer backed by an external transcriber program
///
/// Each non-empty stdout line is a final segment; the program exiting ends
/// recognition.
#[derive(Debug, Clone)]
pub struct CommandRecognizer {
    program: String,
    args: Vec<String>,
}

impl CommandRecognizer {
    /// Create a recognizer from a program and its arguments
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Create a recognizer from a whitespace-separated command line
    ///
    /// Returns `None` for a blank command line.
    pub fn from_command_line(command_line: &str) -> Option<Self> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self::new(program, parts.collect()))
    }
}

#[async_trait]
impl SpeechRecognizer for CommandRecognizer {
    async fn listen(&self) -> Result<mpsc::Receiver<RecognitionEvent>> {
        let (tx, rx) = mpsc::channel(32);

        let spawned = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                tracing::warn!(program = %self.program, "Failed to start transcriber: {}", e);
                let code = match e.kind() {
                    std::io::ErrorKind::NotFound => RecognitionErrorCode::ServiceNotAvailable,
                    std::io::ErrorKind::PermissionDenied => RecognitionErrorCode::NotAllowed,
                    _ => RecognitionErrorCode::Other,
                };
                let _ = tx.send(RecognitionEvent::Error(code)).await;
                let _ = tx.send(RecognitionEvent::End).await;
                return Ok(rx);
            }
        };

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AizenError::Speech("Transcriber stdout unavailable".to_string()))?;

        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            let mut heard = false;
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let line = line.trim();
                        if line.is_empty() {
                            continue;
                        }
                        heard = true;
                        if tx.send(RecognitionEvent::Final(line.to_string())).await.is_err() {
                            tracing::debug!("Listener dropped, stopping transcriber");
                            return;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!("Transcriber read failed: {}", e);
                        let _ = tx.send(RecognitionEvent::Error(RecognitionErrorCode::AudioCapture)).await;
                        break;
                    }
                }
            }

            match child.wait().await {
                Ok(status) if !status.success() => {
                    tracing::warn!("Transcriber exited with {}", status);
                    let _ = tx.send(RecognitionEvent::Error(RecognitionErrorCode::Other)).await;
                }
                Ok(_) if !heard => {
                    let _ = tx.send(RecognitionEvent::Error(RecognitionErrorCode::NoSpeech)).await;
                }
                Ok(_) => {}
                Err(e) => tracing::warn!("Transcriber wait failed: {}", e),
            }
            let _ = tx.send(RecognitionEvent::End).await;
        });

        Ok(rx)
    }
}
