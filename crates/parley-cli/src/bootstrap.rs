//! CLI bootstrap - the composition root.
//!
//! The only place where adapters are chosen and wired together:
//! - the reqwest client (conversation API, reply stream, audio source)
//! - an audio sink (speaker, clip directory or nothing)
//! - the core `ConversationSession` that drives them

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use parley_client::{DefaultParleyClient, ParleyClientConfig, TtsVoice};
use parley_core::{
    AudioSink, ConversationSession, NullSink, SessionConfig, SessionEvent, StaticToken,
};
use parley_voice::DirectorySink;
use tokio::sync::mpsc;

/// Where reply audio goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioOutput {
    /// The default output device, falling back to silence if unavailable.
    Speaker,
    /// Write clips to a directory.
    Directory(PathBuf),
    /// Discard audio.
    Muted,
}

/// Bootstrap configuration for the CLI.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub audio: AudioOutput,
    pub voice: Option<TtsVoice>,
    pub speed: Option<f32>,
}

/// Fully composed context for the chat command.
pub struct CliContext {
    pub session: ConversationSession,
    pub events: mpsc::UnboundedReceiver<SessionEvent>,
}

fn client_config(config: &CliConfig) -> ParleyClientConfig {
    let mut client = ParleyClientConfig::new().with_base_url(config.base_url.as_str());
    if let Some(voice) = config.voice {
        client = client.with_voice(voice);
    }
    if let Some(speed) = config.speed {
        client = client.with_speed(speed);
    }
    client
}

fn open_sink(output: &AudioOutput) -> Result<Arc<dyn AudioSink>> {
    match output {
        AudioOutput::Muted => Ok(Arc::new(NullSink)),
        AudioOutput::Directory(dir) => {
            let sink = DirectorySink::create(dir)
                .with_context(|| format!("Cannot write audio to {}", dir.display()))?;
            Ok(Arc::new(sink))
        }
        AudioOutput::Speaker => Ok(open_speaker()),
    }
}

#[cfg(feature = "speaker")]
fn open_speaker() -> Arc<dyn AudioSink> {
    match parley_voice::SpeakerSink::open() {
        Ok(sink) => Arc::new(sink),
        Err(e) => {
            tracing::warn!(error = %e, "No audio output available, replies will be silent");
            Arc::new(NullSink)
        }
    }
}

#[cfg(not(feature = "speaker"))]
fn open_speaker() -> Arc<dyn AudioSink> {
    tracing::info!("Built without speaker support, replies will be silent");
    Arc::new(NullSink)
}

/// Build the client, sink and session.
pub fn bootstrap(config: &CliConfig) -> Result<CliContext> {
    let tokens = Arc::new(
        config
            .token
            .clone()
            .map_or_else(StaticToken::anonymous, StaticToken::new),
    );
    let client_config = client_config(config);
    let client = Arc::new(
        DefaultParleyClient::new(&client_config, tokens)
            .with_context(|| format!("Invalid server address '{}'", config.base_url))?,
    );
    let sink = open_sink(&config.audio)?;

    let (session, events) = ConversationSession::new(
        client.clone(),
        client.clone(),
        client,
        sink,
        SessionConfig {
            retry: client_config.retry_policy(),
            ..SessionConfig::default()
        },
    );
    Ok(CliContext { session, events })
}
