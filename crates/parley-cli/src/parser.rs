//! Main CLI parser and top-level argument handling.

use clap::{Parser, Subcommand};
use parley_client::TtsVoice;

/// Talk to practice personas from the terminal.
#[derive(Debug, Parser)]
#[command(name = "parley")]
#[command(about = "Hold spoken practice conversations with AI personas")]
#[command(version)]
pub struct Cli {
    /// Base URL of the conversation API
    #[arg(
        long,
        env = "PARLEY_BASE_URL",
        global = true,
        default_value = "http://localhost:8000/api"
    )]
    pub base_url: String,

    /// Bearer token sent with every request
    #[arg(long, env = "PARLEY_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    /// Where the current conversation id is remembered
    #[arg(long = "state-file", global = true)]
    pub state_file: Option<std::path::PathBuf>,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start or resume a conversation with a persona
    Chat {
        /// Persona (scenario) to talk to
        #[arg(long, env = "PARLEY_CHARACTER_ID")]
        character: String,

        /// Activity the conversation belongs to
        #[arg(long, env = "PARLEY_ACTIVITY_ID", default_value = "")]
        activity: String,

        /// Ignore any saved conversation and start a new one
        #[arg(long)]
        new: bool,

        /// Write reply audio to this directory instead of playing it
        #[arg(long, conflicts_with = "mute")]
        audio_dir: Option<std::path::PathBuf>,

        /// Do not play or save reply audio
        #[arg(long)]
        mute: bool,

        /// Voice for whole-reply audio (alloy, echo, fable, onyx, nova, shimmer)
        #[arg(long)]
        voice: Option<TtsVoice>,

        /// Playback speed for whole-reply audio (0.25 to 4.0)
        #[arg(long)]
        speed: Option<f32>,
    },

    /// Forget the saved conversation id
    Forget,
}
