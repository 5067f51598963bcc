// CLI module
// Argument parsing and the song / news / check subcommands

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use commands::{run_check, run_news, run_songs, CommandStatus};

/// Command-line arguments for refrain
#[derive(Parser, Debug)]
#[command(name = "refrain")]
#[command(about = "Generate validated song prompts and voiced news segments with LLMs")]
#[command(version)]
pub struct Cli {
    /// Configuration file (defaults to ~/.refrain/config.toml)
    #[arg(short, long, global = true, env = "REFRAIN_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Generate song prompts and send accepted ones to Suno
    Song {
        /// Number of songs to generate, one after another
        #[arg(short = 'n', long, default_value_t = 1)]
        count: usize,
    },

    /// Research a topic and produce a voiced news segment
    News {
        /// Topic name; subtopics are read from <topics_dir>/<topic>_topics.json
        topic: String,
    },

    /// Resolve every model role and report what each one uses
    Check,
}
