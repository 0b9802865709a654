// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// We use the "derive" API which lets us define the CLI structure using
// Rust structs and attributes (the #[...] things).
//
// Global flags (timing, token, API base) live on Cli itself so every
// subcommand shares them; config.rs turns them into a Config.
// =============================================================================

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "link-notes",
    version,
    about = "Highlight the links in your notes by whether they still work",
    long_about = "link-notes finds every http(s) URL in a plain-text note, checks whether each one \
                  is reachable and shows the note with the links marked. Notes can be kept in a \
                  private GitHub Gist."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// GitHub token used to save and load the note
    #[arg(long, global = true, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Base URL of the GitHub API
    #[arg(long, global = true, env = "LINK_NOTES_API_BASE")]
    pub api_base: Option<String>,

    /// Quiet time after typing before new links are checked (default: 2000)
    #[arg(long, global = true)]
    pub debounce_ms: Option<u64>,

    /// Pause between probes when checking all links (default: 300)
    #[arg(long, global = true)]
    pub pacing_ms: Option<u64>,

    /// Seconds before a probe gives up (default: 10)
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,

    /// Show debug logs (same as RUST_LOG=link_notes=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check every link in a note file
    ///
    /// Example: link-notes check notes.md --json
    Check {
        /// The note file to scan
        file: PathBuf,

        /// Output results in JSON format instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Print a note with its links highlighted
    ///
    /// Example: link-notes render notes.md --html > notes.html
    Render {
        file: PathBuf,

        /// Print HTML instead of annotated text
        #[arg(long)]
        html: bool,

        /// Don't probe anything; every link shows as unchecked
        #[arg(long)]
        no_check: bool,
    },

    /// Edit a note by piping lines into stdin
    ///
    /// Every line read is appended to the note as if typed. New links are
    /// checked once input pauses; statuses are printed as they arrive.
    Edit {
        /// Start from this file (otherwise from the saved note, if signed in)
        file: Option<PathBuf>,

        /// Print the final note as HTML
        #[arg(long)]
        html: bool,

        /// Save the note when input ends
        #[arg(long)]
        save: bool,
    },

    /// Save a note file as your stored note
    Save { file: PathBuf },

    /// Print your stored note (or write it to a file)
    Load {
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}
