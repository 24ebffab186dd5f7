// Command-line interface definitions for taprelay
//
// This module is separate so it can be used by both the binary (main.rs)
// and `cargo xtask man` for generating man pages.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "taprelay")]
#[command(author, version, about = "Relay contract addresses from app notifications to a backend")]
#[command(long_about = "
Taprelay watches for notifications from a target app, opens the app,
taps its copy button, reads the copied contract address from the clipboard
and posts it, together with the notification text, to a backend.

SETUP:
  1. Install wl-clipboard (Wayland) or xclip (X11)
  2. Start ydotool daemon: systemctl --user enable --now ydotool
  3. Run: taprelay init (to write the default config)
  4. Run: taprelay set-backend http://<host>:<port>
  5. Pipe notifications in: <monitor> | taprelay

USAGE:
  Each target notification produces exactly one backend report and one
  log entry. Use 'taprelay logs' to review the last 50 outcomes.
")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<std::path::PathBuf>,

    /// Increase verbosity (-v = debug, -vv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Override backend base URL for this run (not persisted)
    #[arg(long, value_name = "URL")]
    pub backend_url: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run as daemon (default if no command specified)
    Daemon,

    /// Show stored report outcomes, most recent first
    Logs {
        /// Print entries as JSON
        #[arg(long)]
        json: bool,

        /// Show at most N entries
        #[arg(long, value_name = "N")]
        limit: Option<usize>,
    },

    /// Remove every stored report outcome
    ClearLogs,

    /// Save the backend base URL (e.g. http://10.0.2.2:8000)
    SetBackend {
        /// Base URL; /api/notifications is appended when sending
        url: String,
    },

    /// Show current configuration
    Config,

    /// Post a test notification to the backend
    TestConnection {
        /// Base URL to test instead of the configured one
        #[arg(value_name = "URL")]
        url: Option<String>,
    },

    /// Read the clipboard through the configured backend
    Clipboard,

    /// Write the default config file if none exists
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}
