// src/config.rs
// =============================================================================
// Runtime settings, gathered in one place.
//
// Every knob has a default that matches how the editor is meant to behave:
// - 2 seconds of quiet typing before new URLs are probed
// - 300 ms between probes during "check all"
// - 10 seconds before a probe gives up
//
// The CLI can override each of them (see cli.rs); tests build configs directly.
// =============================================================================

use std::time::Duration;

use crate::cli::Cli;
use crate::persist::Credential;

pub const DEBOUNCE_DELAY: Duration = Duration::from_millis(2000);
pub const PACING_DELAY: Duration = Duration::from_millis(300);
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);
pub const GITHUB_API: &str = "https://api.github.com";

// Some sites answer bots with 403, so probes look like a regular browser
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                                  (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Timing of the reconciliation engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Quiet period after the last edit before a reconciliation pass
    pub debounce: Duration,
    /// Gap between consecutive probes of a bulk check
    pub pacing: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce: DEBOUNCE_DELAY,
            pacing: PACING_DELAY,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout: PROBE_TIMEOUT,
            user_agent: BROWSER_USER_AGENT.to_string(),
        }
    }
}

/// Where notes are stored
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub api_base: String,
    pub user_agent: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            api_base: GITHUB_API.to_string(),
            user_agent: concat!("link-notes/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// All settings for one run of the program
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub engine: EngineConfig,
    pub probe: ProbeConfig,
    pub store: StoreConfig,
    pub credential: Option<Credential>,
}

impl Config {
    // Builds the config from parsed command-line flags
    // Flags that were not given keep their defaults
    pub fn from_cli(cli: &Cli) -> Self {
        let mut config = Config::default();

        if let Some(ms) = cli.debounce_ms {
            config.engine.debounce = Duration::from_millis(ms);
        }
        if let Some(ms) = cli.pacing_ms {
            config.engine.pacing = Duration::from_millis(ms);
        }
        if let Some(secs) = cli.timeout_secs {
            config.probe.timeout = Duration::from_secs(secs);
        }
        if let Some(base) = &cli.api_base {
            config.store.api_base = base.trim_end_matches('/').to_string();
        }
        config.credential = cli
            .token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(Credential::new);

        config
    }
}
