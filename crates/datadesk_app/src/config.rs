use std::path::PathBuf;
use std::time::Duration;

use anyhow::{ensure, Context};
use datadesk_core::{BrowserConfig, PollerConfig};
use datadesk_engine::ClientSettings;

use crate::cli::GlobalArgs;

const DEFAULT_STATE_DIR: &str = ".datadesk";

/// Resolved runtime configuration: engine defaults, overlaid by environment
/// variables and flags (clap reads both).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub settings: ClientSettings,
    pub state_dir: PathBuf,
}

impl AppConfig {
    pub fn resolve(args: &GlobalArgs) -> anyhow::Result<Self> {
        let mut settings = ClientSettings::default();
        if let Some(url) = &args.api_url {
            settings.base_url = url.trim().to_string();
        }
        if let Some(ms) = args.poll_ms {
            ensure!(ms > 0, "poll interval must be positive");
            settings.poll_interval = Duration::from_millis(ms);
        }
        if let Some(limit) = args.limit {
            ensure!(limit > 0, "page limit must be positive");
            settings.page_limit = limit;
        }
        if let Some(secs) = args.timeout_secs {
            settings.request_timeout = Duration::from_secs(secs);
        }

        let state_dir = match &args.state_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()
                .context("cannot determine current directory")?
                .join(DEFAULT_STATE_DIR),
        };

        Ok(Self {
            settings,
            state_dir,
        })
    }

    pub fn browser_config(&self) -> BrowserConfig {
        BrowserConfig {
            limit: self.settings.page_limit,
            deep_page_threshold: self.settings.deep_page_threshold,
            cursor_supported: true,
        }
    }

    pub fn poller_config(&self) -> PollerConfig {
        PollerConfig {
            poll_interval: self.settings.poll_interval,
            stop_grace: self.settings.stop_grace,
            stoppable: false,
        }
    }
}
