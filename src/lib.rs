pub mod api;
pub mod cli;
pub mod dashboard;
pub mod db;
pub mod error;
pub mod settings;
pub mod timer;
pub mod timers;
mod utils;

use std::{path::Path, sync::Arc};

use anyhow::Result;
use clap::Parser;

use api::RequestAdapter;
use cli::{Cli, Command};
use db::{default_db_path, SqliteStore};
use settings::{default_data_dir, Settings, SettingsStore, SETTINGS_FILE};
use timer::CountdownClock;
use timers::{Notifier, TimerRepository};

/// Long-lived pieces shared by every command.
pub struct AppState {
    pub settings_store: SettingsStore,
    pub settings: Settings,
    pub repository: TimerRepository,
    pub clock: CountdownClock,
}

impl AppState {
    /// Load settings from `data_dir` (environment overrides applied) and
    /// wire storage, the request adapter, the notifier and the clock.
    /// Storage itself is opened lazily by the first request.
    pub fn open(data_dir: &Path) -> Result<Self> {
        let settings_store = SettingsStore::new(data_dir.join(SETTINGS_FILE))?;
        let settings = settings_store.effective();

        let store = Arc::new(SqliteStore::new(default_db_path(data_dir)));
        let client = RequestAdapter::new(store, settings.api_base_url.clone());
        let repository = TimerRepository::new(client, Notifier::new());
        let clock = CountdownClock::new(settings.tick_interval());

        Ok(Self {
            settings_store,
            settings,
            repository,
            clock,
        })
    }
}

pub async fn run() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let cli = Cli::parse();

    let data_dir = default_data_dir();
    let state = AppState::open(&data_dir)?;
    log::debug!(
        "Timo starting (data dir {}, base url {})",
        data_dir.display(),
        state.settings.api_base_url
    );

    let command = cli.command.unwrap_or(Command::List);
    cli::run(command, &state).await
}
