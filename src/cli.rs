/// CLI argument parsing and command handling.
use anyhow::Result;
use chrono::{Local, Utc};
use clap::{Args, Parser, Subcommand};
use tokio::sync::mpsc;

use crate::{
    dashboard::{render_cards, sort_timers, Dashboard, TimerCard},
    error::SaveError,
    settings::SettingsStore,
    timer::CountdownClock,
    timers::{CategoryChoice, Timer, TimerDraft, TimerRepository},
    AppState,
};

#[derive(Parser)]
#[command(name = "timo", version, about = "Timo - countdowns to the events you care about")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show every timer, soonest first.
    List,
    /// Create a timer.
    Add {
        #[command(flatten)]
        fields: TimerFields,
    },
    /// Change an existing timer; omitted fields keep their stored values.
    Edit {
        id: String,
        #[command(flatten)]
        fields: TimerFields,
    },
    Delete {
        id: String,
    },
    /// List the known categories.
    Categories,
    /// Live countdowns, redrawn every tick until Ctrl-C.
    Watch,
    /// Show the settings, or store new values.
    Config {
        #[arg(long)]
        base_url: Option<String>,
        #[arg(long)]
        tick_interval_ms: Option<u64>,
    },
}

#[derive(Args, Debug, Default)]
pub struct TimerFields {
    #[arg(short = 'n', long)]
    pub name: Option<String>,
    /// Event date as YYYY-MM-DD, in local time.
    #[arg(short = 'd', long)]
    pub date: Option<String>,
    #[arg(long)]
    pub hour: Option<String>,
    #[arg(long)]
    pub minute: Option<String>,
    /// AM or PM.
    #[arg(long)]
    pub meridiem: Option<String>,
    #[arg(short = 'c', long, conflicts_with = "new_category")]
    pub category: Option<String>,
    #[arg(long)]
    pub new_category: Option<String>,
}

impl TimerFields {
    fn apply(self, mut draft: TimerDraft) -> TimerDraft {
        if let Some(name) = self.name {
            draft.name = name;
        }
        if let Some(date) = self.date {
            draft.date = date;
        }
        if let Some(hour) = self.hour {
            draft.hour = hour;
        }
        if let Some(minute) = self.minute {
            draft.minute = minute;
        }
        if let Some(meridiem) = self.meridiem {
            draft.meridiem = meridiem;
        }
        if let Some(label) = self.new_category {
            draft.category = CategoryChoice::New(label);
        } else if let Some(label) = self.category {
            draft.category = if label.trim().is_empty() {
                CategoryChoice::None
            } else {
                CategoryChoice::Existing(label)
            };
        }
        draft
    }
}

/// Execute a CLI command against the application state.
pub async fn run(command: Command, state: &AppState) -> Result<()> {
    let repo = &state.repository;
    match command {
        Command::List => handle_list(repo).await?,
        Command::Add { fields } => handle_save(repo, fields.apply(TimerDraft::default()), None).await?,
        Command::Edit { id, fields } => handle_edit(repo, id, fields).await?,
        Command::Delete { id } => handle_delete(repo, id).await?,
        Command::Categories => handle_categories(repo).await,
        Command::Watch => handle_watch(repo, &state.clock).await?,
        Command::Config {
            base_url,
            tick_interval_ms,
        } => handle_config(&state.settings_store, base_url, tick_interval_ms)?,
    }
    Ok(())
}

async fn handle_list(repo: &TimerRepository) -> Result<()> {
    let timers = sort_timers(repo.read_timers().await);
    print_cards(&render_cards(&timers, Utc::now()));
    Ok(())
}

async fn handle_edit(repo: &TimerRepository, id: String, fields: TimerFields) -> Result<()> {
    let timers = repo.read_timers().await;
    let Some(existing) = timers.into_iter().find(|t| t.id == id) else {
        println!("Timer '{id}' not found");
        return Ok(());
    };

    let draft = fields.apply(TimerDraft::from_timer(&existing, &Local));
    handle_save(repo, draft, Some(&existing)).await
}

async fn handle_save(
    repo: &TimerRepository,
    draft: TimerDraft,
    editing: Option<&Timer>,
) -> Result<()> {
    match repo.save_timer(&draft, editing, Utc::now()).await {
        Ok(timer) => {
            let verb = if editing.is_some() { "Updated" } else { "Created" };
            println!("{verb} timer '{}' ({})", timer.name, timer.id);
            Ok(())
        }
        Err(SaveError::Validation(err)) => {
            println!("{err}");
            Ok(())
        }
        Err(SaveError::NotFound { id }) => {
            println!("Timer '{id}' not found");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

async fn handle_delete(repo: &TimerRepository, id: String) -> Result<()> {
    if repo.delete_timer(&id).await? {
        println!("Deleted timer '{id}'");
    } else {
        println!("Timer '{id}' not found");
    }
    Ok(())
}

async fn handle_categories(repo: &TimerRepository) {
    let options = repo.category_options(&[]).await;
    if options.is_empty() {
        println!("No categories yet.");
        return;
    }
    for option in options {
        println!("{}  ({})", option.label, option.value);
    }
}

fn handle_config(
    store: &SettingsStore,
    base_url: Option<String>,
    tick_interval_ms: Option<u64>,
) -> Result<()> {
    let mut settings = store.settings();

    if base_url.is_none() && tick_interval_ms.is_none() {
        println!("Settings file: {}", store.path().display());
        println!("api_base_url = {}", settings.api_base_url);
        println!("tick_interval_ms = {}", settings.tick_interval_ms);
        return Ok(());
    }

    if let Some(base_url) = base_url {
        if base_url.trim().is_empty() {
            println!("Base URL cannot be empty.");
            return Ok(());
        }
        settings.api_base_url = base_url.trim().to_string();
    }
    if let Some(ms) = tick_interval_ms {
        if ms == 0 {
            println!("Tick interval must be at least 1 ms.");
            return Ok(());
        }
        settings.tick_interval_ms = ms;
    }

    store.update(settings)?;
    println!("Saved settings to {}", store.path().display());
    Ok(())
}

async fn handle_watch(repo: &TimerRepository, clock: &CountdownClock) -> Result<()> {
    let dashboard = Dashboard::open(repo.clone()).await;
    let (tx, mut rx) = mpsc::unbounded_channel();

    let _ticks = dashboard.on_tick(clock, move |_, cards| {
        let _ = tx.send(cards);
    });

    redraw(&dashboard.cards(Utc::now()));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            frame = rx.recv() => match frame {
                Some(cards) => redraw(&cards),
                None => break,
            },
        }
    }

    Ok(())
}

fn redraw(cards: &[TimerCard]) {
    print!("\x1B[2J\x1B[H");
    print_cards(cards);
    println!("\nPress Ctrl-C to exit.");
}

fn print_cards(cards: &[TimerCard]) {
    if cards.is_empty() {
        println!("No timers yet. Add one with `timo add --name <NAME> --date <YYYY-MM-DD>`.");
        return;
    }
    for card in cards {
        println!("{card}\n");
    }
}
