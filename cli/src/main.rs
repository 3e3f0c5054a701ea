mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process;
use tracing_subscriber::EnvFilter;

use crate::commands::{
    HabitOptions, Tracker, cmd_add, cmd_archive, cmd_dec, cmd_edit, cmd_history, cmd_inc,
    cmd_list, cmd_log, cmd_remove, cmd_restore, cmd_stats, cmd_time, cmd_toggle,
};
use crate::config::Config;

/// Log filter, e.g. `STREAK_LOG=streak_core=debug`.
const LOG_ENV: &str = "STREAK_LOG";

#[derive(Parser)]
#[command(
    name = "streak",
    version,
    about = "A simple, local-first habit tracker",
    long_about = "Track daily habits from the terminal.\n\n\
        Habits are binary (done / not done), count-based (e.g. 8 glasses of water)\n\
        or time-based (e.g. 30 minutes of reading). Streaks count consecutive days\n\
        with any logged progress."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a new habit
    Add {
        /// Habit name
        name: String,
        #[command(flatten)]
        opts: HabitOptions,
        /// Backdate creation (YYYY-MM-DD or today/yesterday/tomorrow)
        #[arg(long)]
        since: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit a habit's definition
    Edit {
        /// Habit ID
        habit_id: i64,
        /// New name
        #[arg(long)]
        name: Option<String>,
        #[command(flatten)]
        opts: HabitOptions,
        /// Turn the reminder off
        #[arg(long)]
        no_reminder: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Archive a habit (hidden from daily views, history kept)
    Archive {
        /// Habit ID
        habit_id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Bring an archived habit back
    Restore {
        /// Habit ID
        habit_id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Permanently delete a habit and all its completions
    Remove {
        /// Habit ID
        habit_id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show habits and their progress for a day (defaults to today)
    List {
        /// Date to show (YYYY-MM-DD or today/yesterday/tomorrow)
        date: Option<String>,
        /// List every habit definition, including archived ones
        #[arg(short, long)]
        all: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Toggle a habit for a day: mark/unmark, count up by one, or fill the time goal
    Toggle {
        /// Habit ID
        habit_id: i64,
        /// Date (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add one to a count habit
    Inc {
        /// Habit ID
        habit_id: i64,
        /// Date (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Take one off a count habit (the day is cleared at zero)
    Dec {
        /// Habit ID
        habit_id: i64,
        /// Date (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Record minutes spent on a time habit (0 clears the day)
    Time {
        /// Habit ID
        habit_id: i64,
        /// Minutes spent
        minutes: u32,
        /// Date (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Optional notes
        #[arg(long)]
        notes: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a habit's completion log and streaks
    Log {
        /// Habit ID
        habit_id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show statistics for a day (defaults to today)
    Stats {
        /// Date to show (YYYY-MM-DD or today/yesterday/tomorrow)
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show completed/total habits for the last N days
    History {
        /// Number of days to show
        #[arg(short, long, default_value = "7")]
        days: u32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    tracing::debug!(db_path = %config.db_path.display(), "opening database");
    let tracker = Tracker::open(&config.db_path)?;

    match cli.command {
        Commands::Add {
            name,
            opts,
            since,
            json,
        } => cmd_add(&tracker, &name, opts, since, json),
        Commands::Edit {
            habit_id,
            name,
            opts,
            no_reminder,
            json,
        } => cmd_edit(&tracker, habit_id, name, opts, no_reminder, json),
        Commands::Archive { habit_id, json } => cmd_archive(&tracker, habit_id, json),
        Commands::Restore { habit_id, json } => cmd_restore(&tracker, habit_id, json),
        Commands::Remove { habit_id, json } => cmd_remove(&tracker, habit_id, json),
        Commands::List { date, all, json } => cmd_list(&tracker, date, all, json),
        Commands::Toggle {
            habit_id,
            date,
            json,
        } => cmd_toggle(&tracker, habit_id, date, json),
        Commands::Inc {
            habit_id,
            date,
            json,
        } => cmd_inc(&tracker, habit_id, date, json),
        Commands::Dec {
            habit_id,
            date,
            json,
        } => cmd_dec(&tracker, habit_id, date, json),
        Commands::Time {
            habit_id,
            minutes,
            date,
            notes,
            json,
        } => cmd_time(&tracker, habit_id, minutes, date, notes.as_deref(), json),
        Commands::Log { habit_id, json } => cmd_log(&tracker, habit_id, json),
        Commands::Stats { date, json } => cmd_stats(&tracker, date, json),
        Commands::History { days, json } => cmd_history(&tracker, days, json),
    }
}
