use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};
use tracing::Level;

use fittrack::ai::{AiClient, WorkoutRequest};
use fittrack::config::AppConfig;
use fittrack::dates::format_long;
use fittrack::error::FitTrackError;
use fittrack::goals::{GoalState, ProgressOutcome};
use fittrack::logging::init_logging;
use fittrack::models::{
    CompletedGoal, ExerciseDraft, Goal, GoalDraft, Workout, WorkoutDraft, WorkoutType,
    GOAL_CATEGORIES,
};
use fittrack::storage::{MemoryStorage, SqliteStorage, Storage, Store};
use fittrack::tracker::{Insights, Tracker};
use fittrack::workouts::{SortKey, SortOrder, WorkoutQuery};

/// fittrack - Workout and goal tracking CLI
///
/// Plan and log workouts, track goals to completion and get AI-generated
/// workouts and training recommendations.
#[derive(Parser)]
#[command(name = "fittrack")]
#[command(version)]
#[command(about = "Workout and goal tracking CLI", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Database file (overrides the configured path)
    #[arg(long, value_name = "FILE", global = true)]
    data: Option<PathBuf>,

    /// Keep everything in memory for this invocation
    #[arg(long, global = true)]
    ephemeral: bool,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage planned workouts
    Workout {
        #[command(subcommand)]
        action: WorkoutCommand,
    },

    /// Browse the completed-workout log
    Log {
        #[command(subcommand)]
        action: LogCommand,
    },

    /// Manage fitness goals
    Goal {
        #[command(subcommand)]
        action: GoalCommand,
    },

    /// Summary, recent activity, upcoming deadlines and recommendations
    Dashboard {
        /// Ignore cached recommendations
        #[arg(long)]
        refresh: bool,
    },

    /// Configure application settings
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
}

#[derive(Subcommand)]
enum WorkoutCommand {
    /// Plan a new workout
    Add {
        /// Cardio, Strength or Flexibility
        #[arg(short = 't', long = "type")]
        workout_type: WorkoutType,

        /// Workout date (YYYY-MM-DD, default today)
        #[arg(short, long)]
        date: Option<NaiveDate>,

        /// NAME:MINUTES, or NAME:MINUTES:REPS@WEIGHT,... for strength (one entry per set)
        #[arg(short, long = "exercise", required = true)]
        exercises: Vec<ExerciseDraft>,
    },

    /// List planned workouts
    List(ListArgs),

    /// Show one workout with its exercises
    Show { id: String },

    /// Remove a planned workout
    Remove { id: String },

    /// Log a planned workout as done today
    Complete { id: String },

    /// Generate a workout with the AI service
    Suggest(SuggestArgs),
}

#[derive(Subcommand)]
enum LogCommand {
    /// List completed workouts
    List(ListArgs),

    /// Remove a workout from the log
    Remove { id: String },
}

#[derive(Subcommand)]
enum GoalCommand {
    /// Create a goal
    Add {
        /// Category, e.g. Weight Loss, Endurance or Strength
        #[arg(short = 't', long = "type")]
        goal_type: String,

        #[arg(long)]
        target: String,

        /// YYYY-MM-DD, must be after today
        #[arg(long)]
        deadline: NaiveDate,

        #[arg(short, long)]
        motivation: Option<String>,
    },

    /// List active and completed goals
    List,

    /// Add 10% progress, or set an exact value with --set
    Progress {
        id: String,

        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        set: Option<u8>,
    },

    /// Mark a goal complete
    Complete { id: String },

    /// Reopen a completed goal with a fresh 30-day deadline
    Reattempt { id: String },

    /// Delete an active or completed goal
    Delete { id: String },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration
    Show,
}

#[derive(Args)]
struct ListArgs {
    /// Match against the type or the date
    #[arg(short, long, default_value = "")]
    search: String,

    #[arg(short = 't', long = "type")]
    workout_type: Option<WorkoutType>,

    /// date or duration
    #[arg(long, default_value = "date")]
    sort: SortKey,

    /// Ascending order (default newest/longest first)
    #[arg(long)]
    asc: bool,
}

impl ListArgs {
    fn query(&self) -> WorkoutQuery {
        WorkoutQuery {
            search: self.search.clone(),
            type_filter: self.workout_type,
            sort_by: self.sort,
            order: if self.asc { SortOrder::Asc } else { SortOrder::Desc },
        }
    }
}

#[derive(Args)]
struct SuggestArgs {
    #[arg(short = 't', long = "type")]
    workout_type: WorkoutType,

    /// Minutes (5-180)
    #[arg(short, long)]
    duration: u32,

    /// Number of exercises (1-20)
    #[arg(short, long)]
    exercises: u32,

    #[arg(long, default_value = "")]
    preferred: String,

    #[arg(long, default_value = "gym")]
    environment: String,

    #[arg(long)]
    muscle_groups: Option<String>,

    #[arg(long)]
    cardio_method: Option<String>,

    /// Add the generated workout to the planned list
    #[arg(long)]
    save: bool,
}

impl From<&SuggestArgs> for WorkoutRequest {
    fn from(args: &SuggestArgs) -> Self {
        WorkoutRequest {
            workout_type: args.workout_type,
            muscle_groups: args.muscle_groups.clone(),
            cardio_method: args.cardio_method.clone(),
            preferred_exercises: args.preferred.clone(),
            environment: args.environment.clone(),
            number_of_exercises: args.exercises,
            duration: args.duration,
        }
    }
}

#[derive(Tabled)]
struct WorkoutRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Type")]
    workout_type: String,
    #[tabled(rename = "Minutes")]
    duration: u32,
    #[tabled(rename = "Exercises")]
    exercises: String,
}

impl From<&Workout> for WorkoutRow {
    fn from(w: &Workout) -> Self {
        WorkoutRow {
            id: w.id.clone(),
            date: w.date.to_string(),
            workout_type: w.workout_type.to_string(),
            duration: w.duration,
            exercises: w
                .exercises
                .iter()
                .map(|e| e.name().to_string())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

#[derive(Tabled)]
struct GoalRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Type")]
    goal_type: String,
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "Deadline")]
    deadline: String,
    #[tabled(rename = "Progress")]
    progress: String,
}

impl From<&Goal> for GoalRow {
    fn from(g: &Goal) -> Self {
        GoalRow {
            id: g.id.clone(),
            goal_type: g.goal_type.clone(),
            target: g.target.clone(),
            deadline: format_long(g.deadline),
            progress: format!("{}%", g.progress),
        }
    }
}

#[derive(Tabled)]
struct CompletedGoalRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Type")]
    goal_type: String,
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "Completed")]
    completed: String,
}

impl From<&CompletedGoal> for CompletedGoalRow {
    fn from(g: &CompletedGoal) -> Self {
        CompletedGoalRow {
            id: g.id.clone(),
            goal_type: g.goal_type.clone(),
            target: g.target.clone(),
            completed: format_long(g.completed_date),
        }
    }
}

#[derive(Tabled)]
struct SetRow {
    #[tabled(rename = "Set")]
    set: u32,
    #[tabled(rename = "Reps")]
    reps: u32,
    #[tabled(rename = "Weight (kg)")]
    weight: f64,
}

type DynTracker = Tracker<Box<dyn Storage>>;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        report(&err);
        std::process::exit(1);
    }
}

fn report(err: &anyhow::Error) {
    match err.downcast_ref::<FitTrackError>() {
        Some(e) => {
            let level = e.severity().to_tracing_level();
            if level == Level::ERROR {
                tracing::error!(error = %e, retryable = e.is_retryable(), "Action failed");
            } else if level == Level::WARN {
                tracing::warn!(error = %e, retryable = e.is_retryable(), "Action failed");
            } else {
                tracing::info!(error = %e, "Action failed");
            }
            eprintln!("{} {}", "✗".red(), e.user_message().red());
        }
        None => eprintln!("{} {:#}", "✗".red(), err),
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(AppConfig::default_config_path);
    let config = AppConfig::load_or_default(&config_path)?;

    let mut log_config = config.logging.clone();
    log_config.level = log_config.level.raised_by(cli.verbose);
    init_logging(&log_config)?;

    if let Commands::Config { action } = &cli.command {
        return run_config(action, config, &config_path);
    }

    let mut tracker = open_tracker(&cli, &config)?;
    let today = Local::now().date_naive();

    match cli.command {
        Commands::Workout { action } => run_workout(action, &mut tracker, &config, today).await,
        Commands::Log { action } => run_log(action, &mut tracker),
        Commands::Goal { action } => run_goal(action, &mut tracker, today),
        Commands::Dashboard { refresh } => run_dashboard(&mut tracker, &config, today, refresh).await,
        Commands::Config { .. } => Ok(()),
    }
}

fn open_tracker(cli: &Cli, config: &AppConfig) -> Result<DynTracker> {
    let backend: Box<dyn Storage> = if cli.ephemeral {
        Box::new(MemoryStorage::new())
    } else {
        let path = cli
            .data
            .clone()
            .unwrap_or_else(|| config.storage.database_path.clone());
        Box::new(
            SqliteStorage::open(&path)
                .map_err(FitTrackError::from)
                .with_context(|| format!("Failed to open database: {}", path.display()))?,
        )
    };

    let store = Store::new(backend).with_recommendation_ttl(config.insights.cache_ttl());
    Ok(Tracker::open(store, config.storage.persistence_policy)?)
}

async fn run_workout(
    action: WorkoutCommand,
    tracker: &mut DynTracker,
    config: &AppConfig,
    today: NaiveDate,
) -> Result<()> {
    match action {
        WorkoutCommand::Add {
            workout_type,
            date,
            exercises,
        } => {
            let draft = WorkoutDraft {
                date: date.unwrap_or(today),
                workout_type,
                exercises,
            };
            let workout = tracker.add_workout(draft, today)?;
            println!("{} Workout added: {}", "✓".green(), workout.id.bold());
        }

        WorkoutCommand::List(args) => print_workouts(&tracker.planned(&args.query()), "planned workouts"),

        WorkoutCommand::Show { id } => {
            let Some(workout) = tracker.workouts().get(&id) else {
                return Err(FitTrackError::WorkoutNotFound(id).into());
            };
            print_workout_detail(workout);
        }

        WorkoutCommand::Remove { id } => {
            tracker.remove_workout(&id)?;
            println!("{} Workout removed", "✓".green());
        }

        WorkoutCommand::Complete { id } => {
            let logged = tracker.complete_workout(&id, today)?;
            println!(
                "{} Workout logged for {} ({} minutes)",
                "✓".green(),
                format_long(logged.date),
                logged.duration
            );
        }

        WorkoutCommand::Suggest(args) => {
            let request = WorkoutRequest::from(&args);
            request.validate().map_err(FitTrackError::from)?;
            let client = AiClient::from_settings(&config.ai)?;

            println!("{}", "Generating workout...".cyan());
            let workout = client.generate_workout(&request, today).await?;
            print_workout_detail(&workout);

            if args.save {
                tracker.plan_workout(workout.clone())?;
                println!("{} Saved as {}", "✓".green(), workout.id.bold());
            }
        }
    }
    Ok(())
}

fn run_log(action: LogCommand, tracker: &mut DynTracker) -> Result<()> {
    match action {
        LogCommand::List(args) => print_workouts(&tracker.log(&args.query()), "completed workouts"),
        LogCommand::Remove { id } => {
            tracker.remove_logged(&id)?;
            println!("{} Workout removed from log", "✓".green());
        }
    }
    Ok(())
}

fn run_goal(action: GoalCommand, tracker: &mut DynTracker, today: NaiveDate) -> Result<()> {
    match action {
        GoalCommand::Add {
            goal_type,
            target,
            deadline,
            motivation,
        } => {
            if !GOAL_CATEGORIES.contains(&goal_type.as_str()) {
                tracing::debug!(%goal_type, "Custom goal category");
            }
            let goal = tracker.add_goal(
                GoalDraft {
                    goal_type,
                    target,
                    deadline,
                    motivation,
                },
                today,
            )?;
            println!("{} Goal created: {}", "✓".green(), goal.id.bold());
        }

        GoalCommand::List => {
            let goals = tracker.goals();
            println!("{}", "Active goals".bold());
            if goals.active.is_empty() {
                println!("  {}", "No active goals".dimmed());
            } else {
                let rows: Vec<GoalRow> = goals.active.iter().map(GoalRow::from).collect();
                println!("{}", Table::new(rows).with(Style::rounded()));
            }

            println!("{}", "Completed goals".bold());
            if goals.completed.is_empty() {
                println!("  {}", "No completed goals".dimmed());
            } else {
                let rows: Vec<CompletedGoalRow> =
                    goals.completed.iter().map(CompletedGoalRow::from).collect();
                println!("{}", Table::new(rows).with(Style::rounded()));
            }
        }

        GoalCommand::Progress { id, set } => {
            let outcome = match set {
                Some(value) => tracker.set_goal_progress(&id, value, today)?,
                None => tracker.increment_goal_progress(&id, today)?,
            };
            match outcome {
                ProgressOutcome::Updated(goal) => {
                    println!("{} Progress: {}%", "✓".green(), goal.progress)
                }
                ProgressOutcome::Completed(goal) => {
                    println!("{} Goal completed: {}", "✓".green().bold(), goal.target)
                }
            }
        }

        GoalCommand::Complete { id } => {
            let goal = tracker.complete_goal(&id, today)?;
            println!("{} Goal completed: {}", "✓".green().bold(), goal.target);
        }

        GoalCommand::Reattempt { id } => {
            let goal = tracker.reattempt_goal(&id, Utc::now())?;
            println!(
                "{} Goal reopened, new deadline {}",
                "✓".green(),
                format_long(goal.deadline)
            );
        }

        GoalCommand::Delete { id } => {
            let label = match tracker.delete_goal(&id)? {
                GoalState::Active => "Active",
                GoalState::Completed => "Completed",
            };
            println!("{} {} goal deleted", "✓".green(), label);
        }
    }
    Ok(())
}

async fn run_dashboard(
    tracker: &mut DynTracker,
    config: &AppConfig,
    today: NaiveDate,
    refresh: bool,
) -> Result<()> {
    let summary = tracker.summary();

    println!("{}", "Summary".bold().underline());
    for (label, value) in summary.display_rows() {
        println!("  {:<22}{}", format!("{}:", label), value);
    }
    println!();

    println!("{}", "Average duration by type (last 30 days)".bold().underline());
    let by_type = tracker.duration_by_type_recent(today);
    if by_type.is_empty() {
        println!("  {}", "No workouts logged in the last 30 days".dimmed());
    }
    for (workout_type, minutes) in by_type {
        let bar = "█".repeat((minutes / 5.0).round() as usize);
        println!("  {:<12} {} {:.0} min", workout_type.as_str(), bar.cyan(), minutes);
    }
    println!();

    println!("{}", "Upcoming milestones".bold().underline());
    let milestones = tracker.milestones(Utc::now());
    if milestones.is_empty() {
        println!("  {}", "No upcoming deadlines".dimmed());
    }
    for m in milestones {
        let days = format!("{} days", m.days_remaining);
        let days = if m.is_urgent() { days.red().bold() } else { days.normal() };
        println!("  {} ({}): {}", m.goal.target, format_long(m.goal.deadline), days);
    }
    println!();

    println!("{}", "Recommendations".bold().underline());
    let now = Utc::now();
    let insights = tracker
        .insights(|| AiClient::from_settings(&config.ai), now, refresh)
        .await;
    match insights {
        Ok(Insights::NoHistory) => {
            println!("  {}", "Complete a workout to get recommendations".dimmed())
        }
        Ok(found) => {
            for (i, rec) in found.recommendations().iter().enumerate() {
                println!("  {}. {}", i + 1, rec);
            }
            if matches!(found, Insights::Cached(_)) {
                println!("  {}", "(cached, use --refresh to regenerate)".dimmed());
            }
        }
        // the rest of the dashboard is still useful without recommendations
        Err(e) => println!("  {}", e.user_message().yellow()),
    }

    Ok(())
}

fn run_config(action: &ConfigCommand, mut config: AppConfig, path: &Path) -> Result<()> {
    match action {
        ConfigCommand::Init { force } => {
            if path.exists() && !force {
                bail!(
                    "Config file already exists: {} (use --force to overwrite)",
                    path.display()
                );
            }
            config.save_to_file(path)?;
            println!("{} Config written to {}", "✓".green(), path.display());
        }
        ConfigCommand::Show => {
            println!("{}", format!("# {}", path.display()).dimmed());
            print!("{}", toml::to_string_pretty(&config)?);
        }
    }
    Ok(())
}

fn print_workouts(workouts: &[Workout], what: &str) {
    if workouts.is_empty() {
        println!("{}", format!("No {}", what).dimmed());
        return;
    }
    let rows: Vec<WorkoutRow> = workouts.iter().map(WorkoutRow::from).collect();
    println!("{}", Table::new(rows).with(Style::rounded()));
}

fn print_workout_detail(workout: &Workout) {
    println!(
        "{} {} on {} ({} min)",
        workout.workout_type.as_str().bold(),
        "workout".bold(),
        format_long(workout.date),
        workout.duration
    );
    println!("  {}", workout.id.dimmed());
    for exercise in &workout.exercises {
        println!("  • {} - {} min", exercise.name().bold(), exercise.duration());
        let sets: Vec<SetRow> = exercise
            .set_entries()
            .into_iter()
            .map(|s| SetRow {
                set: s.set,
                reps: s.reps,
                weight: s.weight,
            })
            .collect();
        if !sets.is_empty() {
            println!("{}", Table::new(sets).with(Style::rounded()));
        }
    }
}
