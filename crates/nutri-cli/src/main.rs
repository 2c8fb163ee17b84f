//! Nutri - command-line client for the nutrition tracking service.

mod app;

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use client_config_and_utils::{init_logging, Config, Paths};
use nutrition_api_client::models::{DietPreference, HealthGoal, MealType};

/// Nutri command-line interface.
#[derive(Parser)]
#[command(name = "nutri")]
#[command(about = "Track meals, water and progress against your nutrition goals")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error). Defaults to the configured level
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Base directory for config, storage and logs. Defaults to ~/.nutri
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in with email and password
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Create an account and log in
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Finish an OAuth redirect using the token from the callback URL
    OauthCallback {
        #[arg(long)]
        token: Option<String>,
    },
    /// Exchange an identity provider credential for a session
    OauthExchange {
        #[arg(long)]
        credential: String,
    },
    /// Print the URL that starts the OAuth login
    OauthUrl,
    /// Log out and forget the stored token
    Logout,
    /// Show the current session
    Status,
    /// Navigate to a path, applying the route guard
    Open { path: String },
    /// Health profile
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },
    /// Account management
    Account {
        #[command(subcommand)]
        command: AccountCommands,
    },
    /// Calorie and water progress
    Progress {
        #[command(subcommand)]
        command: ProgressCommands,
    },
    /// Food log
    Food {
        #[command(subcommand)]
        command: FoodCommands,
    },
    /// Water log
    Water {
        #[command(subcommand)]
        command: WaterCommands,
    },
    /// Run meal and hydration reminders until interrupted
    Reminders,
}

#[derive(Subcommand)]
enum ProfileCommands {
    /// Save the health profile and finish onboarding
    Complete {
        #[arg(long)]
        age: u32,
        /// Weight in kg
        #[arg(long)]
        weight: f64,
        /// Height in cm
        #[arg(long)]
        height: f64,
        /// weight_loss, muscle_gain or maintenance
        #[arg(long)]
        health_goal: HealthGoal,
        /// vegan, keto, vegetarian or omnivore
        #[arg(long)]
        diet_preference: DietPreference,
    },
}

#[derive(Subcommand)]
enum AccountCommands {
    /// Permanently delete the account
    Delete,
}

#[derive(Subcommand)]
enum ProgressCommands {
    /// Progress for one day (defaults to today)
    Daily {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Progress for the week starting at a date (defaults to today)
    Weekly {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

#[derive(Subcommand)]
enum FoodCommands {
    /// Log a meal
    Add {
        /// breakfast, lunch, dinner or snack
        #[arg(long)]
        meal_type: MealType,
        #[arg(long)]
        food_name: String,
        #[arg(long)]
        calories: u32,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Delete a food log entry
    Delete {
        #[arg(long)]
        log_id: String,
    },
}

#[derive(Subcommand)]
enum WaterCommands {
    /// Log glasses of water
    Add {
        #[arg(long)]
        glasses: u32,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let paths = match cli.base_dir {
        Some(base) => Paths::with_base_dir(base),
        None => Paths::new()?,
    };
    paths.ensure_dirs()?;
    let config = Config::load(&paths)?;

    init_logging(
        cli.log_level.as_deref().unwrap_or(&config.log_level),
        &paths,
    );

    let app = app::App::build(&config, &paths)?;
    app.initialize()?;

    let result = app.run(cli.command).await;
    app.print_route();
    result
}
