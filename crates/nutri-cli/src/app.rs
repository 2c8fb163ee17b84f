//! Wiring and command handlers.

use std::sync::Arc;

use anyhow::{bail, Context};
use auth_session::{
    AuthFlowController, AuthStateChangedPayload, FlowError, GuardOutcome, Route, RouteGuard,
    Router, Session, SessionManager, TokenClaims,
};
use chrono::{DateTime, Local, NaiveDate, Utc};
use client_config_and_utils::{Config, Paths};
use client_storage::FileStorage;
use meal_reminder_scheduler::{
    LogNotifier, Notifier, Reminder, ReminderConfig, ReminderScheduler, SystemClock,
};
use nutrition_api_client::models::{FoodLogRequest, ProfileUpdate, WaterLogRequest};
use nutrition_api_client::{ApiClient, ApiClientConfig, StoredTokenProvider};
use tracing::{info, warn};

use crate::{
    AccountCommands, Commands, FoodCommands, ProfileCommands, ProgressCommands, WaterCommands,
};

/// Everything a command needs, built once per invocation.
pub struct App {
    api: ApiClient,
    sessions: Arc<SessionManager>,
    flows: AuthFlowController,
    guard: RouteGuard,
    oauth_authorize_url: String,
    reminders: ReminderConfig,
}

impl App {
    pub fn build(config: &Config, paths: &Paths) -> anyhow::Result<Self> {
        let storage = Arc::new(FileStorage::new(paths.storage_file()));
        let sessions = Arc::new(SessionManager::new(storage.clone(), Router::default()));
        sessions.set_state_callback(Box::new(|payload: AuthStateChangedPayload| {
            info!(
                state = ?payload.state,
                user_id = ?payload.user_id,
                "Auth state changed"
            );
        }));

        let api = ApiClient::new(
            ApiClientConfig {
                base_url: config.api_base_url()?,
                timeout: config.request_timeout(),
            },
            Arc::new(StoredTokenProvider::new(storage)),
            sessions.clone(),
        )
        .context("Failed to build HTTP client")?;

        Ok(Self {
            flows: AuthFlowController::new(api.clone(), sessions.clone()),
            guard: RouteGuard::new(sessions.clone()),
            api,
            sessions,
            oauth_authorize_url: config.oauth_authorize_url.clone(),
            reminders: ReminderConfig {
                interval: config.reminders.interval(),
                lunch_hour: config.reminders.lunch_hour,
            },
        })
    }

    pub fn initialize(&self) -> anyhow::Result<()> {
        let state = self.sessions.initialize()?;
        info!(state = ?state, "Session initialized");
        Ok(())
    }

    pub fn print_route(&self) {
        println!("→ {}", self.sessions.router().current());
    }

    pub async fn run(&self, command: Commands) -> anyhow::Result<()> {
        match command {
            Commands::Login { email, password } => {
                let session = self
                    .flows
                    .credential_login(&email, &password)
                    .await
                    .map_err(flow_error)?;
                print_session(&session);
            }
            Commands::Register {
                name,
                email,
                password,
            } => {
                let session = self
                    .flows
                    .register(&name, &email, &password)
                    .await
                    .map_err(flow_error)?;
                print_session(&session);
            }
            Commands::OauthCallback { token } => self.oauth_callback(token).await?,
            Commands::OauthExchange { credential } => {
                let session = self
                    .flows
                    .exchange_oauth_credential(&credential)
                    .await
                    .map_err(flow_error)?;
                print_session(&session);
            }
            Commands::OauthUrl => println!("{}", self.oauth_authorize_url),
            Commands::Logout => {
                self.sessions.logout()?;
                println!("Logged out");
            }
            Commands::Status => self.status(),
            Commands::Open { path } => self.open(&path).await?,
            Commands::Profile { command } => self.profile(command).await?,
            Commands::Account { command } => self.account(command).await?,
            Commands::Progress { command } => self.progress(command).await?,
            Commands::Food { command } => self.food(command).await?,
            Commands::Water { command } => self.water(command).await?,
            Commands::Reminders => self.run_reminders().await?,
        }
        Ok(())
    }

    async fn oauth_callback(&self, token: Option<String>) -> anyhow::Result<()> {
        let session = self
            .flows
            .complete_oauth_redirect(token.as_deref())
            .await
            .map_err(flow_error)?;
        print_session(&session);
        Ok(())
    }

    fn status(&self) {
        let state = self.sessions.state();
        println!("State: {:?}", state);

        let Some(session) = self.sessions.current() else {
            println!("Not logged in");
            return;
        };
        print_session(&session);

        if let Some(exp) = TokenClaims::decode(&session.token)
            .ok()
            .and_then(|claims| claims.expires_at())
            .and_then(|exp| DateTime::<Utc>::from_timestamp(exp, 0))
        {
            println!("Token expires: {}", exp.with_timezone(&Local));
        }
    }

    /// Visit `path` the way the shell would: the OAuth return path completes
    /// the login, everything else goes through the route guard.
    async fn open(&self, path: &str) -> anyhow::Result<()> {
        match Route::parse(path) {
            Route::AuthCallback { token } => self.oauth_callback(token).await,
            route => {
                match self.guard.open(route) {
                    GuardOutcome::Admit(route) => println!("Admitted: {}", route),
                    GuardOutcome::Redirect(route) => println!("Redirected: {}", route),
                    GuardOutcome::Pending => println!("Loading..."),
                }
                Ok(())
            }
        }
    }

    /// Pass the guard for `route` and return the admitted session.
    fn require(&self, route: Route) -> anyhow::Result<Session> {
        match self.guard.open(route) {
            GuardOutcome::Admit(_) => self
                .sessions
                .current()
                .context("Session ended while opening view"),
            GuardOutcome::Redirect(_) => bail!("Not logged in"),
            GuardOutcome::Pending => bail!("Session is still loading"),
        }
    }

    async fn profile(&self, command: ProfileCommands) -> anyhow::Result<()> {
        match command {
            ProfileCommands::Complete {
                age,
                weight,
                height,
                health_goal,
                diet_preference,
            } => {
                self.require(Route::ProfileComplete)?;
                let profile = ProfileUpdate {
                    age,
                    weight,
                    height,
                    health_goal,
                    diet_preference,
                };
                self.flows
                    .complete_profile(&profile)
                    .await
                    .map_err(flow_error)?;
                println!("Profile saved");
            }
        }
        Ok(())
    }

    async fn account(&self, command: AccountCommands) -> anyhow::Result<()> {
        match command {
            AccountCommands::Delete => {
                self.require(Route::Dashboard)?;
                self.flows.delete_account().await.map_err(flow_error)?;
                println!("Account deleted");
            }
        }
        Ok(())
    }

    async fn progress(&self, command: ProgressCommands) -> anyhow::Result<()> {
        let session = self.require(Route::Dashboard)?;
        let value = match command {
            ProgressCommands::Daily { date } => {
                let progress = self
                    .api
                    .daily_progress(&session.id, date.unwrap_or_else(today))
                    .await?;
                serde_json::to_value(progress)?
            }
            ProgressCommands::Weekly { date } => {
                let progress = self
                    .api
                    .weekly_progress(&session.id, date.unwrap_or_else(today))
                    .await?;
                serde_json::to_value(progress)?
            }
        };
        println!("{}", serde_json::to_string_pretty(&value)?);
        Ok(())
    }

    async fn food(&self, command: FoodCommands) -> anyhow::Result<()> {
        let session = self.require(Route::Dashboard)?;
        match command {
            FoodCommands::Add {
                meal_type,
                food_name,
                calories,
                date,
            } => {
                let request = FoodLogRequest {
                    meal_type,
                    food_name,
                    calories,
                    date: date.unwrap_or_else(today),
                };
                let response = self.api.log_food(&session.id, &request).await?;
                print_log_result(response.message, response.warning, "Food logged");
            }
            FoodCommands::Delete { log_id } => {
                self.api.delete_food_log(&session.id, &log_id).await?;
                println!("Food log deleted");
            }
        }
        Ok(())
    }

    async fn water(&self, command: WaterCommands) -> anyhow::Result<()> {
        let session = self.require(Route::Dashboard)?;
        match command {
            WaterCommands::Add { glasses, date } => {
                let request = WaterLogRequest {
                    glasses,
                    date: date.unwrap_or_else(today),
                };
                let response = self.api.log_water(&session.id, &request).await?;
                print_log_result(response.message, response.warning, "Water logged");
            }
        }
        Ok(())
    }

    async fn run_reminders(&self) -> anyhow::Result<()> {
        let handle = ReminderScheduler::start(
            self.reminders.clone(),
            Arc::new(SystemClock),
            Arc::new(StdoutNotifier),
        );
        println!("Reminders running, press Ctrl-C to stop");

        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for Ctrl-C")?;
        handle.shutdown();
        Ok(())
    }
}

struct StdoutNotifier;

impl Notifier for StdoutNotifier {
    fn notify(&self, reminder: Reminder) {
        LogNotifier.notify(reminder);
        println!("🔔 {}", reminder);
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn flow_error(e: FlowError) -> anyhow::Error {
    if e.source.is_transient() {
        warn!(error = %e.source, "Service unavailable, retry later");
    }
    anyhow::Error::new(e)
}

fn print_session(session: &Session) {
    println!("User: {} <{}> (id {})", session.name, session.email, session.id);
    println!(
        "Profile: {}",
        if session.profile_completed {
            "complete"
        } else {
            "incomplete"
        }
    );
}

fn print_log_result(message: Option<String>, warning: Option<String>, fallback: &str) {
    println!("{}", message.as_deref().unwrap_or(fallback));
    if let Some(warning) = warning {
        println!("Warning: {}", warning);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use client_storage::{StorageKeys, TokenStorage};
    use tempfile::tempdir;

    fn app(paths: &Paths) -> App {
        App::build(&Config::default(), paths).unwrap()
    }

    #[tokio::test]
    async fn protected_paths_redirect_without_session() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());
        let app = app(&paths);
        app.initialize().unwrap();

        app.open("/dashboard").await.unwrap();
        assert_eq!(app.sessions.router().current(), Route::login());

        assert!(app.require(Route::Dashboard).is_err());
    }

    #[tokio::test]
    async fn callback_path_without_token_reports_error() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());
        let app = app(&paths);
        app.initialize().unwrap();

        let err = app.open("/auth/callback").await.unwrap_err();

        assert_eq!(err.to_string(), "No token provided");
        assert_eq!(
            app.sessions.router().current().to_path(),
            "/login?error=No%20token%20provided"
        );
    }

    #[test]
    fn unreadable_stored_token_is_purged_on_startup() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());
        let storage = FileStorage::new(paths.storage_file());
        storage.set(StorageKeys::TOKEN, "not-a-jwt").unwrap();

        let app = app(&paths);
        app.initialize().unwrap();

        assert!(app.sessions.current().is_none());
        assert!(!storage.has(StorageKeys::TOKEN).unwrap());
    }
    #[tokio::test]
    async fn corrupt_storage_file_does_not_block_commands() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());
        std::fs::write(paths.storage_file(), "{not json").unwrap();

        let app = app(&paths);
        app.initialize().unwrap();
        app.run(Commands::Logout).await.unwrap();

        let storage = FileStorage::new(paths.storage_file());
        assert_eq!(storage.get(StorageKeys::TOKEN).unwrap(), None);
    }
}
