//! Configuration, filesystem paths, and logging setup for the Nutri client.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{
    Config, ReminderSettings, DEFAULT_API_BASE_URL, DEFAULT_LOG_LEVEL, DEFAULT_OAUTH_AUTHORIZE_URL,
};
pub use error::{CoreError, CoreResult};
pub use logging::{init_logging, parse_level};
pub use paths::Paths;
