use crate::{ServerError, ServerResult};
use std::env;

pub const DEFAULT_DATABASE_URL: &str = "sqlite:aideas.db?mode=rwc";
pub const DEFAULT_PORT: u16 = 4000;
pub const DEFAULT_APP_URL: &str = "http://localhost:3000";

/// Settings read from the environment at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// `DATABASE_URL`
    pub database_url: String,
    /// `PORT`
    pub port: u16,
    /// `APP_URL`, the only origin allowed to call the API from a browser.
    pub app_url: String,
}

impl ServerConfig {
    pub fn from_env() -> ServerResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ServerResult<Self> {
        let port = match lookup("PORT") {
            Some(port) => port
                .parse()
                .map_err(|_| ServerError::Config(format!("PORT is not a valid port: {port}")))?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            port,
            app_url: lookup("APP_URL").unwrap_or_else(|| DEFAULT_APP_URL.to_string()),
        })
    }
}
