//! Server configuration, read from `NOCTURNE_*` environment variables.

use std::collections::HashMap;
use std::env;

use anyhow::{Context, bail};
use nocturne_types::Schedule;

pub const DEFAULT_PORT: u16 = 4320;
pub const DEFAULT_DB_PATH: &str = "nocturne.db";
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = 8;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: String,
    /// Timezone the window rules run in, from `NOCTURNE_UTC_OFFSET_HOURS`.
    pub schedule: Schedule,
    /// Development switch that disables every window gate. Never set this
    /// in production; the whole product is the window.
    pub force_open: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load from an explicit variable map, for tests.
    pub fn from_vars(vars: &HashMap<String, String>) -> anyhow::Result<Self> {
        let host = vars
            .get("NOCTURNE_HOST")
            .cloned()
            .unwrap_or_else(|| "0.0.0.0".to_string());

        let port = match vars.get("NOCTURNE_PORT") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("NOCTURNE_PORT is not a port number: '{}'", raw))?,
            None => DEFAULT_PORT,
        };

        let db_path = vars
            .get("NOCTURNE_DB_PATH")
            .cloned()
            .unwrap_or_else(|| DEFAULT_DB_PATH.to_string());

        let offset_hours: i32 = match vars.get("NOCTURNE_UTC_OFFSET_HOURS") {
            Some(raw) => raw.parse().with_context(|| {
                format!(
                    "NOCTURNE_UTC_OFFSET_HOURS is not a whole-hour offset: '{}'",
                    raw
                )
            })?,
            None => DEFAULT_UTC_OFFSET_HOURS,
        };
        let Some(schedule) = Schedule::from_offset_hours(offset_hours) else {
            bail!(
                "NOCTURNE_UTC_OFFSET_HOURS out of range: {}",
                offset_hours
            );
        };

        let force_open = vars
            .get("NOCTURNE_FORCE_OPEN")
            .is_some_and(|v| matches!(v.as_str(), "1" | "true" | "yes"));

        Ok(Self {
            host,
            port,
            db_path,
            schedule,
            force_open,
        })
    }
}
