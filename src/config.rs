use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use tracing::{info, warn};

use crate::error::{Result, RosterError};

const DEFAULT_PORT: &str = "8080";
const DEFAULT_PASSWORD: &str = "admin123";
const DEFAULT_MEMBERS_CSV: &str = "data/members.csv";

/// Runtime settings read from the environment
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub admin_password: String,
    pub members_csv: PathBuf,
    /// Fixed shuffle seed; entropy is used when unset
    pub seed: Option<u64>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let admin_password = var("ADMIN_PASSWORD").unwrap_or_else(|_| {
            warn!("ADMIN_PASSWORD not set, using the default password, change this!");
            DEFAULT_PASSWORD.to_string()
        });

        Ok(Self {
            port: try_load("ROSTER_PORT", DEFAULT_PORT)?,
            admin_password,
            members_csv: try_load("ROSTER_MEMBERS_CSV", DEFAULT_MEMBERS_CSV)?,
            seed: var("ROSTER_SEED").ok().map(|s| parse("ROSTER_SEED", &s)).transpose()?,
        })
    }
}

fn var(key: &str) -> std::result::Result<String, env::VarError> {
    env::var(key)
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| RosterError::Config(format!("Invalid {key} value '{value}': {e}")))
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    let value = var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    parse(key, &value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_reports_the_offending_key() {
        let err = parse::<u16>("ROSTER_PORT", "eighty").unwrap_err();
        assert!(err.to_string().contains("ROSTER_PORT"));
        assert_eq!(parse::<u64>("ROSTER_SEED", " 42 ").unwrap(), 42);
    }

    #[test]
    fn try_load_falls_back_to_default() {
        let port: u16 = try_load("ROSTER_TEST_UNSET_PORT", "9090").unwrap();
        assert_eq!(port, 9090);
    }
}
