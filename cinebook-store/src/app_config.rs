use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub reservations: ReservationRules,
    pub kafka: Option<KafkaConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReservationRules {
    /// Attempts per commit when Postgres reports a serialization failure or deadlock.
    #[serde(default = "default_commit_attempts")]
    pub max_commit_attempts: u32,
}

impl Default for ReservationRules {
    fn default() -> Self {
        Self {
            max_commit_attempts: default_commit_attempts(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct KafkaConfig {
    pub brokers: String,
    #[serde(default = "default_topic")]
    pub topic: String,
}

fn default_max_connections() -> u32 { 5 }
fn default_acquire_timeout() -> u64 { 3 }
fn default_commit_attempts() -> u32 { 3 }
fn default_topic() -> String { "ticket.events".to_string() }

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Untracked local overrides
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. CINEBOOK_DATABASE__URL=postgres://...
            .add_source(config::Environment::with_prefix("CINEBOOK").separator("__"))
            .build()?;

        s.try_deserialize()
    }

    pub fn from_toml(source: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_optional_sections() {
        let config = Config::from_toml(
            r#"
            [database]
            url = "postgres://localhost/cinebook"
            "#,
        )
        .unwrap();

        assert_eq!(config.database.url, "postgres://localhost/cinebook");
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.database.acquire_timeout_secs, 3);
        assert_eq!(config.reservations.max_commit_attempts, 3);
        assert!(config.kafka.is_none());
    }

    #[test]
    fn test_explicit_values() {
        let config = Config::from_toml(
            r#"
            [database]
            url = "postgres://db/cinebook"
            max_connections = 20

            [reservations]
            max_commit_attempts = 5

            [kafka]
            brokers = "kafka:9092"
            "#,
        )
        .unwrap();

        assert_eq!(config.database.max_connections, 20);
        assert_eq!(config.reservations.max_commit_attempts, 5);
        let kafka = config.kafka.unwrap();
        assert_eq!(kafka.brokers, "kafka:9092");
        assert_eq!(kafka.topic, "ticket.events");
    }

    #[test]
    fn test_missing_database_is_an_error() {
        assert!(Config::from_toml("[reservations]\nmax_commit_attempts = 2\n").is_err());
    }

    #[test]
    fn test_shipped_default_file_parses() {
        let config = Config::from_toml(include_str!("../../config/default.toml")).unwrap();
        assert_eq!(config.reservations.max_commit_attempts, 3);
    }
}
