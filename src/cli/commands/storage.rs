use clap::{Arg, ArgAction, ArgMatches, Command};
use secrecy::SecretString;
use std::time::Duration;

pub const ARG_MONGO_URI: &str = "mongo-uri";
pub const ARG_DATABASE: &str = "database";
pub const ARG_MONGO_TIMEOUT: &str = "mongo-timeout";
pub const ARG_IN_MEMORY: &str = "in-memory";

/// Where users, logs and CVEs are kept.
#[derive(Debug, Clone)]
pub enum Options {
    Mongo {
        uri: SecretString,
        database: String,
        timeout: Duration,
    },
    Memory,
}

impl Options {
    /// Parse storage arguments from matches.
    ///
    /// # Errors
    /// Returns an error if `--mongo-uri` is missing or empty without `--in-memory`.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        if matches.get_flag(ARG_IN_MEMORY) {
            return Ok(Self::Memory);
        }

        let uri = match matches.get_one::<String>(ARG_MONGO_URI) {
            Some(value) if !value.trim().is_empty() => SecretString::from(value.trim().to_string()),
            _ => anyhow::bail!("missing required argument: --{ARG_MONGO_URI}"),
        };

        let database = matches
            .get_one::<String>(ARG_DATABASE)
            .cloned()
            .unwrap_or_else(|| "RedRecon".to_string());

        let timeout = Duration::from_secs(
            matches
                .get_one::<u64>(ARG_MONGO_TIMEOUT)
                .copied()
                .unwrap_or(5),
        );

        Ok(Self::Mongo {
            uri,
            database,
            timeout,
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_MONGO_URI)
                .short('m')
                .long(ARG_MONGO_URI)
                .help("MongoDB connection string")
                .env("REDRECON_MONGO_URI")
                .hide_env_values(true)
                .required_unless_present(ARG_IN_MEMORY),
        )
        .arg(
            Arg::new(ARG_DATABASE)
                .long(ARG_DATABASE)
                .help("MongoDB database name")
                .env("REDRECON_DATABASE")
                .default_value("RedRecon"),
        )
        .arg(
            Arg::new(ARG_MONGO_TIMEOUT)
                .long(ARG_MONGO_TIMEOUT)
                .help("Seconds to wait for MongoDB server selection and connect")
                .env("REDRECON_MONGO_TIMEOUT")
                .default_value("5")
                .value_parser(clap::value_parser!(u64).range(1..=120)),
        )
        .arg(
            Arg::new(ARG_IN_MEMORY)
                .long(ARG_IN_MEMORY)
                .help("Keep users, logs and CVEs in process memory instead of MongoDB")
                .env("REDRECON_IN_MEMORY")
                .action(ArgAction::SetTrue),
        )
}
