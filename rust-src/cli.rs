//! CLI definitions using clap.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::json;

use watersmart::config::{get_db_path, DEFAULT_PROVIDER};
use watersmart::models::{local_datetime, ISO_FORMAT};
use watersmart::storage::StoredMeasure;
use watersmart::{
    ClientConfig, Credentials, DailyMeasure, ExecutionMode, Facade, HistoryQuery, HistoryStore,
    HourlyMeasure, Provider,
};


/// WaterSmart - fetch and query water usage history
#[derive(Parser)]
#[command(name = "watersmart")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Provider key of a hosted portal
    #[arg(long, global = true, env = "WS_PROVIDER", default_value = DEFAULT_PROVIDER)]
    provider: String,

    /// Root URL of a portal that is not in the built-in list
    #[arg(long, global = true)]
    portal_url: Option<String>,

    /// History database path (default: ~/.watersmart/history.db)
    #[arg(long, global = true, env = "WS_DB")]
    db: Option<PathBuf>,

    /// Run without the history database
    #[arg(long, global = true)]
    no_store: bool,

    /// More logging (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}


#[derive(Subcommand)]
enum Commands {
    /// Log in, download the latest data and store it
    Fetch {
        /// Which dataset to fetch
        #[arg(long, value_enum, default_value_t = MetricChoice::All)]
        metric: MetricChoice,

        /// Blocking runs one request after the other; concurrent fetches both metrics together
        #[arg(long, value_enum, default_value_t = ModeChoice::Blocking)]
        mode: ModeChoice,

        /// Portal login email (falls back to <PREFIX>_USERNAME)
        #[arg(long, env = "WS_USERNAME")]
        username: Option<String>,

        /// Portal password (falls back to <PREFIX>_PASSWORD)
        #[arg(long, env = "WS_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Print stored measures
    History {
        #[arg(value_enum)]
        metric: MetricName,

        /// Earliest timestamp (epoch seconds, inclusive)
        #[arg(long)]
        from: Option<i64>,

        /// Latest timestamp (epoch seconds, inclusive)
        #[arg(long)]
        to: Option<i64>,

        /// Maximum number of rows
        #[arg(short, long)]
        limit: Option<u32>,

        /// Rows to skip
        #[arg(long)]
        offset: Option<u32>,

        /// Newest first
        #[arg(long)]
        desc: bool,
    },

    /// Print the newest stored timestamp
    Last {
        #[arg(value_enum)]
        metric: MetricName,
    },

    /// Show row counts and time ranges of the history database
    Stats,
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum MetricName {
    Daily,
    Hourly,
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum MetricChoice {
    Daily,
    Hourly,
    All,
}


impl MetricChoice {
    fn daily(self) -> bool {
        matches!(self, MetricChoice::Daily | MetricChoice::All)
    }

    fn hourly(self) -> bool {
        matches!(self, MetricChoice::Hourly | MetricChoice::All)
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeChoice {
    Blocking,
    Concurrent,
}


impl From<ModeChoice> for ExecutionMode {
    fn from(mode: ModeChoice) -> Self {
        match mode {
            ModeChoice::Blocking => ExecutionMode::Blocking,
            ModeChoice::Concurrent => ExecutionMode::Concurrent,
        }
    }
}


#[derive(Serialize, Default)]
struct FetchOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    daily: Option<Vec<DailyMeasure>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hourly: Option<Vec<HourlyMeasure>>,
}


/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    watersmart::logging::init(cli.verbose);

    match cli.command {
        Some(Commands::Fetch { metric, mode, username, password }) => {
            let config = client_config(&cli.provider, cli.portal_url.as_deref(), cli.db, cli.no_store)?
                .with_mode(mode.into());
            let credentials = Credentials::resolve(config.provider.env_prefix(), username, password);
            fetch(&config, credentials, metric)?;
        }
        Some(Commands::History { metric, from, to, limit, offset, desc }) => {
            let config = client_config(&cli.provider, cli.portal_url.as_deref(), cli.db, cli.no_store)?;
            let facade = open_client(&config)?;
            let client = facade.client();
            let query = HistoryQuery {
                from_ts: from,
                to_ts: to,
                limit,
                offset,
                ascending: !desc,
            };
            let output = match metric {
                MetricName::Daily => serde_json::to_string_pretty(&client.daily().get_history(&query)?)?,
                MetricName::Hourly => serde_json::to_string_pretty(&client.hourly().get_history(&query)?)?,
            };
            println!("{output}");
        }
        Some(Commands::Last { metric }) => {
            let config = client_config(&cli.provider, cli.portal_url.as_deref(), cli.db, cli.no_store)?;
            let facade = open_client(&config)?;
            let client = facade.client();
            let (name, ts) = match metric {
                MetricName::Daily => ("daily", client.daily().last_timestamp()?),
                MetricName::Hourly => ("hourly", client.hourly().last_timestamp()?),
            };
            let iso_date = ts
                .and_then(local_datetime)
                .map(|dt| dt.format(ISO_FORMAT).to_string());
            println!(
                "{}",
                json!({ "metric": name, "last_timestamp": ts, "iso_date": iso_date })
            );
        }
        Some(Commands::Stats) => {
            let path = cli.db.unwrap_or_else(get_db_path);
            stats(&path)?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
        }
    }

    Ok(())
}


fn client_config(
    provider: &str,
    portal_url: Option<&str>,
    db: Option<PathBuf>,
    no_store: bool,
) -> Result<ClientConfig> {
    let provider = match portal_url {
        Some(url) => Provider::custom(provider, url)?,
        None => Provider::known(provider).with_context(|| {
            let known: Vec<&str> = Provider::known_keys().collect();
            format!("Known providers: {}", known.join(", "))
        })?,
    };

    let mut config = ClientConfig::new(provider);
    if !no_store {
        config = config.with_db_path(db.unwrap_or_else(get_db_path));
    }
    Ok(config)
}


fn open_client(config: &ClientConfig) -> Result<Facade> {
    Facade::from_config(config).with_context(|| match &config.db_path {
        Some(path) => format!("Failed to open history database: {}", path.display()),
        None => "Failed to set up client".to_string(),
    })
}


fn fetch(config: &ClientConfig, credentials: Option<Credentials>, metric: MetricChoice) -> Result<()> {
    let mut facade = open_client(config)?;
    if let Some(credentials) = credentials {
        facade = facade.with_credentials(credentials);
    }

    let output = match &facade {
        Facade::Blocking(client) => {
            let mut output = FetchOutput::default();
            if metric.daily() {
                output.daily = Some(client.daily().fetch().context("Daily fetch failed")?);
            }
            if metric.hourly() {
                output.hourly = Some(client.hourly().fetch().context("Hourly fetch failed")?);
            }
            output
        }
        Facade::Concurrent(client) => {
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(async {
                let daily = async {
                    if metric.daily() {
                        client.daily().fetch().await.map(Some)
                    } else {
                        Ok(None)
                    }
                };
                let hourly = async {
                    if metric.hourly() {
                        client.hourly().fetch().await.map(Some)
                    } else {
                        Ok(None)
                    }
                };
                let (daily, hourly) = tokio::try_join!(daily, hourly)?;
                anyhow::Ok(FetchOutput { daily, hourly })
            })?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}


fn stats(db_path: &std::path::Path) -> Result<()> {
    if !db_path.exists() {
        println!("No history database found at {}", db_path.display());
        return Ok(());
    }

    let store = HistoryStore::open(db_path)
        .with_context(|| format!("Failed to open history database: {}", db_path.display()))?;
    let stats = store.stats()?;

    println!("Database: {}", db_path.display());
    print_table_stats::<DailyMeasure>(stats.daily_rows, stats.daily_range);
    print_table_stats::<HourlyMeasure>(stats.hourly_rows, stats.hourly_range);

    Ok(())
}


fn print_table_stats<M: StoredMeasure>(rows: i64, range: Option<(i64, i64)>) {
    let format_ts = |ts: i64| {
        local_datetime(ts)
            .map(|dt| dt.format(ISO_FORMAT).to_string())
            .unwrap_or_else(|| ts.to_string())
    };

    match range {
        Some((first, last)) => println!(
            "{}: {} rows, {} .. {}",
            M::METRIC,
            rows,
            format_ts(first),
            format_ts(last)
        ),
        None => println!("{}: {} rows", M::METRIC, rows),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_history_args() {
        let cli = Cli::try_parse_from([
            "watersmart", "history", "hourly", "--from", "1685494800", "--to", "1686974400",
            "--limit", "10", "--offset", "0",
        ])
        .unwrap();

        match cli.command {
            Some(Commands::History { metric, from, to, limit, offset, desc }) => {
                assert_eq!(metric, MetricName::Hourly);
                assert_eq!(from, Some(1_685_494_800));
                assert_eq!(to, Some(1_686_974_400));
                assert_eq!(limit, Some(10));
                assert_eq!(offset, Some(0));
                assert!(!desc);
            }
            _ => panic!("expected history command"),
        }
    }

    #[test]
    fn test_client_config_unknown_provider() {
        let err = client_config("atlantis", None, None, true).unwrap_err();
        assert!(format!("{err:#}").contains("Unknown provider: atlantis"));
    }

    #[test]
    fn test_client_config_no_store() {
        let config = client_config("santacruz", None, Some("/tmp/x.db".into()), true).unwrap();
        assert_eq!(config.db_path, None);
        let config = client_config("santacruz", None, Some("/tmp/x.db".into()), false).unwrap();
        assert_eq!(config.db_path, Some(PathBuf::from("/tmp/x.db")));
    }
}
