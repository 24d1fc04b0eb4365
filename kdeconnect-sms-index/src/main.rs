//! SMS index entry point.
//!
//! Reads an exported Android message store and prints its conversations,
//! a single thread, or every thread.

mod config;
mod constants;
mod output;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use kdeconnect_sms::{AddressResolver, MessageStoreAccessor, SqliteMessageStore, ThreadId};

use config::{Config, VariantChoice};
use constants::CONFIG_ENV_VAR;

type Accessor = MessageStoreAccessor<SqliteMessageStore, Box<dyn AddressResolver>>;

#[derive(Debug, Parser)]
#[command(name = "kdeconnect-sms-index", version, about)]
struct Cli {
    /// JSON config file
    #[arg(long, env = CONFIG_ENV_VAR)]
    config: Option<PathBuf>,

    /// Path to the exported mmssms.db
    #[arg(long)]
    db: Option<PathBuf>,

    /// API level of the phone the database came from
    #[arg(long)]
    api_level: Option<u32>,

    /// Force an address variant instead of deciding from the API level
    #[arg(long, value_enum)]
    variant: Option<VariantChoice>,

    /// Seconds a query may run before giving up
    #[arg(long)]
    timeout: Option<u64>,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Latest message of every conversation
    Conversations,
    /// All messages in one thread
    Thread {
        /// Thread id
        id: i64,
    },
    /// Every message, grouped by thread
    Threads,
}

impl Cli {
    fn config(&self) -> Config {
        let mut config = self
            .config
            .as_deref()
            .map(Config::load)
            .unwrap_or_default();
        if let Some(db) = &self.db {
            config.database_path = Some(db.clone());
        }
        if let Some(api_level) = self.api_level {
            config.api_level = api_level;
        }
        if let Some(variant) = self.variant {
            config.address_variant = variant;
        }
        if let Some(timeout) = self.timeout {
            config.query_timeout_secs = timeout;
        }
        config
    }
}

/// Run a blocking store call off the async runtime, bounded by `timeout`.
///
/// On timeout the blocking call keeps running to completion in the
/// background; only its result is discarded.
async fn run_query<T, F>(timeout: Duration, query: F) -> anyhow::Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> kdeconnect_sms::Result<T> + Send + 'static,
{
    let task = tokio::task::spawn_blocking(query);
    let joined = tokio::time::timeout(timeout, task)
        .await
        .map_err(|_| anyhow!("query timed out after {}s", timeout.as_secs()))?;
    let result = joined.context("query task failed")?;
    Ok(result?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("kdeconnect_sms_index=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.config();

    let db_path = config
        .database_path
        .clone()
        .context("no database given; pass --db or set database_path in the config")?;
    let store = SqliteMessageStore::open(&db_path)
        .with_context(|| format!("Failed to open message store {}", db_path.display()))?;
    let resolver = config.resolver();
    tracing::info!(
        "Using {:?} store addresses for API level {}",
        resolver.variant(),
        config.api_level
    );

    let accessor: Arc<Accessor> = Arc::new(MessageStoreAccessor::new(store, resolver));
    let timeout = Duration::from_secs(config.query_timeout_secs);

    let rendered = match cli.command {
        Command::Conversations => {
            let accessor = Arc::clone(&accessor);
            let index = run_query(timeout, move || accessor.conversations()).await?;
            output::render_conversations(&index, cli.json)?
        }
        Command::Thread { id } => {
            let thread_id = ThreadId::new(id);
            let accessor = Arc::clone(&accessor);
            let messages =
                run_query(timeout, move || accessor.messages_in_thread(thread_id)).await?;
            output::render_thread(thread_id, &messages, cli.json)?
        }
        Command::Threads => {
            let accessor = Arc::clone(&accessor);
            let threads = run_query(timeout, move || accessor.messages_by_thread()).await?;
            output::render_threads(&threads, cli.json)?
        }
    };

    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kdeconnect_sms::store::NewSms;
    use kdeconnect_sms::{AddressVariant, Error, StoreError};

    #[test]
    fn test_cli_overrides_config_file() {
        let cli = Cli::parse_from([
            "kdeconnect-sms-index",
            "--db",
            "/data/mmssms.db",
            "--api-level",
            "15",
            "--timeout",
            "3",
            "thread",
            "42",
        ]);
        let config = cli.config();
        assert_eq!(config.database_path, Some(PathBuf::from("/data/mmssms.db")));
        assert_eq!(config.api_level, 15);
        assert_eq!(config.query_timeout_secs, 3);
        assert_eq!(config.resolver().variant(), AddressVariant::Legacy);
        assert!(matches!(cli.command, Command::Thread { id: 42 }));
    }

    #[test]
    fn test_cli_variant_flag() {
        let cli = Cli::parse_from([
            "kdeconnect-sms-index",
            "--api-level",
            "10",
            "--variant",
            "modern",
            "conversations",
        ]);
        assert_eq!(cli.config().resolver().variant(), AddressVariant::Modern);
    }

    #[tokio::test]
    async fn test_run_query_against_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mmssms.db");
        {
            let store = SqliteMessageStore::create(&path).unwrap();
            for (thread_id, body, date) in [(1, "hi", 1), (2, "yo", 2), (1, "there", 3)] {
                store
                    .insert(&NewSms {
                        thread_id,
                        address: "+15550001111",
                        body,
                        date,
                        message_type: 1,
                        ..Default::default()
                    })
                    .unwrap();
            }
        }

        let resolver: Box<dyn AddressResolver> =
            Box::new(kdeconnect_sms::PlatformResolver::new(34));
        let accessor: Arc<Accessor> = Arc::new(MessageStoreAccessor::new(
            SqliteMessageStore::open(&path).unwrap(),
            resolver,
        ));

        let a = Arc::clone(&accessor);
        let messages = run_query(Duration::from_secs(5), move || {
            a.messages_in_thread(ThreadId::new(1))
        })
        .await
        .unwrap();
        assert_eq!(messages.len(), 2);

        let a = Arc::clone(&accessor);
        let conversations = run_query(Duration::from_secs(5), move || a.conversations())
            .await
            .unwrap();
        assert_eq!(conversations.len(), 2);
    }

    #[tokio::test]
    async fn test_run_query_surfaces_store_errors() {
        let err = run_query(Duration::from_secs(5), || -> kdeconnect_sms::Result<()> {
            Err(Error::StoreUnavailable {
                address: kdeconnect_sms::StoreAddress::new(
                    kdeconnect_sms::AddressScope::Messages,
                    AddressVariant::Modern,
                ),
                source: StoreError::PermissionDenied("READ_SMS".to_string()),
            })
        })
        .await
        .unwrap_err();
        assert!(err.to_string().contains("unavailable"));
    }

    #[tokio::test]
    async fn test_run_query_times_out() {
        let err = run_query(Duration::from_millis(10), || {
            std::thread::sleep(Duration::from_millis(200));
            Ok(())
        })
        .await
        .unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }
}
