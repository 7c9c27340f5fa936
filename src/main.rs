use clap::{Args, Parser, Subcommand};
use hgw_notify::application::engine::{NotificationProcessor, ProcessorConfig};
use hgw_notify::domain::integrity::IntegrityVerifier;
use hgw_notify::domain::order::Quote;
use hgw_notify::domain::ports::{OrderMaterializerBox, OrderStoreBox, TransactionLogBox};
use hgw_notify::infrastructure::alerts::TracingAlertSink;
use hgw_notify::infrastructure::hashing::HmacSha256Hash;
use hgw_notify::infrastructure::in_memory::{InMemoryCommerceStore, InMemoryTransactionLog};
use hgw_notify::interfaces::csv::quote_reader::QuoteReader;
use hgw_notify::interfaces::http::{RESPONSE_PATH, build_router};
use miette::{IntoDiagnostic, Result};
use secrecy::SecretString;
use std::fs::File;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Shared secret used to sign transaction ids
    #[arg(long, env = "HGW_SECRET", hide_env_values = true, global = true)]
    secret: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Listen for payment result notifications
    Serve(ServeArgs),
    /// Print the CRITERION_SECRET expected for a transaction id
    Sign {
        /// Transaction id as sent to the payment processor
        transaction_id: String,
    },
}

#[derive(Args)]
struct ServeArgs {
    /// Address to listen on
    #[arg(long, env = "HGW_BIND", default_value = "127.0.0.1:8080")]
    bind: SocketAddr,

    /// Shopper-facing redirect target returned to the processor
    #[arg(
        long,
        env = "HGW_REDIRECT_URL",
        default_value = "http://127.0.0.1:8080/hgw/index/redirect"
    )]
    redirect_url: String,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// CSV file of quotes to load before serving (optional)
    #[arg(long)]
    quotes: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let Some(secret) = cli.secret else {
        return Err(miette::miette!(
            "a shared secret is required (--secret or HGW_SECRET)"
        ));
    };
    let hash = HmacSha256Hash::new(SecretString::from(secret)).into_diagnostic()?;
    let verifier = IntegrityVerifier::new(Box::new(hash));

    match cli.command {
        Command::Sign { transaction_id } => {
            println!("{}", verifier.expected(&transaction_id));
            Ok(())
        }
        Command::Serve(args) => serve(args, verifier).await,
    }
}

async fn serve(args: ServeArgs, verifier: IntegrityVerifier) -> Result<()> {
    let (orders, materializer, log) = open_stores(&args).await?;

    let processor = NotificationProcessor::new(
        ProcessorConfig {
            redirect_url: args.redirect_url,
        },
        verifier,
        orders,
        materializer,
        log,
        Box::new(TracingAlertSink),
    );
    let app = build_router(Arc::new(processor));

    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .into_diagnostic()?;
    info!(addr = %args.bind, path = RESPONSE_PATH, "Listening for payment notifications");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .into_diagnostic()
}

type Stores = (OrderStoreBox, OrderMaterializerBox, TransactionLogBox);

async fn open_stores(args: &ServeArgs) -> Result<Stores> {
    if let Some(stores) = open_persistent(args)? {
        return Ok(stores);
    }

    let store = InMemoryCommerceStore::new();
    if let Some(path) = &args.quotes {
        for quote in read_quotes(path)? {
            store.put_quote(quote).await;
        }
    }
    let orders: OrderStoreBox = Box::new(store.clone());
    let materializer: OrderMaterializerBox = Box::new(store);
    let log: TransactionLogBox = Box::new(InMemoryTransactionLog::new());
    Ok((orders, materializer, log))
}

#[cfg(feature = "storage-rocksdb")]
fn open_persistent(args: &ServeArgs) -> Result<Option<Stores>> {
    use hgw_notify::infrastructure::rocksdb::RocksDBStore;

    let Some(db_path) = &args.db_path else {
        return Ok(None);
    };
    let store = RocksDBStore::open(db_path).into_diagnostic()?;
    if let Some(path) = &args.quotes {
        for quote in read_quotes(path)? {
            store.put_quote(&quote).into_diagnostic()?;
        }
    }
    let orders: OrderStoreBox = Box::new(store.clone());
    let materializer: OrderMaterializerBox = Box::new(store.clone());
    let log: TransactionLogBox = Box::new(store);
    Ok(Some((orders, materializer, log)))
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_persistent(args: &ServeArgs) -> Result<Option<Stores>> {
    if args.db_path.is_some() {
        tracing::warn!(
            "--db-path given but storage-rocksdb is not enabled, using in-memory storage"
        );
    }
    Ok(None)
}

fn read_quotes(path: &Path) -> Result<Vec<Quote>> {
    let file = File::open(path).into_diagnostic()?;
    let mut quotes = Vec::new();
    for quote in QuoteReader::new(file).quotes() {
        match quote {
            Ok(quote) => quotes.push(quote),
            Err(e) => error!(error = %e, "Error reading quote"),
        }
    }
    info!(count = quotes.len(), path = %path.display(), "Loaded quotes");
    Ok(quotes)
}
