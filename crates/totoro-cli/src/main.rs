use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use totoro_auth::decode_token;
use totoro_cache::{CacheConfig, DistributedLock, LockError, RedisStore, SharedStore, keys};
use totoro_config::{AuthConfig, LockConfig};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "totoro-cli")]
#[command(about = "Totoro CLI - inspect sessions and task locks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show whether a task lock is held and for how long
    LockStatus {
        /// Lock name, without the `lock:` prefix
        name: String,
    },
    /// Take a task lock by hand
    LockAcquire {
        /// Lock name, without the `lock:` prefix
        name: String,

        /// Value stored under the lock
        #[arg(short = 'd', long, default_value = "cli")]
        data: String,

        /// Lock lifetime in minutes (defaults to LOCK_TTL_MINUTES)
        #[arg(short = 't', long)]
        ttl_minutes: Option<u64>,
    },
    /// Release a stuck task lock
    LockRelease {
        /// Lock name, without the `lock:` prefix
        name: String,
    },
    /// Decode a session token and report whether it is still live
    SessionCheck {
        /// The raw session token
        token: String,
    },
}

fn init_logging() {
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "warn".to_string());
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("totoro_cache={log_level},totoro_cli={log_level}")));

    // A second init (tests, embedding) is not an error for a CLI.
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .try_init();
}

async fn connect() -> anyhow::Result<Arc<dyn SharedStore>> {
    let config = CacheConfig::from_env();
    let store = RedisStore::new(&config.redis_url)
        .await
        .with_context(|| format!("Failed to connect to Redis at {}", config.redis_url))?;
    Ok(Arc::new(store))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    init_logging();

    let cli = Cli::parse();
    let store = connect().await?;
    let lock = DistributedLock::new(store.clone(), &LockConfig::from_env());

    match cli.command {
        Commands::LockStatus { name } => handle_lock_status(&lock, &name).await,
        Commands::LockAcquire {
            name,
            data,
            ttl_minutes,
        } => handle_lock_acquire(&lock, &name, &data, ttl_minutes).await,
        Commands::LockRelease { name } => handle_lock_release(&lock, &name).await,
        Commands::SessionCheck { token } => handle_session_check(store.as_ref(), &token).await,
    }
}

async fn handle_lock_status(lock: &DistributedLock, name: &str) -> anyhow::Result<()> {
    match lock.status(name).await? {
        Some(remaining) => println!(
            "🔒 {} is locked ({} seconds remaining)",
            keys::lock(name),
            remaining.as_secs()
        ),
        None => println!("🔓 {} is free", keys::lock(name)),
    }
    Ok(())
}

async fn handle_lock_acquire(
    lock: &DistributedLock,
    name: &str,
    data: &str,
    ttl_minutes: Option<u64>,
) -> anyhow::Result<()> {
    match lock.acquire(name, data, ttl_minutes).await {
        Ok(()) => {
            println!("✅ Acquired {}", keys::lock(name));
            Ok(())
        }
        Err(e @ LockError::Locked { .. }) => {
            eprintln!("❌ {e}");
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}

async fn handle_lock_release(lock: &DistributedLock, name: &str) -> anyhow::Result<()> {
    lock.release(name).await?;
    println!("✅ Released {}", keys::lock(name));
    Ok(())
}

async fn handle_session_check(store: &dyn SharedStore, token: &str) -> anyhow::Result<()> {
    let resolved = AuthConfig::from_env().resolve()?;

    let claims = match decode_token(token, &resolved.secret, &resolved.algorithm) {
        Ok(claims) => claims,
        Err(e) => {
            eprintln!("❌ Token rejected: {e}");
            std::process::exit(1);
        }
    };

    println!("   User: {}", claims.user);
    println!(
        "   Role: {}",
        claims.user_role.as_deref().unwrap_or("<none>")
    );

    if store.exists(keys::session(token)).await? {
        println!("✅ Session is live");
    } else {
        println!("❌ Session is not present in the store (revoked or expired)");
        std::process::exit(1);
    }

    Ok(())
}
