//! # seed
//!
//! Creates an administrator in the configured database:
//!
//! ```text
//! NADBENCH_ADMIN_PASSWORD=... seed <username>
//! ```
//!
//! The password comes from the environment so it never lands in shell
//! history.

use std::sync::Arc;

use anyhow::{bail, Context};
use auth_adapters::Argon2PasswordHasher;
use configs::Settings;
use domains::clock::SystemClock;
use domains::error::DomainError;
use domains::models::AdminUser;
use domains::ports::Clock;
use secrecy::ExposeSecret;
use services::{AuthService, RecordService};
use storage_adapters::postgres::{self, PgDocumentStore};
use storage_adapters::MemorySessionStore;
use tracing_subscriber::EnvFilter;

const PASSWORD_VAR: &str = "NADBENCH_ADMIN_PASSWORD";
const MIN_PASSWORD_CHARS: usize = 8;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let username = match std::env::args().nth(1) {
        Some(name) if !name.trim().is_empty() => name.trim().to_string(),
        _ => bail!("usage: {PASSWORD_VAR}=<password> seed <username>"),
    };
    let password = std::env::var(PASSWORD_VAR).with_context(|| format!("{PASSWORD_VAR} is not set"))?;
    if password.chars().count() < MIN_PASSWORD_CHARS {
        bail!("{PASSWORD_VAR} must be at least {MIN_PASSWORD_CHARS} characters");
    }

    let database = Settings::load_database().context("loading configuration")?;
    let Some(url) = &database.url else {
        bail!("database.url is not configured; an in-memory admin would vanish on exit");
    };

    let pool = postgres::connect(url.expose_secret(), 1).await?;
    postgres::migrate(&pool).await?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let auth = AuthService::new(
        RecordService::new(Arc::new(PgDocumentStore::<AdminUser>::new(pool)), clock.clone()),
        Arc::new(Argon2PasswordHasher::new()),
        Arc::new(MemorySessionStore::new()),
        clock,
        chrono::Duration::zero(),
    );

    match auth.provision(&username, &password).await {
        Ok(user) => {
            tracing::info!(%username, id = %user.id, "administrator created");
            Ok(())
        }
        Err(DomainError::Duplicate { .. }) => bail!("administrator {username:?} already exists"),
        Err(e) => Err(e.into()),
    }
}
