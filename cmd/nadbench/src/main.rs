//! # nadbench
//!
//! Entry point: loads configuration, picks the storage backends the build
//! and settings allow, and serves the catalog until Ctrl-C.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use api_adapters::{router, AppComponents, AppState, Metrics, WebSettings};
use auth_adapters::{Argon2PasswordHasher, CookieSigner};
use configs::{DatabaseSettings, LogSettings, Settings, StorageBackend, StorageSettings};
use domains::clock::SystemClock;
use domains::models::{AdminUser, Dataset, Feedback};
use domains::ports::{Clock, DocumentStore, MediaStorage};
use services::{AuthService, PreviewService, RecordService};
use storage_adapters::{LocalMediaStorage, MemoryDocumentStore, MemorySessionStore};
use tracing_subscriber::EnvFilter;

/// Room for multipart framing and the text fields around a preview upload.
const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

const BOOTSTRAP_USERNAME_VAR: &str = "NADBENCH_ADMIN_USERNAME";
const BOOTSTRAP_PASSWORD_VAR: &str = "NADBENCH_ADMIN_PASSWORD";

struct Stores {
    datasets: Arc<dyn DocumentStore<Dataset>>,
    feedback: Arc<dyn DocumentStore<Feedback>>,
    users: Arc<dyn DocumentStore<AdminUser>>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("loading configuration")?;
    init_tracing(&settings.log);

    // The S3 client's TLS stack needs a process-wide crypto provider.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let stores = document_stores(&settings.database).await?;
    let (media, media_root) = media_storage(&settings.storage).await?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let ttl = i64::try_from(settings.session.ttl_seconds).context("session.ttl_seconds is too large")?;
    let auth = AuthService::new(
        RecordService::new(stores.users, clock.clone()),
        Arc::new(Argon2PasswordHasher::new()),
        Arc::new(MemorySessionStore::new()),
        clock.clone(),
        chrono::Duration::seconds(ttl),
    );
    bootstrap_admin(&auth).await?;

    let state = AppState::new(AppComponents {
        datasets: RecordService::new(stores.datasets, clock.clone()),
        feedback: RecordService::new(stores.feedback, clock),
        auth,
        previews: PreviewService::new(media, settings.storage.max_upload_bytes),
        signer: CookieSigner::new(&settings.session.secret)?,
        metrics: Metrics::new(),
        settings: WebSettings {
            page_size: settings.admin.page_size,
            cookie_name: settings.session.cookie_name.clone(),
            cookie_secure: settings.session.secure,
            session_ttl_seconds: settings.session.ttl_seconds,
            max_body_bytes: settings.storage.max_upload_bytes + FORM_OVERHEAD_BYTES,
            media_root,
            media_url_prefix: settings.storage.local_url_prefix.clone(),
            ..WebSettings::default()
        },
    });

    let addr = settings.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "nadbench listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("nadbench stopped");
    Ok(())
}

/// Seeds the first administrator from the environment on a fresh install,
/// so a new deployment can be logged into without running `seed`.
async fn bootstrap_admin(auth: &AuthService) -> anyhow::Result<()> {
    let (Ok(username), Ok(password)) = (std::env::var(BOOTSTRAP_USERNAME_VAR), std::env::var(BOOTSTRAP_PASSWORD_VAR))
    else {
        return Ok(());
    };
    if username.trim().is_empty() || password.is_empty() {
        anyhow::bail!("{BOOTSTRAP_USERNAME_VAR} and {BOOTSTRAP_PASSWORD_VAR} must both be non-empty when set");
    }
    if auth.bootstrap(&username, &password).await?.is_none() {
        tracing::debug!("administrators already exist; ignoring {BOOTSTRAP_USERNAME_VAR}");
    }
    Ok(())
}

/// `RUST_LOG` wins over `log.level`.
fn init_tracing(log: &LogSettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if log.json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

async fn document_stores(db: &DatabaseSettings) -> anyhow::Result<Stores> {
    match &db.url {
        #[cfg(feature = "db-postgres")]
        Some(url) => {
            use secrecy::ExposeSecret;
            use storage_adapters::postgres::{self, PgDocumentStore};

            let pool = postgres::connect(url.expose_secret(), db.max_connections).await?;
            postgres::migrate(&pool).await?;
            tracing::info!(max_connections = db.max_connections, "using postgres document store");
            Ok(Stores {
                datasets: Arc::new(PgDocumentStore::<Dataset>::new(pool.clone())),
                feedback: Arc::new(PgDocumentStore::<Feedback>::new(pool.clone())),
                users: Arc::new(PgDocumentStore::<AdminUser>::new(pool)),
            })
        }
        #[cfg(not(feature = "db-postgres"))]
        Some(_) => anyhow::bail!("database.url is set but this build has no db-postgres feature"),
        None => {
            tracing::warn!("no database.url configured; records live in memory and are lost on exit");
            Ok(Stores {
                datasets: Arc::new(MemoryDocumentStore::<Dataset>::new()),
                feedback: Arc::new(MemoryDocumentStore::<Feedback>::new()),
                users: Arc::new(MemoryDocumentStore::<AdminUser>::new()),
            })
        }
    }
}

/// The preview store, plus the directory to serve when previews are local.
async fn media_storage(storage: &StorageSettings) -> anyhow::Result<(Arc<dyn MediaStorage>, Option<PathBuf>)> {
    match storage.backend {
        StorageBackend::Local => {
            let root = PathBuf::from(&storage.local_root);
            tracing::info!(root = %root.display(), "storing previews locally");
            let media: Arc<dyn MediaStorage> = Arc::new(LocalMediaStorage::new(root.clone(), storage.local_url_prefix.clone()));
            Ok((media, Some(root)))
        }
        #[cfg(feature = "media-s3")]
        StorageBackend::S3 => {
            use storage_adapters::s3::{S3MediaStorage, S3Options};

            let media = S3MediaStorage::connect(S3Options {
                bucket: storage.bucket.clone(),
                region: storage.region.clone(),
                access_key_id: storage.access_key_id.clone(),
                secret_access_key: storage.secret_access_key.clone(),
                endpoint: storage.endpoint.clone(),
                public_base_url: storage.public_base_url.clone(),
            })
            .await;
            tracing::info!(bucket = %storage.bucket, region = %storage.region, "storing previews in s3");
            Ok((Arc::new(media) as Arc<dyn MediaStorage>, None))
        }
        #[cfg(not(feature = "media-s3"))]
        StorageBackend::S3 => anyhow::bail!("storage.backend is s3 but this build has no media-s3 feature"),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "could not listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
