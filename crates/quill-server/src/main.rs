mod config;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::http::HeaderName;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use quill_api::{AppState, AppStateInner, SecretHasher, TokenService};
use quill_cache::{KvCache, MemoryCache, PendingSignups, RedisCache};
use quill_db::Database;
use quill_mail::{LogMailer, MailQueue, Mailer, SmtpMailer};

use crate::config::Config;

const MAIL_QUEUE_CAPACITY: usize = 256;
const CACHE_PRUNE_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quill=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    let db = Database::open(&config.db_path)
        .with_context(|| format!("unable to open database {}", config.db_path.display()))?;

    let cache: Arc<dyn KvCache> = match &config.redis_url {
        Some(url) => {
            info!("Verification cache: redis");
            Arc::new(RedisCache::connect(url).await?)
        }
        None => {
            info!("Verification cache: in-memory");
            let cache = MemoryCache::new();
            tokio::spawn(quill_cache::memory::run_prune_loop(
                cache.clone(),
                CACHE_PRUNE_INTERVAL,
            ));
            Arc::new(cache)
        }
    };

    let mailer: Arc<dyn Mailer> = match &config.smtp {
        Some(settings) => {
            info!("Mail delivery: smtp via {}:{}", settings.host, settings.port);
            Arc::new(SmtpMailer::new(settings)?)
        }
        None => {
            warn!("SMTP not configured, verification codes will only be logged");
            Arc::new(LogMailer)
        }
    };
    let (mail, mail_worker) = MailQueue::start(mailer, MAIL_QUEUE_CAPACITY);

    let auth_header = HeaderName::try_from(config.auth_header.as_str())
        .with_context(|| format!("invalid QUILL_AUTH_HEADER '{}'", config.auth_header))?;

    let state: AppState = Arc::new(AppStateInner {
        store: Arc::new(db),
        signups: PendingSignups::new(cache, config.signup_code_ttl),
        tokens: TokenService::new(
            &config.jwt_secret,
            config.access_token_ttl,
            config.remember_me_token_ttl,
        ),
        hasher: SecretHasher::default(),
        mail,
        auth_header,
    });

    let app = quill_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Quill server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // the router held the last queue handle; let the worker drain what is left
    if tokio::time::timeout(Duration::from_secs(10), mail_worker).await.is_err() {
        warn!("Mail worker did not drain in time");
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!("unable to install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
