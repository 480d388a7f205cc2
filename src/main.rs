use std::sync::Arc;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use todo_backend::auth::TokenManager;
use todo_backend::build_app;
use todo_backend::config::{Config, MailBackend};
use todo_backend::db;
use todo_backend::notifications::{ConsoleMailer, Mailer, SmtpMailer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "todo_backend=debug".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::new_from_env()?;

    let pool = db::connect(&config.database_url, 5).await?;

    let tokens = TokenManager::new(
        &config.jwt_secret,
        config.access_token_ttl,
        config.refresh_token_ttl,
    );

    let mailer: Arc<dyn Mailer> = match &config.mail_backend {
        MailBackend::Console => Arc::new(ConsoleMailer::new(config.default_from_email.clone())),
        MailBackend::Smtp(smtp) => {
            info!("sending mail through {}:{}", smtp.host, smtp.port);
            Arc::new(SmtpMailer::new(smtp, &config.default_from_email)?)
        }
    };

    let (app, worker) = build_app(pool, tokens, mailer, config.retry_policy)?;
    let worker = tokio::spawn(worker.start());

    info!("listening on http://{}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    // Serving consumes the router, so every `Notifier` is gone once this
    // returns and the worker stops after draining its queue.
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped, delivering queued notifications");
    worker.await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("failed to register SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received ctrl-c"),
        _ = terminate => info!("received SIGTERM"),
    }
}
