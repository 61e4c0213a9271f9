use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use forwarder::chat::DiscordClient;
use forwarder::queue::Consumer;
use forwarder::smtp::start_smtp_server;
use forwarder::web::WebServer;
use forwarder::{
    Config, Database, DurableQueue, IngestService, MailProcessor, NotificationForwarder, Notifier,
    PendingNotifications, SharedQueue, SqlQueue,
};

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    // Load configuration
    let config = match Config::load_with_env(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {config_path}: {e}");
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    // Initialize logging
    if let Err(e) = forwarder::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        forwarder::logging::init_console_only(&config.logging.level);
    }

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    info!("Mail forwarder starting");

    if let Err(e) = run(config).await {
        error!("Forwarder stopped: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> forwarder::Result<()> {
    let db = Arc::new(Database::connect_with_retry(&config.database).await);

    let sql_queue = SqlQueue::new(Arc::clone(&db), &config.queue);
    sql_queue.declare(&config.queue.relay_queue).await?;
    sql_queue.declare(&config.queue.notification_queue).await?;
    let queue: SharedQueue = Arc::new(sql_queue);

    let mut tasks: Vec<JoinHandle<()>> = Vec::new();

    if config.smtp.enabled {
        let ingest = Arc::new(IngestService::new(
            Arc::clone(&queue),
            config.queue.relay_queue.clone(),
        ));
        let listener =
            start_smtp_server(&config.smtp, ingest, tokio::runtime::Handle::current())?;
        tasks.push(listener);
    }

    if config.processor.enabled {
        let processor = Arc::new(MailProcessor::new(
            Arc::clone(&db),
            Arc::clone(&queue),
            &config.queue,
        ));
        let consumer = Consumer::new(
            Arc::clone(&queue),
            config.queue.relay_queue.clone(),
            &config.queue,
        );
        let prefetch = config.processor.prefetch;
        tasks.push(tokio::spawn(processor.run(consumer, prefetch)));
    }

    if config.notifier.enabled {
        let pending = PendingNotifications::new();

        let forwarder = NotificationForwarder::new(Arc::clone(&queue), pending.clone());
        let consumer = Consumer::new(
            Arc::clone(&queue),
            config.queue.notification_queue.clone(),
            &config.queue,
        );
        tasks.push(tokio::spawn(async move { forwarder.run(consumer).await }));

        let chat = Arc::new(DiscordClient::new(&config.chat)?);
        let notifier = Notifier::new(
            Arc::clone(&db),
            chat,
            pending,
            config.notifier.interval_secs,
            config.chat.command_prefix.clone(),
        );
        tasks.push(tokio::spawn(async move { notifier.run().await }));
    }

    if config.web.enabled {
        let server = WebServer::new(&config.web, &config.chat, Arc::clone(&db))?;
        tasks.push(tokio::spawn(async move {
            if let Err(e) = server.run().await {
                error!("Web server error: {}", e);
            }
        }));
    }

    if tasks.is_empty() {
        warn!("No roles enabled, nothing to do");
        return Ok(());
    }

    // Every role runs until shutdown, so any task ending early is fatal
    let stopped = tokio::select! {
        _ = wait_for_shutdown() => None,
        (result, index, _) = futures::future::select_all(tasks.iter_mut()) => {
            match result {
                Ok(()) => warn!(task = index, "Service task exited"),
                Err(e) => error!(task = index, error = %e, "Service task failed"),
            }
            Some(index)
        }
    };

    for task in &tasks {
        task.abort();
    }
    db.close().await;
    info!("Mail forwarder stopped");

    match stopped {
        Some(index) => Err(std::io::Error::other(format!(
            "service task {index} stopped unexpectedly"
        ))
        .into()),
        None => Ok(()),
    }
}

async fn wait_for_shutdown() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        // Without a signal handler, run until killed
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
