//! `mailin-embedded` handler feeding the ingest service.

use std::io;
use std::net::TcpListener;
use std::sync::Arc;

use mailin_embedded::response::{INTERNAL_ERROR, OK};
use mailin_embedded::{Handler, Response, Server, SslConfig};
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

use super::IngestService;
use crate::config::SmtpConfig;
use crate::envelope::MailTransaction;

/// Per-connection SMTP handler.
///
/// `mailin-embedded` drives sessions on its own threads, so the async
/// ingest call is run on the tokio runtime through `runtime`.
#[derive(Clone)]
pub struct SmtpHandler {
    ingest: Arc<IngestService>,
    runtime: Handle,
    sender: String,
    recipients: Vec<String>,
    content: Vec<u8>,
}

impl SmtpHandler {
    /// Create a handler publishing through `ingest`.
    pub fn new(ingest: Arc<IngestService>, runtime: Handle) -> Self {
        Self {
            ingest,
            runtime,
            sender: String::new(),
            recipients: Vec::new(),
            content: Vec::new(),
        }
    }
}

impl Handler for SmtpHandler {
    fn data_start(&mut self, _domain: &str, from: &str, _is8bit: bool, to: &[String]) -> Response {
        self.sender = from.to_string();
        self.recipients = to.to_vec();
        self.content.clear();
        OK
    }

    fn data(&mut self, buf: &[u8]) -> io::Result<()> {
        self.content.extend_from_slice(buf);
        Ok(())
    }

    fn data_end(&mut self) -> Response {
        let transaction = MailTransaction {
            sender: std::mem::take(&mut self.sender),
            recipients: std::mem::take(&mut self.recipients),
            content: std::mem::take(&mut self.content),
        };

        match self.runtime.block_on(self.ingest.accept(transaction)) {
            Ok(_) => OK,
            Err(e) => {
                // 451: the sending server keeps the message and retries
                warn!(error = %e, "Failed to queue incoming mail");
                INTERNAL_ERROR
            }
        }
    }
}

/// Start the SMTP listener on a dedicated thread.
///
/// The address is bound once up front so an unavailable port fails here.
/// The returned task finishes when the listener thread stops for any reason.
pub fn start_smtp_server(
    config: &SmtpConfig,
    ingest: Arc<IngestService>,
    runtime: Handle,
) -> io::Result<tokio::task::JoinHandle<()>> {
    let addr = format!("{}:{}", config.host, config.port);
    drop(TcpListener::bind(&addr)?);

    let name = config.hostname.clone();
    let handler = SmtpHandler::new(ingest, runtime.clone());

    spawn_watched("smtp", &runtime, move || {
        let mut server = Server::new(handler);
        server.with_name(name);
        if let Err(e) = server.with_ssl(SslConfig::None) {
            error!("SMTP TLS configuration failed: {}", e);
            return;
        }
        if let Err(e) = server.with_addr(&addr) {
            error!("Invalid SMTP address {}: {}", addr, e);
            return;
        }

        info!("SMTP server listening on {}", addr);
        if let Err(e) = server.serve() {
            error!("SMTP server stopped: {}", e);
        }
    })
}

/// Run `f` on a named thread and return a task that completes when the
/// thread ends, including by panic.
fn spawn_watched<F>(name: &str, runtime: &Handle, f: F) -> io::Result<tokio::task::JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    let (done_tx, done_rx) = oneshot::channel::<()>();

    std::thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            // Dropped when the thread unwinds, too
            let _done = done_tx;
            f();
        })?;

    let name = name.to_string();
    Ok(runtime.spawn(async move {
        let _ = done_rx.await;
        warn!(thread = %name, "Listener thread exited");
    }))
}
