use appshell_server::cache::local::LocalBodyStore;
use appshell_server::cache::sqlite::SqliteCacheIndex;
use appshell_server::config::WorkerConfig;
use appshell_server::sync::SqliteSyncQueue;
use appshell_server::upstream::UpstreamClient;
use appshell_server::{BodyStore, CacheIndex, SyncQueue, WorkerState, server};
use hyper_util::rt::TokioIo;
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use std::error::Error as _;
use std::io;
use std::sync::Arc;
use tower::Service;
use tracing::{debug, error, info};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = WorkerConfig::from_env().expect("Invalid configuration");

    // Ensure storage directory exists before creating the database
    // STORAGE_DIR structure:
    //   - bodies/ (cached response bodies, one tree per namespace)
    //   - worker.db (SQLite cache index + sync queue)
    std::fs::create_dir_all(&config.storage_dir).expect("Failed to create storage directory");

    let db_path = config.storage_dir.join("worker.db");
    let index: Box<dyn CacheIndex> =
        Box::new(SqliteCacheIndex::new(&db_path).expect("Failed to initialize cache index"));
    let bodies: Box<dyn BodyStore> = Box::new(
        LocalBodyStore::new(config.storage_dir.join("bodies"))
            .expect("Failed to initialize body store"),
    );
    let sync_queue: Box<dyn SyncQueue> =
        Box::new(SqliteSyncQueue::new(&db_path).expect("Failed to initialize sync queue"));
    let upstream = UpstreamClient::new(config.upstream_origin.clone(), None)
        .expect("Failed to build upstream client");

    let listen_addr = config.listen_addr.clone();
    let storage_dir = config.storage_dir.clone();
    let state = Arc::new(WorkerState::new(config, index, bodies, sync_queue, upstream));

    // Install is all-or-nothing; a failed install leaves nothing cached and
    // the supervisor owns the retry
    if let Err(e) = state.install().await {
        error!("❌ Install failed: {}", e);
        std::process::exit(1);
    }

    // Create and run the server
    let app = server::create_app(state);

    let listener = tokio::net::TcpListener::bind(&listen_addr)
        .await
        .expect("Failed to bind listen address");
    info!(
        "Appshell gateway listening on http://{} (HTTP/1.1 + HTTP/2)",
        listen_addr
    );
    info!("Storage directory: {}", storage_dir.display());

    // Use hyper's auto-negotiating server to support both HTTP/1.1 and HTTP/2
    let conn_builder = ConnBuilder::new(hyper_util::rt::TokioExecutor::new());

    loop {
        let (stream, addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                error!("Failed to accept connection: {}", e);
                continue;
            }
        };
        debug!("New connection from: {}", addr);
        let io = TokioIo::new(stream);
        let app_clone = app.clone();
        let conn_builder = conn_builder.clone();

        tokio::spawn(async move {
            if let Err(err) = conn_builder
                .serve_connection_with_upgrades(
                    io,
                    hyper::service::service_fn(move |req| app_clone.clone().call(req)),
                )
                .await
            {
                // Check if the error is an io::Error indicating a normal close
                let is_normal_close = err
                    .source()
                    .and_then(|e| e.downcast_ref::<io::Error>())
                    .map(|io_err| {
                        matches!(
                            io_err.kind(),
                            io::ErrorKind::ConnectionReset
                                | io::ErrorKind::BrokenPipe
                                | io::ErrorKind::UnexpectedEof
                        )
                    })
                    .unwrap_or(false);

                if is_normal_close {
                    debug!("Connection from {} closed normally", addr);
                } else {
                    error!("Error serving connection from {}: {}", addr, err);
                }
            } else {
                debug!("Connection from {} completed successfully", addr);
            }
        });
    }
}
