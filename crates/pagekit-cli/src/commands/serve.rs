//! `pagekit serve` command implementation.
//!
//! Production serves the published `dist/` directory read-only. Development
//! keeps a [`BuildService`] resident: a file watcher feeds it change batches,
//! requests are answered from its current snapshot, and rebuild events are
//! pushed to browsers over the `/__hmr` WebSocket.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::{header, HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use miette::{IntoDiagnostic, Result};
use notify::{Config, RecommendedWatcher, RecursiveMode, Watcher};
use pagekit_core::bundler::write_declarations;
use pagekit_core::compiler::SwcBackend;
use pagekit_core::css::typings::is_declaration_file;
use pagekit_core::dev::{negotiate_encoding, resolve_request, AssetSource, DirSource, Resolution};
use pagekit_core::{ArtifactSet, BuildService, Compiler, Mode, ModeConfig, RebuildEvent};
use serde::Serialize;
use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tower_http::trace::TraceLayer;

/// Quiet period after the last file event before a batch is forwarded.
const DEBOUNCE: Duration = Duration::from_millis(50);

/// Serve command action.
#[derive(Debug, Clone)]
pub struct ServeAction {
    pub cwd: PathBuf,
    pub mode: Mode,
}

/// Run the server until interrupted.
pub async fn run(action: ServeAction) -> Result<()> {
    let root = dunce::canonicalize(&action.cwd).into_diagnostic()?;
    let config = ModeConfig::load(&root, action.mode, std::env::vars()).into_diagnostic()?;

    let (app, port) = match action.mode {
        Mode::Production => {
            let port = config.required_port().into_diagnostic()?;
            let graph = pagekit_core::build(&config).into_diagnostic()?;
            let out_dir = graph.output_dir();
            if !out_dir.is_dir() {
                tracing::warn!(dir = %out_dir.display(), "output directory missing, run `pagekit build` first");
            }
            (static_router(out_dir), port)
        }
        Mode::Development => {
            let compiler = Compiler::from_config(&config, Arc::new(SwcBackend::new()))
                .into_diagnostic()?;
            let ignored = compiler.graph().output_dir();
            let service = Arc::new(BuildService::start(compiler).await.into_diagnostic()?);
            keep_declarations_current(&service, &root);

            let (change_tx, mut change_rx) = mpsc::channel::<Vec<PathBuf>>(16);
            let watch_root = root.clone();
            std::thread::spawn(move || {
                if let Err(e) = watch_files(&watch_root, &ignored, change_tx) {
                    tracing::error!(error = %e, "file watcher stopped");
                }
            });

            let rebuild_service = Arc::clone(&service);
            tokio::spawn(async move {
                while let Some(changed) = change_rx.recv().await {
                    tracing::info!(files = changed.len(), "sources changed, rebuilding");
                    rebuild_service.request_rebuild(changed);
                }
            });

            (live_router(service), config.listen_port())
        }
    };

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .into_diagnostic()?;

    println!();
    println!("  Serving {} at http://localhost:{port}", action.mode);
    if action.mode == Mode::Development {
        println!("  Live reload enabled");
    }
    println!();
    println!("  Press Ctrl+C to stop");
    println!();

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .into_diagnostic()?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

/// Write scoped-style declarations for the current snapshot and again after
/// every successful rebuild, for the script checker to pick up.
pub fn keep_declarations_current(service: &BuildService, root: &Path) {
    update_declarations(root, &service.current_snapshot());
    let root = root.to_path_buf();
    service.on_rebuild(move |event, snapshot| {
        if event.is_valid() {
            update_declarations(&root, snapshot);
        }
    });
}

fn update_declarations(root: &Path, artifacts: &ArtifactSet) {
    match write_declarations(root, artifacts) {
        Ok(0) => {}
        Ok(files) => tracing::debug!(files, "declarations updated"),
        Err(e) => tracing::warn!(error = %e, "failed to write declarations"),
    }
}

// ============================================================================
// Routers
// ============================================================================

/// Read-only router over a published output directory.
pub fn static_router(out_dir: PathBuf) -> Router {
    let source = Arc::new(DirSource::new(out_dir));
    Router::new()
        .fallback(serve_static)
        .with_state(source)
        .layer(TraceLayer::new_for_http())
}

/// Router over the build service's current snapshot.
pub fn live_router(service: Arc<BuildService>) -> Router {
    Router::new()
        .route("/__hmr", get(hmr_websocket))
        .route("/__pagekit/status", get(status))
        .fallback(serve_live)
        .with_state(service)
        .layer(TraceLayer::new_for_http())
}

// ============================================================================
// Route Handlers
// ============================================================================

async fn serve_static(State(source): State<Arc<DirSource>>, uri: Uri, headers: HeaderMap) -> Response {
    respond(source.as_ref(), uri.path(), &headers, "public, max-age=0")
}

async fn serve_live(
    State(service): State<Arc<BuildService>>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let snapshot = service.current_snapshot();
    respond(snapshot.as_ref(), uri.path(), &headers, "no-cache")
}

/// Resolve `path` against `source` and build the response.
fn respond(
    source: &dyn AssetSource,
    path: &str,
    headers: &HeaderMap,
    cache_control: &'static str,
) -> Response {
    let (name, artifact) = match resolve_request(source, path) {
        Resolution::File { name, artifact } => (Some(name), artifact),
        Resolution::Fallback(artifact) => (None, artifact),
        Resolution::NotFound => return (StatusCode::NOT_FOUND, "Not Found").into_response(),
    };

    let accept = headers
        .get(header::ACCEPT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if let Some((encoded, encoding)) = name
        .as_deref()
        .and_then(|name| negotiate_encoding(source, name, accept))
    {
        return (
            [
                (header::CONTENT_TYPE, artifact.content_type),
                (header::CONTENT_ENCODING, encoding),
                (header::VARY, "Accept-Encoding"),
                (header::CACHE_CONTROL, cache_control),
            ],
            encoded.bytes,
        )
            .into_response();
    }

    (
        [
            (header::CONTENT_TYPE, artifact.content_type),
            (header::CACHE_CONTROL, cache_control),
        ],
        artifact.bytes,
    )
        .into_response()
}

/// Status of the current snapshot.
#[derive(Serialize)]
struct StatusJson {
    hash: String,
    chunks: Vec<String>,
    valid: bool,
}

async fn status(State(service): State<Arc<BuildService>>) -> Json<StatusJson> {
    let snapshot = service.current_snapshot();
    Json(StatusJson {
        hash: snapshot.hash.clone(),
        chunks: snapshot.chunks.iter().map(|c| c.name.clone()).collect(),
        valid: service.last_event().map_or(true, |e| e.is_valid()),
    })
}

async fn hmr_websocket(
    ws: WebSocketUpgrade,
    State(service): State<Arc<BuildService>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_hmr_socket(socket, service))
}

async fn handle_hmr_socket(mut socket: WebSocket, service: Arc<BuildService>) {
    let mut events = service.subscribe();

    if socket
        .send(Message::Text(RebuildEvent::Connected.to_json()))
        .await
        .is_err()
    {
        return;
    }

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    if socket.send(Message::Text(event.to_json())).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "live-reload client lagged behind");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            message = socket.recv() => match message {
                Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
}

// ============================================================================
// File Watching
// ============================================================================

/// Whether a change under `root` should be ignored.
fn should_ignore(root: &Path, out_dir: &Path, path: &Path) -> bool {
    if path.starts_with(out_dir) {
        return true;
    }

    let relative = path.strip_prefix(root).unwrap_or(path);
    let skipped_dir = relative.components().any(|c| {
        matches!(
            c.as_os_str().to_str(),
            Some("node_modules" | "target" | ".git" | "dist")
        )
    });
    if skipped_dir {
        return true;
    }

    // Dotfiles are editor swap files and staging dirs; declarations are our own output
    is_declaration_file(path)
        || path
            .file_name()
            .and_then(|n| n.to_str())
            .map_or(true, |name| name.starts_with('.'))
}

/// Watch `root` and forward debounced change batches until the receiver is gone.
fn watch_files(root: &Path, out_dir: &Path, changes: mpsc::Sender<Vec<PathBuf>>) -> Result<()> {
    let (tx, rx) = std::sync::mpsc::channel();

    let mut watcher = RecommendedWatcher::new(tx, Config::default()).into_diagnostic()?;
    watcher
        .watch(root, RecursiveMode::Recursive)
        .into_diagnostic()?;

    let mut pending: BTreeSet<PathBuf> = BTreeSet::new();

    loop {
        let received = if pending.is_empty() {
            rx.recv().map_err(|_| std::sync::mpsc::RecvTimeoutError::Disconnected)
        } else {
            rx.recv_timeout(DEBOUNCE)
        };

        match received {
            Ok(Ok(event)) => {
                pending.extend(
                    event
                        .paths
                        .into_iter()
                        .filter(|p| !should_ignore(root, out_dir, p)),
                );
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "watch error");
            }
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {
                let batch: Vec<PathBuf> = std::mem::take(&mut pending).into_iter().collect();
                if changes.blocking_send(batch).is_err() {
                    break;
                }
            }
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use pagekit_core::dev::SnapshotBuilder;
    use pagekit_core::{Artifact, ArtifactSet, ChunkArtifact, CompileError};
    use tower::ServiceExt;

    struct Fixed;

    impl SnapshotBuilder for Fixed {
        fn build(&self, _changed: &[PathBuf]) -> std::result::Result<ArtifactSet, CompileError> {
            let mut set = ArtifactSet::empty();
            for (name, body) in [
                ("index.html", "<script src=\"/main-bundle.js\"></script>"),
                ("main-bundle.js", "console.log(1);"),
                ("main-bundle.js.gz", "gzipped"),
            ] {
                set.files
                    .insert(name.to_string(), Artifact::for_file(name, body.to_string()));
            }
            set.chunks.push(ChunkArtifact {
                name: "main".to_string(),
                file: "main-bundle.js".to_string(),
                hash: String::new(),
                modules: Vec::new(),
            });
            set.seal();
            Ok(set)
        }
    }

    async fn get(app: Router, uri: &str, accept_encoding: Option<&str>) -> (StatusCode, HeaderMap, String) {
        let mut request = Request::builder().uri(uri);
        if let Some(value) = accept_encoding {
            request = request.header(header::ACCEPT_ENCODING, value);
        }
        let response = app
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_live_router_serves_snapshot() {
        let service = Arc::new(BuildService::start(Fixed).await.unwrap());
        let app = live_router(service);

        let (status, headers, body) = get(app.clone(), "/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_TYPE], "text/html; charset=utf-8");
        assert!(body.contains("/main-bundle.js"));

        let (status, _, body) = get(app.clone(), "/settings/profile", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("/main-bundle.js"));

        let (status, _, _) = get(app, "/logo.png", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_live_router_prefers_precompressed() {
        let service = Arc::new(BuildService::start(Fixed).await.unwrap());
        let (status, headers, body) =
            get(live_router(service), "/main-bundle.js", Some("gzip")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_ENCODING], "gzip");
        assert_eq!(headers[header::CONTENT_TYPE], "application/javascript; charset=utf-8");
        assert_eq!(body, "gzipped");
    }

    #[tokio::test]
    async fn test_status_endpoint() {
        let service = Arc::new(BuildService::start(Fixed).await.unwrap());
        let hash = service.current_snapshot().hash.clone();
        let (status, _, body) = get(live_router(service), "/__pagekit/status", None).await;
        assert_eq!(status, StatusCode::OK);

        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["hash"], hash.as_str());
        assert_eq!(json["chunks"], serde_json::json!(["main"]));
        assert_eq!(json["valid"], true);
    }

    #[tokio::test]
    async fn test_static_router_serves_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<p>home</p>").unwrap();
        std::fs::write(dir.path().join("main.css"), "a{}").unwrap();
        let app = static_router(dir.path().to_path_buf());

        let (status, headers, body) = get(app.clone(), "/main.css", Some("br, gzip")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(headers.get(header::CONTENT_ENCODING).is_none());
        assert_eq!(body, "a{}");

        let (status, _, body) = get(app.clone(), "/about", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "<p>home</p>");

        let (status, _, _) = get(app, "/../secret.txt", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_declarations_follow_scoped_style_edits() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("public")).unwrap();
        std::fs::create_dir_all(root.join("src")).unwrap();
        std::fs::write(root.join("public/index.html"), "<html><body></body></html>").unwrap();
        std::fs::write(
            root.join("src/index.tsx"),
            "import styles from './App.module.scss';\nconsole.log(styles.app);\n",
        )
        .unwrap();
        std::fs::write(root.join("src/App.module.scss"), ".app { color: red; }\n").unwrap();

        let config = ModeConfig::new(Mode::Development, root).with_port(3111);
        let compiler = Compiler::from_config(&config, Arc::new(SwcBackend::new())).unwrap();
        let service = BuildService::start(compiler).await.unwrap();
        keep_declarations_current(&service, root);

        let declaration = root.join("src/App.module.scss.d.ts");
        let initial = std::fs::read_to_string(&declaration).unwrap();
        assert!(initial.contains("'app': string;"));
        assert!(!initial.contains("'title'"));

        std::fs::write(
            root.join("src/App.module.scss"),
            ".app { color: red; }\n.title { font-weight: bold; }\n",
        )
        .unwrap();
        let event = service
            .rebuild_now(vec![root.join("src/App.module.scss")])
            .await;
        assert!(event.is_valid());

        let updated = std::fs::read_to_string(&declaration).unwrap();
        assert!(updated.contains("'app': string;"));
        assert!(updated.contains("'title': string;"));
    }

    #[test]
    fn test_should_ignore() {
        let root = Path::new("/app");
        let out = Path::new("/app/dist");
        assert!(should_ignore(root, out, Path::new("/app/dist/main-bundle.js")));
        assert!(should_ignore(root, out, Path::new("/app/node_modules/x/index.js")));
        assert!(should_ignore(root, out, Path::new("/app/src/.App.tsx.swp")));
        assert!(should_ignore(root, out, Path::new("/app/src/App.module.scss.d.ts")));
        assert!(!should_ignore(root, out, Path::new("/app/src/App.module.scss")));
        assert!(!should_ignore(root, out, Path::new("/app/public/index.html")));
    }
}
