//! Development server implementation.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::sync::Mutex;
use tower_http::services::{ServeDir, ServeFile};

use crate::watcher::{FileWatcher, WatchEvent, WatchPatterns};
use crate::websocket::{
    reload_client_script, ReloadHub, ReloadMessage, RELOAD_SCRIPT_PATH, RELOAD_SOCKET_PATH,
};

/// Rebuild callback run after a watched file changes.
pub type RebuildHook = Arc<dyn Fn() -> Result<(), String> + Send + Sync>;

/// Configuration for the development server.
#[derive(Debug, Clone)]
pub struct DevServerConfig {
    /// Project root; watch globs are relative to it
    pub root: PathBuf,

    /// Build output served first
    pub build_dir: PathBuf,

    /// Static directory served when the build has no matching file
    pub static_dir: PathBuf,

    /// Directories to watch
    pub watch_dirs: Vec<PathBuf>,

    /// Globs that trigger a rebuild
    pub watch_files: Vec<String>,

    /// Port to listen on
    pub port: u16,

    /// Host to bind to
    pub host: String,

    /// Open browser on start
    pub open: bool,

    /// Serve `index.html` for paths with no matching file
    pub history_api_fallback: bool,

    /// Inject the reload client and reload on rebuild
    pub hot: bool,
}

impl Default for DevServerConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            build_dir: PathBuf::from("build"),
            static_dir: PathBuf::from("public"),
            watch_dirs: vec![PathBuf::from("src")],
            watch_files: Vec::new(),
            port: 8888,
            host: "127.0.0.1".to_string(),
            open: true,
            history_api_fallback: true,
            hot: true,
        }
    }
}

/// Errors that can occur with the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Invalid address {0}")]
    InvalidAddress(String),

    #[error("Failed to bind to {0}: {1}")]
    BindError(SocketAddr, String),

    #[error("File watch error: {0}")]
    WatchError(String),

    #[error("Invalid watch pattern: {0}")]
    InvalidPattern(#[from] globset::Error),
}

/// Development server.
pub struct DevServer {
    config: DevServerConfig,
    hub: ReloadHub,
    rebuild: Option<RebuildHook>,
}

impl DevServer {
    /// Create a new development server.
    pub fn new(config: DevServerConfig) -> Self {
        Self {
            config,
            hub: ReloadHub::new(),
            rebuild: None,
        }
    }

    /// Run `hook` whenever a watched file changes.
    pub fn on_change<F>(mut self, hook: F) -> Self
    where
        F: Fn() -> Result<(), String> + Send + Sync + 'static,
    {
        self.rebuild = Some(Arc::new(hook));
        self
    }

    /// Hub used to notify connected browsers.
    pub fn hub(&self) -> &ReloadHub {
        &self.hub
    }

    /// Build the router serving the build output.
    pub fn router(&self) -> Router {
        let fallback_file = ServeFile::new(self.config.build_dir.join("index.html"));
        let static_dir = ServeDir::new(&self.config.static_dir);
        let static_dir = if self.config.history_api_fallback {
            static_dir.not_found_service(fallback_file)
        } else {
            static_dir.not_found_service(ServeFile::new(self.config.build_dir.join("404.html")))
        };
        let files = ServeDir::new(&self.config.build_dir).fallback(static_dir);

        let router = Router::new()
            .route(RELOAD_SOCKET_PATH, get(ws_handler))
            .route(RELOAD_SCRIPT_PATH, get(reload_script_handler))
            .fallback_service(files)
            .with_state(self.hub.clone());

        if self.config.hot {
            router.layer(middleware::map_response(inject_reload_script))
        } else {
            router
        }
    }

    /// Start the development server.
    pub async fn start(self) -> Result<(), ServerError> {
        let addr_str = format!("{}:{}", self.config.host, self.config.port);
        let addr: SocketAddr = addr_str
            .parse()
            .map_err(|_| ServerError::InvalidAddress(addr_str.clone()))?;

        // Set up file watcher
        let patterns = WatchPatterns::new(&self.config.root, &self.config.watch_files)?;
        let (watcher, mut rx) = FileWatcher::new(&self.config.watch_dirs, patterns)
            .map_err(|e| ServerError::WatchError(e.to_string()))?;

        // Spawn file watch handler
        let hub = self.hub.clone();
        let rebuild = self.rebuild.clone();
        let hot = self.config.hot;
        let build_lock = Arc::new(Mutex::new(()));
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                handle_watch_event(&hub, rebuild.clone(), &build_lock, hot, event).await;
            }
            // Keep watcher alive
            drop(watcher);
        });

        let app = self.router();

        tracing::info!("Starting dev server at http://{}", addr);

        // Open browser if configured
        if self.config.open {
            let url = format!("http://{}", addr);
            let _ = open::that(&url);
        }

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindError(addr, e.to_string()))?;

        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::BindError(addr, e.to_string()))?;

        Ok(())
    }
}

/// Rebuild after a change and tell browsers about it.
///
/// Rebuilds never overlap: the generated style file assumes a single writer.
async fn handle_watch_event(
    hub: &ReloadHub,
    rebuild: Option<RebuildHook>,
    build_lock: &Mutex<()>,
    hot: bool,
    event: WatchEvent,
) {
    tracing::info!("Changed: {}", event.path().display());

    let Some(rebuild) = rebuild else {
        if hot {
            hub.send(ReloadMessage::Reload);
        }
        return;
    };

    let _guard = build_lock.lock().await;
    let result = tokio::task::spawn_blocking(move || rebuild())
        .await
        .unwrap_or_else(|e| Err(format!("rebuild task failed: {}", e)));

    match result {
        Ok(()) if hot => {
            tracing::debug!("Reloading {} connected clients", hub.subscriber_count());
            hub.send(ReloadMessage::Reload);
        }
        Ok(()) => {}
        Err(message) => {
            tracing::warn!("Rebuild failed: {}", message);
            hub.send(ReloadMessage::BuildFailed { message });
        }
    }
}

/// Handler for the reload WebSocket endpoint.
async fn ws_handler(ws: WebSocketUpgrade, State(hub): State<ReloadHub>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, hub))
}

/// Handle a WebSocket connection.
async fn handle_ws(mut socket: WebSocket, hub: ReloadHub) {
    let mut rx = hub.subscribe();

    if send_message(&mut socket, &ReloadMessage::Connected)
        .await
        .is_err()
    {
        return;
    }

    // Forward reload messages to the client
    while let Ok(msg) = rx.recv().await {
        if send_message(&mut socket, &msg).await.is_err() {
            break;
        }
    }
}

async fn send_message(socket: &mut WebSocket, msg: &ReloadMessage) -> Result<(), axum::Error> {
    let json = serde_json::to_string(msg).map_err(axum::Error::new)?;
    socket.send(Message::Text(json.into())).await
}

/// Handler for the reload client script.
async fn reload_script_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript")],
        reload_client_script(),
    )
}

/// Add the reload client to HTML responses.
async fn inject_reload_script(response: Response) -> Response {
    let is_html = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("text/html"));
    if !is_html {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("Failed to read response body: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let html = inject_script_tag(&String::from_utf8_lossy(&bytes));
    parts.headers.remove(header::CONTENT_LENGTH);

    Response::from_parts(parts, Body::from(html))
}

/// Insert the reload script tag before `</body>`, or append it.
pub fn inject_script_tag(html: &str) -> String {
    let tag = format!(r#"<script src="{}"></script>"#, RELOAD_SCRIPT_PATH);

    match html.rfind("</body>") {
        Some(pos) => format!("{}{}{}", &html[..pos], tag, &html[pos..]),
        None => format!("{}{}", html, tag),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn creates_server_with_default_config() {
        let server = DevServer::new(DevServerConfig::default());
        assert_eq!(server.config.port, 8888);
        assert!(server.config.history_api_fallback);
    }

    #[test]
    fn injects_before_closing_body() {
        let html = inject_script_tag("<html><body><h1>Hi</h1></body></html>");

        assert_eq!(
            html,
            "<html><body><h1>Hi</h1><script src=\"/__reload.js\"></script></body></html>"
        );
    }

    #[test]
    fn appends_when_body_is_missing() {
        let html = inject_script_tag("<h1>Hi</h1>");

        assert!(html.ends_with("<script src=\"/__reload.js\"></script>"));
    }

    #[tokio::test]
    async fn injects_into_html_responses_only() {
        let html = Response::builder()
            .header(header::CONTENT_TYPE, "text/html; charset=utf-8")
            .header(header::CONTENT_LENGTH, "20")
            .body(Body::from("<body>page</body>"))
            .unwrap();
        let css = Response::builder()
            .header(header::CONTENT_TYPE, "text/css")
            .body(Body::from("body{}"))
            .unwrap();

        let html = inject_reload_script(html).await;
        let css = inject_reload_script(css).await;

        assert!(html.headers().get(header::CONTENT_LENGTH).is_none());
        let html_body = axum::body::to_bytes(html.into_body(), usize::MAX).await.unwrap();
        let css_body = axum::body::to_bytes(css.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&html_body).contains("/__reload.js"));
        assert_eq!(&css_body[..], b"body{}");
    }

    #[tokio::test]
    async fn failed_rebuild_is_broadcast() {
        let hub = ReloadHub::new();
        let mut rx = hub.subscribe();
        let lock = Mutex::new(());
        let hook: RebuildHook = Arc::new(|| Err("broken page".to_string()));

        handle_watch_event(
            &hub,
            Some(hook),
            &lock,
            true,
            WatchEvent::Modified(PathBuf::from("src/pages/home.page")),
        )
        .await;

        assert_eq!(
            rx.try_recv().unwrap(),
            ReloadMessage::BuildFailed {
                message: "broken page".to_string()
            }
        );
    }

    #[tokio::test]
    async fn successful_rebuild_reloads() {
        let temp = tempdir().unwrap();
        let marker = temp.path().join("rebuilt");
        let hub = ReloadHub::new();
        let mut rx = hub.subscribe();
        let lock = Mutex::new(());
        let hook_marker = marker.clone();
        let hook: RebuildHook = Arc::new(move || {
            fs::write(&hook_marker, "ok").map_err(|e| e.to_string())
        });

        handle_watch_event(
            &hub,
            Some(hook),
            &lock,
            true,
            WatchEvent::Created(PathBuf::from("src/base.pcss")),
        )
        .await;

        assert!(marker.exists());
        assert_eq!(rx.try_recv().unwrap(), ReloadMessage::Reload);
    }
}
