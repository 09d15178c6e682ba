// src/server/mod.rs

//! Development server.
//!
//! Serves the output directory over HTTP from a background thread, with an
//! optional live-reload channel (see [`reload`]).

pub mod files;
pub mod reload;

use std::io::Cursor;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use notify::RecommendedWatcher;
use tiny_http::{Header, Method, Request, Response, Server, StatusCode};
use tracing::{debug, info, warn};

use crate::errors::{BuildError, Result};
use crate::services::BackgroundService;

pub use files::{Resolved, content_type, resolve};
pub use reload::{RELOAD_PATH, ReloadState, inject_script};

const ACCEPT_POLL: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerOptions {
    pub host: String,
    /// `0` picks a free port.
    pub port: u16,
    pub live_reload: bool,
    pub open: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            live_reload: true,
            open: false,
        }
    }
}

pub struct DevServer;

impl DevServer {
    /// Bind, start serving `root` on a background thread and return the
    /// handle that stops it.
    pub fn start(root: impl Into<PathBuf>, options: ServerOptions) -> Result<ServerHandle> {
        let root = root.into();
        if !root.is_dir() {
            std::fs::create_dir_all(&root)?;
        }

        let bind = format!("{}:{}", options.host, options.port);
        let server = Server::http(&bind)
            .map_err(|err| BuildError::Server(format!("failed to bind {bind}: {err}")))?;
        let addr = server
            .server_addr()
            .to_ip()
            .ok_or_else(|| BuildError::Server(format!("{bind} is not an IP listener")))?;
        let server = Arc::new(server);

        let reload = Arc::new(ReloadState::new());
        let reload_watcher = if options.live_reload {
            Some(reload::watch_output(&root, Arc::clone(&reload))?)
        } else {
            None
        };

        let shutdown = Arc::new(AtomicBool::new(false));
        let thread = {
            let server = Arc::clone(&server);
            let shutdown = Arc::clone(&shutdown);
            let handler = Handler {
                root: root.clone(),
                live_reload: options.live_reload,
                reload: Arc::clone(&reload),
            };
            std::thread::Builder::new()
                .name("sitepipe-server".to_string())
                .spawn(move || accept_loop(&server, &shutdown, &handler))?
        };

        let url = format!("http://{addr}/");
        info!(root = ?root, url = %url, live_reload = options.live_reload, "dev server listening");

        if options.open {
            open_browser(&url);
        }

        Ok(ServerHandle {
            addr,
            url,
            root,
            server,
            shutdown,
            thread: Some(thread),
            reload,
            _reload_watcher: reload_watcher,
        })
    }
}

/// A running dev server.
pub struct ServerHandle {
    addr: SocketAddr,
    url: String,
    root: PathBuf,
    server: Arc<Server>,
    shutdown: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
    reload: Arc<ReloadState>,
    _reload_watcher: Option<RecommendedWatcher>,
}

impl std::fmt::Debug for ServerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerHandle")
            .field("addr", &self.addr)
            .field("root", &self.root)
            .field("running", &self.thread.is_some())
            .finish()
    }
}

impl ServerHandle {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn reload_state(&self) -> &Arc<ReloadState> {
        &self.reload
    }

    /// Stop accepting, close the socket and join the server thread.
    pub fn stop(mut self) {
        self.halt();
    }

    fn halt(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        self.shutdown.store(true, Ordering::SeqCst);
        self.server.unblock();
        if thread.join().is_err() {
            warn!(addr = %self.addr, "dev server thread panicked");
        }
        info!(addr = %self.addr, "dev server stopped");
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.halt();
    }
}

impl BackgroundService for ServerHandle {
    fn name(&self) -> &str {
        "server"
    }

    fn stop(self: Box<Self>) {
        ServerHandle::stop(*self);
    }
}

struct Handler {
    root: PathBuf,
    live_reload: bool,
    reload: Arc<ReloadState>,
}

fn accept_loop(server: &Server, shutdown: &AtomicBool, handler: &Handler) {
    while !shutdown.load(Ordering::SeqCst) {
        match server.recv_timeout(ACCEPT_POLL) {
            Ok(Some(request)) => {
                let url = request.url().to_string();
                let response = handler.respond_to(&request);
                debug!(method = %request.method(), url = %url, status = response.status_code().0, "request");
                if let Err(err) = request.respond(response) {
                    debug!(url = %url, error = %err, "client went away");
                }
            }
            Ok(None) => {}
            Err(err) => {
                warn!(error = %err, "dev server stopped accepting connections");
                break;
            }
        }
    }
}

impl Handler {
    fn respond_to(&self, request: &Request) -> Response<Cursor<Vec<u8>>> {
        if !matches!(request.method(), Method::Get | Method::Head) {
            return text(405, "method not allowed");
        }

        let url = request.url();
        if self.live_reload && url.split('?').next() == Some(RELOAD_PATH) {
            let mut response = text(200, &self.reload.current().to_string());
            add_header(&mut response, "Cache-Control", "no-store");
            return response;
        }

        match resolve(&self.root, url) {
            Resolved::File(path) => self.serve_file(&path),
            Resolved::Forbidden => text(403, "forbidden"),
            Resolved::NotFound => text(404, "not found"),
        }
    }

    fn serve_file(&self, path: &Path) -> Response<Cursor<Vec<u8>>> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(path = ?path, error = %err, "failed to read served file");
                return text(500, "failed to read file");
            }
        };

        let bytes = if self.live_reload && files::is_html(path) {
            inject_script(&String::from_utf8_lossy(&bytes)).into_bytes()
        } else {
            bytes
        };

        let mut response = Response::from_data(bytes).with_status_code(StatusCode(200));
        add_header(&mut response, "Content-Type", content_type(path));
        response
    }
}

fn text(status: u16, body: &str) -> Response<Cursor<Vec<u8>>> {
    let mut response =
        Response::from_data(body.as_bytes().to_vec()).with_status_code(StatusCode(status));
    add_header(&mut response, "Content-Type", "text/plain; charset=utf-8");
    response
}

fn add_header(response: &mut Response<Cursor<Vec<u8>>>, name: &str, value: &str) {
    match Header::from_bytes(name.as_bytes(), value.as_bytes()) {
        Ok(header) => response.add_header(header),
        Err(()) => warn!(name, value, "skipping invalid response header"),
    }
}

/// Open `url` in the default browser. Failure only warns.
pub fn open_browser(url: &str) {
    #[cfg(target_os = "macos")]
    let spawned = std::process::Command::new("open").arg(url).spawn();

    #[cfg(target_os = "windows")]
    let spawned = std::process::Command::new("cmd")
        .args(["/C", "start", url])
        .spawn();

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    let spawned = std::process::Command::new("xdg-open").arg(url).spawn();

    match spawned {
        Ok(_) => debug!(url = %url, "opened browser"),
        Err(err) => warn!(url = %url, error = %err, "could not open a browser"),
    }
}
