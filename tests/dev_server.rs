use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::path::Path;
use std::time::Duration;

use sitepipe::server::files::percent_decode;
use sitepipe::server::{
    content_type, inject_script, resolve, DevServer, ReloadState, Resolved, ServerOptions,
    RELOAD_PATH,
};
use sitepipe_test_utils::builders::ProjectDir;
use sitepipe_test_utils::init_tracing;

/// Minimal HTTP/1.0 GET returning (status, body).
fn get(addr: SocketAddr, path: &str) -> (u16, String) {
    let mut stream = TcpStream::connect(addr).expect("connect to dev server");
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    write!(stream, "GET {path} HTTP/1.0\r\nHost: localhost\r\n\r\n").unwrap();

    let mut raw = String::new();
    stream.read_to_string(&mut raw).unwrap();
    let status = raw
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .expect("status code");
    let body = raw
        .split_once("\r\n\r\n")
        .map(|(_, body)| body.to_string())
        .unwrap_or_default();
    (status, body)
}

fn options(live_reload: bool) -> ServerOptions {
    ServerOptions {
        host: "127.0.0.1".to_string(),
        port: 0,
        live_reload,
        open: false,
    }
}

fn served_site() -> ProjectDir {
    let project = ProjectDir::new();
    project.write("build/index.html", "<html><body><h1>Home</h1></body></html>");
    project.write("build/css/main.css", "body{}");
    project.write("secret.txt", "do not serve");
    project
}

#[test]
fn serves_files_and_directory_index() {
    init_tracing();
    let project = served_site();
    let server = DevServer::start(project.path("build"), options(false)).unwrap();

    let (status, body) = get(server.addr(), "/css/main.css");
    assert_eq!(status, 200);
    assert_eq!(body, "body{}");

    let (status, body) = get(server.addr(), "/");
    assert_eq!(status, 200);
    assert_eq!(body, "<html><body><h1>Home</h1></body></html>");

    let (status, _) = get(server.addr(), "/missing.html");
    assert_eq!(status, 404);

    server.stop();
}

#[test]
fn refuses_to_leave_the_root() {
    let project = served_site();
    let server = DevServer::start(project.path("build"), options(false)).unwrap();

    let (status, body) = get(server.addr(), "/../secret.txt");
    assert!(status == 403 || status == 404, "status {status}");
    assert!(!body.contains("do not serve"));

    let (status, body) = get(server.addr(), "/%2e%2e/secret.txt");
    assert!(status == 403 || status == 404, "status {status}");
    assert!(!body.contains("do not serve"));

    server.stop();
}

#[test]
fn html_gets_reload_script_when_live_reload_is_on() {
    let project = served_site();
    let server = DevServer::start(project.path("build"), options(true)).unwrap();

    let (status, body) = get(server.addr(), "/index.html");
    assert_eq!(status, 200);
    let script_at = body.find(RELOAD_PATH).expect("reload script injected");
    assert!(script_at < body.find("</body>").unwrap());

    let (status, body) = get(server.addr(), RELOAD_PATH);
    assert_eq!(status, 200);
    assert_eq!(body, server.reload_state().current().to_string());

    server.stop();
}

#[test]
fn stop_releases_the_listener() {
    let project = served_site();
    let server = DevServer::start(project.path("build"), options(false)).unwrap();
    let addr = server.addr();
    let (status, _) = get(addr, "/");
    assert_eq!(status, 200);

    server.stop();

    assert!(can_rebind(addr), "port {} still held after stop", addr.port());
}

fn can_rebind(addr: SocketAddr) -> bool {
    // The accept thread may take a moment to drop the socket.
    for _ in 0..50 {
        if std::net::TcpListener::bind(addr).is_ok() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    false
}

#[test]
fn resolve_maps_urls_onto_files() {
    let project = served_site();
    let root = project.path("build");

    assert!(matches!(resolve(&root, "/"), Resolved::File(p) if p.ends_with("index.html")));
    assert!(matches!(resolve(&root, "/css/main.css?v=3"), Resolved::File(_)));
    assert_eq!(resolve(&root, "/../secret.txt"), Resolved::Forbidden);
    assert_eq!(resolve(&root, "/nope"), Resolved::NotFound);
}

#[test]
fn script_is_injected_before_closing_body() {
    let page = inject_script("<html><BODY>x</BODY></html>");
    let script_at = page.find("<script>").unwrap();
    assert!(script_at < page.find("</BODY>").unwrap());
    assert!(page.ends_with("</BODY></html>"));

    let fragment = inject_script("<p>no body</p>");
    assert!(fragment.starts_with("<p>no body</p><script>"));
}

#[test]
fn reload_generation_counts_up() {
    let state = ReloadState::new();
    assert_eq!(state.current(), 0);
    assert_eq!(state.bump(), 1);
    assert_eq!(state.bump(), 2);
    assert_eq!(state.current(), 2);
}

#[test]
fn content_types_and_decoding() {
    assert_eq!(content_type(Path::new("a.css")), "text/css; charset=utf-8");
    assert_eq!(content_type(Path::new("a.HTML")), "text/html; charset=utf-8");
    assert_eq!(content_type(Path::new("a.woff2")), "font/woff2");
    assert_eq!(content_type(Path::new("a.unknown")), "application/octet-stream");

    assert_eq!(percent_decode("/a%20b.html").as_deref(), Some("/a b.html"));
    assert_eq!(percent_decode("/bad%zz"), None);
}

#[test]
fn writes_into_the_served_root_bump_the_generation() {
    init_tracing();
    let project = served_site();
    let server = DevServer::start(project.path("build"), options(true)).unwrap();
    let before = server.reload_state().current();

    std::thread::sleep(Duration::from_millis(100));
    project.write("build/index.html", "<html><body><h1>Changed</h1></body></html>");

    let mut waited = Duration::ZERO;
    while server.reload_state().current() == before && waited < Duration::from_secs(5) {
        std::thread::sleep(Duration::from_millis(20));
        waited += Duration::from_millis(20);
    }
    assert!(server.reload_state().current() > before);

    server.stop();
}
