//! A canned-response HTTP server for exercising the fetch paths in tests.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use url::Url;

#[derive(Clone)]
struct Response {
    status: u16,
    content_type: &'static str,
    body: Vec<u8>,
}

/// Paths and what to answer them with. Unknown paths get a 404.
#[derive(Default)]
pub(crate) struct MockSite {
    routes: HashMap<String, Response>,
}

impl MockSite {
    pub(crate) fn page(self, path: &str, html: &str) -> Self {
        self.route(path, 200, "text/html; charset=utf-8", html.as_bytes().to_vec())
    }

    pub(crate) fn image(self, path: &str, bytes: Vec<u8>) -> Self {
        self.route(path, 200, "image/png", bytes)
    }

    pub(crate) fn status(self, path: &str, status: u16) -> Self {
        self.route(path, status, "text/plain", b"nope".to_vec())
    }

    fn route(mut self, path: &str, status: u16, content_type: &'static str, body: Vec<u8>) -> Self {
        self.routes.insert(path.to_string(), Response { status, content_type, body });
        self
    }

    /// Start answering on a random local port. Returns the site root.
    pub(crate) async fn serve(self) -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("failed to bind mock site");
        let port = listener.local_addr().unwrap().port();
        let routes = Arc::new(self.routes);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(respond(stream, routes.clone()));
            }
        });
        Url::parse(&format!("http://127.0.0.1:{port}/")).unwrap()
    }
}

async fn respond(mut stream: TcpStream, routes: Arc<HashMap<String, Response>>) {
    let mut request = Vec::new();
    let mut buf = [0u8; 4096];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => request.extend_from_slice(&buf[..n]),
        }
    }
    let request = String::from_utf8_lossy(&request);
    let path = request.split_whitespace().nth(1).unwrap_or("/");
    let response = routes.get(path).cloned().unwrap_or(Response {
        status: 404,
        content_type: "text/plain",
        body: b"not found".to_vec(),
    });
    let head = format!(
        "HTTP/1.1 {} Canned\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        response.status,
        response.content_type,
        response.body.len()
    );
    _ = stream.write_all(head.as_bytes()).await;
    _ = stream.write_all(&response.body).await;
    _ = stream.shutdown().await;
}

/// A client that ignores proxy settings from the environment.
pub(crate) fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
