//! Throwaway API server for tests.

use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::header::LOCATION;
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::http::{Endpoint, RequestDescriptor};

#[derive(Clone)]
pub enum Reply {
    Fixed {
        status: u16,
        chunks: Vec<String>,
        delay: Option<Duration>,
    },
    Stream,
    Redirect(String),
}

impl Reply {
    pub fn chunks(status: u16, chunks: &[&str]) -> Self {
        Reply::Fixed {
            status,
            chunks: chunks.iter().map(|c| c.to_string()).collect(),
            delay: None,
        }
    }

    pub fn json(status: u16, value: serde_json::Value) -> Self {
        Reply::Fixed {
            status,
            chunks: vec![value.to_string()],
            delay: None,
        }
    }

    pub fn delayed(self, by: Duration) -> Self {
        match self {
            Reply::Fixed { status, chunks, .. } => Reply::Fixed { status, chunks, delay: Some(by) },
            other => other,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Recorded {
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
}

/// Server side of one open streaming response.
pub struct Feed {
    pub query: Option<String>,
    tx: mpsc::UnboundedSender<Result<Bytes, Infallible>>,
}

impl Feed {
    pub fn send(&self, text: &str) {
        let _ = self.tx.send(Ok(Bytes::from(text.to_string())));
    }

    /// Resolves once the server has stopped writing this response.
    pub async fn closed(&self) {
        self.tx.closed().await
    }
}

struct Shared {
    routes: Mutex<HashMap<String, Reply>>,
    requests: Mutex<Vec<Recorded>>,
    feeds: mpsc::UnboundedSender<Feed>,
}

pub struct TestServer {
    addr: SocketAddr,
    shared: Arc<Shared>,
    feeds: tokio::sync::Mutex<mpsc::UnboundedReceiver<Feed>>,
}

impl TestServer {
    pub async fn start() -> Self {
        let (feeds_tx, feeds_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            routes: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
            feeds: feeds_tx,
        });
        let app = Router::new().fallback(handle).with_state(shared.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self {
            addr,
            shared,
            feeds: tokio::sync::Mutex::new(feeds_rx),
        }
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint {
            scheme: "http".into(),
            host: self.addr.ip().to_string(),
            port: self.addr.port(),
        }
    }

    pub fn get(&self, path: &str) -> RequestDescriptor {
        RequestDescriptor::get(&self.endpoint(), path)
    }

    pub fn reply(&self, path: &str, reply: Reply) {
        self.shared.routes.lock().unwrap().insert(path.to_string(), reply);
    }

    /// Serve `path` as an open-ended stream; each connection shows up in [`TestServer::next_stream`].
    pub fn open_stream(&self, path: &str) {
        self.reply(path, Reply::Stream);
    }

    /// Serve `?watch=true` requests on `path` as open-ended streams.
    pub fn open_watch(&self, path: &str) {
        self.reply(&format!("{path}?watch"), Reply::Stream);
    }

    pub async fn next_stream(&self) -> Feed {
        self.feeds.lock().await.recv().await.expect("server stopped")
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.shared.requests.lock().unwrap().clone()
    }
}

/// A port nothing listens on.
pub async fn closed_port() -> u16 {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

async fn handle(State(shared): State<Arc<Shared>>, uri: Uri, headers: HeaderMap) -> Response {
    shared.requests.lock().unwrap().push(Recorded {
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        authorization: headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    });

    let key = match uri.query() {
        Some(q) if q.contains("watch=true") => format!("{}?watch", uri.path()),
        _ => uri.path().to_string(),
    };
    let reply = shared.routes.lock().unwrap().get(&key).cloned();
    match reply {
        None => (StatusCode::NOT_FOUND, "no route").into_response(),
        Some(Reply::Fixed { status, chunks, delay }) => {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            let body = futures::stream::iter(
                chunks
                    .into_iter()
                    .map(|c| Ok::<_, Infallible>(Bytes::from(c)))
                    .collect::<Vec<_>>(),
            );
            let status = StatusCode::from_u16(status).unwrap();
            (status, Body::from_stream(body)).into_response()
        }
        Some(Reply::Stream) => {
            let (tx, rx) = mpsc::unbounded_channel();
            let _ = shared.feeds.send(Feed {
                query: uri.query().map(str::to_string),
                tx,
            });
            Body::from_stream(UnboundedReceiverStream::new(rx)).into_response()
        }
        Some(Reply::Redirect(location)) => {
            (StatusCode::FOUND, [(LOCATION, location)], "").into_response()
        }
    }
}
