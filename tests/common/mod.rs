#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::State;
use axum::http::header::{ACCEPT, CONTENT_TYPE, HeaderName};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use tokio::net::TcpListener;

/// One request as the mock proxy saw it
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub accept: Option<String>,
    pub content_type: Option<String>,
    pub body: String,
}

impl Recorded {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

type Routes = HashMap<(String, String), (StatusCode, String)>;

/// In-process stand-in for the REST proxy: canned responses keyed by method
/// and path, every request recorded.
#[derive(Clone, Default)]
pub struct MockProxy {
    routes: Arc<Mutex<Routes>>,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl MockProxy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(self, method: &str, path: &str, status: u16, body: &str) -> Self {
        self.routes.lock().unwrap().insert(
            (method.to_string(), path.to_string()),
            (StatusCode::from_u16(status).unwrap(), body.to_string()),
        );
        self
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last(&self) -> Recorded {
        self.requests().last().cloned().expect("no request recorded")
    }

    /// Binds to a free local port and returns the base URL.
    pub async fn start(&self) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = Router::new().fallback(respond).with_state(self.clone());

        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        format!("http://{}", addr)
    }
}

async fn respond(
    State(mock): State<MockProxy>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, String) {
    let header = |name: HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    mock.requests.lock().unwrap().push(Recorded {
        method: method.to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        accept: header(ACCEPT),
        content_type: header(CONTENT_TYPE),
        body,
    });

    mock.routes
        .lock()
        .unwrap()
        .get(&(method.to_string(), uri.path().to_string()))
        .cloned()
        .unwrap_or((
            StatusCode::NOT_FOUND,
            r#"{"error_code":40401,"message":"not mocked"}"#.to_string(),
        ))
}
