#![allow(dead_code)]

use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use http_body_util::BodyExt;
use image::{ImageFormat, Rgba, RgbaImage};
use tempfile::TempDir;
use tower::ServiceExt;
use url::Url;

use txt2img_gallery::config::{AppConfig, DEFAULT_MAX_CONTENT_LENGTH};
use txt2img_gallery::inference::{InferenceClient, InferenceConfig};
use txt2img_gallery::router::build_router;
use txt2img_gallery::state::AppState;
use txt2img_gallery::storage::LocalFileStorage;
use txt2img_gallery::store::ImageRecordStore;

pub const TEST_API_KEY: &str = "hf_test_key";

// ---------------------------------------------------------------------------
// Image fixtures
// ---------------------------------------------------------------------------

/// Small RGBA PNG, well under the size heuristic threshold.
pub fn tiny_png() -> Vec<u8> {
    encode_png(RgbaImage::from_pixel(8, 8, Rgba([30, 60, 90, 200])))
}

/// RGBA PNG filled with pseudo-random noise so it stays large after
/// compression.
pub fn noisy_png() -> Vec<u8> {
    let mut seed: u32 = 0x1234_5678;
    let image = RgbaImage::from_fn(64, 64, |_, _| {
        seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        let [a, b, c, d] = seed.to_le_bytes();
        Rgba([a, b, c, d])
    });
    encode_png(image)
}

fn encode_png(image: RgbaImage) -> Vec<u8> {
    let mut output = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut output), ImageFormat::Png)
        .unwrap();
    output
}

// ---------------------------------------------------------------------------
// Mock inference service
// ---------------------------------------------------------------------------

/// What the mock upstream answers for a given model.
#[derive(Clone, Debug)]
pub enum MockReply {
    /// 200 with `content-type: image/png`.
    Image(Vec<u8>),
    /// 200 with the bytes and no image content type.
    Raw(Vec<u8>),
    /// 200 with a JSON body.
    Json(String),
    /// Bare status code.
    Status(u16),
    /// Sleep, then answer with a tiny PNG.
    Delay(Duration),
}

type Responder = Arc<dyn Fn(&str) -> MockReply + Send + Sync>;

#[derive(Clone)]
struct MockState {
    responder: Responder,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub model: String,
    pub authorization: Option<String>,
    pub body: serde_json::Value,
}

pub struct MockUpstream {
    pub base_url: Url,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockUpstream {
    pub async fn start<F>(responder: F) -> Self
    where
        F: Fn(&str) -> MockReply + Send + Sync + 'static,
    {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = MockState {
            responder: Arc::new(responder),
            requests: Arc::clone(&requests),
        };
        let app = Router::new()
            .route("/models/{*model}", post(mock_inference))
            .with_state(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self {
            base_url: Url::parse(&format!("http://{addr}/models/")).unwrap(),
            requests,
        }
    }

    /// Upstream that answers every model the same way.
    pub async fn always(reply: MockReply) -> Self {
        Self::start(move |_| reply.clone()).await
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requested_models(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.model).collect()
    }
}

async fn mock_inference(
    State(state): State<MockState>,
    Path(model): Path<String>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Response {
    let model = model.trim_start_matches('/').to_string();
    state.requests.lock().unwrap().push(RecordedRequest {
        model: model.clone(),
        authorization: headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string),
        body: serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null),
    });

    match (state.responder)(&model) {
        MockReply::Image(bytes) => ([(header::CONTENT_TYPE, "image/png")], bytes).into_response(),
        MockReply::Raw(bytes) => {
            let mut response = Response::new(Body::from(bytes));
            response.headers_mut().remove(header::CONTENT_TYPE);
            response
        }
        MockReply::Json(json) => {
            ([(header::CONTENT_TYPE, "application/json")], json).into_response()
        }
        MockReply::Status(code) => StatusCode::from_u16(code).unwrap().into_response(),
        MockReply::Delay(duration) => {
            tokio::time::sleep(duration).await;
            ([(header::CONTENT_TYPE, "image/png")], tiny_png()).into_response()
        }
    }
}

/// Base URL of a port nothing is listening on.
pub async fn closed_port_url() -> Url {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    Url::parse(&format!("http://{addr}/models/")).unwrap()
}

pub fn inference_client(
    base_url: Url,
    api_key: Option<&str>,
    timeout: Duration,
) -> InferenceClient {
    InferenceClient::new(InferenceConfig {
        api_key: api_key.map(str::to_string),
        base_url,
        timeout,
    })
    .unwrap()
}

// ---------------------------------------------------------------------------
// Application under test
// ---------------------------------------------------------------------------

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub upload_dir: TempDir,
}

/// Application state backed by an in-memory store, a scratch upload
/// directory and an inference client pointed at `base_url`.
pub async fn build_test_app(base_url: Url, api_key: Option<&str>) -> TestApp {
    let upload_dir = tempfile::tempdir().unwrap();
    let inference = InferenceConfig {
        api_key: api_key.map(str::to_string),
        base_url,
        timeout: Duration::from_secs(5),
    };
    let config = AppConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        database_url: "sqlite::memory:".to_string(),
        upload_dir: upload_dir.path().to_path_buf(),
        max_content_length: DEFAULT_MAX_CONTENT_LENGTH,
        inference: inference.clone(),
    };
    let state = AppState {
        store: ImageRecordStore::in_memory().await.unwrap(),
        storage: Arc::new(LocalFileStorage::new(upload_dir.path().to_path_buf())),
        inference: Arc::new(InferenceClient::new(inference).unwrap()),
        config: Arc::new(config),
    };
    TestApp {
        router: build_router(state.clone()),
        state,
        upload_dir,
    }
}

impl TestApp {
    pub fn uploaded_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.upload_dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn get(app: &Router, uri: &str) -> Response {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

pub async fn delete(app: &Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn post_json(app: &Router, uri: &str, json: serde_json::Value) -> Response {
    post_raw(app, uri, json.to_string()).await
}

pub async fn post_raw(app: &Router, uri: &str, body: impl Into<String>) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.into()))
        .unwrap();
    send(app, request).await
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub async fn body_text(response: Response) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}
