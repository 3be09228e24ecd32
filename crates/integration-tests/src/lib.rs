//! Shared harness for the HTTP-level tests: the full router wired to
//! in-memory adapters, a manual clock and a mockable media store.

use std::sync::Arc;

use api_adapters::{router, AppComponents, AppState, Metrics, WebSettings};
use auth_adapters::{Argon2PasswordHasher, CookieSigner};
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use chrono::{DateTime, TimeZone, Utc};
use domains::clock::ManualClock;
use domains::models::{AdminUser, Dataset, Feedback};
use domains::ports::{MediaStorage, MockMediaStorage};
use domains::record::FieldInput;
use secrecy::SecretString;
use services::{AuthService, PreviewService, RecordService};
use storage_adapters::{MemoryDocumentStore, MemorySessionStore};
use tower::ServiceExt;

pub const ADMIN_USER: &str = "admin";
pub const ADMIN_PASSWORD: &str = "correct-horse-battery";
pub const BOUNDARY: &str = "nadbench-test-boundary";

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub clock: Arc<ManualClock>,
}

impl TestApp {
    /// App whose media store accepts every upload.
    pub async fn new() -> Self {
        let mut media = MockMediaStorage::new();
        media
            .expect_upload()
            .returning(|key, _, _| Ok(format!("https://media.test/{key}")));
        Self::with_media(media).await
    }

    pub async fn with_media(media: impl MediaStorage + 'static) -> Self {
        let clock = Arc::new(ManualClock::new(start_time()));

        let users = RecordService::new(Arc::new(MemoryDocumentStore::<AdminUser>::new()), clock.clone());
        let auth = AuthService::new(
            users,
            Arc::new(Argon2PasswordHasher::new()),
            Arc::new(MemorySessionStore::new()),
            clock.clone(),
            chrono::Duration::hours(1),
        );
        auth.provision(ADMIN_USER, ADMIN_PASSWORD).await.unwrap();

        let state = AppState::new(AppComponents {
            datasets: RecordService::new(Arc::new(MemoryDocumentStore::<Dataset>::new()), clock.clone()),
            feedback: RecordService::new(Arc::new(MemoryDocumentStore::<Feedback>::new()), clock.clone()),
            auth,
            previews: PreviewService::new(Arc::new(media), 64 * 1024),
            signer: CookieSigner::new(&SecretString::from("integration-secret".to_string())).unwrap(),
            metrics: Metrics::new(),
            settings: WebSettings {
                page_size: 5,
                catalog_page_size: 5,
                ..WebSettings::default()
            },
        });

        Self {
            router: router(state.clone()),
            state,
            clock,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut req = Request::builder().uri(uri);
        if let Some(c) = cookie {
            req = req.header(header::COOKIE, c);
        }
        self.send(req.body(Body::empty()).unwrap()).await
    }

    pub async fn post_form(&self, uri: &str, pairs: &[(&str, &str)], cookie: Option<&str>) -> Response<Body> {
        let body = pairs
            .iter()
            .map(|(k, v)| format!("{}={}", encode(k), encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        let mut req = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(c) = cookie {
            req = req.header(header::COOKIE, c);
        }
        self.send(req.body(Body::from(body)).unwrap()).await
    }

    pub async fn post_multipart(&self, uri: &str, body: Multipart, cookie: Option<&str>) -> Response<Body> {
        let mut req = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"));
        if let Some(c) = cookie {
            req = req.header(header::COOKIE, c);
        }
        self.send(req.body(Body::from(body.finish())).unwrap()).await
    }

    /// Logs in and returns the `Cookie` header value for later requests.
    pub async fn login(&self) -> String {
        let resp = self
            .post_form("/admin/login", &[("username", ADMIN_USER), ("password", ADMIN_PASSWORD)], None)
            .await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        session_cookie(&resp).expect("login sets a session cookie")
    }

    /// Saves a complete dataset through the same path the admin uses.
    pub async fn seed_dataset(&self, name: &str, approved: bool) -> Dataset {
        let mut changes = dataset_changes(name);
        changes.push(("approved", FieldInput::Flag(approved)));
        self.state.datasets.create(&changes).await.unwrap()
    }
}

/// `name=value` of the `Set-Cookie` header, ready to send back.
pub fn session_cookie(resp: &Response<Body>) -> Option<String> {
    let raw = resp.headers().get(header::SET_COOKIE)?.to_str().ok()?;
    raw.split(';').next().map(|kv| kv.trim().to_string())
}

pub fn location(resp: &Response<Body>) -> String {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

pub async fn body_text(resp: Response<Body>) -> String {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    String::from_utf8_lossy(&bytes).into_owned()
}

pub async fn body_json(resp: Response<Body>) -> serde_json::Value {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn dataset_changes(name: &str) -> Vec<(&'static str, FieldInput)> {
    dataset_fields(name)
        .into_iter()
        .map(|(k, v)| {
            let input = if k == "task_type" {
                FieldInput::Tags(v.split(',').map(|t| t.trim().to_string()).collect())
            } else {
                FieldInput::Text(v.to_string())
            };
            (k, input)
        })
        .collect()
}

/// Every required dataset field, as form pairs.
pub fn dataset_fields(name: &str) -> Vec<(&'static str, String)> {
    vec![
        ("name", name.to_string()),
        ("data_type", "image".into()),
        ("phases", "response".into()),
        ("description", format!("{name}, a benchmark built from Sentinel-1 imagery")),
        ("data_source", "Sentinel-1".into()),
        ("size", "12 GB".into()),
        ("timespan", "2015-2020".into()),
        ("geo_coverage", "Global".into()),
        ("published", "2020".into()),
        ("task_type", "segmentation, classification".into()),
        ("topic", "natural disaster".into()),
        ("results", "IoU 0.61".into()),
        ("paper_url", "https://example.org/paper".into()),
        ("reference", "Doe et al. 2020".into()),
    ]
}

/// A `multipart/form-data` body under construction.
#[derive(Default)]
pub struct Multipart {
    body: Vec<u8>,
}

impl Multipart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n").as_bytes(),
        );
        self
    }

    pub fn fields<S: AsRef<str>>(self, pairs: &[(&str, S)]) -> Self {
        pairs.iter().fold(self, |m, (k, v)| m.text(k, v.as_ref()))
    }

    pub fn file(mut self, name: &str, file_name: &str, content_type: &str, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    fn finish(mut self) -> Vec<u8> {
        self.body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        self.body
    }
}

fn encode(s: &str) -> String {
    s.bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => (b as char).to_string(),
            b' ' => "+".to_string(),
            _ => format!("%{b:02X}"),
        })
        .collect()
}
