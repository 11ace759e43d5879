//! Shared harness for API integration tests.
//!
//! The conversion engine is replaced by a bash script invoked as
//! `bash <script> <options...> <input> <output>`; progress events go to an
//! in-process [`EventBus`] instead of Redis.

#![allow(dead_code)]

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use pdfrelay_api::config::ServerConfig;
use pdfrelay_api::router::build_app_router;
use pdfrelay_api::state::AppState;
use pdfrelay_core::event::ProgressEvent;
use pdfrelay_events::{ChannelMessage, EventBus, ProgressChannel, ProgressPublisher, RedisConfig};
use pdfrelay_worker::{EngineConfig, JobRunner, ScratchSpace};
use tempfile::TempDir;
use tokio::sync::broadcast;
use tower::ServiceExt;

pub const CHANNEL: &str = "ocr-progress";
pub const BOUNDARY: &str = "pdfrelay-test-boundary";

/// Engine that reports three pages and "converts" by prefixing `OCR:`.
pub const THREE_PAGE_ENGINE: &str = "\
for p in 0 1 2; do echo \"   $((p+1)) Rotations for page $p: 0.00\" >&2; done
{ printf 'OCR:'; cat \"$in\"; } > \"$out\"
";

/// Engine that reports one page, then dies.
pub const CRASHING_ENGINE: &str = "\
echo 'Rotations for page 0: 0.00' >&2
echo 'Segmentation fault' >&2
exit 139
";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config(scratch_root: PathBuf, engine: EngineConfig) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        debug: true,
        cors_origins: vec!["*".to_string()],
        max_upload_bytes: 1024 * 1024,
        job_timeout_secs: 30,
        scratch_root,
        scratch_max_age_secs: 3600,
        scratch_reap_interval_secs: 300,
        engine,
        redis: RedisConfig {
            host: "localhost".to_string(),
            port: 6379,
            password: String::new(),
        },
        redis_channel: CHANNEL.to_string(),
    }
}

pub struct TestApp {
    pub router: Router,
    pub rx: broadcast::Receiver<ChannelMessage>,
    scratch_root: TempDir,
    work: TempDir,
}

impl TestApp {
    /// App whose engine runs `engine_body`, publishing to an in-process bus.
    pub fn new(engine_body: &str) -> Self {
        Self::build(engine_body, None, |_| {})
    }

    /// Full control: optionally replace the progress channel, and adjust
    /// the configuration before the router is built.
    pub fn build(
        engine_body: &str,
        channel: Option<Arc<dyn ProgressChannel>>,
        customize: impl FnOnce(&mut ServerConfig),
    ) -> Self {
        let scratch_root = tempfile::tempdir().expect("scratch root");
        let work = tempfile::tempdir().expect("work dir");

        let marker = work.path().join("engine-launched");
        let script = work.path().join("engine.sh");
        let mut f = std::fs::File::create(&script).expect("create engine script");
        writeln!(f, "#!/bin/bash").unwrap();
        writeln!(f, "touch '{}'", marker.display()).unwrap();
        writeln!(f, "in=\"${{@: -2:1}}\"; out=\"${{@: -1}}\"").unwrap();
        write!(f, "{engine_body}").unwrap();
        drop(f);

        let engine = EngineConfig::new("bash", vec![script.to_string_lossy().into_owned()]);
        let mut config = test_config(scratch_root.path().to_path_buf(), engine);
        customize(&mut config);

        let bus = Arc::new(EventBus::default());
        let rx = bus.subscribe();
        let channel: Arc<dyn ProgressChannel> = match channel {
            Some(channel) => channel,
            None => bus,
        };

        let state = AppState {
            publisher: Arc::new(ProgressPublisher::new(channel, config.redis_channel.clone())),
            runner: Arc::new(JobRunner::new(
                config.engine.clone(),
                std::time::Duration::from_secs(config.job_timeout_secs),
            )),
            scratch: Arc::new(ScratchSpace::new(config.scratch_root.clone())),
            config: Arc::new(config),
        };

        Self {
            router: build_app_router(state),
            rx,
            scratch_root,
            work,
        }
    }

    /// Send a request through the full middleware stack.
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        let request = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    /// POST a multipart form built from `parts` to `/`.
    pub async fn upload(&self, parts: &[Part<'_>]) -> Response<Body> {
        self.send(multipart_request(parts)).await
    }

    /// Whether the engine process was started at least once.
    pub fn engine_launched(&self) -> bool {
        self.work.path().join("engine-launched").exists()
    }

    /// Entries currently left in the scratch root.
    pub fn scratch_entries(&self) -> Vec<String> {
        std::fs::read_dir(self.scratch_root.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    }

    /// Wait up to `within` for the next progress event.
    pub async fn next_event(&mut self, within: std::time::Duration) -> Option<ProgressEvent> {
        let msg = tokio::time::timeout(within, self.rx.recv()).await.ok()?.ok()?;
        assert_eq!(msg.channel, CHANNEL);
        Some(serde_json::from_str(&msg.payload).expect("event JSON"))
    }

    /// Progress events published so far, on the expected channel.
    pub fn drain_events(&mut self) -> Vec<ProgressEvent> {
        let mut events = Vec::new();
        while let Ok(msg) = self.rx.try_recv() {
            assert_eq!(msg.channel, CHANNEL);
            events.push(serde_json::from_str(&msg.payload).expect("event JSON"));
        }
        events
    }
}

/// One multipart form part.
pub enum Part<'a> {
    File { filename: &'a str, content: &'a [u8] },
    Text { name: &'a str, value: &'a str },
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::File { filename, content } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
                         Content-Type: application/pdf\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(content);
            }
            Part::Text { name, value } => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}").as_bytes(),
                );
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn multipart_request(parts: &[Part<'_>]) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_text(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Page numbers in the order they were published.
pub fn pages(events: &[ProgressEvent]) -> Vec<i64> {
    events.iter().map(|e| e.page).collect()
}
