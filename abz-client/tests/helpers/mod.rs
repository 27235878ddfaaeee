//! Shared test fixtures: fake extractor, stub tag reader, capture server

#![allow(dead_code)]

use abz_client::extractors::IdentifierSource;
use abz_common::config::parse_toml_config;
use abz_common::Settings;
use axum::extract::{Path as UrlPath, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;
use std::collections::HashMap;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use uuid::Uuid;

pub const MBID_A: &str = "b1a9c0e9-d987-4042-ae91-78d6a3267d69";
pub const MBID_B: &str = "5b11f4ce-a62d-471e-81fc-a69a8278c7da";
pub const MBID_C: &str = "0f4c7a43-51a1-4d2b-9a2c-3e0b2d9e6c11";

/// Fake extractor behaviour, keyed on the input file name:
/// - `*fail*`: exit 1
/// - `*sigint*`: killed by SIGINT, as on Ctrl+C in a terminal
/// - `*bad*`: exit 0 with an empty document
/// - `*suffix*`: write to `<output>.json`
/// - codec from extension: flac → flac, wav → pcm_s16le, else mp3
///
/// Every invocation appends the input path to `calls.txt`.
const EXTRACTOR_SCRIPT: &str = r#"#!/bin/sh
echo "$1" >> "@CALLS@"
name=$(basename "$1")
case "$name" in
  *fail*) exit 1 ;;
  *sigint*) kill -INT $$ ;;
esac
out="$2"
case "$name" in
  *suffix*) out="$2.json" ;;
esac
case "$name" in
  *bad*) : > "$out"; exit 0 ;;
  *.flac) codec=flac ;;
  *.wav) codec=pcm_s16le ;;
  *) codec=mp3 ;;
esac
printf '{"lowlevel":{"average_loudness":0.8},"metadata":{"version":{"essentia":"2.1-beta2","essentia_build_sha":"stale"},"audio_properties":{"codec":"%s","length":120.5}}}' "$codec" > "$out"
"#;

/// Recording ids served from a fixed table
#[derive(Default)]
pub struct StubIdentifiers {
    ids: HashMap<PathBuf, Uuid>,
}

impl StubIdentifiers {
    pub fn with(mut self, path: &Path, id: &str) -> Self {
        self.ids.insert(path.to_path_buf(), Uuid::parse_str(id).unwrap());
        self
    }
}

impl IdentifierSource for StubIdentifiers {
    fn recording_id(&self, path: &Path) -> Option<Uuid> {
        self.ids.get(path).copied()
    }
}

/// One received submission
#[derive(Debug, Clone)]
pub struct Submission {
    pub mbid: String,
    pub body: serde_json::Value,
}

#[derive(Clone)]
struct ServerState {
    submissions: Arc<Mutex<Vec<Submission>>>,
    status: StatusCode,
    body: &'static str,
}

/// Local HTTP server standing in for AcousticBrainz
pub struct CaptureServer {
    pub addr: SocketAddr,
    submissions: Arc<Mutex<Vec<Submission>>>,
}

impl CaptureServer {
    pub async fn start(status: StatusCode, body: &'static str) -> Self {
        let submissions = Arc::new(Mutex::new(Vec::new()));
        let state = ServerState {
            submissions: Arc::clone(&submissions),
            status,
            body,
        };

        let app = Router::new()
            .route("/:mbid/low-level", post(receive))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, submissions }
    }

    pub async fn ok() -> Self {
        Self::start(StatusCode::OK, "").await
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.submissions.lock().unwrap().clone()
    }
}

async fn receive(
    State(state): State<ServerState>,
    UrlPath(mbid): UrlPath<String>,
    body: String,
) -> (StatusCode, &'static str) {
    let body = serde_json::from_str(&body).unwrap_or(serde_json::Value::Null);
    state.submissions.lock().unwrap().push(Submission { mbid, body });
    (state.status, state.body)
}

/// Temp workspace: music dir, fake extractor, database, temp output dir
pub struct TestEnv {
    pub root: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        let env = Self {
            root: TempDir::new().unwrap(),
        };
        fs::create_dir_all(env.music_dir()).unwrap();
        fs::create_dir_all(env.scratch_dir()).unwrap();
        env.install_extractor();
        env
    }

    pub fn music_dir(&self) -> PathBuf {
        self.root.path().join("music")
    }

    pub fn scratch_dir(&self) -> PathBuf {
        self.root.path().join("scratch")
    }

    pub fn extractor_path(&self) -> PathBuf {
        self.root.path().join("streaming_extractor_music")
    }

    pub fn database_path(&self) -> PathBuf {
        self.root.path().join("filelog.db")
    }

    fn calls_path(&self) -> PathBuf {
        self.root.path().join("calls.txt")
    }

    fn install_extractor(&self) {
        use std::os::unix::fs::PermissionsExt;

        let script = EXTRACTOR_SCRIPT.replace("@CALLS@", &self.calls_path().to_string_lossy());
        let path = self.extractor_path();
        fs::write(&path, script).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    /// Create an (empty) audio file below the music dir
    pub fn add_file(&self, relative: &str) -> PathBuf {
        let path = self.music_dir().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"").unwrap();
        path
    }

    /// Input paths the extractor has been called with
    pub fn extractor_calls(&self) -> Vec<String> {
        fs::read_to_string(self.calls_path())
            .map(|s| s.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Entries left in the scratch dir (extractor outputs not cleaned up)
    pub fn scratch_entries(&self) -> usize {
        fs::read_dir(self.scratch_dir()).unwrap().count()
    }

    pub fn settings(&self, server: &CaptureServer, strict: bool) -> Settings {
        let toml = format!(
            r#"
            [acousticbrainz]
            host = "{host}"
            extensions = ["flac", "mp3", "wav"]
            timeout_secs = 5
            strict_submission = {strict}

            [essentia]
            path = "{extractor}"
            temp_dir = "{scratch}"

            [database]
            path = "{database}"
            "#,
            host = server.addr,
            strict = strict,
            extractor = self.extractor_path().display(),
            scratch = self.scratch_dir().display(),
            database = self.database_path().display(),
        );
        Settings::from_toml(parse_toml_config(&toml).unwrap()).unwrap()
    }
}
