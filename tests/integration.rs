use axum::{
    extract::{Multipart, Path as UrlPath, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

#[derive(Default)]
struct Store {
    records: HashMap<String, (Vec<Value>, Vec<Value>)>,
    uploads: Vec<(String, String)>,
}

type Shared = Arc<Mutex<Store>>;

async fn multipart_fields(mut mp: Multipart) -> Vec<(String, Option<String>, String)> {
    let mut out = Vec::new();
    while let Some(field) = mp.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let text = field.text().await.unwrap();
        out.push((name, file_name, text));
    }
    out
}

fn subject_of(fields: &[(String, Option<String>, String)]) -> String {
    fields
        .iter()
        .find(|(n, _, _)| n == "subject_id")
        .map(|(_, _, v)| v.clone())
        .unwrap_or_default()
}

async fn ingest_sample(State(store): State<Shared>, mp: Multipart) -> Json<Value> {
    let subject = subject_of(&multipart_fields(mp).await);
    let facts = vec![
        json!({"type": "employer", "value": "Acme", "confidence": 0.8, "source": "bio.txt"}),
        json!({"type": "city", "value": "Lisbon", "confidence": 0.6, "source": "bio.txt"}),
    ];
    let prefs = vec![json!({"category": "food", "value": "ramen", "confidence": 0.9, "source": "preferences.txt"})];
    store.lock().unwrap().records.insert(subject, (facts, prefs));
    Json(json!({"facts_count": 2, "preferences_count": 1, "tone": "neutral"}))
}

async fn ingest_files(State(store): State<Shared>, mp: Multipart) -> Json<Value> {
    let fields = multipart_fields(mp).await;
    let subject = subject_of(&fields);
    let mut names = Vec::new();
    let mut store = store.lock().unwrap();
    for (name, file_name, text) in &fields {
        if name == "files" {
            let file_name = file_name.clone().unwrap_or_default();
            store.uploads.push((file_name.clone(), text.clone()));
            names.push(file_name);
        }
    }
    Json(json!({"subject_id": subject, "files": names}))
}

async fn ingest_urls(mp: Multipart) -> Json<Value> {
    let fields = multipart_fields(mp).await;
    let urls: Vec<&String> = fields
        .iter()
        .filter(|(n, _, _)| n == "urls")
        .map(|(_, _, v)| v)
        .collect();
    Json(json!({"subject_id": subject_of(&fields), "urls": urls.len()}))
}

async fn chat(Json(req): Json<Value>) -> Json<Value> {
    let message = req["message"].as_str().unwrap_or_default();
    let audio = if req["voice"].as_bool() == Some(true) && req["voice_id"] != "" {
        json!("/static/reply.mp3")
    } else {
        Value::Null
    };
    Json(json!({
        "reply": format!("You said: {}", message),
        "citations": [{"source": "bio.txt", "snippet": "works at Acme"}],
        "audio_url": audio
    }))
}

async fn get_facts(State(store): State<Shared>, UrlPath(subject): UrlPath<String>) -> Response {
    if subject == "broken" {
        return (StatusCode::INTERNAL_SERVER_ERROR, "storage offline").into_response();
    }
    let store = store.lock().unwrap();
    let (facts, prefs) = store.records.get(&subject).cloned().unwrap_or_default();
    Json(json!({
        "facts": facts,
        "preferences": prefs,
        "style": {"subject_id": subject, "tone": "neutral", "writing_examples": [], "response_tips": ["be concise"]}
    }))
    .into_response()
}

async fn save_facts(
    State(store): State<Shared>,
    UrlPath(subject): UrlPath<String>,
    Json(payload): Json<Value>,
) -> Json<Value> {
    let facts = payload["facts"].as_array().cloned().unwrap_or_default();
    let prefs = payload["preferences"].as_array().cloned().unwrap_or_default();
    let (fc, pc) = (facts.len(), prefs.len());
    store.lock().unwrap().records.insert(subject, (facts, prefs));
    Json(json!({"ok": true, "facts_count": fc, "preferences_count": pc}))
}

async fn start_backend() -> (String, Shared) {
    let store: Shared = Arc::new(Mutex::new(Store::default()));
    let app = Router::new()
        .route("/ingest/sample", post(ingest_sample))
        .route("/ingest/files", post(ingest_files))
        .route("/ingest/urls", post(ingest_urls))
        .route("/chat", post(chat))
        .route("/facts/{subject_id}", get(get_facts).post(save_facts))
        .with_state(store.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), store)
}

fn setup_config(base_url: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let config_dir = tmp.path().join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_content = format!(
        r#"[server]
base_url = "{}"
timeout_secs = 5

[defaults]
sample_subject = "sample"
files_subject = "me"
"#,
        base_url
    );
    let config_path = config_dir.join("mirror.toml");
    fs::write(&config_path, config_content).unwrap();
    (tmp, config_path)
}

async fn run_mirror(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let config_path = config_path.to_path_buf();
    let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
    tokio::task::spawn_blocking(move || {
        let output = Command::new(env!("CARGO_BIN_EXE_mirror"))
            .arg("--config")
            .arg(&config_path)
            .args(&args)
            .output()
            .unwrap_or_else(|e| panic!("Failed to run mirror binary: {}", e));
        (
            String::from_utf8_lossy(&output.stdout).to_string(),
            String::from_utf8_lossy(&output.stderr).to_string(),
            output.status.success(),
        )
    })
    .await
    .unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn test_sample_prints_raw_response() {
    let (base, store) = start_backend().await;
    let (_tmp, config) = setup_config(&base);

    let (stdout, stderr, success) = run_mirror(&config, &["sample", "--subject", "alice"]).await;
    assert!(success, "sample failed: stdout={}, stderr={}", stdout, stderr);
    assert_eq!(
        stdout.trim(),
        r#"{"facts_count":2,"preferences_count":1,"tone":"neutral"}"#
    );
    assert!(store.lock().unwrap().records.contains_key("alice"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_sample_default_subject() {
    let (base, store) = start_backend().await;
    let (_tmp, config) = setup_config(&base);

    let (_, stderr, success) = run_mirror(&config, &["sample"]).await;
    assert!(success, "sample failed: {}", stderr);
    assert!(store.lock().unwrap().records.contains_key("sample"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_ingest_files_uploads_each_file() {
    let (base, store) = start_backend().await;
    let (tmp, config) = setup_config(&base);

    let a = tmp.path().join("bio.txt");
    let b = tmp.path().join("notes.md");
    fs::write(&a, "Works at Acme.").unwrap();
    fs::write(&b, "# Notes\nLikes ramen.").unwrap();

    let (stdout, stderr, success) = run_mirror(
        &config,
        &["ingest", a.to_str().unwrap(), b.to_str().unwrap()],
    )
    .await;
    assert!(success, "ingest failed: stdout={}, stderr={}", stdout, stderr);
    assert_eq!(
        stdout.trim(),
        r#"{"subject_id":"me","files":["bio.txt","notes.md"]}"#
    );

    let store = store.lock().unwrap();
    assert_eq!(store.uploads.len(), 2);
    assert_eq!(store.uploads[0], ("bio.txt".to_string(), "Works at Acme.".to_string()));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_ingest_missing_file_fails() {
    let (base, _store) = start_backend().await;
    let (tmp, config) = setup_config(&base);
    let missing = tmp.path().join("missing.txt");

    let (_, stderr, success) = run_mirror(&config, &["ingest", missing.to_str().unwrap()]).await;
    assert!(!success);
    assert!(stderr.contains("missing.txt"), "stderr={}", stderr);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_ingest_urls() {
    let (base, _store) = start_backend().await;
    let (_tmp, config) = setup_config(&base);

    let (stdout, stderr, success) = run_mirror(
        &config,
        &["ingest-urls", "https://a.example", "https://b.example", "--subject", "bob"],
    )
    .await;
    assert!(success, "ingest-urls failed: {}", stderr);
    assert_eq!(stdout.trim(), r#"{"subject_id":"bob","urls":2}"#);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_chat_prints_reply_and_citations() {
    let (base, _store) = start_backend().await;
    let (_tmp, config) = setup_config(&base);

    let (stdout, stderr, success) = run_mirror(&config, &["chat", "hello"]).await;
    assert!(success, "chat failed: {}", stderr);
    assert!(stdout.starts_with("You said: hello"));
    assert!(stdout.contains("[bio.txt] works at Acme"));
    assert!(!stdout.contains("audio:"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_chat_with_voice_prints_audio_url() {
    let (base, _store) = start_backend().await;
    let (_tmp, config) = setup_config(&base);

    let (stdout, stderr, success) = run_mirror(
        &config,
        &["chat", "hello", "--voice", "--voice-id", "v1"],
    )
    .await;
    assert!(success, "chat failed: {}", stderr);
    assert!(
        stdout.contains(&format!("audio: {}/static/reply.mp3", base)),
        "stdout={}",
        stdout
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_facts_edit_cycle() {
    let (base, store) = start_backend().await;
    let (_tmp, config) = setup_config(&base);

    run_mirror(&config, &["sample", "--subject", "alice"]).await;

    let (stdout, stderr, success) = run_mirror(&config, &["facts", "show", "--subject", "alice"]).await;
    assert!(success, "show failed: {}", stderr);
    assert!(stdout.contains("Loaded 2 facts, 1 preferences"));
    assert!(stdout.contains("employer"));
    assert!(stdout.contains("ramen"));
    assert!(stdout.contains("tone:  neutral"));

    let (stdout, stderr, success) = run_mirror(
        &config,
        &["facts", "add-fact", "pet", "cat", "--confidence", "0.95", "--subject", "alice"],
    )
    .await;
    assert!(success, "add-fact failed: {}", stderr);
    assert_eq!(stdout.trim(), "Saved. Facts: 3, Preferences: 1");

    {
        let store = store.lock().unwrap();
        let (facts, _) = &store.records["alice"];
        assert_eq!(
            facts[2],
            json!({"type": "pet", "value": "cat", "confidence": 0.95, "source": ""})
        );
    }

    let (stdout, stderr, success) =
        run_mirror(&config, &["facts", "remove", "facts", "0", "--subject", "alice"]).await;
    assert!(success, "remove failed: {}", stderr);
    assert_eq!(stdout.trim(), "Saved. Facts: 2, Preferences: 1");

    let (stdout, _, success) =
        run_mirror(&config, &["facts", "add-pref", "music", "jazz", "--subject", "alice"]).await;
    assert!(success);
    assert_eq!(stdout.trim(), "Saved. Facts: 2, Preferences: 2");

    let store = store.lock().unwrap();
    let (facts, prefs) = &store.records["alice"];
    assert_eq!(facts[0]["type"], "city");
    assert_eq!(prefs[1]["confidence"], 0.7);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_facts_remove_out_of_range() {
    let (base, _store) = start_backend().await;
    let (_tmp, config) = setup_config(&base);

    let (_, stderr, success) =
        run_mirror(&config, &["facts", "remove", "prefs", "3", "--subject", "nobody"]).await;
    assert!(!success);
    assert!(stderr.contains("out of range"), "stderr={}", stderr);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_facts_export_import() {
    let (base, store) = start_backend().await;
    let (tmp, config) = setup_config(&base);
    let out = tmp.path().join("alice.json");

    run_mirror(&config, &["sample", "--subject", "alice"]).await;
    let (stdout, stderr, success) = run_mirror(
        &config,
        &["facts", "export", "--subject", "alice", "--out", out.to_str().unwrap()],
    )
    .await;
    assert!(success, "export failed: {}", stderr);
    assert!(stdout.contains("Exported 2 facts, 1 preferences"));

    let (stdout, stderr, success) = run_mirror(
        &config,
        &["facts", "import", out.to_str().unwrap(), "--subject", "bob"],
    )
    .await;
    assert!(success, "import failed: {}", stderr);
    assert_eq!(stdout.trim(), "Saved. Facts: 2, Preferences: 1");

    let store = store.lock().unwrap();
    assert_eq!(store.records["alice"], store.records["bob"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_server_error_is_reported() {
    let (base, _store) = start_backend().await;
    let (_tmp, config) = setup_config(&base);

    let (stdout, stderr, success) =
        run_mirror(&config, &["facts", "show", "--subject", "broken"]).await;
    assert!(!success);
    assert!(stdout.is_empty());
    assert!(stderr.contains("Error: "), "stderr={}", stderr);
    assert!(stderr.contains("500"), "stderr={}", stderr);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unreachable_backend() {
    let (_tmp, config) = setup_config("http://127.0.0.1:9");

    let (_, stderr, success) = run_mirror(&config, &["sample"]).await;
    assert!(!success);
    assert!(stderr.contains("Error: "), "stderr={}", stderr);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_invalid_config_rejected() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("mirror.toml");
    fs::write(&config_path, "[server]\nbase_url = \"localhost\"\n").unwrap();

    let (_, stderr, success) = run_mirror(&config_path, &["sample"]).await;
    assert!(!success);
    assert!(stderr.contains("base_url"), "stderr={}", stderr);
}
