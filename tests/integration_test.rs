use std::process::{Command, Output};

use murmur::client::{SortKey, SortOrder};
use murmur::entity::{CreateNote, Note, NoteUpdate};
use murmur::server::{build_router, AppState};
use murmur::service::ImageUpload;
use murmur::{Config, Freshness, HttpNoteApi, MurmurError, NoteClient};
use tempfile::TempDir;
use uuid::Uuid;

const SECRET: &str = "integration_secret";

fn murmur_cmd() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_murmur"));
    cmd.env_remove("MURMUR_SERVER")
        .env_remove("MURMUR_TOKEN")
        .env_remove("JWT_SECRET")
        .env("RUST_LOG", "error");
    cmd
}

/// A real server on an ephemeral port, running on its own thread
struct TestServer {
    url: String,
    token: String,
    _tmp: TempDir,
}

fn spawn_server() -> TestServer {
    let tmp = TempDir::new().unwrap();
    let config = Config::with_secret(tmp.path(), SECRET);
    let state = AppState::from_config(&config).unwrap();
    let token = state.jwt.create_token("tester", 1).unwrap();
    let router = build_router(state, &config).unwrap();

    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.set_nonblocking(true).unwrap();
    let addr = listener.local_addr().unwrap();

    std::thread::spawn(move || {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async move {
            let listener = tokio::net::TcpListener::from_std(listener).unwrap();
            axum::serve(listener, router).await.unwrap();
        });
    });

    TestServer {
        url: format!("http://{}", addr),
        token,
        _tmp: tmp,
    }
}

impl TestServer {
    fn run(&self, args: &[&str]) -> Output {
        murmur_cmd()
            .arg("--server")
            .arg(&self.url)
            .arg("--token")
            .arg(&self.token)
            .args(args)
            .output()
            .unwrap()
    }

    fn run_json<T: serde::de::DeserializeOwned>(&self, args: &[&str]) -> T {
        let output = self.run(args);
        assert!(
            output.status.success(),
            "command {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        serde_json::from_slice(&output.stdout).unwrap()
    }

    fn api(&self) -> HttpNoteApi {
        HttpNoteApi::new(self.url.clone(), Some(self.token.clone()))
    }
}

#[test]
fn test_token_without_secret_fails() {
    let tmp = TempDir::new().unwrap();

    let output = murmur_cmd()
        .current_dir(tmp.path())
        .args(["token"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("JWT_SECRET must be set"));
}

#[test]
fn test_token_is_accepted_by_server() {
    let tmp = TempDir::new().unwrap();
    let server = spawn_server();

    let output = murmur_cmd()
        .current_dir(tmp.path())
        .env("JWT_SECRET", SECRET)
        .args(["token", "--subject", "cli-user", "--hours", "2"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    assert_eq!(token.split('.').count(), 3);

    let output = murmur_cmd()
        .args(["list", "--json", "--server", &server.url, "--token", &token])
        .output()
        .unwrap();
    assert!(output.status.success());
    let notes: Vec<Note> = serde_json::from_slice(&output.stdout).unwrap();
    assert!(notes.is_empty());
}

#[test]
fn test_list_without_token_is_unauthorized() {
    let server = spawn_server();

    let output = murmur_cmd()
        .args(["list", "--server", &server.url])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Unauthorized"));
}

#[test]
fn test_unreachable_server_reports_error() {
    let output = murmur_cmd()
        .args(["list", "--server", "http://127.0.0.1:9", "--token", "x"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error:"));
}

#[test]
fn test_edit_requires_a_change() {
    let output = murmur_cmd()
        .args(["edit", "abc", "--server", "http://127.0.0.1:9"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Nothing to update"));
}

#[test]
fn test_full_note_workflow() {
    let tmp = TempDir::new().unwrap();
    let server = spawn_server();

    // Add two notes
    let groceries: Note =
        server.run_json(&["add", "Groceries", "-c", "Milk and eggs", "--json"]);
    let memo: Note = server.run_json(&[
        "add",
        "voice memo",
        "-c",
        "spoken words",
        "--type",
        "audio",
        "--recorded-time",
        "42",
        "--json",
    ]);
    assert_eq!(memo.recorded_time, 42);

    // Audio without a recording length is rejected by the server
    let output = server.run(&["add", "bad memo", "-c", "x", "--type", "audio"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Recorded time is required for audio notes"));

    // Newest first
    let notes: Vec<Note> = server.run_json(&["list", "--json"]);
    assert_eq!(notes.len(), 2);
    assert_eq!(notes[0].id, memo.id);

    // Sorting and search happen client-side
    let sorted: Vec<Note> = server.run_json(&["list", "--sort", "name", "--json"]);
    assert_eq!(sorted[0].title, "Groceries");
    let found: Vec<Note> = server.run_json(&["list", "--search", "MILK", "--json"]);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, groceries.id);

    // Favorite by ID prefix
    let prefix = &groceries.id.to_string()[..8];
    let favorite: Note = server.run_json(&["favorite", prefix, "--json"]);
    assert!(favorite.is_favorite);
    let favorites: Vec<Note> = server.run_json(&["list", "--favorites", "--json"]);
    assert_eq!(favorites.len(), 1);

    // Edit keeps what was not sent
    let edited: Note = server.run_json(&[
        "edit",
        &groceries.id.to_string(),
        "--title",
        "Shopping",
        "--json",
    ]);
    assert_eq!(edited.title, "Shopping");
    assert_eq!(edited.content, "Milk and eggs");
    assert!(edited.is_favorite);

    // Attach an image
    let image = tmp.path().join("receipt.png");
    std::fs::write(&image, [0x89, b'P', b'N', b'G', 0x0d, 0x0a]).unwrap();
    let with_image: Note = server.run_json(&[
        "attach",
        prefix,
        image.to_str().unwrap(),
        "--json",
    ]);
    let url = with_image.image_url.unwrap();
    assert!(url.starts_with("/uploads/"));
    assert!(url.ends_with("-receipt.png"));

    // Non-interactive delete needs --force
    let output = server.run(&["delete", prefix]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--force"));

    let output = server.run(&["delete", prefix, "--force"]);
    assert!(output.status.success());

    let output = server.run(&["get", &groceries.id.to_string()]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Note not found"));

    let notes: Vec<Note> = server.run_json(&["list", "--json"]);
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].id, memo.id);
}

#[tokio::test]
async fn test_http_client_mirrors_server() {
    let server = spawn_server();
    let client = NoteClient::start(server.api()).await;
    assert!(client.all().is_empty());

    let first = client
        .create(CreateNote::text("banana", "yellow fruit"))
        .await
        .unwrap();
    let second = client
        .create(CreateNote::text("Apple", "red fruit"))
        .await
        .unwrap();
    assert_eq!(client.all()[0].id, second.id);

    let toggled = client.toggle_favorite(first.id).await.unwrap();
    assert!(toggled.is_favorite);

    let upload = ImageUpload {
        bytes: vec![1, 2, 3, 4],
        file_name: Some("banana.jpg".to_string()),
        content_type: Some("image/jpeg".to_string()),
    };
    let pictured = client.attach_image(first.id, upload).await.unwrap();
    assert!(pictured.image_url.is_some());
    assert!(pictured.is_favorite);

    client.sort(SortKey::Name, SortOrder::Asc);
    let titles: Vec<String> = client.notes().into_iter().map(|n| n.title).collect();
    assert_eq!(titles, vec!["Apple", "banana"]);

    // A fresh client sees exactly what this one mirrors
    let other = NoteClient::start(server.api()).await;
    assert_eq!(other.all(), client.all());

    client.delete(second.id).await.unwrap();
    assert_eq!(client.load().await, Freshness::Fresh);
    assert_eq!(client.all().len(), 1);
}

#[tokio::test]
async fn test_http_client_maps_errors() {
    let server = spawn_server();
    let client = NoteClient::start(server.api()).await;

    let err = client
        .create(CreateNote {
            title: Some("memo".to_string()),
            content: Some("words".to_string()),
            note_type: Some("audio".to_string()),
            recorded_time: None,
        })
        .await
        .unwrap_err();
    assert!(
        matches!(err, MurmurError::Validation(ref m) if m == "Recorded time is required for audio notes")
    );

    let missing = Uuid::new_v4();
    let update = NoteUpdate {
        title: Some("x".to_string()),
        content: None,
    };
    let err = client.update(missing, update).await.unwrap_err();
    assert!(matches!(err, MurmurError::NotFound(ref id) if *id == missing.to_string()));
    assert!(client.last_error().unwrap().contains("Note not found"));

    // Deleting something that is not there still succeeds
    client.delete(missing).await.unwrap();

    let empty = ImageUpload::default();
    let note = client.create(CreateNote::text("t", "c")).await.unwrap();
    let err = client.attach_image(note.id, empty).await.unwrap_err();
    assert!(matches!(err, MurmurError::Validation(_)));
}

#[tokio::test]
async fn test_http_client_without_token() {
    let server = spawn_server();
    let client = NoteClient::start(HttpNoteApi::new(server.url.clone(), None)).await;

    assert!(client.all().is_empty());
    assert_eq!(client.last_error().as_deref(), Some("Unauthorized"));
    assert_eq!(client.load().await, Freshness::Stale);

    let err = client
        .create(CreateNote::text("t", "c"))
        .await
        .unwrap_err();
    assert!(matches!(err, MurmurError::Unauthorized));
}
