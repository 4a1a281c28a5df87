use std::io::{self, Read};
use std::net::SocketAddr;
use std::path::PathBuf;

use uuid::Uuid;

use super::commands::Remote;
use crate::client::{HttpNoteApi, NoteApi, NoteClient, SortKey, SortOrder};
use crate::config::Config;
use crate::entity::{CreateNote, Note, NoteType, NoteUpdate};
use crate::error::{MurmurError, Result};
use crate::server::{self, JwtService};
use crate::service::ImageUpload;

type Client = NoteClient<HttpNoteApi>;

fn connect(remote: &Remote) -> Client {
    NoteClient::new(HttpNoteApi::new(remote.server.clone(), remote.token.clone()))
}

/// Accept a full UUID or a unique prefix of one
async fn resolve_id(client: &Client, id: &str) -> Result<Uuid> {
    let id = id.trim();
    if id.is_empty() {
        return Err(MurmurError::validation("Note ID cannot be empty"));
    }

    if let Ok(uuid) = Uuid::parse_str(id) {
        return Ok(uuid);
    }

    client.refresh().await?;
    let prefix = id.to_lowercase();
    let matches: Vec<Uuid> = client
        .all()
        .iter()
        .map(|n| n.id)
        .filter(|uuid| uuid.to_string().starts_with(&prefix))
        .collect();

    match matches.as_slice() {
        [uuid] => Ok(*uuid),
        [] => Err(MurmurError::NotFound(id.to_string())),
        many => Err(MurmurError::validation(format!(
            "Ambiguous note ID '{}' matches {} notes",
            id,
            many.len()
        ))),
    }
}

fn read_stdin() -> Result<Option<String>> {
    let mut content = String::new();
    io::stdin().read_to_string(&mut content)?;
    Ok((!content.is_empty()).then_some(content))
}

fn short_id(id: &Uuid) -> String {
    id.to_string()[..8].to_string()
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_summary(verb: &str, note: &Note) {
    println!("{} note ({}) - {}", verb, short_id(&note.id), note.title);
}

fn print_note(note: &Note) {
    println!("Note ({})", note.id);
    println!("Title: {}", note.title);
    println!("Type: {}", note.note_type);
    if note.note_type == NoteType::Audio {
        println!("Recorded: {}s", note.recorded_time);
    }
    println!("Created: {}", note.timestamp.format("%Y-%m-%d %H:%M"));
    if note.is_favorite {
        println!("Favorite: yes");
    }
    if let Some(ref url) = note.image_url {
        println!("Image: {}", url);
    }
    println!("\n{}", note.content);
}

pub async fn handle_serve(bind: Option<SocketAddr>, data_dir: Option<PathBuf>) -> Result<()> {
    let mut config = Config::from_env()?;
    if let Some(bind) = bind {
        config.bind = bind;
    }
    if let Some(data_dir) = data_dir {
        config.data_dir = data_dir;
    }
    server::serve(config).await
}

pub fn handle_token(subject: String, hours: i64) -> Result<()> {
    if hours <= 0 {
        return Err(MurmurError::validation("Token lifetime must be at least one hour"));
    }

    let config = Config::from_env()?;
    let jwt = JwtService::new(config.require_secret()?, config.jwt_issuer.clone());
    println!("{}", jwt.create_token(&subject, hours)?);
    Ok(())
}

pub async fn handle_list(
    remote: &Remote,
    search: Option<String>,
    sort: Option<SortKey>,
    order: SortOrder,
    favorites: bool,
    json: bool,
) -> Result<()> {
    let client = connect(remote);
    client.refresh().await?;

    if let Some(term) = search {
        client.search(&term);
    }
    if let Some(key) = sort {
        client.sort(key, order);
    }
    client.show_favorites(favorites);

    let notes = client.notes();
    if json {
        return print_json(&notes);
    }

    if notes.is_empty() {
        println!("No notes found.");
        return Ok(());
    }

    println!("Notes:\n");
    for n in notes {
        let marker = if n.is_favorite { " *" } else { "" };
        println!(
            "  ({}) [{}] {}{}  {}",
            short_id(&n.id),
            n.note_type,
            n.title,
            marker,
            n.timestamp.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

pub async fn handle_add(
    remote: &Remote,
    title: String,
    content: Option<String>,
    stdin: bool,
    note_type: NoteType,
    recorded_time: Option<i64>,
    json: bool,
) -> Result<()> {
    let content = if stdin { read_stdin()? } else { content };

    let draft = CreateNote {
        title: Some(title),
        content,
        note_type: Some(note_type.to_string()),
        recorded_time,
    };

    let client = connect(remote);
    let note = client.create(draft).await?;

    if json {
        print_json(&note)
    } else {
        print_summary("Created", &note);
        Ok(())
    }
}

pub async fn handle_get(remote: &Remote, id: String, json: bool) -> Result<()> {
    let client = connect(remote);
    let uuid = resolve_id(&client, &id).await?;

    let note = match client.get(&uuid) {
        Some(note) => note,
        None => client.api().get(uuid).await?,
    };

    if json {
        print_json(&note)
    } else {
        print_note(&note);
        Ok(())
    }
}

pub async fn handle_edit(
    remote: &Remote,
    id: String,
    title: Option<String>,
    content: Option<String>,
    stdin: bool,
    json: bool,
) -> Result<()> {
    let content = if stdin { read_stdin()? } else { content };
    let update = NoteUpdate { title, content };
    if update.is_empty() {
        return Err(MurmurError::validation(
            "Nothing to update: pass --title or --content",
        ));
    }

    let client = connect(remote);
    let uuid = resolve_id(&client, &id).await?;
    let note = client.update(uuid, update).await?;

    if json {
        print_json(&note)
    } else {
        print_summary("Updated", &note);
        Ok(())
    }
}

pub async fn handle_delete(remote: &Remote, id: String, force: bool) -> Result<()> {
    let client = connect(remote);
    let uuid = resolve_id(&client, &id).await?;

    // Confirm deletion unless --force is used
    if !force {
        let label = client
            .get(&uuid)
            .map(|n| format!("({}) - {}", short_id(&n.id), n.title))
            .unwrap_or_else(|| format!("({})", short_id(&uuid)));
        eprintln!("Delete note {}? [y/N] ", label);

        if atty::is(atty::Stream::Stdin) {
            let mut input = String::new();
            io::stdin().read_line(&mut input)?;
            if !input.trim().eq_ignore_ascii_case("y") {
                println!("Cancelled.");
                return Ok(());
            }
        } else {
            return Err(MurmurError::validation(
                "Use --force to delete in non-interactive mode",
            ));
        }
    }

    client.delete(uuid).await?;
    println!("Deleted note ({})", short_id(&uuid));
    Ok(())
}

pub async fn handle_favorite(remote: &Remote, id: String, json: bool) -> Result<()> {
    let client = connect(remote);
    let uuid = resolve_id(&client, &id).await?;
    let note = client.toggle_favorite(uuid).await?;

    if json {
        print_json(&note)
    } else {
        let verb = if note.is_favorite {
            "Favorited"
        } else {
            "Unfavorited"
        };
        print_summary(verb, &note);
        Ok(())
    }
}

pub async fn handle_attach(remote: &Remote, id: String, path: PathBuf, json: bool) -> Result<()> {
    let upload = ImageUpload::from_path(&path).await?;

    let client = connect(remote);
    let uuid = resolve_id(&client, &id).await?;
    let note = client.attach_image(uuid, upload).await?;

    if json {
        print_json(&note)
    } else {
        print_summary("Attached image to", &note);
        if let Some(ref url) = note.image_url {
            println!("  {}", url);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline() -> Client {
        // Nothing listens on the discard port; blank ids must fail before any request.
        connect(&Remote {
            server: "http://127.0.0.1:9".to_string(),
            token: None,
        })
    }

    #[tokio::test]
    async fn test_blank_id_rejected_without_request() {
        let client = offline();
        for id in ["", "   "] {
            let err = resolve_id(&client, id).await.unwrap_err();
            assert!(
                matches!(err, MurmurError::Validation(ref m) if m == "Note ID cannot be empty"),
                "unexpected error for {id:?}: {err}"
            );
        }
        assert!(client.last_error().is_none());
    }

    #[tokio::test]
    async fn test_full_uuid_resolves_without_request() {
        let client = offline();
        let id = Uuid::new_v4();
        assert_eq!(resolve_id(&client, &id.to_string()).await.unwrap(), id);
    }
}
