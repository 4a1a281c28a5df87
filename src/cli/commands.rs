use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::client::{SortKey, SortOrder};
use crate::entity::NoteType;

#[derive(Parser, Debug)]
#[command(name = "murmur")]
#[command(version, about = "A small notes service for text, audio and image notes")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub remote: Remote,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where client commands send their requests
#[derive(Args, Debug, Clone)]
pub struct Remote {
    /// Base URL of a running murmur server
    #[arg(
        long,
        global = true,
        env = "MURMUR_SERVER",
        default_value = "http://127.0.0.1:4000"
    )]
    pub server: String,

    /// Bearer token (see `murmur token`)
    #[arg(long, global = true, env = "MURMUR_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the notes HTTP server
    Serve {
        /// Address to listen on (overrides MURMUR_BIND)
        #[arg(long)]
        bind: Option<SocketAddr>,

        /// Directory for the database and uploads (overrides MURMUR_DATA_DIR)
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },

    /// Mint a bearer token signed with JWT_SECRET
    Token {
        /// Token subject
        #[arg(long, default_value = "murmur")]
        subject: String,

        /// Lifetime in hours
        #[arg(long, default_value_t = 24)]
        hours: i64,
    },

    /// List notes, newest first
    List {
        /// Only notes whose title or content contains this text
        #[arg(long, short = 's')]
        search: Option<String>,

        /// Sort by name or date
        #[arg(long)]
        sort: Option<SortKey>,

        /// Sort direction (asc, desc)
        #[arg(long, default_value = "asc")]
        order: SortOrder,

        /// Only favorites
        #[arg(long)]
        favorites: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Add a new note
    Add {
        /// Note title
        title: String,

        /// Note content
        #[arg(long, short = 'c', conflicts_with = "stdin")]
        content: Option<String>,

        /// Read content from stdin
        #[arg(long)]
        stdin: bool,

        /// Note type (text, audio)
        #[arg(long = "type", default_value = "text", value_parser = parse_note_type)]
        note_type: NoteType,

        /// Recording length in seconds (audio notes)
        #[arg(long)]
        recorded_time: Option<i64>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a single note
    Get {
        /// Note ID (full UUID or a unique prefix)
        id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Change a note's title and/or content
    Edit {
        /// Note ID (full UUID or a unique prefix)
        id: String,

        /// New title
        #[arg(long)]
        title: Option<String>,

        /// New content
        #[arg(long, short = 'c', conflicts_with = "stdin")]
        content: Option<String>,

        /// Read new content from stdin
        #[arg(long)]
        stdin: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete a note
    Delete {
        /// Note ID (full UUID or a unique prefix)
        id: String,

        /// Skip confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
    },

    /// Toggle a note's favorite flag
    Favorite {
        /// Note ID (full UUID or a unique prefix)
        id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Attach an image file to a note
    Attach {
        /// Note ID (full UUID or a unique prefix)
        id: String,

        /// Image file to upload
        path: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Case-insensitive on the command line; the server only takes exact names.
fn parse_note_type(s: &str) -> Result<NoteType, String> {
    s.trim().to_lowercase().parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_list_with_sort() {
        let cli = Cli::try_parse_from([
            "murmur", "list", "--sort", "name", "--order", "desc", "--favorites",
        ])
        .unwrap();
        match cli.command {
            Commands::List {
                sort,
                order,
                favorites,
                ..
            } => {
                assert_eq!(sort, Some(SortKey::Name));
                assert_eq!(order, SortOrder::Desc);
                assert!(favorites);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_add_audio() {
        let cli = Cli::try_parse_from([
            "murmur",
            "add",
            "memo",
            "--type",
            "audio",
            "--recorded-time",
            "42",
            "-c",
            "words",
            "--server",
            "http://example.test",
        ])
        .unwrap();
        assert_eq!(cli.remote.server, "http://example.test");
        match cli.command {
            Commands::Add {
                note_type,
                recorded_time,
                content,
                ..
            } => {
                assert_eq!(note_type, NoteType::Audio);
                assert_eq!(recorded_time, Some(42));
                assert_eq!(content.as_deref(), Some("words"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_note_type_flag_is_case_insensitive() {
        let cli = Cli::try_parse_from(["murmur", "add", "t", "--type", "AUDIO"]).unwrap();
        match cli.command {
            Commands::Add { note_type, .. } => assert_eq!(note_type, NoteType::Audio),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_note_type_rejected() {
        assert!(Cli::try_parse_from(["murmur", "add", "t", "--type", "video"]).is_err());
    }
}
