use clap::Parser;
use murmur::cli::{
    handle_add, handle_attach, handle_delete, handle_edit, handle_favorite, handle_get,
    handle_list, handle_serve, handle_token, Cli, Commands,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Logs go to stderr so `--json` output stays clean on stdout.
fn init_tracing(default_filter: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr),
        )
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let remote = cli.remote;

    match cli.command {
        Commands::Serve { .. } => init_tracing("info,murmur=debug,tower_http=debug"),
        _ => init_tracing("warn"),
    }

    let result = match cli.command {
        Commands::Serve { bind, data_dir } => handle_serve(bind, data_dir).await,
        Commands::Token { subject, hours } => handle_token(subject, hours),
        Commands::List {
            search,
            sort,
            order,
            favorites,
            json,
        } => handle_list(&remote, search, sort, order, favorites, json).await,
        Commands::Add {
            title,
            content,
            stdin,
            note_type,
            recorded_time,
            json,
        } => handle_add(&remote, title, content, stdin, note_type, recorded_time, json).await,
        Commands::Get { id, json } => handle_get(&remote, id, json).await,
        Commands::Edit {
            id,
            title,
            content,
            stdin,
            json,
        } => handle_edit(&remote, id, title, content, stdin, json).await,
        Commands::Delete { id, force } => handle_delete(&remote, id, force).await,
        Commands::Favorite { id, json } => handle_favorite(&remote, id, json).await,
        Commands::Attach { id, path, json } => handle_attach(&remote, id, path, json).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
