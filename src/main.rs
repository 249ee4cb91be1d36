use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use comment_board::api::{self, SecurityConfig};
use comment_board::client::HttpCommentService;
use comment_board::config::{Config, DEFAULT_PORT};
use comment_board::db;
use comment_board::models::{BoardId, CommentId};
use comment_board::paste::content_type_for;
use comment_board::session::{LogNotifier, Outcome, SessionController};
use comment_board::tree_render::render_tree;

#[derive(Parser)]
#[command(name = "cboard")]
#[command(about = "Threaded comment boards from the command line")]
struct Cli {
    /// API base URL (overrides COMMENT_BOARD_URL)
    #[arg(long, global = true)]
    url: Option<String>,

    /// Acting user id (overrides COMMENT_BOARD_ACTOR)
    #[arg(long, global = true)]
    actor: Option<String>,

    /// Bearer API key (overrides COMMENT_BOARD_API_KEY)
    #[arg(long, global = true)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the comment board server
    Serve {
        /// Port for HTTP API
        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,

        /// SQLite database path
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Print a board's comment thread
    Tree {
        #[arg(short, long)]
        board: BoardId,
    },
    /// Post a top-level comment
    Post {
        #[command(flatten)]
        compose: Compose,
    },
    /// Reply to a comment
    Reply {
        /// Comment to reply to
        #[arg(long)]
        to: CommentId,

        #[command(flatten)]
        compose: Compose,
    },
    /// Edit one of your comments
    Edit {
        #[arg(long)]
        id: CommentId,

        /// Remove the comment's existing attachments
        #[arg(long)]
        drop_files: bool,

        #[command(flatten)]
        compose: Compose,
    },
    /// Delete one of your comments and its replies
    Delete {
        #[arg(short, long)]
        board: BoardId,

        #[arg(long)]
        id: CommentId,

        /// Skip the confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Args)]
struct Compose {
    #[arg(short, long)]
    board: BoardId,

    #[arg(short, long)]
    text: String,

    /// Image to paste into the comment (repeatable)
    #[arg(long = "image")]
    images: Vec<PathBuf>,
}

/// Initialize tracing to stderr so command output stays clean on stdout
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG")
            .unwrap_or_else(|_| "comment_board=debug,tower_http=debug".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = Config::from_env().with_overrides(cli.url, cli.api_key, cli.actor);

    match cli.command {
        Commands::Serve { port, db: db_path } => {
            let db = match db_path.or_else(|| config.db_path.clone()) {
                Some(path) => db::Database::open(path)?,
                None => db::Database::open_default()?,
            };
            db.migrate()?;

            let mut security = SecurityConfig::from_env();
            security.api_key = config.api_key.clone();
            let app = api::create_router_with_security(db, security);

            let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
            tracing::info!("Comment board server listening on http://127.0.0.1:{}", port);

            axum::serve(listener, app).await?;
        }
        Commands::Tree { board } => {
            let mut session = open_session(&config, board, false);
            expect_applied(session.refresh().await, "fetch comments")?;
            print!("{}", render_tree(session.tree()));
        }
        Commands::Post { compose } => {
            let mut session = open_session(&config, compose.board, false);
            paste_images(&mut session, &compose.images)?;
            let comment = expect_applied(
                session.create_comment(&compose.text).await,
                "post comment",
            )?;
            println!("Posted comment #{}", comment.id);
        }
        Commands::Reply { to, compose } => {
            let mut session = open_session(&config, compose.board, false);
            expect_applied(session.refresh().await, "fetch comments")?;
            session.start_reply(to);
            paste_images(&mut session, &compose.images)?;
            let comment = expect_applied(
                session.submit_reply(&compose.text).await,
                "post reply",
            )?;
            println!("Posted reply #{} to #{}", comment.id, to);
        }
        Commands::Edit {
            id,
            drop_files,
            compose,
        } => {
            let mut session = open_session(&config, compose.board, false);
            expect_applied(session.refresh().await, "fetch comments")?;
            if session.record(id).is_none() {
                anyhow::bail!("Comment #{} not found on board {}", id, compose.board);
            }
            session.start_edit(id);
            paste_images(&mut session, &compose.images)?;
            let keep = if drop_files {
                Vec::new()
            } else {
                session.kept_file_ids()
            };
            let comment = expect_applied(
                session.save_edit(&compose.text, keep).await,
                "save edit",
            )?;
            println!("Updated comment #{}", comment.id);
        }
        Commands::Delete { board, id, yes } => {
            let mut session = open_session(&config, board, yes);
            match session.delete(id).await {
                Outcome::Skipped => println!("Not deleted"),
                outcome => {
                    expect_applied(outcome, "delete comment")?;
                    println!("Deleted comment #{}", id);
                }
            }
        }
    }

    Ok(())
}

fn open_session(config: &Config, board: BoardId, assume_yes: bool) -> SessionController {
    SessionController::new(
        board,
        Arc::new(HttpCommentService::from_config(config)),
        Arc::new(LogNotifier::new(assume_yes)),
    )
}

fn paste_images(session: &mut SessionController, images: &[PathBuf]) -> anyhow::Result<()> {
    for path in images {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("Invalid image path {}", path.display()))?;
        let content_type = content_type_for(name)
            .with_context(|| format!("Unsupported image type: {}", name))?;
        let data =
            std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        if !session.paste_image(name, content_type, data) {
            anyhow::bail!("Could not attach {}", name);
        }
    }
    Ok(())
}

fn expect_applied<T>(outcome: Outcome<T>, action: &str) -> anyhow::Result<T> {
    match outcome {
        Outcome::Applied(value) => Ok(value),
        Outcome::Skipped => anyhow::bail!("Nothing to {}: text is empty", action),
        Outcome::Failed(e) => Err(anyhow::Error::new(e).context(format!("Failed to {}", action))),
        Outcome::Stale => anyhow::bail!("Failed to {}: session moved on", action),
    }
}
