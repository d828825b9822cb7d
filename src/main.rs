use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use inkdrop::editor::{EditorSession, NoteSaver};
use inkdrop::models::{NoteUpdate, NotebookDraft};
use inkdrop::pipeline::{self, SortKey, plain_text, preview};
use inkdrop::{
    Backend, Config, DEFAULT_RECENT_LIMIT, Note, NoteDraft, NoteId, NoteService, NotebookId,
    ServiceError, logging, utils,
};
use thiserror::Error;

/// inkdrop - notes with notebooks, tags and autosave
#[derive(Parser)]
#[command(name = "inkdrop")]
#[command(about = "A note-taking tool with notebooks, tags and a terminal UI")]
#[command(version)]
struct Cli {
    /// Storage backend: sqlite, memory or remote (overrides INKDROP_BACKEND)
    #[arg(long, global = true, value_name = "BACKEND")]
    backend: Option<Backend>,

    /// SQLite database file (overrides INKDROP_DB)
    #[arg(long, global = true, value_name = "PATH")]
    db: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Add a new note
    Add(AddCommand),
    /// List notes
    List(ListCommand),
    /// Show one note
    Show { id: i64 },
    /// Search titles, text, tags and attachment names
    Search { query: String },
    /// Show the most recently modified notes
    Recent {
        #[arg(short, long, default_value_t = DEFAULT_RECENT_LIMIT)]
        limit: usize,
    },
    /// Pin or unpin a note
    Pin { id: i64 },
    /// Delete a note
    Delete { id: i64 },
    /// Add or remove tags on a note
    Tag(TagCommand),
    /// Replace a note's content through the autosave editor
    Edit(EditCommand),
    /// Attach files to a note; images are shown inline
    Attach {
        id: i64,
        /// Files to attach, up to 10 MB each
        #[arg(required = true, value_name = "PATH")]
        paths: Vec<PathBuf>,
    },
    /// List notebooks
    Notebooks,
    /// Create a notebook
    NotebookAdd {
        name: String,
        #[arg(long)]
        color: Option<String>,
    },
    /// Delete a notebook; its notes are kept
    NotebookDelete { id: i64 },
    /// List tags with note counts
    Tags,
    /// Open the terminal UI
    Tui,
}

#[derive(Args)]
struct AddCommand {
    /// Title of the note
    #[arg(value_name = "TITLE")]
    title: String,

    /// HTML content of the note
    #[arg(short, long)]
    content: Option<String>,

    /// Comma-separated tags to apply to the note
    #[arg(short, long, value_name = "TAGS")]
    tags: Option<String>,

    /// Notebook to file the note in
    #[arg(short, long, value_name = "ID")]
    notebook: Option<i64>,
}

#[derive(Args)]
struct ListCommand {
    /// Only notes matching this text
    #[arg(short, long)]
    query: Option<String>,

    /// Sort order: created, updated, title or pinned
    #[arg(short, long, default_value_t = SortKey::Updated)]
    sort: SortKey,

    /// Only notes in this notebook
    #[arg(short, long, value_name = "ID")]
    notebook: Option<i64>,
}

#[derive(Args)]
struct TagCommand {
    id: i64,

    /// Comma-separated tags to add
    #[arg(long, value_name = "TAGS")]
    add: Option<String>,

    /// Comma-separated tags to remove
    #[arg(long, value_name = "TAGS")]
    remove: Option<String>,
}

#[derive(Args)]
struct EditCommand {
    id: i64,

    /// New HTML content
    #[arg(long)]
    content: String,
}

/// An error caused by the user's input rather than the system.
#[derive(Debug, Error)]
#[error("{0}")]
struct UsageError(String);

fn main() {
    let cli = Cli::parse();

    let result = run(cli);

    if let Err(e) = result {
        let exit_code = if is_user_error(&e) { 1 } else { 2 };
        eprintln!("Error: {e:#}");
        std::process::exit(exit_code);
    }
}

/// User errors are bad input and references to missing notes or notebooks.
/// Everything else (storage, network, terminal) is internal.
fn is_user_error(error: &anyhow::Error) -> bool {
    error.chain().any(|cause| {
        cause.is::<UsageError>()
            || cause
                .downcast_ref::<ServiceError>()
                .is_some_and(ServiceError::is_not_found)
    })
}

fn run(cli: Cli) -> Result<()> {
    let mut config = Config::from_env().context("Invalid configuration")?;
    if let Some(backend) = cli.backend {
        config = config.with_backend(backend);
    }
    if let Some(path) = cli.db {
        config = config.with_db_path(path);
    }

    if matches!(cli.command, Commands::Tui) {
        logging::init_file(&utils::get_log_path()?, cli.verbose)?;
    } else {
        logging::init_stderr(cli.verbose);
    }

    let store = config.open_store()?;
    let service = NoteService::new(store);

    match cli.command {
        Commands::Add(cmd) => execute_add(&service, cmd),
        Commands::List(cmd) => execute_list(&service, cmd),
        Commands::Show { id } => execute_show(&service, NoteId::new(id)),
        Commands::Search { query } => execute_search(&service, &query),
        Commands::Recent { limit } => {
            print_notes(&service.get_recent(limit));
            Ok(())
        }
        Commands::Pin { id } => {
            let note = service.toggle_pin(NoteId::new(id))?;
            let state = if note.is_pinned { "pinned" } else { "unpinned" };
            println!("Note {} {state}", note.id);
            Ok(())
        }
        Commands::Delete { id } => {
            service.delete(NoteId::new(id))?;
            println!("Note {id} deleted");
            Ok(())
        }
        Commands::Tag(cmd) => execute_tag(&service, cmd),
        Commands::Edit(cmd) => execute_edit(&service, cmd, config.autosave_idle),
        Commands::Attach { id, paths } => execute_attach(&service, NoteId::new(id), &paths),
        Commands::Notebooks => {
            for nb in service.notebooks().list() {
                println!("{:>4}  {:<24} {} ({} notes)", nb.id.get(), nb.name, nb.color, nb.note_count);
            }
            Ok(())
        }
        Commands::NotebookAdd { name, color } => {
            if name.trim().is_empty() {
                return Err(UsageError("Notebook name cannot be empty".to_string()).into());
            }
            let mut draft = NotebookDraft::named(name);
            if let Some(color) = color {
                draft = draft.with_color(color);
            }
            let notebook = service.notebooks().create(draft)?;
            println!("Notebook created (id: {})", notebook.id);
            Ok(())
        }
        Commands::NotebookDelete { id } => {
            service.notebooks().delete(NotebookId::new(id))?;
            println!("Notebook {id} deleted");
            Ok(())
        }
        Commands::Tags => {
            for tag in service.tag_summary() {
                println!("{:>4}  {}", tag.count, tag.name);
            }
            Ok(())
        }
        Commands::Tui => inkdrop::tui::run(service, config.autosave_idle),
    }
}

fn execute_add(service: &NoteService, cmd: AddCommand) -> Result<()> {
    if cmd.title.trim().is_empty() {
        return Err(UsageError("Note title cannot be empty".to_string()).into());
    }

    let mut draft = NoteDraft::titled(cmd.title);
    if let Some(content) = cmd.content {
        draft = draft.with_content(content);
    }
    if let Some(id) = cmd.notebook {
        draft = draft.in_notebook(NotebookId::new(id));
    }
    let tags = cmd.tags.as_deref().map(parse_tags).unwrap_or_default();
    let note = service
        .create(draft.with_tags(tags))
        .context("Failed to create note")?;

    print!("Note created (id: {})", note.id);
    if !note.tags.is_empty() {
        print!(" with tags: {}", note.tags.as_slice().join(", "));
    }
    println!();

    Ok(())
}

fn execute_list(service: &NoteService, cmd: ListCommand) -> Result<()> {
    let source = match cmd.notebook {
        Some(id) => service.get_by_notebook(NotebookId::new(id)),
        None => service.list(),
    };
    let query = cmd.query.unwrap_or_default();
    print_notes(&pipeline::filter_and_sort(&source, &query, cmd.sort));
    Ok(())
}

fn execute_show(service: &NoteService, id: NoteId) -> Result<()> {
    let note = service.get_by_id(id)?;
    let notebook = service
        .notebooks()
        .get_by_id(note.notebook_id)
        .map_or_else(|_| note.notebook_id.to_string(), |nb| nb.name);

    println!("{}{}", note.title, if note.is_pinned { " (pinned)" } else { "" });
    println!("Notebook: {notebook}");
    if !note.tags.is_empty() {
        println!("Tags: {}", note.tags.as_slice().join(", "));
    }
    println!("Created: {}  Modified: {}", note.created_at, note.updated_at);
    println!();
    println!("{}", plain_text(&note.content));
    for file in note.images.iter().chain(&note.attachments) {
        println!("  [{}] {} ({} bytes)", file.mime_type, file.name, file.size);
    }
    Ok(())
}

fn execute_search(service: &NoteService, query: &str) -> Result<()> {
    if query.trim().is_empty() {
        return Err(UsageError("Search query cannot be empty".to_string()).into());
    }
    let notes = service.search(query);
    if notes.is_empty() {
        println!("No notes match '{query}'");
    }
    print_notes(&notes);
    Ok(())
}

fn execute_tag(service: &NoteService, cmd: TagCommand) -> Result<()> {
    let id = NoteId::new(cmd.id);
    let mut tags = service.get_by_id(id)?.tags;
    for tag in cmd.add.as_deref().map(parse_tags).unwrap_or_default() {
        tags.insert(&tag);
    }
    for tag in cmd.remove.as_deref().map(parse_tags).unwrap_or_default() {
        tags.remove(&tag);
    }

    let note = service.update(id, &NoteUpdate::tags(tags.iter()))?;
    println!("Note {} tags: {}", note.id, note.tags.as_slice().join(", "));
    Ok(())
}

/// Runs the content change through an editor session and flushes it, the
/// same path the terminal UI uses.
fn execute_edit(service: &NoteService, cmd: EditCommand, idle: Duration) -> Result<()> {
    let note = service.get_by_id(NoteId::new(cmd.id))?;
    let saver: Arc<dyn NoteSaver> = Arc::new(service.clone());

    let mut session = EditorSession::open(saver, &note, idle);
    session.edit(cmd.content);
    session
        .flush(Duration::from_secs(30))
        .context("Failed to save note")?;
    println!("Note {} saved", note.id);
    Ok(())
}

fn execute_attach(service: &NoteService, id: NoteId, paths: &[PathBuf]) -> Result<()> {
    let attached = service.attach(id, paths)?;
    for skipped in &attached.skipped {
        eprintln!("Skipped: {skipped}");
    }
    if attached.added.is_empty() {
        return Err(UsageError("No files were attached".to_string()).into());
    }
    for file in &attached.added {
        println!("Attached {} ({}, {} bytes)", file.name, file.mime_type, file.size);
    }
    Ok(())
}

fn print_notes(notes: &[Note]) {
    for note in notes {
        let pin = if note.is_pinned { "*" } else { " " };
        println!(
            "{:>4} {pin} {:<32} {}",
            note.id.get(),
            note.title,
            preview(&plain_text(&note.content), 48)
        );
    }
}

/// Parses comma-separated tags, trimming whitespace and dropping empty
/// entries.
fn parse_tags(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
