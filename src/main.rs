//! lectern - terminal EPUB reader

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use lectern::segment::{Piece, segment};
use lectern::{
    Book, ClockScheduler, JsonPositionStore, ReadingSession, RenderOptions, Renderer, SessionEvent, Settings,
    StopReason, linearize, parse_book, search,
};

#[derive(Parser)]
#[command(name = "lectern")]
#[command(version, about = "EPUB reader with paced word-by-word reading", long_about = None)]
#[command(after_help = "EXAMPLES:
    lectern info book.epub               Show book metadata
    lectern markdown book.epub -c 2      Print chapter 3 as Markdown
    lectern search book.epub whale       Find \"whale\" with context
    lectern read book.epub --wpm 350     Read from the saved position")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show book metadata and contents
    Info {
        #[arg(value_name = "BOOK")]
        book: PathBuf,
    },
    /// Print chapters as Markdown
    Markdown {
        #[arg(value_name = "BOOK")]
        book: PathBuf,
        /// Only this chapter (0-based)
        #[arg(short, long)]
        chapter: Option<usize>,
    },
    /// Search the book text
    Search {
        #[arg(value_name = "BOOK")]
        book: PathBuf,
        #[arg(value_name = "QUERY")]
        query: String,
    },
    /// Read the book word by word
    Read {
        #[arg(value_name = "BOOK")]
        book: PathBuf,
        /// Base delay per word in milliseconds
        #[arg(long, conflicts_with = "wpm")]
        pace: Option<u64>,
        /// Base pace in words per minute
        #[arg(long)]
        wpm: Option<u32>,
        /// Words shown at once
        #[arg(short, long)]
        group: Option<usize>,
        /// Start at this word instead of the saved position
        #[arg(long, conflicts_with = "chapter")]
        from: Option<usize>,
        /// Start at the first word of this chapter (0-based)
        #[arg(short, long)]
        chapter: Option<usize>,
        /// Bold the leading part of every word
        #[arg(long)]
        bold: bool,
        /// Settings file (JSON)
        #[arg(long, value_name = "FILE")]
        settings: Option<PathBuf>,
        /// Where reading positions are kept
        #[arg(long, value_name = "FILE", default_value = ".lectern-positions.json")]
        positions: PathBuf,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into()))
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Info { book } => show_info(&book),
        Command::Markdown { book, chapter } => print_markdown(&book, chapter),
        Command::Search { book, query } => run_search(&book, &query),
        Command::Read {
            book,
            pace,
            wpm,
            group,
            from,
            chapter,
            bold,
            settings,
            positions,
        } => {
            let mut loaded = match settings {
                Some(path) => Settings::load(path).map_err(|e| e.to_string()),
                None => Ok(Settings::default()),
            };
            if let Ok(s) = &mut loaded {
                if let Some(pace) = pace {
                    s.pace_ms = pace;
                }
                if let Some(wpm) = wpm {
                    *s = s.clone().with_wpm(wpm);
                }
                if let Some(group) = group {
                    s.word_group_size = group;
                }
                s.fast_reading_font |= bold;
            }
            loaded.and_then(|s| read(&book, s, from, chapter, &positions))
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn open(path: &Path) -> Result<Book, String> {
    parse_book(path).map_err(|e| format!("{}: {e}", path.display()))
}

fn show_info(path: &Path) -> Result<(), String> {
    let book = open(path)?;

    let meta = &book.metadata;
    println!("File: {}", path.display());
    println!("Id: {}", book.id);
    println!("Title: {}", meta.title);
    if !meta.authors.is_empty() {
        println!("Authors: {}", meta.authors.join(", "));
    }
    if !meta.language.is_empty() {
        println!("Language: {}", meta.language);
    }
    if let Some(ref publisher) = meta.publisher {
        println!("Publisher: {publisher}");
    }
    if let Some(ref desc) = meta.description {
        let desc = desc.trim();
        match desc.char_indices().nth(200) {
            Some((cut, _)) => println!("Description: {}...", &desc[..cut]),
            None => println!("Description: {desc}"),
        }
    }
    if let Some(ref cover) = meta.cover_image {
        println!("Cover: {cover}");
    }
    println!("TOC entries: {}", book.toc.len());
    println!("Resources: {}", book.resources.len());
    println!("Chapters: {}", book.chapters.len());
    for (i, title) in book.chapter_titles().iter().enumerate() {
        println!("  {i:>3}  {title}");
    }

    Ok(())
}

fn print_markdown(path: &Path, chapter: Option<usize>) -> Result<(), String> {
    let book = open(path)?;
    match chapter {
        Some(index) => {
            let chapter = book
                .chapters
                .get(index)
                .ok_or_else(|| format!("no chapter {index} (book has {})", book.chapters.len()))?;
            println!("{}", chapter.markdown);
        }
        None => {
            for chapter in &book.chapters {
                println!("{}\n", chapter.markdown);
            }
        }
    }
    Ok(())
}

fn run_search(path: &Path, query: &str) -> Result<(), String> {
    let book = open(path)?;
    let (tree, _) = Renderer::new().render(&book, &RenderOptions::default());
    let stream = linearize(&tree).map_err(|e| e.to_string())?;

    let results = search(&tree, &stream, query);
    for result in &results {
        let title = book
            .chapters
            .get(result.chapter)
            .map(|c| c.title.as_str())
            .unwrap_or("");
        let ordinal = result.ordinal.map(|o| o.to_string()).unwrap_or_else(|| "-".into());
        let preview = result.preview.replace("<mark>", "\x1b[7m").replace("</mark>", "\x1b[0m");
        println!("[{title}] #{ordinal}: {preview}");
    }
    println!("{} match(es)", results.len());
    Ok(())
}

fn read(
    path: &Path,
    settings: Settings,
    from: Option<usize>,
    chapter: Option<usize>,
    positions: &Path,
) -> Result<(), String> {
    let book = open(path)?;
    let store = JsonPositionStore::open(positions).map_err(|e| e.to_string())?;
    let options = RenderOptions::from(&settings);
    let bold = options.bold_fraction;

    let mut session = ReadingSession::new(ClockScheduler::new(), store, settings);
    session.open_document(book.id.clone());
    let (tree, _) = Renderer::new().render(&book, &options);
    session.on_content_ready(tree).map_err(|e| e.to_string())?;

    if from.is_some() || chapter.is_some() {
        session
            .jump_to(from.unwrap_or(0), chapter)
            .map_err(|e| e.to_string())?;
    } else {
        session.toggle_play().map_err(|e| e.to_string())?;
    }

    let mut stdout = std::io::stdout();
    loop {
        for event in session.drain_events() {
            match event {
                SessionEvent::PositionChanged { .. } => {
                    let group = session.current_word_group().unwrap_or_default();
                    let _ = write!(stdout, "\r\x1b[2K{}", style_group(&group, bold));
                    let _ = stdout.flush();
                }
                SessionEvent::PlaybackStopped { reason } => {
                    println!();
                    if reason == StopReason::EndOfDocument {
                        println!("(end of book)");
                    }
                }
                _ => {}
            }
        }
        if !session.is_playing() || !session.scheduler().wait() {
            break;
        }
        session.pump();
    }
    session.close();
    Ok(())
}

/// ANSI-bold the leading part of every word.
fn style_group(group: &str, bold: Option<f32>) -> String {
    let Some(fraction) = bold else {
        return group.to_string();
    };
    segment(group, fraction)
        .into_iter()
        .map(|piece| match piece {
            Piece::Space(space) => space.to_string(),
            Piece::Word { bold, rest } => format!("\x1b[1m{bold}\x1b[0m{rest}"),
        })
        .collect()
}
