//! medquiz CLI - run the extraction pipeline from the command line.
//!
//! Usage: medquiz-cli [OPTIONS] <COMMAND>
//!
//! Extracts questions from a book's page range, optionally saving them to
//! the database the server binary reads. Supports JSON output for
//! scripting.

use clap::{Parser, Subcommand};
use medquiz_lib::db::Database;
use medquiz_lib::format::FormatTag;
use medquiz_lib::pdf::Bookshelf;
use medquiz_lib::{ai_extractor, extract, jobs, settings, validator};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "medquiz-cli")]
#[command(version, about = "Medical textbook question extraction CLI", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Database path (default: auto-detect)
    #[arg(long, global = true)]
    db: Option<String>,

    /// Books directory (default: MEDQUIZ_BOOKS or ./books)
    #[arg(long, global = true)]
    books: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract questions from a book's page range
    Extract {
        /// Book filename under the books directory
        book: String,

        /// Inclusive page range, e.g. 120-145
        #[arg(long)]
        pages: String,

        /// Force a format (pretest, virgilio, schwartz, getthrough, rush,
        /// generic) instead of detecting one
        #[arg(long)]
        format: Option<String>,

        /// Print full records as JSON
        #[arg(long)]
        json: bool,

        /// Save extracted questions to the database
        #[arg(long)]
        save: bool,

        /// Skip the generative fallback even when pattern yield is weak
        #[arg(long)]
        no_ai: bool,
    },
    /// Enqueue an extraction job for the server's worker to process
    Enqueue {
        /// Book filename under the books directory
        book: String,

        /// Inclusive page range, e.g. 120-145
        #[arg(long)]
        pages: String,
    },
    /// Store the Anthropic API key used by the generative fallback
    SetKey { key: String },
    /// Show whether an API key is configured
    KeyStatus,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let app_data_dir = dirs::data_dir()
        .map(|p| p.join("com.medquiz.app"))
        .unwrap_or_else(|| PathBuf::from("."));
    settings::init(app_data_dir.clone());

    let exit_code = match cli.command {
        Commands::Extract { book, pages, format, json, save, no_ai } => {
            let books_dir = find_books_dir(cli.books.as_deref());
            let db_path = find_database(cli.db.as_deref(), &app_data_dir);
            cmd_extract(&books_dir, &db_path, &book, &pages, format.as_deref(), json, save, no_ai)
                .await
        }
        Commands::Enqueue { book, pages } => {
            let db_path = find_database(cli.db.as_deref(), &app_data_dir);
            cmd_enqueue(&db_path, &book, &pages)
        }
        Commands::SetKey { key } => match settings::set_api_key(key) {
            Ok(()) => 0,
            Err(e) => {
                eprintln!("Failed to save API key: {}", e);
                1
            }
        },
        Commands::KeyStatus => {
            match settings::get_masked_api_key() {
                Some(masked) => println!("API key configured: {}", masked),
                None => println!("No API key configured (set ANTHROPIC_API_KEY or run set-key)"),
            }
            0
        }
    };

    std::process::exit(exit_code);
}

#[allow(clippy::too_many_arguments)]
async fn cmd_extract(
    books_dir: &Path,
    db_path: &Path,
    book: &str,
    pages: &str,
    format_arg: Option<&str>,
    json: bool,
    save: bool,
    no_ai: bool,
) -> i32 {
    let (start, end) = match jobs::parse_page_range(pages) {
        Ok(range) => range,
        Err(e) => {
            eprintln!("{}", e);
            return 1;
        }
    };

    let shelf = Bookshelf::new(books_dir);
    let text = match shelf.page_range_text(book, start, end) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Failed to extract text: {}", e);
            return 1;
        }
    };

    let (format, questions) = match format_arg {
        Some(name) => match FormatTag::from_str(name) {
            Some(tag) => (tag, extract::extract_all_questions(&text, tag, book)),
            None => {
                eprintln!("Unknown format '{}'", name);
                return 1;
            }
        },
        None => extract::extract_document(&text, book, book),
    };

    let (valid, incomplete) = validator::validate_questions(questions);
    println!(
        "Format {}: {} valid questions, {} incomplete",
        format.as_str(),
        valid.len(),
        incomplete.len()
    );
    if !incomplete.is_empty() {
        jobs::save_incomplete_questions(&incomplete, book);
    }

    let mut final_questions = valid;
    if final_questions.len() < ai_extractor::FALLBACK_THRESHOLD && !no_ai {
        if settings::has_api_key() {
            let ai_questions = ai_extractor::extract_questions_ai(&text, book).await;
            if !ai_questions.is_empty() {
                final_questions = ai_questions;
            }
        } else {
            eprintln!("Pattern yield is weak and no API key is configured; skipping AI fallback");
        }
    }

    if final_questions.is_empty() {
        eprintln!("No valid questions found in pages {}-{}", start, end);
        return 1;
    }

    if json {
        match serde_json::to_string_pretty(&final_questions) {
            Ok(out) => println!("{}", out),
            Err(e) => {
                eprintln!("Failed to serialize questions: {}", e);
                return 1;
            }
        }
    } else {
        for q in &final_questions {
            println!(
                "[{}] #{} ({} options{}) {}",
                q.setorder,
                q.question_number,
                q.options.len(),
                if q.has_answer() { ", answered" } else { "" },
                q.question
            );
        }
    }

    if save {
        let db = match Database::new(db_path) {
            Ok(db) => db,
            Err(e) => {
                eprintln!("Failed to open database {}: {}", db_path.display(), e);
                return 1;
            }
        };
        match jobs::save_in_chunks(&db, &final_questions).await {
            Ok(saved) => println!("Saved {} questions to {}", saved, db.get_path()),
            Err(e) => {
                eprintln!("{}", e);
                return 1;
            }
        }
    }

    0
}

fn cmd_enqueue(db_path: &Path, book: &str, pages: &str) -> i32 {
    if let Err(e) = jobs::parse_page_range(pages) {
        eprintln!("{}", e);
        return 1;
    }
    let db = match Database::new(db_path) {
        Ok(db) => db,
        Err(e) => {
            eprintln!("Failed to open database {}: {}", db_path.display(), e);
            return 1;
        }
    };
    match db.create_job(book, pages) {
        Ok(job) => {
            println!("Job created: {} ({} pages {})", job.id, job.book, job.range);
            0
        }
        Err(e) => {
            eprintln!("Failed to create job: {}", e);
            1
        }
    }
}

/// Database path resolution: CLI arg, then env var, then app data dir.
fn find_database(db_arg: Option<&str>, app_data_dir: &Path) -> PathBuf {
    if let Some(path) = db_arg {
        return PathBuf::from(path);
    }
    if let Ok(path) = std::env::var("MEDQUIZ_DB") {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }
    app_data_dir.join("medquiz.db")
}

/// Books directory resolution: CLI arg, then env/setting, then ./books.
fn find_books_dir(books_arg: Option<&str>) -> PathBuf {
    if let Some(dir) = books_arg {
        return PathBuf::from(dir);
    }
    settings::get_books_dir().unwrap_or_else(|| PathBuf::from("books"))
}
