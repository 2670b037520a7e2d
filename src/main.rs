//! bookslice - split an EPUB into JSON chapters

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;

use bookslice::{Book, TocNode, extract_bookmarks, read_epub, save_chapters, split_book};

#[derive(Parser)]
#[command(name = "bookslice")]
#[command(version, long_about = None)]
#[command(about = "Split an EPUB into chapters at its table of contents")]
#[command(after_help = "EXAMPLES:
    bookslice book.epub                 Write book.json next to the input
    bookslice book.epub out/book.json   Write to a chosen path
    bookslice -i book.epub              Show book metadata and bookmarks

Set RUST_LOG=debug for diagnostics.")]
struct Cli {
    /// Input EPUB file
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output JSON file (defaults to INPUT with a .json extension)
    #[arg(value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Show book metadata without slicing
    #[arg(short, long)]
    info: bool,

    /// Do not print chapter titles as they complete
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let result = if cli.info {
        show_info(&cli.input)
    } else {
        let output = cli
            .output
            .clone()
            .unwrap_or_else(|| cli.input.with_extension("json"));
        slice(&cli.input, &output, cli.quiet)
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn show_info(path: &Path) -> bookslice::Result<()> {
    let book = read_epub(path)?;

    let meta = &book.metadata;
    println!("File: {}", path.display());
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
    println!("Documents: {}", book.content_documents().count());
    println!("Spine items: {}", book.spine.len());

    let bookmarks = bookmarks(&book);
    println!("Bookmarks: {}", bookmarks.len());
    for (title, href) in bookmarks {
        println!("  - {title} -> {href}");
    }

    Ok(())
}

fn bookmarks(book: &Book) -> Vec<(String, String)> {
    extract_bookmarks(&TocNode::from_entries(&book.toc))
        .into_iter()
        .map(|b| {
            let href = match b.anchor_ref.anchor_id {
                Some(anchor) => format!("{}#{anchor}", b.anchor_ref.document_name),
                None => b.anchor_ref.document_name,
            };
            (b.title, href)
        })
        .collect()
}

fn slice(input: &Path, output: &Path, quiet: bool) -> bookslice::Result<()> {
    let book = read_epub(input)?;

    let chapters = split_book(&book, |chapter| {
        if !quiet {
            println!("{}", chapter.title);
        }
    });
    if chapters.is_empty() {
        log::warn!("{} has no table of contents entries", input.display());
    }

    save_chapters(output, &chapters)?;
    if !quiet {
        eprintln!("Wrote {} chapters to {}", chapters.len(), output.display());
    }
    Ok(())
}
