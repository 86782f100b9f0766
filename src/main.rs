use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use website_chat::{Retriever, Settings};

#[derive(Parser)]
#[command(name = "website-chat")]
#[command(about = "Index crawled website pages and retrieve context for questions")]
#[command(version)]
struct Cli {
    /// Path to a TOML settings file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Directory holding the crawled markdown pages
    #[arg(long, global = true)]
    doc_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index and print document statistics
    Index,
    /// Build the index and print the context retrieved for a question
    Context {
        /// Question to retrieve context for
        query: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(doc_dir) = cli.doc_dir {
        settings.doc_dir = doc_dir;
    }

    let mut retriever = Retriever::from_settings(&settings)?;
    let stats = retriever.embed_documents()?;

    match cli.command {
        Commands::Index => {
            println!("Indexed {}", settings.doc_dir.display());
            println!("  files:  {}", stats.num_files);
            println!("  chunks: {}", stats.num_chunks);
            println!("  words:  {}", stats.num_words);
        }
        Commands::Context { query } => {
            let retrieved = retriever.get_context_for_query(&query)?;
            if retrieved.is_empty() {
                println!("No context found.");
                return Ok(());
            }

            match retrieved.max_score {
                Some(score) => println!("Max score: {:.4}", score),
                None => println!("Max score: n/a"),
            }
            println!("Sources:");
            for source in &retrieved.sources {
                println!("  - {}", source);
            }
            println!();
            println!("{}", retrieved.context);
        }
    }

    Ok(())
}
