use clap::{Args, Parser, Subcommand};
use nyaya_rag::{
    artifacts::{DEFAULT_DOCUMENTS_FILE, DEFAULT_VECTORS_FILE},
    embedding::DEFAULT_MODEL,
    generate::{self, GenerateOptions, DEFAULT_BATCH_SIZE, DEFAULT_INPUT_FILE},
    server::{self, RagContext, DEFAULT_PORT, DEFAULT_TOP_K},
    Result, SentenceEmbedder,
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "nyaya-rag")]
#[command(about = "Semantic search over legal clauses")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Embed the clause dataset and write the artifact pair
    Generate(GenerateArgs),
    /// Serve POST /rag over the artifact pair
    Serve(ServeArgs),
    /// Run a single query against the artifact pair and print the hits
    Search(SearchArgs),
}

/// Artifact locations and the model, shared by every subcommand
#[derive(Args, Debug, Clone)]
pub struct ArtifactArgs {
    /// Embedding array (.npy)
    #[arg(long, default_value = DEFAULT_VECTORS_FILE)]
    pub embeddings: PathBuf,

    /// Document list
    #[arg(long, default_value = DEFAULT_DOCUMENTS_FILE)]
    pub documents: PathBuf,

    /// Hugging Face model id or local model directory
    #[arg(long, default_value = DEFAULT_MODEL)]
    pub model: String,
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// CSV dataset with a `text` column and an optional `id` column
    #[arg(long, short, default_value = DEFAULT_INPUT_FILE)]
    pub input: PathBuf,

    /// Clauses per forward pass
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE, value_parser = positive)]
    pub batch_size: usize,

    #[command(flatten)]
    pub artifacts: ArtifactArgs,
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    #[arg(long, short, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Results per query
    #[arg(long, default_value_t = DEFAULT_TOP_K, value_parser = positive)]
    pub top_k: usize,

    #[command(flatten)]
    pub artifacts: ArtifactArgs,
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Query text
    #[arg(required = true)]
    pub query: Vec<String>,

    #[arg(long, default_value_t = DEFAULT_TOP_K, value_parser = positive)]
    pub top_k: usize,

    #[command(flatten)]
    pub artifacts: ArtifactArgs,
}

fn positive(s: &str) -> std::result::Result<usize, String> {
    match s.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(format!("'{}' is not a positive integer", s)),
    }
}

pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Generate(args) => run_generate(args),
        Command::Serve(args) => run_serve(args).await,
        Command::Search(args) => run_search(args),
    }
}

fn run_generate(args: GenerateArgs) -> Result<()> {
    let options = GenerateOptions {
        input: args.input,
        vectors: args.artifacts.embeddings,
        documents: args.artifacts.documents,
        batch_size: args.batch_size,
    };

    // Fail on a bad dataset before paying for the model download
    if !options.input.is_file() {
        return Err(nyaya_rag::Error::configuration(format!(
            "Dataset '{}' not found",
            options.input.display()
        )));
    }

    let embedder = SentenceEmbedder::load(&args.artifacts.model)?;
    let summary = generate::run(&options, &embedder)?;

    tracing::info!(
        "Generated {} x {} embeddings in {:.1}s",
        summary.documents,
        summary.dimension,
        summary.elapsed.as_secs_f64()
    );
    Ok(())
}

async fn run_serve(args: ServeArgs) -> Result<()> {
    let ctx = RagContext::load(
        &args.artifacts.model,
        &args.artifacts.embeddings,
        &args.artifacts.documents,
        args.top_k,
    )?;

    tracing::info!("Listening on http://{}:{}/rag", args.host, args.port);
    server::bind(ctx, (args.host.as_str(), args.port))?.await?;
    Ok(())
}

fn run_search(args: SearchArgs) -> Result<()> {
    let ctx = RagContext::load(
        &args.artifacts.model,
        &args.artifacts.embeddings,
        &args.artifacts.documents,
        args.top_k,
    )?;

    let query = args.query.join(" ");
    let hits = ctx.search(&query)?;

    println!("Query: \"{}\"", query);
    if hits.is_empty() {
        println!("No results found");
    }
    for (rank, hit) in hits.iter().enumerate() {
        println!("  {:2}. (score: {:.4}) {}", rank + 1, hit.score, hit.content);
    }
    Ok(())
}
