//! CLI binary for pdfdeck.
//!
//! A thin shim over the library crate: `serve` runs the HTTP API, while
//! `summarize`, `inspect` and `normalize` run single pipeline steps locally.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use pdfdeck::export::{to_markdown, write_markdown};
use pdfdeck::pipeline::{extract, input};
use pdfdeck::{
    normalize_summary_text, run_pipeline, LlmSummaryModel, PipelineEvent, ProcessRequest,
    ProgressSink, ServerConfig, Stage, SummaryConfig, SummaryModel,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress sink using indicatif ────────────────────────────────────────

/// Renders pipeline stages as a percentage bar with a one-line log per stage.
struct CliProgressSink {
    bar: ProgressBar,
}

impl CliProgressSink {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(100);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:32.green/238}] {pos:>3}%  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("pdfdeck");
        bar.set_message("Starting…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl ProgressSink for CliProgressSink {
    fn on_event(&self, event: &PipelineEvent) {
        match event.stage {
            Stage::Complete => {
                self.bar.set_position(100);
                self.bar.println(format!("{} {}", green("✔"), event.message));
                self.bar.finish_and_clear();
            }
            Stage::Failed => {
                self.bar.println(format!("{} {}", red("✘"), bold(&event.message)));
                self.bar.abandon();
            }
            _ => {
                self.bar.set_position(u64::from(event.percent));
                self.bar.set_message(event.message.clone());
                self.bar.println(format!("{} {}", cyan("◆"), dim(&event.message)));
            }
        }
    }
}

// ── CLI arguments ────────────────────────────────────────────────────────────

const AFTER_HELP: &str = r#"EXAMPLES:
  # Summarise a local PDF into slides on stdout
  pdfdeck summarize paper.pdf

  # Summarise a PDF from a URL and write the deck to a file
  pdfdeck summarize https://arxiv.org/pdf/1706.03762 -o attention.md

  # Structured JSON (title, slides, metadata, stats)
  pdfdeck summarize report.pdf --json > report.json

  # Use OpenAI instead of the default Gemini model
  pdfdeck summarize report.pdf --provider openai --model gpt-4.1-mini

  # Print PDF metadata without calling a model
  pdfdeck inspect report.pdf

  # Normalise a stored summary payload (any legacy shape) into slides
  pdfdeck normalize summary.json

  # Run the HTTP API on port 8080 with a file database
  pdfdeck serve --bind 0.0.0.0:8080 --database-url sqlite://decks.db

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Google Gemini key (default provider)
  OPENAI_API_KEY          OpenAI key
  ANTHROPIC_API_KEY       Anthropic key
  PDFDECK_LLM_PROVIDER    Provider name (used with PDFDECK_MODEL)
  PDFDECK_MODEL           Model id
  PDFDECK_BIND            API bind address
  PDFDECK_DATABASE_URL    sqlx SQLite URL
  RUST_LOG                Tracing filter, overrides -v / -q
"#;

/// Turn PDF documents into markdown slide summaries using hosted LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "pdfdeck",
    version,
    about = "Turn PDF documents into markdown slide summaries using hosted LLMs",
    long_about = "Extract the text of a PDF (local file or URL), split it into overlapping \
chunks and ask an LLM for a titled deck of 5-7 markdown slides. Also serves the same \
pipeline over an HTTP API backed by SQLite.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PDFDECK_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PDFDECK_QUIET")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API.
    Serve(ServeArgs),
    /// Summarise one PDF into slides.
    Summarize(SummarizeArgs),
    /// Print PDF metadata only, no model call.
    Inspect(InspectArgs),
    /// Decode a stored summary payload into slides.
    Normalize(NormalizeArgs),
}

/// Model settings shared by `serve` and `summarize`.
#[derive(Args, Debug)]
struct ModelArgs {
    /// LLM provider: gemini, openai, anthropic, ollama, azure.
    #[arg(long, env = "PDFDECK_LLM_PROVIDER")]
    provider: Option<String>,

    /// Model id (default for gemini: gemini-1.5-flash).
    #[arg(long, env = "PDFDECK_MODEL")]
    model: Option<String>,

    /// LLM temperature (0.0-2.0).
    #[arg(long, env = "PDFDECK_TEMPERATURE", default_value_t = 0.4)]
    temperature: f32,

    /// Max output tokens for the whole deck.
    #[arg(long, env = "PDFDECK_MAX_TOKENS", default_value_t = 8192)]
    max_tokens: usize,

    /// Fewest slides to ask for.
    #[arg(long, env = "PDFDECK_MIN_SLIDES", default_value_t = 5)]
    min_slides: usize,

    /// Most slides to ask for (at most 7).
    #[arg(long, env = "PDFDECK_MAX_SLIDES", default_value_t = 7)]
    max_slides: usize,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "PDFDECK_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Retries on a failed model call.
    #[arg(long, env = "PDFDECK_MAX_RETRIES", default_value_t = 2)]
    max_retries: u32,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PDFDECK_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Model call timeout in seconds.
    #[arg(long, env = "PDFDECK_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Socket address to listen on.
    #[arg(long, env = "PDFDECK_BIND", default_value = "127.0.0.1:3000")]
    bind: String,

    /// sqlx SQLite URL; `sqlite::memory:` keeps everything in memory.
    #[arg(long, env = "PDFDECK_DATABASE_URL", default_value = "sqlite://pdfdeck.db")]
    database_url: String,

    #[command(flatten)]
    model: ModelArgs,
}

#[derive(Args, Debug)]
struct SummarizeArgs {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Write the markdown deck to this file instead of stdout.
    #[arg(short, long, env = "PDFDECK_OUTPUT")]
    output: Option<PathBuf>,

    /// Document name shown in the prompt and metadata (default: derived
    /// from the input, with `.pdf` appended when missing).
    #[arg(long)]
    name: Option<String>,

    /// Output structured JSON instead of markdown.
    #[arg(long, env = "PDFDECK_JSON")]
    json: bool,

    /// Disable the progress bar.
    #[arg(long, env = "PDFDECK_NO_PROGRESS")]
    no_progress: bool,

    #[command(flatten)]
    model: ModelArgs,
}

#[derive(Args, Debug)]
struct InspectArgs {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Print metadata as JSON.
    #[arg(long)]
    json: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PDFDECK_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,
}

#[derive(Args, Debug)]
struct NormalizeArgs {
    /// File holding a stored `summary_text` payload.
    file: PathBuf,

    /// Print the slides as a JSON array instead of markdown.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs for `summarize`.
    let show_progress = match &cli.command {
        Command::Summarize(a) => !cli.quiet && !a.no_progress && !a.json,
        _ => false,
    };
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::Summarize(args) => summarize(args, cli.quiet, show_progress).await,
        Command::Inspect(args) => inspect(args).await,
        Command::Normalize(args) => normalize(args).await,
    }
}

/// Map model flags to `SummaryConfig`.
async fn build_config(args: &ModelArgs) -> Result<SummaryConfig> {
    let mut builder = SummaryConfig::builder()
        .temperature(args.temperature)
        .max_tokens(args.max_tokens)
        .slide_range(args.min_slides, args.max_slides)
        .max_retries(args.max_retries)
        .download_timeout_secs(args.download_timeout)
        .api_timeout_secs(args.api_timeout);

    if let Some(ref provider) = args.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref model) = args.model {
        builder = builder.model(model);
    }
    if let Some(ref path) = args.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }

    builder.build().context("Invalid configuration")
}

async fn serve(args: ServeArgs) -> Result<()> {
    let summary = build_config(&args.model).await?;
    let config = ServerConfig {
        bind: args.bind,
        database_url: args.database_url,
        summary,
        ..ServerConfig::default()
    };
    pdfdeck::server::serve(config)
        .await
        .context("Server failed")
}

async fn summarize(args: SummarizeArgs, quiet: bool, show_progress: bool) -> Result<()> {
    let config = build_config(&args.model).await?;
    let model: Arc<dyn SummaryModel> = Arc::new(
        LlmSummaryModel::from_config(&config).context("Failed to initialise LLM provider")?,
    );

    let sink: Arc<dyn ProgressSink> = if show_progress {
        CliProgressSink::new()
    } else {
        Arc::new(pdfdeck::NoopProgressSink)
    };

    let name = match args.name {
        Some(ref n) => input::with_pdf_suffix(n.clone()),
        None => input::display_name(&args.input),
    };
    let request = ProcessRequest::new(&args.input, name);
    let outcome = run_pipeline(&request, &config, model, sink.as_ref())
        .await
        .context("Summarization failed")?;

    let summary = &outcome.summary;
    let markdown = to_markdown(&summary.title, &summary.slides, Some(&summary.metadata));

    if let Some(ref output_path) = args.output {
        write_markdown(output_path, &markdown)
            .await
            .context("Failed to write output")?;
        sink.on_event(&PipelineEvent::new(Stage::Complete));

        if !quiet {
            eprintln!(
                "{}  {} slides  {} pages  {}ms  →  {}",
                if outcome.stats.used_fallback {
                    cyan("⚠")
                } else {
                    green("✔")
                },
                summary.slides.len(),
                summary.metadata.page_count,
                summary.metadata.processing_time,
                bold(&output_path.display().to_string()),
            );
        }
        return Ok(());
    }

    sink.on_event(&PipelineEvent::new(Stage::Complete));
    if args.json {
        let json = serde_json::json!({
            "summary": summary,
            "document": outcome.document,
            "stats": outcome.stats,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&json).context("Failed to serialise output")?
        );
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(markdown.as_bytes())
            .context("Failed to write to stdout")?;
    }

    if !quiet && !args.json {
        eprintln!(
            "   {} chunks  /  {} words  /  {}ms total{}",
            dim(&outcome.stats.chunk_count.to_string()),
            dim(&summary.metadata.word_count.to_string()),
            summary.metadata.processing_time,
            if outcome.stats.used_fallback {
                format!("  {}", cyan("(fallback deck)"))
            } else {
                String::new()
            },
        );
    }
    Ok(())
}

async fn inspect(args: InspectArgs) -> Result<()> {
    let bytes = input::load_pdf_bytes(&args.input, args.download_timeout)
        .await
        .context("Failed to load PDF")?;
    let name = input::display_name(&args.input);
    let extracted = extract::parse_pdf(bytes, &name, &args.input)
        .await
        .context("Failed to inspect PDF")?;
    let meta = &extracted.document.metadata;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(meta).context("Failed to serialize metadata")?
        );
        return Ok(());
    }

    println!("File:         {}", args.input);
    if let Some(ref t) = meta.title {
        println!("Title:        {}", t);
    }
    if let Some(ref a) = meta.author {
        println!("Author:       {}", a);
    }
    if let Some(ref s) = meta.subject {
        println!("Subject:      {}", s);
    }
    println!("Pages:        {}", meta.page_count);
    println!("PDF Version:  {}", meta.pdf_version);
    println!("Characters:   {}", extracted.text_len());
    if let Some(ref p) = meta.producer {
        println!("Producer:     {}", p);
    }
    if let Some(ref c) = meta.creator {
        println!("Creator:      {}", c);
    }
    Ok(())
}

async fn normalize(args: NormalizeArgs) -> Result<()> {
    let text = tokio::fs::read_to_string(&args.file)
        .await
        .with_context(|| format!("Failed to read {:?}", args.file))?;
    let slides = normalize_summary_text(&text);

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&slides).context("Failed to serialise slides")?
        );
    } else {
        println!("{}", slides.join(pdfdeck::export::SLIDE_SEPARATOR));
    }
    Ok(())
}
