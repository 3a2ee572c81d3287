use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use mrag::config::{self, MragConfig};
use mrag::extract;
use mrag::ingest::{self, IngestOptions};
use mrag::models::{ChunkStrategy, ItemType};
use mrag::output::{json as json_out, table};
use mrag::remote::anthropic::AnthropicGenerator;
use mrag::remote::openai::OpenAiEmbedder;
use mrag::remote::supabase::SupabaseStore;
use mrag::remote::{Generator, ItemStore};
use mrag::retrieval::router::{classify_query, format_structured_response, QueryType};
use mrag::retrieval::{format_context, RetrievalMode, Retriever};

#[derive(Parser)]
#[command(
    name = "mrag",
    version,
    about = "Meeting RAG — ingest transcripts, then ask questions over them"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest transcripts from files or stdin (parse -> chunk -> embed -> store)
    Ingest {
        /// File paths or glob patterns to ingest
        paths: Vec<String>,

        /// Read from stdin
        #[arg(long)]
        stdin: bool,

        /// Meeting title (required with --stdin, otherwise derived from filename)
        #[arg(long)]
        title: Option<String>,

        /// Force format: vtt, text, json
        #[arg(long)]
        format: Option<String>,

        /// Chunking strategy: naive or speaker_turn
        #[arg(long)]
        strategy: Option<String>,

        /// Preview without embedding or storing
        #[arg(long)]
        dry_run: bool,
    },

    /// Load a MeetingBank export file through the ingestion pipeline
    LoadMeetingbank {
        /// Path to the export (one record or an array of records)
        path: String,

        /// Chunking strategy: naive or speaker_turn
        #[arg(long)]
        strategy: Option<String>,

        /// Preview without embedding or storing
        #[arg(long)]
        dry_run: bool,
    },

    /// Ask a question (structured lookup or retrieval + generation)
    Query {
        /// The question to answer
        question: String,

        /// Restrict to one meeting id
        #[arg(long)]
        meeting: Option<String>,

        /// Retrieval mode: semantic or hybrid
        #[arg(long)]
        mode: Option<String>,

        /// Number of chunks to retrieve
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Ranked chunk retrieval without answer generation
    Search {
        /// Search query
        query: String,

        /// Restrict to one meeting id
        #[arg(long)]
        meeting: Option<String>,

        /// Retrieval mode: semantic or hybrid
        #[arg(long)]
        mode: Option<String>,

        /// Number of chunks to retrieve
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Extract action items, decisions, and topics from a stored meeting
    Extract {
        /// Meeting id to extract from
        meeting: String,
    },

    /// List previously-extracted action items, decisions, and topics
    Items {
        /// Restrict to one meeting id
        #[arg(long)]
        meeting: Option<String>,

        /// Filter by type: action_item, decision, topic
        #[arg(long = "type")]
        item_type: Option<String>,
    },

    /// Manage ~/.mrag/config.toml
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Create the default config file
    Init,
    /// Show the current config with secrets redacted
    Show,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let json_output = cli.json;
    let config = MragConfig::load()?;
    let defaults = config.defaults();

    match cli.command {
        Commands::Ingest {
            paths,
            stdin,
            title,
            format,
            strategy,
            dry_run,
        } => {
            let format_enum = format
                .as_deref()
                .map(|f| {
                    ingest::Format::from_str(f)
                        .with_context(|| format!("Unknown format: {f}. Use: vtt, text, json"))
                })
                .transpose()?;

            let opts = ingest_options(&defaults, strategy.as_deref(), dry_run)?;
            let embedder = build_embedder(&config)?;
            let store = build_store(&config)?;

            let report = if stdin {
                let title = title
                    .as_deref()
                    .context("--title is required when ingesting from stdin")?;
                let id = ingest::ingest_stdin(title, format_enum, &opts, &embedder, &store)?;
                ingest::IngestReport {
                    processed: 1,
                    meeting_ids: id.into_iter().collect(),
                }
            } else if paths.is_empty() {
                bail!("No paths provided. Use --stdin to read from stdin.");
            } else {
                ingest::ingest_paths(&paths, format_enum, &opts, &embedder, &store)?
            };

            if json_output {
                json_out::print_json(&serde_json::json!({
                    "ingested": report.processed,
                    "meeting_ids": report.meeting_ids,
                    "dry_run": dry_run,
                }))?;
            } else {
                let action = if dry_run { "Would ingest" } else { "Ingested" };
                println!(
                    "{action} {} transcript{}",
                    report.processed,
                    if report.processed == 1 { "" } else { "s" }
                );
                for id in &report.meeting_ids {
                    println!("  meeting id: {id}");
                }
            }
        }

        Commands::LoadMeetingbank {
            path,
            strategy,
            dry_run,
        } => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read: {path}"))?;

            let opts = ingest_options(&defaults, strategy.as_deref(), dry_run)?;
            let embedder = build_embedder(&config)?;
            let store = build_store(&config)?;

            let report =
                ingest::meetingbank::load_meetingbank(&content, &opts, &embedder, &store)?;

            if json_output {
                json_out::print_json(&serde_json::json!({
                    "loaded": report.processed,
                    "meeting_ids": report.meeting_ids,
                    "dry_run": dry_run,
                }))?;
            } else {
                let action = if dry_run { "Would load" } else { "Loaded" };
                println!(
                    "{action} {} meeting{}",
                    report.processed,
                    if report.processed == 1 { "" } else { "s" }
                );
            }
        }

        Commands::Query {
            question,
            meeting,
            mode,
            top_k,
        } => {
            let routed = classify_query(&question);

            if routed.query_type == QueryType::Structured {
                let store = build_store(&config)?;
                let items = store.lookup_items(meeting.as_deref(), routed.item_type)?;
                let answer = format_structured_response(&items, routed.item_type);

                if json_output {
                    json_out::print_json(&serde_json::json!({
                        "answer": answer,
                        "query_type": routed.query_type,
                        "item_type": routed.item_type,
                        "sources": [],
                    }))?;
                } else {
                    println!("{answer}");
                }
                return Ok(());
            }

            // Open-ended: retrieve then generate.
            let mode = retrieval_mode(&defaults, mode.as_deref())?;
            let embedder = build_embedder(&config)?;
            let store = build_store(&config)?;
            let retriever = Retriever::new(&embedder, &store);
            let chunks = run_search(
                &retriever,
                &question,
                mode,
                top_k.unwrap_or(defaults.top_k),
                meeting.as_deref(),
                &defaults,
            )?;

            if chunks.is_empty() {
                let answer = "No relevant meeting content found for your question.";
                if json_output {
                    json_out::print_json(&serde_json::json!({
                        "answer": answer,
                        "sources": [],
                    }))?;
                } else {
                    println!("{answer}");
                }
                return Ok(());
            }

            let generator = build_generator(&config)?;
            let context = format_context(&chunks);
            let result = generator.generate(&question, &context)?;

            if json_output {
                json_out::print_json(&serde_json::json!({
                    "answer": result.answer,
                    "mode": mode.as_str(),
                    "model": result.model,
                    "usage": {
                        "input_tokens": result.input_tokens,
                        "output_tokens": result.output_tokens,
                    },
                    "sources": chunks,
                }))?;
            } else {
                table::print_answer(&result, &chunks);
            }
        }

        Commands::Search {
            query,
            meeting,
            mode,
            top_k,
        } => {
            let mode = retrieval_mode(&defaults, mode.as_deref())?;
            let embedder = build_embedder(&config)?;
            let store = build_store(&config)?;
            let retriever = Retriever::new(&embedder, &store);
            let chunks = run_search(
                &retriever,
                &query,
                mode,
                top_k.unwrap_or(defaults.top_k),
                meeting.as_deref(),
                &defaults,
            )?;

            if json_output {
                json_out::print_json(&serde_json::json!({
                    "query": query,
                    "mode": mode.as_str(),
                    "total": chunks.len(),
                    "chunks": chunks,
                }))?;
            } else {
                table::print_retrieved_chunks(&chunks, &query);
            }
        }

        Commands::Extract { meeting } => {
            let store = build_store(&config)?;
            let generator = build_generator(&config)?;
            let items = extract::extract_and_store(&meeting, &store, &generator, &store)?;

            if json_output {
                json_out::print_json(&items)?;
            } else if items.is_empty() {
                println!("No items extracted from meeting {meeting}");
            } else {
                println!(
                    "Extracted {} item{} from meeting {}:\n",
                    items.len(),
                    if items.len() == 1 { "" } else { "s" },
                    meeting
                );
                table::print_item_lines(&items);
            }
        }

        Commands::Items { meeting, item_type } => {
            let item_type = item_type
                .as_deref()
                .map(|t| {
                    ItemType::from_str(t).with_context(|| {
                        format!("Unknown item type: {t}. Use: action_item, decision, topic")
                    })
                })
                .transpose()?;

            let store = build_store(&config)?;
            let items = store.lookup_items(meeting.as_deref(), item_type)?;

            if json_output {
                json_out::print_json(&items)?;
            } else {
                table::print_items(&items);
            }
        }

        Commands::Config { action } => match action {
            ConfigAction::Init => {
                if config::init_config()? {
                    println!("Created {}", config::config_path()?.display());
                } else {
                    println!("Config already exists: {}", config::config_path()?.display());
                }
            }
            ConfigAction::Show => {
                println!("{}", config.display_redacted());
            }
        },
    }

    Ok(())
}

fn ingest_options(
    defaults: &config::Defaults,
    strategy: Option<&str>,
    dry_run: bool,
) -> Result<IngestOptions> {
    let strategy_name = strategy.unwrap_or(&defaults.strategy);
    let strategy = ChunkStrategy::from_str(strategy_name).with_context(|| {
        format!("Unknown chunking strategy: {strategy_name}. Use: naive, speaker_turn")
    })?;
    Ok(IngestOptions {
        strategy,
        chunk_size: defaults.chunk_size,
        overlap: defaults.chunk_overlap,
        max_chunk_tokens: defaults.max_chunk_tokens,
        dry_run,
    })
}

fn run_search(
    retriever: &Retriever,
    query: &str,
    mode: RetrievalMode,
    top_k: usize,
    meeting_id: Option<&str>,
    defaults: &config::Defaults,
) -> Result<Vec<mrag::retrieval::RetrievedChunk>> {
    let chunks = match mode {
        RetrievalMode::Semantic => retriever.semantic_search(query, top_k, meeting_id)?,
        RetrievalMode::Hybrid => retriever.hybrid_search(
            query,
            top_k,
            defaults.vector_weight,
            defaults.text_weight,
            meeting_id,
        )?,
    };
    Ok(chunks)
}

fn retrieval_mode(defaults: &config::Defaults, mode: Option<&str>) -> Result<RetrievalMode> {
    let name = mode.unwrap_or(&defaults.retrieval_mode);
    RetrievalMode::from_str(name)
        .with_context(|| format!("Unknown retrieval mode: {name}. Use: semantic, hybrid"))
}

fn build_embedder(config: &MragConfig) -> Result<OpenAiEmbedder> {
    let sc = config.service_config("openai");
    let api_key = config::resolve_credential(None, "OPENAI_API_KEY", sc)?;
    Ok(OpenAiEmbedder::new(
        api_key,
        sc.and_then(|s| s.base_url.clone()),
        sc.and_then(|s| s.model.clone()),
    ))
}

fn build_store(config: &MragConfig) -> Result<SupabaseStore> {
    let sc = config.service_config("supabase");
    let base_url = sc
        .and_then(|s| s.base_url.clone())
        .or_else(|| std::env::var("SUPABASE_URL").ok().filter(|v| !v.is_empty()))
        .context("No Supabase URL configured. Set SUPABASE_URL or ~/.mrag/config.toml")?;
    let api_key = config::resolve_credential(None, "SUPABASE_KEY", sc)?;
    Ok(SupabaseStore::new(base_url, api_key))
}

fn build_generator(config: &MragConfig) -> Result<AnthropicGenerator> {
    let sc = config.service_config("anthropic");
    let api_key = config::resolve_credential(None, "ANTHROPIC_API_KEY", sc)?;
    Ok(AnthropicGenerator::new(
        api_key,
        sc.and_then(|s| s.base_url.clone()),
        sc.and_then(|s| s.model.clone()),
    ))
}
