use anyhow::Context;
use clap::Parser;
use sl_core::categories::merge_duplicate_categories;
use sl_core::{Storage, StoryFilter, StoryStorage};
use sl_inference::collector::{CollectRequest, CollectionOutcome, CollectionStop, StoryCollector};
use sl_inference::models::{ClientProvider, HttpClientProvider};
use sl_inference::prompt::PromptTemplate;
use sl_storage::StorageKind;
use sl_web::{AppState, SettingsStore};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

mod logging;

#[derive(Parser, Debug)]
#[command(name = "storyloom", author, version, about = "Children's story library tools", long_about = None)]
pub struct Cli {
    /// Storage backend: memory or sqlite
    #[arg(long, default_value = "sqlite")]
    storage: StorageKind,
    /// SQLite database file
    #[arg(long, default_value = "stories.db")]
    database: PathBuf,
    #[arg(long, env = "SILICON_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
    #[arg(long, env = "COMPLETION_BASE_URL", default_value = sl_inference::DEFAULT_BASE_URL)]
    base_url: String,
    /// Default model for requests that do not name one
    #[arg(long, env = "COMPLETION_MODEL")]
    model: Option<String>,
    /// Completion request timeout in seconds
    #[arg(long, default_value_t = 300)]
    timeout: u64,
    #[arg(long, default_value = "optimized_story_collect_prompt.md")]
    prompt_template: PathBuf,
    #[arg(long, default_value = "data/settings.json")]
    settings: PathBuf,
    #[arg(short, long)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API
    Serve {
        #[arg(long, default_value = "127.0.0.1:5000")]
        addr: SocketAddr,
    },
    /// Ask the model for new stories in one category
    Collect {
        #[arg(long)]
        category: String,
        #[arg(long, default_value_t = 1)]
        count: usize,
        /// Extra instruction sent as the user message
        #[arg(long)]
        instruction: Option<String>,
        #[arg(long)]
        batch: Option<String>,
        /// Print the first raw answer without saving anything
        #[arg(long)]
        test: bool,
    },
    /// Import stories from a CSV file
    ImportCsv {
        path: PathBuf,
        #[arg(long)]
        batch: Option<String>,
    },
    /// Import stories from the first table of an HTML export
    ImportHtml {
        path: PathBuf,
        #[arg(long)]
        batch: Option<String>,
    },
    /// Write stories as CSV to a file or stdout
    Export {
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long)]
        batch: Option<String>,
        #[arg(long)]
        category: Option<String>,
    },
    /// Merge near-duplicate categories
    MergeCategories {
        #[arg(long)]
        dry_run: bool,
    },
    /// Story count per category
    CategoryStats,
    /// Insert the built-in illustration styles
    SeedStyles,
}

impl Cli {
    fn inference_config(&self) -> sl_inference::Config {
        sl_inference::Config {
            api_key: self.api_key.clone().filter(|k| !k.trim().is_empty()),
            base_url: self.base_url.clone(),
            timeout: Duration::from_secs(self.timeout),
        }
    }
}

async fn read_file(path: &Path) -> anyhow::Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}

async fn collect(
    cli: &Cli,
    storage: Arc<dyn Storage>,
    request: CollectRequest,
) -> anyhow::Result<()> {
    let config = cli.inference_config();
    let client = HttpClientProvider::new(config).client_for(None)?;
    let template = PromptTemplate::load_or_default(&cli.prompt_template).await?;
    let outcome = StoryCollector::new(client, storage, template).collect(&request).await?;

    if let CollectionStop::Malformed { .. } = &outcome.stop {
        warn!("Model response was not a JSON array");
    }
    for line in report_lines(&outcome) {
        println!("{}", line);
    }
    Ok(())
}

fn report_lines(outcome: &CollectionOutcome) -> Vec<String> {
    let mut lines = Vec::new();
    match &outcome.stop {
        CollectionStop::Test { raw } | CollectionStop::Malformed { raw } => lines.push(raw.clone()),
        stop => {
            for story in &outcome.collected {
                lines.push(format!("✅ [{}] {}", story.id, story.title));
            }
            for title in &outcome.duplicate_titles {
                lines.push(format!("♻️ duplicate: {}", title));
            }
            if matches!(stop, CollectionStop::Empty) {
                lines.push("Model returned no stories".to_string());
            } else if !outcome.met {
                lines.push(format!(
                    "Only collected {} of {} stories",
                    outcome.collected.len(),
                    outcome.target_count
                ));
            }
        }
    }
    lines
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    cli.inference_config().validate()?;
    let storage = sl_storage::create_storage(cli.storage, &cli.database).await?;
    info!("✨ Storage initialized (using {})", cli.storage);

    match &cli.command {
        Commands::Serve { addr } => {
            let template = PromptTemplate::load_or_default(&cli.prompt_template).await?;
            let state = AppState {
                storage,
                clients: Arc::new(HttpClientProvider::new(cli.inference_config())),
                template,
                default_model: cli.model.clone(),
                settings: SettingsStore::new(&cli.settings),
            };
            sl_web::serve(state, *addr).await?;
        }
        Commands::Collect { category, count, instruction, batch, test } => {
            let model = cli
                .model
                .clone()
                .context("No model configured; pass --model or set COMPLETION_MODEL")?;
            let mut request = CollectRequest::new(category.clone(), *count, model);
            request.user_instruction = instruction.clone();
            request.batch = batch.clone();
            request.test = *test;
            collect(&cli, storage, request).await?;
        }
        Commands::ImportCsv { path, batch } => {
            let data = tokio::fs::read(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let summary = sl_import::import_csv(storage.as_ref(), &data, batch.as_deref()).await?;
            println!("Imported {} stories, {} duplicates", summary.success_count, summary.duplicate_count);
        }
        Commands::ImportHtml { path, batch } => {
            let html = read_file(path).await?;
            let summary = sl_import::import_html(storage.as_ref(), &html, batch.as_deref()).await?;
            println!("Imported {} stories, {} duplicates", summary.success_count, summary.duplicate_count);
        }
        Commands::Export { output, batch, category } => {
            let filter = StoryFilter { category: category.clone(), batch: batch.clone() };
            let stories = storage.list_stories(&filter).await?;
            let csv = sl_import::stories_to_csv(&stories)?;
            match output {
                Some(path) => {
                    tokio::fs::write(path, csv)
                        .await
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    info!("📤 Exported {} stories to {}", stories.len(), path.display());
                }
                None => print!("{}", csv),
            }
        }
        Commands::MergeCategories { dry_run } => {
            let report = merge_duplicate_categories(storage.as_ref(), *dry_run).await?;
            for group in &report.groups {
                println!("{} <- {}", group.keep_name, group.merged_names.join(", "));
            }
            if *dry_run {
                println!("Would merge {} categories", report.merged);
            } else {
                println!("Merged {} categories", report.merged);
            }
        }
        Commands::CategoryStats => {
            let mut counts = storage.count_by_category().await?;
            counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            for (category, count) in counts {
                println!("{}\t{}", count, category);
            }
        }
        Commands::SeedStyles => {
            let added = sl_import::seed_styles(storage.as_ref()).await?;
            println!("Seeded {} styles", added);
        }
    }

    Ok(())
}
