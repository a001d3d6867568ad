pub mod config;
pub mod dataset;
pub mod logging;
pub mod model;
pub mod search;
pub mod ui;

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::{Args, CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use config::{DatasetConfig, SessionConfig};
use dataset::{Document, detect_fields, load_documents};
use model::types::{DEFAULT_RESULT_CAP, QuerySpec};
use search::tantivy::TantivyEngine;
use search::{EngineError, SearchEngine};
use ui::data::{RowView, row_from_document};
use ui::session::{SessionController, SessionResources};

/// Command-line interface.
#[derive(Parser, Debug)]
#[command(
    name = "lsearch",
    version,
    about = "Live terminal search over JSON datasets"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Where the documents come from: a dataset file, a bare JSON file, or both.
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = true)]
pub struct SourceArgs {
    /// Dataset description (TOML) declaring fields, filters, boost and columns
    #[arg(long, env = "LSEARCH_DATASET")]
    pub dataset: Option<PathBuf>,

    /// JSON array or JSON Lines file; overrides the dataset's `data`, or infers a layout
    #[arg(long)]
    pub data: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Launch the live search view
    Tui {
        #[command(flatten)]
        source: SourceArgs,

        /// Render one frame as text and exit (headless-friendly)
        #[arg(long, default_value_t = false)]
        once: bool,

        /// Query typed before the single `--once` frame
        #[arg(long, default_value = "", requires = "once")]
        query: String,

        /// Skip the "press Space to start" screen
        #[arg(long, default_value_t = false)]
        no_gate: bool,

        /// Directory for the session log (defaults to platform data dir)
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// Run one query and print the formatted rows
    Search {
        /// Free-text query (empty matches everything)
        text: String,

        #[command(flatten)]
        source: SourceArgs,

        /// Maximum number of rows
        #[arg(long, default_value_t = DEFAULT_RESULT_CAP)]
        limit: usize,

        /// Apply the dataset's combined filter
        #[arg(long)]
        filtered: bool,

        /// Apply the dataset's boost
        #[arg(long)]
        boosted: bool,

        /// Sort by the dataset's sort field
        #[arg(long)]
        sorted: bool,

        /// Cut rows at the exact-hit count
        #[arg(long)]
        truncate: bool,

        /// Emit JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the JSON fields detected in the data
    Fields {
        #[command(flatten)]
        source: SourceArgs,

        /// Emit JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate shell completions to stdout
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate man page to stdout
    Man,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Tui {
            source,
            once,
            query,
            no_gate,
            data_dir,
        } => run_tui(&source, once, &query, no_gate, data_dir),
        Commands::Search {
            text,
            source,
            limit,
            filtered,
            boosted,
            sorted,
            truncate,
            json,
        } => {
            logging::init_stderr();
            let loaded = LoadedDataset::open(&source, false)?;
            let mut query = QuerySpec::new(text, limit);
            if filtered {
                query.filter = Some(
                    loaded
                        .resources
                        .filter
                        .context("dataset defines no filters")?,
                );
            }
            if boosted {
                if loaded.resources.docs_boosted == 0 {
                    bail!("dataset boost matches no documents");
                }
                query.boost_enabled = true;
            }
            if sorted {
                query.sort_field = Some(
                    loaded
                        .resources
                        .sort_field
                        .clone()
                        .context("dataset defines no sort field")?,
                );
            }
            query.truncate = truncate;
            run_search(&loaded, &query, json)
        }
        Commands::Fields { source, json } => {
            logging::init_stderr();
            let (_, docs) = read_source(&source)?;
            print_fields(&docs, json)
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "lsearch", &mut std::io::stdout());
            Ok(())
        }
        Commands::Man => {
            let cmd = Cli::command();
            let man = clap_mangen::Man::new(cmd);
            let mut out = std::io::stdout();
            man.render(&mut out)?;
            Ok(())
        }
    }
}

fn run_tui(
    source: &SourceArgs,
    once: bool,
    query: &str,
    no_gate: bool,
    data_dir: Option<PathBuf>,
) -> Result<()> {
    let _guard = if once {
        logging::init_stderr();
        None
    } else {
        let dir = data_dir.unwrap_or_else(default_data_dir);
        Some(logging::init_file(&dir).with_context(|| format!("opening log in {}", dir.display()))?)
    };

    let loaded = LoadedDataset::open(source, !once)?;
    let mut session_config = SessionConfig::from_env();
    if no_gate {
        session_config.start_gate = false;
    }
    let title = loaded.config.name.clone();
    let columns = loaded.config.columns.clone();
    let controller = SessionController::new(
        loaded.engine,
        loaded.resources,
        columns,
        session_config,
        Instant::now(),
    );

    if once {
        if let Some(frame) = ui::tui::render_once(controller, query) {
            print!("{frame}");
        }
        return Ok(());
    }
    info!(dataset = %title, "session_start");
    ui::tui::run_tui(controller, &title)
}

/// An indexed dataset with its prepared filter, boost and sort.
pub struct LoadedDataset {
    pub config: DatasetConfig,
    pub engine: TantivyEngine,
    pub resources: SessionResources,
}

impl LoadedDataset {
    pub fn open(source: &SourceArgs, show_progress: bool) -> Result<Self> {
        let (config, docs) = read_source(source)?;
        Self::build(config, &docs, show_progress)
    }

    pub fn build(config: DatasetConfig, docs: &[Document], show_progress: bool) -> Result<Self> {
        let progress = show_progress.then(|| {
            let pb = ProgressBar::new(docs.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("│ {bar:50.cyan/blue} {pos}/{len} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("██░"),
            );
            pb.set_message("indexing");
            pb
        });
        let mut engine = TantivyEngine::build(&config, docs, |done, _| {
            if let Some(pb) = &progress {
                pb.set_position(done as u64);
            }
        })
        .with_context(|| format!("building index for {}", config.name))?;
        if let Some(pb) = &progress {
            pb.finish_and_clear();
        }

        let resources = prepare_resources(&mut engine, &config)?;
        Ok(Self {
            config,
            engine,
            resources,
        })
    }
}

fn prepare_resources(engine: &mut TantivyEngine, config: &DatasetConfig) -> Result<SessionResources> {
    let handles = config
        .filters
        .iter()
        .map(|f| engine.create_filter(f))
        .collect::<Result<Vec<_>, _>>()
        .context("creating filters")?;
    let filter = if handles.is_empty() {
        None
    } else {
        Some(engine.combine_filters(&handles)?)
    };

    let docs_boosted = match &config.boost {
        Some(boost) => {
            let handle = engine
                .create_filter(&boost.as_filter())
                .context("creating boost filter")?;
            engine.define_boost(handle, boost.strength)?
        }
        None => 0,
    };

    info!(
        filters = handles.len(),
        docs_boosted,
        sort = ?config.sort,
        "session_resources"
    );
    Ok(SessionResources {
        filter,
        docs_boosted,
        sort_field: config.sort.clone(),
    })
}

/// Load the dataset config (or infer one) and its documents.
pub fn read_source(source: &SourceArgs) -> Result<(DatasetConfig, Vec<Document>)> {
    match &source.dataset {
        Some(path) => {
            let mut config = DatasetConfig::load(path)
                .with_context(|| format!("loading dataset {}", path.display()))?;
            if let Some(data) = &source.data {
                config.data = data.clone();
            }
            let docs = load_documents(&config.data)?;
            Ok((config, docs))
        }
        None => {
            let data = source
                .data
                .as_deref()
                .context("either --dataset or --data is required")?;
            let docs = load_documents(data)?;
            let config = infer_config(data, &docs)?;
            Ok((config, docs))
        }
    }
}

fn infer_config(data: &Path, docs: &[Document]) -> Result<DatasetConfig> {
    let config = DatasetConfig::infer(data, &detect_fields(docs));
    config
        .validate()
        .with_context(|| format!("inferring a layout for {}", data.display()))?;
    Ok(config)
}

fn run_search(loaded: &LoadedDataset, query: &QuerySpec, json: bool) -> Result<()> {
    let outcome = loaded.engine.search(query)?;
    let rows = outcome
        .records
        .iter()
        .map(|rec| {
            let raw = loaded.engine.document(rec.key)?;
            Ok(row_from_document(rec, &raw, &loaded.config.columns))
        })
        .collect::<Result<Vec<RowView>, EngineError>>()?;
    let headers: Vec<&str> = loaded
        .config
        .columns
        .iter()
        .map(|c| c.header.as_str())
        .collect();

    if json {
        let payload = serde_json::json!({
            "query": query.text,
            "exact_hits": outcome.truncation_index,
            "headers": headers,
            "rows": rows,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    println!("{}", console::style(headers.join(" | ")).bold());
    for row in &rows {
        println!("{}", row.cells.join(" | "));
    }
    println!(
        "{}",
        console::style(format!(
            "{} shown, {} exact hits",
            rows.len(),
            outcome.truncation_index
        ))
        .dim()
    );
    Ok(())
}

fn print_fields(docs: &[Document], json: bool) -> Result<()> {
    let fields = detect_fields(docs);
    if json {
        println!("{}", serde_json::to_string_pretty(&fields)?);
        return Ok(());
    }
    let width = fields.iter().map(|f| f.name.len()).max().unwrap_or(4).max(4);
    println!(
        "{}",
        console::style(format!(
            "{:<width$}  {:<7}  {:<5}  {}",
            "Name", "Type", "Array", "Optional"
        ))
        .bold()
    );
    let yes_no = |b: bool| if b { "yes" } else { "no" };
    for f in &fields {
        println!(
            "{:<width$}  {:<7}  {:<5}  {}",
            f.name,
            f.kind.to_string(),
            yes_no(f.is_array),
            yes_no(f.optional)
        );
    }
    Ok(())
}

pub fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("com", "live-search", "live-search")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".live-search"))
}
