//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use tabcatalog_catalog::{catalog_path, relocate, render_entry};
use tabcatalog_categorize::{BackendKind, CapabilityOverrides};
use tabcatalog_core::{
    CategorizeConfig, CategorizeResult, FetchConfig, ProgressReporter, categorize_and_save,
    fetch_and_save,
};
use tabcatalog_search::{SearchQuery, search};
use tabcatalog_shared::{
    AppConfig, init_config, load_config, load_credentials, save_credentials,
};

/// Local model used when `--model ollama` is given without a model name.
const DEFAULT_OLLAMA_MODEL: &str = "llama2";

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// tabcatalog: organize open browser tabs into a searchable catalog.
#[derive(Parser)]
#[command(
    name = "tabcatalog",
    version,
    about = "Fetch open browser tabs, categorize them into a markdown catalog, and search it.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Text-generation backend requested with `--model`.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub(crate) enum ModelChoice {
    Gemini,
    Mistral,
    Ollama,
}

impl From<ModelChoice> for BackendKind {
    fn from(choice: ModelChoice) -> Self {
        match choice {
            ModelChoice::Gemini => BackendKind::Gemini,
            ModelChoice::Mistral => BackendKind::Mistral,
            ModelChoice::Ollama => BackendKind::Ollama,
        }
    }
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Fetch open tabs and save them, uncategorized, as a snapshot.
    Fetch {
        /// Catalog directory (defaults to `[defaults].output_dir`).
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Fetch, categorize and append open tabs to the catalog.
    Categorize {
        /// Preferred backend; falls back by priority when unavailable.
        #[arg(short, long)]
        model: Option<ModelChoice>,

        /// Ollama model name (enables the local backend).
        #[arg(long = "ollama-model", visible_alias = "om")]
        ollama_model: Option<String>,

        /// Gemini API key for this run.
        #[arg(long)]
        gemini_key: Option<String>,

        /// Mistral API key for this run.
        #[arg(long)]
        mistral_key: Option<String>,

        /// Also store the given keys for future runs.
        #[arg(long)]
        save_keys: bool,

        /// Catalog directory (defaults to `[defaults].output_dir`).
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Move the catalog to this central directory or file afterwards.
        #[arg(long)]
        central_repo: Option<PathBuf>,

        /// Skip the per-tab tag pass.
        #[arg(long)]
        no_tags: bool,
    },

    /// Search the catalog.
    Search {
        /// Matches title, URL, category or tags.
        term: Option<String>,

        /// Only entries with a tag containing this.
        #[arg(long)]
        tag: Option<String>,

        /// Only entries whose category contains this.
        #[arg(long)]
        category: Option<String>,

        /// Catalog directory (defaults to `[defaults].output_dir`).
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Move the catalog and its snapshots to a new location.
    Relocate {
        /// Destination directory or catalog file path.
        destination: PathBuf,

        /// Current catalog directory (defaults to `[defaults].output_dir`).
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Stored API key management.
    Keys {
        #[command(subcommand)]
        action: KeysAction,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Key subcommands.
#[derive(Subcommand)]
pub(crate) enum KeysAction {
    /// Store API keys in the credentials file.
    Save {
        #[arg(long)]
        gemini_key: Option<String>,
        #[arg(long)]
        mistral_key: Option<String>,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "tabcatalog=info",
        1 => "tabcatalog=debug",
        _ => "tabcatalog=trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command. With no command, print usage and succeed.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    match command {
        Command::Fetch { output_dir } => cmd_fetch(output_dir).await,
        Command::Categorize {
            model,
            ollama_model,
            gemini_key,
            mistral_key,
            save_keys,
            output_dir,
            central_repo,
            no_tags,
        } => {
            let opts = CategorizeOpts {
                model,
                ollama_model,
                gemini_key,
                mistral_key,
                save_keys,
                output_dir,
                central_repo,
                no_tags,
            };
            cmd_categorize(opts).await
        }
        Command::Search {
            term,
            tag,
            category,
            output_dir,
        } => {
            let query = SearchQuery {
                term,
                tag,
                category,
            };
            cmd_search(&query, output_dir)
        }
        Command::Relocate {
            destination,
            output_dir,
        } => cmd_relocate(&destination, output_dir),
        Command::Keys { action } => match action {
            KeysAction::Save {
                gemini_key,
                mistral_key,
            } => cmd_keys_save(gemini_key.as_deref(), mistral_key.as_deref()),
        },
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

fn resolve_output_dir(config: &AppConfig, flag: Option<PathBuf>) -> PathBuf {
    flag.unwrap_or_else(|| PathBuf::from(&config.defaults.output_dir))
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_fetch(output_dir: Option<PathBuf>) -> Result<()> {
    let config = load_config()?;
    let mut fetch_config = FetchConfig::from_app(&config);
    fetch_config.output_dir = resolve_output_dir(&config, output_dir);

    let reporter = CliProgress::new();
    let result = fetch_and_save(&fetch_config, &reporter).await;
    reporter.finish();
    let result = result?;

    match result.snapshot {
        Some(path) => {
            println!();
            println!("  Tabs:     {}", result.tab_count);
            println!("  Snapshot: {}", path.display());
            println!("  Time:     {:.1}s", result.elapsed.as_secs_f64());
            println!();
        }
        None => println!("No tabs found. Is the browser running with remote debugging enabled?"),
    }
    Ok(())
}

struct CategorizeOpts {
    model: Option<ModelChoice>,
    ollama_model: Option<String>,
    gemini_key: Option<String>,
    mistral_key: Option<String>,
    save_keys: bool,
    output_dir: Option<PathBuf>,
    central_repo: Option<PathBuf>,
    no_tags: bool,
}

async fn cmd_categorize(opts: CategorizeOpts) -> Result<()> {
    let mut config = load_config()?;
    if opts.no_tags {
        config.tagging.enabled = false;
    }

    if opts.save_keys {
        if opts.gemini_key.is_none() && opts.mistral_key.is_none() {
            return Err(eyre!("--save-keys needs --gemini-key and/or --mistral-key"));
        }
        let path = save_credentials(opts.gemini_key.as_deref(), opts.mistral_key.as_deref())?;
        println!("Keys saved to: {}", path.display());
    }

    let preference = opts.model.map(BackendKind::from);
    let mut ollama_model = opts.ollama_model;
    if matches!(opts.model, Some(ModelChoice::Ollama))
        && ollama_model.is_none()
        && config.ollama.model.is_none()
    {
        ollama_model = Some(DEFAULT_OLLAMA_MODEL.to_string());
    }

    let output_dir = resolve_output_dir(&config, opts.output_dir);
    let mut run_config = CategorizeConfig::new(config, load_credentials()?);
    run_config.overrides = CapabilityOverrides {
        gemini_key: opts.gemini_key,
        mistral_key: opts.mistral_key,
        ollama_model,
    };
    run_config.preference = preference;
    run_config.output_dir = output_dir;
    run_config.central_repo = opts.central_repo;

    info!(
        preference = preference.map(|p| p.as_str()).unwrap_or("auto"),
        dir = %run_config.output_dir.display(),
        "categorizing tabs"
    );

    let reporter = CliProgress::new();
    let result = categorize_and_save(&run_config, &reporter).await;
    reporter.finish();
    let result = result?;

    if result.tab_count == 0 {
        println!("No tabs found. Is the browser running with remote debugging enabled?");
        return Ok(());
    }

    println!();
    println!("  Tabs categorized successfully!");
    println!("  Tabs:       {}", result.tab_count);
    println!("  Backend:    {}", result.backend);
    println!("  Categories: {}", result.category_count);
    if let Some(catalog) = &result.catalog {
        println!("  Catalog:    {}", catalog.display());
    }
    if let Some(snapshot) = &result.snapshot {
        println!("  Snapshot:   {}", snapshot.display());
    }
    println!("  Time:       {:.1}s", result.elapsed.as_secs_f64());
    println!();

    Ok(())
}

fn cmd_search(query: &SearchQuery, output_dir: Option<PathBuf>) -> Result<()> {
    let config = load_config()?;
    let dir = resolve_output_dir(&config, output_dir);

    if !catalog_path(&dir).exists() {
        println!("No tab data available. Please categorize tabs first.");
        return Ok(());
    }

    let hits = search(query, &dir)?;
    if hits.is_empty() {
        println!("No matching tabs.");
        return Ok(());
    }

    for tab in &hits {
        print!("{}", render_entry(tab));
    }
    println!("{} matching tab(s)", hits.len());
    Ok(())
}

fn cmd_relocate(destination: &Path, output_dir: Option<PathBuf>) -> Result<()> {
    let config = load_config()?;
    let dir = resolve_output_dir(&config, output_dir);

    let moved = relocate(&catalog_path(&dir), destination)?;
    println!("Catalog moved to: {}", moved.display());
    Ok(())
}

fn cmd_keys_save(gemini_key: Option<&str>, mistral_key: Option<&str>) -> Result<()> {
    if gemini_key.is_none() && mistral_key.is_none() {
        return Err(eyre!("nothing to save: pass --gemini-key and/or --mistral-key"));
    }
    let path = save_credentials(gemini_key, mistral_key)?;
    println!("Keys saved to: {}", path.display());
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn tab_categorized(&self, current: usize, total: usize, title: &str) {
        self.spinner
            .set_message(format!("Tagging [{current}/{total}] {title}"));
    }

    fn done(&self, _result: &CategorizeResult) {
        self.spinner.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_command_parses() {
        let cli = Cli::try_parse_from(["tabcatalog"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn categorize_flags() {
        let cli = Cli::try_parse_from([
            "tabcatalog",
            "categorize",
            "-m",
            "ollama",
            "--om",
            "llama3",
            "-o",
            "/tmp/tabs",
            "--central-repo",
            "/tmp/central",
            "--no-tags",
        ])
        .unwrap();

        let Some(Command::Categorize {
            model,
            ollama_model,
            output_dir,
            central_repo,
            no_tags,
            ..
        }) = cli.command
        else {
            panic!("expected categorize");
        };
        assert!(matches!(model, Some(ModelChoice::Ollama)));
        assert_eq!(ollama_model.as_deref(), Some("llama3"));
        assert_eq!(output_dir, Some(PathBuf::from("/tmp/tabs")));
        assert_eq!(central_repo, Some(PathBuf::from("/tmp/central")));
        assert!(no_tags);
    }

    #[test]
    fn search_flags() {
        let cli = Cli::try_parse_from([
            "tabcatalog",
            "search",
            "rick",
            "--category",
            "YouTube",
        ])
        .unwrap();
        let Some(Command::Search { term, category, tag, .. }) = cli.command else {
            panic!("expected search");
        };
        assert_eq!(term.as_deref(), Some("rick"));
        assert_eq!(category.as_deref(), Some("YouTube"));
        assert!(tag.is_none());
    }

    #[test]
    fn unknown_model_is_rejected() {
        assert!(Cli::try_parse_from(["tabcatalog", "categorize", "-m", "gpt"]).is_err());
    }
}
