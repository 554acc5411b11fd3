// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Docket: date- and keyword-driven document filing
//!
//! Scans a working directory, works out a date and category for every
//! document, asks about the ones it is unsure of and files the rest.

use clap::{Parser, Subcommand};
use dialoguer::{Input, Select};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use docket::config::AppConfig;
use docket::dates::DateFormat;
use docket::extractors::ExtractorRegistry;
use docket::history::{undo_recent, Journal, UndoOutcome};
use docket::layout::FolderLayout;
use docket::naming::build_name;
use docket::pipeline::{AnalysisRequest, Batch, BatchPipeline, CancelHandle, Committer, Decision, ManualQueue, Route};
use docket::registry::{CategoryEntry, CategoryRegistry, CategoryStore};
use docket::scan::{list_candidates, should_process};
use docket::{DocketError, Result};

/// Docket CLI - date- and keyword-driven document filing
#[derive(Parser, Debug)]
#[command(name = "docket")]
#[command(author = "Jonathan D. A. Jewell <hyperpolymath>")]
#[command(version = "1.0.0")]
#[command(about = "Files loose documents by date and category", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (JSON format)
    #[arg(long, default_value = "docket.json", global = true)]
    config: PathBuf,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable trace logging (most verbose)
    #[arg(long, global = true)]
    trace: bool,

    /// Output format for results
    #[arg(long, global = true, default_value = "text", value_parser = ["text", "json", "jsonl"])]
    format: String,

    /// Suppress non-essential output (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze, resolve and file everything in the inbox
    Run {
        /// Directory to file (overrides config)
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Show what would be filed without touching any file
        #[arg(long)]
        dry_run: bool,

        /// Send every ambiguous file to the needs-processing folder without asking
        #[arg(long)]
        skip_manual: bool,

        /// Write the processing log to this file
        #[arg(long)]
        save_log: Option<PathBuf>,
    },

    /// Show what would be detected for a file or directory
    Analyze {
        /// File or directory to analyze
        path: PathBuf,
    },

    /// File a single document with a known category and date
    File {
        /// Document to file
        path: PathBuf,

        /// Category name
        #[arg(short, long)]
        category: String,

        /// Six-digit date in the configured format
        #[arg(short, long)]
        date: String,

        /// Free text appended to the filename
        #[arg(short, long)]
        specific: Option<String>,
    },

    /// Category management
    Categories {
        #[command(subcommand)]
        action: CategoryCommands,
    },

    /// History and undo operations
    History {
        #[command(subcommand)]
        action: HistoryCommands,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },

    /// Initialize a new Docket working directory
    Init {
        /// Directory to initialize (default: current)
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Force overwrite existing configuration
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
enum CategoryCommands {
    /// List categories
    List,

    /// Add a category, or replace one with the same name
    Add {
        name: String,

        /// Folder name (default: capitalized name)
        #[arg(long)]
        folder: Option<String>,

        /// Filename abbreviation (default: derived from the name)
        #[arg(long)]
        abbreviation: Option<String>,

        /// Keywords, comma separated
        #[arg(short, long, value_delimiter = ',')]
        keywords: Vec<String>,
    },

    /// Remove a category
    Remove { name: String },

    /// Add or remove a keyword
    Keyword {
        category: String,
        keyword: String,

        /// Remove instead of add
        #[arg(long)]
        remove: bool,
    },
}

#[derive(Subcommand, Debug)]
enum HistoryCommands {
    /// List recent filings
    List {
        /// Number of entries to show
        #[arg(short, long, default_value = "10")]
        count: usize,
    },

    /// Undo recent filings
    Undo {
        /// Number of filings to undo
        #[arg(short, long, default_value = "1")]
        count: usize,

        /// Dry run (show what would be undone)
        #[arg(long)]
        dry_run: bool,
    },

    /// Clear all history
    Clear {
        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Generate default configuration file
    Generate {
        /// Output file path
        #[arg(short, long, default_value = "docket.json")]
        output: PathBuf,
    },

    /// Validate configuration file
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config = AppConfig::load(&cli.config)?;

    match cli.command {
        Some(Commands::Run { dir, dry_run, skip_manual, save_log }) => {
            run_batch(config, dir, dry_run, skip_manual, save_log, &cli.format).await
        }
        Some(Commands::Analyze { path }) => run_analyze(config, path, &cli.format).await,
        Some(Commands::File { path, category, date, specific }) => {
            run_file(config, path, category, date, specific, &cli.format)
        }
        Some(Commands::Categories { action }) => run_category_command(config, action, &cli.format),
        Some(Commands::History { action }) => run_history_command(config, action),
        Some(Commands::Config { action }) => run_config_command(config, action, &cli.config),
        Some(Commands::Init { dir, force }) => run_init(dir, force),
        None => run_batch(config, None, false, false, None, &cli.format).await,
    }
}

/// Load the registry and the folder layout under `root` without touching the disk
fn load_workspace(config: &AppConfig, root: &Path) -> Result<(CategoryStore, CategoryRegistry, FolderLayout)> {
    let store = CategoryStore::new(config.categories_file());
    let registry = store.load()?;
    let layout = FolderLayout::new(root, &config.folders);
    Ok((store, registry, layout))
}

/// Load the registry and make sure every folder exists, saving any fallback
/// folder names that had to be substituted.
fn prepare(config: &AppConfig, root: &Path) -> Result<(CategoryStore, CategoryRegistry, FolderLayout)> {
    let (store, mut registry, layout) = load_workspace(config, root)?;

    let report = layout.ensure(&mut registry)?;
    if report.registry_changed() {
        for (name, folder) in &report.substituted {
            warn!("Category '{}' now files into '{}'", name, folder);
        }
        store.save(&registry)?;
    }

    Ok((store, registry, layout))
}

/// Analyze, resolve and commit one batch
async fn run_batch(
    config: AppConfig,
    dir: Option<PathBuf>,
    dry_run: bool,
    skip_manual: bool,
    save_log: Option<PathBuf>,
    format: &str,
) -> Result<()> {
    let root = dir.unwrap_or_else(|| config.inbox_dir());
    let (_store, registry, layout) = if dry_run {
        load_workspace(&config, &root)?
    } else {
        prepare(&config, &root)?
    };

    if registry.is_empty() {
        warn!("No categories defined, every file will need manual processing");
    }

    let files = list_candidates(&root, &config.analysis.extensions)?;
    if files.is_empty() {
        info!("No files to process in {:?}", root);
        return Ok(());
    }

    let mut batch = analyze_all(&config, files, registry.clone()).await;
    info!(
        "{} files ready to file, {} need attention",
        batch.auto_count(),
        batch.manual_count()
    );

    if dry_run {
        print_plan(&batch, config.date_format, &registry);
        return Ok(());
    }

    {
        let mut queue = batch.manual_queue(&registry, config.date_format);
        if skip_manual {
            queue.decline_all();
        } else {
            resolve_interactively(&mut queue, &registry, config.date_format)?;
        }
    }

    let journal = Journal::new(config.history_file());
    let report = Committer::new(&registry, &layout, config.date_format)
        .with_journal(&journal)
        .commit(batch);

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        "jsonl" => {
            for file in &report.files {
                println!("{}", serde_json::to_string(file)?);
            }
        }
        _ => print!("\n{}", report.render()),
    }

    if let Some(path) = save_log {
        report.save_log(&path)?;
    }

    Ok(())
}

/// Run the analysis pool, logging progress and cancelling on Ctrl+C.
async fn analyze_all(config: &AppConfig, files: Vec<PathBuf>, registry: CategoryRegistry) -> Batch {
    let pipeline = BatchPipeline::new(Arc::new(ExtractorRegistry::new()));
    let request = AnalysisRequest::from_config(files, Arc::new(registry), &config.analysis);
    let mut run = pipeline.analyze(request);

    let listener = cancel_on_ctrl_c(run.cancel_handle());

    while let Some(result) = run.next().await {
        let name = result.source.display().to_string();
        let progress = run.progress();
        info!("[{}/{}] Analyzed {}", progress.done, progress.total, name);
    }

    let batch = run.finish().await;
    listener.abort();
    batch
}

/// Cancel the analysis on Ctrl+C. Abort the returned task once analysis is
/// over so that Ctrl+C stops the process again.
fn cancel_on_ctrl_c(cancel: CancelHandle) -> JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Received Ctrl+C, finishing files already being analyzed");
            cancel.cancel();
        }
    })
}

fn print_plan(batch: &Batch, format: DateFormat, registry: &CategoryRegistry) {
    println!("DRY RUN - no files will be moved");
    for entry in batch.entries() {
        let result = &entry.result;
        let name = result.source.display();
        let target = match (entry.route, &result.detected_category, result.detected_date) {
            (Route::Auto, Some(category), Some(date)) => registry.get(category).map(|c| {
                format!("{}/{}", c.folder, build_name(&format.render(date), &c.abbreviation, None))
            }),
            _ => None,
        };
        match target {
            Some(target) => println!("  {} → {}", name, target),
            None => println!("  {} → needs manual resolution", name),
        }
    }
    if batch.cancelled() {
        println!("  ({} files not analyzed)", batch.not_analyzed());
    }
}

/// Ask about every ambiguous file in turn.
fn resolve_interactively(queue: &mut ManualQueue<'_>, registry: &CategoryRegistry, format: DateFormat) -> Result<()> {
    let names: Vec<String> = registry.names().into_iter().map(String::from).collect();
    let mut items = names.clone();
    items.push("Skip this file".to_string());
    items.push("Skip all remaining".to_string());

    while let Some(request) = queue.next_request() {
        println!("\n[{}/{}] {}", request.position, request.total, request.source.display());
        if let Some(error) = &request.error {
            println!("  Error: {}", error);
        }
        let preview: String = request.text_preview.split_whitespace().collect::<Vec<_>>().join(" ");
        if !preview.is_empty() {
            println!("  Text: {}", preview);
        }

        let default = request
            .suggested_category
            .as_deref()
            .and_then(|c| names.iter().position(|n| n == c))
            .unwrap_or(0);
        let choice = Select::new()
            .with_prompt("Category")
            .items(&items)
            .default(default)
            .interact()
            .map_err(|e| DocketError::Prompt(e.to_string()))?;

        if choice == names.len() {
            queue.answer(Decision::Skip)?;
            continue;
        }
        if choice > names.len() {
            queue.decline_all();
            break;
        }

        let suggested = request.suggested_date.clone().unwrap_or_else(|| format.today());
        loop {
            let date: String = Input::new()
                .with_prompt(format!("Date ({})", format))
                .default(suggested.clone())
                .interact_text()
                .map_err(|e| DocketError::Prompt(e.to_string()))?;

            match queue.answer(Decision::Process {
                category: names[choice].clone(),
                date,
            }) {
                Ok(()) => break,
                Err(e) => eprintln!("  {}", e),
            }
        }
    }

    Ok(())
}

/// Show detection results without filing anything
async fn run_analyze(config: AppConfig, path: PathBuf, format: &str) -> Result<()> {
    let registry = CategoryStore::new(config.categories_file()).load()?;

    let files = if path.is_dir() {
        list_candidates(&path, &config.analysis.extensions)?
    } else if should_process(&path) {
        vec![path]
    } else {
        Vec::new()
    };

    let batch = analyze_all(&config, files, registry).await;

    for entry in batch.entries() {
        let result = &entry.result;
        match format {
            "json" | "jsonl" => println!("{}", serde_json::to_string(entry)?),
            _ => println!(
                "{}: date {}, category {} (confidence {}){}{}",
                result.source.display(),
                result
                    .detected_date
                    .map(|d| config.date_format.example(d))
                    .unwrap_or_else(|| "-".to_string()),
                result.detected_category.as_deref().unwrap_or("-"),
                result.confidence,
                if entry.route == Route::Manual { " [manual]" } else { "" },
                result.error.as_ref().map(|e| format!(" error: {}", e)).unwrap_or_default(),
            ),
        }
    }

    if format == "text" {
        println!("\nAnalyzed {} files", batch.len());
    }

    Ok(())
}

/// File one document
fn run_file(
    config: AppConfig,
    path: PathBuf,
    category: String,
    date: String,
    specific: Option<String>,
    format: &str,
) -> Result<()> {
    let root = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.inbox_dir());
    let (_store, registry, layout) = prepare(&config, &root)?;
    let journal = Journal::new(config.history_file());

    let filed = Committer::new(&registry, &layout, config.date_format)
        .with_journal(&journal)
        .file_one(&path, &category, &date, specific.as_deref())?;

    match format {
        "json" | "jsonl" => println!("{}", serde_json::to_string(&filed)?),
        _ => {
            println!("{} → {}", path.display(), filed.destination.display());
            if filed.archived.is_none() {
                println!("  (original could not be archived and was left in place)");
            }
        }
    }

    Ok(())
}

/// Run category commands
fn run_category_command(config: AppConfig, action: CategoryCommands, format: &str) -> Result<()> {
    let store = CategoryStore::new(config.categories_file());
    let mut registry = store.load()?;

    match action {
        CategoryCommands::List => {
            if format != "text" {
                let entries: Vec<&CategoryEntry> = registry.iter().collect();
                println!("{}", serde_json::to_string_pretty(&entries)?);
                return Ok(());
            }
            println!("Categories ({}):", registry.len());
            for entry in registry.iter() {
                println!(
                    "  {} [{}] → {}/  keywords: {}",
                    entry.name,
                    entry.abbreviation,
                    entry.folder,
                    entry.keywords.join(", ")
                );
            }
        }
        CategoryCommands::Add { name, folder, abbreviation, keywords } => {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(DocketError::Validation(docket::ValidationError::EmptyCategory));
            }
            if registry.contains(&name) {
                warn!("Replacing existing category '{}'", name);
            }

            let mut entry = CategoryEntry::new(&name)
                .with_keywords(keywords.into_iter().map(|k| k.trim().to_string()).filter(|k| !k.is_empty()));
            if let Some(folder) = folder {
                entry = entry.with_folder(folder);
            }
            if let Some(abbreviation) = abbreviation {
                entry = entry.with_abbreviation(abbreviation);
            }
            println!("Saved category '{}' ({} → {}/)", entry.name, entry.abbreviation, entry.folder);
            registry.upsert(entry);
            store.save(&registry)?;
        }
        CategoryCommands::Remove { name } => {
            if registry.remove(&name).is_none() {
                return Err(DocketError::UnknownCategory(name));
            }
            store.save(&registry)?;
            println!("Removed category '{}' (its folder was left in place)", name);
        }
        CategoryCommands::Keyword { category, keyword, remove } => {
            let changed = if remove {
                registry.remove_keyword(&category, &keyword)?
            } else {
                registry.add_keyword(&category, &keyword)?
            };
            if changed {
                store.save(&registry)?;
                println!("Updated keywords of '{}'", category);
            } else {
                println!("Nothing to change for '{}'", category);
            }
        }
    }

    Ok(())
}

/// Run history commands
fn run_history_command(config: AppConfig, action: HistoryCommands) -> Result<()> {
    let journal = Journal::new(config.history_file());

    match action {
        HistoryCommands::List { count } => {
            let entries = journal.get_recent(count)?;
            println!("Recent history ({} entries):", entries.len());
            for entry in entries {
                let status = if entry.undone { "[UNDONE]" } else { "" };
                println!(
                    "  {} {} -> {} {}",
                    entry.timestamp.format("%Y-%m-%d %H:%M"),
                    entry.original_path.display(),
                    entry.destination.display(),
                    status
                );
            }
        }
        HistoryCommands::Undo { count, dry_run } => {
            let actions = undo_recent(&journal, count, dry_run)?;
            if actions.is_empty() {
                println!("Nothing to undo");
                return Ok(());
            }

            let verb = if dry_run { "Would restore" } else { "Restored" };
            for action in actions {
                let entry = &action.entry;
                match action.outcome {
                    UndoOutcome::Restored { removed_copy } => {
                        println!("{}: {}", verb, entry.original_path.display());
                        if !removed_copy {
                            println!("  keeping {} (changed or missing)", entry.destination.display());
                        }
                    }
                    UndoOutcome::Skipped(reason) => {
                        warn!("Cannot undo {:?}: {}", entry.original_path, reason);
                    }
                }
            }
        }
        HistoryCommands::Clear { force } => {
            if !force {
                eprintln!("Use --force to confirm clearing history");
                return Ok(());
            }
            journal.clear()?;
            println!("History cleared");
        }
    }

    Ok(())
}

/// Run config commands
fn run_config_command(config: AppConfig, action: ConfigCommands, config_path: &Path) -> Result<()> {
    match action {
        ConfigCommands::Show => {
            let json = serde_json::to_string_pretty(&config)?;
            println!("{}", json);
        }
        ConfigCommands::Generate { output } => {
            AppConfig::default().save(&output)?;
            println!("Generated config at {:?}", output);
        }
        ConfigCommands::Validate => {
            let issues = config.validate();
            if !issues.is_empty() {
                for issue in &issues {
                    eprintln!("  - {}", issue);
                }
                return Err(DocketError::Config(format!(
                    "{} problem(s) in {:?}",
                    issues.len(),
                    config_path
                )));
            }
            // Surfaces parse errors in the category file too.
            let registry = CategoryStore::new(config.categories_file()).load()?;
            println!("Configuration at {:?} is valid", config_path);
            println!("  Inbox: {}", config.inbox);
            println!("  Date format: {} (e.g. {})", config.date_format, config.date_format.today());
            println!("  Categories: {} in {}", registry.len(), config.categories_path);
        }
    }

    Ok(())
}

/// Initialize a new Docket working directory
fn run_init(dir: Option<PathBuf>, force: bool) -> Result<()> {
    let target = dir.unwrap_or_else(|| PathBuf::from("."));
    let config_path = target.join("docket.json");

    if config_path.exists() && !force {
        return Err(DocketError::Config(
            "docket.json already exists. Use --force to overwrite".to_string(),
        ));
    }
    std::fs::create_dir_all(&target)?;

    let mut config = AppConfig::default();
    config.inbox = target.to_string_lossy().to_string();
    config.categories_path = target.join("categories.json").to_string_lossy().to_string();
    config.history.path = target.join("docket_history.jsonl").to_string_lossy().to_string();
    config.save(&config_path)?;

    let store = CategoryStore::new(config.categories_file());
    if !store.path().exists() {
        let starter = CategoryRegistry::from_entries([
            CategoryEntry::new("invoices")
                .with_abbreviation("INV")
                .with_keywords(["invoice", "amount due", "payment terms"]),
            CategoryEntry::new("bank statements").with_keywords(["statement", "balance", "iban"]),
        ]);
        store.save(&starter)?;
    }

    let (_store, _registry, _layout) = prepare(&config, &target)?;

    println!("Docket initialized in {:?}", target);
    println!("\nCreated:");
    println!("  - docket.json");
    println!("  - categories.json");
    println!("  - {}/ and {}/", config.folders.sorted, config.folders.needs_processing);
    println!("\nNext steps:");
    println!("  1. Edit categories: docket categories add <name> --keywords a,b");
    println!("  2. Drop documents into {:?} and run: docket run", target);

    Ok(())
}
