use anyhow::{Context, Result};
use boot_cache::{LocalFs, OnDiskStore, Symbol};
use boot_index::{
    init_tracing, uri_to_path, CacheBackend, Indexer, IndexerConfig, LoadReport,
    ProjectDescriptor, SourceKind,
};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "boot-index",
    version,
    about = "Spring symbol index (indexing, symbol search, cache)"
)]
struct Cli {
    /// Path to a `boot-index.toml`
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Index a project, reusing the persistent cache when it is current
    Index(IndexArgs),
    /// Workspace symbol search
    Symbols(SymbolsArgs),
    /// Beans declared in one source file
    Beans(BeansArgs),
    /// Inspect or clear the on-disk symbol cache
    Cache(CacheArgs),
}

#[derive(Args)]
struct ProjectArgs {
    /// Project name (defaults to the directory name)
    #[arg(long)]
    name: Option<String>,
    /// Classpath entry; repeat for several. Changes to them start a fresh index.
    #[arg(long = "classpath", value_name = "ENTRY")]
    classpath: Vec<PathBuf>,
    /// Index test sources as well
    #[arg(long)]
    tests: bool,
}

#[derive(Args)]
struct IndexArgs {
    /// Project root
    path: PathBuf,
    #[command(flatten)]
    project: ProjectArgs,
    /// Emit JSON suitable for CI
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct SymbolsArgs {
    /// Query, e.g. `hello`, `*@/` or `locationPrefix:file:///src/?@+`
    query: String,
    /// Project root (defaults to current directory)
    #[arg(long, default_value = ".")]
    path: PathBuf,
    #[command(flatten)]
    project: ProjectArgs,
    /// Emit JSON suitable for CI
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct BeansArgs {
    /// Source file
    file: PathBuf,
    /// Project root (defaults to current directory)
    #[arg(long, default_value = ".")]
    path: PathBuf,
    #[command(flatten)]
    project: ProjectArgs,
    /// Emit JSON suitable for CI
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct CacheArgs {
    #[command(subcommand)]
    command: CacheCommand,
    /// Emit JSON suitable for CI
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum CacheCommand {
    /// Delete every cache artifact
    Clean,
    /// List cache artifacts
    Status,
}

#[derive(Serialize)]
struct CacheStatus {
    dir: PathBuf,
    artifacts: Vec<boot_cache::ArtifactInfo>,
}

#[derive(Serialize)]
struct CacheCleanReport {
    dir: PathBuf,
    removed: usize,
}

fn main() {
    let cli = Cli::parse();
    let exit_code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            2
        }
    };

    std::process::exit(exit_code);
}

fn run(cli: Cli) -> Result<i32> {
    let config = match &cli.config {
        Some(path) => IndexerConfig::load_from_path(path)?,
        None => IndexerConfig::default(),
    };
    init_tracing(&config.logging);

    match cli.command {
        Command::Index(args) => {
            let (_, report) = load_project(&config, &args.path, &args.project)?;
            let exit = if report.failed.is_empty() { 0 } else { 1 };
            if args.json {
                print_json(&report)?;
            } else {
                print_load_report(&report);
            }
            Ok(exit)
        }
        Command::Symbols(args) => {
            let (indexer, _) = load_project(&config, &args.path, &args.project)?;
            let symbols = indexer.all_symbols(&args.query);
            if args.json {
                print_json(&symbols)?;
            } else {
                for symbol in &symbols {
                    print_symbol(symbol);
                }
            }
            Ok(0)
        }
        Command::Beans(args) => {
            let (indexer, _) = load_project(&config, &args.path, &args.project)?;
            let file = args
                .file
                .canonicalize()
                .with_context(|| format!("failed to resolve {}", args.file.display()))?;
            let beans = indexer.beans_of_document(&boot_index::path_to_uri(&file));
            if args.json {
                print_json(&beans)?;
            } else {
                for bean in &beans {
                    println!("{}: {}", bean.name, bean.bean_type);
                }
            }
            Ok(0)
        }
        Command::Cache(args) => {
            if config.cache.backend != CacheBackend::Disk {
                anyhow::bail!("the configured cache backend keeps nothing on disk");
            }
            let dir = config.symbols_dir()?;
            let store = OnDiskStore::new(&dir, Arc::new(LocalFs))?;
            match args.command {
                CacheCommand::Clean => {
                    let removed = store.clear()?;
                    let report = CacheCleanReport { dir, removed };
                    if args.json {
                        print_json(&report)?;
                    } else {
                        println!("removed {} artifacts from {}", report.removed, report.dir.display());
                    }
                }
                CacheCommand::Status => {
                    let status = CacheStatus {
                        artifacts: store.artifacts()?,
                        dir,
                    };
                    if args.json {
                        print_json(&status)?;
                    } else {
                        println!("cache: {}", status.dir.display());
                        for artifact in &status.artifacts {
                            println!("  {} ({} bytes)", artifact.key, artifact.bytes);
                        }
                    }
                }
            }
            Ok(0)
        }
    }
}

fn describe_project(path: &Path, args: &ProjectArgs) -> Result<ProjectDescriptor> {
    let root = path
        .canonicalize()
        .with_context(|| format!("failed to resolve project root {}", path.display()))?;
    let name = match &args.name {
        Some(name) => name.clone(),
        None => root
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("project")
            .to_string(),
    };
    let descriptor = if root.join("src/main/java").is_dir() {
        ProjectDescriptor::maven_layout(name, &root)
    } else {
        ProjectDescriptor::new(name, &root).with_source_folder(root.clone(), SourceKind::Main)
    };
    Ok(args
        .classpath
        .iter()
        .fold(descriptor, |descriptor, entry| descriptor.with_classpath_entry(entry)))
}

fn load_project(
    config: &IndexerConfig,
    path: &Path,
    args: &ProjectArgs,
) -> Result<(Indexer, LoadReport)> {
    let descriptor = describe_project(path, args)?;
    let mut config = config.clone();
    config.index.scan_test_sources |= args.tests;
    let indexer = Indexer::from_config(&config)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start runtime")?;
    let report = runtime
        .block_on(indexer.add_project(descriptor).join())
        .context("indexing failed")?;
    tracing::debug!(
        target = "boot.cli",
        project = %report.project,
        from_cache = report.from_cache,
        "project ready"
    );
    Ok((indexer, report))
}

fn print_load_report(report: &LoadReport) {
    println!("indexed: {}", report.project);
    println!("  files: {}", report.files);
    println!("  symbols: {}", report.symbols);
    println!("  from_cache: {}", report.from_cache);
    for failure in &report.failed {
        println!("  failed: {}: {}", failure.path.display(), failure.message);
    }
}

fn print_symbol(symbol: &Symbol) {
    let start = symbol.location.range.start;
    let location = uri_to_path(&symbol.location.uri)
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| symbol.location.uri.clone());
    println!(
        "{}\t{}:{}:{}",
        symbol.name,
        location,
        start.line + 1,
        start.character + 1
    );
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value)?;
    println!("{out}");
    Ok(())
}
