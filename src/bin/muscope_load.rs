use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use muscope_loader::app::{LoadOptions, Loader, delete_investigator_samples};
use muscope_loader::config::{ConfigLoader, ResolvedConfig};
use muscope_loader::error::LoaderError;
use muscope_loader::output::JsonOutput;
use muscope_loader::remote::MountedStore;
use muscope_loader::spreadsheet::CalamineReader;
use muscope_loader::sqlite::SqliteCatalog;
use muscope_loader::store::Workspace;

#[derive(Parser)]
#[command(name = "muscope-load")]
#[command(about = "Load cruise attribute spreadsheets and sequence files into the muSCOPE catalog")]
#[command(version)]
struct Cli {
    /// SQLite catalog database
    #[arg(long, global = true, default_value = "muscope.db")]
    db: String,

    /// Persist changes; without it every change is rolled back
    #[arg(long, global = true)]
    commit: bool,

    #[arg(long, global = true)]
    config: Option<String>,

    /// Local directory the data store is mounted at
    #[arg(long, global = true, default_value = "/")]
    mount_root: Utf8PathBuf,

    #[arg(long, global = true)]
    scratch_dir: Option<Utf8PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Load attribute spreadsheets, then link data files to samples")]
    Load(LoadArgs),
    #[command(about = "Merge water-column sensor readings into sample attributes")]
    MergeCtd,
    #[command(about = "List sample files that no longer exist in the data store")]
    AuditFiles,
    #[command(about = "Delete every sample of an investigator")]
    DeleteInvestigatorSamples(DeleteArgs),
}

#[derive(Args)]
struct LoadArgs {
    /// Comma-separated collection paths
    #[arg(long, value_delimiter = ',', required = true)]
    collections: Vec<Utf8PathBuf>,

    #[arg(long)]
    attribute_file_pattern: Option<String>,

    #[arg(long)]
    file_limit: Option<usize>,
}

#[derive(Args)]
struct DeleteArgs {
    last_name: String,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<LoaderError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &LoaderError) -> u8 {
    match error {
        LoaderError::ConfigRead(_)
        | LoaderError::ConfigParse(_)
        | LoaderError::InvalidPattern { .. } => 2,
        LoaderError::UnknownInvestigator(_) => 2,
        LoaderError::Database(_) | LoaderError::Filesystem(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ConfigLoader::resolve(cli.config.as_deref())?;
    let mut catalog = SqliteCatalog::open(&cli.db)?;

    match cli.command {
        Commands::Load(args) => {
            let config = match args.attribute_file_pattern.as_deref() {
                Some(pattern) => config.with_attribute_file_pattern(pattern)?,
                None => config,
            };
            let loader = build_loader(config, cli.mount_root, cli.scratch_dir)?;
            let options = LoadOptions {
                commit: cli.commit,
                file_limit: args.file_limit,
            };
            let report = loader.run(&mut catalog, &args.collections, &options)?;
            JsonOutput::print_load(&report).into_diagnostic()?;
        }
        Commands::MergeCtd => {
            let loader = build_loader(config, cli.mount_root, cli.scratch_dir)?;
            let result = loader.merge_ctd(&mut catalog, cli.commit)?;
            JsonOutput::print_ctd(&result).into_diagnostic()?;
        }
        Commands::AuditFiles => {
            let loader = build_loader(config, cli.mount_root, cli.scratch_dir)?;
            let report = loader.audit_sample_files(&catalog)?;
            JsonOutput::print_audit(&report).into_diagnostic()?;
        }
        Commands::DeleteInvestigatorSamples(args) => {
            let report = delete_investigator_samples(&mut catalog, &args.last_name, cli.commit)?;
            JsonOutput::print_delete(&report).into_diagnostic()?;
        }
    }
    Ok(())
}

fn build_loader(
    config: ResolvedConfig,
    mount_root: Utf8PathBuf,
    scratch_dir: Option<Utf8PathBuf>,
) -> miette::Result<Loader<MountedStore, CalamineReader>> {
    let workspace = match scratch_dir.or_else(|| config.scratch_dir.clone()) {
        Some(root) => Workspace::new_with_root(root),
        None => Workspace::new()?,
    };
    let loader = Loader::new(
        workspace,
        MountedStore::new(mount_root),
        CalamineReader::new(),
        config,
    )?;
    Ok(loader)
}
