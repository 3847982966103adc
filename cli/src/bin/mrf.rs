use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use fetch::HttpSource;
use mrf_validator_cli::commands::{self, ValidateOptions};

#[derive(Parser)]
#[command(name = "mrf")]
#[command(about = "Validation tools for CMS machine-readable files")]
struct Cli {
    /// Schema repository directory (defaults to the configured one)
    #[arg(long, global = true)]
    repo: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a local JSON data file against a schema version
    Validate {
        data_file: PathBuf,
        schema_version: String,
        #[command(flatten)]
        options: ValidateArgs,
    },
    /// Download a data file and validate it against a schema version
    ValidateUrl {
        data_url: String,
        schema_version: String,
        #[command(flatten)]
        options: ValidateArgs,
    },
    /// List schema versions, and the targets of one version
    Schemas {
        #[arg(long)]
        version: Option<String>,
    },
}

#[derive(Args)]
struct ValidateArgs {
    /// Which schema the data file claims to conform to
    #[arg(long, default_value = "in-network-rates")]
    target: String,
    /// Forbid properties the schema does not declare
    #[arg(long)]
    strict: bool,
    /// Stop at the first violation instead of collecting all of them
    #[arg(long)]
    fail_fast: bool,
    /// Directory for output.txt, errors.json and the extracted reports
    #[arg(long)]
    out: Option<PathBuf>,
    /// Also download and validate the files the document references
    #[arg(long)]
    follow_references: bool,
    /// Download large or unknown-size files without confirmation
    #[arg(long)]
    yes: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    mrf_validator_cli::init_tracing();
    match run().await {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::from(1)
        }
    }
}

async fn run() -> Result<u8> {
    let cli = Cli::parse();
    let cfg = config::load().unwrap_or_default();
    let repo = cli
        .repo
        .or(cfg.schema_repo)
        .unwrap_or_else(|| PathBuf::from("schema-repo"));
    let source = HttpSource::new();

    match cli.command {
        Commands::Validate {
            data_file,
            schema_version,
            options,
        } => {
            let opts = options.into_options(cfg.download.always_yes);
            commands::validate(&data_file, &schema_version, &repo, &source, &opts).await
        }
        Commands::ValidateUrl {
            data_url,
            schema_version,
            options,
        } => {
            let opts = options.into_options(cfg.download.always_yes);
            commands::validate_url(&data_url, &schema_version, &repo, &source, &opts).await
        }
        Commands::Schemas { version } => commands::list_schemas(&repo, version.as_deref()),
    }
}

impl ValidateArgs {
    fn into_options(self, always_yes_configured: bool) -> ValidateOptions {
        ValidateOptions {
            target: self.target,
            strict: self.strict,
            fail_fast: self.fail_fast,
            out: self.out,
            follow_references: self.follow_references,
            always_yes: self.yes || always_yes_configured,
        }
    }
}
