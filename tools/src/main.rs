use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use engine::EngineConfig;
use glob::Pattern;
use nodes::{schema_for, EntityKind};
use schema::SyncType;
use synctree_tools::{
    decode_clone_payload, describe_schema, format_decode_pretty, format_schema_pretty,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "synctree-tools",
    version,
    about = "synctree schema inspection and clone payload decoding"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print an entity kind's schema tree and hash.
    Schema {
        /// Entity kind, e.g. `automobile` or `pickup_placement`.
        #[arg(long, value_parser = parse_kind)]
        kind: EntityKind,
        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
        format: OutputFormat,
    },
    /// Decode captured clone payloads.
    Decode {
        /// Payload file, or a directory of payload files.
        payload_path: PathBuf,
        #[arg(long, value_parser = parse_kind)]
        kind: EntityKind,
        #[arg(long, value_enum)]
        sync_type: SyncTypeArg,
        /// Optional glob filter when decoding a directory.
        #[arg(long)]
        glob: Option<String>,
        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
        /// Engine configuration JSON (game build, change policy).
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SyncTypeArg {
    Create,
    Update,
    Migrate,
}

impl From<SyncTypeArg> for SyncType {
    fn from(arg: SyncTypeArg) -> Self {
        match arg {
            SyncTypeArg::Create => Self::Create,
            SyncTypeArg::Update => Self::Update,
            SyncTypeArg::Migrate => Self::Migrate,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Schema { kind, format } => {
            let report = describe_schema(&schema_for(kind));
            match format {
                OutputFormat::Json => {
                    let json = serde_json::to_string_pretty(&report).context("serialize json")?;
                    println!("{json}");
                }
                OutputFormat::Pretty => print!("{}", format_schema_pretty(&report)),
            }
        }
        Command::Decode {
            payload_path,
            kind,
            sync_type,
            glob,
            format,
            config,
        } => {
            let config = config
                .as_deref()
                .map(load_config)
                .transpose()
                .context("load config")?
                .unwrap_or_default();
            let paths = if payload_path.is_dir() {
                collect_payload_paths(&payload_path, glob.as_deref())?
            } else {
                vec![payload_path]
            };
            let many = paths.len() > 1;
            for path in paths {
                let bytes = fs::read(&path)
                    .with_context(|| format!("read payload {}", path.display()))?;
                let report = decode_clone_payload(&bytes, None, kind, sync_type.into(), config);
                if many {
                    println!("== {} ({} bytes) ==", path.display(), bytes.len());
                }
                match format {
                    OutputFormat::Json => {
                        let json =
                            serde_json::to_string_pretty(&report).context("serialize json")?;
                        println!("{json}");
                    }
                    OutputFormat::Pretty => print!("{}", format_decode_pretty(&report)),
                }
            }
        }
    }
    Ok(())
}

fn parse_kind(value: &str) -> Result<EntityKind, String> {
    value.parse::<EntityKind>().map_err(|err| err.to_string())
}

fn load_config(path: &Path) -> Result<EngineConfig> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
    serde_json::from_str(&contents).context("parse config json")
}

fn collect_payload_paths(dir: &Path, glob: Option<&str>) -> Result<Vec<PathBuf>> {
    let pattern = match glob {
        Some(value) => Some(Pattern::new(value).context("invalid glob pattern")?),
        None => None,
    };

    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("read dir {}", dir.display()))? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        if let Some(pattern) = &pattern {
            let matches_path = pattern.matches_path(&path);
            let matches_name = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| pattern.matches(name));
            if !matches_path && !matches_name {
                continue;
            }
        }
        paths.push(path);
    }
    paths.sort();
    Ok(paths)
}
