use std::error::Error;
use std::ffi::OsString;
use std::path::PathBuf;

use clap::{Parser, error::ErrorKind};

use crate::config::StoreConfig;
use crate::store::{ArchiveIngestor, Freshness, StoreIndex};

#[derive(Debug, Parser)]
#[command(
    name = "openimmo-sync",
    disable_help_subcommand = true,
    about = "Apply pending OpenImmo export archives to the store",
    long_about = "Extract pending openimmo<token>.zip archives in token order, install, replace or delete objects, and rewrite the store index.",
    after_help = "Without --base-dir the OPENIMMO_* environment variables are used."
)]
struct SyncCli {
    #[arg(
        long = "base-dir",
        value_name = "DIR",
        help = "Directory holding pending archives and the index file"
    )]
    base_dir: Option<PathBuf>,
    #[arg(
        long = "extract-dir",
        value_name = "DIR",
        help = "Store directory (defaults to <base-dir>/extracted)"
    )]
    extract_dir: Option<PathBuf>,
    #[arg(
        long = "index-path",
        value_name = "FILE",
        help = "Index file (defaults to <base-dir>/object_index.json)"
    )]
    index_path: Option<PathBuf>,
    #[arg(long = "preserve-archives", help = "Keep source archives after ingestion")]
    preserve_archives: bool,
    #[arg(long = "raw-ids", help = "Use vendor object numbers without normalization")]
    raw_ids: bool,
    #[arg(
        long = "check",
        conflicts_with = "rebuild_index",
        help = "Only report whether archives are pending"
    )]
    check: bool,
    #[arg(
        long = "rebuild-index",
        help = "Rebuild the index from the store layout without ingesting"
    )]
    rebuild_index: bool,
}

impl SyncCli {
    fn into_config(self) -> Result<StoreConfig, Box<dyn Error>> {
        let mut config = match self.base_dir {
            Some(base_dir) => StoreConfig::new(base_dir),
            None => StoreConfig::from_env()?,
        };
        if let Some(dir) = self.extract_dir {
            config = config.with_extract_dir(dir);
        }
        if let Some(path) = self.index_path {
            config = config.with_index_path(path);
        }
        if self.preserve_archives {
            config = config.with_preserve_archives(true);
        }
        if self.raw_ids {
            config = config.with_normalize_ids(false);
        }
        config.validate()?;
        Ok(config)
    }
}

/// Run one sync pass as the `openimmo-sync` binary does.
///
/// `args_iter` excludes the program name.
pub fn run_sync<I>(args_iter: I) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let Some(cli) =
        parse_cli::<SyncCli, _>(std::iter::once("openimmo-sync".to_string()).chain(args_iter))?
    else {
        return Ok(());
    };
    let check = cli.check;
    let rebuild_index = cli.rebuild_index;
    let config = cli.into_config()?;
    let ingestor = ArchiveIngestor::from_config(&config);

    if check {
        let pending = ingestor.pending(&config.base_dir)?;
        if pending.is_empty() {
            println!("Store is up to date.");
        } else {
            println!("{} archive(s) pending:", pending.len());
            for archive in pending {
                println!("  {}", archive.path.display());
            }
        }
        return Ok(());
    }

    if rebuild_index {
        let index = StoreIndex::open(
            &config.store_dir(),
            &config.index_path(),
            &config.layout,
            Freshness::Rescan,
        )?;
        println!(
            "Indexed {} object(s) into {}",
            index.len(),
            config.index_path().display()
        );
        return Ok(());
    }

    let report = ingestor.run(&config.base_dir, &config.store_dir())?;
    println!(
        "applied {} / deleted {} / broken {} / skipped {} / indexed {}",
        report.applied_ids.len(),
        report.deleted_ids.len(),
        report.broken_count,
        report.skipped_count,
        report.indexed_count
    );
    Ok(())
}

fn parse_cli<T, I>(args: I) -> Result<Option<T>, Box<dyn Error>>
where
    T: Parser,
    I: IntoIterator,
    I::Item: Into<OsString> + Clone,
{
    match T::try_parse_from(args) {
        Ok(cli) => Ok(Some(cli)),
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                err.print()?;
                Ok(None)
            }
            _ => Err(err.into()),
        },
    }
}
