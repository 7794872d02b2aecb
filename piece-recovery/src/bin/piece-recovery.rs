use std::path::{Path, PathBuf};
use std::process::exit;

use anyhow::{Context, Result};
use log::{error, info};
use piece_accessor::{
    recover_sectors, ArchiveFetcher, ArchiveSource, LocalArchive, RecoveryParams, RemoteArchive,
    RemoteStoreConfig, SETTINGS,
};
use piece_recovery::{ApiInfo, MinerRpcClient};
use piece_sealer::BasicFsSealer;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "piece-recovery",
    about = "Rebuilds lost sector data from the remote piece archive store."
)]
enum Cli {
    /// Recover the unsealed data of one or more sectors.
    Run(RunOpts),
}

#[derive(Debug, StructOpt)]
struct RunOpts {
    #[structopt(
        long,
        value_name = "PATH",
        help = "Staging directory for the per-sector scratch directories [default: /seal/recovery]."
    )]
    path: Option<String>,
    #[structopt(
        long,
        value_name = "URL",
        help = "Base URL of the remote archive store [default: http://minio.com:9000/car]."
    )]
    url: Option<String>,
    #[structopt(
        long = "sis",
        value_name = "SECTOR NUMBER",
        use_delimiter = true,
        number_of_values = 1,
        help = "Sector number to recover; repeat or comma-separate for several."
    )]
    sis: Vec<u64>,
    #[structopt(
        long,
        value_name = "FILE OR DIR",
        parse(from_os_str),
        help = "Read archives from local disk instead of the remote store."
    )]
    archive: Option<PathBuf>,
    #[structopt(long, help = "Keep the scratch directory of a sector that failed to recover.")]
    keep_on_failure: bool,
    #[structopt(
        long,
        value_name = "TOKEN:MULTIADDR",
        help = "Storage node API; defaults to $MINER_API_INFO."
    )]
    api: Option<String>,
}

fn run(opts: RunOpts) -> Result<()> {
    let params = RecoveryParams {
        sectors: opts.sis,
        staging_path: PathBuf::from(opts.path.unwrap_or_else(|| SETTINGS.recovery_path.clone())),
        keep_on_failure: opts.keep_on_failure,
    };

    let api_info = match opts.api {
        Some(api) => api.parse()?,
        None => ApiInfo::from_env()?,
    };
    info!("using storage node api at {}", api_info.url);
    let node = MinerRpcClient::new(api_info)?;

    let archive: Box<dyn ArchiveSource> = match opts.archive {
        Some(path) => {
            info!("reading archives from {:?}", path);
            Box::new(LocalArchive::new(path).with_extension(SETTINGS.archive_extension.clone()))
        }
        None => {
            let url = opts.url.unwrap_or_else(|| SETTINGS.recovery_url.clone());
            info!("fetching archives from {}", url);
            let config = RemoteStoreConfig::new(url)?
                .with_archive_extension(SETTINGS.archive_extension.clone())
                .with_request_timeout(SETTINGS.request_timeout());
            Box::new(RemoteArchive::new(ArchiveFetcher::new(config)?))
        }
    };

    let recovered = recover_sectors(&node, archive.as_ref(), &params, |root: &Path| {
        BasicFsSealer::new(root)
    })
    .context("recovery failed")?;

    for sector in recovered {
        info!("sector {} recovered into {:?}", sector.sector, sector.scratch_dir);
        println!("{}\t{}", sector.sector, sector.piece.piece_cid);
    }

    Ok(())
}

fn main() {
    fil_logger::init();

    let result = match Cli::from_args() {
        Cli::Run(opts) => run(opts),
    };

    if let Err(err) = result {
        error!("{:?}", err);
        eprintln!("Error: {:#}", err);
        exit(1);
    }
}
