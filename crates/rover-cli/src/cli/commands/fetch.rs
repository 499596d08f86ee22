//! `rover fetch` – reconcile the local cache and download registered files.

use anyhow::Result;
use rover_core::cache::LocalFs;
use rover_core::checksum::Sha2Hasher;
use rover_core::config::{MountLocation, RoverConfig};
use rover_core::fetch::{self, FetchRequest};
use rover_core::fetcher::CurlFetcher;

pub fn run_fetch(
    cfg: &RoverConfig,
    mount: &MountLocation,
    repo: String,
    url: String,
    files: Vec<String>,
    no_cache: bool,
) -> Result<()> {
    println!("Rover is retrieving samples from {repo}!");

    let request = FetchRequest {
        repo,
        url,
        files,
        no_cache,
    };
    let fetcher = CurlFetcher::new(cfg);
    let summary = fetch::run_fetch(
        &request,
        mount,
        cfg.mismatch_policy,
        &LocalFs,
        &Sha2Hasher,
        &fetcher,
    )?;

    for file in &summary.reconcile.evicted {
        println!("  evicted     {file}");
    }
    for (file, outcome) in &summary.outcomes {
        println!("  {outcome:<11} {file}");
    }
    println!("Rover has returned all samples in {}!", request.repo);
    Ok(())
}
