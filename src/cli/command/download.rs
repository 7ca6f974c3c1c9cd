//! Runs a download request built from command line flags.

use std::sync::Arc;

use anyhow::{Context, Result};
use hycom3h::{
    download::{ProxyPool, ReqwestFetcher, UserAgents},
    manager::RetryPolicy,
    DownloadRequest, Downloader, NetworkOptions, RunCounters,
};

use crate::cli::{create_progress_bar, DownloadArgs};

pub async fn download(args: &DownloadArgs) -> Result<RunCounters> {
    let request = make_request(args);
    let network = network_options(args)?;

    let fetcher = ReqwestFetcher::new().context("could not build HTTP client")?;
    let bar = create_progress_bar(0, "Downloading...".to_string());
    let downloader = Downloader::new(Arc::new(fetcher), RetryPolicy::default(), network)
        .with_progress(bar);

    downloader
        .download(&request)
        .await
        .map_err(|e| anyhow::anyhow!("{} error: {e}", e.category()))
}

fn make_request(args: &DownloadArgs) -> DownloadRequest {
    DownloadRequest {
        time_end: args.end.clone(),
        bbox: args.region.bbox(),
        depth: args.region.depth,
        level: args.region.level,
        destination: args.output.clone(),
        dataset: args.dataset.clone(),
        version: args.dataset_version.clone(),
        workers: Some(args.workers),
        skip_existing: args.skip_existing,
        steps_per_file: args.steps_per_file,
        ..DownloadRequest::new(args.variables.clone(), args.start.clone())
    }
}

fn network_options(args: &DownloadArgs) -> Result<NetworkOptions> {
    let user_agents = match &args.user_agents {
        Some(path) => UserAgents::from_file(path)
            .with_context(|| format!("reading user agents from `{}`", path.display()))?,
        None => UserAgents::default(),
    };
    let proxies = match &args.proxies {
        Some(path) => Some(
            ProxyPool::from_file(path)
                .with_context(|| format!("reading proxies from `{}`", path.display()))?,
        ),
        None => None,
    };

    Ok(NetworkOptions {
        user_agents,
        proxies,
    })
}

// -- Tests -------------------------------------------------------------------
