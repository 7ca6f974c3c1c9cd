//! Streams one subsetting response to disk.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use async_trait::async_trait;
use futures::StreamExt;
use rand::seq::SliceRandom;
use reqwest::{Client, Proxy, StatusCode};
use thiserror::Error;
use tokio::{fs::File, io::AsyncWriteExt, io::BufWriter};

use crate::errors::Result;

/// Write buffer size for streamed bodies.
pub const CHUNK_SIZE: usize = 64 * 1024;

const DEFAULT_USER_AGENTS: [&str; 5] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:124.0) Gecko/20100101 Firefox/124.0",
];

/// Why a single attempt failed. Every kind is retried.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Status(StatusCode),

    #[error("error connecting: {0}")]
    Connect(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("request failed: {0}")]
    Request(String),

    #[error("error reading chunk: {0}")]
    Body(String),

    #[error("error writing file: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    fn from_reqwest(e: reqwest::Error, timeout: Duration) -> Self {
        if e.is_timeout() {
            TransportError::Timeout(timeout)
        } else if let Some(status) = e.status() {
            TransportError::Status(status)
        } else if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else if e.is_body() || e.is_decode() {
            TransportError::Body(e.to_string())
        } else {
            TransportError::Request(e.to_string())
        }
    }
}

/// Per-attempt request settings.
#[derive(Debug, Clone)]
pub struct FetchRequest<'a> {
    pub url: &'a str,
    pub user_agent: &'a str,
    pub proxy: Option<&'a str>,
    pub timeout: Duration,
}

/// Performs one GET and writes the body to `dest`, returning the number of
/// bytes written.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(
        &self,
        request: &FetchRequest<'_>,
        dest: &Path,
    ) -> std::result::Result<u64, TransportError>;
}

/// Fetcher backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: Client,
}

impl ReqwestFetcher {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self { client })
    }

    fn client_for(
        &self,
        proxy: Option<&str>,
    ) -> std::result::Result<Client, TransportError> {
        match proxy {
            None => Ok(self.client.clone()),
            Some(proxy) => Proxy::all(proxy)
                .and_then(|p| {
                    Client::builder()
                        .connect_timeout(Duration::from_secs(30))
                        .proxy(p)
                        .build()
                })
                .map_err(|e| TransportError::Request(e.to_string())),
        }
    }
}

#[async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(
        &self,
        request: &FetchRequest<'_>,
        dest: &Path,
    ) -> std::result::Result<u64, TransportError> {
        let to_transport = |e| TransportError::from_reqwest(e, request.timeout);

        let response = self
            .client_for(request.proxy)?
            .get(request.url)
            .header(reqwest::header::USER_AGENT, request.user_agent)
            .timeout(request.timeout)
            .send()
            .await
            .map_err(to_transport)?
            .error_for_status()
            .map_err(to_transport)?;

        let mut file = BufWriter::with_capacity(CHUNK_SIZE, File::create(dest).await?);
        let mut downloaded = 0u64;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(to_transport)?;
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;
        }
        file.flush().await?;

        Ok(downloaded)
    }
}

/// User-Agent strings, one picked at random per attempt.
#[derive(Debug, Clone)]
pub struct UserAgents {
    agents: Vec<String>,
}

impl UserAgents {
    /// Loads one agent per line, ignoring blank lines. Falls back to the
    /// built-in list when the file holds none.
    pub fn from_file(path: &Path) -> Result<Self> {
        let agents = read_lines(path)?;
        if agents.is_empty() {
            return Ok(Self::default());
        }
        Ok(Self { agents })
    }

    pub fn pick(&self) -> &str {
        self.agents
            .choose(&mut rand::thread_rng())
            .map(String::as_str)
            .unwrap_or(DEFAULT_USER_AGENTS[0])
    }
}

impl Default for UserAgents {
    fn default() -> Self {
        Self {
            agents: DEFAULT_USER_AGENTS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// `host:port` proxies used for both http and https.
#[derive(Debug, Clone)]
pub struct ProxyPool {
    proxies: Vec<String>,
}

impl ProxyPool {
    pub fn new(addresses: Vec<String>) -> Self {
        let proxies = addresses
            .into_iter()
            .map(|a| {
                if a.contains("://") {
                    a
                } else {
                    format!("http://{a}")
                }
            })
            .collect();
        Self { proxies }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        Ok(Self::new(read_lines(path)?))
    }

    pub fn pick(&self) -> Option<&str> {
        self.proxies
            .choose(&mut rand::thread_rng())
            .map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }
}

fn read_lines(path: &Path) -> Result<Vec<String>> {
    Ok(fs::read_to_string(path)?
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// `HYCOM_<key>_<time>.nc`, or `HYCOM_<key>_<start>_<end>.nc` for ranges.
pub fn make_file_name(key: &str, start: &str, end: Option<&str>) -> String {
    match end {
        Some(end) => format!("HYCOM_{key}_{start}_{end}.nc"),
        None => format!("HYCOM_{key}_{start}.nc"),
    }
}

/// Removes `path` if present.
pub fn clear_existing_file(path: &Path) -> Result<bool> {
    if path.exists() {
        fs::remove_file(path)?;
        return Ok(true);
    }
    Ok(false)
}

pub fn destination_path(dir: &Path, file_name: &str) -> PathBuf {
    dir.join(file_name)
}

// -- Tests -------------------------------------------------------------------
