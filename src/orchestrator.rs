//! Entry point: validates a request, plans one task per file and runs them.

use std::{path::PathBuf, sync::Arc};

use indicatif::ProgressBar;
use tracing::{info, warn};

use crate::{
    counters::{RunCounters, SharedCounters},
    download::{make_file_name, Fetcher, ProxyPool, ReqwestFetcher, UserAgents},
    errors::{Error, Result},
    manager::{DownloadManager, DownloadTask, RetryPolicy, MAX_WORKERS},
    query::{build_query, BoundingBox, TimeSelection, Vertical},
    registry::{DatasetVersion, Registry},
    resolver::TimeResolver,
    time::{time_steps, Timestamp, STEP_HOURS},
    url::UrlBuilder,
    variable::{normalise_variables, Variable, VariableGroup},
};

pub const MAX_STEPS_PER_FILE: usize = 8;

/// Everything a caller can ask of one download run.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    /// Short codes, remote names or standard names.
    pub variables: Vec<String>,
    /// `YYYYMMDDHH` or `YYYYMMDD`.
    pub time_start: String,
    pub time_end: Option<String>,
    pub bbox: BoundingBox,
    pub depth: Option<f64>,
    pub level: Option<i32>,
    /// Defaults to the working directory.
    pub destination: Option<PathBuf>,
    pub dataset: Option<String>,
    pub version: Option<String>,
    pub workers: Option<usize>,
    pub skip_existing: bool,
    pub steps_per_file: usize,
}

impl DownloadRequest {
    pub fn new<S: Into<String>>(variables: Vec<S>, time_start: impl Into<String>) -> Self {
        Self {
            variables: variables.into_iter().map(Into::into).collect(),
            time_start: time_start.into(),
            time_end: None,
            bbox: BoundingBox::default(),
            depth: None,
            level: None,
            destination: None,
            dataset: None,
            version: None,
            workers: None,
            skip_existing: false,
            steps_per_file: 1,
        }
    }
}

/// A validated request.
#[derive(Debug, Clone)]
pub struct Plan {
    pub variables: Vec<Variable>,
    pub steps: Vec<TimeSelection>,
    pub bbox: BoundingBox,
    pub vertical: Vertical,
    pub destination: PathBuf,
    pub explicit: Option<&'static DatasetVersion>,
    pub workers: usize,
    pub skip_existing: bool,
}

impl Plan {
    /// Checks everything that can be checked before touching the network.
    pub fn from_request(request: &DownloadRequest, resolver: &TimeResolver) -> Result<Self> {
        let variables = normalise_variables(&request.variables)?;
        request.bbox.validate()?;

        let start = Timestamp::parse_start(&request.time_start)?;
        let end = match &request.time_end {
            Some(end) => Timestamp::parse_end(end)?,
            None => start,
        };
        if start > end {
            return Err(Error::ReversedRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        for t in [start, end] {
            if !t.is_model_hour() {
                return Err(Error::InvalidHour(t.to_string()));
            }
        }

        let steps_per_file = request.steps_per_file.clamp(1, MAX_STEPS_PER_FILE);
        if steps_per_file != request.steps_per_file {
            warn!(
                requested = request.steps_per_file,
                using = steps_per_file,
                "steps per file must be in 1-8"
            );
        }
        let steps = plan_steps(start, end, steps_per_file)?;

        let explicit = match (&request.dataset, &request.version) {
            (Some(dataset), Some(version)) => {
                let range_end = (end != start).then_some(end);
                if !resolver.resolve_explicit(dataset, version, start, range_end)? {
                    let span = match range_end {
                        Some(end) => format!("{start}-{end}"),
                        None => start.to_string(),
                    };
                    return Err(Error::OutsideExplicitCoverage {
                        dataset: dataset.clone(),
                        version: version.clone(),
                        span,
                    });
                }
                Some(resolver.registry().lookup(dataset, version)?)
            }
            (None, None) => None,
            _ => {
                warn!("dataset and version must be given together, choosing both from the time");
                None
            }
        };

        let workers = request.workers.unwrap_or(1).clamp(1, MAX_WORKERS);
        let destination = match &request.destination {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()?,
        };

        Ok(Self {
            variables,
            steps,
            bbox: request.bbox,
            vertical: Vertical::from_options(request.depth, request.level),
            destination,
            explicit,
            workers,
            skip_existing: request.skip_existing,
        })
    }

    /// Builds the tasks of one time step against a resolved entry.
    pub fn tasks_for(&self, entry: &'static DatasetVersion, time: TimeSelection) -> Result<Vec<DownloadTask>> {
        let builder = UrlBuilder::new(entry);

        file_groups(&self.variables, entry)
            .into_iter()
            .map(|(key, variables)| -> Result<DownloadTask> {
                let first = variables[0];
                let mut query = build_query(first, &self.bbox, &time, self.vertical);
                for v in &variables[1..] {
                    query.add_variable(*v);
                }
                let url = builder.submit_url(first, time.start(), &query)?;

                let start = time.start().to_string();
                let end = time.is_range().then(|| time.end().to_string());
                let file_name = make_file_name(&key, &start, end.as_deref());

                Ok(DownloadTask {
                    key,
                    variables,
                    time,
                    bbox: self.bbox,
                    vertical: self.vertical,
                    dataset: entry.dataset,
                    version: entry.version,
                    url,
                    directory: self.destination.clone(),
                    file_name,
                })
            })
            .collect()
    }
}

/// Splits `start..=end` into the time selection of each request.
pub fn plan_steps(start: Timestamp, end: Timestamp, steps_per_file: usize) -> Result<Vec<TimeSelection>> {
    if start == end {
        return Ok(vec![TimeSelection::Instant(start)]);
    }

    let all = time_steps(start, end, STEP_HOURS)?;
    if steps_per_file <= 1 {
        return Ok(all.into_iter().map(TimeSelection::Instant).collect());
    }

    Ok(all
        .chunks(steps_per_file)
        .map(|chunk| TimeSelection::Range {
            start: chunk[0],
            end: chunk[chunk.len() - 1],
        })
        .collect())
}

/// Groups variables by the remote file they come from, each with the key
/// used in its file name.
pub fn file_groups(variables: &[Variable], entry: &DatasetVersion) -> Vec<(String, Vec<Variable>)> {
    if variables.len() == 1 || entry.layout.splits_variables() {
        return variables
            .iter()
            .map(|v| (v.var_name().to_string(), vec![*v]))
            .collect();
    }

    VariableGroup::ALL
        .iter()
        .filter_map(|group| {
            let members: Vec<Variable> = variables
                .iter()
                .copied()
                .filter(|v| v.group() == *group)
                .collect();
            match members.len() {
                0 => None,
                1 => Some((members[0].var_name().to_string(), members)),
                _ => Some((group.key().to_string(), members)),
            }
        })
        .collect()
}

/// Network settings that are not part of a single request.
#[derive(Debug, Clone, Default)]
pub struct NetworkOptions {
    pub user_agents: UserAgents,
    pub proxies: Option<ProxyPool>,
}

/// Resolves, plans and runs download requests.
pub struct Downloader {
    resolver: TimeResolver,
    manager: DownloadManager,
}

impl Downloader {
    pub fn new(fetcher: Arc<dyn Fetcher>, policy: RetryPolicy, network: NetworkOptions) -> Self {
        let manager = DownloadManager::new(fetcher)
            .with_policy(policy)
            .with_user_agents(network.user_agents)
            .with_proxies(network.proxies);

        Self {
            resolver: TimeResolver::new(Registry::hycom()),
            manager,
        }
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.manager = self.manager.with_progress(progress);
        self
    }

    /// Runs `request` and returns the final tallies. Only configuration and
    /// registry errors are returned; per-time misses and transport failures
    /// are counted instead.
    pub async fn download(&self, request: &DownloadRequest) -> Result<RunCounters> {
        let plan = Plan::from_request(request, &self.resolver)?;
        tokio::fs::create_dir_all(&plan.destination).await?;

        if let Some(entry) = plan.explicit {
            info!(dataset = entry.dataset, version = entry.version, "using requested dataset");
        }
        let codes: Vec<&str> = plan.variables.iter().map(|v| v.code()).collect();
        info!(
            variables = ?codes,
            steps = plan.steps.len(),
            vertical = %plan.vertical,
            destination = %plan.destination.display(),
            "planning download"
        );

        let counters = SharedCounters::new();
        let mut tasks = Vec::new();
        for step in &plan.steps {
            let resolved = match plan.explicit {
                Some(entry) => match step {
                    TimeSelection::Instant(_) => Ok(entry),
                    TimeSelection::Range { start, end } => self
                        .resolver
                        .ensure_single_file(entry, *start, *end)
                        .map(|()| entry),
                },
                None => match step {
                    TimeSelection::Instant(t) => self.resolver.resolve(*t),
                    TimeSelection::Range { start, end } => self.resolver.resolve_range(*start, *end),
                },
            };

            match resolved {
                Ok(entry) => tasks.extend(plan.tasks_for(entry, *step)?),
                Err(e) if e.is_resolution_miss() => {
                    warn!(time = %step, error = %e, "no data");
                    counters.record_no_data(step.to_string());
                }
                Err(e) => return Err(e),
            }
        }

        self.manager
            .run(tasks, plan.workers, plan.skip_existing, &counters)
            .await;

        let summary = counters.snapshot();
        info!(
            total = summary.total(),
            success = summary.success,
            fail = summary.fail,
            skip = summary.skip,
            no_data = summary.no_data,
            "download finished"
        );

        Ok(summary)
    }
}

/// Downloads with the default HTTP client, retry policy and user agents.
pub async fn download(request: &DownloadRequest) -> Result<RunCounters> {
    let fetcher = ReqwestFetcher::new()?;
    Downloader::new(Arc::new(fetcher), RetryPolicy::default(), NetworkOptions::default())
        .download(request)
        .await
}

// -- Tests -------------------------------------------------------------------
