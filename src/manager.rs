//! Runs download tasks on a bounded pool with retries.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, Instant},
};

use futures::{stream, StreamExt};
use indicatif::ProgressBar;
use rand::Rng;
use tracing::{error, info, warn};

use crate::{
    counters::SharedCounters,
    download::{clear_existing_file, destination_path, FetchRequest, Fetcher, ProxyPool, UserAgents},
    integrity::{check_existing, sibling_stats, FileCheck},
    query::{BoundingBox, TimeSelection, Vertical},
    time::STEP_HOURS,
    variable::Variable,
};

pub const MAX_WORKERS: usize = 10;

/// One request: a variable group at one time (or span), written to one file.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadTask {
    /// Remote variable name, or group key when several variables share the file.
    pub key: String,
    pub variables: Vec<Variable>,
    pub time: TimeSelection,
    pub bbox: BoundingBox,
    pub vertical: Vertical,
    pub dataset: &'static str,
    pub version: &'static str,
    pub url: String,
    pub directory: PathBuf,
    pub file_name: String,
}

impl DownloadTask {
    pub fn path(&self) -> PathBuf {
        destination_path(&self.directory, &self.file_name)
    }
}

/// How a task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Success { attempts: u32, elapsed: Duration },
    Failed { attempts: u32 },
    Skipped,
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Pause after a failed attempt.
    pub retry_delay: Duration,
    /// Lower bound of the randomised per-attempt timeout.
    pub timeout_floor: Duration,
    /// Budget per variable per 3-hour step.
    pub timeout_per_variable: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            retry_delay: Duration::from_secs(3),
            timeout_floor: Duration::from_secs(5),
            timeout_per_variable: Duration::from_secs(5 * 60),
        }
    }
}

impl RetryPolicy {
    /// Upper bound of the per-attempt timeout: the number of 3-hour steps in
    /// the task times the per-variable budget times the variable count.
    pub fn timeout_ceiling(&self, task: &DownloadTask) -> Duration {
        let steps = match task.time {
            TimeSelection::Instant(_) => 1,
            TimeSelection::Range { start, end } => start
                .hours_until(end)
                .map(|hours| (hours / STEP_HOURS + 1).max(1))
                .unwrap_or(1),
        };
        let variables = task.variables.len().max(1) as u32;

        self.timeout_per_variable * (steps as u32) * variables
    }

    /// Random timeout between the floor and the task's ceiling.
    pub fn attempt_timeout(&self, task: &DownloadTask) -> Duration {
        let floor = self.timeout_floor.as_secs();
        let ceiling = self.timeout_ceiling(task).as_secs().max(floor);
        Duration::from_secs(rand::thread_rng().gen_range(floor..=ceiling))
    }
}

pub struct DownloadManager {
    fetcher: Arc<dyn Fetcher>,
    policy: RetryPolicy,
    user_agents: UserAgents,
    proxies: Option<ProxyPool>,
    progress: ProgressBar,
}

impl DownloadManager {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            fetcher,
            policy: RetryPolicy::default(),
            user_agents: UserAgents::default(),
            proxies: None,
            progress: ProgressBar::hidden(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_user_agents(mut self, user_agents: UserAgents) -> Self {
        self.user_agents = user_agents;
        self
    }

    pub fn with_proxies(mut self, proxies: Option<ProxyPool>) -> Self {
        self.proxies = proxies.filter(|p| !p.is_empty());
        self
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Runs every task with at most `workers` in flight; one worker runs them
    /// strictly in order. Outcomes are returned in completion order.
    pub async fn run(
        &self,
        tasks: Vec<DownloadTask>,
        workers: usize,
        skip_existing: bool,
        counters: &SharedCounters,
    ) -> Vec<TaskOutcome> {
        let total = tasks.len();
        let workers = workers.clamp(1, MAX_WORKERS);
        self.progress.set_length(total as u64);

        let mut outcomes = Vec::with_capacity(total);
        if workers == 1 {
            for task in &tasks {
                let outcome = self.execute(task, skip_existing, counters).await;
                self.finish(counters, total);
                outcomes.push(outcome);
            }
        } else {
            let mut pending = stream::iter(tasks.iter())
                .map(|task| self.execute(task, skip_existing, counters))
                .buffer_unordered(workers);

            while let Some(outcome) = pending.next().await {
                self.finish(counters, total);
                outcomes.push(outcome);
            }
        }

        self.progress.finish_with_message("Downloads finished");
        outcomes
    }

    fn finish(&self, counters: &SharedCounters, total: usize) {
        let done = counters.advance();
        self.progress.set_position(done as u64);
        self.progress
            .set_message(format!("Downloading... {done}/{total}"));
    }

    /// Runs one task: the optional existence check, then the retry loop.
    pub async fn execute(
        &self,
        task: &DownloadTask,
        skip_existing: bool,
        counters: &SharedCounters,
    ) -> TaskOutcome {
        let path = task.path();

        if skip_existing && self.existing_is_complete(task, &path).await {
            info!(file = %path.display(), "already downloaded, skipping");
            counters.record_skip();
            return TaskOutcome::Skipped;
        }
        if let Err(e) = clear_existing_file(&path) {
            warn!(file = %path.display(), error = %e, "could not remove existing file");
        }

        let outcome = self.fetch_with_retry(task, &path).await;
        match outcome {
            TaskOutcome::Success { elapsed, .. } => {
                info!(file = %path.display(), elapsed = ?elapsed, "downloaded");
                counters.record_success();
            }
            TaskOutcome::Failed { attempts } => {
                error!(
                    file = %path.display(),
                    attempts,
                    "download failed, you can skip it and try again later"
                );
                if let Err(e) = clear_existing_file(&path) {
                    warn!(file = %path.display(), error = %e, "could not remove partial file");
                }
                counters.record_failure();
            }
            TaskOutcome::Skipped => {}
        }

        outcome
    }

    /// Runs the sibling scan off the async workers.
    async fn existing_is_complete(&self, task: &DownloadTask, path: &Path) -> bool {
        let directory = task.directory.clone();
        let key = task.key.clone();
        let path = path.to_path_buf();

        tokio::task::spawn_blocking(move || already_complete(&directory, &key, &path))
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "existence check did not finish");
                false
            })
    }

    async fn fetch_with_retry(&self, task: &DownloadTask, path: &Path) -> TaskOutcome {
        let started = Instant::now();
        let ceiling = self.policy.timeout_ceiling(task);
        info!(
            file = %task.file_name,
            max_timeout_secs = ceiling.as_secs(),
            "requesting"
        );

        for attempt in 1..=self.policy.max_attempts {
            if attempt > 1 {
                info!(file = %task.file_name, attempt, "retrying");
            }

            let timeout = self.policy.attempt_timeout(task);
            let request = FetchRequest {
                url: &task.url,
                user_agent: self.user_agents.pick(),
                proxy: self.proxies.as_ref().and_then(|p| p.pick()),
                timeout,
            };

            match self.fetcher.fetch(&request, path).await {
                Ok(bytes) => {
                    info!(file = %task.file_name, bytes, attempt, "request complete");
                    return TaskOutcome::Success {
                        attempts: attempt,
                        elapsed: started.elapsed(),
                    };
                }
                Err(e) => {
                    warn!(
                        file = %task.file_name,
                        attempt,
                        timeout_secs = timeout.as_secs(),
                        error = %e,
                        "attempt failed"
                    );
                }
            }

            if attempt < self.policy.max_attempts {
                tokio::time::sleep(self.policy.retry_delay).await;
            }
        }

        TaskOutcome::Failed {
            attempts: self.policy.max_attempts,
        }
    }
}

/// True when a file exists and is not undersized. Undersized files are
/// deleted so they get downloaded again.
fn already_complete(directory: &Path, key: &str, path: &Path) -> bool {
    let check = sibling_stats(directory, key, path).and_then(|stats| check_existing(path, &stats));

    match check {
        Ok(FileCheck::Complete) => true,
        Ok(FileCheck::Missing) => false,
        Ok(FileCheck::Incomplete) => {
            if let Err(e) = clear_existing_file(path) {
                warn!(file = %path.display(), error = %e, "could not remove incomplete file");
            }
            false
        }
        Err(e) => {
            warn!(file = %path.display(), error = %e, "could not check existing file");
            false
        }
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use tempfile::TempDir;

    use super::*;
    use crate::{download::TransportError, time::Timestamp};

    /// Fails every attempt and counts them.
    #[derive(Default)]
    struct AlwaysFails {
        attempts: AtomicU32,
    }

    #[async_trait]
    impl Fetcher for AlwaysFails {
        async fn fetch(
            &self,
            _request: &FetchRequest<'_>,
            _dest: &Path,
        ) -> Result<u64, TransportError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(TransportError::Connect("connection refused".to_string()))
        }
    }

    /// Fails `failures` times, then writes a fixed payload.
    struct FlakyThenOk {
        failures: u32,
        attempts: AtomicU32,
        payload: Vec<u8>,
    }

    #[async_trait]
    impl Fetcher for FlakyThenOk {
        async fn fetch(&self, _request: &FetchRequest<'_>, dest: &Path) -> Result<u64, TransportError> {
            let n = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if n <= self.failures {
                return Err(TransportError::Timeout(Duration::from_secs(5)));
            }
            tokio::fs::write(dest, &self.payload).await?;
            Ok(self.payload.len() as u64)
        }
    }

    fn quick_policy() -> RetryPolicy {
        RetryPolicy {
            retry_delay: Duration::ZERO,
            ..RetryPolicy::default()
        }
    }

    fn task(dir: &Path, name: &str, time: TimeSelection, variables: Vec<Variable>) -> DownloadTask {
        DownloadTask {
            key: "water_u".to_string(),
            variables,
            time,
            bbox: BoundingBox::default(),
            vertical: Vertical::Full,
            dataset: "GLBy0.08",
            version: "93.0",
            url: "http://localhost/hycom?var=water_u".to_string(),
            directory: dir.to_path_buf(),
            file_name: name.to_string(),
        }
    }

    fn instant() -> TimeSelection {
        TimeSelection::Instant(Timestamp::ymdh(2019, 1, 1, 0))
    }

    #[test]
    fn should_scale_timeout_with_span_and_variables() {
        let dir = PathBuf::from("/tmp");
        let policy = RetryPolicy::default();

        let single = task(&dir, "a.nc", instant(), vec![Variable::U]);
        assert_eq!(policy.timeout_ceiling(&single), Duration::from_secs(300));

        let range = TimeSelection::Range {
            start: Timestamp::ymdh(2019, 1, 1, 0),
            end: Timestamp::ymdh(2019, 1, 1, 21),
        };
        let grouped = task(&dir, "b.nc", range, vec![Variable::U, Variable::V]);
        // 8 steps x 300 s x 2 variables
        assert_eq!(policy.timeout_ceiling(&grouped), Duration::from_secs(4800));

        for _ in 0..20 {
            let t = policy.attempt_timeout(&single);
            assert!(t >= Duration::from_secs(5) && t <= Duration::from_secs(300));
        }
    }

    #[tokio::test]
    async fn should_give_up_after_ten_attempts() {
        let dir = TempDir::new().unwrap();
        let fetcher = Arc::new(AlwaysFails::default());
        let manager = DownloadManager::new(fetcher.clone()).with_policy(quick_policy());
        let counters = SharedCounters::new();

        let t = task(dir.path(), "HYCOM_water_u_2019010100.nc", instant(), vec![Variable::U]);
        let outcome = manager.execute(&t, false, &counters).await;

        assert_eq!(outcome, TaskOutcome::Failed { attempts: 10 });
        assert_eq!(fetcher.attempts.load(Ordering::SeqCst), 10);
        let snapshot = counters.snapshot();
        assert_eq!(snapshot.fail, 1);
        assert_eq!(snapshot.success, 0);
    }

    #[tokio::test]
    async fn should_succeed_after_transient_failures() {
        let dir = TempDir::new().unwrap();
        let fetcher = Arc::new(FlakyThenOk {
            failures: 2,
            attempts: AtomicU32::new(0),
            payload: vec![1u8; 2048],
        });
        let manager = DownloadManager::new(fetcher.clone()).with_policy(quick_policy());
        let counters = SharedCounters::new();

        let t = task(dir.path(), "HYCOM_water_u_2019010100.nc", instant(), vec![Variable::U]);
        let outcome = manager.execute(&t, false, &counters).await;

        assert!(matches!(outcome, TaskOutcome::Success { attempts: 3, .. }));
        assert_eq!(std::fs::read(t.path()).unwrap().len(), 2048);
        assert_eq!(counters.snapshot().success, 1);
    }

    #[tokio::test]
    async fn should_skip_complete_existing_file() {
        let dir = TempDir::new().unwrap();
        let t = task(dir.path(), "HYCOM_water_u_2019010100.nc", instant(), vec![Variable::U]);
        std::fs::write(t.path(), vec![0u8; 10 * 1024]).unwrap();

        let fetcher = Arc::new(AlwaysFails::default());
        let manager = DownloadManager::new(fetcher.clone()).with_policy(quick_policy());
        let counters = SharedCounters::new();

        let outcome = manager.execute(&t, true, &counters).await;

        assert_eq!(outcome, TaskOutcome::Skipped);
        assert_eq!(fetcher.attempts.load(Ordering::SeqCst), 0);
        assert_eq!(counters.snapshot().skip, 1);
    }

    #[tokio::test]
    async fn should_redownload_undersized_existing_file() {
        let dir = TempDir::new().unwrap();
        let t = task(dir.path(), "HYCOM_water_u_2019010100.nc", instant(), vec![Variable::U]);
        std::fs::write(t.path(), b"truncated").unwrap();

        let fetcher = Arc::new(FlakyThenOk {
            failures: 0,
            attempts: AtomicU32::new(0),
            payload: vec![7u8; 8 * 1024],
        });
        let manager = DownloadManager::new(fetcher.clone()).with_policy(quick_policy());
        let counters = SharedCounters::new();

        let outcome = manager.execute(&t, true, &counters).await;

        assert!(matches!(outcome, TaskOutcome::Success { .. }));
        assert_eq!(std::fs::read(t.path()).unwrap().len(), 8 * 1024);
        assert_eq!(counters.snapshot().skip, 0);
    }

    #[tokio::test]
    async fn should_run_all_tasks_and_advance_progress() {
        let dir = TempDir::new().unwrap();
        let fetcher = Arc::new(FlakyThenOk {
            failures: 0,
            attempts: AtomicU32::new(0),
            payload: b"netcdf".to_vec(),
        });
        let manager = DownloadManager::new(fetcher).with_policy(quick_policy());
        let counters = SharedCounters::new();

        let tasks: Vec<DownloadTask> = (0..6)
            .map(|i| {
                task(
                    dir.path(),
                    &format!("HYCOM_water_u_20190101{:02}.nc", i * 3),
                    instant(),
                    vec![Variable::U],
                )
            })
            .collect();
        let outcomes = manager.run(tasks, 3, false, &counters).await;

        assert_eq!(outcomes.len(), 6);
        let snapshot = counters.snapshot();
        assert_eq!(snapshot.success, 6);
        assert_eq!(snapshot.completed, 6);
    }

    /// Sleeps for the delay encoded after `delay=` in the URL, then records
    /// the URL in completion order.
    #[derive(Default)]
    struct DelayedByUrl {
        completed: std::sync::Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Fetcher for DelayedByUrl {
        async fn fetch(&self, request: &FetchRequest<'_>, dest: &Path) -> Result<u64, TransportError> {
            let millis: u64 = request
                .url
                .rsplit("delay=")
                .next()
                .and_then(|d| d.parse().ok())
                .unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(millis)).await;
            tokio::fs::write(dest, b"netcdf").await?;
            self.completed.lock().unwrap().push(request.url.to_string());
            Ok(6)
        }
    }

    /// Writes part of a body, then drops the connection.
    struct TruncatesBody;

    #[async_trait]
    impl Fetcher for TruncatesBody {
        async fn fetch(&self, _request: &FetchRequest<'_>, dest: &Path) -> Result<u64, TransportError> {
            tokio::fs::write(dest, vec![1u8; 4096]).await?;
            Err(TransportError::Body("connection reset".to_string()))
        }
    }

    /// Three tasks whose fetches get faster in submission order.
    fn slowest_first(dir: &Path) -> Vec<DownloadTask> {
        [90u64, 50, 10]
            .iter()
            .enumerate()
            .map(|(i, delay)| {
                let mut t = task(
                    dir,
                    &format!("HYCOM_water_u_20190101{:02}.nc", i * 3),
                    instant(),
                    vec![Variable::U],
                );
                t.url = format!("http://localhost/hycom?task={i}&delay={delay}");
                t
            })
            .collect()
    }

    #[tokio::test]
    async fn should_run_in_submission_order_with_one_worker() {
        let dir = TempDir::new().unwrap();
        let fetcher = Arc::new(DelayedByUrl::default());
        let manager = DownloadManager::new(fetcher.clone()).with_policy(quick_policy());

        let tasks = slowest_first(dir.path());
        let submitted: Vec<String> = tasks.iter().map(|t| t.url.clone()).collect();
        manager.run(tasks, 1, false, &SharedCounters::new()).await;

        assert_eq!(*fetcher.completed.lock().unwrap(), submitted);
    }

    #[tokio::test]
    async fn should_drain_in_completion_order_with_several_workers() {
        let dir = TempDir::new().unwrap();
        let fetcher = Arc::new(DelayedByUrl::default());
        let manager = DownloadManager::new(fetcher.clone()).with_policy(quick_policy());
        let counters = SharedCounters::new();

        let tasks = slowest_first(dir.path());
        let mut submitted: Vec<String> = tasks.iter().map(|t| t.url.clone()).collect();
        let outcomes = manager.run(tasks, 3, false, &counters).await;

        submitted.reverse();
        assert_eq!(*fetcher.completed.lock().unwrap(), submitted);
        assert_eq!(outcomes.len(), 3);
        assert_eq!(counters.snapshot().completed, 3);
    }

    #[tokio::test]
    async fn should_remove_partial_file_after_last_attempt() {
        let dir = TempDir::new().unwrap();
        let manager = DownloadManager::new(Arc::new(TruncatesBody)).with_policy(quick_policy());
        let counters = SharedCounters::new();

        let t = task(dir.path(), "HYCOM_water_u_2019010100.nc", instant(), vec![Variable::U]);
        let outcome = manager.execute(&t, false, &counters).await;

        assert_eq!(outcome, TaskOutcome::Failed { attempts: 10 });
        assert!(!t.path().exists());
        assert_eq!(counters.snapshot().fail, 1);
    }
}
