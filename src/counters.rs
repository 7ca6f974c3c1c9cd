//! Outcome tallies shared by every task of one run.

use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard},
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunCounters {
    pub success: usize,
    pub fail: usize,
    pub skip: usize,
    pub no_data: usize,
    /// Times (or `start-end` spans) no dataset covers.
    pub no_data_list: Vec<String>,
    /// Tasks finished so far, whatever their outcome.
    pub completed: usize,
}

impl RunCounters {
    pub fn total(&self) -> usize {
        self.success + self.fail + self.skip + self.no_data
    }
}

impl fmt::Display for RunCounters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total: {}", self.total())?;
        writeln!(f, "Success: {}", self.success)?;
        writeln!(f, "Fail: {}", self.fail)?;
        writeln!(f, "Skip: {}", self.skip)?;
        write!(f, "No data: {}", self.no_data)?;

        if self.fail > 0 {
            write!(f, "\nPlease try again to download the failed data later")?;
        }
        if self.no_data > 0 {
            if self.no_data == 1 {
                write!(f, "\nThere is 1 time that does not exist in any dataset and version:")?;
            } else {
                write!(
                    f,
                    "\nThese are {} times that do not exist in any dataset and version:",
                    self.no_data
                )?;
            }
            for time in &self.no_data_list {
                write!(f, "\n  {time}")?;
            }
        }

        Ok(())
    }
}

/// Handle to the counters of one run. Every update goes through one lock.
#[derive(Debug, Clone, Default)]
pub struct SharedCounters {
    inner: Arc<Mutex<RunCounters>>,
}

impl SharedCounters {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RunCounters> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn record_success(&self) {
        self.lock().success += 1;
    }

    pub fn record_failure(&self) {
        self.lock().fail += 1;
    }

    pub fn record_skip(&self) {
        self.lock().skip += 1;
    }

    pub fn record_no_data(&self, time: impl Into<String>) {
        let mut counters = self.lock();
        counters.no_data += 1;
        counters.no_data_list.push(time.into());
    }

    /// Marks one more task finished and returns the new count.
    pub fn advance(&self) -> usize {
        let mut counters = self.lock();
        counters.completed += 1;
        counters.completed
    }

    pub fn snapshot(&self) -> RunCounters {
        self.lock().clone()
    }
}

// -- Tests -------------------------------------------------------------------
