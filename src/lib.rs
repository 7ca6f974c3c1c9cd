//! Downloads regional subsets of the HYCOM 3-hourly global ocean analysis.
//!
//! A request names variables, a time or time span, a bounding box and an
//! optional depth or level. Each 3-hourly output time is mapped to the
//! dataset version that published it, turned into a subsetting URL and
//! fetched to a local NetCDF file.
//!
//! ```no_run
//! # async fn run() -> hycom3h::Result<()> {
//! let request = hycom3h::DownloadRequest::new(vec!["u", "v"], "2019010100");
//! let counters = hycom3h::download(&request).await?;
//! println!("{counters}");
//! # Ok(())
//! # }
//! ```

pub mod counters;
pub mod download;
pub mod errors;
pub mod integrity;
pub mod manager;
pub mod orchestrator;
pub mod query;
pub mod registry;
pub mod resolver;
pub mod time;
pub mod url;
pub mod variable;

pub use counters::RunCounters;
pub use errors::{Error, Result};
pub use orchestrator::{download, DownloadRequest, Downloader, NetworkOptions};
pub use query::BoundingBox;
pub use registry::Registry;
pub use resolver::TimeResolver;
pub use time::Timestamp;
pub use variable::Variable;
