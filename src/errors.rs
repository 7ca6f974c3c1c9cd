//! Error types for resolving, building and running HYCOM downloads.

use thiserror::Error;

/// Library result type.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(
        "invalid variable `{0}`: expected one of u, v, temp, salt, ssh, u_b, v_b, temp_b, salt_b \
         or their remote or standard names"
    )]
    InvalidVariable(String),

    #[error(
        "invalid bounds lon [{lon_min}, {lon_max}] lat [{lat_min}, {lat_max}]: \
         longitude must lie in 0~359.92 and latitude in -80~90"
    )]
    InvalidBounds {
        lon_min: f64,
        lon_max: f64,
        lat_min: f64,
        lat_max: f64,
    },

    #[error("invalid hour in `{0}`: hour must be one of 00, 03, 06, 09, 12, 15, 18, 21")]
    InvalidHour(String),

    #[error("invalid time `{0}`: expected YYYYMMDDHH or YYYYMMDD")]
    InvalidTime(String),

    #[error("time start {start} is after time end {end}")]
    ReversedRange { start: String, end: String },

    #[error("dataset `{dataset}` version `{version}` not found")]
    NotFound { dataset: String, version: String },

    #[error("{0} is not in any dataset and version")]
    NoCoverage(String),

    #[error("{start} to {end} is in different datasets or versions and cannot be downloaded together")]
    IncompatibleRange { start: String, end: String },

    #[error("{span} is not within dataset {dataset} version {version}")]
    OutsideExplicitCoverage {
        dataset: String,
        version: String,
        span: String,
    },

    #[error("variable `{variable}` has no file group in {dataset} {version}")]
    UnknownVariableGroup {
        variable: String,
        dataset: String,
        version: String,
    },

    #[error("{dataset} {version} has no template for year {year}")]
    MissingYearTemplate {
        dataset: String,
        version: String,
        year: i32,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid file pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("could not build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

impl Error {
    /// Broad class of the error, used when reporting to the user.
    pub fn category(&self) -> &'static str {
        match self {
            Error::InvalidVariable(_)
            | Error::InvalidBounds { .. }
            | Error::InvalidHour(_)
            | Error::InvalidTime(_)
            | Error::ReversedRange { .. }
            | Error::OutsideExplicitCoverage { .. } => "configuration",
            Error::NoCoverage(_) | Error::IncompatibleRange { .. } => "resolution",
            Error::NotFound { .. }
            | Error::UnknownVariableGroup { .. }
            | Error::MissingYearTemplate { .. } => "registry",
            Error::Io(_) | Error::Pattern(_) => "io",
            Error::Client(_) => "network",
        }
    }

    /// True for misses that are tallied per time step instead of aborting a run.
    pub fn is_resolution_miss(&self) -> bool {
        matches!(self, Error::NoCoverage(_) | Error::IncompatibleRange { .. })
    }
}

// -- Tests -------------------------------------------------------------------
