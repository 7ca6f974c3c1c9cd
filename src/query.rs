//! Subsetting query parameters: region, time and vertical selection.

use std::fmt;

use tracing::warn;

use crate::{
    errors::{Error, Result},
    time::Timestamp,
    variable::Variable,
};

/// Standard depths (m) of the 40 vertical levels.
pub const STANDARD_DEPTHS: [f64; 40] = [
    0.0, 2.0, 4.0, 6.0, 8.0, 10.0, 12.0, 15.0, 20.0, 25.0, 30.0, 35.0, 40.0, 45.0, 50.0, 60.0,
    70.0, 80.0, 90.0, 100.0, 125.0, 150.0, 200.0, 250.0, 300.0, 350.0, 400.0, 500.0, 600.0, 700.0,
    800.0, 900.0, 1000.0, 1250.0, 1500.0, 2000.0, 2500.0, 3000.0, 4000.0, 5000.0,
];

pub const MAX_LEVEL: i32 = 40;
pub const MAX_DEPTH: f64 = 5000.0;

pub const LON_RANGE: (f64, f64) = (0.0, 359.92);
pub const LAT_RANGE: (f64, f64) = (-80.0, 90.0);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub lon_min: f64,
    pub lon_max: f64,
    pub lat_min: f64,
    pub lat_max: f64,
}

impl BoundingBox {
    pub fn new(lon_min: f64, lon_max: f64, lat_min: f64, lat_max: f64) -> Self {
        Self {
            lon_min,
            lon_max,
            lat_min,
            lat_max,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let lon_ok = |x: f64| (LON_RANGE.0..=LON_RANGE.1).contains(&x);
        let lat_ok = |x: f64| (LAT_RANGE.0..=LAT_RANGE.1).contains(&x);

        if lon_ok(self.lon_min) && lon_ok(self.lon_max) && lat_ok(self.lat_min) && lat_ok(self.lat_max)
        {
            Ok(())
        } else {
            Err(Error::InvalidBounds {
                lon_min: self.lon_min,
                lon_max: self.lon_max,
                lat_min: self.lat_min,
                lat_max: self.lat_max,
            })
        }
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::new(LON_RANGE.0, LON_RANGE.1, LAT_RANGE.0, LAT_RANGE.1)
    }
}

/// Vertical selection for full-depth variables.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Vertical {
    /// Nearest standard level to a depth in metres.
    Depth(f64),
    /// 1-based level index.
    Level(i32),
    Full,
}

impl Vertical {
    /// Depth wins when both are given.
    pub fn from_options(depth: Option<f64>, level: Option<i32>) -> Self {
        match (depth, level) {
            (Some(depth), Some(level)) => {
                warn!(depth, level, "both depth and level given, using depth");
                Vertical::Depth(depth)
            }
            (Some(depth), None) => Vertical::Depth(depth),
            (None, Some(level)) => Vertical::Level(level),
            (None, None) => Vertical::Full,
        }
    }
}

impl fmt::Display for Vertical {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Vertical::Depth(depth) => write!(f, "single depth (~{depth} m)"),
            Vertical::Level(level) => write!(f, "single level ({level})"),
            Vertical::Full => f.write_str("full depth"),
        }
    }
}

/// Time covered by one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeSelection {
    Instant(Timestamp),
    Range { start: Timestamp, end: Timestamp },
}

impl TimeSelection {
    pub fn start(&self) -> Timestamp {
        match self {
            TimeSelection::Instant(t) => *t,
            TimeSelection::Range { start, .. } => *start,
        }
    }

    pub fn end(&self) -> Timestamp {
        match self {
            TimeSelection::Instant(t) => *t,
            TimeSelection::Range { end, .. } => *end,
        }
    }

    pub fn is_range(&self) -> bool {
        matches!(self, TimeSelection::Range { .. })
    }
}

impl fmt::Display for TimeSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeSelection::Instant(t) => write!(f, "{t}"),
            TimeSelection::Range { start, end } => write!(f, "{start}-{end}"),
        }
    }
}

/// Index into [`STANDARD_DEPTHS`] of the level closest to `depth`. Ties go
/// to the shallower level.
pub fn nearest_level_index(depth: f64) -> usize {
    let mut best = 0;
    for (i, level_depth) in STANDARD_DEPTHS.iter().enumerate() {
        if (level_depth - depth).abs() < (STANDARD_DEPTHS[best] - depth).abs() {
            best = i;
        }
    }
    best
}

/// Ordered query parameters. Variables are kept apart because they are
/// emitted first and may repeat.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    variables: Vec<&'static str>,
    params: Vec<(&'static str, String)>,
}

impl Query {
    pub fn variables(&self) -> &[&'static str] {
        &self.variables
    }

    /// Requests another variable from the same remote file.
    pub fn add_variable(&mut self, variable: Variable) {
        let name = variable.var_name();
        if !self.variables.contains(&name) {
            self.variables.push(name);
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Non-variable parameters joined with `&`.
    pub fn to_query_string(&self) -> String {
        self.params
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// Builds the query for `variable`. Unset parameters are simply not added.
pub fn build_query(
    variable: Variable,
    bbox: &BoundingBox,
    time: &TimeSelection,
    vertical: Vertical,
) -> Query {
    let mut params: Vec<(&'static str, String)> = vec![
        ("north", bbox.lat_max.to_string()),
        ("west", bbox.lon_min.to_string()),
        ("east", bbox.lon_max.to_string()),
        ("south", bbox.lat_min.to_string()),
        ("horizStride", "1".to_string()),
    ];

    match time {
        TimeSelection::Instant(t) => params.push(("time", t.query_token())),
        TimeSelection::Range { start, end } => {
            params.push(("time_start", start.query_token()));
            params.push(("time_end", end.query_token()));
            params.push(("timeStride", "1".to_string()));
        }
    }

    if variable.has_vertical_axis() {
        match vertical {
            Vertical::Depth(depth) => {
                if !(0.0..=MAX_DEPTH).contains(&depth) {
                    warn!(depth, "depth outside 0-5000 m, using nearest standard level");
                }
                let level = nearest_level_index(depth) + 1;
                params.push(("vertCoord", level.to_string()));
            }
            Vertical::Level(level) => {
                if !(1..=MAX_LEVEL).contains(&level) {
                    warn!(level, "level outside 1-40, clamping");
                }
                params.push(("vertCoord", level.clamp(1, MAX_LEVEL).to_string()));
            }
            Vertical::Full => params.push(("vertStride", "1".to_string())),
        }
    }

    params.push(("addLatLon", "true".to_string()));
    params.push(("accept", "netcdf4".to_string()));

    Query {
        variables: vec![variable.var_name()],
        params,
    }
}

// -- Tests -------------------------------------------------------------------
