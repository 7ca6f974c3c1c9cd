//! Static table of HYCOM datasets, versions, coverage and URL layouts.
//!
//! Coverage bounds were corrected against what the server reports when a
//! request falls outside a dataset, so most windows start at 12:00 and end
//! at 09:00.

use std::fmt;

use crate::{
    errors::{Error, Result},
    time::Timestamp,
    variable::{SingleVarGroup, VariableGroup},
};

/// Inclusive coverage window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Coverage {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl Coverage {
    pub fn contains(&self, t: Timestamp) -> bool {
        self.start <= t && t <= self.end
    }

    pub fn contains_range(&self, start: Timestamp, end: Timestamp) -> bool {
        self.start <= start && end <= self.end
    }
}

impl fmt::Display for Coverage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Classification of how a dataset version spreads its data over files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    YearDifferent,
    SamePath,
    VarDifferent,
    VarYearDifferent,
    SingleVarYearDifferent,
}

impl Scheme {
    pub fn as_str(self) -> &'static str {
        match self {
            Scheme::YearDifferent => "year_different",
            Scheme::SamePath => "same_path",
            Scheme::VarDifferent => "var_different",
            Scheme::VarYearDifferent => "var_year_different",
            Scheme::SingleVarYearDifferent => "single_var_year_different",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// URL templates of a dataset version. Templates containing `{year}` are
/// published for every year in `years` (inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlLayout {
    YearDifferent {
        template: &'static str,
        years: (i32, i32),
    },
    SamePath {
        template: &'static str,
    },
    VarDifferent {
        templates: &'static [(VariableGroup, &'static str)],
    },
    VarYearDifferent {
        templates: &'static [(VariableGroup, &'static str)],
        years: (i32, i32),
    },
    SingleVarYearDifferent {
        templates: &'static [(SingleVarGroup, &'static str)],
        years: (i32, i32),
    },
}

impl UrlLayout {
    pub fn scheme(&self) -> Scheme {
        match self {
            UrlLayout::YearDifferent { .. } => Scheme::YearDifferent,
            UrlLayout::SamePath { .. } => Scheme::SamePath,
            UrlLayout::VarDifferent { .. } => Scheme::VarDifferent,
            UrlLayout::VarYearDifferent { .. } => Scheme::VarYearDifferent,
            UrlLayout::SingleVarYearDifferent { .. } => Scheme::SingleVarYearDifferent,
        }
    }

    /// True when every variable lives in its own remote file.
    pub fn splits_variables(&self) -> bool {
        matches!(self, UrlLayout::SingleVarYearDifferent { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatasetVersion {
    pub dataset: &'static str,
    pub version: &'static str,
    pub coverage: Coverage,
    pub layout: UrlLayout,
    /// Yearly files that begin in the previous December: timestamps whose
    /// `(month, day, hour)` is at or before this mark belong to the file of
    /// the previous year.
    pub year_rollover: Option<(u32, u32, u32)>,
}

impl DatasetVersion {
    /// Year of the remote file holding `t`.
    pub fn file_year(&self, t: Timestamp) -> i32 {
        match self.year_rollover {
            Some(mark) if t.month_day_hour() <= mark => t.year() - 1,
            _ => t.year(),
        }
    }
}

impl fmt::Display for DatasetVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.dataset, self.version)
    }
}

const fn coverage(start: Timestamp, end: Timestamp) -> Coverage {
    Coverage { start, end }
}

const GLBV_928: &[(VariableGroup, &str)] = &[
    (VariableGroup::Velocity, "https://ncss.hycom.org/thredds/ncss/GLBv0.08/expt_92.8/uv3z?"),
    (VariableGroup::Tracer, "https://ncss.hycom.org/thredds/ncss/GLBv0.08/expt_92.8/ts3z?"),
    (VariableGroup::Surface, "https://ncss.hycom.org/thredds/ncss/GLBv0.08/expt_92.8/ssh?"),
];

const GLBV_929: &[(VariableGroup, &str)] = &[
    (VariableGroup::Velocity, "https://ncss.hycom.org/thredds/ncss/GLBv0.08/expt_92.9/uv3z?"),
    (VariableGroup::Tracer, "https://ncss.hycom.org/thredds/ncss/GLBv0.08/expt_92.9/ts3z?"),
    (VariableGroup::Surface, "https://ncss.hycom.org/thredds/ncss/GLBv0.08/expt_92.9/ssh?"),
];

const GLBV_930: &[(VariableGroup, &str)] = &[
    (VariableGroup::Velocity, "https://ncss.hycom.org/thredds/ncss/GLBv0.08/expt_93.0/uv3z?"),
    (VariableGroup::Tracer, "https://ncss.hycom.org/thredds/ncss/GLBv0.08/expt_93.0/ts3z?"),
    (VariableGroup::Surface, "https://ncss.hycom.org/thredds/ncss/GLBv0.08/expt_93.0/ssh?"),
];

const GLBU_930: &[(VariableGroup, &str)] = &[
    (VariableGroup::Velocity, "https://ncss.hycom.org/thredds/ncss/GLBu0.08/expt_93.0/uv3z?"),
    (VariableGroup::Tracer, "https://ncss.hycom.org/thredds/ncss/GLBu0.08/expt_93.0/ts3z?"),
    (VariableGroup::Surface, "https://ncss.hycom.org/thredds/ncss/GLBu0.08/expt_93.0/ssh?"),
];

const GLBY_930: &[(VariableGroup, &str)] = &[
    (VariableGroup::Velocity, "https://ncss.hycom.org/thredds/ncss/GLBy0.08/expt_93.0/uv3z/{year}?"),
    (VariableGroup::Tracer, "https://ncss.hycom.org/thredds/ncss/GLBy0.08/expt_93.0/ts3z/{year}?"),
    (VariableGroup::Surface, "https://ncss.hycom.org/thredds/ncss/GLBy0.08/expt_93.0/ssh/{year}?"),
];

const ESPC_D_V02: &[(SingleVarGroup, &str)] = &[
    (SingleVarGroup::U3z, "https://ncss.hycom.org/thredds/ncss/ESPC-D-V02/u3z/{year}?"),
    (SingleVarGroup::V3z, "https://ncss.hycom.org/thredds/ncss/ESPC-D-V02/v3z/{year}?"),
    (SingleVarGroup::T3z, "https://ncss.hycom.org/thredds/ncss/ESPC-D-V02/t3z/{year}?"),
    (SingleVarGroup::S3z, "https://ncss.hycom.org/thredds/ncss/ESPC-D-V02/s3z/{year}?"),
    (SingleVarGroup::Ssh, "https://ncss.hycom.org/thredds/ncss/ESPC-D-V02/ssh/{year}?"),
];

/// Declaration order is significant: when windows overlap, resolution
/// prefers the entry declared last.
static HYCOM_3HOURLY: [DatasetVersion; 10] = [
    DatasetVersion {
        dataset: "GLBv0.08",
        version: "53.X",
        coverage: coverage(Timestamp::ymdh(1994, 1, 1, 12), Timestamp::ymdh(2015, 12, 31, 9)),
        layout: UrlLayout::YearDifferent {
            template: "https://ncss.hycom.org/thredds/ncss/GLBv0.08/expt_53.X/data/{year}?",
            years: (1994, 2015),
        },
        year_rollover: None,
    },
    DatasetVersion {
        dataset: "GLBv0.08",
        version: "56.3",
        coverage: coverage(Timestamp::ymdh(2014, 7, 1, 12), Timestamp::ymdh(2016, 9, 30, 9)),
        layout: UrlLayout::SamePath {
            template: "https://ncss.hycom.org/thredds/ncss/GLBv0.08/expt_56.3?",
        },
        year_rollover: None,
    },
    DatasetVersion {
        dataset: "GLBv0.08",
        version: "57.2",
        coverage: coverage(Timestamp::ymdh(2016, 5, 1, 12), Timestamp::ymdh(2017, 2, 1, 9)),
        layout: UrlLayout::SamePath {
            template: "https://ncss.hycom.org/thredds/ncss/GLBv0.08/expt_57.2?",
        },
        year_rollover: None,
    },
    DatasetVersion {
        dataset: "GLBv0.08",
        version: "92.8",
        coverage: coverage(Timestamp::ymdh(2017, 2, 1, 12), Timestamp::ymdh(2017, 6, 1, 9)),
        layout: UrlLayout::VarDifferent { templates: GLBV_928 },
        year_rollover: None,
    },
    DatasetVersion {
        dataset: "GLBv0.08",
        version: "57.7",
        coverage: coverage(Timestamp::ymdh(2017, 6, 1, 12), Timestamp::ymdh(2017, 10, 1, 9)),
        layout: UrlLayout::SamePath {
            template: "https://ncss.hycom.org/thredds/ncss/GLBv0.08/expt_57.7?",
        },
        year_rollover: None,
    },
    DatasetVersion {
        dataset: "GLBv0.08",
        version: "92.9",
        coverage: coverage(Timestamp::ymdh(2017, 10, 1, 12), Timestamp::ymdh(2018, 3, 20, 9)),
        layout: UrlLayout::VarDifferent { templates: GLBV_929 },
        year_rollover: None,
    },
    DatasetVersion {
        dataset: "GLBv0.08",
        version: "93.0",
        coverage: coverage(Timestamp::ymdh(2018, 1, 1, 12), Timestamp::ymdh(2020, 2, 19, 9)),
        layout: UrlLayout::VarDifferent { templates: GLBV_930 },
        year_rollover: None,
    },
    DatasetVersion {
        dataset: "GLBu0.08",
        version: "93.0",
        coverage: coverage(Timestamp::ymdh(2018, 9, 19, 12), Timestamp::ymdh(2018, 12, 9, 9)),
        layout: UrlLayout::VarDifferent { templates: GLBU_930 },
        year_rollover: None,
    },
    DatasetVersion {
        dataset: "GLBy0.08",
        version: "93.0",
        coverage: coverage(Timestamp::ymdh(2018, 12, 4, 12), Timestamp::ymdh(2024, 9, 5, 9)),
        layout: UrlLayout::VarYearDifferent {
            templates: GLBY_930,
            years: (2018, 2024),
        },
        year_rollover: Some((1, 1, 9)),
    },
    DatasetVersion {
        dataset: "ESPC_D",
        version: "V02",
        coverage: coverage(Timestamp::ymdh(2024, 8, 10, 12), Timestamp::ymdh(2030, 1, 1, 0)),
        layout: UrlLayout::SingleVarYearDifferent {
            templates: ESPC_D_V02,
            years: (2024, 2030),
        },
        year_rollover: None,
    },
];

/// Read-only view over a dataset table.
#[derive(Debug, Clone, Copy)]
pub struct Registry {
    entries: &'static [DatasetVersion],
}

impl Registry {
    pub const fn new(entries: &'static [DatasetVersion]) -> Self {
        Self { entries }
    }

    /// The built-in HYCOM 3-hourly table.
    pub fn hycom() -> Self {
        Self::new(&HYCOM_3HOURLY)
    }

    pub fn lookup(&self, dataset: &str, version: &str) -> Result<&'static DatasetVersion> {
        self.entries
            .iter()
            .find(|e| e.dataset == dataset && e.version == version)
            .ok_or_else(|| Error::NotFound {
                dataset: dataset.to_string(),
                version: version.to_string(),
            })
    }

    /// Entries in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &'static DatasetVersion> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::hycom()
    }
}

// -- Tests -------------------------------------------------------------------
