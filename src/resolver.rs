//! Maps requested times to the dataset version that serves them.

use tracing::debug;

use crate::{
    errors::{Error, Result},
    registry::{DatasetVersion, Registry},
    time::Timestamp,
    url::UrlBuilder,
    variable::Variable,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct TimeResolver {
    registry: Registry,
}

impl TimeResolver {
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Every entry covering `t`, in declaration order.
    pub fn matches(&self, t: Timestamp) -> Vec<&'static DatasetVersion> {
        self.registry
            .iter()
            .filter(|e| e.coverage.contains(t))
            .collect()
    }

    /// Every entry covering the whole of `start..=end`, in declaration order.
    pub fn matches_range(&self, start: Timestamp, end: Timestamp) -> Vec<&'static DatasetVersion> {
        self.registry
            .iter()
            .filter(|e| e.coverage.contains_range(start, end))
            .collect()
    }

    /// Resolves a single output time. The last matching entry wins.
    pub fn resolve(&self, t: Timestamp) -> Result<&'static DatasetVersion> {
        if !t.is_model_hour() {
            return Err(Error::InvalidHour(t.to_string()));
        }

        let chosen = self
            .matches(t)
            .pop()
            .ok_or_else(|| Error::NoCoverage(t.to_string()))?;
        debug!(time = %t, dataset = chosen.dataset, version = chosen.version, "resolved");

        Ok(chosen)
    }

    /// Resolves a range that must be served by a single remote file of a
    /// single entry.
    pub fn resolve_range(&self, start: Timestamp, end: Timestamp) -> Result<&'static DatasetVersion> {
        let incompatible = || Error::IncompatibleRange {
            start: start.to_string(),
            end: end.to_string(),
        };

        let Some(chosen) = self.matches_range(start, end).pop() else {
            let start_covered = !self.matches(start).is_empty();
            let end_covered = !self.matches(end).is_empty();
            return Err(if start_covered && end_covered {
                incompatible()
            } else {
                Error::NoCoverage(format!("{start}-{end}"))
            });
        };

        self.ensure_single_file(chosen, start, end)?;
        debug!(%start, %end, dataset = chosen.dataset, version = chosen.version, "resolved range");

        Ok(chosen)
    }

    /// Fails with IncompatibleRange when `start` and `end` live in different
    /// remote files of `entry`, e.g. across a yearly file boundary.
    pub fn ensure_single_file(
        &self,
        entry: &DatasetVersion,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<()> {
        let builder = UrlBuilder::new(entry);
        if builder.base_url(Variable::U, start)? != builder.base_url(Variable::U, end)? {
            return Err(Error::IncompatibleRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(())
    }

    /// Checks that a caller chosen dataset version covers `start` (through
    /// `end` when given).
    pub fn resolve_explicit(
        &self,
        dataset: &str,
        version: &str,
        start: Timestamp,
        end: Option<Timestamp>,
    ) -> Result<bool> {
        let entry = self.registry.lookup(dataset, version)?;
        let end = end.unwrap_or(start);

        Ok(entry.coverage.contains_range(start, end))
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::{time_steps, STEP_HOURS};

    fn resolver() -> TimeResolver {
        TimeResolver::new(Registry::hycom())
    }

    #[test]
    fn should_resolve_2019_to_glby() {
        let entry = resolver().resolve(Timestamp::ymdh(2019, 1, 1, 0)).unwrap();

        assert_eq!(entry.dataset, "GLBy0.08");
        assert_eq!(entry.version, "93.0");
    }

    #[test]
    fn should_enumerate_all_overlapping_matches() {
        let matches = resolver().matches(Timestamp::ymdh(2019, 1, 1, 0));
        let names: Vec<String> = matches.iter().map(|e| e.to_string()).collect();

        assert_eq!(names, vec!["GLBv0.08 93.0", "GLBy0.08 93.0"]);
    }

    #[test]
    fn should_report_no_coverage_before_first_dataset() {
        assert!(matches!(
            resolver().resolve(Timestamp::ymdh(1990, 1, 1, 0)),
            Err(Error::NoCoverage(_))
        ));
    }

    #[test]
    fn should_reject_off_grid_hours() {
        assert!(matches!(
            resolver().resolve(Timestamp::ymdh(2019, 1, 1, 1)),
            Err(Error::InvalidHour(_))
        ));
    }

    #[test]
    fn should_only_return_entries_covering_the_time() {
        let resolver = resolver();
        let step = chrono::Duration::hours(STEP_HOURS);

        for bound in resolver
            .registry()
            .iter()
            .flat_map(|e| [e.coverage.start, e.coverage.end])
        {
            let at = bound.to_datetime().unwrap();
            let first = Timestamp::from_datetime(at - step);
            let last = Timestamp::from_datetime(at + step);

            for t in time_steps(first, last, STEP_HOURS).unwrap() {
                let matches = resolver.matches(t);
                match resolver.resolve(t) {
                    Ok(entry) => {
                        assert!(entry.coverage.contains(t), "{entry} does not cover {t}");
                        assert_eq!(matches.last().copied(), Some(entry), "{t} did not pick the last match");
                    }
                    Err(e) => {
                        assert!(matches!(e, Error::NoCoverage(_)), "{t}: {e}");
                        assert!(matches.is_empty());
                    }
                }
            }
        }
    }

    #[test]
    fn should_prefer_later_entry_in_overlaps() {
        let resolver = resolver();
        let cases = [
            (Timestamp::ymdh(2016, 6, 1, 0), "GLBv0.08", "57.2"),
            (Timestamp::ymdh(2018, 2, 1, 0), "GLBv0.08", "93.0"),
            (Timestamp::ymdh(2018, 12, 6, 0), "GLBy0.08", "93.0"),
            (Timestamp::ymdh(2024, 8, 20, 0), "ESPC_D", "V02"),
        ];

        for (t, dataset, version) in cases {
            let entry = resolver.resolve(t).unwrap();
            assert_eq!((entry.dataset, entry.version), (dataset, version), "{t}");
        }
    }

    #[test]
    fn should_refuse_range_across_versions() {
        // 92.8 ends 2017-06-01 09:00, 57.7 starts 2017-06-01 12:00
        let result = resolver().resolve_range(
            Timestamp::ymdh(2017, 5, 31, 0),
            Timestamp::ymdh(2017, 6, 2, 0),
        );

        assert!(matches!(result, Err(Error::IncompatibleRange { .. })));
    }

    #[test]
    fn should_refuse_range_across_yearly_files() {
        let result = resolver().resolve_range(
            Timestamp::ymdh(2010, 12, 31, 0),
            Timestamp::ymdh(2011, 1, 1, 21),
        );

        assert!(matches!(result, Err(Error::IncompatibleRange { .. })));
    }

    #[test]
    fn should_resolve_range_within_one_version() {
        let entry = resolver()
            .resolve_range(Timestamp::ymdh(2017, 3, 1, 0), Timestamp::ymdh(2017, 3, 1, 21))
            .unwrap();

        assert_eq!(entry.version, "92.8");
    }

    #[test]
    fn should_report_no_coverage_for_uncovered_range() {
        let result = resolver().resolve_range(
            Timestamp::ymdh(1990, 1, 1, 0),
            Timestamp::ymdh(1990, 1, 1, 21),
        );

        assert!(matches!(result, Err(Error::NoCoverage(_))));
    }

    #[test]
    fn should_validate_explicit_choice() {
        let resolver = resolver();
        let t = Timestamp::ymdh(2019, 6, 1, 0);

        assert!(resolver.resolve_explicit("GLBv0.08", "93.0", t, None).unwrap());
        assert!(!resolver
            .resolve_explicit("GLBv0.08", "53.X", t, None)
            .unwrap());
        assert!(!resolver
            .resolve_explicit("GLBv0.08", "93.0", t, Some(Timestamp::ymdh(2021, 1, 1, 0)))
            .unwrap());
        assert!(resolver.resolve_explicit("GLBz", "1.0", t, None).is_err());
    }
}
