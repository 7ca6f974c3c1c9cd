//! Assembles request URLs from a dataset version's layout.

use crate::{
    errors::{Error, Result},
    query::Query,
    registry::{DatasetVersion, UrlLayout},
    time::Timestamp,
    variable::Variable,
};

/// Builds URLs for one dataset version.
#[derive(Debug, Clone, Copy)]
pub struct UrlBuilder<'a> {
    entry: &'a DatasetVersion,
}

impl<'a> UrlBuilder<'a> {
    pub fn new(entry: &'a DatasetVersion) -> Self {
        Self { entry }
    }

    /// Template of the remote file holding `variable` at `t`, with the year
    /// filled in. Ends with `?`.
    pub fn base_url(&self, variable: Variable, t: Timestamp) -> Result<String> {
        match self.entry.layout {
            UrlLayout::SamePath { template } => Ok(template.to_string()),
            UrlLayout::YearDifferent { template, years } => self.with_year(template, years, t),
            UrlLayout::VarDifferent { templates } => {
                let group = variable.group();
                templates
                    .iter()
                    .find(|(g, _)| *g == group)
                    .map(|(_, template)| template.to_string())
                    .ok_or_else(|| self.unknown_group(variable))
            }
            UrlLayout::VarYearDifferent { templates, years } => {
                let group = variable.group();
                let template = templates
                    .iter()
                    .find(|(g, _)| *g == group)
                    .map(|(_, template)| *template)
                    .ok_or_else(|| self.unknown_group(variable))?;
                self.with_year(template, years, t)
            }
            UrlLayout::SingleVarYearDifferent { templates, years } => {
                let group = variable
                    .single_group()
                    .ok_or_else(|| self.unknown_group(variable))?;
                let template = templates
                    .iter()
                    .find(|(g, _)| *g == group)
                    .map(|(_, template)| *template)
                    .ok_or_else(|| self.unknown_group(variable))?;
                self.with_year(template, years, t)
            }
        }
    }

    /// Full request URL: the base URL, one `var=` per requested variable, then
    /// the remaining query parameters.
    pub fn submit_url(&self, variable: Variable, t: Timestamp, query: &Query) -> Result<String> {
        let base = self.base_url(variable, t)?;
        let vars = query
            .variables()
            .iter()
            .map(|name| format!("var={name}"))
            .collect::<Vec<_>>()
            .join("&");

        Ok(format!("{base}{vars}&{}", query.to_query_string()))
    }

    fn with_year(&self, template: &str, years: (i32, i32), t: Timestamp) -> Result<String> {
        let year = self.entry.file_year(t);
        if year < years.0 || year > years.1 {
            return Err(Error::MissingYearTemplate {
                dataset: self.entry.dataset.to_string(),
                version: self.entry.version.to_string(),
                year,
            });
        }

        Ok(template.replace("{year}", &year.to_string()))
    }

    fn unknown_group(&self, variable: Variable) -> Error {
        Error::UnknownVariableGroup {
            variable: variable.code().to_string(),
            dataset: self.entry.dataset.to_string(),
            version: self.entry.version.to_string(),
        }
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        query::{build_query, BoundingBox, TimeSelection, Vertical},
        registry::{Coverage, Registry},
        variable::{SingleVarGroup, VariableGroup},
    };

    const PAIRED: &[(VariableGroup, &str)] = &[
        (VariableGroup::Velocity, "https://a.example/uv?"),
        (VariableGroup::Tracer, "https://b.example/ts?"),
        (VariableGroup::Surface, "https://c.example/ssh?"),
    ];

    const SINGLE: &[(SingleVarGroup, &str)] = &[
        (SingleVarGroup::U3z, "https://d.example/u3z/{year}?"),
        (SingleVarGroup::Ssh, "https://d.example/ssh/{year}?"),
    ];

    fn fixture(layout: UrlLayout) -> DatasetVersion {
        DatasetVersion {
            dataset: "TEST",
            version: "1.0",
            coverage: Coverage {
                start: Timestamp::ymdh(2000, 1, 1, 0),
                end: Timestamp::ymdh(2030, 1, 1, 0),
            },
            layout,
            year_rollover: None,
        }
    }

    #[test]
    fn should_route_variables_to_their_group_template() {
        let entry = fixture(UrlLayout::VarDifferent { templates: PAIRED });
        let builder = UrlBuilder::new(&entry);
        let t = Timestamp::ymdh(2020, 1, 1, 0);

        assert_eq!(builder.base_url(Variable::U, t).unwrap(), "https://a.example/uv?");
        assert_eq!(builder.base_url(Variable::VBottom, t).unwrap(), "https://a.example/uv?");
        assert_eq!(builder.base_url(Variable::Salt, t).unwrap(), "https://b.example/ts?");
        assert_eq!(builder.base_url(Variable::Ssh, t).unwrap(), "https://c.example/ssh?");
    }

    #[test]
    fn should_fill_in_year() {
        let entry = fixture(UrlLayout::YearDifferent {
            template: "https://e.example/data/{year}?",
            years: (2000, 2010),
        });
        let builder = UrlBuilder::new(&entry);

        assert_eq!(
            builder.base_url(Variable::Temp, Timestamp::ymdh(2005, 6, 1, 0)).unwrap(),
            "https://e.example/data/2005?"
        );
        assert!(matches!(
            builder.base_url(Variable::Temp, Timestamp::ymdh(2011, 1, 1, 0)),
            Err(Error::MissingYearTemplate { year: 2011, .. })
        ));
    }

    #[test]
    fn should_fail_for_variable_without_single_file() {
        let entry = fixture(UrlLayout::SingleVarYearDifferent {
            templates: SINGLE,
            years: (2020, 2030),
        });
        let builder = UrlBuilder::new(&entry);
        let t = Timestamp::ymdh(2025, 3, 1, 0);

        assert_eq!(builder.base_url(Variable::U, t).unwrap(), "https://d.example/u3z/2025?");
        assert!(matches!(
            builder.base_url(Variable::UBottom, t),
            Err(Error::UnknownVariableGroup { .. })
        ));
        assert!(matches!(
            builder.base_url(Variable::V, t),
            Err(Error::UnknownVariableGroup { .. })
        ));
    }

    #[test]
    fn should_shift_glby_early_january_to_previous_year() {
        let entry = Registry::hycom().lookup("GLBy0.08", "93.0").unwrap();
        let builder = UrlBuilder::new(entry);

        assert_eq!(
            builder.base_url(Variable::U, Timestamp::ymdh(2019, 1, 1, 0)).unwrap(),
            "https://ncss.hycom.org/thredds/ncss/GLBy0.08/expt_93.0/uv3z/2018?"
        );
        assert_eq!(
            builder.base_url(Variable::Ssh, Timestamp::ymdh(2019, 1, 1, 12)).unwrap(),
            "https://ncss.hycom.org/thredds/ncss/GLBy0.08/expt_93.0/ssh/2019?"
        );
    }

    #[test]
    fn should_build_submit_url_with_ordered_vars() {
        let entry = Registry::hycom().lookup("GLBv0.08", "56.3").unwrap();
        let t = Timestamp::ymdh(2015, 3, 1, 6);
        let mut query = build_query(
            Variable::U,
            &BoundingBox::new(100.0, 120.0, 10.0, 30.0),
            &TimeSelection::Instant(t),
            Vertical::Level(1),
        );
        query.add_variable(Variable::V);

        let url = UrlBuilder::new(entry).submit_url(Variable::U, t, &query).unwrap();

        assert_eq!(
            url,
            "https://ncss.hycom.org/thredds/ncss/GLBv0.08/expt_56.3?var=water_u&var=water_v\
             &north=30&west=100&east=120&south=10&horizStride=1\
             &time=2015-03-01T06%3A00%3A00Z&vertCoord=1&addLatLon=true&accept=netcdf4"
        );
    }
}
