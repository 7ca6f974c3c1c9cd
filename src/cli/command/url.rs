//! Prints the request URL for one variable without downloading.

use anyhow::Result;
use hycom3h::{
    query::{build_query, TimeSelection, Vertical},
    url::UrlBuilder,
    Timestamp, TimeResolver, Variable,
};

use crate::cli::UrlArgs;

pub fn url(args: &UrlArgs) -> Result<String> {
    let variable = Variable::from_name(&args.variable)?;
    let bbox = args.region.bbox();
    bbox.validate()?;

    let resolver = TimeResolver::default();
    let start = Timestamp::parse_start(&args.time)?;
    let (time, entry) = match &args.end {
        Some(end) => {
            let end = Timestamp::parse_end(end)?;
            (TimeSelection::Range { start, end }, resolver.resolve_range(start, end)?)
        }
        None => (TimeSelection::Instant(start), resolver.resolve(start)?),
    };

    let vertical = Vertical::from_options(args.region.depth, args.region.level);
    let query = build_query(variable, &bbox, &time, vertical);

    Ok(UrlBuilder::new(entry).submit_url(variable, start, &query)?)
}

// -- Tests -------------------------------------------------------------------
