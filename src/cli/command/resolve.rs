//! Shows which dataset versions serve a time or span.

use anyhow::Result;
use hycom3h::{Timestamp, TimeResolver};

pub fn resolve(time: &str, end: Option<&str>) -> Result<String> {
    let resolver = TimeResolver::default();
    let start = Timestamp::parse_start(time)?;

    let (span, matches, chosen) = match end {
        Some(end) => {
            let end = Timestamp::parse_end(end)?;
            (
                format!("{start}-{end}"),
                resolver.matches_range(start, end),
                resolver.resolve_range(start, end),
            )
        }
        None => (start.to_string(), resolver.matches(start), resolver.resolve(start)),
    };

    let mut lines = vec![format!("{span}: {} matching dataset versions", matches.len())];
    lines.extend(
        matches
            .iter()
            .map(|entry| format!("  {entry} ({})", entry.coverage)),
    );
    match chosen {
        Ok(entry) => lines.push(format!("Using {entry}")),
        Err(e) if e.is_resolution_miss() => lines.push(format!("No usable dataset: {e}")),
        Err(e) => return Err(e.into()),
    }

    Ok(lines.join("\n"))
}

// -- Tests -------------------------------------------------------------------
