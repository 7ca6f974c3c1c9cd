//! Prints the coverage table of the registry.

use std::fmt::Write;

use hycom3h::Registry;

pub fn coverage() -> String {
    let registry = Registry::hycom();
    let mut table = format!(
        "{:<10} {:<8} {:<10} {:<10} {}\n",
        "Dataset", "Version", "Start", "End", "Layout"
    );

    for entry in registry.iter() {
        // Writing to a String cannot fail.
        let _ = writeln!(
            table,
            "{:<10} {:<8} {:<10} {:<10} {}",
            entry.dataset,
            entry.version,
            entry.coverage.start,
            entry.coverage.end,
            entry.layout.scheme().as_str()
        );
    }
    let _ = writeln!(table, "{} dataset versions", registry.len());

    table
}

// -- Tests -------------------------------------------------------------------
