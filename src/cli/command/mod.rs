pub mod coverage;
pub mod download;
pub mod resolve;
pub mod url;

pub use coverage::coverage;
pub use download::download;
pub use resolve::resolve;
pub use url::url;
