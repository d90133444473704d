pub mod config;
pub mod error;
pub mod fetch;
pub mod filters;
pub mod handler;
pub mod origin;
pub mod parser;

pub use config::{Config, PropellerConfig};
pub use error::{BakeryError, BakeryResult};
pub use handler::{App, FilteredManifest};
pub use parser::{url_parse, MediaFilters, Protocol};
