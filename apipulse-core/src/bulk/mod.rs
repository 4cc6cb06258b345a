mod executor;

pub use executor::{parse_urls_from_file, BatchRunner, ProgressCallback, ProgressReport};
