pub mod export;

pub use export::{ExportError, ExportFormat, Exporter};
