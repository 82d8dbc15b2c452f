//! File-backed event ingestion.
//!
//! Stands in for a search-backend client: documents already exported from the
//! backend are mapped to events and cut to the lookback window.

pub mod documents;
pub mod lookback;

pub use documents::{parse_documents, DocumentMapper};
pub use lookback::LookbackWindow;

use crate::data::Event;
use crate::error::InputError;
use crate::utils::IngestConfig;
use tracing::info;

/// Parse, map and window a document dump in one step
pub fn ingest_str(input: &str, fields: &IngestConfig, period_hours: u32) -> Result<Vec<Event>, InputError> {
    let docs = parse_documents(input)?;
    let events = DocumentMapper::new(fields.clone()).map_documents(&docs)?;
    let mapped = events.len();
    let events = LookbackWindow::new(period_hours, fields.until).apply(events);

    info!(
        "Ingested {} documents into {} events, {} inside the {}h lookback",
        docs.len(),
        mapped,
        events.len(),
        period_hours
    );

    Ok(events)
}
