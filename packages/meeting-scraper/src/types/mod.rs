//! Domain types flowing through the pipeline.

pub mod document;
pub mod meeting;
pub mod raw;

pub use document::OutputDocument;
pub use meeting::{fold_title, identity_key, Meeting, SummaryKind};
pub use raw::{AgendaFormat, AgendaResource, RawRecord};
