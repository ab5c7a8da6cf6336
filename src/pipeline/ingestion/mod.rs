// Pipeline ingestion: turning uploaded bytes or shared links into tables

pub mod loader;
pub mod sheet_link;

pub use loader::{load_table, LoadStrategy};
pub use sheet_link::{resolve_sheet_link, SourceRef};
