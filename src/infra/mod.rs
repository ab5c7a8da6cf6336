// Adapters behind the app ports

pub mod http_client;
pub mod source_reader;
pub mod workbook_writer;
