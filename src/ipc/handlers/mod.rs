pub mod backup_exchange;
pub mod core;
pub mod dashboard;
pub mod settings;
pub mod sheet_io;
pub mod students;
pub mod transcripts;
