pub mod backup;
pub mod log_entry;
pub mod notice;
pub mod project;
pub mod repository;
