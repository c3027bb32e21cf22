pub mod projects;
pub mod repositories;
