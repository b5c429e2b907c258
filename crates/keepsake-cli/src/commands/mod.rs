pub mod auth_cmd;
pub mod common;
pub mod completions;
pub mod config;
pub mod gallery;
pub mod notes;
pub mod proposal;
pub mod route;
