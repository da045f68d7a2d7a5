pub mod config;
pub mod error;
pub mod git;
pub mod repository;
