pub mod catalog;
pub mod composite;
pub mod files;
pub mod fix;
pub mod lines;
pub mod runner;
pub mod style;
pub mod template;

pub use catalog::{Catalog, FixCatalog};
pub use fix::{Fix, Stage};
pub use runner::{FixRunner, RunOptions, RunReport};
