pub mod diff;
pub mod fs;
