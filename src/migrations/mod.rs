//! Content transforms behind the migration fixes: pure functions from the
//! legacy files in a checkout to the text of their replacements.

pub mod setup_py;
pub mod sphinx;
pub mod travis;
