//! Writing sliced chapters out.

mod json;

pub use json::{JsonConfig, JsonExporter, save_chapters};
