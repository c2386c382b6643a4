pub mod handlers;
pub mod parser;

pub use parser::{expand, normalise, parse_deck_list, safe_filename, total_copies};
