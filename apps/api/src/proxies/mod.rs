// Proxy generation: fetch pipeline, ZIP packaging, and the download/PDF endpoints.
// All card data comes through scryfall::CardSource; nothing here calls Scryfall directly.

pub mod archive;
pub mod fetch;
pub mod form;
pub mod handlers;

pub use fetch::FetchOptions;
