use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::proxies::FetchOptions;
use crate::scryfall::CardSource;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Card database. `ScryfallClient` in production.
    pub card_source: Arc<dyn CardSource>,
}

impl AppState {
    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            delay: Duration::from_millis(self.config.scryfall_delay_ms),
            max_copies: self.config.max_deck_copies,
        }
    }
}
