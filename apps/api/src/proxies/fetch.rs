//! Card fetch pipeline — turns a deck list into downloaded card images plus a
//! per-copy report.
//!
//! Copies are fetched one at a time with a pause after every fresh lookup so
//! a large deck stays inside Scryfall's rate limit. Repeated cards within one
//! request are served from a request-local cache, failures included.

use std::collections::HashMap;
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, info, warn};

use crate::deck::{expand, normalise, parse_deck_list, total_copies};
use crate::errors::AppError;
use crate::models::deck::CardCopy;
use crate::models::report::{CardStatus, ReportEntry, Summary};
use crate::scryfall::{image_extension, CardQuery, CardSource};

#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Pause after each lookup that reached the card database.
    pub delay: Duration,
    pub max_copies: usize,
}

/// Downloaded images for one card.
#[derive(Debug, Clone)]
pub struct CardImages {
    pub front: Bytes,
    pub front_ext: &'static str,
    pub back: Option<Bytes>,
    pub back_ext: &'static str,
    pub flip: bool,
}

/// Result of a pipeline run. `cards[i]` and `report[i]` describe the same copy.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub cards: Vec<Option<CardImages>>,
    pub report: Vec<ReportEntry>,
    pub summary: Summary,
}

impl FetchOutcome {
    /// Successful copies in deck order.
    pub fn successes(&self) -> impl Iterator<Item = (&ReportEntry, &CardImages)> {
        self.report
            .iter()
            .zip(&self.cards)
            .filter_map(|(entry, card)| card.as_ref().map(|c| (entry, c)))
    }
}

pub async fn fetch_all_cards(
    source: &dyn CardSource,
    deck_list: &str,
    options: &FetchOptions,
) -> Result<FetchOutcome, AppError> {
    let entries = parse_deck_list(deck_list);
    if entries.is_empty() {
        return Err(AppError::Validation("Could not parse any cards.".to_string()));
    }

    let total = total_copies(&entries);
    if total > options.max_copies {
        return Err(AppError::Validation(format!(
            "Deck list expands to {total} cards; the limit is {}.",
            options.max_copies
        )));
    }

    let copies = expand(&entries);
    info!(
        "Fetching {} copies of {} distinct entries",
        copies.len(),
        entries.len()
    );

    let mut cards = Vec::with_capacity(copies.len());
    let mut report = Vec::with_capacity(copies.len());
    let mut cache: HashMap<String, Result<CardImages, &'static str>> = HashMap::new();

    for copy in &copies {
        let key = cache_key(copy);

        if let Some(cached) = cache.get(&key) {
            match cached {
                Ok(images) => {
                    report.push(ReportEntry {
                        name: copy.name.clone(),
                        suffix: copy.suffix.clone(),
                        status: CardStatus::Copied,
                        flip: images.flip,
                        reason: None,
                    });
                    cards.push(Some(images.clone()));
                }
                Err(_) => {
                    report.push(ReportEntry::error(&copy.name, &copy.suffix, "Lookup failed"));
                    cards.push(None);
                }
            }
            continue;
        }

        let result = fetch_one(source, copy).await;
        match &result {
            Ok(images) => {
                report.push(ReportEntry {
                    name: copy.name.clone(),
                    suffix: copy.suffix.clone(),
                    status: if images.flip {
                        CardStatus::Flip
                    } else {
                        CardStatus::Ok
                    },
                    flip: images.flip,
                    reason: None,
                });
                cards.push(Some(images.clone()));
            }
            Err(reason) => {
                report.push(ReportEntry::error(&copy.name, &copy.suffix, reason));
                cards.push(None);
            }
        }
        cache.insert(key, result);

        if !options.delay.is_zero() {
            tokio::time::sleep(options.delay).await;
        }
    }

    let summary = Summary::from_report(&report);
    info!(
        "Fetch complete: {} ok, {} flips, {} copied, {} errors",
        summary.ok, summary.flips, summary.copied, summary.errors
    );

    Ok(FetchOutcome {
        cards,
        report,
        summary,
    })
}

/// Looks up and downloads one card. The error is the reason shown in the report.
async fn fetch_one(source: &dyn CardSource, copy: &CardCopy) -> Result<CardImages, &'static str> {
    let query = CardQuery {
        name: &copy.name,
        set_code: copy.set_code.as_deref(),
        set_num: copy.set_num.as_deref(),
    };

    let card = match source.lookup(&query).await {
        Ok(Some(card)) => card,
        Ok(None) => {
            warn!("No Scryfall match for '{}'", copy.name);
            return Err("Scryfall lookup failed");
        }
        Err(e) => {
            warn!("Scryfall lookup for '{}' failed: {e}", copy.name);
            return Err("Scryfall lookup failed");
        }
    };

    let Some(urls) = card.image_urls() else {
        warn!("'{}' has no image on Scryfall", card.name);
        return Err("No image URL");
    };
    debug!("'{}' resolved to {} (flip: {})", copy.name, urls.front, urls.flip);

    let front = source.download(&urls.front).await.map_err(|e| {
        warn!("Front image download for '{}' failed: {e}", copy.name);
        "Download failed"
    })?;

    let back = match &urls.back {
        Some(url) => match source.download(url).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!("Back image download for '{}' failed: {e}", copy.name);
                None
            }
        },
        None => None,
    };

    Ok(CardImages {
        front,
        front_ext: image_extension(&urls.front),
        back,
        back_ext: urls.back.as_deref().map_or("jpg", image_extension),
        flip: urls.flip,
    })
}

fn cache_key(copy: &CardCopy) -> String {
    format!(
        "{}|{}|{}",
        normalise(&copy.name),
        copy.set_code.as_deref().unwrap_or_default(),
        copy.set_num.as_deref().unwrap_or_default()
    )
}
