use axum::Json;
use serde::{Deserialize, Serialize};

use crate::deck::{parse_deck_list, total_copies};
use crate::errors::AppError;
use crate::models::deck::DeckEntry;

#[derive(Debug, Deserialize)]
pub struct ParseRequest {
    pub deck_list: String,
}

#[derive(Debug, Serialize)]
pub struct ParseResponse {
    pub entries: Vec<DeckEntry>,
    pub total_copies: usize,
}

/// POST /api/parse
///
/// Previews how a deck list will be read, without contacting Scryfall.
pub async fn handle_parse(Json(request): Json<ParseRequest>) -> Result<Json<ParseResponse>, AppError> {
    let entries = parse_deck_list(&request.deck_list);
    if entries.is_empty() {
        return Err(AppError::Validation("Could not parse any cards.".to_string()));
    }

    let total_copies = total_copies(&entries);
    Ok(Json(ParseResponse {
        entries,
        total_copies,
    }))
}
