//! Axum route handlers for proxy generation.

use std::fmt::Write as _;

use axum::{
    extract::State,
    http::{
        header::{ACCESS_CONTROL_EXPOSE_HEADERS, CONTENT_DISPOSITION, CONTENT_TYPE},
        HeaderMap, HeaderName, HeaderValue,
    },
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::proxies::archive::build_archive;
use crate::proxies::fetch::{fetch_all_cards, FetchOutcome};
use crate::proxies::form::ProxyForm;
use crate::render::{build_pdf, RenderError, RenderOptions, DEFAULT_EXTEND_CORNERS};
use crate::state::AppState;

const X_SUMMARY: HeaderName = HeaderName::from_static("x-summary");
const X_REPORT: HeaderName = HeaderName::from_static("x-report");

/// POST /api/download
///
/// Fetches every card and returns the raw images plus `_report.json` as a ZIP.
#[tracing::instrument(skip_all, fields(job_id = %Uuid::new_v4()))]
pub async fn handle_download(
    State(state): State<AppState>,
    form: ProxyForm,
) -> Result<Response, AppError> {
    let outcome = fetch_all_cards(
        state.card_source.as_ref(),
        &form.deck_list,
        &state.fetch_options(),
    )
    .await?;

    let archive = build_archive(&outcome)?;
    info!("Archive ready: {} bytes", archive.len());

    attachment(archive, "application/zip", "proxies.zip", &outcome)
}

/// POST /api/pdf
///
/// Fetches every card and renders the print-and-cut PDF. Copies that failed
/// to download are left out of the sheets but stay in the report.
#[tracing::instrument(skip_all, fields(job_id = %Uuid::new_v4()))]
pub async fn handle_pdf(
    State(state): State<AppState>,
    form: ProxyForm,
) -> Result<Response, AppError> {
    let outcome = fetch_all_cards(
        state.card_source.as_ref(),
        &form.deck_list,
        &state.fetch_options(),
    )
    .await?;

    let (fronts, backs): (Vec<Bytes>, Vec<Option<Bytes>>) = outcome
        .successes()
        .map(|(_, images)| (images.front.clone(), images.back.clone()))
        .unzip();
    if fronts.is_empty() {
        return Err(AppError::Validation(
            "No cards were successfully downloaded.".to_string(),
        ));
    }

    let options = RenderOptions {
        extend_corners: form.extend_corners.unwrap_or(DEFAULT_EXTEND_CORNERS),
        jpeg_quality: state.config.jpeg_quality,
    };
    let generic_back = form.generic_back;
    let card_count = fronts.len();

    let pdf = tokio::task::spawn_blocking(move || {
        build_pdf(&fronts, &backs, generic_back.as_deref(), &options)
    })
    .await
    .map_err(|e| RenderError::Join(e.to_string()))??;
    info!("PDF ready: {card_count} cards, {} bytes", pdf.len());

    let filename = format!("proxies_{}cards.pdf", outcome.summary.ok);
    attachment(pdf, "application/pdf", &filename, &outcome)
}

/// Builds a file download response carrying the report headers.
fn attachment(
    body: Vec<u8>,
    content_type: &'static str,
    filename: &str,
    outcome: &FetchOutcome,
) -> Result<Response, AppError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(
        CONTENT_DISPOSITION,
        HeaderValue::from_str(&format!("attachment; filename={filename}"))
            .map_err(anyhow::Error::from)?,
    );
    headers.insert(X_SUMMARY, header_json(&outcome.summary)?);
    headers.insert(X_REPORT, header_json(&outcome.report)?);
    headers.insert(
        ACCESS_CONTROL_EXPOSE_HEADERS,
        HeaderValue::from_static("X-Summary, X-Report"),
    );

    Ok((headers, body).into_response())
}

/// Serializes `value` as JSON that is a valid header value: non-ASCII
/// characters (card names such as "Lim-Dûl") become `\uXXXX` escapes.
fn header_json<T: Serialize>(value: &T) -> Result<HeaderValue, AppError> {
    let json = serde_json::to_string(value).map_err(anyhow::Error::from)?;
    let escaped = escape_non_ascii(&json);
    Ok(HeaderValue::from_str(&escaped).map_err(anyhow::Error::from)?)
}

fn escape_non_ascii(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        if c.is_ascii() {
            out.push(c);
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                let _ = write!(out, "\\u{unit:04x}");
            }
        }
    }
    out
}
