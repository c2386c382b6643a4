//! Request form shared by the download and PDF endpoints.
//!
//! Browsers post `multipart/form-data` (the PDF form carries a file upload);
//! scripts may post `application/x-www-form-urlencoded`. Both are accepted.

use axum::{
    async_trait,
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
    Form,
};
use bytes::Bytes;
use serde::Deserialize;

use crate::errors::AppError;
use crate::render::MAX_EXTEND_CORNERS;

#[derive(Debug, Default)]
pub struct ProxyForm {
    pub deck_list: String,
    /// Image used for cards that have no back of their own.
    pub generic_back: Option<Bytes>,
    pub extend_corners: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct UrlEncodedProxyForm {
    deck_list: String,
    extend_corners: Option<String>,
}

#[async_trait]
impl<S> FromRequest<S> for ProxyForm
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("multipart/form-data"));

        if is_multipart {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| AppError::Validation(e.body_text()))?;
            Self::from_multipart(multipart).await
        } else {
            let Form(raw) = Form::<UrlEncodedProxyForm>::from_request(req, state)
                .await
                .map_err(|e| AppError::Validation(e.body_text()))?;
            Ok(ProxyForm {
                deck_list: raw.deck_list,
                generic_back: None,
                extend_corners: parse_extend_corners(raw.extend_corners.as_deref())?,
            })
        }
    }
}

impl ProxyForm {
    async fn from_multipart(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = ProxyForm::default();
        let mut saw_deck_list = false;

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?
        {
            let name = field.name().map(str::to_string);
            match name.as_deref() {
                Some("deck_list") => {
                    form.deck_list = field
                        .text()
                        .await
                        .map_err(|e| AppError::Validation(e.body_text()))?;
                    saw_deck_list = true;
                }
                Some("generic_back") => {
                    // Browsers send an empty, unnamed part when no file is chosen.
                    let has_file = field.file_name().is_some_and(|name| !name.is_empty());
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| AppError::Validation(e.body_text()))?;
                    if has_file && !bytes.is_empty() {
                        form.generic_back = Some(bytes);
                    }
                }
                Some("extend_corners") => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| AppError::Validation(e.body_text()))?;
                    form.extend_corners = parse_extend_corners(Some(&text))?;
                }
                _ => {}
            }
        }

        if !saw_deck_list {
            return Err(AppError::Validation("deck_list field is required".to_string()));
        }
        Ok(form)
    }
}

/// Blank means "use the default"; otherwise an integer in `0..=MAX_EXTEND_CORNERS`.
fn parse_extend_corners(raw: Option<&str>) -> Result<Option<u32>, AppError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    match raw.parse::<u32>() {
        Ok(value) if value <= MAX_EXTEND_CORNERS => Ok(Some(value)),
        _ => Err(AppError::Validation(format!(
            "extend_corners must be an integer between 0 and {MAX_EXTEND_CORNERS}"
        ))),
    }
}
