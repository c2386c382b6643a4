use serde::{Deserialize, Serialize};

/// Scryfall layouts whose cards print a second face on the back.
pub const FLIP_LAYOUTS: &[&str] = &[
    "transform",
    "modal_dfc",
    "flip",
    "reversible_card",
    "battle",
    "meld",
];

/// The subset of a Scryfall card object ProxyForge reads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScryfallCard {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_layout")]
    pub layout: String,
    pub image_uris: Option<ImageUris>,
    #[serde(default)]
    pub card_faces: Vec<CardFace>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CardFace {
    #[serde(default)]
    pub name: String,
    pub image_uris: Option<ImageUris>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageUris {
    pub png: Option<String>,
    pub large: Option<String>,
    pub normal: Option<String>,
    pub small: Option<String>,
}

/// Image locations resolved for one card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardImageUrls {
    pub front: String,
    pub back: Option<String>,
    pub flip: bool,
}

fn default_layout() -> String {
    "normal".to_string()
}

impl ScryfallCard {
    pub fn is_flip(&self) -> bool {
        FLIP_LAYOUTS.contains(&self.layout.as_str())
    }

    /// Resolves front/back image URLs.
    ///
    /// Double-faced layouts take the front from the first face (falling back
    /// to the card-level images) and the back from the second face.
    /// Returns `None` when no front image exists.
    pub fn image_urls(&self) -> Option<CardImageUrls> {
        let flip = self.is_flip();
        let (front, back) = if flip {
            let front = self
                .card_faces
                .first()
                .and_then(|face| best_image_url(face.image_uris.as_ref()))
                .or_else(|| best_image_url(self.image_uris.as_ref()));
            let back = self
                .card_faces
                .get(1)
                .and_then(|face| best_image_url(face.image_uris.as_ref()));
            (front, back)
        } else {
            (best_image_url(self.image_uris.as_ref()), None)
        };

        front.map(|front| CardImageUrls {
            front: front.to_string(),
            back: back.map(str::to_string),
            flip,
        })
    }
}

/// Picks the highest-resolution image available: png, large, normal, small.
pub fn best_image_url(uris: Option<&ImageUris>) -> Option<&str> {
    let uris = uris?;
    [&uris.png, &uris.large, &uris.normal, &uris.small]
        .into_iter()
        .find_map(|uri| uri.as_deref().filter(|u| !u.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uris(png: Option<&str>, normal: Option<&str>) -> Option<ImageUris> {
        Some(ImageUris {
            png: png.map(String::from),
            large: None,
            normal: normal.map(String::from),
            small: None,
        })
    }

    #[test]
    fn test_best_image_prefers_png() {
        let u = uris(Some("p.png"), Some("n.jpg"));
        assert_eq!(best_image_url(u.as_ref()), Some("p.png"));
    }

    #[test]
    fn test_best_image_falls_back() {
        let u = uris(None, Some("n.jpg"));
        assert_eq!(best_image_url(u.as_ref()), Some("n.jpg"));
        assert_eq!(best_image_url(None), None);
    }

    #[test]
    fn test_normal_layout_has_no_back() {
        let card = ScryfallCard {
            name: "Opt".to_string(),
            layout: "normal".to_string(),
            image_uris: uris(Some("front.png"), None),
            card_faces: vec![],
        };
        assert_eq!(
            card.image_urls(),
            Some(CardImageUrls {
                front: "front.png".to_string(),
                back: None,
                flip: false,
            })
        );
    }

    #[test]
    fn test_transform_uses_faces() {
        let card = ScryfallCard {
            name: "Delver of Secrets // Insectile Aberration".to_string(),
            layout: "transform".to_string(),
            image_uris: None,
            card_faces: vec![
                CardFace {
                    name: "Delver of Secrets".to_string(),
                    image_uris: uris(Some("a.png"), None),
                },
                CardFace {
                    name: "Insectile Aberration".to_string(),
                    image_uris: uris(Some("b.png"), None),
                },
            ],
        };
        let urls = card.image_urls().unwrap();
        assert!(urls.flip);
        assert_eq!(urls.front, "a.png");
        assert_eq!(urls.back.as_deref(), Some("b.png"));
    }

    #[test]
    fn test_flip_layout_without_face_images_uses_card_images() {
        // Kamigawa flip cards share one image across both faces.
        let card = ScryfallCard {
            name: "Bushi Tenderfoot // Kenzo the Hardhearted".to_string(),
            layout: "flip".to_string(),
            image_uris: uris(None, Some("shared.jpg")),
            card_faces: vec![CardFace::default(), CardFace::default()],
        };
        let urls = card.image_urls().unwrap();
        assert_eq!(urls.front, "shared.jpg");
        assert_eq!(urls.back, None);
        assert!(urls.flip);
    }

    #[test]
    fn test_missing_layout_defaults_to_normal() {
        let card: ScryfallCard = serde_json::from_str(r#"{"name": "Island"}"#).unwrap();
        assert_eq!(card.layout, "normal");
        assert!(card.image_urls().is_none());
    }
}
