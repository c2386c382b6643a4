//! PDF assembly — wraps pre-encoded JPEG pages into a PDF without re-encoding
//! (DCTDecode image XObjects, one per page) and stamps a footer label in
//! Helvetica.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use crate::render::sheet::{PPI, REG_INSET_PX};
use crate::render::RenderError;

const LABEL_FONT_SIZE: f32 = 8.0;
/// Rough Helvetica advance per character in em; enough to centre a short label.
const LABEL_AVG_CHAR_EM: f32 = 0.5;
/// 160/255 grey.
const LABEL_GREY: f32 = 0.627;

/// One rendered sheet side, ready to embed.
pub struct PdfPage {
    pub jpeg: Vec<u8>,
    pub width_px: u32,
    pub height_px: u32,
    pub label: String,
}

fn px_to_pt(px: u32) -> f32 {
    px as f32 * 72.0 / PPI as f32
}

pub fn assemble_pdf(pages: Vec<PdfPage>) -> Result<Vec<u8>, RenderError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for page in pages {
        let width_pt = px_to_pt(page.width_px);
        let height_pt = px_to_pt(page.height_px);

        let image_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(page.width_px),
                "Height" => i64::from(page.height_px),
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "Filter" => "DCTDecode",
            },
            page.jpeg,
        ));

        // Label sits centred in the bottom margin, halfway into the inset band.
        let label_width = page.label.chars().count() as f32 * LABEL_AVG_CHAR_EM * LABEL_FONT_SIZE;
        let label_x = ((width_pt - label_width) / 2.0).max(0.0);
        let label_y = px_to_pt(REG_INSET_PX / 2) - LABEL_FONT_SIZE / 2.0;

        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        Object::Real(width_pt),
                        0.into(),
                        0.into(),
                        Object::Real(height_pt),
                        0.into(),
                        0.into(),
                    ],
                ),
                Operation::new("Do", vec!["Im0".into()]),
                Operation::new("Q", vec![]),
                Operation::new("BT", vec![]),
                Operation::new("g", vec![Object::Real(LABEL_GREY)]),
                Operation::new("Tf", vec!["F1".into(), Object::Real(LABEL_FONT_SIZE)]),
                Operation::new("Td", vec![Object::Real(label_x), Object::Real(label_y)]),
                Operation::new("Tj", vec![Object::string_literal(page.label)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), Object::Real(width_pt), Object::Real(height_pt)],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Im0" => image_id },
                "Font" => dictionary! { "F1" => font_id },
            },
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out)?;
    Ok(out)
}
