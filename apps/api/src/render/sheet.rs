//! Print-and-cut sheet composition at 300 PPI.
//!
//! Landscape US letter (11" × 8.5") holds a 4 × 2 grid of 63 × 88 mm cards
//! framed by Silhouette type-1 registration marks. Back sheets place each card
//! in the horizontally mirrored slot so fronts and backs line up when the sheet
//! is flipped on its short axis.

use std::ops::Range;

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use tracing::warn;

pub const PPI: u32 = 300;

/// 11" × 8.5" at 300 PPI.
pub const PAGE_W_PX: u32 = 3300;
pub const PAGE_H_PX: u32 = 2550;

/// 63 mm × 88 mm at 300 PPI.
pub const CARD_W_PX: u32 = 744;
pub const CARD_H_PX: u32 = 1039;

pub const COLS: usize = 4;
pub const ROWS: usize = 2;
pub const CARDS_PER_SHEET: usize = COLS * ROWS;

pub const REG_INSET_PX: u32 = 112;
pub const REG_SIZE_PX: u32 = 188;
pub const REG_THICK_PX: u32 = 12;

pub const GRID_X: u32 = 150;
pub const GRID_Y: u32 = 224;
/// Slot pitch: card size plus the cutter's gutter.
pub const SLOT_PITCH_X: u32 = 754;
pub const SLOT_PITCH_Y: u32 = 1076;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
const PLACEHOLDER: Rgb<u8> = Rgb([38, 38, 51]);

/// Index ranges of the cards printed on each sheet.
pub fn sheet_ranges(total: usize) -> impl Iterator<Item = Range<usize>> {
    (0..total)
        .step_by(CARDS_PER_SHEET)
        .map(move |start| start..(start + CARDS_PER_SHEET).min(total))
}

/// Top-left pixel of slot `index` (0 = top-left, reading order).
pub fn slot_origin(index: usize) -> (u32, u32) {
    let col = (index % COLS) as u32;
    let row = (index / COLS) as u32;
    (GRID_X + col * SLOT_PITCH_X, GRID_Y + row * SLOT_PITCH_Y)
}

/// Slot in the same row with the column mirrored.
pub fn mirrored_slot(index: usize) -> usize {
    let col = index % COLS;
    let row = index / COLS;
    row * COLS + (COLS - 1 - col)
}

pub fn new_page() -> RgbImage {
    RgbImage::from_pixel(PAGE_W_PX, PAGE_H_PX, WHITE)
}

/// Fills the inclusive rectangle `[x0, x1] × [y0, y1]`, clipped to the page.
fn fill_rect(page: &mut RgbImage, x0: u32, y0: u32, x1: u32, y1: u32, color: Rgb<u8>) {
    let x1 = x1.min(page.width().saturating_sub(1));
    let y1 = y1.min(page.height().saturating_sub(1));
    for y in y0..=y1 {
        for x in x0..=x1 {
            page.put_pixel(x, y, color);
        }
    }
}

/// Draws the three Silhouette type-1 marks: a filled square top-left and
/// L-shaped corners top-right and bottom-left.
pub fn draw_registration_marks(page: &mut RgbImage) {
    let (i, s, t) = (REG_INSET_PX, REG_SIZE_PX, REG_THICK_PX);
    let (w, h) = (page.width(), page.height());

    fill_rect(page, i, i, i + s, i + s, BLACK);

    let (tr_x, tr_y) = (w - i - s, i);
    fill_rect(page, tr_x, tr_y, tr_x + s, tr_y + t, BLACK);
    fill_rect(page, tr_x + s - t, tr_y, tr_x + s, tr_y + s, BLACK);

    let (bl_x, bl_y) = (i, h - i - s);
    fill_rect(page, bl_x, bl_y + s - t, bl_x + s, bl_y + s, BLACK);
    fill_rect(page, bl_x, bl_y, bl_x + t, bl_y + s, BLACK);
}

/// Decodes a card image and pastes it with its top-left at `(x, y)`.
///
/// With `extend_corners > 0` the image is scaled `extend_corners` px larger on
/// every side and bleeds past the slot, hiding rounded-corner artifacts.
/// Images that fail to decode leave a dark placeholder in the slot.
pub fn place_card(page: &mut RgbImage, image_bytes: &[u8], x: u32, y: u32, extend_corners: u32) {
    let card = match image::load_from_memory(image_bytes) {
        Ok(img) => img.to_rgb8(),
        Err(e) => {
            warn!("Card image could not be decoded ({e}); drawing placeholder");
            fill_rect(
                page,
                x,
                y,
                x + CARD_W_PX - 1,
                y + CARD_H_PX - 1,
                PLACEHOLDER,
            );
            return;
        }
    };

    let ec = extend_corners;
    let resized = imageops::resize(
        &card,
        CARD_W_PX + 2 * ec,
        CARD_H_PX + 2 * ec,
        FilterType::Lanczos3,
    );
    imageops::replace(
        page,
        &resized,
        i64::from(x) - i64::from(ec),
        i64::from(y) - i64::from(ec),
    );
}

/// Front sheet: cards in reading order.
pub fn render_front_sheet<B: AsRef<[u8]>>(fronts: &[B], extend_corners: u32) -> RgbImage {
    let mut page = new_page();
    for (slot, front) in fronts.iter().enumerate().take(CARDS_PER_SHEET) {
        let (x, y) = slot_origin(slot);
        place_card(&mut page, front.as_ref(), x, y, extend_corners);
    }
    // Marks go on last so card bleed never clips them.
    draw_registration_marks(&mut page);
    page
}

/// Back sheet: each card's own back, or `generic_back`, in the mirrored slot.
/// Slots with neither stay blank.
pub fn render_back_sheet<B: AsRef<[u8]>>(
    backs: &[Option<B>],
    generic_back: Option<&[u8]>,
    extend_corners: u32,
) -> RgbImage {
    let mut page = new_page();
    for (slot, back) in backs.iter().enumerate().take(CARDS_PER_SHEET) {
        let Some(bytes) = back.as_ref().map(AsRef::<[u8]>::as_ref).or(generic_back) else {
            continue;
        };
        let (x, y) = slot_origin(mirrored_slot(slot));
        place_card(&mut page, bytes, x, y, extend_corners);
    }
    draw_registration_marks(&mut page);
    page
}
