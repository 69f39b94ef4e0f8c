//! PNG measurement card, drawn with a built-in 5x7 bitmap font.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

use crate::error::{CkStyleError, Result};
use crate::profile::MeasurementDetail;

/// Device pixels per logical pixel.
pub const SCALE: u32 = 2;

const BACKGROUND: Rgb<u8> = Rgb([0x1a, 0x1a, 0x1a]);
const GOLD: Rgb<u8> = Rgb([0xd4, 0xaf, 0x37]);
const TEXT: Rgb<u8> = Rgb([0xf2, 0xf2, 0xf2]);
const MUTED: Rgb<u8> = Rgb([0x88, 0x88, 0x88]);
const RULE: Rgb<u8> = Rgb([0x33, 0x33, 0x33]);

const WIDTH: u32 = 640;
const MARGIN: u32 = 24;
const GLYPH_W: u32 = 5;
const GLYPH_H: u32 = 7;
const ROW_HEIGHT: u32 = 26;

const ELLIPSIS: &str = "...";

/// Nearest character the font can draw: Latin accents are stripped and
/// typographic quotes and dashes become their ASCII forms.
fn fold(c: char) -> char {
    match c {
        'À'..='Å' | 'à'..='å' | 'Ā' | 'ā' | 'Ă' | 'ă' | 'Ą' | 'ą' => 'A',
        'Ç' | 'ç' | 'Ć' | 'ć' | 'Č' | 'č' => 'C',
        'Ð' | 'Ď' | 'ď' | 'Đ' | 'đ' => 'D',
        'È'..='Ë' | 'è'..='ë' | 'Ē' | 'ē' | 'Ė' | 'ė' | 'Ę' | 'ę' | 'Ě' | 'ě' => 'E',
        'Ğ' | 'ğ' => 'G',
        'Ì'..='Ï' | 'ì'..='ï' | 'Ī' | 'ī' | 'İ' | 'ı' => 'I',
        'Ł' | 'ł' => 'L',
        'Ñ' | 'ñ' | 'Ń' | 'ń' | 'Ň' | 'ň' => 'N',
        'Ò'..='Ö' | 'Ø' | 'ò'..='ö' | 'ø' | 'Ō' | 'ō' | 'Ő' | 'ő' => 'O',
        'Ř' | 'ř' => 'R',
        'Ś' | 'ś' | 'Ş' | 'ş' | 'Š' | 'š' | 'ß' => 'S',
        'Ť' | 'ť' | 'Ţ' | 'ţ' => 'T',
        'Ù'..='Ü' | 'ù'..='ü' | 'Ū' | 'ū' | 'Ů' | 'ů' | 'Ű' | 'ű' => 'U',
        'Ý' | 'ý' | 'ÿ' | 'Ÿ' => 'Y',
        'Ź' | 'ź' | 'Ż' | 'ż' | 'Ž' | 'ž' => 'Z',
        '\u{2018}' | '\u{2019}' | '`' => '\'',
        '\u{201C}' | '\u{201D}' => '"',
        '\u{2013}' | '\u{2014}' => '-',
        '\u{00A0}' | '\t' => ' ',
        other => other,
    }
}

/// Rows of a glyph, bit 4 is the leftmost column. Anything without a
/// glyph after folding draws as `?`.
fn glyph(c: char) -> [u8; 7] {
    match fold(c).to_ascii_uppercase() {
        'A' => [0x0E, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'B' => [0x1E, 0x11, 0x11, 0x1E, 0x11, 0x11, 0x1E],
        'C' => [0x0E, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0E],
        'D' => [0x1E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x1E],
        'E' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x1F],
        'F' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x10],
        'G' => [0x0E, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0F],
        'H' => [0x11, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'I' => [0x0E, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E],
        'J' => [0x07, 0x02, 0x02, 0x02, 0x02, 0x12, 0x0C],
        'K' => [0x11, 0x12, 0x14, 0x18, 0x14, 0x12, 0x11],
        'L' => [0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1F],
        'M' => [0x11, 0x1B, 0x15, 0x15, 0x11, 0x11, 0x11],
        'N' => [0x11, 0x11, 0x19, 0x15, 0x13, 0x11, 0x11],
        'O' => [0x0E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'P' => [0x1E, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10],
        'Q' => [0x0E, 0x11, 0x11, 0x11, 0x15, 0x12, 0x0D],
        'R' => [0x1E, 0x11, 0x11, 0x1E, 0x14, 0x12, 0x11],
        'S' => [0x0F, 0x10, 0x10, 0x0E, 0x01, 0x01, 0x1E],
        'T' => [0x1F, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04],
        'U' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'V' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x0A, 0x04],
        'W' => [0x11, 0x11, 0x11, 0x15, 0x15, 0x15, 0x0A],
        'X' => [0x11, 0x11, 0x0A, 0x04, 0x0A, 0x11, 0x11],
        'Y' => [0x11, 0x11, 0x0A, 0x04, 0x04, 0x04, 0x04],
        'Z' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x10, 0x1F],
        '0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        '1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        '2' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
        '3' => [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
        '4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        '5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        '6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        '7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        '9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        ' ' => [0x00; 7],
        '.' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x0C, 0x0C],
        ',' => [0x00, 0x00, 0x00, 0x00, 0x0C, 0x04, 0x08],
        '-' => [0x00, 0x00, 0x00, 0x1F, 0x00, 0x00, 0x00],
        ':' => [0x00, 0x0C, 0x0C, 0x00, 0x0C, 0x0C, 0x00],
        '/' => [0x01, 0x01, 0x02, 0x04, 0x08, 0x10, 0x10],
        '(' => [0x02, 0x04, 0x08, 0x08, 0x08, 0x04, 0x02],
        ')' => [0x08, 0x04, 0x02, 0x02, 0x02, 0x04, 0x08],
        '\'' => [0x04, 0x04, 0x08, 0x00, 0x00, 0x00, 0x00],
        '"' => [0x0A, 0x0A, 0x00, 0x00, 0x00, 0x00, 0x00],
        '&' => [0x0C, 0x12, 0x14, 0x08, 0x15, 0x12, 0x0D],
        '_' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x1F],
        '+' => [0x00, 0x04, 0x04, 0x1F, 0x04, 0x04, 0x00],
        '#' => [0x0A, 0x0A, 0x1F, 0x0A, 0x1F, 0x0A, 0x0A],
        _ => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x00, 0x04],
    }
}

/// Width in logical pixels of `text` drawn at `size` pixels per glyph bit.
pub fn text_width(text: &str, size: u32) -> u32 {
    let n = text.chars().count() as u32;
    if n == 0 {
        0
    } else {
        n * (GLYPH_W + 1) * size - size
    }
}

/// `text` cut to fit `max_width` at `size`, ending in `...` when shortened.
pub fn fit(text: &str, size: u32, max_width: u32) -> String {
    if text_width(text, size) <= max_width {
        return text.to_string();
    }
    let mut kept = String::new();
    for c in text.chars() {
        kept.push(c);
        if text_width(&format!("{}{}", kept, ELLIPSIS), size) > max_width {
            kept.pop();
            break;
        }
    }
    format!("{}{}", kept.trim_end(), ELLIPSIS)
}

struct Canvas {
    img: RgbImage,
}

impl Canvas {
    fn new(height: u32) -> Self {
        Self {
            img: RgbImage::from_pixel(WIDTH * SCALE, height * SCALE, BACKGROUND),
        }
    }

    /// Fill a logical rectangle, clipped to the canvas.
    fn fill(&mut self, x: u32, y: u32, w: u32, h: u32, color: Rgb<u8>) {
        let (max_x, max_y) = self.img.dimensions();
        for py in (y * SCALE)..((y + h) * SCALE).min(max_y) {
            for px in (x * SCALE)..((x + w) * SCALE).min(max_x) {
                self.img.put_pixel(px, py, color);
            }
        }
    }

    fn text(&mut self, x: u32, y: u32, text: &str, size: u32, color: Rgb<u8>) {
        let mut cursor = x;
        for c in text.chars() {
            for (row, bits) in glyph(c).iter().enumerate() {
                for col in 0..GLYPH_W {
                    if bits & (0x10 >> col) != 0 {
                        self.fill(cursor + col * size, y + row as u32 * size, size, size, color);
                    }
                }
            }
            cursor += (GLYPH_W + 1) * size;
        }
    }

    fn text_right(&mut self, right: u32, y: u32, text: &str, size: u32, color: Rgb<u8>) {
        let x = right.saturating_sub(text_width(text, size));
        self.text(x, y, text, size, color);
    }
}

fn card_height(detail: &MeasurementDetail) -> u32 {
    let rows: u32 = detail.groups.iter().map(|g| g.rows.len() as u32).sum();
    let groups = detail.groups.len() as u32;
    MARGIN + 30 + 70 + groups * 36 + rows * ROW_HEIGHT + MARGIN
}

/// Render the detail card as PNG bytes.
pub fn render_png(detail: &MeasurementDetail) -> Result<Vec<u8>> {
    let s = &detail.summary;
    let mut canvas = Canvas::new(card_height(detail));
    let right = WIDTH - MARGIN;

    let inner = WIDTH - 2 * MARGIN;

    let mut y = MARGIN;
    let title = format!("CK STYLE - {}", s.profile_name);
    canvas.text(MARGIN, y, &fit(&title, 3, inner), 3, GOLD);
    y += 30;

    canvas.text(MARGIN, y, "NAME", 1, MUTED);
    canvas.text(MARGIN, y + 10, &fit(&s.full_name, 2, inner), 2, TEXT);
    y += 34;
    let columns = [("SEX", &s.sex_label), ("UNIT", &s.unit), ("DATE", &s.date_label)];
    let col_width = inner / columns.len() as u32;
    for (i, (label, value)) in columns.iter().enumerate() {
        let x = MARGIN + i as u32 * col_width;
        canvas.text(x, y, label, 1, MUTED);
        canvas.text(x, y + 10, &fit(value, 2, col_width - 8), 2, TEXT);
    }
    y += 36;

    for group in &detail.groups {
        y += 10;
        canvas.text(MARGIN, y, &group.title, 2, GOLD);
        y += 26;
        for row in &group.rows {
            let name_room = inner.saturating_sub(text_width(&row.display, 2) + 12);
            canvas.text(MARGIN, y + 5, &fit(&row.display_name, 2, name_room), 2, TEXT);
            canvas.text_right(right, y + 5, &row.display, 2, GOLD);
            canvas.fill(MARGIN, y + ROW_HEIGHT - 2, WIDTH - 2 * MARGIN, 1, RULE);
            y += ROW_HEIGHT;
        }
    }

    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(canvas.img)
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(|e| CkStyleError::Export(format!("Failed to encode PNG: {}", e)))?;
    Ok(buffer.into_inner())
}
