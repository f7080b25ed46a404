//! A tiny 5x7 bitmap font for drawing report text into rasters, so that the
//! whole pipeline can be tested without image fixtures.
//!
//! Characters sit in cells 7 pixels wide with 2 blank columns between
//! them, and lines are 12 pixels apart. Every glyph is connected when
//! pixels one column or two rows apart count as neighbors.

use log::warn;

use crate::binarization::{binarize, BinarizeOptions};
use crate::dictionary::GlyphDictionary;
use crate::errors::Result;
use crate::pixmap::Bitmap;
use crate::raster::Raster;
use crate::segmentation::{segment, SegmenterConfig};

/// Horizontal distance between character cells.
pub const ADVANCE: usize = 7;
/// Vertical distance between lines.
pub const LINE_PITCH: usize = 12;
/// Blank border around the text.
pub const MARGIN: usize = 4;

/// Sample value used for ink.
const INK: i32 = 255;

#[rustfmt::skip]
const FONT: &[(char, [&str; 7])] = &[
    ('0', [".###.", "#...#", "#..##", "#.#.#", "##..#", "#...#", ".###."]),
    ('1', ["..#..", ".##..", "..#..", "..#..", "..#..", "..#..", ".###."]),
    ('2', [".###.", "#...#", "....#", "...#.", "..#..", ".#...", "#####"]),
    ('3', ["#####", "...#.", "..#..", "...#.", "....#", "#...#", ".###."]),
    ('4', ["...#.", "..##.", ".#.#.", "#..#.", "#####", "...#.", "...#."]),
    ('5', ["#####", "#....", "####.", "....#", "....#", "#...#", ".###."]),
    ('6', ["..##.", ".#...", "#....", "####.", "#...#", "#...#", ".###."]),
    ('7', ["#####", "....#", "...#.", "..#..", ".#...", ".#...", ".#..."]),
    ('8', [".###.", "#...#", "#...#", ".###.", "#...#", "#...#", ".###."]),
    ('9', [".###.", "#...#", "#...#", ".####", "....#", "...#.", ".##.."]),
    ('A', [".###.", "#...#", "#...#", "#####", "#...#", "#...#", "#...#"]),
    ('B', ["####.", "#...#", "#...#", "####.", "#...#", "#...#", "####."]),
    ('C', [".###.", "#...#", "#....", "#....", "#....", "#...#", ".###."]),
    ('D', ["###..", "#..#.", "#...#", "#...#", "#...#", "#..#.", "###.."]),
    ('E', ["#####", "#....", "#....", "####.", "#....", "#....", "#####"]),
    ('F', ["#####", "#....", "#....", "####.", "#....", "#....", "#...."]),
    ('G', [".###.", "#...#", "#....", "#.###", "#...#", "#...#", ".####"]),
    ('H', ["#...#", "#...#", "#...#", "#####", "#...#", "#...#", "#...#"]),
    ('I', [".###.", "..#..", "..#..", "..#..", "..#..", "..#..", ".###."]),
    ('J', ["..###", "...#.", "...#.", "...#.", "...#.", "#..#.", ".##.."]),
    ('K', ["#...#", "#..#.", "#.#..", "##...", "#.#..", "#..#.", "#...#"]),
    ('L', ["#....", "#....", "#....", "#....", "#....", "#....", "#####"]),
    ('M', ["#...#", "##.##", "#.#.#", "#.#.#", "#...#", "#...#", "#...#"]),
    ('N', ["#...#", "#...#", "##..#", "#.#.#", "#..##", "#...#", "#...#"]),
    ('O', [".###.", "#...#", "#...#", "#...#", "#...#", "#...#", ".###."]),
    ('P', ["####.", "#...#", "#...#", "####.", "#....", "#....", "#...."]),
    ('Q', [".###.", "#...#", "#...#", "#...#", "#.#.#", "#..#.", ".##.#"]),
    ('R', ["####.", "#...#", "#...#", "####.", "#.#..", "#..#.", "#...#"]),
    ('S', [".####", "#....", "#....", ".###.", "....#", "....#", "####."]),
    ('T', ["#####", "..#..", "..#..", "..#..", "..#..", "..#..", "..#.."]),
    ('U', ["#...#", "#...#", "#...#", "#...#", "#...#", "#...#", ".###."]),
    ('V', ["#...#", "#...#", "#...#", "#...#", "#...#", ".#.#.", "..#.."]),
    ('W', ["#...#", "#...#", "#...#", "#.#.#", "#.#.#", "#.#.#", ".#.#."]),
    ('X', ["#...#", "#...#", ".#.#.", "..#..", ".#.#.", "#...#", "#...#"]),
    ('Y', ["#...#", "#...#", ".#.#.", "..#..", "..#..", "..#..", "..#.."]),
    ('Z', ["#####", "....#", "...#.", "..#..", ".#...", "#....", "#####"]),
    ('.', [".....", ".....", ".....", ".....", ".....", ".##..", ".##.."]),
    ('-', [".....", ".....", ".....", "#####", ".....", ".....", "....."]),
    (':', [".....", ".....", ".##..", ".##..", ".....", ".##..", ".##.."]),
    ('(', ["...#.", "..#..", ".#...", ".#...", ".#...", "..#..", "...#."]),
    (')', [".#...", "..#..", "...#.", "...#.", "...#.", "..#..", ".#..."]),
    ('/', ["....#", "....#", "...#.", "..#..", ".#...", "#....", "#...."]),
    ('*', [".....", "#.#.#", ".###.", "#####", ".###.", "#.#.#", "....."]),
];

/// Every character the font can draw, other than space.
pub fn characters() -> impl Iterator<Item = char> {
    FONT.iter().map(|&(c, _)| c)
}

fn rows_for(c: char) -> Option<&'static [&'static str; 7]> {
    FONT.iter()
        .find(|&&(f, _)| f == c.to_ascii_uppercase())
        .map(|(_, rows)| rows)
}

/// Draw `lines` as an 8-bit raster with bright text on a black background.
/// Lower case is drawn as upper case. Characters the font doesn't know are
/// left blank.
pub fn render_lines(lines: &[&str]) -> Result<Raster> {
    let columns = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    let width = 2 * MARGIN + columns * ADVANCE;
    let height = 2 * MARGIN + lines.len() * LINE_PITCH;
    let mut samples = vec![0; width * height];
    for (line_no, line) in lines.iter().enumerate() {
        let top = MARGIN + line_no * LINE_PITCH;
        for (col, c) in line.chars().enumerate() {
            let left = MARGIN + col * ADVANCE;
            let Some(rows) = rows_for(c) else {
                if c != ' ' {
                    warn!("test font has no {:?}", c);
                }
                continue;
            };
            for (dy, row) in rows.iter().enumerate() {
                for (dx, pixel) in row.chars().enumerate() {
                    if pixel == '#' {
                        samples[(top + dy) * width + left + dx] = INK;
                    }
                }
            }
        }
    }
    Raster::new(width, height, 8, false, samples)
}

/// Draw `lines` and binarize the result.
pub fn render_bitmap(lines: &[&str]) -> Result<Bitmap> {
    Ok(binarize(&render_lines(lines)?, &BinarizeOptions::default()))
}

/// A dictionary containing every glyph of the font, as it segments with
/// `config`.
pub fn font_dictionary(config: &SegmenterConfig) -> Result<GlyphDictionary> {
    let mut dictionary = GlyphDictionary::new();
    for c in characters() {
        let text = c.to_string();
        let components = segment(&render_bitmap(&[&text])?, config)?.into_components();
        match components.as_slice() {
            [component] => {
                dictionary.insert(component.glyph().clone().seeded(), text);
            }
            _ => warn!("{:?} is {} glyphs in the test font", c, components.len()),
        }
    }
    Ok(dictionary)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::dialect::Dialect;

    #[test]
    fn every_character_is_one_distinct_glyph() {
        for dialect in [Dialect::Ge, Dialect::Siemens, Dialect::Toshiba, Dialect::Philips] {
            let dictionary = font_dictionary(&dialect.profile().segmenter).unwrap();
            assert_eq!(dictionary.len(), characters().count(), "{}", dialect);
        }
    }

    #[test]
    fn characters_in_a_word_stay_separate() {
        let bitmap = render_bitmap(&["KVP120"]).unwrap();
        for dialect in [Dialect::Ge, Dialect::Siemens, Dialect::Toshiba, Dialect::Philips] {
            let seg = segment(&bitmap, &dialect.profile().segmenter).unwrap();
            assert_eq!(seg.components().len(), 6, "{}", dialect);
        }
    }
}
