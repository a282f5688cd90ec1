//! 3x5 bitmap glyphs for scale labels.

use crate::render::surface::Rect;

const GLYPH_COLUMNS: usize = 3;
const GLYPH_ROWS: usize = 5;
/// Horizontal advance per glyph, in glyph cells.
const ADVANCE: f32 = 4.0;

fn glyph(c: char) -> Option<[u8; GLYPH_ROWS]> {
    let rows = match c {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b010, 0b010, 0b010],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        's' => [0b000, 0b011, 0b010, 0b001, 0b110],
        'm' => [0b000, 0b110, 0b111, 0b101, 0b101],
        ' ' => [0; GLYPH_ROWS],
        _ => return None,
    };
    Some(rows)
}

/// Logical width of `label` drawn `size` pixels tall.
pub(crate) fn text_width(label: &str, size: f32) -> f32 {
    let count = label.chars().filter(|c| glyph(*c).is_some()).count();
    if count == 0 {
        return 0.0;
    }
    let cell = size / GLYPH_ROWS as f32;
    (count as f32 * ADVANCE - 1.0) * cell
}

/// Filled cells of `label` with its glyph box's top-left at `(x, y)`.
pub(crate) fn glyph_cells(label: &str, x: f32, y: f32, size: f32) -> Vec<Rect> {
    let cell = size / GLYPH_ROWS as f32;
    let mut cells = Vec::new();
    let mut pen = x;
    for rows in label.chars().filter_map(glyph) {
        for (row, bits) in rows.iter().enumerate() {
            for column in 0..GLYPH_COLUMNS {
                if bits & (1 << (GLYPH_COLUMNS - 1 - column)) != 0 {
                    cells.push(Rect::new(
                        pen + column as f32 * cell,
                        y + row as f32 * cell,
                        cell,
                        cell,
                    ));
                }
            }
        }
        pen += ADVANCE * cell;
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_alphabet_is_covered() {
        for c in "0123456789:.-sm ".chars() {
            assert!(glyph(c).is_some(), "missing glyph {c:?}");
        }
        assert!(glyph('x').is_none());
    }

    #[test]
    fn width_counts_advance_without_trailing_gap() {
        assert_eq!(text_width("10s", 5.0), 11.0);
        assert_eq!(text_width("", 5.0), 0.0);
    }

    #[test]
    fn one_is_drawn_from_eight_cells() {
        let cells = glyph_cells("1", 10.0, 0.0, 10.0);

        assert_eq!(cells.len(), 8);
        assert!(cells.iter().all(|cell| cell.width == 2.0));
        assert_eq!(cells[0], Rect::new(12.0, 0.0, 2.0, 2.0));
    }
}
