//! Graphics state and extracted-content records.

use std::cmp::Ordering;

use crate::utils::{Matrix, Point, MATRIX_IDENTITY};

/// The graphics state carried across content-stream operators.
///
/// One value per interpretation; `q`/`Q` push and pop copies by value.
#[derive(Debug, Clone)]
pub struct GraphicsState {
    /// Character spacing (Tc).
    pub char_spacing: f64,
    /// Word spacing (Tw), applied to the space character.
    pub word_spacing: f64,
    /// Horizontal scaling (Th), as a fraction (Tz operand / 100).
    pub horiz_scale: f64,
    /// Text leading (Tl).
    pub leading: f64,
    /// Font size (Tfs).
    pub font_size: f64,
    /// Text rendering mode (Tr).
    pub render_mode: i64,
    /// Text rise (Ts).
    pub rise: f64,
    /// Text matrix.
    pub tm: Matrix,
    /// Text line matrix.
    pub tlm: Matrix,
    /// Current transformation matrix.
    pub ctm: Matrix,
    /// Current path point.
    pub point: Point,
    /// Line join style (j).
    pub join_style: i64,
    /// Line cap style (J).
    pub cap_style: i64,
    /// Line width (w), in untransformed user units.
    pub line_width: f64,
}

impl GraphicsState {
    pub fn new() -> Self {
        Self {
            char_spacing: 0.0,
            word_spacing: 0.0,
            horiz_scale: 1.0,
            leading: 0.0,
            font_size: 0.0,
            render_mode: 0,
            rise: 0.0,
            tm: MATRIX_IDENTITY,
            tlm: MATRIX_IDENTITY,
            ctm: MATRIX_IDENTITY,
            point: (0.0, 0.0),
            join_style: 0,
            cap_style: 0,
            line_width: 0.0,
        }
    }
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self::new()
    }
}

/// A decoded character with its glyph advance width in thousandths of an em.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionedChar {
    /// UTF-8 text for the character (may be several code points).
    pub text: String,
    /// Advance width, thousandths of an em.
    pub width: f64,
}

/// A single run of text drawn on a page.
#[derive(Debug, Clone)]
pub struct TextRun {
    /// Font name, subset prefix stripped.
    pub font: String,
    /// Effective font size in points.
    pub font_size: f64,
    /// Rotation angle in degrees.
    pub rotation: f64,
    /// Font weight from the font descriptor (0 when absent).
    pub font_weight: f64,
    /// Origin, user-space points, x increasing rightward.
    pub x: f64,
    /// Origin, user-space points, y increasing upward.
    pub y: f64,
    /// Advance width of the run in user-space points.
    pub advance: f64,
    /// The decoded characters.
    pub chars: Vec<PositionedChar>,
}

impl TextRun {
    /// The run's text as a plain string.
    pub fn text(&self) -> String {
        self.chars.iter().map(|c| c.text.as_str()).collect()
    }
}

/// The shape of a path record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    Line,
    Rect,
    Bezier,
}

/// A vector path segment in device coordinates.
#[derive(Debug, Clone)]
pub struct PathRecord {
    pub kind: PathKind,
    /// Control and end points, CTM-transformed.
    pub points: Vec<Point>,
    /// Final current point after the segment; a rectangle closes back
    /// onto its start corner.
    pub end: Point,
    pub join_style: i64,
    pub cap_style: i64,
    /// Stroke width scaled by the CTM.
    pub line_width: f64,
}

/// Extracted page content: text runs and vector paths.
#[derive(Debug, Clone, Default)]
pub struct Content {
    pub texts: Vec<TextRun>,
    pub paths: Vec<PathRecord>,
}

impl Content {
    /// Orders runs top-to-bottom, then left-to-right within a line.
    pub fn sort_vertical(texts: &mut [TextRun]) {
        texts.sort_by(|a, b| {
            match b.y.partial_cmp(&a.y).unwrap_or(Ordering::Equal) {
                Ordering::Equal => a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal),
                other => other,
            }
        });
    }

    /// Orders runs left-to-right, then top-to-bottom within a column.
    pub fn sort_horizontal(texts: &mut [TextRun]) {
        texts.sort_by(|a, b| {
            match a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal) {
                Ordering::Equal => b.y.partial_cmp(&a.y).unwrap_or(Ordering::Equal),
                other => other,
            }
        });
    }
}
