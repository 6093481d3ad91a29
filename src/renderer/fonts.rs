//! Font lookup and text metrics
//!
//! Faces are found through a `fontdb` database seeded with the bundled Hack
//! face; other family names trigger a one-time scan of the system fonts.
//! Glyphs are measured and rasterized with `swash`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use fontdb::{Database, Family, Query, Stretch, Style, Weight};
use swash::scale::{Render, ScaleContext, Source};
use swash::zeno::Format;
use swash::FontRef;
use tracing::{debug, warn};

/// Family of the bundled face, used when a requested family is missing
pub const DEFAULT_FONT: &str = "Hack";

/// Vertical metrics of a face at one pixel size, rounded out to whole pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct LineMetrics {
    pub ascent: f64,
    pub descent: f64,
    /// Baseline to baseline distance
    pub pitch: f64,
}

/// Coverage mask of one glyph, placed relative to the pen on the baseline
#[derive(Debug, Clone, Default)]
pub(crate) struct Glyph {
    pub left: i32,
    /// Distance from the baseline up to the top row
    pub top: i32,
    pub width: u32,
    pub height: u32,
    pub coverage: Vec<u8>,
    pub advance: f64,
}

/// A loaded face
#[derive(Debug, Clone)]
pub(crate) struct Face {
    data: Arc<Vec<u8>>,
    index: usize,
}

impl Face {
    fn new(data: Vec<u8>, index: usize) -> Option<Self> {
        FontRef::from_index(&data, index)?;
        Some(Self {
            data: Arc::new(data),
            index,
        })
    }

    fn font(&self) -> Option<FontRef<'_>> {
        FontRef::from_index(&self.data, self.index)
    }

    pub fn line_metrics(&self, px: f64) -> LineMetrics {
        let Some(font) = self.font() else {
            return LineMetrics {
                ascent: px.ceil(),
                descent: 0.0,
                pitch: (px * 1.2).ceil(),
            };
        };
        let m = font.metrics(&[]).scale(px as f32);
        let ascent = m.ascent.ceil() as f64;
        let descent = m.descent.abs().ceil() as f64;
        let pitch = ((m.ascent + m.descent.abs() + m.leading).ceil() as f64).max(ascent + descent);
        LineMetrics {
            ascent,
            descent,
            pitch,
        }
    }

    pub fn advance(&self, c: char, px: f64) -> f64 {
        match self.font() {
            Some(font) => {
                let id = font.charmap().map(c);
                font.glyph_metrics(&[]).scale(px as f32).advance_width(id) as f64
            }
            None => 0.0,
        }
    }

    /// Width of one line of text, rounded up to whole pixels
    pub fn line_width(&self, line: &str, px: f64) -> f64 {
        line.chars().map(|c| self.advance(c, px)).sum::<f64>().ceil()
    }

    /// Rasterized glyphs of one line, in order
    pub fn glyphs(&self, line: &str, px: f64) -> Vec<Glyph> {
        let Some(font) = self.font() else {
            return Vec::new();
        };
        let mut context = ScaleContext::new();
        let mut scaler = context.builder(font).size(px as f32).build();
        let metrics = font.glyph_metrics(&[]).scale(px as f32);
        let mut render = Render::new(&[Source::Outline]);
        render.format(Format::Alpha);

        line.chars()
            .map(|c| {
                let id = font.charmap().map(c);
                let advance = metrics.advance_width(id) as f64;
                match render.render(&mut scaler, id) {
                    Some(image) => Glyph {
                        left: image.placement.left,
                        top: image.placement.top,
                        width: image.placement.width,
                        height: image.placement.height,
                        coverage: image.data,
                        advance,
                    },
                    // blank glyphs such as spaces only move the pen
                    None => Glyph {
                        advance,
                        ..Glyph::default()
                    },
                }
            })
            .collect()
    }

    /// Size of a possibly multi-line string
    pub fn measure(&self, text: &str, px: f64) -> (f64, f64) {
        let metrics = self.line_metrics(px);
        let lines: Vec<&str> = text.split('\n').collect();
        let width = lines
            .iter()
            .map(|line| self.line_width(line, px))
            .fold(0.0, f64::max);
        let height =
            (lines.len() - 1) as f64 * metrics.pitch + metrics.ascent + metrics.descent;
        (width, height)
    }
}

struct FontBook {
    db: Database,
    system_loaded: bool,
    faces: HashMap<String, Face>,
}

impl FontBook {
    fn new() -> Self {
        let mut db = Database::new();
        db.load_font_data(epaint_default_fonts::HACK_REGULAR.to_vec());
        Self {
            db,
            system_loaded: false,
            faces: HashMap::new(),
        }
    }

    fn find(&mut self, family: &str) -> Option<fontdb::ID> {
        let families = [Family::Name(family)];
        let query = Query {
            families: &families,
            weight: Weight::NORMAL,
            stretch: Stretch::Normal,
            style: Style::Normal,
        };
        if let Some(id) = self.db.query(&query) {
            return Some(id);
        }
        if !self.system_loaded {
            debug!(family, "loading system fonts");
            self.db.load_system_fonts();
            self.system_loaded = true;
            return self.db.query(&query);
        }
        None
    }

    fn load(&self, id: fontdb::ID) -> Option<Face> {
        let face = self
            .db
            .with_face_data(id, |data, index| Face::new(data.to_vec(), index as usize))?;
        if face.is_none() {
            warn!(?id, "unreadable font face");
        }
        face
    }

    fn face(&mut self, family: &str) -> Option<Face> {
        if let Some(face) = self.faces.get(family) {
            return Some(face.clone());
        }
        let face = self.find(family).and_then(|id| self.load(id))?;
        self.faces.insert(family.to_string(), face.clone());
        Some(face)
    }
}

fn book() -> &'static Mutex<FontBook> {
    static BOOK: OnceLock<Mutex<FontBook>> = OnceLock::new();
    BOOK.get_or_init(|| Mutex::new(FontBook::new()))
}

/// Face for `family`, falling back to the bundled face
///
/// Returns `None` only if the bundled face itself cannot be read.
pub(crate) fn face(family: &str) -> Option<Face> {
    let mut book = book().lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(face) = book.face(family) {
        return Some(face);
    }
    warn!(family, fallback = DEFAULT_FONT, "font family not found");
    let fallback = book.face(DEFAULT_FONT)?;
    book.faces.insert(family.to_string(), fallback.clone());
    Some(fallback)
}
