//! Register layout diagrams
//!
//! A [`Register`] is a title and a list of [`Field`]s, usually loaded from
//! TOML:
//!
//! ```toml
//! title = "Bluetooth Device Address"
//!
//! [[field]]
//! name = "NAP"
//! bits = 16
//!
//! [[field]]
//! name = "Payload"
//! bits = { min = 0, max = 2790 }
//! display_bits = 6
//! ```
//!
//! [`build`] lays it out as a table of cells whose widths follow the field
//! sizes, with an LSB/MSB header and a row of size or position labels.

use std::fmt;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::layout::{Canvas, Handle, LayoutError, Object};
use crate::renderer::{Paint, Renderer};
use crate::style::{Align, Anchor, Style};

#[derive(Debug, Error)]
pub enum BitfieldError {
    #[error("a register needs at least one field")]
    EmptyFields,

    #[error("field '{field}' would be drawn zero bits wide")]
    ZeroWidth { field: String },

    #[error("field '{field}' has invalid bits: {reason}")]
    InvalidBits { field: String, reason: String },

    #[error("invalid field file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to read field file: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Layout(#[from] LayoutError),
}

/// How many bits a field holds
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Bits {
    Exact(u32),
    /// Any size from `min` to `max`
    Range { min: u32, max: u32 },
    /// One of a fixed set of sizes
    Choice(Vec<u32>),
}

impl Bits {
    pub fn max(&self) -> u32 {
        match self {
            Bits::Exact(n) => *n,
            Bits::Range { max, .. } => *max,
            Bits::Choice(sizes) => sizes.iter().copied().max().unwrap_or(0),
        }
    }

    /// Human-readable size, e.g. `"1 bit"`, `"0 - 2790 bits"`, `"68 or 72 bits"`
    pub fn label(&self, unit: Unit) -> String {
        match self {
            Bits::Exact(1) => format!("1 {unit}"),
            Bits::Exact(n) => format!("{n} {unit}s"),
            Bits::Range { min, max } => format!("{min} - {max} {unit}s"),
            Bits::Choice(sizes) => {
                let mut names: Vec<String> = sizes.iter().map(u32::to_string).collect();
                let last = names.pop().unwrap_or_default();
                if names.is_empty() {
                    format!("{last} {unit}s")
                } else {
                    format!("{} or {last} {unit}s", names.join(", "))
                }
            }
        }
    }

    fn check(&self) -> Result<(), String> {
        match self {
            Bits::Range { min, max } if min > max => {
                Err(format!("range {min} - {max} is reversed"))
            }
            Bits::Choice(sizes) if sizes.len() < 2 => {
                Err("a choice needs at least two sizes".into())
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    #[default]
    Bit,
    Byte,
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Unit::Bit => "bit",
            Unit::Byte => "byte",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Field {
    pub name: String,
    pub bits: Bits,
    /// Width of the cell in bits; the largest size when unset
    pub display_bits: Option<u32>,
    #[serde(default)]
    pub unit: Unit,
}

impl Field {
    pub fn new(name: impl Into<String>, bits: Bits) -> Self {
        Self {
            name: name.into(),
            bits,
            display_bits: None,
            unit: Unit::Bit,
        }
    }

    pub fn with_display_bits(mut self, display_bits: u32) -> Self {
        self.display_bits = Some(display_bits);
        self
    }

    pub fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = unit;
        self
    }

    pub fn display_width(&self) -> u32 {
        self.display_bits.unwrap_or_else(|| self.bits.max())
    }
}

/// What the label row shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Mode {
    /// Field size between arrows
    #[default]
    Width,
    /// Starting bit of each field
    Position,
}

/// Which end of the register is drawn on the left
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Endianness {
    Big,
    /// Least significant field first
    #[default]
    Little,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BitfieldOptions {
    pub mode: Mode,
    pub endianness: Endianness,
    /// Pixels per displayed bit
    pub bit_width: f64,
    /// Divide every display width by their greatest common divisor
    pub relative: bool,
}

impl Default for BitfieldOptions {
    fn default() -> Self {
        Self {
            mode: Mode::Width,
            endianness: Endianness::Little,
            bit_width: 100.0,
            relative: false,
        }
    }
}

impl BitfieldOptions {
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_endianness(mut self, endianness: Endianness) -> Self {
        self.endianness = endianness;
        self
    }

    pub fn with_bit_width(mut self, bit_width: f64) -> Self {
        self.bit_width = bit_width;
        self
    }

    pub fn with_relative(mut self, relative: bool) -> Self {
        self.relative = relative;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Register {
    pub title: Option<String>,
    #[serde(rename = "field", default)]
    pub fields: Vec<Field>,
}

impl Register {
    pub fn new(title: Option<String>, fields: Vec<Field>) -> Self {
        Self { title, fields }
    }

    pub fn from_file(path: &Path) -> Result<Self, BitfieldError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, BitfieldError> {
        let register: Register = toml::from_str(content)?;
        register.validate()?;
        Ok(register)
    }

    pub fn validate(&self) -> Result<(), BitfieldError> {
        if self.fields.is_empty() {
            return Err(BitfieldError::EmptyFields);
        }
        for field in &self.fields {
            field.bits.check().map_err(|reason| BitfieldError::InvalidBits {
                field: field.name.clone(),
                reason,
            })?;
            if field.display_width() == 0 {
                return Err(BitfieldError::ZeroWidth {
                    field: field.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Fields in drawing order with the display widths to use
    fn layout_fields(&self, options: &BitfieldOptions) -> Vec<(&Field, u32)> {
        let divisor = if options.relative {
            let divisor = self.fields.iter().map(Field::display_width).fold(0, gcd).max(1);
            if divisor == 1 {
                warn!("field widths share no common divisor; relative mode changes nothing");
            }
            divisor
        } else {
            1
        };
        let mut out: Vec<_> = self
            .fields
            .iter()
            .map(|f| (f, f.display_width() / divisor))
            .collect();
        if options.endianness == Endianness::Big {
            out.reverse();
        }
        out
    }
}

fn gcd(a: u32, b: u32) -> u32 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

fn cell_text(field: &Field, mode: Mode) -> String {
    match mode {
        Mode::Width => field.name.clone(),
        Mode::Position => format!("{}\n({})", field.name, field.bits.max()),
    }
}

/// Lay `register` out under the root of `canvas`
///
/// `measure` sizes the labels so arrows can fill the rest of each cell.
/// Returns the handle of the outer vertical layout.
pub fn build(
    register: &Register,
    options: &BitfieldOptions,
    canvas: &mut Canvas,
    measure: &dyn Renderer,
) -> Result<Handle, BitfieldError> {
    register.validate()?;
    let defaults = canvas.theme().defaults.clone();
    let padding = defaults.padding;
    let small = (defaults.font_size * 0.6).floor().max(1.0);
    let small_paint = Paint {
        font_size: small,
        ..Paint::from(&defaults)
    };
    let small_style = Style::new().with_font_size(small);
    let fields = register.layout_fields(options);

    let root = canvas.root();
    let column = canvas.add(root, Object::vlayout(), (0.0, 0.0))?;

    if let Some(title) = &register.title {
        let style = Style::new().with_anchor(Anchor::TopLeft);
        canvas.add(column, Object::text(title.clone()).style(style), (0.0, 0.0))?;
    }

    // the header halves are sized from the table, so create it first
    let table = canvas.insert(Object::table());
    let table_width = canvas.geometry(table)?.width;

    let (left, right) = match options.endianness {
        Endianness::Little => ("LSB", "MSB"),
        Endianness::Big => ("MSB", "LSB"),
    };
    let header = canvas.add(column, Object::hlayout(), (0.0, 0.0))?;
    for (text, align) in [(left, Align::Left), (right, Align::Right)] {
        let cell = Object::text_box(text)
            .width(&table_width / 2.0)
            .align(align)
            .style(small_style.clone().with_stroke_width(0.0));
        canvas.add(header, cell, (0.0, 0.0))?;
    }

    // the table gives every cell the height of the tallest label
    for (field, width) in &fields {
        let cell = Object::text_box(cell_text(field, options.mode))
            .width(options.bit_width * *width as f64);
        canvas.add(table, cell, (0.0, 0.0))?;
    }
    canvas.attach(column, table, (0.0, 0.0))?;

    let labels = canvas.add(column, Object::hlayout(), (0.0, padding))?;
    let label_height = measure.text_bbox("0", &small_paint).height() + 2.0 * padding;
    let separator = || Object::dotted_line((0.0, label_height - padding));
    let mut position: u32 = 0;
    for (field, width) in &fields {
        let cell_width = options.bit_width * *width as f64;
        match options.mode {
            Mode::Width => {
                let label = field.bits.label(field.unit);
                let label_width = measure.text_bbox(&label, &small_paint).width() + 2.0 * padding;
                let arrow = ((cell_width - label_width - 2.0 * padding) / 2.0).max(0.0);
                canvas.add(labels, separator(), (0.0, 0.0))?;
                canvas.add(labels, Object::spacer(), (0.0, 0.0))?;
                canvas.add(labels, Object::arrow((arrow, 0.0)).double_sided(true), (0.0, 0.0))?;
                canvas.add(
                    labels,
                    Object::text_box(label).style(small_style.clone()),
                    (0.0, 0.0),
                )?;
                canvas.add(labels, Object::arrow((arrow, 0.0)).double_sided(true), (0.0, 0.0))?;
                canvas.add(labels, Object::spacer(), (0.0, 0.0))?;
            }
            Mode::Position => {
                let cell = Object::text_box(position.to_string())
                    .width(cell_width)
                    .style(small_style.clone());
                canvas.add(labels, cell, (0.0, 0.0))?;
            }
        }
        position += field.bits.max();
    }
    canvas.add(labels, separator(), (0.0, 0.0))?;

    info!(fields = fields.len(), mode = ?options.mode, "bitfield laid out");
    Ok(column)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_size_labels() {
        assert_eq!(Bits::Exact(1).label(Unit::Bit), "1 bit");
        assert_eq!(Bits::Exact(8).label(Unit::Byte), "8 bytes");
        assert_eq!(Bits::Range { min: 0, max: 2790 }.label(Unit::Bit), "0 - 2790 bits");
        assert_eq!(Bits::Choice(vec![68, 72]).label(Unit::Bit), "68 or 72 bits");
        assert_eq!(Bits::Choice(vec![8, 16, 32]).label(Unit::Bit), "8, 16 or 32 bits");
    }

    #[test]
    fn test_display_width_defaults_to_largest_size() {
        assert_eq!(Field::new("a", Bits::Choice(vec![72, 68])).display_width(), 72);
        assert_eq!(Field::new("a", Bits::Exact(8)).with_display_bits(2).display_width(), 2);
    }

    #[test]
    fn test_parse_fields() {
        let register = Register::parse(
            r#"
            title = "Payload Header"

            [[field]]
            name = "LLID"
            bits = 2

            [[field]]
            name = "Body"
            bits = { min = 0, max = 2790 }
            display_bits = 6

            [[field]]
            name = "Access Code"
            bits = [68, 72]
            unit = "bit"
            "#,
        )
        .unwrap();
        assert_eq!(register.title.as_deref(), Some("Payload Header"));
        assert_eq!(register.fields.len(), 3);
        assert_eq!(register.fields[1].bits, Bits::Range { min: 0, max: 2790 });
        assert_eq!(register.fields[2].bits, Bits::Choice(vec![68, 72]));
    }

    #[test]
    fn test_validation_errors() {
        assert!(matches!(
            Register::parse("title = \"empty\""),
            Err(BitfieldError::EmptyFields)
        ));
        assert!(matches!(
            Register::parse("[[field]]\nname = \"x\"\nbits = 0"),
            Err(BitfieldError::ZeroWidth { .. })
        ));
        assert!(matches!(
            Register::parse("[[field]]\nname = \"x\"\nbits = { min = 9, max = 2 }"),
            Err(BitfieldError::InvalidBits { .. })
        ));
        assert!(matches!(
            Register::parse("[[field]]\nname = \"x\"\nbits = [4]"),
            Err(BitfieldError::InvalidBits { .. })
        ));
        assert!(matches!(
            Register::parse("[[field]]\nname = \"x\"\nsize = 4"),
            Err(BitfieldError::Parse(_))
        ));
    }

    #[test]
    fn test_relative_widths_and_order() {
        let register = Register::new(
            None,
            vec![
                Field::new("a", Bits::Exact(16)),
                Field::new("b", Bits::Exact(8)),
                Field::new("c", Bits::Exact(24)),
            ],
        );
        let options = BitfieldOptions::default()
            .with_relative(true)
            .with_endianness(Endianness::Big);
        let widths: Vec<(&str, u32)> = register
            .layout_fields(&options)
            .into_iter()
            .map(|(f, w)| (f.name.as_str(), w))
            .collect();
        assert_eq!(widths, vec![("c", 3), ("b", 1), ("a", 2)]);
    }
}
