//! Integration tests for register layout diagrams

use diagram_animator::bitfield::{self, Bits, Endianness, Field, Mode};
use diagram_animator::{
    render_to_file, BitfieldOptions, Canvas, RasterRenderer, Register, RenderContext,
};
use pretty_assertions::assert_eq;

fn measure() -> RasterRenderer {
    RasterRenderer::new(RenderContext::new(100, 100))
}

fn register() -> Register {
    Register::new(
        None,
        vec![Field::new("low", Bits::Exact(2)), Field::new("high", Bits::Exact(4))],
    )
}

#[test]
fn test_cells_follow_field_widths() {
    let mut canvas = Canvas::default();
    let options = BitfieldOptions::default();
    let column = bitfield::build(&register(), &options, &mut canvas, &measure()).unwrap();
    canvas.prepare(&measure()).unwrap();

    let parts = canvas.children(column).unwrap();
    assert_eq!(parts.len(), 3);
    let (header, table) = (parts[0], parts[1]);
    let cells = canvas.children(table).unwrap();
    let widths: Vec<f64> = cells.iter().map(|c| canvas.bounds(*c).unwrap().width).collect();
    assert_eq!(widths, vec![200.0, 400.0]);
    assert_eq!(canvas.text(cells[0]).unwrap(), "low");

    let first = canvas.bounds(cells[0]).unwrap();
    let second = canvas.bounds(cells[1]).unwrap();
    assert_eq!(second.x, first.x + 200.0);
    assert_eq!(second.height, first.height);

    let halves = canvas.children(header).unwrap();
    assert_eq!(canvas.text(halves[0]).unwrap(), "LSB");
    assert_eq!(canvas.text(halves[1]).unwrap(), "MSB");
    assert_eq!(canvas.bounds(halves[0]).unwrap().width, 300.0);
}

#[test]
fn test_big_endian_reverses_fields_and_header() {
    let mut canvas = Canvas::default();
    let options = BitfieldOptions::default().with_endianness(Endianness::Big);
    let column = bitfield::build(&register(), &options, &mut canvas, &measure()).unwrap();
    canvas.prepare(&measure()).unwrap();

    let parts = canvas.children(column).unwrap();
    let cells = canvas.children(parts[1]).unwrap();
    assert_eq!(canvas.text(cells[0]).unwrap(), "high");
    let halves = canvas.children(parts[0]).unwrap();
    assert_eq!(canvas.text(halves[0]).unwrap(), "MSB");
}

#[test]
fn test_width_labels_fill_each_cell() {
    let mut canvas = Canvas::default();
    let options = BitfieldOptions::default();
    let column = bitfield::build(&register(), &options, &mut canvas, &measure()).unwrap();
    canvas.prepare(&measure()).unwrap();

    let parts = canvas.children(column).unwrap();
    let labels = canvas.children(parts[2]).unwrap();
    // separator, spacer, arrow, label, arrow, spacer per field, then a closing separator
    assert_eq!(labels.len(), 13);
    assert_eq!(canvas.text(labels[3]).unwrap(), "2 bits");
    assert_eq!(canvas.text(labels[9]).unwrap(), "4 bits");
    let row = canvas.bounds(parts[2]).unwrap();
    let table = canvas.bounds(parts[1]).unwrap();
    assert_eq!(row.width, table.width);
}

#[test]
fn test_position_mode_labels_bit_offsets() {
    let mut canvas = Canvas::default();
    let options = BitfieldOptions::default().with_mode(Mode::Position);
    let column = bitfield::build(&register(), &options, &mut canvas, &measure()).unwrap();
    canvas.prepare(&measure()).unwrap();

    let parts = canvas.children(column).unwrap();
    let cells = canvas.children(parts[1]).unwrap();
    assert_eq!(canvas.text(cells[1]).unwrap(), "high\n(4)");
    let labels = canvas.children(parts[2]).unwrap();
    assert_eq!(labels.len(), 3);
    assert_eq!(canvas.text(labels[0]).unwrap(), "0");
    assert_eq!(canvas.text(labels[1]).unwrap(), "2");
}

#[test]
fn test_title_goes_above_the_table() {
    let mut canvas = Canvas::default();
    let register = Register::new(Some("Header".to_string()), register().fields);
    let options = BitfieldOptions::default();
    let column = bitfield::build(&register, &options, &mut canvas, &measure()).unwrap();
    canvas.prepare(&measure()).unwrap();

    let parts = canvas.children(column).unwrap();
    assert_eq!(parts.len(), 4);
    assert_eq!(canvas.text(parts[0]).unwrap(), "Header");
    assert!(canvas.bounds(parts[0]).unwrap().bottom() <= canvas.bounds(parts[1]).unwrap().y);
}

#[test]
fn test_render_register_from_toml() {
    let dir = tempfile::tempdir().unwrap();
    let fields = dir.path().join("fields.toml");
    let toml = r#"title = "Access"

[[field]]
name = "A"
bits = 4

[[field]]
name = "B"
bits = [8, 12]
display_bits = 4
"#;
    std::fs::write(&fields, toml).unwrap();
    let register = Register::from_file(&fields).unwrap();
    let options = BitfieldOptions::default().with_relative(true).with_bit_width(40.0);

    let mut canvas = Canvas::default();
    bitfield::build(&register, &options, &mut canvas, &measure()).unwrap();
    let output = dir.path().join("register.png");
    render_to_file(&mut canvas, &RenderContext::new(100, 100), &output).unwrap();

    let image = image::open(&output).unwrap();
    // two one-bit cells of 40 pixels inside the canvas padding
    assert!(image.width() >= 80);
    assert!(image.height() > 0);
}
