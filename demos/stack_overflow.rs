//! A stack buffer overflow, animated
//!
//! Run with `cargo run --example stack_overflow -- -o overflow.gif`.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use diagram_animator::{
    Animation, Color, ColorAttribute, Object, Offset, RenderContext, Scene, SceneConfig, SceneError,
    Style, Theme,
};

#[derive(Parser)]
struct Args {
    /// Frames per second, 1 to 60
    #[arg(short, long, default_value_t = 20)]
    frame_rate: u32,

    #[arg(short, long, default_value = "output.gif")]
    output: PathBuf,

    #[arg(long, default_value_t = 640)]
    width: u32,

    #[arg(long, default_value_t = 480)]
    height: u32,
}

const SLOT_WIDTH: f64 = 250.0;

fn build(scene: &mut Scene) -> Result<(), SceneError> {
    let canvas = scene.canvas_mut();
    let root = canvas.root();
    let stack = canvas.add(root, Object::vlayout(), (0.0, 0.0))?;

    let slots = [
        ("prev stack frame", 120.0, Color::rgb(80, 80, 80)),
        ("RIP", 50.0, Color::GREEN),
        ("RBP", 50.0, Color::CYAN),
        ("canary", 50.0, Color::YELLOW),
        ("char buf[16]", 100.0, Color::MAGENTA),
    ];
    let mut buffer = None;
    for (text, height, fill) in slots {
        let slot = Object::text_box(text)
            .size(SLOT_WIDTH, height)
            .style(Style::new().with_fill_color(fill));
        buffer = Some(canvas.add(stack, slot, (0.0, 0.0))?);
    }
    let Some(buffer) = buffer else {
        return Ok(());
    };

    // the arrow starts right of the buffer and points back at its bottom edge
    let padding = canvas.resolved_style(root)?.padding;
    let g = canvas.geometry(buffer)?;
    let offset = Offset::new(
        &g.x + &g.width + (20.0 - padding),
        &g.y + &g.height - padding,
    );
    let arrow = canvas.add(root, Object::arrow((20.0 - SLOT_WIDTH, 0.0)), offset)?;

    scene.add(Animation::fade_in(root, 0, 255)?.with_duration(2.0));

    scene.keyframe()?;
    scene.add(vec![
        Animation::translate_by(arrow, (0.0, -100.0)),
        Animation::recolor(buffer, ColorAttribute::Fill, Color::MAGENTA, Color::RED),
    ]);
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("DIAGRAM_ANIMATOR_LOG")
                .unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();
    let args = Args::parse();
    if !(1..=60).contains(&args.frame_rate) {
        eprintln!("Error: frame rate must be between 1 and 60, inclusive");
        std::process::exit(1);
    }

    let theme = Theme::new(
        Style::new()
            .with_padding(20.0)
            .resolve(&Theme::default().defaults),
    );
    let config = SceneConfig::new(RenderContext::new(args.width, args.height)).with_theme(theme);
    let mut scene = Scene::new(config);

    let result = build(&mut scene).and_then(|_| scene.play(args.frame_rate as f64, &args.output));
    match result {
        Ok(frames) => println!("wrote {} frames to {}", frames, args.output.display()),
        Err(e) => {
            eprintln!("Error: {}", e);
            if let SceneError::Layout(layout) = &e {
                eprintln!("{}", scene.canvas().diagnose(layout));
            }
            std::process::exit(1);
        }
    }
}
