//! Diagram Animator CLI
//!
//! Usage:
//!   diagram-animator bitfield <FIELDS> [-o FILE] [OPTIONS]
//!   diagram-animator fade <TEXT> [-o FILE] [--fps N] [--duration SECONDS]
//!
//! Logging is controlled by `DIAGRAM_ANIMATOR_LOG` (for example
//! `DIAGRAM_ANIMATOR_LOG=diagram_animator=debug`), warnings only by default.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use diagram_animator::bitfield::{self, Endianness, Mode};
use diagram_animator::{
    render_to_file, Animation, BitfieldOptions, Canvas, Error, Object, RasterRenderer, Register,
    RenderContext, Scene, SceneConfig, Theme,
};

#[derive(Parser)]
#[command(name = "diagram-animator")]
#[command(about = "Constraint-laid-out diagrams and animations")]
struct Cli {
    /// Theme file with default style values (TOML format)
    #[arg(short, long, global = true)]
    theme: Option<PathBuf>,

    /// Render target width in pixels
    #[arg(long, global = true, default_value_t = 1080)]
    width: u32,

    /// Render target height in pixels
    #[arg(long, global = true, default_value_t = 720)]
    height: u32,

    /// Physical pixels per logical pixel
    #[arg(short, long, global = true, default_value_t = 1)]
    scale: u32,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Draw a register layout from a TOML field list
    Bitfield {
        /// Field file with `title` and `[[field]]` entries
        fields: PathBuf,

        /// Output image (.png or .gif)
        #[arg(short, long, default_value = "output.png")]
        output: PathBuf,

        /// What the label row shows
        #[arg(short, long, value_enum, default_value_t = Mode::Width)]
        mode: Mode,

        /// Which end of the register is on the left
        #[arg(short, long, value_enum, default_value_t = Endianness::Little)]
        endianness: Endianness,

        /// Pixels per displayed bit
        #[arg(long, default_value_t = 100.0)]
        bit_width: f64,

        /// Keep relative field sizes but make bits as narrow as possible
        #[arg(short, long)]
        relative: bool,
    },

    /// Fade a text box in
    Fade {
        text: String,

        /// Output animation (.gif, .png or .apng)
        #[arg(short, long, default_value = "fade.gif")]
        output: PathBuf,

        #[arg(long, default_value_t = 10.0)]
        fps: f64,

        /// Seconds
        #[arg(long, default_value_t = 1.0)]
        duration: f64,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("DIAGRAM_ANIMATOR_LOG")
                .unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let theme = match &cli.theme {
        Some(path) => match Theme::from_file(path) {
            Ok(theme) => theme,
            Err(e) => {
                eprintln!("Error loading theme '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => Theme::default(),
    };
    let context = RenderContext::new(cli.width, cli.height).with_scale(cli.scale);

    let result = match cli.command {
        Command::Bitfield {
            fields,
            output,
            mode,
            endianness,
            bit_width,
            relative,
        } => {
            let options = BitfieldOptions::default()
                .with_mode(mode)
                .with_endianness(endianness)
                .with_bit_width(bit_width)
                .with_relative(relative);
            draw_bitfield(&fields, &output, &options, theme, &context)
        }
        Command::Fade {
            text,
            output,
            fps,
            duration,
        } => fade(&text, &output, fps, duration, theme, context),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn draw_bitfield(
    fields: &Path,
    output: &Path,
    options: &BitfieldOptions,
    theme: Theme,
    context: &RenderContext,
) -> Result<(), Error> {
    let register = Register::from_file(fields)?;
    let mut canvas = Canvas::new(theme);
    let measure = RasterRenderer::new(context.clone());
    bitfield::build(&register, options, &mut canvas, &measure)?;
    if let Err(e) = render_to_file(&mut canvas, context, output) {
        if let Error::Layout(layout) = &e {
            eprintln!("{}", canvas.diagnose(layout));
        }
        return Err(e);
    }
    println!("wrote {}", output.display());
    Ok(())
}

fn fade(
    text: &str,
    output: &Path,
    fps: f64,
    duration: f64,
    theme: Theme,
    context: RenderContext,
) -> Result<(), Error> {
    let mut scene = Scene::new(SceneConfig::new(context).with_theme(theme));
    let canvas = scene.canvas_mut();
    let root = canvas.root();
    let label = canvas.add(root, Object::text_box(text), (0.0, 0.0))?;
    scene.add(Animation::fade_in(label, 0, 255)?.with_duration(duration));
    let frames = scene.play(fps, output)?;
    println!("wrote {} frames to {}", frames, output.display());
    Ok(())
}
