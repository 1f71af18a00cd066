use clap::{ArgAction, Parser, Subcommand};
use simple_caption::config::{self, CaptionConfig};
use simple_caption::imaging::{
    CaptionError, Dimensions, FontBackend, estimate_color_palette, generate_captioned,
    load_image, plan_caption, save_image,
};
use simple_caption::types::{Color, ImageMode, PanelMode, PostFilter, TextAlign};
use simple_caption::{output, process};
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "simple-caption")]
#[command(about = "Captioned image generator")]
#[command(long_about = "\
Captioned image generator

Draws a word-wrapped caption over a photo, on an optional background panel,
with an optional color filter and post filters. Options come from a TOML
config file and can be overridden per command.

Layer order (bottom to top):

  photo          scaled to cover the canvas, center-cropped
  filter color   composited over the whole canvas
  post filters   applied to the whole canvas, in order
  panel          full-width band behind the text
  text           wrapped to fit between the left and right margins

Panel modes:
  stripe             band around the text, sized by panel.padding
  attach_to_bottom   band from the text to the bottom edge
  attach_to_top      band from the top edge to the text
  none               no panel

Run 'simple-caption gen-config' to generate a documented config file.")]
#[command(version)]
struct Cli {
    /// Config file (TOML); relative font paths resolve against its directory
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG overrides
    #[arg(long, short, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

/// Per-render overrides on top of the config file.
#[derive(clap::Args)]
struct RenderArgs {
    /// Caption text
    #[arg(long, short)]
    text: String,

    /// Background photo
    #[arg(long, short)]
    image: PathBuf,

    /// Output file; format from the extension (png, jpg, webp, tiff)
    #[arg(long, short, required_unless_present = "dry_run")]
    output: Option<PathBuf>,

    /// Font file (TrueType/OpenType)
    #[arg(long)]
    font: Option<PathBuf>,

    /// Canvas size as WxH; defaults to the photo's size
    #[arg(long, value_parser = parse_size)]
    size: Option<[u32; 2]>,

    /// overlay | not_overlay
    #[arg(long)]
    image_mode: Option<ImageMode>,

    /// none | attach_to_bottom | attach_to_top | stripe
    #[arg(long)]
    panel_mode: Option<PanelMode>,

    /// left | right | center
    #[arg(long)]
    align: Option<TextAlign>,

    /// Text color (#RGB, #RRGGBB or #RRGGBBAA)
    #[arg(long)]
    text_color: Option<Color>,

    /// Panel color
    #[arg(long)]
    panel_color: Option<Color>,

    /// Color composited over the whole photo
    #[arg(long)]
    filter_color: Option<Color>,

    /// Post filter, repeatable (e.g. smooth, gaussian_blur:2, unsharp_mask:0.5,0)
    #[arg(long = "filter")]
    filters: Vec<PostFilter>,

    /// Font size as a fraction of the canvas width
    #[arg(long)]
    character_ratio: Option<f64>,

    /// Bottom margin as a fraction of the canvas height
    #[arg(long, conflicts_with = "top_margin")]
    bottom_margin: Option<f64>,

    /// Top margin as a fraction of the canvas height
    #[arg(long)]
    top_margin: Option<f64>,

    /// Pick text and panel colors from the photo's brightness
    #[arg(long)]
    auto_palette: bool,

    /// Print the computed layout without writing an image
    #[arg(long)]
    dry_run: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Render one captioned image
    Render(Box<RenderArgs>),
    /// Render every job of a jobs file in parallel
    Batch {
        /// Jobs file (TOML)
        jobs: PathBuf,

        /// Where to write the JSON report [default: next to the jobs file]
        #[arg(long)]
        report: Option<PathBuf>,

        /// Worker threads (0 = one per core)
        #[arg(long, default_value_t = 0)]
        threads: usize,
    },
    /// Print the text/background colors the palette picks for an image
    Palette {
        /// Image to analyze
        image: PathBuf,
    },
    /// Print a stock config file with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Render(args) => {
            let mut config = load_base_config(cli.config.as_deref())?;
            apply_overrides(&mut config, &args);
            config.validate()?;

            if args.dry_run {
                let font = config
                    .text
                    .font_path
                    .as_deref()
                    .ok_or(CaptionError::MissingFont)?;
                let backend = FontBackend::open(font)?;
                let photo = load_image(&args.image)?;
                let dims = Dimensions {
                    width: photo.width(),
                    height: photo.height(),
                };
                let plan = plan_caption(&backend, &args.text, dims, &config, None)?;
                output::print_plan(&plan, config.panel.mode);
            } else {
                let output_path = args.output.as_deref().ok_or("--output is required")?;
                let canvas = generate_captioned(&args.text, &args.image, &config)?;
                if let Some(parent) = output_path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                save_image(&canvas, output_path)?;
                println!(
                    "{}",
                    output::format_rendered(output_path, canvas.width(), canvas.height())
                );
            }
        }
        Command::Batch {
            jobs,
            report,
            threads,
        } => {
            let base = config::config_to_value(&load_base_config(cli.config.as_deref())?)?;
            init_thread_pool(threads);

            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_batch_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let result = process::run_batch(&jobs, base, Some(tx))?;
            printer.join().map_err(|_| "progress printer panicked")?;

            let report_path = report.unwrap_or_else(|| {
                jobs.parent()
                    .unwrap_or(Path::new("."))
                    .join("batch-report.json")
            });
            process::write_report(&result, &report_path)?;
            output::print_batch_summary(&result);

            if !result.failed.is_empty() {
                std::process::exit(1);
            }
        }
        Command::Palette { image } => {
            let config = load_base_config(cli.config.as_deref())?;
            let entry = estimate_color_palette(&image, Some(config.palette.entries.as_slice()))?;
            output::print_palette(&entry);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Logs go to stderr so stdout stays clean for command output.
fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "simple_caption=debug",
        _ => "simple_caption=trace",
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

/// Initialize the rayon thread pool for batch rendering.
///
/// Capped at the number of available cores.
fn init_thread_pool(requested: usize) {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    let threads = if requested == 0 {
        cores
    } else {
        requested.min(cores)
    };
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

fn load_base_config(path: Option<&Path>) -> Result<CaptionConfig, config::ConfigError> {
    match path {
        Some(path) => config::load_config(path),
        None => Ok(CaptionConfig::default()),
    }
}

/// Apply command-line overrides. A margin flag replaces the configured
/// vertical margin, whichever side it was on.
fn apply_overrides(config: &mut CaptionConfig, args: &RenderArgs) {
    if let Some(font) = &args.font {
        config.text.font_path = Some(font.clone());
    }
    if let Some(size) = args.size {
        config.canvas.size = Some(size);
    }
    if let Some(mode) = args.image_mode {
        config.canvas.image_mode = mode;
    }
    if let Some(mode) = args.panel_mode {
        config.panel.mode = mode;
    }
    if let Some(align) = args.align {
        config.text.align = align;
    }
    if let Some(color) = args.text_color {
        config.text.color = color;
    }
    if let Some(color) = args.panel_color {
        config.panel.color = color;
    }
    if let Some(color) = args.filter_color {
        config.canvas.filter_color = color;
    }
    if !args.filters.is_empty() {
        config.canvas.post_filters = args.filters.clone();
    }
    if let Some(ratio) = args.character_ratio {
        config.text.character_ratio = Some(ratio);
    }
    if let Some(bottom) = args.bottom_margin {
        config.margins.bottom = Some(bottom);
        config.margins.top = None;
    }
    if let Some(top) = args.top_margin {
        config.margins.top = Some(top);
        config.margins.bottom = None;
    }
    if args.auto_palette {
        config.palette.auto = true;
    }
}

/// Parse `WxH` (e.g. `1080x1350`).
fn parse_size(s: &str) -> Result<[u32; 2], String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WxH, got '{s}'"))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<u32>()
            .map_err(|_| format!("invalid dimension '{v}' in '{s}'"))
    };
    Ok([parse(w)?, parse(h)?])
}
