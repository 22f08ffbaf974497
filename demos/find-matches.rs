use anyhow::{Context, Result};
use clap::Parser;
use patch_match::{convert, Color, Opacity, Pipeline, RecolorConfig, Rect};

/// Search an image for copies of one of its own patches.
#[derive(Debug, Parser)]
struct Args {
    /// Image to search.
    source: String,
    /// Patch to search for, as `x,y,width,height` in image pixels.
    #[arg(long, value_parser = parse_rect)]
    patch: Rect,
    #[arg(long, default_value_t = 0.08)]
    threshold: f32,
    #[arg(long, default_value_t = 0.7)]
    iou_threshold: f64,
    /// Report raw candidates instead of merged matches.
    #[arg(long)]
    no_merge: bool,
    #[arg(long, default_value = "#ff0000")]
    color: Color,
    /// Blend opacity in percent.
    #[arg(long, default_value_t = 50)]
    opacity: u32,
    /// Where to write the recolored image.
    #[arg(long)]
    output: Option<String>,
    /// Where to write the dissimilarity heatmap.
    #[arg(long)]
    heatmap: Option<String>,
}

fn parse_rect(s: &str) -> Result<Rect> {
    let parts = s
        .split(',')
        .map(|p| p.trim().parse::<u32>())
        .collect::<Result<Vec<_>, _>>()
        .context("patch must be four integers")?;
    match parts.as_slice() {
        &[x, y, width, height] => Ok(Rect::new(x, y, width, height)),
        _ => anyhow::bail!("patch must be x,y,width,height"),
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let source = image::open(&args.source)
        .with_context(|| format!("failed to open {}", args.source))?
        .to_rgba8();
    let template = convert::crop_template(&source, args.patch)?;

    let mut builder = Pipeline::builder()
        .threshold(args.threshold)
        .iou_threshold(args.iou_threshold)
        .recolor(RecolorConfig {
            color: args.color,
            opacity: Opacity::from_percent(args.opacity)?,
        });
    if args.no_merge {
        builder = builder.no_merge();
    }
    let pipeline = builder.build()?;

    let (detection, output) = pipeline.run(&source, &template)?;
    println!(
        "matches: {} (candidates: {})",
        detection.matches.len(),
        detection.candidates.len()
    );
    for m in &detection.matches {
        println!(
            "pos=({}, {}) size=({}x{})",
            m.x, m.y, detection.size.width, detection.size.height
        );
    }

    if let (Some(path), Some(output)) = (&args.output, output) {
        output.save(path)?;
    }
    if let Some(path) = &args.heatmap {
        let surface = pipeline.surface(&source, &template)?;
        convert::surface_to_luma(&surface).save(path)?;
    }

    Ok(())
}
