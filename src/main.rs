//! Prints the evaluated layer transforms of a Lottie document, frame by frame.

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{bail, Context as _, Result};
use clap::{Parser, ValueEnum};
use glam::{Mat4, Vec3};
use lottie_core::{NodeId, TransformTree};
use lottie_data::model::LottieJson;
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "lottie-transform", version)]
#[command(about = "Evaluate Lottie layer transforms frame by frame")]
struct Cli {
    /// Input Lottie JSON document.
    input: PathBuf,

    /// First frame to evaluate. Defaults to the document's in point.
    #[arg(long)]
    start: Option<f32>,

    /// Last frame to evaluate (inclusive). Without it, evaluation stops just
    /// before the document's out point.
    #[arg(long)]
    end: Option<f32>,

    /// Frame increment.
    #[arg(long, default_value_t = 1.0)]
    step: f32,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Print the 2D affine projection instead of the full 4x4 matrix.
    #[arg(long)]
    affine: bool,

    /// Rebuild every node on every frame, even when nothing changed.
    #[arg(long)]
    force: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    /// One JSON object per frame.
    Json,
}

#[derive(Serialize)]
struct FrameRecord<'a> {
    frame: f32,
    rebuilt: usize,
    layers: Vec<LayerRecord<'a>>,
}

#[derive(Serialize)]
struct LayerRecord<'a> {
    node: NodeId,
    name: &'a str,
    opacity: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    matrix: Option<[f32; 16]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    affine: Option<[f64; 6]>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    run(Cli::parse())
}

fn run(cli: Cli) -> Result<()> {
    let source = fs::read_to_string(&cli.input)
        .with_context(|| format!("failed to read {}", cli.input.display()))?;
    let doc: LottieJson = serde_json::from_str(&source)
        .with_context(|| format!("failed to parse {}", cli.input.display()))?;

    let frames = frame_range(cli.start, cli.end, cli.step, doc.ip, doc.op)?;

    let (mut tree, nodes) = TransformTree::from_layers(&doc.layers)
        .context("failed to build the layer hierarchy")?;
    let names: Vec<&str> = doc
        .layers
        .iter()
        .map(|layer| layer.nm.as_deref().unwrap_or(""))
        .collect();

    info!(
        layers = tree.len(),
        frames = frames.len(),
        fps = doc.fr,
        "evaluating {}",
        doc.nm.as_deref().unwrap_or("composition")
    );

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    for frame in frames {
        let report = tree.update_tree(frame, cli.force);
        debug!(frame, rebuilt = report.rebuilt.len(), "frame evaluated");

        let mut layers = Vec::with_capacity(nodes.len());
        for (&id, &name) in nodes.iter().zip(&names) {
            let node = tree.transform_node(id)?;
            let global = node.global_transform();
            layers.push(LayerRecord {
                node: id,
                name,
                opacity: node.opacity(),
                matrix: (!cli.affine).then(|| global.to_cols_array()),
                affine: cli.affine.then(|| node.global_affine().as_coeffs()),
            });
        }
        let record = FrameRecord {
            frame,
            rebuilt: report.rebuilt.len(),
            layers,
        };

        match cli.format {
            OutputFormat::Json => {
                serde_json::to_writer(&mut out, &record)?;
                writeln!(out)?;
            }
            OutputFormat::Text => write_text(&mut out, &record)?,
        }
    }

    out.flush()?;
    Ok(())
}

/// Frames to evaluate. An explicit `--end` is inclusive; the document's out
/// point is not, since `op` is the first frame past the composition.
fn frame_range(
    start: Option<f32>,
    end: Option<f32>,
    step: f32,
    in_point: f32,
    out_point: f32,
) -> Result<Vec<f32>> {
    if !step.is_finite() || step <= 0.0 {
        bail!("--step must be a positive number, got {step}");
    }
    let first = start.unwrap_or(in_point);
    if !first.is_finite() {
        bail!("start frame must be finite, got {first}");
    }
    let (last, inclusive) = match end {
        Some(end) => (end, true),
        None => (out_point, false),
    };
    if !last.is_finite() {
        bail!("end frame must be finite, got {last}");
    }

    let mut frames = Vec::new();
    for index in 0u32.. {
        let frame = first + index as f32 * step;
        if frame > last || (!inclusive && frame >= last) {
            break;
        }
        // Steps too small to move the frame would never reach the end.
        if frames.last() == Some(&frame) {
            bail!("--step {step} is too small to advance from frame {frame}");
        }
        frames.push(frame);
    }
    Ok(frames)
}

fn write_text(out: &mut impl Write, record: &FrameRecord<'_>) -> io::Result<()> {
    writeln!(out, "frame {} ({} rebuilt)", record.frame, record.rebuilt)?;
    for layer in &record.layers {
        write!(out, "  {} {:?} opacity={:.3}", layer.node, layer.name, layer.opacity)?;
        if let Some(affine) = layer.affine {
            writeln!(out, " affine={affine:?}")?;
        } else if let Some(matrix) = layer.matrix {
            let m = Mat4::from_cols_array(&matrix);
            let origin = m.transform_point3(Vec3::ZERO);
            writeln!(out, " origin=({:.3}, {:.3}, {:.3})", origin.x, origin.y, origin.z)?;
            for row in 0..4 {
                let r = m.row(row);
                writeln!(out, "    [{:>10.4} {:>10.4} {:>10.4} {:>10.4}]", r.x, r.y, r.z, r.w)?;
            }
        } else {
            writeln!(out)?;
        }
    }
    Ok(())
}
