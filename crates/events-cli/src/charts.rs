//! PNG bar chart rendering for the chart series.

use std::path::{Path, PathBuf};

use color_eyre::eyre::{eyre, Report, Result};
use events_analysis::series::{CategoryCount, ChartData, ChartSpec, PivotTable};
use plotters::coord::cartesian::Cartesian2d;
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::Palette;
use tracing::{debug, info};

const CHART_SIZE: (u32, u32) = (1280, 800);

/// Fraction of each category slot covered by bars.
const BAR_SPAN: f64 = 0.8;

type Chart<'a, DB> = ChartContext<'a, DB, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

fn render_err(path: &Path, err: impl std::fmt::Display) -> Report {
    eyre!("failed to render chart {}: {err}", path.display())
}

/// Renders every chart into `output_dir` and returns the written paths.
///
/// # Errors
/// Returns error if any chart cannot be drawn or saved.
pub fn render_charts(specs: &[ChartSpec], output_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(specs.len());

    for spec in specs {
        let path = output_dir.join(spec.file_name);
        match &spec.data {
            ChartData::Simple(counts) => render_simple(spec, counts, &path)?,
            ChartData::Grouped {
                pivot,
                legend_title,
            } => render_grouped(spec, pivot, legend_title, &path)?,
        }
        debug!(path = %path.display(), "chart rendered");
        written.push(path);
    }

    info!(charts = written.len(), "charts rendered");
    Ok(written)
}

/// Shortens long category names (addresses, hashes) for axis labels.
pub fn short_label(label: &str) -> String {
    let chars: Vec<char> = label.chars().collect();
    if chars.len() <= 14 {
        return label.to_string();
    }
    let head: String = chars[..8].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

fn series_color(index: usize) -> RGBColor {
    let (r, g, b) = Palette99::COLORS[index % Palette99::COLORS.len()];
    RGBColor(r, g, b)
}

/// Builds the chart frame: caption, axes, and one x label per category.
fn draw_frame<'a, DB: DrawingBackend>(
    root: &'a DrawingArea<DB, Shift>,
    spec: &ChartSpec,
    labels: &[String],
    y_max: u64,
    path: &Path,
) -> Result<Chart<'a, DB>> {
    let slots = labels.len().max(1);
    let y_top = y_max.max(1) as f64 * 1.1;

    let mut chart = ChartBuilder::on(root)
        .caption(spec.title, ("sans-serif", 28))
        .margin(20)
        .x_label_area_size(80)
        .y_label_area_size(70)
        .build_cartesian_2d(-0.5f64..(slots as f64 - 0.5), 0f64..y_top)
        .map_err(|e| render_err(path, e))?;

    let x_formatter = |x: &f64| {
        let rounded = x.round();
        if (x - rounded).abs() > 1e-6 || rounded < 0.0 {
            return String::new();
        }
        labels
            .get(rounded as usize)
            .map(|label| short_label(label))
            .unwrap_or_default()
    };

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(slots)
        .x_label_formatter(&x_formatter)
        .x_desc(spec.x_label)
        .y_desc(spec.y_label)
        .draw()
        .map_err(|e| render_err(path, e))?;

    Ok(chart)
}

fn render_simple(spec: &ChartSpec, counts: &[CategoryCount], path: &Path) -> Result<()> {
    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(|e| render_err(path, e))?;

    let labels: Vec<String> = counts.iter().map(|c| c.category.clone()).collect();
    let y_max = counts.iter().map(|c| c.count).max().unwrap_or(0);
    let mut chart = draw_frame(&root, spec, &labels, y_max, path)?;

    let half = BAR_SPAN / 2.0;
    chart
        .draw_series(counts.iter().enumerate().map(|(i, c)| {
            let x = i as f64;
            Rectangle::new([(x - half, 0.0), (x + half, c.count as f64)], BLUE.filled())
        }))
        .map_err(|e| render_err(path, e))?;

    root.present().map_err(|e| render_err(path, e))?;
    Ok(())
}

fn render_grouped(
    spec: &ChartSpec,
    pivot: &PivotTable,
    legend_title: &str,
    path: &Path,
) -> Result<()> {
    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(|e| render_err(path, e))?;

    let mut chart = draw_frame(&root, spec, &pivot.rows, pivot.max_value(), path)?;

    let width = BAR_SPAN / pivot.columns.len().max(1) as f64;
    for (j, column) in pivot.columns.iter().enumerate() {
        let color = series_color(j);
        chart
            .draw_series(
                pivot
                    .values
                    .iter()
                    .enumerate()
                    .filter(|(_, cells)| cells[j] > 0)
                    .map(move |(i, cells)| {
                        let x0 = i as f64 - BAR_SPAN / 2.0 + j as f64 * width;
                        Rectangle::new([(x0, 0.0), (x0 + width, cells[j] as f64)], color.filled())
                    }),
            )
            .map_err(|e| render_err(path, e))?
            .label(format!("{legend_title}: {}", short_label(column)))
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::LowerMiddle)
        .background_style(WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()
        .map_err(|e| render_err(path, e))?;

    root.present().map_err(|e| render_err(path, e))?;
    Ok(())
}
