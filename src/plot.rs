//! Scatter and dendrogram images.
//!
//! Figures are sized in inches like the demos they reproduce. PNG output
//! uses 300 px per inch; SVG output uses 100 px per inch with fonts and
//! strokes scaled down to match. Text is set in the embedded DejaVu Sans, so
//! rendering does not depend on fonts installed on the host.

use crate::Matrix;
use crate::cluster::Dendrogram;
use crate::config::{ImageFormat, PipelineConfig};
use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::pipeline::{HierarchicalOutcome, KMeansOutcome};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::{FontStyle, register_font};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::info;

const SCATTER_INCHES: (u32, u32) = (10, 6);
const DENDROGRAM_INCHES: (u32, u32) = (12, 6);
const PNG_DPI: u32 = 300;
const SVG_PPI: u32 = 100;

static SANS_SERIF: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");
static FONT_REGISTERED: OnceLock<bool> = OnceLock::new();

fn plot_error<E: std::fmt::Display>(err: E) -> Error {
    Error::Plot(err.to_string())
}

fn ensure_font() -> Result<()> {
    let registered = *FONT_REGISTERED
        .get_or_init(|| register_font("sans-serif", FontStyle::Normal, SANS_SERIF).is_ok());
    if registered {
        Ok(())
    } else {
        Err(Error::Plot("embedded font could not be loaded".to_string()))
    }
}

fn pixels(inches: (u32, u32), ppi: u32) -> (u32, u32) {
    (inches.0 * ppi, inches.1 * ppi)
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Samples coloured by cluster, with optional centroid markers. The file is
/// overwritten if it exists.
pub fn scatter_plot(
    path: &Path,
    format: ImageFormat,
    title: &str,
    dataset: &Dataset,
    centroids: Option<&Matrix>,
) -> Result<()> {
    ensure_font()?;
    ensure_parent(path)?;

    match format {
        ImageFormat::Png => {
            let root = BitMapBackend::new(path, pixels(SCATTER_INCHES, PNG_DPI)).into_drawing_area();
            draw_scatter(&root, PNG_DPI / SVG_PPI, title, dataset, centroids)?;
            root.present().map_err(plot_error)?;
        }
        ImageFormat::Svg => {
            let root = SVGBackend::new(path, pixels(SCATTER_INCHES, SVG_PPI)).into_drawing_area();
            draw_scatter(&root, 1, title, dataset, centroids)?;
            root.present().map_err(plot_error)?;
        }
    }

    info!(path = %path.display(), "scatter plot saved");
    Ok(())
}

/// Truncated dendrogram with a horizontal line at the cut height.
pub fn dendrogram_plot(
    path: &Path,
    format: ImageFormat,
    layout: &Dendrogram,
    cut_height: f64,
    n_clusters: usize,
) -> Result<()> {
    ensure_font()?;
    ensure_parent(path)?;

    match format {
        ImageFormat::Png => {
            let root = BitMapBackend::new(path, pixels(DENDROGRAM_INCHES, PNG_DPI)).into_drawing_area();
            draw_dendrogram(&root, PNG_DPI / SVG_PPI, layout, cut_height, n_clusters)?;
            root.present().map_err(plot_error)?;
        }
        ImageFormat::Svg => {
            let root = SVGBackend::new(path, pixels(DENDROGRAM_INCHES, SVG_PPI)).into_drawing_area();
            draw_dendrogram(&root, 1, layout, cut_height, n_clusters)?;
            root.present().map_err(plot_error)?;
        }
    }

    info!(path = %path.display(), "dendrogram saved");
    Ok(())
}

/// Writes `kmeans_clusters` into the configured directory.
pub fn render_kmeans(config: &PipelineConfig, outcome: &KMeansOutcome) -> Result<Vec<PathBuf>> {
    let path = config.image_path("kmeans_clusters");
    scatter_plot(
        &path,
        config.image_format,
        "K-Means: Customer Segmentation",
        &outcome.dataset,
        Some(&outcome.centroids),
    )?;
    Ok(vec![path])
}

/// Writes `dendrograma` and `hierarchical_clusters` into the configured
/// directory.
pub fn render_hierarchical(config: &PipelineConfig, outcome: &HierarchicalOutcome) -> Result<Vec<PathBuf>> {
    let dendrogram_path = config.image_path("dendrograma");
    let layout = outcome
        .tree
        .dendrogram(config.dendrogram_levels, config.n_clusters)?;
    dendrogram_plot(
        &dendrogram_path,
        config.image_format,
        &layout,
        outcome.cut_height,
        config.n_clusters,
    )?;

    let scatter_path = config.image_path("hierarchical_clusters");
    scatter_plot(
        &scatter_path,
        config.image_format,
        "Hierarchical Clustering: Customer Segmentation",
        &outcome.dataset,
        None,
    )?;

    Ok(vec![dendrogram_path, scatter_path])
}

/// Data bounds with 5% padding on each side.
fn padded_range(values: impl Iterator<Item = f64>) -> std::ops::Range<f64> {
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !lo.is_finite() || !hi.is_finite() {
        return 0.0..1.0;
    }
    let pad = ((hi - lo) * 0.05).max(1e-9);
    (lo - pad)..(hi + pad)
}

fn draw_scatter<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    scale: u32,
    title: &str,
    dataset: &Dataset,
    centroids: Option<&Matrix>,
) -> Result<()> {
    let labels = dataset
        .clusters
        .as_ref()
        .ok_or(Error::NotFitted("Cluster assignment"))?;
    let n_clusters = labels.iter().max().map_or(0, |&k| k + 1);

    let x_range = padded_range(dataset.features.column(0).iter().copied());
    let y_range = padded_range(dataset.features.column(1).iter().copied());

    root.fill(&WHITE).map_err(plot_error)?;

    let mut chart = ChartBuilder::on(root)
        .caption(title, ("sans-serif", 24 * scale).into_font())
        .margin(12 * scale)
        .x_label_area_size(40 * scale)
        .y_label_area_size(70 * scale)
        .build_cartesian_2d(x_range, y_range)
        .map_err(plot_error)?;

    chart
        .configure_mesh()
        .x_desc("Age")
        .y_desc("Annual spend")
        .label_style(("sans-serif", 12 * scale).into_font())
        .light_line_style(BLACK.mix(0.05))
        .draw()
        .map_err(plot_error)?;

    for k in 0..n_clusters {
        let color = Palette99::pick(k).mix(0.8);
        let points = dataset
            .features
            .rows()
            .into_iter()
            .zip(labels.iter())
            .filter(|&(_, &label)| label == k)
            .map(|(row, _)| (row[0], row[1]))
            .collect::<Vec<_>>();

        chart
            .draw_series(
                points
                    .into_iter()
                    .map(|point| Circle::new(point, 4 * scale, color.filled())),
            )
            .map_err(plot_error)?
            .label(format!("Cluster {}", k))
            .legend(move |(x, y)| Circle::new((x, y), 4 * scale, color.filled()));
    }

    if let Some(centroids) = centroids {
        chart
            .draw_series(
                centroids
                    .rows()
                    .into_iter()
                    .map(|c| Cross::new((c[0], c[1]), 9 * scale, RED.stroke_width(3 * scale))),
            )
            .map_err(plot_error)?
            .label("Centroids")
            .legend(move |(x, y)| Cross::new((x, y), 5 * scale, RED.stroke_width(2 * scale)));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .label_font(("sans-serif", 12 * scale).into_font())
        .draw()
        .map_err(plot_error)?;

    Ok(())
}

fn draw_dendrogram<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    scale: u32,
    layout: &Dendrogram,
    cut_height: f64,
    n_clusters: usize,
) -> Result<()> {
    let x_max = (layout.leaves.len() as f64 * 10.0).max(10.0);
    let top = layout.max_height.max(cut_height);
    let y_max = if top > 0.0 { top * 1.05 } else { 1.0 };
    let y_min = -0.08 * y_max;

    root.fill(&WHITE).map_err(plot_error)?;

    let mut chart = ChartBuilder::on(root)
        .caption(
            "Dendrogram - Hierarchical Clustering (Ward)",
            ("sans-serif", 24 * scale).into_font(),
        )
        .margin(12 * scale)
        .x_label_area_size(30 * scale)
        .y_label_area_size(60 * scale)
        .build_cartesian_2d(0.0..x_max, y_min..y_max)
        .map_err(plot_error)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_label_formatter(&|_: &f64| String::new())
        .x_desc("Customers (or cluster size)")
        .y_desc("Distance (Ward)")
        .label_style(("sans-serif", 12 * scale).into_font())
        .light_line_style(BLACK.mix(0.05))
        .draw()
        .map_err(plot_error)?;

    chart
        .draw_series(layout.links.iter().map(|link| {
            let color = match link.cluster {
                Some(k) => Palette99::pick(k).to_rgba(),
                None => BLUE.to_rgba(),
            };
            let points: Vec<(f64, f64)> = link.xs.iter().copied().zip(link.ys.iter().copied()).collect();
            PathElement::new(points, color.stroke_width(scale))
        }))
        .map_err(plot_error)?;

    chart
        .draw_series(layout.leaves.iter().map(|leaf| {
            Text::new(
                leaf.label.clone(),
                (leaf.x - 2.0, y_min * 0.3),
                ("sans-serif", 10 * scale).into_font(),
            )
        }))
        .map_err(plot_error)?;

    chart
        .draw_series(std::iter::once(PathElement::new(
            vec![(0.0, cut_height), (x_max, cut_height)],
            RED.stroke_width(2 * scale),
        )))
        .map_err(plot_error)?
        .label(format!("Cut into {} clusters", n_clusters))
        .legend(move |(x, y)| {
            PathElement::new(vec![(x, y), (x + 20 * scale as i32, y)], RED.stroke_width(2 * scale))
        });

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .label_font(("sans-serif", 12 * scale).into_font())
        .draw()
        .map_err(plot_error)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::LinkageTree;
    use crate::pipeline::{run_hierarchical, run_kmeans};
    use ndarray::array;

    fn scratch_dir(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("customer-segments-{}", std::process::id()))
            .join(name)
    }

    /// Width and height from the IHDR chunk of a PNG file.
    fn png_size(path: &Path) -> (u32, u32) {
        let bytes = std::fs::read(path).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
        let width = u32::from_be_bytes(bytes[16..20].try_into().unwrap());
        let height = u32::from_be_bytes(bytes[20..24].try_into().unwrap());
        (width, height)
    }

    fn clustered_dataset() -> Dataset {
        let features = array![[20.0, 1500.0], [24.0, 2100.0], [41.0, 5100.0], [58.0, 7900.0], [62.0, 8600.0]];
        let mut dataset = Dataset::new(features, array![0, 0, 1, 2, 2]).unwrap();
        dataset.attach_clusters(array![0, 0, 1, 2, 2]).unwrap();
        dataset
    }

    #[test]
    fn test_padded_range() {
        let range = padded_range([0.0, 10.0].into_iter());
        assert!((range.start + 0.5).abs() < 1e-12);
        assert!((range.end - 10.5).abs() < 1e-12);

        assert_eq!(padded_range(std::iter::empty()), 0.0..1.0);
    }

    #[test]
    fn test_scatter_plot_writes_svg() {
        let path = scratch_dir("svg").join("scatter.svg");
        let dataset = clustered_dataset();
        let centroids = array![[22.0, 1800.0], [41.0, 5100.0], [60.0, 8250.0]];

        scatter_plot(&path, ImageFormat::Svg, "K-Means", &dataset, Some(&centroids)).unwrap();

        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("Centroids"));
    }

    #[test]
    fn test_scatter_plot_writes_png_at_300_dpi() {
        let path = scratch_dir("png").join("scatter.png");

        scatter_plot(&path, ImageFormat::Png, "K-Means", &clustered_dataset(), None).unwrap();

        assert_eq!(png_size(&path), (10 * 300, 6 * 300));
    }

    #[test]
    fn test_scatter_plot_requires_clusters() {
        let path = scratch_dir("svg").join("unclustered.svg");
        let dataset = Dataset::new(array![[1.0, 2.0]], array![0]).unwrap();

        assert!(scatter_plot(&path, ImageFormat::Svg, "none", &dataset, None).is_err());
    }

    #[test]
    fn test_dendrogram_plot_writes_svg() {
        let path = scratch_dir("svg").join("dendrogram.svg");
        let x = array![[0.0, 0.0], [1.0, 0.0], [5.0, 0.0], [6.0, 0.0], [20.0, 0.0]];
        let tree = LinkageTree::ward(&x).unwrap();
        let layout = tree.dendrogram(3, 3).unwrap();

        dendrogram_plot(&path, ImageFormat::Svg, &layout, tree.cut_height(3).unwrap(), 3).unwrap();

        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("Cut into 3 clusters"));
    }

    #[test]
    fn test_default_demo_writes_named_pngs() {
        let config = PipelineConfig::default().output_dir(scratch_dir("demo"));

        let mut written = render_kmeans(&config, &run_kmeans(&config).unwrap()).unwrap();
        written.extend(render_hierarchical(&config, &run_hierarchical(&config).unwrap()).unwrap());

        let expected = [
            ("kmeans_clusters.png", (10 * 300, 6 * 300)),
            ("dendrograma.png", (12 * 300, 6 * 300)),
            ("hierarchical_clusters.png", (10 * 300, 6 * 300)),
        ];
        assert_eq!(written.len(), expected.len());
        for (path, (name, size)) in written.iter().zip(expected) {
            assert_eq!(path.file_name().unwrap(), name);
            assert!(path.exists(), "{} missing", path.display());
            assert_eq!(png_size(path), size);
        }
    }
}
