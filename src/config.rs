use crate::dataset::{SegmentSpec, default_segments};
use clap::ValueEnum;
use std::fmt;
use std::path::{Path, PathBuf};

/// Image container written by the plot renderer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, ValueEnum)]
pub enum ImageFormat {
    /// 300 DPI raster.
    #[default]
    Png,
    Svg,
}

impl ImageFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Svg => "svg",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Everything a segmentation run needs. `Default` is the fixed demo setup.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub seed: u64,
    pub n_clusters: usize,
    pub n_init: usize,
    pub max_iter: usize,
    pub tolerance: f64,
    pub segments: Vec<SegmentSpec>,
    pub output_dir: PathBuf,
    pub image_format: ImageFormat,
    pub render_plots: bool,
    /// Dendrogram depth shown before subtrees collapse.
    pub dendrogram_levels: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            n_clusters: 3,
            n_init: 10,
            max_iter: 300,
            tolerance: 1e-4,
            segments: default_segments(),
            output_dir: PathBuf::from("."),
            image_format: ImageFormat::default(),
            render_plots: true,
            dendrogram_levels: 3,
        }
    }
}

impl PipelineConfig {
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn output_dir<P: AsRef<Path>>(mut self, output_dir: P) -> Self {
        self.output_dir = output_dir.as_ref().to_path_buf();
        self
    }

    pub fn image_format(mut self, image_format: ImageFormat) -> Self {
        self.image_format = image_format;
        self
    }

    pub fn render_plots(mut self, render_plots: bool) -> Self {
        self.render_plots = render_plots;
        self
    }

    /// `<output_dir>/<stem>.<extension>`
    pub fn image_path(&self, stem: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}", stem, self.image_format.extension()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_demo() {
        let config = PipelineConfig::default();

        assert_eq!(config.seed, 42);
        assert_eq!(config.n_clusters, 3);
        assert_eq!(config.n_init, 10);
        assert_eq!(config.segments.len(), 3);
        assert_eq!(config.segments.iter().map(|s| s.count).sum::<usize>(), 300);
        assert!(config.render_plots);
        assert_eq!(config.image_path("kmeans_clusters"), PathBuf::from("./kmeans_clusters.png"));
    }

    #[test]
    fn test_image_path() {
        let config = PipelineConfig::default()
            .output_dir("/tmp/out")
            .image_format(ImageFormat::Svg);

        assert_eq!(config.image_path("dendrograma"), PathBuf::from("/tmp/out/dendrograma.svg"));
        assert_eq!(ImageFormat::Svg.to_string(), "svg");
    }
}
