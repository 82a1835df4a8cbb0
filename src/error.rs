use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("input must have at least one sample and one feature")]
    EmptyInput,

    #[error("invalid distribution for segment '{segment}': {reason}")]
    InvalidDistribution { segment: String, reason: String },

    #[error("feature column {column} has zero or non-finite range; cannot min-max scale it")]
    ConstantFeature { column: usize },

    #[error("{0} not fitted. Call fit() first.")]
    NotFitted(&'static str),

    #[error("number of features ({found}) doesn't match fitted data ({expected})")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("n_samples={n_samples} should be >= n_clusters={n_clusters}")]
    TooFewSamples { n_samples: usize, n_clusters: usize },

    #[error("input contains NaN or infinite values")]
    NonFiniteInput,

    #[error("invalid cluster count: {0}")]
    InvalidClusterCount(usize),

    #[error("failed to render plot: {0}")]
    Plot(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
