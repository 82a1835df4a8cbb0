use crate::error::{Error, Result};
use crate::{Matrix, Vector};
use ndarray::Axis;

/// Rescales every feature column to `[0, 1]` using the fitted min and max.
#[derive(Clone, Debug, Default)]
pub struct MinMaxScaler {
    data_min: Option<Vector>,
    data_max: Option<Vector>,
}

impl MinMaxScaler {
    pub fn new() -> Self {
        Self {
            data_min: None,
            data_max: None,
        }
    }

    /// Fails with `ConstantFeature` when a column has no spread, since
    /// `(x - min) / (max - min)` would be undefined for it.
    pub fn fit(&mut self, data: &Matrix) -> Result<()> {
        if data.nrows() == 0 || data.ncols() == 0 {
            return Err(Error::EmptyInput);
        }
        if data.iter().any(|v| !v.is_finite()) {
            return Err(Error::NonFiniteInput);
        }

        let data_min = data.fold_axis(Axis(0), f64::INFINITY, |&acc, &v| acc.min(v));
        let data_max = data.fold_axis(Axis(0), f64::NEG_INFINITY, |&acc, &v| acc.max(v));

        for (column, (lo, hi)) in data_min.iter().zip(data_max.iter()).enumerate() {
            let range = hi - lo;
            if !(range.is_finite() && range > 0.0) {
                return Err(Error::ConstantFeature { column });
            }
        }

        self.data_min = Some(data_min);
        self.data_max = Some(data_max);
        Ok(())
    }

    pub fn transform(&self, data: &Matrix) -> Result<Matrix> {
        let (data_min, data_range) = self.fitted(data)?;

        let mut result = data.clone();
        for mut row in result.axis_iter_mut(Axis(0)) {
            row -= data_min;
            row /= &data_range;
        }

        Ok(result)
    }

    pub fn inverse_transform(&self, data: &Matrix) -> Result<Matrix> {
        let (data_min, data_range) = self.fitted(data)?;

        let mut result = data.clone();
        for mut row in result.axis_iter_mut(Axis(0)) {
            row *= &data_range;
            row += data_min;
        }

        Ok(result)
    }

    pub fn fit_transform(&mut self, data: &Matrix) -> Result<Matrix> {
        self.fit(data)?;
        self.transform(data)
    }

    pub fn data_min(&self) -> Option<&Vector> {
        self.data_min.as_ref()
    }

    pub fn data_max(&self) -> Option<&Vector> {
        self.data_max.as_ref()
    }

    pub fn data_range(&self) -> Option<Vector> {
        match (&self.data_min, &self.data_max) {
            (Some(lo), Some(hi)) => Some(hi - lo),
            _ => None,
        }
    }

    fn fitted(&self, data: &Matrix) -> Result<(&Vector, Vector)> {
        let data_min = self.data_min.as_ref().ok_or(Error::NotFitted("MinMaxScaler"))?;
        let data_range = self.data_range().ok_or(Error::NotFitted("MinMaxScaler"))?;

        if data.ncols() != data_min.len() {
            return Err(Error::DimensionMismatch {
                expected: data_min.len(),
                found: data.ncols(),
            });
        }

        Ok((data_min, data_range))
    }
}
