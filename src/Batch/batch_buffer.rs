use super::errors::BatchError;

/// Row-major `n_samples × width` buffer. Stands in for one labelled 2-D device view:
/// each row belongs to exactly one sample and is handed out as a disjoint slice.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchBuffer {
    label: String,
    n_samples: usize,
    width: usize,
    data: Vec<f64>,
}

impl BatchBuffer {
    pub fn new(label: &str, n_samples: usize, width: usize) -> Self {
        BatchBuffer {
            label: label.to_string(),
            n_samples,
            width,
            data: vec![0.0; n_samples * width],
        }
    }

    /// Copies `row` into every one of `n_samples` rows.
    pub fn replicate(label: &str, row: &[f64], n_samples: usize) -> Self {
        let mut data = Vec::with_capacity(row.len() * n_samples);
        for _ in 0..n_samples {
            data.extend_from_slice(row);
        }
        BatchBuffer {
            label: label.to_string(),
            n_samples,
            width: row.len(),
            data,
        }
    }

    pub fn from_rows(label: &str, rows: &[Vec<f64>]) -> Result<Self, BatchError> {
        let width = rows.first().map_or(0, |r| r.len());
        let mut data = Vec::with_capacity(width * rows.len());
        for row in rows {
            if row.len() != width {
                return Err(BatchError::ShapeMismatch {
                    label: label.to_string(),
                    expected: width,
                    found: row.len(),
                });
            }
            data.extend_from_slice(row);
        }
        Ok(BatchBuffer {
            label: label.to_string(),
            n_samples: rows.len(),
            width,
            data,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn row(&self, sample: usize) -> &[f64] {
        &self.data[sample * self.width..(sample + 1) * self.width]
    }

    pub fn row_mut(&mut self, sample: usize) -> &mut [f64] {
        &mut self.data[sample * self.width..(sample + 1) * self.width]
    }

    /// One slice per sample, also when `width == 0`.
    pub fn rows(&self) -> Vec<&[f64]> {
        if self.width == 0 {
            return vec![&[][..]; self.n_samples];
        }
        self.data.chunks_exact(self.width).collect()
    }

    pub fn rows_mut(&mut self) -> Vec<&mut [f64]> {
        if self.width == 0 {
            return (0..self.n_samples)
                .map(|_| <&mut [f64]>::default())
                .collect();
        }
        self.data.chunks_exact_mut(self.width).collect()
    }

    /// Explicit mirror between two buffers of identical shape.
    pub fn deep_copy_from(&mut self, other: &BatchBuffer) -> Result<(), BatchError> {
        if self.n_samples != other.n_samples || self.width != other.width {
            return Err(BatchError::ShapeMismatch {
                label: format!("{} <- {}", self.label, other.label),
                expected: self.data.len(),
                found: other.data.len(),
            });
        }
        self.data.copy_from_slice(&other.data);
        Ok(())
    }
}
