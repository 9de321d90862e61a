use super::errors::BatchError;
use super::workspace::WorkspaceExtent;
use nalgebra::DMatrixViewMut;

/// Bump allocator over one team's exclusive scratch region.
///
/// Regions handed out are disjoint, zeroed and live as long as the underlying
/// slice. [`TeamArena::frame`] reborrows the remaining space for temporaries that
/// die with the frame, so repeated calls reuse the same memory.
#[derive(Debug)]
pub struct TeamArena<'a> {
    label: &'static str,
    reals: &'a mut [f64],
    ordinals: &'a mut [usize],
}

impl<'a> TeamArena<'a> {
    pub fn new(label: &'static str, reals: &'a mut [f64], ordinals: &'a mut [usize]) -> Self {
        TeamArena {
            label,
            reals,
            ordinals,
        }
    }

    pub fn remaining(&self) -> usize {
        self.reals.len()
    }

    pub fn remaining_ordinals(&self) -> usize {
        self.ordinals.len()
    }

    pub fn take(&mut self, n: usize) -> Result<&'a mut [f64], BatchError> {
        if n > self.reals.len() {
            return Err(BatchError::ScratchExhausted {
                label: self.label,
                requested: n,
                available: self.reals.len(),
            });
        }
        let (head, tail) = std::mem::take(&mut self.reals).split_at_mut(n);
        self.reals = tail;
        head.fill(0.0);
        Ok(head)
    }

    pub fn take_ordinals(&mut self, n: usize) -> Result<&'a mut [usize], BatchError> {
        if n > self.ordinals.len() {
            return Err(BatchError::ScratchExhausted {
                label: self.label,
                requested: n,
                available: self.ordinals.len(),
            });
        }
        let (head, tail) = std::mem::take(&mut self.ordinals).split_at_mut(n);
        self.ordinals = tail;
        head.fill(0);
        Ok(head)
    }

    /// Column-major `rows × cols` matrix view over freshly taken scratch.
    pub fn take_matrix(
        &mut self,
        rows: usize,
        cols: usize,
    ) -> Result<DMatrixViewMut<'a, f64>, BatchError> {
        let data = self.take(rows * cols)?;
        Ok(DMatrixViewMut::from_slice(data, rows, cols))
    }

    pub fn frame(&mut self) -> TeamArena<'_> {
        TeamArena {
            label: self.label,
            reals: &mut *self.reals,
            ordinals: &mut *self.ordinals,
        }
    }
}

/// Backing storage for all teams of a dispatch: one fixed-size slot per sample.
#[derive(Debug, Default)]
pub struct ScratchPool {
    extent: WorkspaceExtent,
    reals: Vec<f64>,
    ordinals: Vec<usize>,
}

impl ScratchPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grows the pool so that `n_teams` slots of `extent` fit. Never shrinks.
    pub fn reserve(&mut self, n_teams: usize, extent: WorkspaceExtent) {
        self.extent = extent;
        let reals = n_teams * extent.reals;
        let ordinals = n_teams * extent.ordinals;
        if self.reals.len() < reals {
            self.reals.resize(reals, 0.0);
        }
        if self.ordinals.len() < ordinals {
            self.ordinals.resize(ordinals, 0);
        }
    }

    pub fn extent(&self) -> WorkspaceExtent {
        self.extent
    }

    pub fn capacity(&self) -> usize {
        self.reals.len()
    }

    /// One `(reals, ordinals)` slot per team, each exactly `extent` long.
    pub fn slots(&mut self, n_teams: usize) -> Vec<(&mut [f64], &mut [usize])> {
        let extent = self.extent;
        let reals = split_slots(&mut self.reals, n_teams, extent.reals);
        let ordinals = split_slots(&mut self.ordinals, n_teams, extent.ordinals);
        reals.into_iter().zip(ordinals).collect()
    }
}

fn split_slots<T>(data: &mut [T], n: usize, width: usize) -> Vec<&mut [T]> {
    if width == 0 {
        return (0..n).map(|_| <&mut [T]>::default()).collect();
    }
    data[..n * width].chunks_exact_mut(width).collect()
}
