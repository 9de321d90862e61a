use super::batch_time_loop::LoopSummary;
use super::observers::RoundObserver;
use super::reactor_batch::ReactorBatch;
use crate::Batch::errors::BatchError;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Whitespace-delimited trajectory file.
///
/// Header `iter t dt Density[kg/m3] Pressure[Pascal] Temperature[K] <gas> <surface>`,
/// then one row per sample per recorded round: the initial condition as iteration
/// `-1`, afterwards every round whose index is a multiple of `frequency`.
pub struct SnapshotWriter<W: Write> {
    out: W,
    frequency: usize,
}

impl SnapshotWriter<BufWriter<File>> {
    pub fn create<P: AsRef<Path>>(
        path: P,
        frequency: usize,
        gas_species: &[String],
        surface_species: &[String],
    ) -> Result<Self, BatchError> {
        let file = File::create(path)?;
        Self::new(BufWriter::new(file), frequency, gas_species, surface_species)
    }
}

impl<W: Write> SnapshotWriter<W> {
    pub fn new(
        mut out: W,
        frequency: usize,
        gas_species: &[String],
        surface_species: &[String],
    ) -> Result<Self, BatchError> {
        write!(out, "iter t dt Density[kg/m3] Pressure[Pascal] Temperature[K]")?;
        for name in gas_species.iter().chain(surface_species) {
            write!(out, " {name}")?;
        }
        writeln!(out)?;
        Ok(SnapshotWriter {
            out,
            frequency: frequency.max(1),
        })
    }

    pub fn write_state(&mut self, iteration: i64, batch: &ReactorBatch) -> Result<(), BatchError> {
        for i in 0..batch.n_samples() {
            write!(self.out, "{iteration} {:e} {:e}", batch.t[i], batch.dt[i])?;
            for v in batch.state.row(i).iter().chain(batch.site_fraction.row(i)) {
                write!(self.out, " {v:e}")?;
            }
            writeln!(self.out)?;
        }
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> RoundObserver for SnapshotWriter<W> {
    fn on_start(&mut self, batch: &ReactorBatch) -> Result<(), BatchError> {
        self.write_state(-1, batch)
    }

    fn on_round(&mut self, iteration: usize, batch: &ReactorBatch) -> Result<(), BatchError> {
        if iteration % self.frequency == 0 {
            self.write_state(iteration as i64, batch)?;
        }
        Ok(())
    }

    fn on_finish(&mut self, _summary: &LoopSummary, _batch: &ReactorBatch) -> Result<(), BatchError> {
        self.out.flush()?;
        Ok(())
    }
}
