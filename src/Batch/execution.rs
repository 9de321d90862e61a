use super::errors::BatchError;
use log::info;
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::sync::atomic::{Ordering, fence};

/// Where teams run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionSpace {
    /// Teams run one after another on the calling thread.
    Serial,
    /// Teams run on a dedicated rayon pool; `0` lets rayon pick the thread count.
    Threads(usize),
}

impl Default for ExecutionSpace {
    fn default() -> Self {
        ExecutionSpace::Threads(0)
    }
}

/// Execution context handed to every dispatch by reference.
pub struct ExecutionContext {
    space: ExecutionSpace,
    team_size: usize,
    pool: Option<rayon::ThreadPool>,
}

impl ExecutionContext {
    pub fn new(space: ExecutionSpace, team_size: usize) -> Result<Self, BatchError> {
        let pool = match space {
            ExecutionSpace::Serial => None,
            ExecutionSpace::Threads(n) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .thread_name(|i| format!("batch-team-{i}"))
                    .build()?,
            ),
        };
        let team_size = team_size.max(1);
        info!(
            "execution space {:?} ready: {} worker threads, team size {}",
            space,
            pool.as_ref().map_or(1, |p| p.current_num_threads()),
            team_size
        );
        Ok(ExecutionContext {
            space,
            team_size,
            pool,
        })
    }

    pub fn serial() -> Self {
        ExecutionContext {
            space: ExecutionSpace::Serial,
            team_size: 1,
            pool: None,
        }
    }

    pub fn space(&self) -> ExecutionSpace {
        self.space
    }

    pub fn team_size(&self) -> usize {
        self.team_size
    }

    pub(crate) fn pool(&self) -> Option<&rayon::ThreadPool> {
        self.pool.as_ref()
    }
}

/// Handle of one team. Lanes are logical: a lane-strided loop visits every index
/// exactly once and reductions combine lane partials in lane order, so results do
/// not depend on how teams are scheduled.
#[derive(Debug)]
pub struct TeamMember {
    league_rank: usize,
    league_size: usize,
    team_size: usize,
    barriers: Cell<usize>,
}

impl TeamMember {
    pub fn new(league_rank: usize, league_size: usize, team_size: usize) -> Self {
        TeamMember {
            league_rank,
            league_size,
            team_size: team_size.max(1),
            barriers: Cell::new(0),
        }
    }

    /// Index of the sample this team works on.
    pub fn league_rank(&self) -> usize {
        self.league_rank
    }

    pub fn league_size(&self) -> usize {
        self.league_size
    }

    pub fn team_size(&self) -> usize {
        self.team_size
    }

    pub fn team_for<F: FnMut(usize)>(&self, n: usize, mut body: F) {
        for lane in 0..self.team_size {
            for i in (lane..n).step_by(self.team_size) {
                body(i);
            }
        }
    }

    pub fn team_reduce<F: Fn(usize) -> f64>(&self, n: usize, term: F) -> f64 {
        let mut total = 0.0;
        for lane in 0..self.team_size {
            let mut partial = 0.0;
            for i in (lane..n).step_by(self.team_size) {
                partial += term(i);
            }
            total += partial;
        }
        total
    }

    /// Orders everything written before the barrier ahead of everything read after it.
    pub fn team_barrier(&self) {
        fence(Ordering::SeqCst);
        self.barriers.set(self.barriers.get() + 1);
    }

    pub fn barrier_count(&self) -> usize {
        self.barriers.get()
    }
}
