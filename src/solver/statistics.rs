use std::error::Error;
use std::path::Path;
use std::time::Duration;

use csv::Writer;
use serde::Serialize;
use tracing::debug;

use super::SolverPhase;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StopReason {
    TimeLimit,
    Stagnation,
    NoMoves,
}

/// Counters collected during one solve, mainly for diagnostics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchStatistics {
    pub phases: Vec<SolverPhase>,
    pub iterations: usize,
    pub moves_applied: usize,
    pub local_optima: usize,
    pub initial_objective: u64,
    pub best_objective: u64,
    pub best_so_far_iteration: usize,
    /// `(iteration, objective)` every time the best solution improved.
    pub best_so_far_updates: Vec<(usize, u64)>,
    pub stop_reason: Option<StopReason>,
    pub elapsed: Duration,
}

impl SearchStatistics {
    pub fn transition(&mut self, phase: SolverPhase) {
        debug!("Solver phase: {:?}", phase);
        self.phases.push(phase);
    }

    pub fn record_best(&mut self, iteration: usize, objective: u64) {
        self.best_objective = objective;
        self.best_so_far_iteration = iteration;
        self.best_so_far_updates.push((iteration, objective));
    }

    pub fn save_to_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn Error>> {
        let mut wtr = Writer::from_path(path)?;

        wtr.write_record(["iteration", "new_best_objective"])?;
        for (iteration, objective) in &self.best_so_far_updates {
            wtr.write_record([iteration.to_string(), objective.to_string()])?;
        }

        wtr.flush()?;
        Ok(())
    }
}
