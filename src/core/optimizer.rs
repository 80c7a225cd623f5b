//! Resource constrained search of how many VMs of each CPU flavor fit in a CPU budget.
//!
//! Maximizes the allocated CPU under the budget while every flavor share `x_i / sum(x)` stays
//! within `SHARE_TOLERANCE` of its target frequency. The continuous optimum of that problem puts
//! every flavor exactly on its target share, `x_i = f_i * budget / sum(f_j * c_j)`; it is projected
//! on the bounds, rounded, and then repaired and filled greedily one VM at a time.

use log::warn;

/// Largest accepted deviation between a flavor share and its target frequency.
pub const SHARE_TOLERANCE: f64 = 0.05;
pub const MAX_ITERATIONS: usize = 100_000;

#[derive(Debug, Clone, PartialEq)]
pub struct OptimizerReport {
    pub iterations: usize,
    /// Budget respected and every share within tolerance.
    pub converged: bool,
    pub allocated_cpu: u64,
    pub max_share_deviation: f64,
}

#[derive(Debug, Clone)]
pub struct BudgetProblem {
    /// CPU cores of each flavor.
    flavors: Vec<u32>,
    /// Target shares, normalized to sum to 1.
    targets: Vec<f64>,
    budget: u64,
}

impl BudgetProblem {
    pub fn new(flavors: Vec<(u32, f64)>, budget: u64) -> Self {
        let total_frequency: f64 = flavors.iter().map(|(_, freq)| freq.max(0.0)).sum();
        let targets = flavors
            .iter()
            .map(|(_, freq)| {
                if total_frequency > 0.0 {
                    freq.max(0.0) / total_frequency
                } else {
                    0.0
                }
            })
            .collect();
        Self {
            flavors: flavors.iter().map(|(cpu, _)| *cpu).collect(),
            targets,
            budget,
        }
    }

    /// Lower bound of a flavor count: flavors with a positive frequency get at least one VM.
    fn lower_bound(&self, idx: usize) -> usize {
        if self.targets[idx] > 0.0 {
            1
        } else {
            0
        }
    }

    fn upper_bound(&self) -> usize {
        self.budget as usize
    }

    fn allocated_cpu(&self, counts: &[usize]) -> u64 {
        counts
            .iter()
            .zip(self.flavors.iter())
            .map(|(count, cpu)| *count as u64 * *cpu as u64)
            .sum()
    }

    /// Signed deviation of every flavor share from its target.
    fn share_deviations(&self, counts: &[usize]) -> Vec<f64> {
        let total: usize = counts.iter().sum();
        counts
            .iter()
            .zip(self.targets.iter())
            .map(|(count, target)| {
                if total == 0 {
                    -target
                } else {
                    *count as f64 / total as f64 - target
                }
            })
            .collect()
    }

    fn max_share_deviation(&self, counts: &[usize]) -> f64 {
        self.share_deviations(counts)
            .into_iter()
            .map(f64::abs)
            .fold(0.0, f64::max)
    }

    /// Continuous solution projected on bounds and rounded to the nearest integer.
    fn initial_solution(&self) -> Vec<usize> {
        let weighted: f64 = self
            .flavors
            .iter()
            .zip(self.targets.iter())
            .map(|(cpu, target)| *cpu as f64 * target)
            .sum();
        let scale = if weighted > 0.0 {
            self.budget as f64 / weighted
        } else {
            0.0
        };

        (0..self.flavors.len())
            .map(|idx| {
                let continuous = (self.targets[idx] * scale).round() as usize;
                let lower = self.lower_bound(idx);
                continuous.clamp(lower, self.upper_bound().max(lower))
            })
            .collect()
    }

    pub fn solve(&self) -> (Vec<usize>, OptimizerReport) {
        let mut counts = self.initial_solution();
        let mut iterations = 0;

        // Repair: give VMs back until the budget holds, most over-represented flavor first. When
        // every flavor sits on its lower bound the bound is relaxed, largest flavor first.
        while self.allocated_cpu(&counts) > self.budget && iterations < MAX_ITERATIONS {
            iterations += 1;
            let deviations = self.share_deviations(&counts);
            let above_bound = (0..counts.len())
                .filter(|idx| counts[*idx] > self.lower_bound(*idx))
                .max_by(|a, b| deviations[*a].total_cmp(&deviations[*b]));
            let victim = match above_bound {
                Some(idx) => idx,
                None => match (0..counts.len())
                    .filter(|idx| counts[*idx] > 0)
                    .max_by_key(|idx| self.flavors[*idx])
                {
                    Some(idx) => idx,
                    None => break,
                },
            };
            counts[victim] -= 1;
        }

        // Fill: spend what is left of the budget on the most under-represented flavor that still
        // fits without pushing the worst share deviation over the tolerance.
        while iterations < MAX_ITERATIONS {
            iterations += 1;
            let allocated = self.allocated_cpu(&counts);
            let current_deviation = self.max_share_deviation(&counts);
            let allowed_deviation = f64::max(SHARE_TOLERANCE, current_deviation);
            let deviations = self.share_deviations(&counts);

            let mut candidates: Vec<usize> = (0..counts.len())
                .filter(|idx| self.targets[*idx] > 0.0)
                .filter(|idx| allocated + self.flavors[*idx] as u64 <= self.budget)
                .filter(|idx| counts[*idx] < self.upper_bound())
                .collect();
            candidates.sort_by(|a, b| deviations[*a].total_cmp(&deviations[*b]));

            let chosen = candidates.into_iter().find(|idx| {
                let mut next = counts.clone();
                next[*idx] += 1;
                self.max_share_deviation(&next) <= allowed_deviation
            });
            match chosen {
                Some(idx) => counts[idx] += 1,
                None => break,
            }
        }

        let allocated_cpu = self.allocated_cpu(&counts);
        let max_share_deviation = self.max_share_deviation(&counts);
        let converged = allocated_cpu <= self.budget && max_share_deviation <= SHARE_TOLERANCE;
        if !converged {
            warn!(
                "Flavor optimizer kept a relaxed solution: {} / {} cpu, share deviation {:.3}",
                allocated_cpu, self.budget, max_share_deviation
            );
        }

        (
            counts,
            OptimizerReport {
                iterations,
                converged,
                allocated_cpu,
                max_share_deviation,
            },
        )
    }
}
