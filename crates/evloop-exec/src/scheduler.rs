//! Crate-local thread pool for per-sample tasks.
//!
//! Each task receives exclusive `&mut` access to one grid partition, so the
//! pool only has to join; no accumulator is ever shared between tasks.

use rayon::prelude::*;
use rayon::ThreadPool;

use crate::grid::SamplePartition;
use crate::ExecError;

pub struct SamplePool {
    pool: ThreadPool,
}

impl SamplePool {
    pub fn new(threads: usize) -> Result<Self, ExecError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|i| format!("evloop-sample-{i}"))
            .build()
            .map_err(|e| ExecError::Pool(e.to_string()))?;
        Ok(Self { pool })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Run `task(index, partition)` for every partition and return the
    /// results in partition order once all tasks finished.
    pub fn run_each<T, F>(&self, partitions: &mut [SamplePartition], task: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize, &mut SamplePartition) -> T + Sync,
    {
        self.pool.install(|| {
            partitions
                .par_iter_mut()
                .enumerate()
                .map(|(i, p)| task(i, p))
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::ResultGrid;
    use evloop_io::SourceSpec;
    use evloop_model::{Analysis, Component, Sample, SampleKind};

    #[test]
    fn results_come_back_in_partition_order() {
        let samples = (0..5)
            .map(|i| {
                Sample::new(format!("s{i}"), SampleKind::Background)
                    .with_component(Component::new(SourceSpec::csv("x.csv")))
            })
            .collect();
        let analysis = Analysis::new(samples, vec![], vec![]).unwrap();
        let mut grid = ResultGrid::allocate(&analysis);

        let pool = SamplePool::new(3).unwrap();
        assert_eq!(pool.threads(), 3);
        let out = pool.run_each(grid.partitions_mut(), |i, p| {
            p.count_row(i % 2 == 0);
            i * 10
        });
        assert_eq!(out, [0, 10, 20, 30, 40]);
        assert_eq!(grid.rows_processed(), 5);
    }

    #[test]
    fn zero_threads_means_one() {
        assert_eq!(SamplePool::new(0).unwrap().threads(), 1);
    }
}
