//! Result grid: every accumulator of an analysis, allocated up front and
//! partitioned by sample.
//!
//! Each partition is handed to exactly one executor, so filling needs no
//! locking. Consumers read the grid only after the orchestrator returns.

use serde::{Deserialize, Serialize};

use evloop_core::hist::{FillError, HistogramAccumulator};
use evloop_core::id::{SampleId, SelectionId, VariableId};
use evloop_io::writers::HistogramRecord;
use evloop_model::{Analysis, SampleKind};

/// Rows passing one selection in one sample (the cut-flow entry).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionYield {
    pub raw: u64,
    pub weighted: f64,
    pub sumw2: f64,
}

impl SelectionYield {
    pub(crate) fn record(&mut self, weight: f64) {
        self.raw += 1;
        self.weighted += weight;
        self.sumw2 += weight * weight;
    }
}

/// One sample's region of the grid: `[selection][variable]` accumulators
/// plus per-selection yields.
#[derive(Debug, Clone)]
pub struct SamplePartition {
    hists: Vec<HistogramAccumulator>,
    yields: Vec<SelectionYield>,
    variables: usize,
    rows_processed: u64,
    rows_accepted: u64,
}

impl SamplePartition {
    fn allocate(analysis: &Analysis) -> Self {
        let selections = analysis.selections().len();
        let mut hists = Vec::with_capacity(selections * analysis.variables().len());
        for _ in 0..selections {
            for v in analysis.variables() {
                hists.push(HistogramAccumulator::new(v.binning));
            }
        }
        Self {
            hists,
            yields: vec![SelectionYield::default(); selections],
            variables: analysis.variables().len(),
            rows_processed: 0,
            rows_accepted: 0,
        }
    }

    pub fn hist(&self, selection: SelectionId, variable: VariableId) -> Option<&HistogramAccumulator> {
        if variable.index() >= self.variables {
            return None;
        }
        self.hists
            .get(selection.index() * self.variables + variable.index())
    }

    pub(crate) fn hist_mut(&mut self, selection: usize, variable: usize) -> &mut HistogramAccumulator {
        &mut self.hists[selection * self.variables + variable]
    }

    pub fn yields(&self) -> &[SelectionYield] {
        &self.yields
    }

    pub(crate) fn yield_mut(&mut self, selection: usize) -> &mut SelectionYield {
        &mut self.yields[selection]
    }

    pub fn rows_processed(&self) -> u64 {
        self.rows_processed
    }

    pub fn rows_accepted(&self) -> u64 {
        self.rows_accepted
    }

    pub(crate) fn count_row(&mut self, accepted: bool) {
        self.rows_processed += 1;
        if accepted {
            self.rows_accepted += 1;
        }
    }

    pub fn is_untouched(&self) -> bool {
        self.rows_processed == 0
            && self.hists.iter().all(HistogramAccumulator::is_untouched)
            && self.yields.iter().all(|y| y.raw == 0)
    }
}

/// All accumulators of one analysis run, addressed by
/// (sample, selection, variable).
#[derive(Debug, Clone)]
pub struct ResultGrid {
    samples: Vec<(String, SampleKind)>,
    selections: Vec<String>,
    variables: Vec<String>,
    partitions: Vec<SamplePartition>,
}

impl ResultGrid {
    /// Allocate every accumulator with its variable's binning.
    pub fn allocate(analysis: &Analysis) -> Self {
        Self {
            samples: analysis
                .samples()
                .iter()
                .map(|s| (s.name.clone(), s.kind))
                .collect(),
            selections: analysis.selections().iter().map(|s| s.name.clone()).collect(),
            variables: analysis.variables().iter().map(|v| v.name.clone()).collect(),
            partitions: analysis
                .samples()
                .iter()
                .map(|_| SamplePartition::allocate(analysis))
                .collect(),
        }
    }

    pub fn sample_names(&self) -> impl Iterator<Item = &str> {
        self.samples.iter().map(|(n, _)| n.as_str())
    }

    pub fn selection_names(&self) -> &[String] {
        &self.selections
    }

    pub fn variable_names(&self) -> &[String] {
        &self.variables
    }

    /// Total number of accumulators.
    pub fn len(&self) -> usize {
        self.partitions.iter().map(|p| p.hists.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(
        &self,
        sample: SampleId,
        selection: SelectionId,
        variable: VariableId,
    ) -> Option<&HistogramAccumulator> {
        self.partitions.get(sample.index())?.hist(selection, variable)
    }

    /// Lookup by names, e.g. `grid.by_name("data", "no cut", "x")`.
    pub fn by_name(&self, sample: &str, selection: &str, variable: &str) -> Option<&HistogramAccumulator> {
        let s = self.samples.iter().position(|(n, _)| n == sample)?;
        let sel = self.selections.iter().position(|n| n == selection)?;
        let v = self.variables.iter().position(|n| n == variable)?;
        self.get(SampleId::new(s), SelectionId::new(sel), VariableId::new(v))
    }

    pub fn partition(&self, sample: SampleId) -> Option<&SamplePartition> {
        self.partitions.get(sample.index())
    }

    /// Exclusive access to one sample's region, for driving a
    /// `SampleExecutor` directly.
    pub fn partition_mut(&mut self, sample: SampleId) -> Option<&mut SamplePartition> {
        self.partitions.get_mut(sample.index())
    }

    pub(crate) fn partitions_mut(&mut self) -> &mut [SamplePartition] {
        &mut self.partitions
    }

    /// Per-selection yields of one sample, in selection order.
    pub fn yields(&self, sample: SampleId) -> Option<&[SelectionYield]> {
        self.partition(sample).map(SamplePartition::yields)
    }

    pub fn rows_processed(&self) -> u64 {
        self.partitions.iter().map(|p| p.rows_processed).sum()
    }

    /// Sum of every sample of `kind` for one (selection, variable); `None`
    /// when no sample has that kind.
    pub fn total(
        &self,
        kind: SampleKind,
        selection: SelectionId,
        variable: VariableId,
    ) -> Result<Option<HistogramAccumulator>, FillError> {
        let mut total: Option<HistogramAccumulator> = None;
        for (i, (_, k)) in self.samples.iter().enumerate() {
            if *k != kind {
                continue;
            }
            let Some(h) = self.get(SampleId::new(i), selection, variable) else {
                continue;
            };
            total = Some(match total {
                Some(acc) => acc.add(h)?,
                None => h.clone(),
            });
        }
        Ok(total)
    }

    /// Running background totals in declaration order: entry `i` is the sum
    /// of the first `i + 1` background samples, labeled by the last one.
    pub fn stack(
        &self,
        selection: SelectionId,
        variable: VariableId,
    ) -> Result<Vec<(String, HistogramAccumulator)>, FillError> {
        let mut out: Vec<(String, HistogramAccumulator)> = Vec::new();
        for (i, (name, kind)) in self.samples.iter().enumerate() {
            if *kind != SampleKind::Background {
                continue;
            }
            let Some(h) = self.get(SampleId::new(i), selection, variable) else {
                continue;
            };
            let running = match out.last() {
                Some((_, prev)) => prev.add(h)?,
                None => h.clone(),
            };
            out.push((name.clone(), running));
        }
        Ok(out)
    }

    /// Copy with every accumulator scaled to unit in-range integral.
    pub fn normalized(&self) -> Self {
        let mut out = self.clone();
        for p in &mut out.partitions {
            for h in &mut p.hists {
                *h = h.normalized();
            }
        }
        out
    }

    /// Every accumulator in (sample, selection, variable) order, for writers.
    pub fn records(&self) -> impl Iterator<Item = HistogramRecord<'_>> {
        self.partitions.iter().enumerate().flat_map(move |(s, part)| {
            part.hists.iter().enumerate().map(move |(i, hist)| HistogramRecord {
                sample: &self.samples[s].0,
                selection: &self.selections[i / part.variables],
                variable: &self.variables[i % part.variables],
                hist,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evloop_io::SourceSpec;
    use evloop_model::{Component, Sample, Selection, Variable};

    fn analysis() -> Analysis {
        let sample = |name: &str, kind| {
            Sample::new(name, kind).with_component(Component::new(SourceSpec::csv("x.csv")))
        };
        Analysis::new(
            vec![
                sample("data", SampleKind::Data),
                sample("ttbar", SampleKind::Background),
                sample("wjets", SampleKind::Background),
                sample("higgs", SampleKind::Signal),
            ],
            vec![
                Selection::formula("all", "x >= 0").unwrap(),
                Selection::formula("high", "x > 5").unwrap(),
            ],
            vec![
                Variable::formula("x", "x", 10, 0.0, 10.0).unwrap(),
                Variable::formula("y", "y", 4, 0.0, 1.0).unwrap(),
            ],
        )
        .unwrap()
    }

    fn fill(grid: &mut ResultGrid, sample: usize, value: f64, weight: f64) {
        grid.partitions_mut()[sample].hist_mut(0, 0).fill(value, weight).unwrap();
    }

    #[test]
    fn allocation_covers_the_full_grid() {
        let a = analysis();
        let grid = ResultGrid::allocate(&a);
        assert_eq!(grid.len(), a.grid_size());
        let y = grid
            .get(SampleId::new(3), SelectionId::new(1), VariableId::new(1))
            .unwrap();
        assert_eq!(y.binning().bins(), 4);
        assert!(grid.get(SampleId::new(4), SelectionId::new(0), VariableId::new(0)).is_none());
        assert!(grid.get(SampleId::new(0), SelectionId::new(0), VariableId::new(2)).is_none());
        assert!(grid.partitions.iter().all(SamplePartition::is_untouched));
    }

    #[test]
    fn totals_and_stacks_follow_kind_and_order() {
        let a = analysis();
        let mut grid = ResultGrid::allocate(&a);
        fill(&mut grid, 0, 1.5, 1.0);
        fill(&mut grid, 1, 1.5, 2.0);
        fill(&mut grid, 2, 2.5, 3.0);
        fill(&mut grid, 3, 3.5, 4.0);

        let (sel, var) = (SelectionId::new(0), VariableId::new(0));
        let bkg = grid.total(SampleKind::Background, sel, var).unwrap().unwrap();
        assert_eq!(bkg.integral(), 5.0);
        assert_eq!(bkg.bin_content(1), Some(2.0));
        assert_eq!(bkg.bin_content(2), Some(3.0));

        let stack = grid.stack(sel, var).unwrap();
        let names: Vec<_> = stack.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["ttbar", "wjets"]);
        assert_eq!(stack[0].1.integral(), 2.0);
        assert_eq!(stack[1].1.integral(), 5.0);

        let sig = grid.total(SampleKind::Signal, sel, var).unwrap().unwrap();
        assert_eq!(sig.integral(), 4.0);
    }

    #[test]
    fn normalized_copy_leaves_the_original() {
        let a = analysis();
        let mut grid = ResultGrid::allocate(&a);
        fill(&mut grid, 1, 1.5, 2.0);
        fill(&mut grid, 1, 7.5, 6.0);
        let norm = grid.normalized();
        let h = norm.by_name("ttbar", "all", "x").unwrap();
        assert!((h.integral() - 1.0).abs() < 1e-12);
        assert_eq!(h.bin_content(7), Some(0.75));
        assert_eq!(grid.by_name("ttbar", "all", "x").unwrap().integral(), 8.0);
        // Empty accumulators stay empty.
        assert_eq!(norm.by_name("data", "all", "x").unwrap().integral(), 0.0);
    }

    #[test]
    fn records_enumerate_names_in_grid_order() {
        let a = analysis();
        let grid = ResultGrid::allocate(&a);
        let keys: Vec<_> = grid
            .records()
            .take(4)
            .map(|r| (r.sample, r.selection, r.variable))
            .collect();
        assert_eq!(
            keys,
            [
                ("data", "all", "x"),
                ("data", "all", "y"),
                ("data", "high", "x"),
                ("data", "high", "y"),
            ]
        );
        assert_eq!(grid.records().count(), a.grid_size());
    }

    #[test]
    fn yields_accumulate_weights() {
        let a = analysis();
        let mut grid = ResultGrid::allocate(&a);
        let part = &mut grid.partitions_mut()[0];
        part.yield_mut(1).record(2.0);
        part.yield_mut(1).record(3.0);
        let y = grid.yields(SampleId::new(0)).unwrap()[1];
        assert_eq!(y, SelectionYield { raw: 2, weighted: 5.0, sumw2: 13.0 });
    }
}
