//! Fixed-binning weighted histogram accumulator.
//!
//! Bins are half-open: bin `i` covers `[low + i*w, low + (i+1)*w)`. A value
//! equal to `low` lands in bin 0; a value equal to `high` lands in overflow.
//! Under/overflow collect weight but do not count as entries.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FillError {
    #[error("non-finite value {value} cannot be filled")]
    NonFiniteValue { value: f64 },

    #[error("non-finite weight {weight} cannot be filled")]
    NonFiniteWeight { weight: f64 },

    #[error("binning mismatch: {left} vs {right}")]
    BinningMismatch { left: Binning, right: Binning },
}

/// Uniform binning: `bins` bins between `low` and `high`.
///
/// Only `Binning::new` builds one, deserialization included, so `bins >= 1`
/// and `low < high` always hold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawBinning")]
pub struct Binning {
    bins: usize,
    low: f64,
    high: f64,
}

#[derive(Deserialize)]
struct RawBinning {
    bins: usize,
    low: f64,
    high: f64,
}

impl TryFrom<RawBinning> for Binning {
    type Error = Error;

    fn try_from(raw: RawBinning) -> Result<Self> {
        Binning::new(raw.bins, raw.low, raw.high)
    }
}

/// Where a value falls for a given binning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinSlot {
    Underflow,
    Bin(usize),
    Overflow,
}

impl Binning {
    pub fn new(bins: usize, low: f64, high: f64) -> Result<Self> {
        if bins == 0 {
            return Err(Error::Construction("binning needs at least one bin".into()));
        }
        if !low.is_finite() || !high.is_finite() {
            return Err(Error::Construction(format!(
                "binning edges must be finite (low={low}, high={high})"
            )));
        }
        if low >= high {
            return Err(Error::Construction(format!(
                "binning requires low < high (low={low}, high={high})"
            )));
        }
        Ok(Self { bins, low, high })
    }

    pub fn bins(&self) -> usize {
        self.bins
    }

    pub fn low(&self) -> f64 {
        self.low
    }

    pub fn high(&self) -> f64 {
        self.high
    }

    pub fn width(&self) -> f64 {
        (self.high - self.low) / self.bins as f64
    }

    pub fn locate(&self, value: f64) -> BinSlot {
        if value < self.low {
            return BinSlot::Underflow;
        }
        if value >= self.high {
            return BinSlot::Overflow;
        }
        let idx = ((value - self.low) / (self.high - self.low) * self.bins as f64).floor() as usize;
        // Rounding can push values just below `high` onto the upper edge.
        BinSlot::Bin(idx.min(self.bins - 1))
    }

    pub fn bin_low(&self, i: usize) -> f64 {
        self.low + i as f64 * self.width()
    }

    pub fn bin_high(&self, i: usize) -> f64 {
        if i + 1 == self.bins {
            self.high
        } else {
            self.low + (i + 1) as f64 * self.width()
        }
    }

    pub fn bin_center(&self, i: usize) -> f64 {
        0.5 * (self.bin_low(i) + self.bin_high(i))
    }

    /// Bin edges, `bins + 1` of them.
    pub fn edges(&self) -> Vec<f64> {
        (0..self.bins)
            .map(|i| self.bin_low(i))
            .chain(std::iter::once(self.high))
            .collect()
    }
}

impl std::fmt::Display for Binning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({} bins, [{}, {}))", self.bins, self.low, self.high)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramAccumulator {
    binning: Binning,
    /// Sum of weights per in-range bin.
    sumw: Vec<f64>,
    /// Sum of squared weights per in-range bin.
    sumw2: Vec<f64>,
    underflow: f64,
    overflow: f64,
    underflow_sumw2: f64,
    overflow_sumw2: f64,
    /// In-range fills.
    entries: u64,
}

impl HistogramAccumulator {
    pub fn new(binning: Binning) -> Self {
        Self {
            binning,
            sumw: vec![0.0; binning.bins],
            sumw2: vec![0.0; binning.bins],
            underflow: 0.0,
            overflow: 0.0,
            underflow_sumw2: 0.0,
            overflow_sumw2: 0.0,
            entries: 0,
        }
    }

    pub fn with_bins(bins: usize, low: f64, high: f64) -> Result<Self> {
        Ok(Self::new(Binning::new(bins, low, high)?))
    }

    pub fn binning(&self) -> &Binning {
        &self.binning
    }

    pub fn fill(&mut self, value: f64, weight: f64) -> std::result::Result<(), FillError> {
        if !value.is_finite() {
            return Err(FillError::NonFiniteValue { value });
        }
        if !weight.is_finite() {
            return Err(FillError::NonFiniteWeight { weight });
        }
        let w2 = weight * weight;
        match self.binning.locate(value) {
            BinSlot::Underflow => {
                self.underflow += weight;
                self.underflow_sumw2 += w2;
            }
            BinSlot::Overflow => {
                self.overflow += weight;
                self.overflow_sumw2 += w2;
            }
            BinSlot::Bin(i) => {
                self.sumw[i] += weight;
                self.sumw2[i] += w2;
                self.entries += 1;
            }
        }
        Ok(())
    }

    /// Multiply every total (bins and flows) by `factor`; squared sums scale
    /// by `factor²`. Entry counts are untouched.
    pub fn scale(&mut self, factor: f64) {
        let f2 = factor * factor;
        for (w, w2) in self.sumw.iter_mut().zip(self.sumw2.iter_mut()) {
            *w *= factor;
            *w2 *= f2;
        }
        self.underflow *= factor;
        self.overflow *= factor;
        self.underflow_sumw2 *= f2;
        self.overflow_sumw2 *= f2;
    }

    /// Elementwise sum into a new accumulator. Binnings must be identical.
    pub fn add(&self, other: &Self) -> std::result::Result<Self, FillError> {
        if self.binning != other.binning {
            return Err(FillError::BinningMismatch {
                left: self.binning,
                right: other.binning,
            });
        }
        let sum = |a: &[f64], b: &[f64]| a.iter().zip(b).map(|(x, y)| x + y).collect();
        Ok(Self {
            binning: self.binning,
            sumw: sum(&self.sumw, &other.sumw),
            sumw2: sum(&self.sumw2, &other.sumw2),
            underflow: self.underflow + other.underflow,
            overflow: self.overflow + other.overflow,
            underflow_sumw2: self.underflow_sumw2 + other.underflow_sumw2,
            overflow_sumw2: self.overflow_sumw2 + other.overflow_sumw2,
            entries: self.entries + other.entries,
        })
    }

    /// Sum of in-range bin totals; under/overflow are excluded.
    pub fn integral(&self) -> f64 {
        self.sumw.iter().sum()
    }

    /// Copy scaled to unit in-range integral. Empty histograms come back as is.
    pub fn normalized(&self) -> Self {
        let mut out = self.clone();
        let integral = self.integral();
        if integral != 0.0 {
            out.scale(1.0 / integral);
        }
        out
    }

    pub fn entries(&self) -> u64 {
        self.entries
    }

    pub fn contents(&self) -> &[f64] {
        &self.sumw
    }

    pub fn sumw2(&self) -> &[f64] {
        &self.sumw2
    }

    pub fn bin_content(&self, i: usize) -> Option<f64> {
        self.sumw.get(i).copied()
    }

    pub fn bin_error(&self, i: usize) -> Option<f64> {
        self.sumw2.get(i).map(|s| s.sqrt())
    }

    pub fn underflow(&self) -> f64 {
        self.underflow
    }

    pub fn overflow(&self) -> f64 {
        self.overflow
    }

    pub fn underflow_sumw2(&self) -> f64 {
        self.underflow_sumw2
    }

    pub fn overflow_sumw2(&self) -> f64 {
        self.overflow_sumw2
    }

    /// True when nothing has been filled, not even into the flows.
    pub fn is_untouched(&self) -> bool {
        self.entries == 0
            && self.underflow == 0.0
            && self.overflow == 0.0
            && self.sumw.iter().all(|w| *w == 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(bins: usize, low: f64, high: f64) -> HistogramAccumulator {
        HistogramAccumulator::with_bins(bins, low, high).unwrap()
    }

    #[test]
    fn invalid_binning_is_a_construction_error() {
        assert!(matches!(Binning::new(0, 0.0, 1.0), Err(Error::Construction(_))));
        assert!(matches!(Binning::new(10, 1.0, 1.0), Err(Error::Construction(_))));
        assert!(matches!(Binning::new(10, 2.0, 1.0), Err(Error::Construction(_))));
        assert!(matches!(
            Binning::new(10, 0.0, f64::INFINITY),
            Err(Error::Construction(_))
        ));
    }

    #[test]
    fn deserialized_binning_is_validated() {
        let ok: Binning = serde_json::from_str(r#"{"bins":4,"low":0.0,"high":2.0}"#).unwrap();
        assert_eq!((ok.bins(), ok.low(), ok.high()), (4, 0.0, 2.0));

        let err = serde_json::from_str::<Binning>(r#"{"bins":0,"low":0.0,"high":100.0}"#)
            .unwrap_err();
        assert!(err.to_string().contains("at least one bin"), "{err}");
        let err = serde_json::from_str::<Binning>(r#"{"bins":10,"low":100.0,"high":0.0}"#)
            .unwrap_err();
        assert!(err.to_string().contains("low < high"), "{err}");
    }

    #[test]
    fn deserialized_accumulator_checks_its_binning() {
        let hist = h(2, 0.0, 2.0);
        let text = serde_json::to_string(&hist).unwrap();
        assert_eq!(serde_json::from_str::<HistogramAccumulator>(&text).unwrap(), hist);

        let broken = text.replace(r#""bins":2"#, r#""bins":0"#);
        assert!(serde_json::from_str::<HistogramAccumulator>(&broken).is_err());
    }

    #[test]
    fn edges_are_half_open() {
        let mut hist = h(10, 0.0, 100.0);
        hist.fill(0.0, 1.0).unwrap();
        hist.fill(100.0, 2.0).unwrap();
        hist.fill(-0.001, 3.0).unwrap();
        assert_eq!(hist.bin_content(0), Some(1.0));
        assert_eq!(hist.overflow(), 2.0);
        assert_eq!(hist.underflow(), 3.0);
        assert_eq!(hist.entries(), 1);
        assert_eq!(hist.integral(), 1.0);
    }

    #[test]
    fn value_just_below_high_stays_in_range() {
        let mut hist = h(3, 0.0, 0.3);
        let below = f64::from_bits(0.3f64.to_bits() - 1);
        hist.fill(below, 1.0).unwrap();
        assert_eq!(hist.entries(), 1);
        assert_eq!(hist.bin_content(2), Some(1.0));
    }

    #[test]
    fn weights_accumulate_with_squares() {
        let mut hist = h(2, 0.0, 2.0);
        hist.fill(0.5, 2.0).unwrap();
        hist.fill(0.5, 1.0).unwrap();
        hist.fill(1.5, 3.0).unwrap();
        assert_eq!(hist.contents(), &[3.0, 3.0]);
        assert_eq!(hist.sumw2(), &[5.0, 9.0]);
        assert_eq!(hist.bin_error(1), Some(3.0));
    }

    #[test]
    fn non_finite_inputs_are_rejected() {
        let mut hist = h(2, 0.0, 2.0);
        assert!(matches!(
            hist.fill(f64::NAN, 1.0),
            Err(FillError::NonFiniteValue { .. })
        ));
        assert!(matches!(
            hist.fill(1.0, f64::INFINITY),
            Err(FillError::NonFiniteWeight { .. })
        ));
        assert!(hist.is_untouched());
    }

    #[test]
    fn scale_multiplies_bins_and_flows() {
        let mut hist = h(2, 0.0, 2.0);
        hist.fill(0.5, 1.0).unwrap();
        hist.fill(5.0, 1.0).unwrap();
        hist.scale(2.5);
        assert_eq!(hist.integral(), 2.5);
        assert_eq!(hist.overflow(), 2.5);
        assert_eq!(hist.sumw2()[0], 6.25);
        assert_eq!(hist.entries(), 1);
    }

    #[test]
    fn add_requires_identical_binning() {
        let a = h(2, 0.0, 2.0);
        let b = h(3, 0.0, 2.0);
        assert!(matches!(a.add(&b), Err(FillError::BinningMismatch { .. })));
    }

    #[test]
    fn add_sums_elementwise() {
        let mut a = h(2, 0.0, 2.0);
        let mut b = h(2, 0.0, 2.0);
        a.fill(0.5, 1.0).unwrap();
        b.fill(1.5, 2.0).unwrap();
        b.fill(-1.0, 4.0).unwrap();
        let c = a.add(&b).unwrap();
        assert_eq!(c.contents(), &[1.0, 2.0]);
        assert_eq!(c.underflow(), 4.0);
        assert_eq!(c.entries(), 2);
    }

    #[test]
    fn normalized_has_unit_integral() {
        let mut hist = h(4, 0.0, 4.0);
        for v in [0.5, 1.5, 1.5, 3.5] {
            hist.fill(v, 2.0).unwrap();
        }
        let norm = hist.normalized();
        assert!((norm.integral() - 1.0).abs() < 1e-12);
        assert_eq!(h(4, 0.0, 4.0).normalized().integral(), 0.0);
    }

    #[test]
    fn edges_cover_range() {
        let b = Binning::new(4, -2.0, 2.0).unwrap();
        assert_eq!(b.edges(), vec![-2.0, -1.0, 0.0, 1.0, 2.0]);
        assert_eq!(b.bin_center(0), -1.5);
    }
}
