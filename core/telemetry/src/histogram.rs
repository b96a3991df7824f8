//! Fixed-band latency histogram.

use serde::Serialize;

/// Band edges in milliseconds; band `i` is `[EDGES_MS[i], EDGES_MS[i + 1])`
pub const EDGES_MS: [f64; LatencyHistogram::BANDS + 1] =
    [0.0, 1.0, 2.0, 5.0, 10.0, 20.0, 50.0, 100.0, f64::INFINITY];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LatencyHistogram {
    counts: [u64; LatencyHistogram::BANDS],
}

impl LatencyHistogram {
    pub const BANDS: usize = 8;

    /// Column labels, one per band
    pub const LABELS: [&'static str; Self::BANDS] = [
        "Bin_0_1ms",
        "Bin_1_2ms",
        "Bin_2_5ms",
        "Bin_5_10ms",
        "Bin_10_20ms",
        "Bin_20_50ms",
        "Bin_50_100ms",
        "Bin_100pms",
    ];

    pub fn from_samples(samples_ms: &[f64]) -> Self {
        let mut hist = Self::default();
        for &ms in samples_ms {
            hist.counts[Self::band(ms)] += 1;
        }
        hist
    }

    /// Band index for one sample. Negative samples land in the first band,
    /// NaN in the last.
    pub fn band(ms: f64) -> usize {
        EDGES_MS[1..Self::BANDS]
            .iter()
            .position(|&upper| ms < upper)
            .unwrap_or(Self::BANDS - 1)
    }

    pub fn counts(&self) -> [u64; Self::BANDS] {
        self.counts
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }
}
