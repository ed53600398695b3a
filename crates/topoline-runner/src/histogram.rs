//! Elevation histogram over masked tile samples.

use std::collections::BTreeMap;

/// Sample counts per fixed-width elevation bucket.
///
/// Bucket `i` covers `[i * bucket_size, (i + 1) * bucket_size)`. Merging is
/// associative and commutative, so per-tile histograms can be combined in any
/// order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ElevationHistogram {
    bucket_size: f64,
    counts: BTreeMap<i64, u64>,
}

impl ElevationHistogram {
    /// An empty histogram.
    pub fn new(bucket_size: f64) -> Self {
        Self {
            bucket_size,
            counts: BTreeMap::new(),
        }
    }

    /// Bucket width in meters; zero for a default-constructed histogram.
    pub fn bucket_size(&self) -> f64 {
        self.bucket_size
    }

    /// Count one sample.
    ///
    /// Buckets floor toward negative infinity, so -0.5 m lands in the bucket
    /// below zero rather than being truncated into the zero bucket.
    pub fn add(&mut self, elevation: f64) {
        if !elevation.is_finite() || self.bucket_size <= 0.0 {
            return;
        }
        let bucket = (elevation / self.bucket_size).floor() as i64;
        *self.counts.entry(bucket).or_insert(0) += 1;
    }

    /// Add the counts of `other`.
    ///
    /// An empty default histogram adopts the other's bucket size, which makes
    /// it the identity for merging.
    ///
    /// # Panics
    /// Panics if both histograms have a bucket size and they differ.
    pub fn merge(&mut self, other: ElevationHistogram) {
        if self.bucket_size == 0.0 {
            self.bucket_size = other.bucket_size;
        } else if other.bucket_size != 0.0 {
            assert_eq!(
                self.bucket_size, other.bucket_size,
                "cannot merge histograms with different bucket sizes"
            );
        }
        for (bucket, count) in other.counts {
            *self.counts.entry(bucket).or_insert(0) += count;
        }
    }

    /// Non-empty buckets as `(lower bound, count)`, lowest first.
    pub fn buckets(&self) -> impl Iterator<Item = (f64, u64)> + '_ {
        self.counts
            .iter()
            .map(move |(&bucket, &count)| (bucket as f64 * self.bucket_size, count))
    }

    /// Total samples counted.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }
}

impl Extend<f64> for ElevationHistogram {
    fn extend<I: IntoIterator<Item = f64>>(&mut self, iter: I) {
        for elevation in iter {
            self.add(elevation);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buckets_floor() {
        let mut hist = ElevationHistogram::new(100.0);
        hist.extend([0.0, 99.9, 100.0, -0.5, -100.0, f64::NAN]);
        let buckets: Vec<_> = hist.buckets().collect();
        assert_eq!(buckets, vec![(-100.0, 2), (0.0, 2), (100.0, 1)]);
        assert_eq!(hist.total(), 5);
    }

    #[test]
    fn test_merge_is_order_independent() {
        let mut a = ElevationHistogram::new(10.0);
        a.extend([1.0, 2.0, 15.0]);
        let mut b = ElevationHistogram::new(10.0);
        b.extend([12.0, 35.0]);

        let mut ab = ElevationHistogram::default();
        ab.merge(a.clone());
        ab.merge(b.clone());
        let mut ba = b;
        ba.merge(a);
        assert_eq!(ab, ba);
        assert_eq!(ab.total(), 5);
        assert_eq!(ab.bucket_size(), 10.0);
    }
}
