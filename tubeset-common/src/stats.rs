//! Dataset statistics for the browse view

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use std::collections::HashMap;

use crate::record::{Collection, Record};

/// Number of equal-width bins used for distributions
pub const HISTOGRAM_BINS: usize = 20;

/// Records per category
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: usize,
}

/// Equal-width histogram; `edges.len() == counts.len() + 1` unless empty
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Histogram {
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

impl Histogram {
    /// Bin `values` into `bins` equal-width buckets spanning their range
    ///
    /// The last bin is closed on the right. A degenerate range (all values
    /// equal) is widened by 0.5 on each side.
    pub fn compute(values: &[f64], bins: usize) -> Self {
        if values.is_empty() || bins == 0 {
            return Self::default();
        }

        let mut min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let mut max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if min == max {
            min -= 0.5;
            max += 0.5;
        }

        let width = (max - min) / bins as f64;
        let edges = (0..=bins).map(|i| min + width * i as f64).collect();

        let mut counts = vec![0usize; bins];
        for &value in values {
            let index = (((value - min) / width).floor() as usize).min(bins - 1);
            counts[index] += 1;
        }

        Self { edges, counts }
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}

/// Summary of a collection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetStats {
    pub total_entries: usize,
    /// Sorted by count (descending), then name
    pub categories: Vec<CategoryCount>,
    pub views: Histogram,
    pub title_lengths: Histogram,
}

impl DatasetStats {
    pub fn compute(collection: &Collection) -> Self {
        let mut by_category: HashMap<&str, usize> = HashMap::new();
        for record in collection {
            *by_category.entry(record.category.as_str()).or_insert(0) += 1;
        }

        let mut categories: Vec<CategoryCount> = by_category
            .into_iter()
            .map(|(category, count)| CategoryCount {
                category: category.to_string(),
                count,
            })
            .collect();
        categories.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.category.cmp(&b.category)));

        let views: Vec<f64> = collection.iter().map(|r| r.video_views as f64).collect();
        let title_lengths: Vec<f64> = collection
            .iter()
            .map(|r| r.title_analysis.title_length as f64)
            .collect();

        Self {
            total_entries: collection.len(),
            categories,
            views: Histogram::compute(&views, HISTOGRAM_BINS),
            title_lengths: Histogram::compute(&title_lengths, HISTOGRAM_BINS),
        }
    }
}

/// Uniform random subset of `min(n, len)` records
pub fn sample(collection: &Collection, n: usize) -> Vec<Record> {
    sample_with(collection, n, &mut rand::thread_rng())
}

pub fn sample_with<R: Rng + ?Sized>(collection: &Collection, n: usize, rng: &mut R) -> Vec<Record> {
    collection
        .records()
        .choose_multiple(rng, n)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::tests::record;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn test_histogram_basic_binning() {
        let histogram = Histogram::compute(&[0.0, 1.0, 2.0, 3.0, 4.0], 4);
        assert_eq!(histogram.edges, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        // Max value lands in the closed last bin
        assert_eq!(histogram.counts, vec![1, 1, 1, 2]);
    }

    #[test]
    fn test_histogram_degenerate_range() {
        let histogram = Histogram::compute(&[7.0, 7.0, 7.0], 20);
        assert_eq!(histogram.counts.len(), 20);
        assert_eq!(histogram.total(), 3);
        assert!((histogram.edges[0] - 6.5).abs() < 1e-9);
        assert!((histogram.edges[20] - 7.5).abs() < 1e-9);
    }

    #[test]
    fn test_histogram_empty() {
        let histogram = Histogram::compute(&[], 20);
        assert!(histogram.edges.is_empty());
        assert!(histogram.counts.is_empty());
    }

    #[test]
    fn test_category_counts_sorted() {
        let mut a = record("a", "x");
        a.category = "Gaming".to_string();
        let mut b = record("b", "x");
        b.category = "Music".to_string();
        let mut c = record("c", "x");
        c.category = "Music".to_string();
        let mut d = record("d", "x");
        d.category = "Education".to_string();

        let collection = Collection::from_records(vec![a, b, c, d]).unwrap();
        let stats = DatasetStats::compute(&collection);

        assert_eq!(stats.total_entries, 4);
        let names: Vec<_> = stats.categories.iter().map(|c| c.category.as_str()).collect();
        assert_eq!(names, vec!["Music", "Education", "Gaming"]);
        assert_eq!(stats.categories[0].count, 2);
        assert_eq!(stats.views.total(), 4);
        assert_eq!(stats.title_lengths.total(), 4);
    }

    #[test]
    fn test_sample_size_and_uniqueness() {
        let collection = Collection::from_records(
            (0..30).map(|i| record(&format!("id{}", i), "t")).collect(),
        )
        .unwrap();

        let mut rng = StdRng::seed_from_u64(7);
        let picked = sample_with(&collection, 12, &mut rng);
        assert_eq!(picked.len(), 12);
        let ids: HashSet<_> = picked.iter().map(|r| r.unique_id.clone()).collect();
        assert_eq!(ids.len(), 12);

        assert_eq!(sample(&collection, 100).len(), 30);
    }
}
