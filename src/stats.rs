// Aggregation primitives behind the chart derivations

use crate::chart::BoxSummary;
use std::cmp::Ordering;

/// Equal-width binning over a closed numeric range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinEdges {
    start: f64,
    end: f64,
    width: f64,
    count: usize,
}

impl BinEdges {
    /// `count` equal-width bins spanning `[min, max]` of `values`.
    /// A single distinct value gets one bin of width 1 centred on it.
    pub fn spanning<I>(values: I, count: usize) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for v in values.into_iter().filter(|v| v.is_finite()) {
            if v < min { min = v; }
            if v > max { max = v; }
        }

        if !min.is_finite() || !max.is_finite() || count == 0 {
            return None;
        }

        if min == max {
            Some(BinEdges { start: min - 0.5, end: min + 0.5, width: 1.0, count: 1 })
        } else {
            Some(BinEdges { start: min, end: max, width: (max - min) / count as f64, count })
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Bin holding `x`; the maximum lands in the last bin.
    pub fn index_of(&self, x: f64) -> usize {
        let idx = ((x - self.start) / self.width).floor();
        if idx < 0.0 {
            0
        } else {
            (idx as usize).min(self.count - 1)
        }
    }

    /// Edges of bin `index`; the last bin ends exactly at the maximum.
    pub fn bounds(&self, index: usize) -> (f64, f64) {
        let start = self.start + self.width * index as f64;
        if index + 1 >= self.count {
            (start, self.end)
        } else {
            (start, start + self.width)
        }
    }
}

/// Linear-interpolated quantile of already-sorted values.
pub fn quantile(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let h = (sorted.len() - 1) as f64 * p.clamp(0.0, 1.0);
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    Some(sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo]))
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Quartiles, 1.5 IQR whiskers and outliers of `values`.
pub fn box_summary(category: &str, mut values: Vec<f64>) -> Option<BoxSummary> {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let q1 = quantile(&values, 0.25)?;
    let median = quantile(&values, 0.5)?;
    let q3 = quantile(&values, 0.75)?;
    let iqr = q3 - q1;
    let low_fence = q1 - 1.5 * iqr;
    let high_fence = q3 + 1.5 * iqr;

    let inside = values.iter().copied().filter(|v| *v >= low_fence && *v <= high_fence);
    let lower_whisker = inside.clone().fold(f64::INFINITY, f64::min);
    let upper_whisker = inside.fold(f64::NEG_INFINITY, f64::max);

    let outliers = values
        .iter()
        .copied()
        .filter(|v| *v < low_fence || *v > high_fence)
        .collect();

    Some(BoxSummary {
        category: category.to_string(),
        count: values.len(),
        min: values[0],
        lower_whisker,
        q1,
        median,
        q3,
        upper_whisker,
        max: values[values.len() - 1],
        outliers,
    })
}

/// Count occurrences, keeping keys in order of first appearance.
pub fn value_counts<'a, I>(keys: I) -> Vec<(String, u64)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: Vec<(String, u64)> = Vec::new();
    for key in keys {
        match counts.iter_mut().find(|(k, _)| k == key) {
            Some((_, n)) => *n += 1,
            None => counts.push((key.to_string(), 1)),
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bins_span_range() {
        let edges = BinEdges::spanning(vec![0.0, 10.0], 50).unwrap();
        assert_eq!(edges.count(), 50);
        assert_eq!(edges.bounds(0), (0.0, 0.2));
        assert_eq!(edges.index_of(0.0), 0);
        assert_eq!(edges.index_of(10.0), 49);
        assert_eq!(edges.index_of(5.0), 25);
        assert_eq!(edges.bounds(49).1, 10.0);
    }

    #[test]
    fn test_bins_ignore_non_finite() {
        let edges = BinEdges::spanning(vec![f64::NAN, 2.0, 4.0, f64::INFINITY], 2).unwrap();
        assert_eq!(edges.bounds(0), (2.0, 3.0));
        assert_eq!(edges.bounds(1), (3.0, 4.0));
        assert!(BinEdges::spanning(vec![f64::NAN], 2).is_none());
    }

    #[test]
    fn test_bins_single_value() {
        let edges = BinEdges::spanning(vec![7.0, 7.0], 50).unwrap();
        assert_eq!(edges.count(), 1);
        assert_eq!(edges.bounds(0), (6.5, 7.5));
        assert_eq!(edges.index_of(7.0), 0);
    }

    #[test]
    fn test_bins_empty() {
        assert!(BinEdges::spanning(Vec::<f64>::new(), 50).is_none());
        assert!(BinEdges::spanning(vec![1.0, 2.0], 0).is_none());
    }

    #[test]
    fn test_quantile_linear() {
        let v = vec![1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&v, 0.0), Some(1.0));
        assert_eq!(quantile(&v, 0.25), Some(1.75));
        assert_eq!(quantile(&v, 0.5), Some(2.5));
        assert_eq!(quantile(&v, 1.0), Some(4.0));
        assert_eq!(quantile(&[], 0.5), None);
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[1.0, 2.0, 6.0]), Some(3.0));
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn test_box_summary_with_outlier() {
        let s = box_summary("Male", vec![10.0, 1.0, 2.0, 3.0, 4.0, 100.0]).unwrap();
        assert_eq!(s.category, "Male");
        assert_eq!(s.count, 6);
        assert_eq!(s.min, 1.0);
        assert_eq!(s.max, 100.0);
        assert_eq!(s.q1, 2.25);
        assert_eq!(s.median, 3.5);
        assert_eq!(s.q3, 8.5);
        // fences at -7.125 and 17.875
        assert_eq!(s.lower_whisker, 1.0);
        assert_eq!(s.upper_whisker, 10.0);
        assert_eq!(s.outliers, vec![100.0]);
    }

    #[test]
    fn test_box_summary_single_value() {
        let s = box_summary("A", vec![5.0]).unwrap();
        assert_eq!(s.q1, 5.0);
        assert_eq!(s.median, 5.0);
        assert_eq!(s.lower_whisker, 5.0);
        assert_eq!(s.upper_whisker, 5.0);
        assert!(s.outliers.is_empty());
    }

    #[test]
    fn test_box_summary_empty() {
        assert!(box_summary("A", vec![]).is_none());
    }

    #[test]
    fn test_value_counts_first_appearance() {
        let counts = value_counts(vec!["b", "a", "b", "c", "b"]);
        assert_eq!(
            counts,
            vec![("b".to_string(), 3), ("a".to_string(), 1), ("c".to_string(), 1)]
        );
    }
}
