//! Descriptive statistics used in chart summaries.

use serde::{Deserialize, Serialize};

/// Summary reported alongside data charts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub count: usize,
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
}

impl Summary {
    /// `None` for an empty sample.
    pub fn of(data: &[f64]) -> Option<Self> {
        let sorted = sorted(data);
        if sorted.is_empty() {
            return None;
        }
        let q1 = percentile_sorted(&sorted, 25.0);
        let q3 = percentile_sorted(&sorted, 75.0);
        Some(Self {
            mean: mean(&sorted),
            median: percentile_sorted(&sorted, 50.0),
            std: std_dev(&sorted),
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            count: sorted.len(),
            q1,
            q3,
            iqr: q3 - q1,
        })
    }
}

pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return f64::NAN;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Population standard deviation.
pub fn std_dev(data: &[f64]) -> f64 {
    let m = mean(data);
    let var = data.iter().map(|x| (x - m).powi(2)).sum::<f64>() / data.len() as f64;
    var.sqrt()
}

/// Sample standard deviation (`n - 1` denominator).
pub fn sample_std(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }
    let m = mean(data);
    let var = data.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (data.len() - 1) as f64;
    var.sqrt()
}

pub fn sorted(data: &[f64]) -> Vec<f64> {
    let mut out: Vec<f64> = data.iter().copied().filter(|x| x.is_finite()).collect();
    out.sort_by(f64::total_cmp);
    out
}

/// Percentile with linear interpolation between closest ranks; `q` in `[0, 100]`.
pub fn percentile(data: &[f64], q: f64) -> f64 {
    percentile_sorted(&sorted(data), q)
}

fn percentile_sorted(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let rank = (q.clamp(0.0, 100.0) / 100.0) * (n - 1) as f64;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
        }
    }
}

/// Equal-width bin counts over `[min, max]`, with the last bin closed.
pub fn histogram(data: &[f64], bins: usize) -> (Vec<f64>, Vec<usize>) {
    let sorted = sorted(data);
    let bins = bins.max(1);
    let (lo, hi) = match (sorted.first(), sorted.last()) {
        (Some(lo), Some(hi)) if hi > lo => (*lo, *hi),
        (Some(v), Some(_)) => (v - 0.5, v + 0.5),
        _ => (0.0, 1.0),
    };
    let width = (hi - lo) / bins as f64;
    let edges: Vec<f64> = (0..=bins).map(|i| lo + width * i as f64).collect();
    let mut counts = vec![0usize; bins];
    for x in sorted {
        let idx = (((x - lo) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }
    (edges, counts)
}

/// Least-squares line `(slope, intercept)`; `None` when x has no spread.
pub fn linear_fit(xs: &[f64], ys: &[f64]) -> Option<(f64, f64)> {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return None;
    }
    let mx = mean(&xs[..n]);
    let my = mean(&ys[..n]);
    let sxx: f64 = xs[..n].iter().map(|x| (x - mx).powi(2)).sum();
    if sxx == 0.0 {
        return None;
    }
    let sxy: f64 = xs[..n].iter().zip(&ys[..n]).map(|(x, y)| (x - mx) * (y - my)).sum();
    let slope = sxy / sxx;
    Some((slope, my - slope * mx))
}

/// Gaussian kernel density estimate with Scott's bandwidth, evaluated at `at`.
pub fn gaussian_kde(data: &[f64], at: &[f64]) -> Vec<f64> {
    let n = data.len();
    let sd = sample_std(data);
    if n == 0 || sd == 0.0 {
        return vec![0.0; at.len()];
    }
    let bandwidth = sd * (n as f64).powf(-0.2);
    let norm = 1.0 / (n as f64 * bandwidth * (2.0 * std::f64::consts::PI).sqrt());
    at.iter()
        .map(|x| {
            norm * data
                .iter()
                .map(|d| (-0.5 * ((x - d) / bandwidth).powi(2)).exp())
                .sum::<f64>()
        })
        .collect()
}

/// Pearson correlation between columns of `rows` (observations in rows).
pub fn corrcoef(rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let cols = rows.iter().map(Vec::len).min().unwrap_or(0);
    let columns: Vec<Vec<f64>> = (0..cols)
        .map(|c| rows.iter().map(|r| r[c]).collect())
        .collect();
    let centered: Vec<Vec<f64>> = columns
        .iter()
        .map(|col| {
            let m = mean(col);
            col.iter().map(|v| v - m).collect()
        })
        .collect();
    let norms: Vec<f64> = centered
        .iter()
        .map(|c| c.iter().map(|v| v * v).sum::<f64>().sqrt())
        .collect();
    (0..cols)
        .map(|i| {
            (0..cols)
                .map(|j| {
                    let dot: f64 = centered[i].iter().zip(&centered[j]).map(|(a, b)| a * b).sum();
                    (dot / (norms[i] * norms[j])).clamp(-1.0, 1.0)
                })
                .collect()
        })
        .collect()
}

/// Square, symmetric, unit diagonal and entries in `[-1, 1]`.
pub fn is_correlation_matrix(rows: &[Vec<f64>]) -> bool {
    let n = rows.len();
    n > 0
        && rows.iter().all(|r| r.len() == n)
        && (0..n).all(|i| {
            (rows[i][i] - 1.0).abs() < 1e-9
                && (0..n).all(|j| {
                    let v = rows[i][j];
                    (-1.0..=1.0).contains(&v) && (v - rows[j][i]).abs() < 1e-9
                })
        })
}

pub fn transpose(rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let cols = rows.iter().map(Vec::len).min().unwrap_or(0);
    (0..cols).map(|c| rows.iter().map(|r| r[c]).collect()).collect()
}
