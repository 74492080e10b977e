use approx::assert_relative_eq;
use mathviz::stats::{
    corrcoef, gaussian_kde, histogram, is_correlation_matrix, linear_fit, percentile, sample_std,
    transpose, Summary,
};

#[test]
fn summary_uses_linear_percentiles() {
    let s = Summary::of(&[4.0, 1.0, 3.0, 2.0, f64::NAN]).expect("summary");
    assert_eq!(s.count, 4);
    assert_relative_eq!(s.mean, 2.5);
    assert_relative_eq!(s.median, 2.5);
    assert_relative_eq!(s.q1, 1.75);
    assert_relative_eq!(s.q3, 3.25);
    assert_relative_eq!(s.iqr, 1.5);
    assert_relative_eq!(s.std, 1.25_f64.sqrt());
    assert_eq!((s.min, s.max), (1.0, 4.0));
    assert!(Summary::of(&[]).is_none());
}

#[test]
fn percentile_matches_closest_rank_interpolation() {
    let data = [10.0, 20.0, 30.0, 40.0, 50.0];
    assert_relative_eq!(percentile(&data, 0.0), 10.0);
    assert_relative_eq!(percentile(&data, 90.0), 46.0);
    assert_relative_eq!(percentile(&data, 100.0), 50.0);
    assert_relative_eq!(percentile(&[7.0], 25.0), 7.0);
}

#[test]
fn histogram_closes_the_last_bin() {
    let (edges, counts) = histogram(&[0.0, 1.0, 2.0, 3.0, 4.0], 4);
    assert_eq!(edges, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    assert_eq!(counts, vec![1, 1, 1, 2]);
    let (edges, counts) = histogram(&[5.0, 5.0], 2);
    assert_eq!(edges, vec![4.5, 5.0, 5.5]);
    assert_eq!(counts.iter().sum::<usize>(), 2);
}

#[test]
fn linear_fit_recovers_a_line() {
    let xs = [0.0, 1.0, 2.0, 3.0];
    let ys = [1.0, 3.0, 5.0, 7.0];
    let (slope, intercept) = linear_fit(&xs, &ys).expect("fit");
    assert_relative_eq!(slope, 2.0);
    assert_relative_eq!(intercept, 1.0);
    assert!(linear_fit(&[1.0, 1.0], &[2.0, 3.0]).is_none());
}

#[test]
fn kde_integrates_to_about_one() {
    let data = [-1.0, -0.5, 0.0, 0.2, 0.9, 1.4];
    let at: Vec<f64> = (0..=800).map(|k| -8.0 + 0.02 * k as f64).collect();
    let density = gaussian_kde(&data, &at);
    let area: f64 = density.iter().map(|d| d * 0.02).sum();
    assert_relative_eq!(area, 1.0, epsilon = 1e-3);
    assert_relative_eq!(sample_std(&[1.0, 3.0]), 2.0_f64.sqrt());
}

#[test]
fn correlation_of_columns() {
    let rows = vec![
        vec![1.0, 2.0, 3.0],
        vec![2.0, 4.0, 1.0],
        vec![3.0, 6.0, 2.0],
    ];
    let r = corrcoef(&rows);
    assert_relative_eq!(r[0][0], 1.0, epsilon = 1e-12);
    assert_relative_eq!(r[0][1], 1.0, epsilon = 1e-12);
    assert_relative_eq!(r[0][2], -0.5, epsilon = 1e-12);
    assert!(is_correlation_matrix(&r));
    assert!(!is_correlation_matrix(&rows));
    assert_eq!(transpose(&[vec![1.0, 2.0], vec![3.0, 4.0]]), vec![vec![1.0, 3.0], vec![2.0, 4.0]]);
}
