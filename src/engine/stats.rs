//! Descriptive statistics over simulated samples
//!
//! Functions that can hit a zero or negative denominator return `None`
//! instead of letting NaN/inf leak into results.

/// Arithmetic mean; `None` for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample variance (n - 1 denominator); `None` for fewer than two values
pub fn sample_variance(values: &[f64], mean: f64) -> Option<f64> {
    let n = values.len();
    if n < 2 {
        return None;
    }
    Some(values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64)
}

/// Population variance (n denominator); `None` for an empty slice
pub fn population_variance(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    Some(values.iter().map(|x| (x - m).powi(2)).sum::<f64>() / values.len() as f64)
}

/// Median of an ascending slice
pub fn median(sorted: &[f64]) -> Option<f64> {
    let n = sorted.len();
    match n {
        0 => None,
        _ if n % 2 == 1 => Some(sorted[n / 2]),
        _ => Some((sorted[n / 2 - 1] + sorted[n / 2]) / 2.0),
    }
}

/// Index of the `confidence` percentile: floor(n * c), clamped to the last element
pub fn percentile_index(n: usize, confidence: f64) -> usize {
    let idx = (n as f64 * confidence).floor() as usize;
    idx.min(n.saturating_sub(1))
}

/// Value at the `confidence` percentile of an ascending slice
pub fn percentile(sorted: &[f64], confidence: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    Some(sorted[percentile_index(sorted.len(), confidence)])
}

/// Bias-corrected sample skewness (G1)
pub fn skewness(values: &[f64], mean: f64, std_dev: Option<f64>) -> Option<f64> {
    let n = values.len();
    let s = std_dev.filter(|s| *s > 0.0)?;
    if n < 3 {
        return None;
    }
    let nf = n as f64;
    let m3: f64 = values.iter().map(|x| ((x - mean) / s).powi(3)).sum();
    Some(nf / ((nf - 1.0) * (nf - 2.0)) * m3)
}

/// Bias-corrected sample excess kurtosis (G2)
pub fn kurtosis(values: &[f64], mean: f64, std_dev: Option<f64>) -> Option<f64> {
    let n = values.len();
    let s = std_dev.filter(|s| *s > 0.0)?;
    if n < 4 {
        return None;
    }
    let nf = n as f64;
    let m4: f64 = values.iter().map(|x| ((x - mean) / s).powi(4)).sum();
    let lead = nf * (nf + 1.0) / ((nf - 1.0) * (nf - 2.0) * (nf - 3.0));
    let correction = 3.0 * (nf - 1.0).powi(2) / ((nf - 2.0) * (nf - 3.0));
    Some(lead * m4 - correction)
}

/// Pearson correlation; `None` when lengths differ, n < 2 or either series is constant
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let mx = mean(xs)?;
    let my = mean(ys)?;

    let mut cov = 0.0;
    let mut vx = 0.0;
    let mut vy = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mx;
        let dy = y - my;
        cov += dx * dy;
        vx += dx * dx;
        vy += dy * dy;
    }

    if vx <= 0.0 || vy <= 0.0 {
        return None;
    }
    let r = cov / (vx.sqrt() * vy.sqrt());
    r.is_finite().then(|| r.clamp(-1.0, 1.0))
}
