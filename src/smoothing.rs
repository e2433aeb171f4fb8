//! Elevation gap filling and low-pass smoothing.
//!
//! Consumer GPS and barometric altimeters jitter by a few meters from sample
//! to sample. Summing raw positive deltas turns that jitter into phantom
//! climbing, so gain/loss is always computed on the smoothed series.

/// Fill absent elevations from their nearest known neighbours.
///
/// Interior gaps are linearly interpolated by sample index; leading and
/// trailing gaps take the nearest known value. Returns `None` when no
/// sample carries an elevation at all.
pub fn fill_gaps(elevations: &[Option<f64>]) -> Option<Vec<f64>> {
    let first_known = elevations.iter().position(Option::is_some)?;
    let last_known = elevations.iter().rposition(Option::is_some)?;
    let mut filled = Vec::with_capacity(elevations.len());
    let mut prev: (usize, f64) = (first_known, elevations[first_known]?);
    let mut next: Option<(usize, f64)> = None;

    for (i, ele) in elevations.iter().enumerate() {
        match ele {
            Some(v) => {
                prev = (i, *v);
                filled.push(*v);
            }
            None if i < first_known || i > last_known => filled.push(prev.1),
            None => {
                if next.is_none_or(|(j, _)| j < i) {
                    next = elevations[i + 1..]
                        .iter()
                        .enumerate()
                        .find_map(|(k, e)| e.map(|v| (i + 1 + k, v)));
                }
                // Interior gap, so a later known sample exists.
                match next {
                    Some((j, next_v)) => {
                        let t = (i - prev.0) as f64 / (j - prev.0) as f64;
                        filled.push(prev.1 + t * (next_v - prev.1));
                    }
                    None => filled.push(prev.1),
                }
            }
        }
    }

    Some(filled)
}

/// Centered moving average with a shrinking symmetric window at the ends.
///
/// Sample `i` averages `[i - h, i + h]` where `h = min(half_window, i, n - 1 - i)`.
/// The window stays symmetric, so linear runs pass through unchanged, the
/// end points keep their recorded values, and monotone input stays monotone.
pub fn moving_average(values: &[f64], half_window: usize) -> Vec<f64> {
    let n = values.len();
    if half_window == 0 || n < 3 {
        return values.to_vec();
    }

    (0..n)
        .map(|i| {
            let h = half_window.min(i).min(n - 1 - i);
            if h == 0 {
                return values[i];
            }
            let window = &values[i - h..=i + h];
            window.iter().sum::<f64>() / window.len() as f64
        })
        .collect()
}

/// Fill gaps, then smooth. Output has the same length as the input.
pub fn smooth_elevations(elevations: &[Option<f64>], half_window: usize) -> Option<Vec<f64>> {
    let filled = fill_gaps(elevations)?;
    Some(moving_average(&filled, half_window))
}
