//! Adaptive-threshold local-maximum peak picker (spec §4.2).

use crate::spectrogram::Spectrogram;

/// A single `(t, f)` landmark cell picked out of a spectrogram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Landmark {
    pub t: usize,
    pub f: usize,
}

/// Picks landmarks from `spec`, restricted to the frequency bin range
/// `[lo_bin, hi_bin]` (inclusive), using neighbourhood radius `radius` and
/// percentile threshold `percentile_pct`.
///
/// Returns landmarks sorted by `t` ascending then `f` ascending, as required
/// by the hasher's target-zone walk.
pub fn pick_peaks(
    spec: &Spectrogram,
    radius: usize,
    percentile_pct: f64,
    lo_bin: usize,
    hi_bin: usize,
) -> Vec<Landmark> {
    if spec.is_empty() || spec.num_frames < 3 || spec.num_bins < 3 {
        return Vec::new();
    }

    let threshold = percentile(spec, percentile_pct);

    let f_start = lo_bin.max(1);
    let f_end = hi_bin.min(spec.num_bins - 2);
    if f_start > f_end {
        return Vec::new();
    }

    let mut landmarks = Vec::new();
    for t in 1..spec.num_frames - 1 {
        for f in f_start..=f_end {
            let value = spec.get(t, f);
            if value < threshold {
                continue;
            }
            let (max_val, argmax) = local_max_and_argmax(spec, t, f, radius);
            if value == max_val && argmax == (t, f) {
                landmarks.push(Landmark { t, f });
            }
        }
    }

    landmarks.sort_by_key(|l| (l.t, l.f));
    landmarks
}

fn percentile(spec: &Spectrogram, pct: f64) -> f64 {
    let mut values: Vec<f64> = (0..spec.num_frames * spec.num_bins)
        .map(|i| spec.get(i / spec.num_bins, i % spec.num_bins))
        .collect();
    if values.is_empty() {
        return crate::spectrogram::DB_FLOOR;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap());

    let n = values.len();
    let rank = (pct / 100.0) * (n as f64 - 1.0);
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        values[lo]
    } else {
        let frac = rank - lo as f64;
        values[lo] + (values[hi] - values[lo]) * frac
    }
}

/// Finds the maximum value in the `(2*radius+1)^2` window around `(t, f)`
/// (clipped to the spectrogram bounds) and the lexicographically smallest
/// position achieving it, so ties within overlapping neighbourhoods always
/// resolve to a single peak (spec §4.2 rule 3).
fn local_max_and_argmax(
    spec: &Spectrogram,
    t: usize,
    f: usize,
    radius: usize,
) -> (f64, (usize, usize)) {
    let t_lo = t.saturating_sub(radius);
    let t_hi = (t + radius).min(spec.num_frames - 1);
    let f_lo = f.saturating_sub(radius);
    let f_hi = (f + radius).min(spec.num_bins - 1);

    let mut max_val = f64::MIN;
    let mut argmax = (t_lo, f_lo);
    for tt in t_lo..=t_hi {
        for ff in f_lo..=f_hi {
            let v = spec.get(tt, ff);
            if v > max_val || (v == max_val && (tt, ff) < argmax) {
                max_val = v;
                argmax = (tt, ff);
            }
        }
    }
    (max_val, argmax)
}
