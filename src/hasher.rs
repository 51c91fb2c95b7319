//! Combinatorial hasher: pairs anchor landmarks with future landmarks within
//! a target zone and mixes the pair into a canonical 64-bit hash (spec §4.3).

use crate::models::FingerprintTuple;
use crate::peaks::Landmark;
use twox_hash::XxHash3_64;

/// Fields are bit-packed `freq_anchor:12 | freq_paired:12 | delta_t:12` (36
/// bits used, upper bits zero) before mixing, so the packed value itself is
/// already a deterministic, endianness-independent encoding of the pair.
const FIELD_BITS: u32 = 12;
const FIELD_MASK: u32 = (1 << FIELD_BITS) - 1;

/// Seed for the keyed avalanche mixer. Distinct from [`crate::config::ExtractorConfig::EPOCH_SEED`]
/// so a format change to one never aliases with the other.
const HASH_SEED: u64 = 0x45_43_48_4f_5f_48_41_31; // "ECHO_HA1"

fn pack(freq_anchor: u32, freq_paired: u32, delta_t: u32) -> u64 {
    let f1 = (freq_anchor & FIELD_MASK) as u64;
    let f2 = (freq_paired & FIELD_MASK) as u64;
    let dt = (delta_t & FIELD_MASK) as u64;
    (f1 << (2 * FIELD_BITS)) | (f2 << FIELD_BITS) | dt
}

fn mix(packed: u64) -> u64 {
    XxHash3_64::oneshot_with_seed(HASH_SEED, &packed.to_le_bytes())
}

/// Generates `(hash, anchor_time)` tuples from a landmark list sorted by
/// `t` ascending then `f` ascending.
///
/// For each landmark `i`, pairs it with up to `fan_size` landmarks drawn from
/// `[i + target_zone_start, i + target_zone_width)`. `Δt` is clamped to fit
/// the 12-bit delta field.
pub fn generate_hashes(
    landmarks: &[Landmark],
    fan_size: usize,
    target_zone_start: usize,
    target_zone_width: usize,
) -> Vec<FingerprintTuple> {
    let mut tuples = Vec::new();
    let n = landmarks.len();

    for i in 0..n {
        let anchor = landmarks[i];
        let start = i + target_zone_start;
        let end = (i + target_zone_width).min(n);
        if start >= end {
            continue;
        }

        let mut paired = 0usize;
        for &partner in &landmarks[start..end] {
            if paired >= fan_size {
                break;
            }
            let delta_t = (partner.t - anchor.t).min(FIELD_MASK as usize) as u32;
            let packed = pack(anchor.f as u32, partner.f as u32, delta_t);
            tuples.push(FingerprintTuple {
                hash: mix(packed),
                anchor_time: anchor.t as u32,
            });
            paired += 1;
        }
    }

    tuples
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lm(t: usize, f: usize) -> Landmark {
        Landmark { t, f }
    }

    #[test]
    fn deterministic_across_calls() {
        let landmarks = vec![lm(0, 10), lm(2, 20), lm(5, 15), lm(9, 30)];
        let a = generate_hashes(&landmarks, 5, 1, 75);
        let b = generate_hashes(&landmarks, 5, 1, 75);
        assert_eq!(a, b);
    }

    #[test]
    fn respects_fan_size_upper_bound() {
        let landmarks: Vec<Landmark> = (0..50).map(|i| lm(i, i % 10)).collect();
        let tuples = generate_hashes(&landmarks, 3, 1, 75);
        // landmark 0 can pair with up to target_zone_width-1 candidates but
        // is capped at fan_size = 3.
        let from_first: usize = tuples
            .iter()
            .filter(|t| t.anchor_time == 0)
            .count();
        assert_eq!(from_first, 3);
    }

    #[test]
    fn empty_landmarks_yield_no_hashes() {
        assert!(generate_hashes(&[], 5, 1, 75).is_empty());
    }

    #[test]
    fn last_landmark_has_no_partners() {
        let landmarks = vec![lm(0, 10), lm(1, 20)];
        let tuples = generate_hashes(&landmarks, 5, 1, 75);
        assert!(tuples.iter().all(|t| t.anchor_time == 0));
    }

    #[test]
    fn pack_is_order_sensitive() {
        assert_ne!(pack(1, 2, 3), pack(2, 1, 3));
    }

    #[test]
    fn delta_clamped_to_field_width() {
        let landmarks = vec![lm(0, 5), lm(10_000, 6)];
        let tuples = generate_hashes(&landmarks, 5, 1, 20_000);
        assert_eq!(tuples.len(), 1);
        // A delta beyond the 12-bit field must still clamp rather than panic
        // or wrap silently into a different field.
        let clamped = pack(5, 6, FIELD_MASK);
        assert_eq!(tuples[0].hash, mix(clamped));
    }
}
