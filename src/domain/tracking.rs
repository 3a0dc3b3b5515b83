//! Human-facing order tracking numbers: `PREFIX-12345678-AB3Z`.

use chrono::{DateTime, Utc};
use rand::Rng;

const SUFFIX_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const SUFFIX_LEN: usize = 4;
const STAMP_DIGITS: i64 = 100_000_000;

/// Builds a tracking number from the last 8 digits of the epoch-millisecond
/// clock and a 4-character random suffix.
pub fn generate<R: Rng>(prefix: &str, now: DateTime<Utc>, rng: &mut R) -> String {
    let stamp = now.timestamp_millis().rem_euclid(STAMP_DIGITS);
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| {
            let idx = rng.random_range(0..SUFFIX_CHARSET.len());
            SUFFIX_CHARSET.get(idx).copied().map_or('0', char::from)
        })
        .collect();
    format!("{prefix}-{stamp:08}-{suffix}")
}

pub fn is_well_formed(tracking_number: &str) -> bool {
    let mut parts = tracking_number.split('-');
    let (Some(prefix), Some(stamp), Some(suffix), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    !prefix.is_empty()
        && prefix.bytes().all(|b| b.is_ascii_uppercase())
        && stamp.len() == 8
        && stamp.bytes().all(|b| b.is_ascii_digit())
        && suffix.len() == SUFFIX_LEN
        && suffix.bytes().all(|b| SUFFIX_CHARSET.contains(&b))
}
