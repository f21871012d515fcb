//! Wrap-safe comparison for `u16` tick counters.
//!
//! Snapshot broadcasts are lossy and may arrive reordered; receivers keep
//! only the latest-by-tick. Ticks wrap every 65536 steps, so a plain `>`
//! would misorder across the wrap. `sequence_greater_than(2, 1)` is true,
//! `sequence_greater_than(0, 65535)` is also true.

/// Returns whether or not a wrapping number is greater than another.
pub fn sequence_greater_than(s1: u16, s2: u16) -> bool {
    ((s1 > s2) && (s1 - s2 <= 32768)) || ((s1 < s2) && (s2 - s1 > 32768))
}

/// Returns whether or not a wrapping number is less than another.
pub fn sequence_less_than(s1: u16, s2: u16) -> bool {
    sequence_greater_than(s2, s1)
}
