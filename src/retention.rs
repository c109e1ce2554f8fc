// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Retention policies: pure functions mapping (previous target, bytes used
// since the last reset) to the number of bytes an arena keeps allocated
// across the reset. Consulted exactly once per `reset`; trimming itself is
// the arena's job.

/// Capacity retention policy, consulted on every arena reset.
#[derive(Clone)]
pub enum RetentionPolicy {
    /// Keep what the last cycle used: `next = used`.
    Recent,
    /// Keep nothing beyond the head block: `next = 0`.
    Nothing,
    /// Never shrink: `next = max(prev, used)`.
    Everything,
    /// Exponential decay with factor `0 < f < 1`:
    /// `next = max(prev * f, used)`.
    ///
    /// Factors at or below 0 collapse to [`RetentionPolicy::Recent`];
    /// factors at or above 1 collapse to [`RetentionPolicy::Everything`].
    Decay(f64),
    /// User-supplied function of `(prev_target, used)`.
    Custom(fn(u64, u64) -> u64),
}

impl RetentionPolicy {
    /// Compute the new retention target in bytes.
    pub fn next_target(&self, prev: u64, used: u64) -> u64 {
        match *self {
            RetentionPolicy::Recent => used,
            RetentionPolicy::Nothing => 0,
            RetentionPolicy::Everything => prev.max(used),
            RetentionPolicy::Decay(f) => {
                if f <= 0.0 {
                    used
                } else if f >= 1.0 {
                    prev.max(used)
                } else {
                    let decayed = (prev as f64 * f) as u64;
                    decayed.max(used)
                }
            }
            RetentionPolicy::Custom(f) => f(prev, used),
        }
    }
}

impl Default for RetentionPolicy {
    /// The default policy decays the previous target by 10% per reset.
    fn default() -> Self {
        RetentionPolicy::Decay(0.9)
    }
}

impl std::fmt::Debug for RetentionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RetentionPolicy::Recent => f.write_str("Recent"),
            RetentionPolicy::Nothing => f.write_str("Nothing"),
            RetentionPolicy::Everything => f.write_str("Everything"),
            RetentionPolicy::Decay(factor) => f.debug_tuple("Decay").field(factor).finish(),
            RetentionPolicy::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}
