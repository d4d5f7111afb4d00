//! Frequency table resolution shared by the platforms.

use crate::governor::{Bounds, Error, Relation, UnitId};

/// Sorted set of frequencies (kHz) a unit supports. Empty means continuous scaling.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrequencyTable {
    freqs: Vec<u32>,
}

impl FrequencyTable {
    pub fn new(mut freqs: Vec<u32>) -> Self {
        freqs.retain(|f| *f != 0);
        freqs.sort_unstable();
        freqs.dedup();
        Self { freqs }
    }

    /// Parses a whitespace separated list, e.g. `scaling_available_frequencies`.
    pub fn parse(s: &str) -> Option<Self> {
        s.split_whitespace()
            .map(|f| f.parse::<u32>().ok())
            .collect::<Option<Vec<u32>>>()
            .map(Self::new)
    }

    pub fn freqs(&self) -> &[u32] {
        &self.freqs
    }

    pub fn is_continuous(&self) -> bool {
        self.freqs.is_empty()
    }

    /// Resolves a request to the frequency the unit would actually run at.
    ///
    /// The target is clamped into the bounds first, then matched against the
    /// entries that lie inside the bounds.
    pub fn resolve(
        &self,
        unit: UnitId,
        target: u32,
        relation: Relation,
        bounds: &Bounds,
    ) -> Result<u32, Error> {
        let invalid = Error::InvalidFrequency {
            unit,
            freq: target,
            relation,
        };
        if bounds.min > bounds.max {
            return Err(invalid);
        }

        let clamped = target.clamp(bounds.min, bounds.max);
        if self.is_continuous() {
            return Ok(clamped);
        }

        let in_range: Vec<u32> = self
            .freqs
            .iter()
            .copied()
            .filter(|f| bounds.contains(*f))
            .collect();
        let (first, last) = match (in_range.first(), in_range.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return Err(invalid),
        };

        let picked = match relation {
            Relation::AtOrBelow => in_range
                .iter()
                .rev()
                .find(|f| **f <= clamped)
                .copied()
                .unwrap_or(first),
            Relation::AtOrAbove => in_range
                .iter()
                .find(|f| **f >= clamped)
                .copied()
                .unwrap_or(last),
        };
        Ok(picked)
    }
}
