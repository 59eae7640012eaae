use std::collections::BTreeMap;

use crate::{LipidError, Result};

/// How many double bonds a chain (or ring) carries, plus an optional sparse
/// map of bond position → stereo descriptor.
///
/// Invariant: when any positions are recorded, there must be exactly one per
/// counted double bond. Positions iterate in ascending order.
#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct DoubleBonds {
    count: i32,
    positions: BTreeMap<i32, Option<String>>,
}

impl DoubleBonds {
    pub fn new(count: i32) -> Self {
        Self {
            count,
            positions: BTreeMap::new(),
        }
    }

    /// Builds a ledger from an explicit position map; the count is the map's
    /// size, so the consistency invariant holds by construction.
    pub fn from_positions(positions: BTreeMap<i32, Option<String>>) -> Self {
        Self {
            count: i32::try_from(positions.len()).unwrap_or(i32::MAX),
            positions,
        }
    }

    /// Builds a ledger from a count plus an optional position map, failing
    /// fast when the two disagree.
    pub fn checked(count: i32, positions: Option<BTreeMap<i32, Option<String>>>) -> Result<Self> {
        let positions = positions.unwrap_or_default();
        if !positions.is_empty() && positions.len() != usize::try_from(count).unwrap_or(0) {
            return Err(LipidError::constraint(format!(
                "{} double bond positions recorded for a count of {count}",
                positions.len(),
            )));
        }
        Ok(Self { count, positions })
    }

    pub fn count(&self) -> i32 {
        self.count
    }

    pub fn positions(&self) -> &BTreeMap<i32, Option<String>> {
        &self.positions
    }

    pub fn has_full_stereo(&self) -> bool {
        !self.positions.is_empty() && self.positions.values().all(Option::is_some)
    }

    pub(crate) fn shift_positions(&mut self, shift: i32) {
        self.positions = std::mem::take(&mut self.positions)
            .into_iter()
            .map(|(position, stereo)| (position + shift, stereo))
            .collect();
    }

    pub(crate) fn add_position(&mut self, inserted: i32) {
        self.positions = std::mem::take(&mut self.positions)
            .into_iter()
            .map(|(position, stereo)| {
                if position >= inserted {
                    (position + 1, stereo)
                } else {
                    (position, stereo)
                }
            })
            .collect();
    }

    /// Removes and returns every recorded position within `[start, end]`,
    /// decrementing the count to match.
    pub(crate) fn drain_range(&mut self, start: i32, end: i32) -> Vec<(i32, Option<String>)> {
        let (drained, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.positions)
            .into_iter()
            .partition(|&(position, _)| start <= position && position <= end);
        self.positions = kept.into_iter().collect();
        self.count -= i32::try_from(drained.len()).unwrap_or(0);
        drained
    }

    pub(crate) fn drain_all(&mut self) -> Vec<(i32, Option<String>)> {
        self.drain_range(i32::MIN, i32::MAX)
    }

    pub(crate) fn absorb(&mut self, entries: Vec<(i32, Option<String>)>) {
        self.count += i32::try_from(entries.len()).unwrap_or(0);
        self.positions.extend(entries);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn positions(entries: &[(i32, Option<&str>)]) -> BTreeMap<i32, Option<String>> {
        entries
            .iter()
            .map(|&(p, s)| (p, s.map(str::to_owned)))
            .collect()
    }

    #[test]
    fn mismatched_count_fails_fast() {
        let result = DoubleBonds::checked(2, Some(positions(&[(9, Some("Z"))])));
        assert!(matches!(
            *result.unwrap_err(),
            crate::LipidError::ConstraintViolation { .. }
        ));
    }

    #[test]
    fn matching_count_is_accepted() {
        let ledger =
            DoubleBonds::checked(2, Some(positions(&[(9, Some("Z")), (12, Some("Z"))]))).unwrap();
        assert_eq!(ledger.count(), 2);
        assert!(ledger.has_full_stereo());

        // An empty map is fine for any count
        let ledger = DoubleBonds::checked(3, None).unwrap();
        assert_eq!(ledger.count(), 3);
        assert!(ledger.positions().is_empty());
    }

    #[test]
    fn renumbering() {
        let mut ledger = DoubleBonds::from_positions(positions(&[(9, None), (12, None)]));
        ledger.add_position(10);
        assert_eq!(
            ledger.positions().keys().copied().collect::<Vec<_>>(),
            vec![9, 13]
        );
        ledger.shift_positions(2);
        assert_eq!(
            ledger.positions().keys().copied().collect::<Vec<_>>(),
            vec![11, 15]
        );
        assert_eq!(ledger.count(), 2);
    }

    #[test]
    fn drain_and_absorb_round_trip() {
        let mut ledger = DoubleBonds::from_positions(positions(&[(5, None), (9, None), (14, None)]));
        let drained = ledger.drain_range(8, 12);
        assert_eq!(drained, vec![(9, None)]);
        assert_eq!(ledger.count(), 2);
        ledger.absorb(drained);
        assert_eq!(ledger.count(), 3);
        assert_eq!(
            ledger.positions().keys().copied().collect::<Vec<_>>(),
            vec![5, 9, 14]
        );
    }
}
