//! This module holds some utilities for working with the set of signers that
//! contributed shares.
//!
//! Signer nodes are identified by their `shareIndex`, which is neither
//! contiguous nor ordered.

use std::collections::HashSet;

/// Represents a sorted list of share indices.
#[derive(Debug)]
pub struct ParticipantList {
    participants: Vec<u32>,
}

impl ParticipantList {
    /// Create a participant list from a slice of share indices.
    ///
    /// This will return None if the participants have duplicates.
    pub fn new(participants: &[u32]) -> Option<Self> {
        let mut out = participants.to_owned();
        out.sort_unstable();

        if out.windows(2).any(|w| w[0] == w[1]) {
            return None;
        }

        Some(Self { participants: out })
    }

    /// The first index that appears more than once, if any.
    pub fn first_duplicate(participants: &[u32]) -> Option<u32> {
        let mut seen = HashSet::with_capacity(participants.len());
        participants.iter().find(|p| !seen.insert(**p)).copied()
    }

    /// The share indices, in ascending order.
    pub fn indices(&self) -> &[u32] {
        &self.participants
    }

    /// Get the lagrange coefficient at zero for a participant, relative to this list.
    ///
    /// Participant `p` is evaluated at the point `p + 1`.
    #[cfg(test)]
    pub fn lagrange<C: crate::compat::EcdsaCurve>(&self, p: u32) -> Option<C::Scalar> {
        use elliptic_curve::Field;

        let scalar = |x: u32| C::Scalar::from(u64::from(x) + 1);
        let p_scalar = scalar(p);

        let mut num = C::Scalar::ONE;
        let mut den = C::Scalar::ONE;
        for &q in &self.participants {
            if q == p {
                continue;
            }
            let q_scalar = scalar(q);
            num *= q_scalar;
            den *= q_scalar - p_scalar;
        }

        Option::<C::Scalar>::from(den.invert()).map(|inv| num * inv)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_duplicates_are_rejected() {
        assert!(ParticipantList::new(&[4, 1, 9]).is_some());
        assert!(ParticipantList::new(&[4, 1, 4]).is_none());
        assert_eq!(ParticipantList::first_duplicate(&[4, 1, 9, 1]), Some(1));
        assert_eq!(ParticipantList::first_duplicate(&[4, 1, 9]), None);
    }

    #[test]
    fn test_indices_are_sorted() {
        let list = ParticipantList::new(&[7, 2]).unwrap();
        assert_eq!(list.indices(), &[2, 7]);
    }
}
