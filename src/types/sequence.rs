//! Message sequence sets.
//!
//! Although named a sequence, there is no requirement for the numbers to
//! be consecutive: `{1, 2, 3, 10, 15}` is a perfectly valid set. What the
//! type does enforce is that the four shapes a set can take are never
//! mixed: a single number can grow into a distinct set, but a range or an
//! open-ended set is frozen at construction.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// A set of message sequence numbers or UIDs, ready for wire
/// serialisation.
#[derive(Debug, Clone)]
pub enum Sequence {
    /// A single number.
    Single(u32),
    /// A closed range `lo:hi`.
    Range(u32, u32),
    /// An open range `lo:*`.
    From(u32),
    /// A sorted set of distinct numbers.
    Set(BTreeSet<u32>),
}

impl Sequence {
    /// A sequence holding one number. Can later be grown with [`Sequence::add`].
    pub fn single(n: u32) -> Self {
        Sequence::Single(n)
    }

    /// A closed range. Grows never.
    pub fn range(lo: u32, hi: u32) -> Self {
        Sequence::Range(lo, hi)
    }

    /// A sequence growing from `lo` to the current mailbox maximum (`lo:*`).
    pub fn starting_at(lo: u32) -> Self {
        Sequence::From(lo)
    }

    /// Adds a number.
    ///
    /// Only single numbers and distinct sets accept additions; trying to
    /// extend a range or an open-ended set is a contract violation.
    pub fn add(&mut self, n: u32) -> Result<&mut Self, Error> {
        match self {
            Sequence::Single(first) => {
                let mut set = BTreeSet::new();
                set.insert(*first);
                set.insert(n);
                *self = Sequence::Set(set);
                Ok(self)
            }
            Sequence::Set(set) => {
                set.insert(n);
                Ok(self)
            }
            Sequence::Range(..) | Sequence::From(..) => Err(Error::InvalidArgument(
                "cannot add a distinct number to a range".to_string(),
            )),
        }
    }

    /// The set as sorted disjoint intervals; `None` as upper bound means
    /// `*`. This is the canonical form used for comparison and printing.
    fn intervals(&self) -> Vec<(u32, Option<u32>)> {
        match self {
            Sequence::Single(n) => vec![(*n, Some(*n))],
            Sequence::Range(lo, hi) => vec![(*lo.min(hi), Some(*lo.max(hi)))],
            Sequence::From(lo) => vec![(*lo, None)],
            Sequence::Set(set) => {
                let mut runs: Vec<(u32, Option<u32>)> = Vec::new();
                for &n in set {
                    match runs.last_mut() {
                        Some((_, Some(hi))) if *hi + 1 == n => *hi = n,
                        _ => runs.push((n, Some(n))),
                    }
                }
                runs
            }
        }
    }

    /// Iterates the contained numbers. Panics on open-ended sets, which
    /// have no enumerable upper bound; callers resolve `*` against the
    /// mailbox size first.
    pub fn iter(&self) -> Box<dyn Iterator<Item = u32> + '_> {
        match self {
            Sequence::Single(n) => Box::new(std::iter::once(*n)),
            Sequence::Range(lo, hi) => Box::new(*lo.min(hi)..=*lo.max(hi)),
            Sequence::From(_) => panic!("open-ended sequence cannot be enumerated"),
            Sequence::Set(set) => Box::new(set.iter().copied()),
        }
    }

    pub fn contains(&self, n: u32) -> bool {
        match self {
            Sequence::Single(v) => *v == n,
            Sequence::Range(lo, hi) => (*lo.min(hi)..=*lo.max(hi)).contains(&n),
            Sequence::From(lo) => n >= *lo,
            Sequence::Set(set) => set.contains(&n),
        }
    }
}

/// Set equality: `2:4` equals `{2, 3, 4}` no matter how it was built.
impl PartialEq for Sequence {
    fn eq(&self, other: &Self) -> bool {
        self.intervals() == other.intervals()
    }
}

impl Eq for Sequence {}

impl fmt::Display for Sequence {
    /// Serialises for the wire: consecutive runs collapse into `lo:hi`,
    /// items join with `,`, the open upper bound prints as `*`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (lo, hi) in self.intervals() {
            if !first {
                f.write_str(",")?;
            }
            first = false;
            match hi {
                Some(hi) if hi == lo => write!(f, "{lo}")?,
                Some(hi) => write!(f, "{lo}:{hi}")?,
                None => write!(f, "{lo}:*")?,
            }
        }
        Ok(())
    }
}

impl FromStr for Sequence {
    type Err = Error;

    /// Parses the wire form. A single item keeps its shape (`7`, `2:4`,
    /// `9:*`); a comma-joined list becomes a distinct set with ranges
    /// expanded.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        fn item(piece: &str) -> Result<(u32, Option<Option<u32>>), Error> {
            let invalid =
                |p: &str| Error::InvalidArgument(format!("invalid sequence item {p:?}"));
            match piece.split_once(':') {
                None => Ok((piece.parse().map_err(|_| invalid(piece))?, None)),
                Some((lo, "*")) => Ok((lo.parse().map_err(|_| invalid(piece))?, Some(None))),
                Some((lo, hi)) => Ok((
                    lo.parse().map_err(|_| invalid(piece))?,
                    Some(Some(hi.parse().map_err(|_| invalid(piece))?)),
                )),
            }
        }

        let pieces: Vec<&str> = value.split(',').collect();
        if pieces.is_empty() || pieces.iter().any(|p| p.is_empty()) {
            return Err(Error::InvalidArgument(format!(
                "invalid sequence set {value:?}"
            )));
        }

        if pieces.len() == 1 {
            return Ok(match item(pieces[0])? {
                (n, None) => Sequence::Single(n),
                (lo, Some(None)) => Sequence::From(lo),
                (lo, Some(Some(hi))) => Sequence::Range(lo, hi),
            });
        }

        let mut set = BTreeSet::new();
        for piece in pieces {
            match item(piece)? {
                (n, None) => {
                    set.insert(n);
                }
                (lo, Some(Some(hi))) => {
                    set.extend(lo.min(hi)..=lo.max(hi));
                }
                (_, Some(None)) => {
                    return Err(Error::InvalidArgument(
                        "open-ended range inside a multi-item set".to_string(),
                    ));
                }
            }
        }
        Ok(Sequence::Set(set))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_of(numbers: &[u32]) -> Sequence {
        let mut it = numbers.iter();
        let mut seq = Sequence::single(*it.next().unwrap());
        for &n in it {
            seq.add(n).unwrap();
        }
        seq
    }

    #[test]
    fn single_and_range_serialise() {
        assert_eq!(Sequence::single(33).to_string(), "33");
        assert_eq!(Sequence::range(5, 7).to_string(), "5:7");
        assert_eq!(Sequence::starting_at(1024).to_string(), "1024:*");
    }

    #[test]
    fn runs_collapse() {
        let seq = set_of(&[2, 3, 4, 6, 7, 1, 99, 100, 101, 102, 333, 666]);
        assert_eq!(seq.to_string(), "1:4,6:7,99:102,333,666");
    }

    #[test]
    fn adding_to_range_fails() {
        assert!(Sequence::range(1, 2).add(3).is_err());
        assert!(Sequence::starting_at(1).add(3).is_err());
    }

    #[test]
    fn adding_to_single_grows_a_set() {
        let mut seq = Sequence::single(5);
        seq.add(3).unwrap().add(5).unwrap();
        assert_eq!(seq.to_string(), "3,5");
    }

    #[test]
    fn parse_round_trip() {
        for text in ["7", "2:4", "9:*", "1:4,6:7,99:102,333,666"] {
            let seq: Sequence = text.parse().unwrap();
            assert_eq!(seq.to_string(), text);
        }
    }

    #[test]
    fn parse_of_to_string_is_set_equal() {
        let seq = set_of(&[2, 3, 4, 10]);
        let reparsed: Sequence = seq.to_string().parse().unwrap();
        assert_eq!(reparsed, seq);
    }

    #[test]
    fn range_equals_expanded_set() {
        assert_eq!(set_of(&[2, 3, 4]), Sequence::range(2, 4));
    }

    #[test]
    fn rejects_garbage() {
        assert!("".parse::<Sequence>().is_err());
        assert!("1,,2".parse::<Sequence>().is_err());
        assert!("a:b".parse::<Sequence>().is_err());
        assert!("1:*,5".parse::<Sequence>().is_err());
    }
}
