use std::num::NonZeroU64;
use std::str::FromStr;

/// A selection of [`Frame`](super::Frame)s.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub enum FrameSelection {
    /// Include all frames that are in a trajectory.
    #[default]
    All,
    /// Include frames that lie within a certain [`Range`].
    Range(Range),
    /// Include frames that match the indices in this list.
    ///
    /// Invariant: The indices in the FrameList are _unique_ and _sorted_.
    FrameList(Vec<usize>),
}

impl FrameSelection {
    /// Create a [`FrameSelection::FrameList`] from indices in any order, dropping duplicates.
    pub fn from_indices(indices: impl IntoIterator<Item = usize>) -> Self {
        let mut indices: Vec<usize> = indices.into_iter().collect();
        indices.sort_unstable();
        indices.dedup();
        Self::FrameList(indices)
    }

    /// Determine whether some index `idx` is included in this [`FrameSelection`].
    ///
    /// Will return [`None`] once the index is beyond the scope of this `FrameSelection`.
    pub fn is_included(&self, idx: usize) -> Option<bool> {
        match self {
            FrameSelection::All => Some(true),
            FrameSelection::Range(range) => range.is_included(idx as u64),
            FrameSelection::FrameList(indices) => {
                if *indices.last()? < idx {
                    None
                } else {
                    Some(indices.binary_search(&idx).is_ok())
                }
            }
        }
    }

    /// The selected indices in ascending order, for a trajectory of `nframes` frames.
    pub fn indices(&self, nframes: usize) -> impl Iterator<Item = usize> + '_ {
        (0..nframes).map_while(move |idx| self.is_included(idx).map(|included| (idx, included)))
            .filter_map(|(idx, included)| included.then_some(idx))
    }
}

/// A range of frames, from `start` up to `end`, taking every `step`th frame.
///
/// The `start` of a [`Range`] is always bounded, and is zero by default.
/// The `end` may be bounded or unbounded. In case the end is unbounded ([`None`]), the range
/// runs up to and including the last frame.
/// The number of skipped frames between two selected ones is equal to `step` - 1.
///
/// # Note
///
/// An instance where `start` > `end` is a valid `Range`, but it selects nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub start: u64,
    /// Exclusive bound.
    pub end: Option<u64>,
    pub step: NonZeroU64,
}

impl Range {
    pub fn new(start: Option<u64>, end: Option<u64>, step: Option<NonZeroU64>) -> Self {
        let mut sel = Self {
            end,
            ..Self::default()
        };
        if let Some(start) = start {
            sel.start = start;
        }
        if let Some(step) = step {
            sel.step = step;
        }
        sel
    }

    fn is_included(&self, idx: u64) -> Option<bool> {
        if let Some(end) = self.end {
            // Determine whether `idx` is already beyond the defined range.
            if end <= idx {
                return None;
            }
        }
        let included = match idx.checked_sub(self.start) {
            Some(offset) => offset % self.step == 0,
            None => false,
        };
        Some(included)
    }
}

impl Default for Range {
    fn default() -> Self {
        Self {
            start: 0,
            end: None,
            step: NonZeroU64::MIN,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid frame range '{0}', expected 'start:stop:step' with optional components")]
pub struct ParseRangeError(String);

/// Parses `start:stop:step`, where each of the components may be left empty.
///
/// - `:100` will select the first 100 frames.
/// - `3:14` will select the 4th up to and including the 14th frame, 11 frames in total.
/// - `:100:2` will select every second frame from the first 100 frames, 50 in total.
impl FromStr for Range {
    type Err = ParseRangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseRangeError(s.to_string());
        let component = |c: Option<&str>| -> Result<Option<u64>, ParseRangeError> {
            match c.map(str::trim) {
                None | Some("") => Ok(None),
                Some(c) => c.parse().map(Some).map_err(|_| err()),
            }
        };

        let mut components = s.split(':');
        let start = component(components.next())?;
        let end = component(components.next())?;
        let step = match component(components.next())? {
            Some(step) => Some(NonZeroU64::new(step).ok_or_else(err)?),
            None => None,
        };
        if components.next().is_some() {
            return Err(err());
        }
        Ok(Self::new(start, end, step))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_selection() {
        let list_empty = FrameSelection::FrameList(vec![]);
        let list_zero = FrameSelection::FrameList(vec![0]);
        let range_empty = FrameSelection::Range(Range::new(None, Some(0), None));

        for idx in 0..1000 {
            assert!(list_empty.is_included(idx).is_none());
            if idx > 0 {
                assert!(list_zero.is_included(idx).is_none());
            }
            assert!(range_empty.is_included(idx).is_none());
        }
        assert_eq!(list_zero.is_included(0), Some(true));
    }

    #[test]
    fn first_n() {
        let n = 100;
        let step = NonZeroU64::new(17).unwrap();

        let list = FrameSelection::FrameList((0..n).collect());
        let until = FrameSelection::Range(Range::new(None, Some(n as u64), None));
        let from_n = FrameSelection::Range(Range::new(Some(n as u64), None, None));
        let until_stepped = FrameSelection::Range(Range::new(None, Some(n as u64), Some(step)));
        let from_n_stepped = FrameSelection::Range(Range::new(Some(n as u64), None, Some(step)));
        let all = FrameSelection::All;

        for idx in 0..2 * n {
            if idx < n {
                assert_eq!(list.is_included(idx), Some(true));
                assert_eq!(until.is_included(idx), Some(true));
                assert_eq!(
                    until_stepped.is_included(idx),
                    Some(idx as u64 % step.get() == 0),
                );
            } else {
                assert!(list.is_included(idx).is_none());
                assert!(until.is_included(idx).is_none());
                assert!(until_stepped.is_included(idx).is_none());
            }
            let from_n_included = idx >= n;
            assert_eq!(from_n.is_included(idx), Some(from_n_included));
            assert_eq!(
                from_n_stepped.is_included(idx),
                Some(from_n_included && (idx - n) as u64 % step.get() == 0),
            );
            assert_eq!(all.is_included(idx), Some(true));
        }
    }

    #[test]
    fn from_indices_sorts_and_dedups() {
        let selection = FrameSelection::from_indices([7, 3, 3, 0]);
        assert_eq!(selection, FrameSelection::FrameList(vec![0, 3, 7]));
        assert_eq!(selection.indices(100).collect::<Vec<_>>(), [0, 3, 7]);
        assert_eq!(selection.indices(5).collect::<Vec<_>>(), [0, 3]);
    }

    #[test]
    fn indices_of_range() {
        let range: Range = "2:11:3".parse().unwrap();
        let selection = FrameSelection::Range(range);
        assert_eq!(selection.indices(100).collect::<Vec<_>>(), [2, 5, 8]);
        assert_eq!(selection.indices(6).collect::<Vec<_>>(), [2, 5]);
        assert_eq!(FrameSelection::All.indices(3).collect::<Vec<_>>(), [0, 1, 2]);
    }

    #[test]
    fn parse_range() {
        assert_eq!("".parse::<Range>().unwrap(), Range::default());
        assert_eq!(":100".parse::<Range>().unwrap(), Range::new(None, Some(100), None));
        assert_eq!("3:14".parse::<Range>().unwrap(), Range::new(Some(3), Some(14), None));
        assert_eq!(
            ":100:2".parse::<Range>().unwrap(),
            Range::new(None, Some(100), NonZeroU64::new(2))
        );
        assert_eq!("5".parse::<Range>().unwrap(), Range::new(Some(5), None, None));

        for bad in ["a:b", "1:2:0", "-1:", "1:2:3:4"] {
            assert!(bad.parse::<Range>().is_err(), "'{bad}' should not parse");
        }
    }
}
