//! Per-stress-period array slots.
//!
//! A transient slot holds one 2D array per stress period, but the
//! file format only stores an array for the periods where the data
//! changes; every other period reuses the most recent array. The
//! slot keeps exactly the explicit arrays and resolves reuse on
//! demand.

use crate::util2d::{self, ArrayElement};
use ndarray::Array2;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;

/// Where a transient slot's data comes from.
#[derive(Debug, Clone)]
pub enum Transient2dSource<A> {
    /// One value for every cell of every period.
    Constant(A),
    /// One array for every period.
    Array(Array2<A>),
    /// Explicit arrays for some periods; the rest reuse the previous
    /// period's array. Period 0 must be present.
    PerPeriod(BTreeMap<usize, Array2<A>>),
}

impl<A> From<A> for Transient2dSource<A> {
    fn from(value: A) -> Transient2dSource<A> {
        Transient2dSource::Constant(value)
    }
}

impl<A> From<Array2<A>> for Transient2dSource<A> {
    fn from(array: Array2<A>) -> Transient2dSource<A> {
        Transient2dSource::Array(array)
    }
}

impl<A> From<BTreeMap<usize, Array2<A>>> for Transient2dSource<A> {
    fn from(entries: BTreeMap<usize, Array2<A>>) -> Transient2dSource<A> {
        Transient2dSource::PerPeriod(entries)
    }
}

/// An error building a transient slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransientError {
    /// A supplied array does not match the grid shape.
    Shape {
        period: usize,
        expected: (usize, usize),
        actual: (usize, usize),
    },
    /// A per-period entry names a period outside `0..nper`.
    PeriodOutOfRange { period: usize, nper: usize },
    /// A per-period source without an entry for period 0 would leave
    /// the early periods undefined.
    MissingFirstPeriod,
}

impl Error for TransientError {}

impl fmt::Display for TransientError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TransientError::Shape {
                period,
                expected,
                actual,
            } => write!(
                f,
                "array for stress period {} has shape {:?}, expected {:?}",
                period, actual, expected
            ),
            TransientError::PeriodOutOfRange { period, nper } => write!(
                f,
                "stress period {} out of range for {} periods",
                period, nper
            ),
            TransientError::MissingFirstPeriod => {
                write!(f, "per-period data must include stress period 0")
            }
        }
    }
}

/// A 2D array slot with one logical value per stress period.
#[derive(Debug, Clone, PartialEq)]
pub struct Transient2d<A> {
    shape: (usize, usize),
    nper: usize,
    // Invariant: contains key 0, and every key is < nper.
    entries: BTreeMap<usize, Array2<A>>,
}

impl<A: ArrayElement> Transient2d<A> {
    /// Builds a slot bound to `shape` and `nper`, validating every
    /// supplied array against the grid.
    pub fn new(
        shape: (usize, usize),
        nper: usize,
        source: Transient2dSource<A>,
    ) -> Result<Transient2d<A>, TransientError> {
        let entries = match source {
            Transient2dSource::Constant(value) => {
                let mut entries = BTreeMap::new();
                entries.insert(0, Array2::from_elem(shape, value));
                entries
            }
            Transient2dSource::Array(array) => {
                check_shape(0, shape, &array)?;
                let mut entries = BTreeMap::new();
                entries.insert(0, array);
                entries
            }
            Transient2dSource::PerPeriod(entries) => {
                if !entries.contains_key(&0) {
                    return Err(TransientError::MissingFirstPeriod);
                }
                for (&period, array) in &entries {
                    if period >= nper {
                        return Err(TransientError::PeriodOutOfRange { period, nper });
                    }
                    check_shape(period, shape, array)?;
                }
                entries
            }
        };
        Ok(Transient2d {
            shape,
            nper,
            entries,
        })
    }

    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    pub fn nper(&self) -> usize {
        self.nper
    }

    /// The array explicitly defined at `kper`, if any. `None` means
    /// the period reuses earlier data.
    pub fn explicit(&self, kper: usize) -> Option<&Array2<A>> {
        self.entries.get(&kper)
    }

    /// The reuse-resolved array for `kper`: the explicit entry at
    /// `kper` or, failing that, the nearest one before it.
    ///
    /// **Panics** if `kper >= nper`.
    pub fn array(&self, kper: usize) -> &Array2<A> {
        assert!(
            kper < self.nper,
            "stress period {} out of range for {} periods",
            kper,
            self.nper
        );
        // The range is never empty: period 0 is always present.
        self.entries.range(..=kper).next_back().unwrap().1
    }

    /// Write-side record entry for `kper`: `(0, block)` when a new
    /// array applies at this period, `(-1, None)` when the consumer
    /// should reuse the previous period's array.
    pub fn kper_entry(&self, kper: usize) -> (i32, Option<String>) {
        match self.entries.get(&kper) {
            Some(array) => (0, Some(util2d::format_array(array))),
            None => (-1, None),
        }
    }
}

fn check_shape<A>(
    period: usize,
    expected: (usize, usize),
    array: &Array2<A>,
) -> Result<(), TransientError> {
    if array.dim() == expected {
        Ok(())
    } else {
        Err(TransientError::Shape {
            period,
            expected,
            actual: array.dim(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn constant_source_defines_period_zero_only() {
        let slot = Transient2d::new((2, 2), 3, Transient2dSource::Constant(1.5f32)).unwrap();
        assert!(slot.explicit(0).is_some());
        assert!(slot.explicit(1).is_none());
        assert_eq!(slot.array(2), &array![[1.5, 1.5], [1.5, 1.5]]);
    }

    #[test]
    fn kper_entry_flags_new_data_and_reuse() {
        let slot = Transient2d::new((1, 2), 2, Transient2dSource::Constant(1i32)).unwrap();
        let (flag, entry) = slot.kper_entry(0);
        assert_eq!(flag, 0);
        assert_eq!(entry.as_deref(), Some("         1         1\n"));
        assert_eq!(slot.kper_entry(1), (-1, None));
    }

    #[test]
    fn reuse_resolves_to_nearest_earlier_entry() {
        let mut entries = BTreeMap::new();
        entries.insert(0, array![[1.0f32]]);
        entries.insert(2, array![[2.0f32]]);
        let slot = Transient2d::new((1, 1), 4, Transient2dSource::PerPeriod(entries)).unwrap();
        assert_eq!(slot.array(0)[(0, 0)], 1.0);
        assert_eq!(slot.array(1)[(0, 0)], 1.0);
        assert_eq!(slot.array(2)[(0, 0)], 2.0);
        assert_eq!(slot.array(3)[(0, 0)], 2.0);
    }

    #[test]
    fn wrong_shape_is_rejected() {
        let source = Transient2dSource::Array(array![[1.0f32, 2.0]]);
        match Transient2d::new((2, 2), 1, source) {
            Err(TransientError::Shape {
                period: 0,
                expected: (2, 2),
                actual: (1, 2),
            }) => {}
            other => panic!("expected Shape error, got {:?}", other),
        }
    }

    #[test]
    fn per_period_source_must_define_period_zero() {
        let mut entries = BTreeMap::new();
        entries.insert(1, array![[1.0f32]]);
        match Transient2d::new((1, 1), 2, Transient2dSource::PerPeriod(entries)) {
            Err(TransientError::MissingFirstPeriod) => {}
            other => panic!("expected MissingFirstPeriod, got {:?}", other),
        }
    }

    #[test]
    fn period_beyond_nper_is_rejected() {
        let mut entries = BTreeMap::new();
        entries.insert(0, array![[1.0f32]]);
        entries.insert(5, array![[2.0f32]]);
        match Transient2d::new((1, 1), 2, Transient2dSource::PerPeriod(entries)) {
            Err(TransientError::PeriodOutOfRange { period: 5, nper: 2 }) => {}
            other => panic!("expected PeriodOutOfRange, got {:?}", other),
        }
    }
}
