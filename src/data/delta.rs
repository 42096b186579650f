//! Running-sum decoding of delta coded columns.

use std::iter::FusedIterator;

/// Accumulator for one delta coded column, seeded at 0.
///
/// Every column (ids, lats, lons, each dense metadata column, way refs,
/// member ids) gets its own accumulator, and a fresh one per group.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Delta {
    value: i64,
}

impl Delta {
    #[inline]
    pub const fn new() -> Self {
        Self { value: 0 }
    }

    /// Adds `delta` to the running total and returns the new total.
    #[inline]
    pub fn next(&mut self, delta: i64) -> i64 {
        self.value = self.value.wrapping_add(delta);
        self.value
    }

    #[inline]
    pub const fn value(&self) -> i64 {
        self.value
    }
}

/// Iterator adaptor yielding the running totals of a delta coded column.
#[derive(Clone, Debug)]
pub struct DeltaDecoded<I> {
    inner: I,
    acc: Delta,
}

impl<I> Iterator for DeltaDecoded<I>
where
    I: Iterator,
    I::Item: Into<i64>,
{
    type Item = i64;

    #[inline]
    fn next(&mut self) -> Option<i64> {
        let delta = self.inner.next()?;
        Some(self.acc.next(delta.into()))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<I> ExactSizeIterator for DeltaDecoded<I>
where
    I: ExactSizeIterator,
    I::Item: Into<i64>,
{
}

impl<I> FusedIterator for DeltaDecoded<I>
where
    I: FusedIterator,
    I::Item: Into<i64>,
{
}

pub trait DeltaDecode: Iterator + Sized {
    #[inline]
    fn delta_decoded(self) -> DeltaDecoded<Self> {
        DeltaDecoded {
            inner: self,
            acc: Delta::new(),
        }
    }
}

impl<I: Iterator> DeltaDecode for I {}
