use itertools::Itertools;
use smallvec::SmallVec;
use thiserror::Error;

pub type Array = SmallVec<[usize; 5]>;

pub fn display_comma(arr: &[usize]) -> String {
    arr.iter().map(|s| s.to_string()).join(",")
}

#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum ShapeError {
    #[error("size mismatch! expected {} but got {}.", .0, .1)]
    SizeMismatch(usize, usize),

    #[error("incompatible extents [{}] and [{}]", display_comma(.0), display_comma(.1))]
    Mismatch(Vec<usize>, Vec<usize>),

    #[error("expected a scalar, but extents are [{}]", display_comma(.0))]
    NotScalar(Vec<usize>),
}

/// Anything that can be read as a list of axis extents.
pub trait Extent {
    fn to_arr(&self) -> Array;
}

impl Extent for [usize] {
    fn to_arr(&self) -> Array {
        SmallVec::from_slice(self)
    }
}

impl<const N: usize> Extent for [usize; N] {
    fn to_arr(&self) -> Array {
        SmallVec::from_slice(self)
    }
}

impl Extent for Vec<usize> {
    fn to_arr(&self) -> Array {
        SmallVec::from_slice(self)
    }
}

impl Extent for Array {
    fn to_arr(&self) -> Array {
        self.clone()
    }
}

impl<E> Extent for &E
where
    E: Extent + ?Sized,
{
    fn to_arr(&self) -> Array {
        (*self).to_arr()
    }
}

/// Number of elements described by the extents. The empty product is 1.
pub fn size(extents: &[usize]) -> usize {
    extents.iter().product()
}

/// Extents of an elementwise result. Rank-0 operands combine with anything,
/// otherwise the extents must agree exactly.
pub fn union(extents1: &[usize], extents2: &[usize]) -> Result<Array, ShapeError> {
    if extents1 == extents2 || extents2.is_empty() {
        Ok(SmallVec::from_slice(extents1))
    } else if extents1.is_empty() {
        Ok(SmallVec::from_slice(extents2))
    } else {
        Err(ShapeError::Mismatch(extents1.to_vec(), extents2.to_vec()))
    }
}
