use super::TLBR;
use crate::common::*;

/// The generic rectangle.
///
/// The bottom and right sides are exclusive, so a rectangle covering a single pixel at
/// `(row, col)` has `t = row`, `b = row + 1`, `l = col` and `r = col + 1`.
pub trait Rect {
    type Type;

    fn t(&self) -> Self::Type;
    fn l(&self) -> Self::Type;
    fn b(&self) -> Self::Type;
    fn r(&self) -> Self::Type;

    fn try_from_tlbr(tlbr: [Self::Type; 4]) -> Result<Self>
    where
        Self: Sized;
}

/// Derived measurements shared by all numeric rectangles.
pub trait RectExt: Rect
where
    Self::Type: Copy + Num + PartialOrd,
{
    fn tlbr(&self) -> [Self::Type; 4] {
        [self.t(), self.l(), self.b(), self.r()]
    }

    /// Compute the overlapping region, if any.
    fn intersect_with<R>(&self, other: &R) -> Option<TLBR<Self::Type>>
    where
        R: Rect<Type = Self::Type>,
    {
        let t = max(self.t(), other.t());
        let l = max(self.l(), other.l());
        let b = min(self.b(), other.b());
        let r = min(self.r(), other.r());
        (b > t && r > l).then(|| TLBR { t, l, b, r })
    }
}

impl<R> RectExt for R
where
    R: Rect,
    R::Type: Copy + Num + PartialOrd,
{
}

fn max<T: PartialOrd>(lhs: T, rhs: T) -> T {
    if lhs >= rhs {
        lhs
    } else {
        rhs
    }
}

fn min<T: PartialOrd>(lhs: T, rhs: T) -> T {
    if lhs <= rhs {
        lhs
    } else {
        rhs
    }
}
