use super::Rect;
use crate::common::*;

/// Bounding box in TLBR format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TLBR<T> {
    pub(crate) t: T,
    pub(crate) l: T,
    pub(crate) b: T,
    pub(crate) r: T,
}

impl<T> Rect for TLBR<T>
where
    T: Copy + Num + PartialOrd,
{
    type Type = T;

    fn t(&self) -> Self::Type {
        self.t
    }

    fn l(&self) -> Self::Type {
        self.l
    }

    fn b(&self) -> Self::Type {
        self.b
    }

    fn r(&self) -> Self::Type {
        self.r
    }

    fn try_from_tlbr(tlbr: [Self::Type; 4]) -> Result<Self> {
        let [t, l, b, r] = tlbr;
        ensure!(b >= t && r >= l, "b >= t and r >= l must hold");

        Ok(Self { t, l, b, r })
    }
}
