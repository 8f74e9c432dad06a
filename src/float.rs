use std::fmt::{Debug, Display};

use num_traits::{Float as NumFloat, FromPrimitive};

/// Primitive floating-point types (`f32`, `f64`) that sit at the bottom of
/// every AD scalar tower.
///
/// Dual numbers and reverse variables never implement this; they implement
/// [`Scalar`](crate::Scalar) with `Float` naming the primitive underneath.
pub trait Float:
    NumFloat + FromPrimitive + Copy + Send + Sync + Default + Debug + Display + 'static
{
}

impl Float for f32 {}
impl Float for f64 {}
