mod buffer;
mod copy;
mod dtype;
mod encoder;
mod error;
mod ops;
mod shape;
mod strides;
mod view;

pub use buffer::*;
pub use copy::*;
pub use dtype::*;
pub use encoder::*;
pub use error::*;
pub use ops::*;
pub use shape::*;
pub use strides::*;
pub use view::*;

pub use half::{bf16, f16};

use smallvec::SmallVec;
pub type RVec<T> = SmallVec<[T; 4]>;

//https://github.com/sonos/tract/blob/main/data/src/macros.rs#L2
#[macro_export]
macro_rules! rvec {
    (@one $x:expr) => (1usize);
    ($elem:expr; $n:expr) => ({
        $crate::RVec::from_elem($elem, $n)
    });
    ($($x:expr),*$(,)*) => ({
        let count = 0usize $(+ rvec![@one $x])*;
        #[allow(unused_mut)]
        let mut vec = $crate::RVec::new();
        if count <= vec.inline_size() {
            $(vec.push($x);)*
            vec
        } else {
            $crate::RVec::from_vec(vec![$($x,)*])
        }
    });
}

#[macro_export]
macro_rules! shape {
    ($($x:expr),*$(,)*) => ({
        use $crate::rvec;
        $crate::Shape::new(rvec![$($x,)*])
    });
}

pub mod prelude {
    pub use crate::{rvec, shape, CopyKind, DType, Encoder, Shape, Strides, View};
}
