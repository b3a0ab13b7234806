use half::{bf16, f16};

pub type C64 = num_complex::Complex<f32>;

/// Closed element-type set covered by every dispatch in the crate.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Hash)]
pub enum DType {
    Bool,
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    F16,
    BF16,
    #[default]
    F32,
    F64,
    C64,
}

impl DType {
    /// Returns the size of the type in bytes.
    pub fn size_of(self) -> usize {
        match self {
            DType::Bool => 1,
            DType::U8 => 1,
            DType::U16 => 2,
            DType::U32 => 4,
            DType::U64 => 8,
            DType::I8 => 1,
            DType::I16 => 2,
            DType::I32 => 4,
            DType::I64 => 8,
            DType::F16 => 2,
            DType::BF16 => 2,
            DType::F32 => 4,
            DType::F64 => 8,
            DType::C64 => 8,
        }
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            DType::U8
                | DType::U16
                | DType::U32
                | DType::U64
                | DType::I8
                | DType::I16
                | DType::I32
                | DType::I64
        )
    }

    pub fn is_float(self) -> bool {
        matches!(self, DType::F16 | DType::BF16 | DType::F32 | DType::F64)
    }
}

/// One byte of boolean storage, always 0 or 1.
///
/// `bool` itself is not `Pod`, so boolean views move their bytes through this
/// wrapper and normalize on conversion.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[repr(transparent)]
pub struct B8(pub u8);

unsafe impl bytemuck::Zeroable for B8 {}
unsafe impl bytemuck::Pod for B8 {}

pub trait ViewDType:
    Copy + Clone + std::fmt::Debug + PartialEq + Send + Sync + bytemuck::Pod + 'static
{
    fn dt() -> DType;

    fn zero() -> Self;

    fn one() -> Self;

    /// Conversion lane used by the cast path of the copy engine.
    fn from_f64(v: f64) -> Self;

    fn to_f64(self) -> f64;
}

macro_rules! map_type {
    ($t:ty, $v:ident) => {
        impl ViewDType for $t {
            fn dt() -> DType {
                DType::$v
            }

            fn zero() -> Self {
                0 as Self
            }

            fn one() -> Self {
                1 as Self
            }

            fn from_f64(v: f64) -> Self {
                v as Self
            }

            fn to_f64(self) -> f64 {
                self as f64
            }
        }
    };
}

macro_rules! map_half_type {
    ($t:ty, $v:ident) => {
        impl ViewDType for $t {
            fn dt() -> DType {
                DType::$v
            }

            fn zero() -> Self {
                Self::ZERO
            }

            fn one() -> Self {
                Self::ONE
            }

            fn from_f64(v: f64) -> Self {
                Self::from_f64(v)
            }

            fn to_f64(self) -> f64 {
                Self::to_f64(self)
            }
        }
    };
}

map_type!(u8, U8);
map_type!(u16, U16);
map_type!(u32, U32);
map_type!(u64, U64);
map_type!(i8, I8);
map_type!(i16, I16);
map_type!(i32, I32);
map_type!(i64, I64);
map_type!(f32, F32);
map_type!(f64, F64);
map_half_type!(f16, F16);
map_half_type!(bf16, BF16);

impl ViewDType for B8 {
    fn dt() -> DType {
        DType::Bool
    }

    fn zero() -> Self {
        B8(0)
    }

    fn one() -> Self {
        B8(1)
    }

    fn from_f64(v: f64) -> Self {
        B8((v != 0.0) as u8)
    }

    fn to_f64(self) -> f64 {
        (self.0 != 0) as u8 as f64
    }
}

impl ViewDType for C64 {
    fn dt() -> DType {
        DType::C64
    }

    fn zero() -> Self {
        num_traits::Zero::zero()
    }

    fn one() -> Self {
        num_traits::One::one()
    }

    fn from_f64(v: f64) -> Self {
        C64::new(v as f32, 0.0)
    }

    fn to_f64(self) -> f64 {
        self.re as f64
    }
}

/// Maps a runtime [`DType`] onto a concrete element type and runs `$body`
/// with `$T` bound to it. The type set is closed; every arm is covered.
#[macro_export]
macro_rules! dispatch_dtype {
    ($dt:expr, |$T:ident| $body:expr) => {
        match $dt {
            $crate::DType::Bool => {
                type $T = $crate::B8;
                $body
            }
            $crate::DType::U8 => {
                type $T = u8;
                $body
            }
            $crate::DType::U16 => {
                type $T = u16;
                $body
            }
            $crate::DType::U32 => {
                type $T = u32;
                $body
            }
            $crate::DType::U64 => {
                type $T = u64;
                $body
            }
            $crate::DType::I8 => {
                type $T = i8;
                $body
            }
            $crate::DType::I16 => {
                type $T = i16;
                $body
            }
            $crate::DType::I32 => {
                type $T = i32;
                $body
            }
            $crate::DType::I64 => {
                type $T = i64;
                $body
            }
            $crate::DType::F16 => {
                type $T = $crate::f16;
                $body
            }
            $crate::DType::BF16 => {
                type $T = $crate::bf16;
                $body
            }
            $crate::DType::F32 => {
                type $T = f32;
                $body
            }
            $crate::DType::F64 => {
                type $T = f64;
                $body
            }
            $crate::DType::C64 => {
                type $T = $crate::C64;
                $body
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes() {
        assert_eq!(DType::Bool.size_of(), 1);
        assert_eq!(DType::BF16.size_of(), 2);
        assert_eq!(DType::C64.size_of(), 8);
        assert_eq!(DType::I64.size_of(), 8);
    }

    #[test]
    fn bool_normalizes_on_conversion() {
        assert_eq!(B8::from_f64(3.5), B8(1));
        assert_eq!(B8::from_f64(0.0), B8(0));
        assert_eq!(B8(7).to_f64(), 1.0);
    }

    #[test]
    fn dispatch_covers_the_closed_set() {
        let sizes: Vec<usize> = [DType::Bool, DType::F16, DType::C64]
            .iter()
            .map(|&dt| dispatch_dtype!(dt, |T| std::mem::size_of::<T>()))
            .collect();
        assert_eq!(sizes, vec![1, 2, 8]);
    }
}
