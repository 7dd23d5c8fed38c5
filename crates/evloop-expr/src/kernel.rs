//! Typed expression bodies.
//!
//! `IntoKernel` is implemented for every `Fn` whose parameters implement
//! `Param` and whose return type implements `Output`. Converting a closure
//! records its `Shape` and a monomorphized binder that, given the live slots
//! for its inputs, acquires typed cursors and returns an `Evaluator`. No
//! runtime type inspection happens per row.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use evloop_io::Slot;

use crate::evaluator::Evaluator;
use crate::shape::{OutputKind, ParamType, Shape};

mod sealed {
    pub trait Sealed {}
}

/// A type a column cell can be read as.
pub trait Param: sealed::Sealed + Sized + 'static {
    const TYPE: ParamType;

    #[doc(hidden)]
    type Cursor: 'static;

    #[doc(hidden)]
    fn cursor(slot: &Slot) -> Option<Self::Cursor>;

    #[doc(hidden)]
    fn read(cursor: &Self::Cursor) -> Self;
}

/// A type an expression body can return.
pub trait Output: sealed::Sealed + Clone + 'static {
    const KIND: OutputKind;

    #[doc(hidden)]
    fn evaluator(f: impl Fn() -> Self + 'static) -> Evaluator;
}

macro_rules! scalar_param {
    ($ty:ty, $variant:ident) => {
        impl sealed::Sealed for $ty {}

        impl Param for $ty {
            const TYPE: ParamType = ParamType::$variant;
            type Cursor = Rc<Cell<$ty>>;

            fn cursor(slot: &Slot) -> Option<Self::Cursor> {
                match slot {
                    Slot::$variant(c) => Some(Rc::clone(c)),
                    _ => None,
                }
            }

            fn read(cursor: &Self::Cursor) -> Self {
                cursor.get()
            }
        }
    };
}

macro_rules! vector_param {
    ($ty:ty, $variant:ident) => {
        impl sealed::Sealed for Vec<$ty> {}

        impl Param for Vec<$ty> {
            const TYPE: ParamType = ParamType::$variant;
            type Cursor = Rc<RefCell<Vec<$ty>>>;

            fn cursor(slot: &Slot) -> Option<Self::Cursor> {
                match slot {
                    Slot::$variant(c) => Some(Rc::clone(c)),
                    _ => None,
                }
            }

            fn read(cursor: &Self::Cursor) -> Self {
                cursor.borrow().clone()
            }
        }
    };
}

scalar_param!(bool, Bool);
scalar_param!(f32, F32);
scalar_param!(f64, F64);
vector_param!(f32, VecF32);
vector_param!(f64, VecF64);

impl Output for f64 {
    const KIND: OutputKind = OutputKind::Scalar;

    fn evaluator(f: impl Fn() -> Self + 'static) -> Evaluator {
        Evaluator::Scalar(Box::new(f))
    }
}

impl Output for f32 {
    const KIND: OutputKind = OutputKind::Scalar;

    fn evaluator(f: impl Fn() -> Self + 'static) -> Evaluator {
        Evaluator::Scalar(Box::new(move || f() as f64))
    }
}

impl Output for bool {
    const KIND: OutputKind = OutputKind::Predicate;

    fn evaluator(f: impl Fn() -> Self + 'static) -> Evaluator {
        Evaluator::Predicate(Box::new(f))
    }
}

impl Output for Vec<f64> {
    const KIND: OutputKind = OutputKind::Vector;

    fn evaluator(f: impl Fn() -> Self + 'static) -> Evaluator {
        Evaluator::Vector(Box::new(f))
    }
}

impl Output for Vec<f32> {
    const KIND: OutputKind = OutputKind::Vector;

    fn evaluator(f: impl Fn() -> Self + 'static) -> Evaluator {
        Evaluator::Vector(Box::new(move || f().into_iter().map(f64::from).collect()))
    }
}

/// Index of the input whose slot could not be read as the parameter type.
pub(crate) type SlotIndex = usize;

type Binder = dyn Fn(&[Slot]) -> Result<Evaluator, SlotIndex> + Send + Sync;

/// A shaped body plus the adapter that attaches it to live slots.
pub struct Kernel {
    shape: Shape,
    binder: Box<Binder>,
}

impl Kernel {
    pub fn from_parts(
        shape: Shape,
        binder: impl Fn(&[Slot]) -> Result<Evaluator, SlotIndex> + Send + Sync + 'static,
    ) -> Self {
        Self {
            shape,
            binder: Box::new(binder),
        }
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Acquire typed cursors on `slots` (one per parameter, in order).
    pub(crate) fn attach(&self, slots: &[Slot]) -> Result<Evaluator, SlotIndex> {
        (self.binder)(slots)
    }
}

impl fmt::Debug for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Kernel").field("shape", &self.shape).finish()
    }
}

/// Conversion of a function into a `Kernel`. `Marker` only disambiguates
/// the blanket impls per arity and is inferred.
pub trait IntoKernel<Marker>: Sized {
    fn into_kernel(self) -> Kernel;
}

impl IntoKernel<()> for Kernel {
    fn into_kernel(self) -> Kernel {
        self
    }
}

// Zero inputs: the body runs once per bind and the value is replayed per row.
impl<F, O> IntoKernel<(O,)> for F
where
    F: Fn() -> O + Send + Sync + 'static,
    O: Output,
{
    fn into_kernel(self) -> Kernel {
        let body = Arc::new(self);
        Kernel::from_parts(Shape::new(Vec::new(), O::KIND), move |_slots: &[Slot]| {
            let value = body();
            Ok(O::evaluator(move || value.clone()))
        })
    }
}

macro_rules! impl_into_kernel {
    ($($P:ident $c:ident),+) => {
        impl<F, O, $($P),+> IntoKernel<($($P,)+ O)> for F
        where
            F: Fn($($P),+) -> O + Send + Sync + 'static,
            O: Output,
            $($P: Param,)+
        {
            fn into_kernel(self) -> Kernel {
                let shape = Shape::new(vec![$($P::TYPE),+], O::KIND);
                let body = Arc::new(self);
                Kernel::from_parts(shape, move |slots: &[Slot]| {
                    let mut index: SlotIndex = 0;
                    $(
                        let $c = slots.get(index).and_then($P::cursor).ok_or(index)?;
                        index += 1;
                    )+
                    debug_assert_eq!(index, slots.len());
                    let body = Arc::clone(&body);
                    Ok(O::evaluator(move || body($($P::read(&$c)),+)))
                })
            }
        }
    };
}

impl_into_kernel!(P1 c1);
impl_into_kernel!(P1 c1, P2 c2);
impl_into_kernel!(P1 c1, P2 c2, P3 c3);
impl_into_kernel!(P1 c1, P2 c2, P3 c3, P4 c4);
impl_into_kernel!(P1 c1, P2 c2, P3 c3, P4 c4, P5 c5);
impl_into_kernel!(P1 c1, P2 c2, P3 c3, P4 c4, P5 c5, P6 c6);

/// Reads any scalar slot as `f64`.
#[derive(Debug, Clone)]
pub(crate) enum NumericCursor {
    Bool(Rc<Cell<bool>>),
    F32(Rc<Cell<f32>>),
    F64(Rc<Cell<f64>>),
}

impl NumericCursor {
    pub(crate) fn new(slot: &Slot) -> Option<Self> {
        match slot {
            Slot::Bool(c) => Some(NumericCursor::Bool(Rc::clone(c))),
            Slot::F32(c) => Some(NumericCursor::F32(Rc::clone(c))),
            Slot::F64(c) => Some(NumericCursor::F64(Rc::clone(c))),
            Slot::VecF32(_) | Slot::VecF64(_) => None,
        }
    }

    #[inline]
    pub(crate) fn get(&self) -> f64 {
        match self {
            NumericCursor::Bool(c) => {
                if c.get() {
                    1.0
                } else {
                    0.0
                }
            }
            NumericCursor::F32(c) => f64::from(c.get()),
            NumericCursor::F64(c) => c.get(),
        }
    }
}
