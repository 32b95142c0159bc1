use std::borrow::Cow;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use thiserror::Error;

/// Failure of the output sink while rendering
///
/// Never part of template control flow. [render_to_string] turns it in to a
/// panic, `render_into` functions hand it to the caller.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("RenderError: the output sink failed while rendering: {0}")]
pub struct RenderError(#[from] pub fmt::Error);

/// Null safe stringification of rendered values
///
/// `None` renders as the empty string.
pub trait ToS {
    fn to_s(&self) -> String;
}

macro_rules! impl_to_s_display {
    ($($ty:ty),+) => {$(
        impl ToS for $ty {
            fn to_s(&self) -> String {
                self.to_string()
            }
        }
    )+};
}

impl_to_s_display!(
    bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, str,
    String
);

impl ToS for Cow<'_, str> {
    fn to_s(&self) -> String {
        self.to_string()
    }
}

impl ToS for fmt::Arguments<'_> {
    fn to_s(&self) -> String {
        self.to_string()
    }
}

impl ToS for dyn fmt::Display + '_ {
    fn to_s(&self) -> String {
        self.to_string()
    }
}

impl<T: ToS + ?Sized> ToS for &T {
    fn to_s(&self) -> String {
        (**self).to_s()
    }
}

impl<T: ToS + ?Sized> ToS for &mut T {
    fn to_s(&self) -> String {
        (**self).to_s()
    }
}

impl<T: ToS + ?Sized> ToS for Box<T> {
    fn to_s(&self) -> String {
        (**self).to_s()
    }
}

impl<T: ToS + ?Sized> ToS for Rc<T> {
    fn to_s(&self) -> String {
        (**self).to_s()
    }
}

impl<T: ToS + ?Sized> ToS for Arc<T> {
    fn to_s(&self) -> String {
        (**self).to_s()
    }
}

impl<T: ToS> ToS for Option<T> {
    fn to_s(&self) -> String {
        match self {
            Some(value) => value.to_s(),
            None => String::new(),
        }
    }
}

/// Render any [Display](fmt::Display) type: `${ Displayed(&point) }`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Displayed<T: fmt::Display>(pub T);

impl<T: fmt::Display> ToS for Displayed<T> {
    fn to_s(&self) -> String {
        self.0.to_string()
    }
}

/// The capability every generated unit has
pub trait BaseTemplate {
    fn to_s<T: ToS + ?Sized>(&self, value: &T) -> String {
        value.to_s()
    }
}

/// Render in to a fresh `String`
///
/// # Panics
///
/// If `render` reports a sink failure.
pub fn render_to_string<F>(render: F) -> String
where
    F: FnOnce(&mut dyn fmt::Write) -> fmt::Result,
{
    let mut out = String::new();
    let sink: &mut dyn fmt::Write = &mut out;

    if let Err(err) = render(sink) {
        panic!("{}", RenderError::from(err));
    }

    out
}
