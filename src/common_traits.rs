//! Utility traits such as [Verify] and [RcShare].

use std::{cell::RefCell, rc::Rc};

use crate::{context::Context, result::Result};

/// Check and ensure correctness.
pub trait Verify {
    fn verify(&self, ctx: &Context) -> Result<()>;
}

/// Share a single mutable object among its holders.
pub trait RcShare {
    fn share(&self) -> Self;
}

impl<T> RcShare for Rc<RefCell<T>> {
    fn share(&self) -> Self {
        Rc::clone(self)
    }
}
