//! Deferred, single-use component construction.
//!
//! A [`Prototype`] describes how to build and attach one component
//! without touching any simulation. Creating the component and appending
//! it to a list happen together when the prototype is applied, so no
//! registered-but-unattached component is ever visible between the two.

use std::fmt;
use std::marker::PhantomData;

use plasma_core::{ComponentError, ObjectId};
use tracing::trace;

use crate::family::Family;

type Build<C> = Box<dyn FnOnce(&mut C) -> Result<ObjectId, ComponentError> + Send>;

/// A construction request for one component of family `F`, applied
/// against a context of type `C`.
///
/// Applying consumes the prototype.
pub struct Prototype<F: Family, C> {
    name: String,
    build: Build<C>,
    _family: PhantomData<fn() -> F>,
}

impl<F: Family, C> Prototype<F, C> {
    /// Wrap a construction closure.
    ///
    /// The closure must create the component and append it to the
    /// context's list of family `F`, returning the new identity.
    pub fn new<B>(name: impl Into<String>, build: B) -> Self
    where
        B: FnOnce(&mut C) -> Result<ObjectId, ComponentError> + Send + 'static,
    {
        Self {
            name: name.into(),
            build: Box::new(build),
            _family: PhantomData,
        }
    }

    /// Name the component will carry.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Build the component against `ctx` and attach it.
    pub fn apply(self, ctx: &mut C) -> Result<ObjectId, ComponentError> {
        trace!(family = F::LABEL, name = %self.name, "applying prototype");
        (self.build)(ctx)
    }
}

impl<F: Family, C> fmt::Debug for Prototype<F, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Prototype")
            .field("family", &F::LABEL)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::CollisionOp;

    #[test]
    fn apply_runs_closure_once_with_context() {
        let proto = Prototype::<CollisionOp, Vec<String>>::new("drag", |ctx| {
            ctx.push("drag".into());
            Ok(ObjectId(ctx.len() as u64))
        });
        assert_eq!(proto.name(), "drag");
        let mut ctx = Vec::new();
        assert_eq!(proto.apply(&mut ctx), Ok(ObjectId(1)));
        assert_eq!(ctx, vec!["drag".to_string()]);
    }

    #[test]
    fn errors_propagate() {
        let proto = Prototype::<CollisionOp, ()>::new("bad", |_| {
            Err(ComponentError::Configuration {
                reason: "nope".into(),
            })
        });
        assert!(matches!(
            proto.apply(&mut ()),
            Err(ComponentError::Configuration { .. })
        ));
    }
}
