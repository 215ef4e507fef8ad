//! Materializer wiring for component records.

use std::sync::Arc;

use plasma_checkpt::{Materializers, Reanimate};

use crate::boundary::ParticleBc;
use crate::collision::CollisionOp;
use crate::component::Component;
use crate::emitter::Emitter;
use crate::family::Family;
use crate::list::StagedList;
use crate::symbols::Symbols;

/// Register the component and list materializers of family `F`.
///
/// Component records resolve their behavior symbols through `symbols`.
pub fn define_family<F: Family>(materializers: &mut Materializers, symbols: &Arc<Symbols>) {
    let symbols = Arc::clone(symbols);
    materializers.define(F::TAG, move |input| {
        let component = Component::<F>::materialize(input, &symbols)?;
        Ok(Box::new(component) as Box<dyn Reanimate>)
    });
    materializers.define(F::LIST_TAG, |input| {
        Ok(Box::new(StagedList::<F>::materialize(input)?) as Box<dyn Reanimate>)
    });
}

/// Register materializers for every component family.
pub fn define_all(materializers: &mut Materializers, symbols: &Arc<Symbols>) {
    define_family::<ParticleBc>(materializers, symbols);
    define_family::<CollisionOp>(materializers, symbols);
    define_family::<Emitter>(materializers, symbols);
}
