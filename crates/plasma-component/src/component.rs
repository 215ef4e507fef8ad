//! A single named, identified component of some family.

use std::any::Any;
use std::fmt;

use plasma_checkpt::{
    Checkpoint, CheckpointError, ObjectRegistry, ObjectTable, Persist, Reanimate, RecordReader,
    RecordWriter,
};
use plasma_core::{ComponentError, ComponentId, ObjectId};

use crate::family::{Family, Kind};
use crate::symbols::Symbols;

/// Position of a linked component within its list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Link {
    /// Last component in native order (the first one appended).
    End,
    /// The component appended immediately before this one.
    Next(ObjectId),
}

/// A behavior function together with the symbol it was resolved from.
#[derive(Clone, Copy)]
pub struct BoundBehavior<B> {
    /// Symbol name in the family's table.
    pub symbol: &'static str,
    /// The resolved function.
    pub f: B,
}

impl<B> fmt::Debug for BoundBehavior<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol)
    }
}

/// One component of family `F`.
///
/// Created unlinked and registered; [`ComponentList::append`] links it,
/// assigns its id and takes ownership.
///
/// [`ComponentList::append`]: crate::list::ComponentList::append
#[derive(Clone, Debug)]
pub struct Component<F: Family> {
    object: ObjectId,
    name: String,
    id: Option<ComponentId>,
    kind: F::Kind,
    params: F::Params,
    behavior: Option<BoundBehavior<F::Behavior>>,
    link: Option<Link>,
}

impl<F: Family> Component<F> {
    /// Create and register a new unlinked component.
    ///
    /// `behavior` names a symbol in the family's table. Resolution
    /// happens before registration, so a failure registers nothing.
    ///
    /// # Errors
    ///
    /// [`ComponentError::UnknownBehavior`] if `behavior` is not bound.
    pub fn create(
        registry: &mut ObjectRegistry,
        symbols: &Symbols,
        name: &str,
        kind: F::Kind,
        params: F::Params,
        behavior: Option<&str>,
    ) -> Result<Self, ComponentError> {
        let behavior = match behavior {
            Some(symbol) => {
                let (symbol, f) = F::symbols(symbols).resolve(symbol).ok_or_else(|| {
                    ComponentError::UnknownBehavior {
                        family: F::LABEL,
                        symbol: symbol.to_string(),
                    }
                })?;
                Some(BoundBehavior { symbol, f })
            }
            None => None,
        };
        let object = registry.register(F::TAG);
        Ok(Self {
            object,
            name: name.to_string(),
            id: None,
            kind,
            params,
            behavior,
            link: None,
        })
    }

    /// Registry identity.
    pub fn object_id(&self) -> ObjectId {
        self.object
    }

    /// Component name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Id assigned at append, `None` while unlinked.
    pub fn id(&self) -> Option<ComponentId> {
        self.id
    }

    /// Variant kind.
    pub fn kind(&self) -> F::Kind {
        self.kind
    }

    /// Parameter payload.
    pub fn params(&self) -> &F::Params {
        &self.params
    }

    /// Mutable parameter payload.
    pub fn params_mut(&mut self) -> &mut F::Params {
        &mut self.params
    }

    /// Bound behavior, if any.
    pub fn behavior(&self) -> Option<&BoundBehavior<F::Behavior>> {
        self.behavior.as_ref()
    }

    /// Link to the next component in native order, `None` while unlinked.
    pub fn link(&self) -> Option<Link> {
        self.link
    }

    /// Whether the component has been appended to a list.
    pub fn is_linked(&self) -> bool {
        self.link.is_some()
    }

    pub(crate) fn attach(&mut self, id: ComponentId, link: Link) {
        self.id = Some(id);
        self.link = Some(link);
    }

    pub(crate) fn parts_mut(&mut self) -> (&mut F::Params, Option<F::Behavior>) {
        (&mut self.params, self.behavior.map(|b| b.f))
    }

    /// Read a component record written by [`Checkpoint::checkpoint`].
    pub fn materialize(
        input: &mut RecordReader<'_>,
        symbols: &Symbols,
    ) -> Result<Self, CheckpointError> {
        let code = input.get_u32()?;
        let kind = F::Kind::from_code(code).ok_or_else(|| {
            CheckpointError::format(format!("unknown {} kind code {code}", F::LABEL))
        })?;
        let id = match input.get_u8()? {
            0 => None,
            _ => Some(ComponentId(input.get_i64()?)),
        };
        let linked = input.get_u8()? != 0;

        let name = input.str()?;
        let behavior = match input.sym()? {
            Some(symbol) => {
                let (symbol, f) = F::symbols(symbols).resolve(&symbol).ok_or_else(|| {
                    CheckpointError::format(format!(
                        "unknown {} behavior '{symbol}' for '{name}'",
                        F::LABEL
                    ))
                })?;
                Some(BoundBehavior { symbol, f })
            }
            None => None,
        };
        let next = input.ptr()?;
        let link = match (linked, next) {
            (false, None) => None,
            (true, None) => Some(Link::End),
            (true, Some(next)) => Some(Link::Next(next)),
            (false, Some(_)) => {
                return Err(CheckpointError::format(format!(
                    "unlinked {} '{name}' has a successor",
                    F::LABEL
                )))
            }
        };
        let params = F::Params::restore(input)?;

        Ok(Self {
            object: input.object(),
            name,
            id,
            kind,
            params,
            behavior,
            link,
        })
    }
}

impl<F: Family> Checkpoint for Component<F> {
    fn type_tag(&self) -> &'static str {
        F::TAG
    }

    fn checkpoint(&self, out: &mut RecordWriter) -> Result<(), CheckpointError> {
        out.put_u32(self.kind.code());
        match self.id {
            Some(id) => {
                out.put_u8(1);
                out.put_i64(id.0);
            }
            None => out.put_u8(0),
        }
        out.put_u8(u8::from(self.link.is_some()));

        out.str(&self.name);
        out.sym(self.behavior.map(|b| b.symbol));
        out.ptr(match self.link {
            Some(Link::Next(next)) => Some(next),
            _ => None,
        });
        self.params.persist(out);
        Ok(())
    }
}

impl<F: Family> Reanimate for Component<F> {
    fn reanimate(&mut self, id: ObjectId, table: &ObjectTable) -> Result<(), CheckpointError> {
        if let Some(Link::Next(next)) = self.link {
            if table.tag_of(next) != Some(F::TAG) {
                return Err(CheckpointError::Unresolved {
                    from: id,
                    target: next,
                });
            }
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}
