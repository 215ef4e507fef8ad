//! The list mirror: a control layer's cached view of one component list.
//!
//! The mirror never owns components. It caches member names and handles
//! in append order, stamped with the list's instance, count and version, and
//! rebuilds lazily before every read whose stamp no longer matches.
//! Mutations go through the host's own entry points: prototypes append,
//! [`ListHost::clear_list`] tears down.

use plasma_component::{ComponentList, Family, ListHost, Prototype};
use plasma_core::{ComponentError, ListInstanceId, ListVersion, LookupError};
use tracing::{debug, info};

use crate::handle::ComponentHandle;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Stamp {
    instance: ListInstanceId,
    count: usize,
    version: ListVersion,
}

impl Stamp {
    fn of<F: Family>(list: &ComponentList<F>) -> Self {
        Self {
            instance: list.instance(),
            count: list.count(),
            version: list.version(),
        }
    }
}

/// Cached, append-ordered view of the list of family `F`.
///
/// A mirror follows whichever list it last read. Reading a different
/// list instance, such as another simulation's or a restored one, forces a
/// rebuild.
#[derive(Debug)]
pub struct ListMirror<F: Family> {
    keys: Vec<String>,
    handles: Vec<ComponentHandle<F>>,
    stamp: Option<Stamp>,
}

impl<F: Family> Default for ListMirror<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Family> ListMirror<F> {
    /// An empty mirror; the first read populates it.
    pub fn new() -> Self {
        Self {
            keys: Vec::new(),
            handles: Vec::new(),
            stamp: None,
        }
    }

    /// Re-read `list` if it changed since the last rebuild.
    ///
    /// Returns whether a rebuild happened.
    pub fn rebuild_if_stale(&mut self, list: &ComponentList<F>) -> bool {
        let stamp = Stamp::of(list);
        if self.stamp == Some(stamp) {
            return false;
        }
        self.keys.clear();
        self.handles.clear();
        for component in list.iter() {
            self.keys.push(component.name().to_string());
            self.handles.push(ComponentHandle::new(
                stamp.instance,
                component.object_id(),
                stamp.version,
            ));
        }
        debug!(
            family = F::LABEL,
            list = %stamp.instance,
            count = stamp.count,
            version = %stamp.version,
            "rebuilt list mirror"
        );
        self.stamp = Some(stamp);
        true
    }

    fn refresh<C: ListHost<F>>(&mut self, host: &C) {
        self.rebuild_if_stale(host.list());
    }

    /// Number of members.
    pub fn size<C: ListHost<F>>(&mut self, host: &C) -> usize {
        self.refresh(host);
        self.keys.len()
    }

    /// Handle to the member at append-order position `index`.
    ///
    /// # Errors
    ///
    /// [`LookupError::Index`] if `index >= size()`.
    pub fn at<C: ListHost<F>>(
        &mut self,
        host: &C,
        index: usize,
    ) -> Result<ComponentHandle<F>, LookupError> {
        self.refresh(host);
        self.handles.get(index).copied().ok_or(LookupError::Index {
            index,
            len: self.handles.len(),
        })
    }

    /// Handle to the first member, in append order, named `name`.
    ///
    /// # Errors
    ///
    /// [`LookupError::Key`] if no member has that name.
    pub fn get<C: ListHost<F>>(
        &mut self,
        host: &C,
        name: &str,
    ) -> Result<ComponentHandle<F>, LookupError> {
        self.refresh(host);
        self.keys
            .iter()
            .position(|k| k == name)
            .map(|i| self.handles[i])
            .ok_or_else(|| LookupError::Key {
                name: name.to_string(),
            })
    }

    /// Whether a member is named `name`.
    pub fn contains<C: ListHost<F>>(&mut self, host: &C, name: &str) -> bool {
        self.refresh(host);
        self.keys.iter().any(|k| k == name)
    }

    /// Member names in append order.
    pub fn keys<C: ListHost<F>>(&mut self, host: &C) -> &[String] {
        self.refresh(host);
        &self.keys
    }

    /// Names and handles in append order.
    pub fn iter<C: ListHost<F>>(
        &mut self,
        host: &C,
    ) -> impl ExactSizeIterator<Item = (&str, ComponentHandle<F>)> + '_ {
        self.refresh(host);
        self.keys
            .iter()
            .map(String::as_str)
            .zip(self.handles.iter().copied())
    }

    /// Handle to the most recently appended member.
    pub fn head<C: ListHost<F>>(&mut self, host: &C) -> Option<ComponentHandle<F>> {
        self.refresh(host);
        self.handles.last().copied()
    }

    /// Apply `proto` against `host` and return a handle to the new member.
    pub fn append<C: ListHost<F>>(
        &mut self,
        host: &mut C,
        proto: Prototype<F, C>,
    ) -> Result<ComponentHandle<F>, ComponentError> {
        let object = proto.apply(host)?;
        self.refresh(&*host);
        let list = host.list();
        Ok(ComponentHandle::new(list.instance(), object, list.version()))
    }

    /// Apply each prototype in order, stopping at the first failure.
    ///
    /// Members appended before the failure stay.
    pub fn extend<C, I>(&mut self, host: &mut C, protos: I) -> Result<(), ComponentError>
    where
        C: ListHost<F>,
        I: IntoIterator<Item = Prototype<F, C>>,
    {
        for proto in protos {
            self.append(host, proto)?;
        }
        Ok(())
    }

    /// Tear the list down and rebuild it from `protos`.
    ///
    /// Every handle taken before the call goes stale. If a prototype
    /// fails, the members built before it stay and the error is returned.
    pub fn replace_all<C, I>(&mut self, host: &mut C, protos: I) -> Result<(), ComponentError>
    where
        C: ListHost<F>,
        I: IntoIterator<Item = Prototype<F, C>>,
    {
        let removed = host.list().len();
        host.clear_list();
        self.stamp = None;
        let result = self.extend(host, protos);
        self.refresh(&*host);
        info!(
            family = F::LABEL,
            removed,
            added = self.keys.len(),
            "replaced list"
        );
        result
    }

    /// Python-style rendering of the keys, e.g. `['a', 'b']`.
    pub fn render<C: ListHost<F>>(&mut self, host: &C) -> String {
        self.refresh(host);
        let quoted: Vec<_> = self.keys.iter().map(|k| format!("'{k}'")).collect();
        format!("[{}]", quoted.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plasma_checkpt::ObjectRegistry;
    use plasma_component::{CollisionKind, CollisionOp, Component, Symbols};

    struct Host {
        registry: ObjectRegistry,
        symbols: Symbols,
        ops: ComponentList<CollisionOp>,
    }

    impl Host {
        fn new() -> Self {
            let mut registry = ObjectRegistry::new();
            let ops = ComponentList::new(&mut registry);
            Self {
                registry,
                symbols: Symbols::new(),
                ops,
            }
        }
    }

    impl ListHost<CollisionOp> for Host {
        fn list(&self) -> &ComponentList<CollisionOp> {
            &self.ops
        }

        fn list_mut(&mut self) -> &mut ComponentList<CollisionOp> {
            &mut self.ops
        }

        fn clear_list(&mut self) {
            self.ops.clear(&mut self.registry);
        }
    }

    fn op(name: &str) -> Prototype<CollisionOp, Host> {
        let name = name.to_string();
        Prototype::new(name.clone(), move |host: &mut Host| {
            let c = Component::<CollisionOp>::create(
                &mut host.registry,
                &host.symbols,
                &name,
                CollisionKind::Unknown,
                Vec::new(),
                None,
            )?;
            host.ops.append(c)
        })
    }

    #[test]
    fn empty_mirror_renders_empty_list() {
        let host = Host::new();
        let mut mirror = ListMirror::<CollisionOp>::new();
        assert_eq!(mirror.render(&host), "[]");
        assert_eq!(mirror.size(&host), 0);
        assert!(mirror.head(&host).is_none());
    }

    #[test]
    fn rebuild_is_idempotent() {
        let mut host = Host::new();
        let mut mirror = ListMirror::new();
        mirror.extend(&mut host, [op("x"), op("y")]).unwrap();
        assert!(!mirror.rebuild_if_stale(&host.ops));
        let first = (mirror.keys.clone(), mirror.handles.clone());
        assert!(!mirror.rebuild_if_stale(&host.ops));
        assert_eq!((mirror.keys.clone(), mirror.handles.clone()), first);
        assert_eq!(mirror.render(&host), "['x', 'y']");
    }

    #[test]
    fn direct_appends_are_picked_up() {
        let mut host = Host::new();
        let mut mirror = ListMirror::new();
        assert_eq!(mirror.size(&host), 0);
        op("z").apply(&mut host).unwrap();
        assert_eq!(mirror.keys(&host), ["z".to_string()]);
    }
}
