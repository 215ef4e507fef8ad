//! List behavior across the public API, including stream round trips.

use std::sync::Arc;

use plasma_checkpt::{
    read_stream, write_stream, Checkpoint, CheckpointError, Materializers, ObjectRegistry,
    ObjectStore, StreamOrigin,
};
use plasma_component::restore::define_all;
use plasma_component::{
    BoundaryKind, BoundaryParams, CollisionKind, CollisionOp, Component, ComponentList,
    EmitterKind, EmitterParams, Emitter, ParticleBc, StagedList, Symbols,
};
use plasma_core::{ComponentError, ComponentId, ObjectId, SpeciesList};
use proptest::prelude::*;

fn drag(state: &mut Vec<u8>, species: &mut SpeciesList) {
    state.push(species.len() as u8);
}

fn symbols() -> Arc<Symbols> {
    let mut symbols = Symbols::with_builtins();
    symbols.define::<CollisionOp>("drag", drag);
    Arc::new(symbols)
}

struct Lists {
    registry: ObjectRegistry,
    bcs: ComponentList<ParticleBc>,
    ops: ComponentList<CollisionOp>,
    emitters: ComponentList<Emitter>,
}

impl ObjectStore for Lists {
    fn object(&self, id: ObjectId) -> Option<&dyn Checkpoint> {
        if id == self.bcs.object_id() {
            return Some(&self.bcs);
        }
        if id == self.ops.object_id() {
            return Some(&self.ops);
        }
        if id == self.emitters.object_id() {
            return Some(&self.emitters);
        }
        self.bcs
            .get(id)
            .map(|c| c as &dyn Checkpoint)
            .or_else(|| self.ops.get(id).map(|c| c as &dyn Checkpoint))
            .or_else(|| self.emitters.get(id).map(|c| c as &dyn Checkpoint))
    }
}

fn build(symbols: &Symbols) -> Lists {
    let mut registry = ObjectRegistry::new();
    let bcs = ComponentList::new(&mut registry);
    let ops = ComponentList::new(&mut registry);
    let emitters = ComponentList::new(&mut registry);
    let mut lists = Lists {
        registry,
        bcs,
        ops,
        emitters,
    };

    for name in ["a", "b", "c"] {
        let c = Component::<ParticleBc>::create(
            &mut lists.registry,
            symbols,
            name,
            BoundaryKind::AbsorbTally,
            BoundaryParams::Tally {
                absorbed: [0, 0].into_iter().collect(),
            },
            Some("absorb_tally"),
        )
        .unwrap();
        lists.bcs.append(c).unwrap();
    }
    let op = Component::<CollisionOp>::create(
        &mut lists.registry,
        symbols,
        "drag",
        CollisionKind::Langevin,
        vec![7, 8],
        Some("drag"),
    )
    .unwrap();
    lists.ops.append(op).unwrap();
    let mut emitter = Component::<Emitter>::create(
        &mut lists.registry,
        symbols,
        "cathode",
        EmitterKind::ChildLangmuir,
        EmitterParams::new(vec![1]),
        None,
    )
    .unwrap();
    emitter.size(3).unwrap().copy_from_slice(&[5, -6, 7]);
    lists.emitters.append(emitter).unwrap();
    lists
}

fn origin() -> StreamOrigin {
    StreamOrigin {
        producer: "lists-test".into(),
        rank: 0,
        world_size: 1,
    }
}

#[test]
fn lists_survive_a_stream_round_trip() {
    let symbols = symbols();
    let lists = build(&symbols);
    let mut buf = Vec::new();
    write_stream(&mut buf, &origin(), &lists.registry, &lists).unwrap();

    let mut materializers = Materializers::new();
    define_all(&mut materializers, &symbols);
    let (header, mut table) = read_stream(&mut buf.as_slice(), &materializers).unwrap();
    assert_eq!(header.object_count, lists.registry.len() as u64);
    table.reanimate_all().unwrap();

    let staged: StagedList<ParticleBc> = table.take(lists.bcs.object_id()).unwrap();
    let bcs = staged.into_list(&mut table).unwrap();
    let names: Vec<_> = bcs.iter().map(|c| c.name().to_string()).collect();
    assert_eq!(names, vec!["a", "b", "c"]);
    let ids: Vec<_> = bcs.iter().map(|c| c.id()).collect();
    let original_ids: Vec<_> = lists.bcs.iter().map(|c| c.id()).collect();
    assert_eq!(ids, original_ids);
    assert_eq!(bcs.count(), 3);
    assert_eq!(
        bcs.head().unwrap().behavior().unwrap().symbol,
        "absorb_tally"
    );

    let staged: StagedList<Emitter> = table.take(lists.emitters.object_id()).unwrap();
    let emitters = staged.into_list(&mut table).unwrap();
    assert_eq!(
        emitters.head().unwrap().params().voxels.as_deref(),
        Some(&[5, -6, 7][..])
    );

    let staged: StagedList<CollisionOp> = table.take(lists.ops.object_id()).unwrap();
    let ops = staged.into_list(&mut table).unwrap();
    assert_eq!(ops.head().unwrap().params(), &vec![7, 8]);
    assert!(table.is_empty());
}

#[test]
fn restore_rejects_unbound_behavior_symbol() {
    let symbols = symbols();
    let lists = build(&symbols);
    let mut buf = Vec::new();
    write_stream(&mut buf, &origin(), &lists.registry, &lists).unwrap();

    let mut materializers = Materializers::new();
    define_all(&mut materializers, &Arc::new(Symbols::with_builtins()));
    match read_stream(&mut buf.as_slice(), &materializers) {
        Err(CheckpointError::StreamFormat { detail }) => {
            assert!(detail.contains("drag"), "{detail}")
        }
        other => panic!("expected StreamFormat, got {other:?}"),
    }
}

#[test]
fn clone_of_linked_member_cannot_be_appended() {
    let symbols = symbols();
    let mut lists = build(&symbols);
    let copy = lists.bcs.head().unwrap().clone();
    let before = lists.registry.len();
    assert_eq!(
        lists.bcs.append(copy),
        Err(ComponentError::AlreadyLinked { name: "c".into() })
    );
    assert_eq!(lists.registry.len(), before);
    assert_eq!(lists.bcs.len(), 3);
}

#[test]
fn clear_unregisters_members_and_bumps_version() {
    let symbols = symbols();
    let mut lists = build(&symbols);
    let members: Vec<_> = lists.bcs.iter().map(|c| c.object_id()).collect();
    let version = lists.bcs.version();
    lists.bcs.clear(&mut lists.registry);
    assert!(lists.bcs.is_empty());
    assert_eq!(lists.bcs.count(), 0);
    assert_ne!(lists.bcs.version(), version);
    for id in members {
        assert!(!lists.registry.contains(id));
    }
    assert!(lists.registry.contains(lists.bcs.object_id()));
}

#[test]
fn find_by_id_sees_member_ids() {
    let symbols = symbols();
    let lists = build(&symbols);
    let found = lists.bcs.find_by_id(ComponentId(-5)).unwrap();
    assert_eq!(found.name(), "c");
    assert!(lists.bcs.find_by_name("missing").is_none());
}

proptest! {
    #[test]
    fn append_order_and_count_agree(kinds in proptest::collection::vec(0u8..3, 0..24)) {
        let symbols = Symbols::new();
        let mut registry = ObjectRegistry::new();
        let mut list = ComponentList::<ParticleBc>::new(&mut registry);
        let mut names = Vec::new();
        for (i, k) in kinds.iter().enumerate() {
            let kind = match k {
                0 => BoundaryKind::Unknown,
                1 => BoundaryKind::Reflect,
                _ => BoundaryKind::Absorb,
            };
            let name = format!("bc{i}");
            let c = Component::<ParticleBc>::create(
                &mut registry, &symbols, &name, kind, BoundaryParams::None, None,
            ).unwrap();
            list.append(c).unwrap();
            names.push(name);
        }
        prop_assert_eq!(list.count(), kinds.len());
        let order: Vec<_> = list.iter().map(|c| c.name().to_string()).collect();
        prop_assert_eq!(order, names.clone());
        let native: Vec<_> = list.iter_native().map(|c| c.name().to_string()).collect();
        let mut reversed = names;
        reversed.reverse();
        prop_assert_eq!(native, reversed);
    }
}
