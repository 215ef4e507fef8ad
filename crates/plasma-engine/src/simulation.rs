//! The simulation context: owner of the registry and every component list.
//!
//! A [`Simulation`] registers three objects of its own before anything
//! else: the control-state slot (object 0), itself (object 1), and its
//! three component lists. Every component created through it is appended
//! to one of those lists in the same call, so a live simulation never
//! holds a registered component that no list reaches.

use std::any::Any;
use std::sync::Arc;

use plasma_checkpt::{
    Checkpoint, CheckpointError, Materializers, ObjectRegistry, ObjectStore, ObjectTable,
    Reanimate, RecordReader, RecordWriter, StreamHeader,
};
use plasma_component::restore;
use plasma_component::{
    BoundaryKind, BoundaryParams, CollisionKind, CollisionOp, Component, ComponentList,
    Disposition, Emitter, EmitterKind, EmitterParams, Family, Hit, ListHost, ParticleBc,
    StagedList, Symbols,
};
use plasma_core::{
    ComponentError, ComponentId, FieldArray, LookupError, ObjectId, Species, SpeciesList,
};
use tracing::{debug, info, trace};

use crate::control::{ControlState, CONTROL_STATE_TAG};

/// Registry tag of the simulation record.
pub const SIMULATION_TAG: &str = "simulation";

/// A simulation and everything it owns.
#[derive(Debug)]
pub struct Simulation {
    registry: ObjectRegistry,
    symbols: Arc<Symbols>,
    object: ObjectId,
    control_id: ObjectId,
    control: ControlState,
    species: SpeciesList,
    field_array: Option<FieldArray>,
    step: u64,
    particle_bcs: ComponentList<ParticleBc>,
    collision_ops: ComponentList<CollisionOp>,
    emitters: ComponentList<Emitter>,
}

impl Simulation {
    /// Create an empty simulation resolving behaviors through `symbols`.
    pub fn new(symbols: Arc<Symbols>) -> Self {
        let mut registry = ObjectRegistry::new();
        let control_id = registry.register(CONTROL_STATE_TAG);
        let object = registry.register(SIMULATION_TAG);
        let particle_bcs = ComponentList::new(&mut registry);
        let collision_ops = ComponentList::new(&mut registry);
        let emitters = ComponentList::new(&mut registry);
        Self {
            registry,
            symbols,
            object,
            control_id,
            control: ControlState::default(),
            species: SpeciesList::new(),
            field_array: None,
            step: 0,
            particle_bcs,
            collision_ops,
            emitters,
        }
    }

    /// Registry identity of the simulation itself.
    pub fn object_id(&self) -> ObjectId {
        self.object
    }

    /// The object registry.
    pub fn registry(&self) -> &ObjectRegistry {
        &self.registry
    }

    /// Behavior symbol tables.
    pub fn symbols(&self) -> &Arc<Symbols> {
        &self.symbols
    }

    /// Control-layer state from the last checkpoint or restore.
    pub fn control_state(&self) -> &ControlState {
        &self.control
    }

    pub(crate) fn control_state_mut(&mut self) -> &mut ControlState {
        &mut self.control
    }

    /// Completed steps.
    pub fn step(&self) -> u64 {
        self.step
    }

    /// Define a species, returning its index.
    pub fn define_species(&mut self, name: &str, q: f32, m: f32) -> Result<usize, ComponentError> {
        let index = self.species.define(name, q, m)?;
        debug!(name, index, "defined species");
        Ok(index)
    }

    /// Species in definition order.
    pub fn species(&self) -> &SpeciesList {
        &self.species
    }

    /// Mutable species list.
    pub fn species_mut(&mut self) -> &mut SpeciesList {
        &mut self.species
    }

    /// Define the field array.
    ///
    /// # Errors
    ///
    /// [`ComponentError::Configuration`] if one is already defined.
    pub fn define_field_array(&mut self, damp: f32) -> Result<(), ComponentError> {
        if self.field_array.is_some() {
            return Err(ComponentError::Configuration {
                reason: "field array is already defined".into(),
            });
        }
        self.field_array = Some(FieldArray { damp });
        Ok(())
    }

    /// The field array, if defined.
    pub fn field_array(&self) -> Option<&FieldArray> {
        self.field_array.as_ref()
    }

    /// The list of family `F`.
    pub fn list<F: Family>(&self) -> &ComponentList<F>
    where
        Self: ListHost<F>,
    {
        ListHost::<F>::list(self)
    }

    /// Mutable list of family `F`.
    pub fn list_mut<F: Family>(&mut self) -> &mut ComponentList<F>
    where
        Self: ListHost<F>,
    {
        ListHost::<F>::list_mut(self)
    }

    /// Particle boundary conditions.
    pub fn particle_bcs(&self) -> &ComponentList<ParticleBc> {
        &self.particle_bcs
    }

    /// Collision operators.
    pub fn collision_ops(&self) -> &ComponentList<CollisionOp> {
        &self.collision_ops
    }

    /// Emitters.
    pub fn emitters(&self) -> &ComponentList<Emitter> {
        &self.emitters
    }

    /// Create a component of family `F` and append it to its list.
    ///
    /// Returns the component's registry identity.
    pub fn define<F: Family>(
        &mut self,
        name: &str,
        kind: F::Kind,
        params: F::Params,
        behavior: Option<&str>,
    ) -> Result<ObjectId, ComponentError>
    where
        Self: ListHost<F>,
    {
        let component = Component::<F>::create(
            &mut self.registry,
            &self.symbols,
            name,
            kind,
            params,
            behavior,
        )?;
        self.attach(component)
    }

    fn attach<F: Family>(&mut self, component: Component<F>) -> Result<ObjectId, ComponentError>
    where
        Self: ListHost<F>,
    {
        let object = component.object_id();
        match ListHost::<F>::list_mut(self).append(component) {
            Ok(object) => Ok(object),
            Err(err) => {
                self.registry.unregister(object);
                Err(err)
            }
        }
    }

    /// Create and append a particle boundary condition.
    pub fn define_particle_bc(
        &mut self,
        name: &str,
        kind: BoundaryKind,
        params: BoundaryParams,
        behavior: Option<&str>,
    ) -> Result<ObjectId, ComponentError> {
        self.define::<ParticleBc>(name, kind, params, behavior)
    }

    /// Create and append a collision operator.
    pub fn define_collision_op(
        &mut self,
        name: &str,
        kind: CollisionKind,
        params: Vec<u8>,
        behavior: Option<&str>,
    ) -> Result<ObjectId, ComponentError> {
        self.define::<CollisionOp>(name, kind, params, behavior)
    }

    /// Create and append an emitter, sizing its voxel buffer to `voxels`
    /// entries when given.
    pub fn define_emitter(
        &mut self,
        name: &str,
        kind: EmitterKind,
        params: EmitterParams,
        behavior: Option<&str>,
        voxels: Option<usize>,
    ) -> Result<ObjectId, ComponentError> {
        let mut component = Component::<Emitter>::create(
            &mut self.registry,
            &self.symbols,
            name,
            kind,
            params,
            behavior,
        )?;
        if let Some(n) = voxels {
            let sized = component.size(n).map(|_| ());
            if let Err(err) = sized {
                self.registry.unregister(component.object_id());
                return Err(err);
            }
        }
        self.attach(component)
    }

    /// Dispatch a boundary hit to the boundary condition with `id`.
    pub fn interact(&mut self, id: ComponentId, hit: Hit) -> Result<Disposition, LookupError> {
        self.particle_bcs.interact(id, hit, &mut self.species)
    }

    /// Run one step of component behaviors: collision operators, then
    /// emitters, each in native order.
    pub fn advance(&mut self) {
        self.collision_ops.apply_all(&mut self.species);
        self.emitters.apply_all(&mut self.species);
        self.step += 1;
        trace!(step = self.step, "advanced");
    }

    /// Tear down every component list.
    pub fn reset(&mut self) {
        ListHost::<ParticleBc>::clear_list(self);
        ListHost::<CollisionOp>::clear_list(self);
        ListHost::<Emitter>::clear_list(self);
        info!(registered = self.registry.len(), "simulation reset");
    }

    /// Materializers for every record a simulation checkpoint contains.
    pub fn materializers(symbols: &Arc<Symbols>) -> Materializers {
        let mut materializers = Materializers::new();
        restore::define_all(&mut materializers, symbols);
        materializers.define(CONTROL_STATE_TAG, |input| {
            Ok(Box::new(ControlState::materialize(input)?) as Box<dyn Reanimate>)
        });
        materializers.define(SIMULATION_TAG, |input| {
            Ok(Box::new(SimulationRecord::materialize(input)?) as Box<dyn Reanimate>)
        });
        materializers
    }

    /// Rebuild a simulation from a fully reanimated table.
    ///
    /// Every staged object must be reachable from the simulation record.
    pub(crate) fn assemble(
        header: &StreamHeader,
        mut table: ObjectTable,
        symbols: Arc<Symbols>,
    ) -> Result<Self, CheckpointError> {
        let registry = table.registry(header.cursor);
        let object = table
            .find_by_tag(SIMULATION_TAG)
            .ok_or_else(|| CheckpointError::format("stream holds no simulation record"))?;
        let record: SimulationRecord = table.take(object)?;
        let control: ControlState = table.take(record.control)?;
        let particle_bcs = table
            .take::<StagedList<ParticleBc>>(record.particle_bcs)?
            .into_list(&mut table)?;
        let collision_ops = table
            .take::<StagedList<CollisionOp>>(record.collision_ops)?
            .into_list(&mut table)?;
        let emitters = table
            .take::<StagedList<Emitter>>(record.emitters)?
            .into_list(&mut table)?;

        let leftover = table.remaining();
        if !leftover.is_empty() {
            let ids: Vec<_> = leftover.iter().map(ObjectId::to_string).collect();
            return Err(CheckpointError::format(format!(
                "{} object(s) not reachable from the simulation: {}",
                leftover.len(),
                ids.join(", ")
            )));
        }

        Ok(Self {
            registry,
            symbols,
            object,
            control_id: record.control,
            control,
            species: record.species,
            field_array: record.field_array,
            step: record.step,
            particle_bcs,
            collision_ops,
            emitters,
        })
    }
}

macro_rules! impl_list_host {
    ($family:ty, $field:ident) => {
        impl ListHost<$family> for Simulation {
            fn list(&self) -> &ComponentList<$family> {
                &self.$field
            }

            fn list_mut(&mut self) -> &mut ComponentList<$family> {
                &mut self.$field
            }

            fn clear_list(&mut self) {
                self.$field.clear(&mut self.registry);
            }
        }
    };
}

impl_list_host!(ParticleBc, particle_bcs);
impl_list_host!(CollisionOp, collision_ops);
impl_list_host!(Emitter, emitters);

impl ObjectStore for Simulation {
    fn object(&self, id: ObjectId) -> Option<&dyn Checkpoint> {
        if id == self.object {
            return Some(self);
        }
        if id == self.control_id {
            return Some(&self.control);
        }
        if id == self.particle_bcs.object_id() {
            return Some(&self.particle_bcs);
        }
        if id == self.collision_ops.object_id() {
            return Some(&self.collision_ops);
        }
        if id == self.emitters.object_id() {
            return Some(&self.emitters);
        }
        self.particle_bcs
            .get(id)
            .map(|c| c as &dyn Checkpoint)
            .or_else(|| self.collision_ops.get(id).map(|c| c as &dyn Checkpoint))
            .or_else(|| self.emitters.get(id).map(|c| c as &dyn Checkpoint))
    }
}

// Blob: step, species count, per-species (q, m, np), field flag and damp.
// Fields: species names, then the control and list references.
impl Checkpoint for Simulation {
    fn type_tag(&self) -> &'static str {
        SIMULATION_TAG
    }

    fn checkpoint(&self, out: &mut RecordWriter) -> Result<(), CheckpointError> {
        out.put_u64(self.step);
        let count = u32::try_from(self.species.len())
            .map_err(|_| CheckpointError::format("too many species"))?;
        out.put_u32(count);
        for species in &self.species {
            out.put_f32(species.q);
            out.put_f32(species.m);
            out.put_u64(species.np);
            out.str(&species.name);
        }
        match &self.field_array {
            Some(fa) => {
                out.put_u8(1);
                out.put_f32(fa.damp);
            }
            None => out.put_u8(0),
        }
        out.ptr(Some(self.control_id));
        out.ptr(Some(self.particle_bcs.object_id()));
        out.ptr(Some(self.collision_ops.object_id()));
        out.ptr(Some(self.emitters.object_id()));
        Ok(())
    }
}

/// A simulation record awaiting assembly.
#[derive(Debug)]
struct SimulationRecord {
    step: u64,
    species: SpeciesList,
    field_array: Option<FieldArray>,
    control: ObjectId,
    particle_bcs: ObjectId,
    collision_ops: ObjectId,
    emitters: ObjectId,
}

impl SimulationRecord {
    fn materialize(input: &mut RecordReader<'_>) -> Result<Self, CheckpointError> {
        let step = input.get_u64()?;
        let count = input.get_u32()?;
        let mut species = SpeciesList::new();
        for _ in 0..count {
            let q = input.get_f32()?;
            let m = input.get_f32()?;
            let np = input.get_u64()?;
            let name = input.str()?;
            species.push(Species { name, q, m, np });
        }
        let field_array = match input.get_u8()? {
            0 => None,
            _ => Some(FieldArray {
                damp: input.get_f32()?,
            }),
        };
        Ok(Self {
            step,
            species,
            field_array,
            control: reference(input, "control state")?,
            particle_bcs: reference(input, "boundary list")?,
            collision_ops: reference(input, "collision list")?,
            emitters: reference(input, "emitter list")?,
        })
    }
}

fn reference(input: &mut RecordReader<'_>, what: &str) -> Result<ObjectId, CheckpointError> {
    input
        .ptr()?
        .ok_or_else(|| CheckpointError::format(format!("simulation record has no {what}")))
}

impl Reanimate for SimulationRecord {
    fn reanimate(&mut self, id: ObjectId, table: &ObjectTable) -> Result<(), CheckpointError> {
        table.resolve::<ControlState>(id, self.control)?;
        table.resolve::<StagedList<ParticleBc>>(id, self.particle_bcs)?;
        table.resolve::<StagedList<CollisionOp>>(id, self.collision_ops)?;
        table.resolve::<StagedList<Emitter>>(id, self.emitters)?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drag(state: &mut Vec<u8>, species: &mut SpeciesList) {
        state.push(1);
        if let Some(s) = species.get_mut(0) {
            s.np += 10;
        }
    }

    fn inject(state: &mut Vec<u8>, voxels: &mut [i32], species: &mut SpeciesList) {
        state.push(2);
        if let Some(first) = voxels.first_mut() {
            *first += 1;
        }
        if let Some(s) = species.get_mut(0) {
            s.np *= 2;
        }
    }

    fn sim() -> Simulation {
        let mut symbols = Symbols::with_builtins();
        symbols.define::<CollisionOp>("drag", drag);
        symbols.define::<Emitter>("inject", inject);
        Simulation::new(Arc::new(symbols))
    }

    #[test]
    fn new_registers_fixed_objects_first() {
        let sim = sim();
        let tags: Vec<_> = sim.registry().iter().map(|(_, tag)| tag).collect();
        assert_eq!(
            tags,
            vec![
                CONTROL_STATE_TAG,
                SIMULATION_TAG,
                "particle_bc_list",
                "collision_op_list",
                "emitter_list"
            ]
        );
        assert_eq!(sim.object_id(), ObjectId(1));
        assert!(sim.registry().orphans(&sim).is_empty());
    }

    #[test]
    fn materializers_cover_every_registered_tag() {
        let mut sim = sim();
        sim.define_species("electron", -1.0, 1.0).unwrap();
        sim.define_particle_bc(
            "tally",
            BoundaryKind::AbsorbTally,
            BoundaryParams::default(),
            Some("absorb_tally"),
        )
        .unwrap();
        sim.define_collision_op("drag", CollisionKind::Langevin, vec![], Some("drag"))
            .unwrap();
        sim.define_emitter("e", EmitterKind::User, EmitterParams::default(), None, None)
            .unwrap();
        let materializers = Simulation::materializers(sim.symbols());
        for (_, tag) in sim.registry().iter() {
            assert!(materializers.contains(tag), "no materializer for '{tag}'");
        }
    }

    #[test]
    fn unknown_behavior_registers_nothing() {
        let mut sim = sim();
        let before = sim.registry().len();
        let err = sim
            .define_collision_op("x", CollisionKind::User, vec![], Some("missing"))
            .unwrap_err();
        assert!(matches!(err, ComponentError::UnknownBehavior { .. }));
        assert_eq!(sim.registry().len(), before);
        assert!(sim.collision_ops().is_empty());
    }

    #[test]
    fn advance_runs_collisions_before_emitters() {
        let mut sim = sim();
        sim.define_species("electron", -1.0, 1.0).unwrap();
        sim.species_mut().get_mut(0).unwrap().np = 1;
        sim.define_collision_op("drag", CollisionKind::Langevin, vec![], Some("drag"))
            .unwrap();
        sim.define_emitter(
            "cathode",
            EmitterKind::User,
            EmitterParams::default(),
            Some("inject"),
            Some(2),
        )
        .unwrap();
        sim.advance();
        assert_eq!(sim.step(), 1);
        assert_eq!(sim.species().get(0).unwrap().np, 22);
        let emitter = sim.emitters().head().unwrap();
        assert_eq!(emitter.params().voxels.as_deref(), Some(&[1, 0][..]));
    }

    #[test]
    fn reset_leaves_only_fixed_objects() {
        let mut sim = sim();
        sim.define_species("ion", 1.0, 1836.0).unwrap();
        sim.define_particle_bc(
            "tally",
            BoundaryKind::AbsorbTally,
            BoundaryParams::default(),
            Some("absorb_tally"),
        )
        .unwrap();
        sim.define_collision_op("drag", CollisionKind::Langevin, vec![], Some("drag"))
            .unwrap();
        assert_eq!(sim.registry().len(), 7);
        sim.reset();
        assert_eq!(sim.registry().len(), 5);
        assert!(sim.particle_bcs().is_empty());
        assert!(sim.registry().orphans(&sim).is_empty());
    }

    #[test]
    fn field_array_defined_once() {
        let mut sim = sim();
        sim.define_field_array(0.01).unwrap();
        assert!(matches!(
            sim.define_field_array(0.02),
            Err(ComponentError::Configuration { .. })
        ));
        assert_eq!(sim.field_array().map(|f| f.damp), Some(0.01));
    }

    #[test]
    fn interact_dispatches_builtins_without_members() {
        let mut sim = sim();
        sim.define_species("electron", -1.0, 1.0).unwrap();
        sim.species_mut().get_mut(0).unwrap().np = 3;
        let hit = Hit {
            species: 0,
            face: 0,
        };
        assert_eq!(
            sim.interact(plasma_component::ABSORB_PARTICLES, hit),
            Ok(Disposition::Absorbed)
        );
        assert_eq!(sim.species().get(0).unwrap().np, 2);
        assert_eq!(
            sim.interact(ComponentId(-3), hit),
            Err(LookupError::Id { id: ComponentId(-3) })
        );
    }
}
