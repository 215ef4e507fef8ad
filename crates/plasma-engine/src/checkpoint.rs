//! Whole-process checkpoint and restore.
//!
//! A checkpoint or restore runs inside a session: [`CheckpointSession`]
//! or [`RestoreSession`], obtained from [`Services`]. Only one session
//! can be open at a time, and the session value is what the control
//! layer's pickle and unpickle callbacks receive, so control-state
//! serialization cannot run outside a sanctioned window.
//!
//! Checkpoints are unbarriered; each rank writes its own stream. Restore
//! meets every rank at two barriers (after materialization, after
//! reanimation and assembly) and fails on every rank if any rank failed.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use plasma_checkpt::{read_stream, write_stream, CheckpointError, Phase, StreamHeader};
use plasma_component::Symbols;
use tracing::{debug, info, warn};

use crate::services::Services;
use crate::simulation::Simulation;

fn enter(services: &Services, requested: Phase) -> Result<(), CheckpointError> {
    let phase = services.phase_cell();
    let active = phase.get();
    if active != Phase::Idle {
        return Err(CheckpointError::Reentrant { requested, active });
    }
    phase.set(requested);
    Ok(())
}

/// Proof that a checkpoint is in progress. Ends the phase when dropped.
#[derive(Debug)]
pub struct CheckpointSession<'a> {
    services: &'a Services,
}

impl CheckpointSession<'_> {
    /// Rank writing the checkpoint.
    pub fn rank(&self) -> u32 {
        self.services.rank()
    }
}

impl Drop for CheckpointSession<'_> {
    fn drop(&mut self) {
        self.services.phase_cell().set(Phase::Idle);
    }
}

/// Proof that a restore is in progress. Ends the phase when dropped.
#[derive(Debug)]
pub struct RestoreSession<'a> {
    services: &'a Services,
}

impl RestoreSession<'_> {
    /// Rank performing the restore.
    pub fn rank(&self) -> u32 {
        self.services.rank()
    }
}

impl Drop for RestoreSession<'_> {
    fn drop(&mut self) {
        self.services.phase_cell().set(Phase::Idle);
    }
}

/// Per-rank checkpoint file name: `base` with `.rank` appended.
pub fn rank_path(base: &Path, rank: u32) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(format!(".{rank}"));
    PathBuf::from(name)
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".partial");
    PathBuf::from(name)
}

impl Services {
    /// Open a checkpoint session.
    ///
    /// # Errors
    ///
    /// [`CheckpointError::Reentrant`] if a checkpoint or restore is
    /// already in progress. The active phase is left as it was.
    pub fn begin_checkpoint(&self) -> Result<CheckpointSession<'_>, CheckpointError> {
        enter(self, Phase::Checkpoint)?;
        Ok(CheckpointSession { services: self })
    }

    /// Open a restore session.
    ///
    /// # Errors
    ///
    /// [`CheckpointError::Reentrant`] if a checkpoint or restore is
    /// already in progress. The active phase is left as it was.
    pub fn begin_restore(&self) -> Result<RestoreSession<'_>, CheckpointError> {
        enter(self, Phase::Restore)?;
        Ok(RestoreSession { services: self })
    }

    /// Checkpoint `sim` to `out`.
    ///
    /// `pickle` serializes the control layer's state; its bytes are stored
    /// in the simulation's control-state object and written with
    /// everything else. Returns the number of objects written.
    pub fn checkpt<P>(
        &self,
        sim: &mut Simulation,
        out: &mut dyn Write,
        pickle: P,
    ) -> Result<u64, CheckpointError>
    where
        P: FnOnce(&CheckpointSession<'_>) -> Result<Vec<u8>, CheckpointError>,
    {
        let session = self.begin_checkpoint()?;
        self.write_checkpoint(&session, sim, out, pickle)
    }

    /// Checkpoint `sim` to the file at `path`.
    ///
    /// The stream is written to `<path>.partial` and renamed into place
    /// only once complete; on failure the partial file is removed and any
    /// existing file at `path` is untouched.
    pub fn checkpt_to_path<P>(
        &self,
        sim: &mut Simulation,
        path: &Path,
        pickle: P,
    ) -> Result<u64, CheckpointError>
    where
        P: FnOnce(&CheckpointSession<'_>) -> Result<Vec<u8>, CheckpointError>,
    {
        let session = self.begin_checkpoint()?;
        let partial = partial_path(path);
        match self.write_file(&session, sim, &partial, pickle) {
            Ok(count) => {
                fs::rename(&partial, path)?;
                info!(path = %path.display(), objects = count, "checkpoint committed");
                Ok(count)
            }
            Err(e) => {
                if let Err(rm) = fs::remove_file(&partial) {
                    debug!(path = %partial.display(), error = %rm, "no partial checkpoint to remove");
                }
                Err(e)
            }
        }
    }

    fn write_file<P>(
        &self,
        session: &CheckpointSession<'_>,
        sim: &mut Simulation,
        partial: &Path,
        pickle: P,
    ) -> Result<u64, CheckpointError>
    where
        P: FnOnce(&CheckpointSession<'_>) -> Result<Vec<u8>, CheckpointError>,
    {
        let mut out = BufWriter::new(File::create(partial)?);
        let count = self.write_checkpoint(session, sim, &mut out, pickle)?;
        let file = out
            .into_inner()
            .map_err(|e| CheckpointError::Io(e.into_error()))?;
        file.sync_all()?;
        Ok(count)
    }

    fn write_checkpoint<P>(
        &self,
        session: &CheckpointSession<'_>,
        sim: &mut Simulation,
        out: &mut dyn Write,
        pickle: P,
    ) -> Result<u64, CheckpointError>
    where
        P: FnOnce(&CheckpointSession<'_>) -> Result<Vec<u8>, CheckpointError>,
    {
        let bytes = pickle(session)?;
        sim.control_state_mut().replace(bytes);
        let sim: &Simulation = sim;

        let orphans = sim.registry().orphans(sim);
        if !orphans.is_empty() {
            for id in &orphans {
                warn!(
                    object = %id,
                    tag = sim.registry().tag_of(*id).unwrap_or("?"),
                    "registered object is unreachable"
                );
            }
            return Err(CheckpointError::Orphaned { ids: orphans });
        }

        let count = write_stream(out, &self.origin(), sim.registry(), sim)?;
        out.flush()?;
        info!(
            rank = self.rank(),
            objects = count,
            step = sim.step(),
            "checkpoint written"
        );
        Ok(count)
    }

    /// Restore a simulation from `input`.
    ///
    /// Behaviors are rebound through `symbols`, which must bind every
    /// symbol the checkpointed components used. Once the simulation is
    /// assembled on every rank, `unpickle` receives the control-layer
    /// bytes.
    ///
    /// # Errors
    ///
    /// Any local failure is reported on this rank; every other rank
    /// fails with [`CheckpointError::PeerFailed`] at the next barrier.
    pub fn restore<U, T>(
        &self,
        input: &mut dyn Read,
        symbols: Arc<Symbols>,
        unpickle: U,
    ) -> Result<(Simulation, T), CheckpointError>
    where
        U: FnOnce(&RestoreSession<'_>, &[u8]) -> Result<T, CheckpointError>,
    {
        self.restore_from(Ok(input), symbols, unpickle)
    }

    /// Restore a simulation from the file at `path`.
    ///
    /// A file that cannot be opened counts as a failed materialization,
    /// so peers are released from the first barrier.
    pub fn restore_from_path<U, T>(
        &self,
        path: &Path,
        symbols: Arc<Symbols>,
        unpickle: U,
    ) -> Result<(Simulation, T), CheckpointError>
    where
        U: FnOnce(&RestoreSession<'_>, &[u8]) -> Result<T, CheckpointError>,
    {
        match File::open(path) {
            Ok(file) => {
                let mut reader = BufReader::new(file);
                self.restore_from(Ok(&mut reader as &mut dyn Read), symbols, unpickle)
            }
            Err(e) => self.restore_from(Err(e.into()), symbols, unpickle),
        }
    }

    fn restore_from<U, T>(
        &self,
        input: Result<&mut dyn Read, CheckpointError>,
        symbols: Arc<Symbols>,
        unpickle: U,
    ) -> Result<(Simulation, T), CheckpointError>
    where
        U: FnOnce(&RestoreSession<'_>, &[u8]) -> Result<T, CheckpointError>,
    {
        let session = self.begin_restore()?;
        let materializers = Simulation::materializers(&symbols);

        let staged = input
            .and_then(|r| read_stream(r, &materializers))
            .and_then(|(header, table)| {
                self.check_origin(&header)?;
                Ok((header, table))
            });
        if let Err(e) = &staged {
            warn!(rank = self.rank(), error = %e, "materialization failed");
        }
        self.agree("materialize", staged.is_ok())?;
        let (header, mut table) = staged?;
        debug!(rank = self.rank(), objects = table.len(), "materialized");

        let assembled = table
            .reanimate_all()
            .and_then(|()| Simulation::assemble(&header, table, symbols));
        if let Err(e) = &assembled {
            warn!(rank = self.rank(), error = %e, "reanimation failed");
        }
        self.agree("reanimate", assembled.is_ok())?;
        let sim = assembled?;

        let state = unpickle(&session, sim.control_state().bytes())?;
        info!(
            rank = self.rank(),
            objects = sim.registry().len(),
            step = sim.step(),
            "restore complete"
        );
        Ok((sim, state))
    }

    fn check_origin(&self, header: &StreamHeader) -> Result<(), CheckpointError> {
        let origin = &header.origin;
        if origin.rank != self.rank() || origin.world_size != self.world_size() {
            return Err(CheckpointError::format(format!(
                "stream was written by rank {} of {}, this is rank {} of {}",
                origin.rank,
                origin.world_size,
                self.rank(),
                self.world_size()
            )));
        }
        Ok(())
    }

    fn agree(&self, stage: &'static str, ok: bool) -> Result<(), CheckpointError> {
        let all_ok = self
            .comm()
            .barrier(ok)
            .map_err(|e| CheckpointError::Comm {
                reason: e.to_string(),
            })?;
        if ok && !all_ok {
            warn!(rank = self.rank(), stage, "peer rank failed");
            return Err(CheckpointError::PeerFailed { stage });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::SingleRank;
    use crate::config::ServicesConfig;

    fn services() -> Services {
        Services::boot(ServicesConfig::default(), Box::new(SingleRank)).unwrap()
    }

    #[test]
    fn session_sets_and_clears_phase() {
        let services = services();
        {
            let session = services.begin_checkpoint().unwrap();
            assert_eq!(session.rank(), 0);
            assert!(services.in_checkpt());
        }
        assert_eq!(services.phase(), Phase::Idle);
        {
            let _session = services.begin_restore().unwrap();
            assert!(services.in_restore());
        }
        assert_eq!(services.phase(), Phase::Idle);
    }

    #[test]
    fn reentrant_checkpoint_leaves_phase_unchanged() {
        let services = services();
        let mut sim = Simulation::new(Arc::new(Symbols::with_builtins()));
        let _held = services.begin_checkpoint().unwrap();
        let mut out = Vec::new();
        match services.checkpt(&mut sim, &mut out, |_| Ok(Vec::new())) {
            Err(CheckpointError::Reentrant {
                requested: Phase::Checkpoint,
                active: Phase::Checkpoint,
            }) => {}
            other => panic!("expected Reentrant, got {other:?}"),
        }
        assert!(out.is_empty());
        assert!(services.in_checkpt());
        match services.begin_restore() {
            Err(CheckpointError::Reentrant {
                requested: Phase::Restore,
                active: Phase::Checkpoint,
            }) => {}
            other => panic!("expected Reentrant, got {:?}", other.map(|_| ())),
        }
        assert!(services.in_checkpt());
    }

    #[test]
    fn pickle_runs_inside_the_session() {
        let services = services();
        let mut sim = Simulation::new(Arc::new(Symbols::with_builtins()));
        let mut out = Vec::new();
        services
            .checkpt(&mut sim, &mut out, |session| {
                assert_eq!(session.rank(), 0);
                assert!(services.in_checkpt());
                assert!(services.begin_checkpoint().is_err());
                Ok(b"deck".to_vec())
            })
            .unwrap();
        assert_eq!(services.phase(), Phase::Idle);
        assert_eq!(sim.control_state().bytes(), b"deck");
    }

    #[test]
    fn failed_pickle_writes_nothing_and_ends_session() {
        let services = services();
        let mut sim = Simulation::new(Arc::new(Symbols::with_builtins()));
        let mut out = Vec::new();
        let err = services
            .checkpt(&mut sim, &mut out, |_| {
                Err(CheckpointError::ControlState {
                    reason: "unpicklable".into(),
                })
            })
            .unwrap_err();
        assert!(matches!(err, CheckpointError::ControlState { .. }));
        assert!(out.is_empty());
        assert_eq!(services.phase(), Phase::Idle);
    }

    #[test]
    fn rank_path_appends_rank() {
        assert_eq!(
            rank_path(Path::new("/tmp/run/checkpt"), 3),
            PathBuf::from("/tmp/run/checkpt.3")
        );
    }
}
