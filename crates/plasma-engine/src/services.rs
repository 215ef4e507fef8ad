//! Process services: boot, halt, and the rank communicator.

use std::cell::Cell;
use std::error::Error;
use std::fmt;
use std::time::{Duration, Instant};

use plasma_checkpt::{Phase, StreamOrigin};
use tracing::{debug, info, warn};

use crate::comm::{CommError, RankComm};
use crate::config::{ConfigError, ServiceLayer, ServicesConfig};

/// Errors from [`Services::boot`].
#[derive(Debug, PartialEq)]
pub enum BootError {
    /// This rank's configuration is invalid.
    Config(ConfigError),
    /// The boot barrier could not complete.
    Comm(CommError),
    /// Another rank failed to boot.
    PeerFailed,
}

impl fmt::Display for BootError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Comm(e) => write!(f, "comm: {e}"),
            Self::PeerFailed => write!(f, "a peer rank failed to boot"),
        }
    }
}

impl Error for BootError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Comm(e) => Some(e),
            Self::PeerFailed => None,
        }
    }
}

impl From<ConfigError> for BootError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<CommError> for BootError {
    fn from(e: CommError) -> Self {
        Self::Comm(e)
    }
}

/// The booted services of one process (rank).
///
/// Owns the checkpoint phase: at most one checkpoint or restore is in
/// progress at a time, entered through the session guards in
/// [`checkpoint`](crate::checkpoint). Services are driven from the
/// coordinating thread only.
pub struct Services {
    config: ServicesConfig,
    comm: Box<dyn RankComm>,
    order: [ServiceLayer; 3],
    booted_at: Instant,
    phase: Cell<Phase>,
}

impl Services {
    /// Bring up process services.
    ///
    /// The checkpoint service comes up first, then the thread pipelines
    /// and the communication layer in the configured order. Every rank
    /// then meets at a barrier, so a configuration error on one rank
    /// fails the boot on all of them.
    pub fn boot(config: ServicesConfig, comm: Box<dyn RankComm>) -> Result<Self, BootError> {
        let valid = config.validate();
        let order = config.boot_order();
        if valid.is_ok() {
            for layer in order {
                debug!(
                    %layer,
                    rank = comm.rank(),
                    thread_pipelines = config.thread_pipelines,
                    serial_pipelines = config.serial_pipelines,
                    "service up"
                );
            }
        }
        let all_ok = comm.barrier(valid.is_ok())?;
        if let Err(e) = valid {
            warn!(rank = comm.rank(), error = %e, "boot rejected configuration");
            return Err(e.into());
        }
        if !all_ok {
            return Err(BootError::PeerFailed);
        }

        info!(
            rank = comm.rank(),
            world_size = comm.world_size(),
            dispatch_to_host = config.dispatch_to_host,
            "services booted"
        );
        Ok(Self {
            config,
            comm,
            order,
            booted_at: Instant::now(),
            phase: Cell::new(Phase::Idle),
        })
    }

    /// Shut services down in the reverse of boot order.
    pub fn halt(self) {
        for layer in self.order.iter().rev() {
            debug!(%layer, rank = self.rank(), "service down");
        }
        info!(rank = self.rank(), uptime = ?self.uptime(), "services halted");
    }

    /// The configuration services were booted with.
    pub fn config(&self) -> &ServicesConfig {
        &self.config
    }

    /// The order services came up in.
    pub fn boot_order(&self) -> [ServiceLayer; 3] {
        self.order
    }

    /// Time since boot completed.
    pub fn uptime(&self) -> Duration {
        self.booted_at.elapsed()
    }

    /// This process's rank.
    pub fn rank(&self) -> u32 {
        self.comm.rank()
    }

    /// Number of cooperating ranks.
    pub fn world_size(&self) -> u32 {
        self.comm.world_size()
    }

    /// The active checkpoint phase.
    pub fn phase(&self) -> Phase {
        self.phase.get()
    }

    /// Whether a checkpoint is in progress.
    pub fn in_checkpt(&self) -> bool {
        self.phase.get() == Phase::Checkpoint
    }

    /// Whether a restore is in progress.
    pub fn in_restore(&self) -> bool {
        self.phase.get() == Phase::Restore
    }

    pub(crate) fn phase_cell(&self) -> &Cell<Phase> {
        &self.phase
    }

    pub(crate) fn comm(&self) -> &dyn RankComm {
        self.comm.as_ref()
    }

    pub(crate) fn origin(&self) -> StreamOrigin {
        StreamOrigin {
            producer: concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION")).into(),
            rank: self.rank(),
            world_size: self.world_size(),
        }
    }
}

impl fmt::Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Services")
            .field("config", &self.config)
            .field("rank", &self.rank())
            .field("world_size", &self.world_size())
            .field("order", &self.order)
            .field("phase", &self.phase.get())
            .finish()
    }
}
