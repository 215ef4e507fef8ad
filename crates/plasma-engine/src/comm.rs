//! Rank communication: the barrier that keeps cooperating processes in
//! lockstep during restore.
//!
//! [`SingleRank`] is the trivial communicator. [`LocalRanks`] runs several
//! ranks as threads of one process, exchanging barrier votes over
//! crossbeam channels, which is how multi-rank restore is exercised in
//! tests.

use std::cell::{Cell, RefCell};
use std::error::Error;
use std::fmt;

use crossbeam_channel::{Receiver, Sender};

/// Errors from the rank communicator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommError {
    /// A peer rank went away before the barrier completed.
    Disconnected {
        /// The rank that was lost, if known.
        peer: Option<u32>,
    },
}

impl fmt::Display for CommError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected { peer: Some(peer) } => write!(f, "rank {peer} disconnected"),
            Self::Disconnected { peer: None } => write!(f, "a peer rank disconnected"),
        }
    }
}

impl Error for CommError {}

/// A process's view of the cooperating ranks.
pub trait RankComm {
    /// This process's rank.
    fn rank(&self) -> u32;

    /// Number of cooperating ranks.
    fn world_size(&self) -> u32;

    /// Block until every rank reaches the barrier.
    ///
    /// Each rank contributes `ok`; the result is the conjunction over all
    /// ranks, so every rank learns whether any rank failed.
    fn barrier(&self, ok: bool) -> Result<bool, CommError>;
}

/// The communicator of a single-process run.
#[derive(Clone, Copy, Debug, Default)]
pub struct SingleRank;

impl RankComm for SingleRank {
    fn rank(&self) -> u32 {
        0
    }

    fn world_size(&self) -> u32 {
        1
    }

    fn barrier(&self, ok: bool) -> Result<bool, CommError> {
        Ok(ok)
    }
}

#[derive(Clone, Copy, Debug)]
struct Vote {
    round: u64,
    ok: bool,
}

/// One rank of an in-process group. Move each into its own thread.
#[derive(Debug)]
pub struct LocalRank {
    rank: u32,
    peers: Vec<(u32, Sender<Vote>)>,
    inbox: Receiver<Vote>,
    round: Cell<u64>,
    early: RefCell<Vec<Vote>>,
}

/// Factory for a group of in-process ranks.
#[derive(Debug)]
pub struct LocalRanks;

impl LocalRanks {
    /// Create `world_size` connected ranks, indexed by rank.
    pub fn new(world_size: u32) -> Vec<LocalRank> {
        let (senders, inboxes): (Vec<_>, Vec<_>) = (0..world_size)
            .map(|_| crossbeam_channel::unbounded::<Vote>())
            .unzip();
        inboxes
            .into_iter()
            .enumerate()
            .map(|(rank, inbox)| {
                let rank = rank as u32;
                let peers = senders
                    .iter()
                    .enumerate()
                    .filter(|(peer, _)| *peer as u32 != rank)
                    .map(|(peer, tx)| (peer as u32, tx.clone()))
                    .collect();
                LocalRank {
                    rank,
                    peers,
                    inbox,
                    round: Cell::new(0),
                    early: RefCell::new(Vec::new()),
                }
            })
            .collect()
    }
}

impl RankComm for LocalRank {
    fn rank(&self) -> u32 {
        self.rank
    }

    fn world_size(&self) -> u32 {
        self.peers.len() as u32 + 1
    }

    fn barrier(&self, ok: bool) -> Result<bool, CommError> {
        let round = self.round.get() + 1;
        self.round.set(round);

        for (peer, tx) in &self.peers {
            tx.send(Vote { round, ok })
                .map_err(|_| CommError::Disconnected { peer: Some(*peer) })?;
        }

        let mut all_ok = ok;
        let mut heard = 0;
        self.early.borrow_mut().retain(|vote| {
            if vote.round == round {
                all_ok &= vote.ok;
                heard += 1;
                false
            } else {
                true
            }
        });
        while heard < self.peers.len() {
            let vote = self
                .inbox
                .recv()
                .map_err(|_| CommError::Disconnected { peer: None })?;
            if vote.round == round {
                all_ok &= vote.ok;
                heard += 1;
            } else {
                self.early.borrow_mut().push(vote);
            }
        }
        Ok(all_ok)
    }
}
