//! Batching and ordering of re-renders.
//!
//! Every invalidation funnels into one unbounded channel as a
//! [`SchedulerMsg`]; the virtual dom drains it between commits. Dirty root
//! scopes coalesce into an ordered set flushed on the next frame, while
//! mounted child scopes commit synchronously so interactions feel
//! instantaneous. A rolling one-second window caps how often any single
//! instance may commit - the cheap guard against reactive infinite loops.

use crate::innerlude::*;
use fxhash::FxHashMap;
use std::{
    cell::RefCell,
    collections::VecDeque,
    time::{Duration, Instant},
};

/// Messages that feed the scheduler.
#[derive(Debug)]
pub enum SchedulerMsg {
    /// A component was invalidated and wants to render.
    Immediate(ScopeId),
    /// An event arrived from the host.
    UiEvent(UserEvent),
}

/// A dirty scope ordered by tree height, so parents queued in the same
/// flush diff before their children and child work invalidated by the
/// parent's diff is simply skipped.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub(crate) struct DirtyScope {
    pub height: u32,
    pub id: ScopeId,
}

const MAX_COMMITS_PER_WINDOW: usize = 60;
const WINDOW: Duration = Duration::from_secs(1);

/// Rolling-window commit limiter.
pub(crate) struct CommitThrottle {
    log: RefCell<FxHashMap<ScopeId, VecDeque<Instant>>>,
}

impl CommitThrottle {
    pub fn new() -> Self {
        CommitThrottle {
            log: RefCell::new(FxHashMap::default()),
        }
    }

    /// Record a commit attempt. Returns `false` when the scope exceeded its
    /// budget and the update must be dropped.
    pub fn admit(&self, scope: ScopeId, name: &str) -> bool {
        let now = Instant::now();
        let mut log = self.log.borrow_mut();
        let entries = log.entry(scope).or_default();
        while let Some(front) = entries.front() {
            if now.duration_since(*front) > WINDOW {
                entries.pop_front();
            } else {
                break;
            }
        }
        if entries.len() >= MAX_COMMITS_PER_WINDOW {
            log::warn!(
                "{} ({:?}) exceeded {} commits within {:?}; dropping update - \
                 check for a reactive write loop",
                name,
                scope,
                MAX_COMMITS_PER_WINDOW,
                WINDOW
            );
            return false;
        }
        entries.push_back(now);
        true
    }

    pub fn forget(&self, scope: ScopeId) {
        self.log.borrow_mut().remove(&scope);
    }
}
