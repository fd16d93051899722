//! Bounded drain before GPU resources are deleted.
//!
//! A detached scheduler may still have a draw queued on its context. The
//! textures, program and context are deleted only once the drain deadline
//! has passed, or immediately on shutdown.

use timeshift_core::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Teardown {
    #[default]
    Live,
    Draining {
        deadline: Timestamp,
    },
    Finished,
}

impl Teardown {
    /// Start draining. Returns `false` if teardown already began.
    pub fn begin(&mut self, deadline: Timestamp) -> bool {
        if *self != Self::Live {
            return false;
        }
        *self = Self::Draining { deadline };
        true
    }

    /// Returns `true` exactly once, when the deadline has passed.
    pub fn poll(&mut self, now: Timestamp) -> bool {
        match *self {
            Self::Draining { deadline } if now >= deadline => {
                *self = Self::Finished;
                true
            }
            _ => false,
        }
    }

    /// Finish a drain without waiting. Returns `true` if one was pending.
    pub fn force(&mut self) -> bool {
        if matches!(self, Self::Draining { .. }) {
            *self = Self::Finished;
            true
        } else {
            false
        }
    }

    pub fn is_finished(&self) -> bool {
        *self == Self::Finished
    }
}
