//! In-flight items waiting for their delay to elapse.
//!
//! Each entry carries the delay in force when it was captured. When several
//! entries fall due on the same refresh only the newest is promoted; older
//! ones are handed back for release so nothing is shown out of order.

use crate::timing::{Mark, TimingStrategy};
use std::collections::VecDeque;
use timeshift_core::Delay;

#[derive(Debug)]
struct Pending<T> {
    sequence: u64,
    at: Mark,
    delay: Delay,
    item: T,
}

/// Outcome of one promotion pass.
#[derive(Debug)]
pub struct Due<T> {
    /// Newest due item that may be shown.
    pub promoted: Option<T>,
    /// Due items that must be dropped: older than the promoted one, at or
    /// below the watermark, or older than something already promoted.
    pub discarded: Vec<T>,
}

impl<T> Default for Due<T> {
    fn default() -> Self {
        Self {
            promoted: None,
            discarded: Vec::new(),
        }
    }
}

/// FIFO of items keyed by capture sequence.
#[derive(Debug)]
pub struct PromotionQueue<T> {
    entries: VecDeque<Pending<T>>,
    last_promoted: u64,
}

impl<T> PromotionQueue<T> {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::new(),
            last_promoted: 0,
        }
    }

    /// Queue `item`, captured at `at` with `delay` in force.
    pub fn push(&mut self, sequence: u64, at: Mark, delay: Delay, item: T) {
        self.entries.push_back(Pending {
            sequence,
            at,
            delay,
            item,
        });
    }

    /// Sequence of the newest queued entry.
    pub fn newest_sequence(&self) -> Option<u64> {
        self.entries.back().map(|entry| entry.sequence)
    }

    /// Sequence of the last promoted entry, 0 if none.
    pub fn last_promoted(&self) -> u64 {
        self.last_promoted
    }

    /// Remove every entry whose delay has elapsed at `now`.
    pub fn take_due(&mut self, now: Mark, timing: &TimingStrategy, watermark: u64) -> Due<T> {
        let mut due = Due::default();
        let mut kept = VecDeque::with_capacity(self.entries.len());
        let mut best: Option<Pending<T>> = None;

        for entry in self.entries.drain(..) {
            if !timing.elapsed_reached(entry.at, entry.delay, now) {
                kept.push_back(entry);
                continue;
            }
            if entry.sequence <= watermark || entry.sequence <= self.last_promoted {
                due.discarded.push(entry.item);
                continue;
            }
            match best.take() {
                Some(current) if current.sequence > entry.sequence => {
                    due.discarded.push(entry.item);
                    best = Some(current);
                }
                Some(current) => {
                    due.discarded.push(current.item);
                    best = Some(entry);
                }
                None => best = Some(entry),
            }
        }

        self.entries = kept;
        if let Some(entry) = best {
            self.last_promoted = entry.sequence;
            due.promoted = Some(entry.item);
        }
        due
    }

    /// Remove everything, oldest first.
    pub fn drain(&mut self) -> impl Iterator<Item = T> + '_ {
        self.entries.drain(..).map(|entry| entry.item)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> Default for PromotionQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
