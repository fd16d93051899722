//! Audio delay graph: one route per media element.
//!
//! Independent of the video path. Every route follows the graph-wide delay
//! and enabled flag, so disabling delay silences the wet path on elements
//! that never had a video scheduler.

use crate::route::AudioRoute;
use std::collections::HashMap;
use timeshift_core::{Delay, ElementId, Result, TimeshiftError};
use tracing::{debug, info};

/// Routes keyed by element.
#[derive(Debug)]
pub struct AudioDelayGraph {
    sample_rate: u32,
    channels: u16,
    routes: HashMap<ElementId, AudioRoute>,
    delay: Delay,
    enabled: bool,
}

impl AudioDelayGraph {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
            routes: HashMap::new(),
            delay: Delay::ZERO,
            enabled: true,
        }
    }

    /// Route `id` through the graph. Attaching twice keeps the first route.
    pub fn attach(&mut self, id: ElementId) -> &mut AudioRoute {
        let (sample_rate, channels, delay, enabled) =
            (self.sample_rate, self.channels, self.delay, self.enabled);
        self.routes.entry(id).or_insert_with(|| {
            info!(%id, %delay, "audio route attached");
            let mut route = AudioRoute::new(sample_rate, channels);
            route.set_delay(delay);
            if !enabled {
                route.disable();
            }
            route
        })
    }

    /// Remove the route for `id`. Returns whether one existed.
    pub fn detach(&mut self, id: ElementId) -> bool {
        let removed = self.routes.remove(&id).is_some();
        if removed {
            info!(%id, "audio route detached");
        }
        removed
    }

    /// Set the delay on every route, current and future.
    pub fn set_delay(&mut self, delay: Delay) {
        self.delay = delay;
        for route in self.routes.values_mut() {
            route.set_delay(delay);
        }
        debug!(%delay, routes = self.routes.len(), "audio delay set");
    }

    pub fn enable(&mut self) {
        self.enabled = true;
        for route in self.routes.values_mut() {
            route.enable();
        }
    }

    pub fn disable(&mut self) {
        self.enabled = false;
        for route in self.routes.values_mut() {
            route.disable();
        }
    }

    /// Zero delay everywhere; every route goes dry with an empty line.
    pub fn stop(&mut self) {
        self.set_delay(Delay::ZERO);
        info!(routes = self.routes.len(), "audio delay stopped");
    }

    /// Run one block of element `id`'s audio through its route.
    pub fn process(&mut self, id: ElementId, input: &[f32], output: &mut [f32]) -> Result<()> {
        let route = self
            .routes
            .get_mut(&id)
            .ok_or_else(|| TimeshiftError::Audio(format!("no route for {id}")))?;
        route.process(input, output);
        Ok(())
    }

    pub fn route(&self, id: ElementId) -> Option<&AudioRoute> {
        self.routes.get(&id)
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.routes.contains_key(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.routes.keys().copied()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn delay(&self) -> Delay {
        self.delay
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}
