//! Headless stand-ins for the collaborators a game engine would provide.

use std::collections::HashMap;

use endless_runway_core::{
    AcquireError, GenerationConfig, InstanceId, JumpKind, Placement, PlayerCapability,
    SegmentName, SegmentPooler, SimulationStatus,
};

/// Viewpoint scrolling along the x axis at a constant speed.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Track {
    distance: f32,
    speed: f32,
    window_ahead: f32,
    window_behind: f32,
}

impl Track {
    pub(crate) fn new(speed: f32, window_ahead: f32, window_behind: f32) -> Self {
        Self {
            distance: 0.0,
            speed,
            window_ahead,
            window_behind,
        }
    }

    pub(crate) fn advance(&mut self, seconds: f32) {
        self.distance += self.speed * seconds;
    }

    /// Segments whose exit lies behind this x are out of view.
    pub(crate) fn near_edge(&self) -> f32 {
        self.distance - self.window_behind
    }
}

impl SimulationStatus for Track {
    fn is_running(&self) -> bool {
        true
    }

    fn distance_traveled(&self) -> f32 {
        self.distance
    }

    fn viewpoint_x(&self) -> f32 {
        self.distance
    }

    fn recycle_far_edge(&self) -> f32 {
        self.distance + self.window_ahead
    }
}

/// Player with fixed jump timings.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Runner {
    pub(crate) jump_time: f32,
    pub(crate) scroll_speed: f32,
}

impl PlayerCapability for Runner {
    fn jump_traversal_time(&self, kind: JumpKind) -> f32 {
        match kind {
            JumpKind::Normal => self.jump_time,
            JumpKind::Double => self.jump_time * 2.0,
        }
    }

    fn current_scroll_speed(&self) -> f32 {
        self.scroll_speed
    }
}

#[derive(Clone, Debug)]
struct LiveInstance {
    instance: InstanceId,
    name: SegmentName,
    exit_x: f32,
}

/// In-memory segment pool that reuses recycled instances per segment name.
#[derive(Debug, Default)]
pub(crate) struct MemoryPooler {
    exit_offsets: HashMap<SegmentName, f32>,
    idle: HashMap<SegmentName, Vec<InstanceId>>,
    acquired: HashMap<InstanceId, SegmentName>,
    live: Vec<LiveInstance>,
    next_id: u32,
    created: u32,
}

impl MemoryPooler {
    pub(crate) fn from_config(config: &GenerationConfig) -> Self {
        let exit_offsets = config
            .segments
            .iter()
            .map(|spec| (spec.name.clone(), spec.exit_anchor.x))
            .collect();
        Self {
            exit_offsets,
            ..Self::default()
        }
    }

    /// Returns every live instance whose exit fell behind `near_edge` to its idle list.
    pub(crate) fn release_behind(&mut self, near_edge: f32) -> Vec<InstanceId> {
        let (expired, live): (Vec<_>, Vec<_>) = self
            .live
            .drain(..)
            .partition(|segment| segment.exit_x < near_edge);
        self.live = live;

        expired
            .into_iter()
            .map(|segment| {
                self.idle
                    .entry(segment.name)
                    .or_default()
                    .push(segment.instance);
                segment.instance
            })
            .collect()
    }

    /// Number of distinct instances ever created.
    pub(crate) fn created(&self) -> u32 {
        self.created
    }

    pub(crate) fn live_count(&self) -> usize {
        self.live.len()
    }
}

impl SegmentPooler for MemoryPooler {
    fn acquire(&mut self, name: &SegmentName) -> Result<InstanceId, AcquireError> {
        if !self.exit_offsets.contains_key(name) {
            return Err(AcquireError::UnknownSegment { name: name.clone() });
        }

        let instance = match self.idle.get_mut(name).and_then(Vec::pop) {
            Some(instance) => instance,
            None => {
                self.next_id += 1;
                self.created += 1;
                InstanceId::new(self.next_id)
            }
        };
        let _ = self.acquired.insert(instance, name.clone());
        Ok(instance)
    }

    fn activate(&mut self, instance: InstanceId, placement: &Placement) {
        let Some(name) = self.acquired.remove(&instance) else {
            tracing::warn!(instance = instance.get(), "activate without acquire");
            return;
        };
        let exit_offset = self.exit_offsets.get(&name).copied().unwrap_or_default();
        self.live.push(LiveInstance {
            instance,
            name,
            exit_x: placement.position.x + exit_offset,
        });
    }
}
