//! Mapping detections onto the fixed rod slots

use super::detector::Detection;
use crate::template_matching::{Point, RodStatus};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of rod slots in the equipment panel.
pub const SLOT_COUNT: usize = 6;

/// Slot ids run 1..=6.
pub type SlotId = u8;

/// Status of every slot. Always total: one entry per slot id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SlotStatuses([RodStatus; SLOT_COUNT]);

impl SlotStatuses {
    pub fn all_empty() -> Self {
        Self([RodStatus::Empty; SLOT_COUNT])
    }

    pub fn from_array(statuses: [RodStatus; SLOT_COUNT]) -> Self {
        Self(statuses)
    }

    pub fn get(&self, slot: SlotId) -> Option<RodStatus> {
        slot_index(slot).map(|i| self.0[i])
    }

    pub fn set(&mut self, slot: SlotId, status: RodStatus) -> bool {
        match slot_index(slot) {
            Some(i) => {
                self.0[i] = status;
                true
            }
            None => false,
        }
    }

    /// (slot id, status) for ids 1..=6
    pub fn iter(&self) -> impl Iterator<Item = (SlotId, RodStatus)> + '_ {
        self.0
            .iter()
            .enumerate()
            .map(|(i, status)| ((i + 1) as SlotId, *status))
    }

    pub fn count(&self, status: RodStatus) -> usize {
        self.0.iter().filter(|s| **s == status).count()
    }

    pub fn as_array(&self) -> &[RodStatus; SLOT_COUNT] {
        &self.0
    }
}

impl fmt::Display for SlotStatuses {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (slot, status)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}:{}", slot, status)?;
        }
        Ok(())
    }
}

/// Convert a 1-based slot id to an array index.
pub(crate) fn slot_index(slot: SlotId) -> Option<usize> {
    let slot = slot as usize;
    (1..=SLOT_COUNT).contains(&slot).then(|| slot - 1)
}

/// Static screen positions of the rod slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlotLayout {
    pub positions: [Point; SLOT_COUNT],
    /// Detections farther than this from every slot are ignored
    pub max_distance: f32,
}

impl Default for SlotLayout {
    fn default() -> Self {
        // Bottom equipment bar of a 1920x1080 client
        Self {
            positions: [
                Point::new(620, 980),
                Point::new(756, 980),
                Point::new(892, 980),
                Point::new(1028, 980),
                Point::new(1164, 980),
                Point::new(1300, 980),
            ],
            max_distance: 100.0,
        }
    }
}

pub struct SlotAssigner {
    layout: SlotLayout,
}

impl SlotAssigner {
    pub fn new(layout: SlotLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &SlotLayout {
        &self.layout
    }

    /// Closest slot within `max_distance`, with its distance.
    pub fn nearest_slot(&self, point: Point) -> Option<(SlotId, f32)> {
        self.layout
            .positions
            .iter()
            .enumerate()
            .map(|(i, pos)| ((i + 1) as SlotId, pos.distance(&point)))
            .filter(|(_, d)| *d <= self.layout.max_distance)
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
    }

    /// Map detections onto slots.
    ///
    /// Every slot starts empty. A detection claims its nearest slot; a slot
    /// that is already claimed only changes hands to a strictly higher
    /// priority rod kind. Detections that are not rods are ignored.
    pub fn assign(&self, detections: &[Detection]) -> SlotStatuses {
        let mut statuses = SlotStatuses::all_empty();
        for det in detections {
            let Some(kind) = det.kind else {
                continue;
            };
            let Some((slot, distance)) = self.nearest_slot(det.center) else {
                log::trace!("🎣 {} at {} is not near any slot", det.template, det.center);
                continue;
            };
            let current = statuses.get(slot).unwrap_or_default();
            if kind.priority() > current.priority() {
                log::trace!(
                    "🎣 slot {} -> {} ({} at {:.1}px)",
                    slot,
                    kind,
                    det.template,
                    distance
                );
                statuses.set(slot, kind);
            }
        }
        statuses
    }
}
