//! Bounding-box and z-order synchronization.
//!
//! Derived layer metadata is never recomputed implicitly. After any geometry,
//! offset or ordering mutation the owner runs [`Synchronizer::sync`], which
//! refreshes every cached bbox, rebuilds the hit-test index and reports which
//! layers changed. Render order is list order; [`z_order`] is the only source
//! of stacking information.

use crate::intent::Intent;
use crate::layer::{Layer, LayerId};
use crate::spatial::SpatialIndex;

/// Back-to-front stacking order: the first layer is furthest back.
pub fn z_order(layers: &[Layer]) -> Vec<LayerId> {
    layers.iter().map(|l| l.id).collect()
}

/// Outcome of one synchronization pass.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SyncReport {
    /// Layers whose cached bbox value changed, in list order.
    pub bbox_changed: Vec<LayerId>,
    /// One `layerBboxChanged` notification per entry in `bbox_changed`.
    pub notifications: Vec<Intent>,
    /// The stacking order differs from the previous pass.
    pub order_changed: bool,
}

impl SyncReport {
    pub fn is_empty(&self) -> bool {
        self.bbox_changed.is_empty() && !self.order_changed
    }
}

#[derive(Debug, Default)]
pub struct Synchronizer {
    order: Vec<LayerId>,
    index: SpatialIndex,
}

impl Synchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sync(&mut self, layers: &mut [Layer]) -> SyncReport {
        let mut report = SyncReport::default();

        for layer in layers.iter_mut() {
            let bbox = layer.computed_bbox();
            if bbox != layer.bbox {
                log::debug!("Layer {} bbox {:?} -> {:?}", layer.id, layer.bbox, bbox);
                layer.bbox = bbox;
                report.bbox_changed.push(layer.id);
                report.notifications.push(Intent::bbox_changed(layer.id, bbox));
            }
        }

        let order = z_order(layers);
        if order != self.order {
            log::trace!("Layer order changed ({} layers)", order.len());
            self.order = order;
            report.order_changed = true;
        }

        self.index = SpatialIndex::from_layers(layers);
        report
    }

    /// Order observed by the last pass.
    pub fn order(&self) -> &[LayerId] {
        &self.order
    }

    pub fn index(&self) -> &SpatialIndex {
        &self.index
    }
}
