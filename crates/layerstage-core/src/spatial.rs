use rstar::{RTree, RTreeObject, AABB};

use crate::geometry::{Point, Rect};
use crate::layer::{Layer, LayerId};

/// An entry in the R-tree, referencing a layer by id and stacking position.
#[derive(Debug, Clone)]
pub struct SpatialEntry {
    pub layer_id: LayerId,
    /// Position in the layer list; higher is closer to the viewer.
    pub z: usize,
    pub bbox: Rect,
}

impl RTreeObject for SpatialEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        let max = self.bbox.max();
        AABB::from_corners([self.bbox.x, self.bbox.y], [max.x, max.y])
    }
}

/// Spatial index over visible layer bounding boxes for pointer hit-testing.
pub struct SpatialIndex {
    tree: RTree<SpatialEntry>,
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self { tree: RTree::new() }
    }

    /// Index every visible layer that has a cached bbox.
    pub fn from_layers(layers: &[Layer]) -> Self {
        let entries = layers
            .iter()
            .enumerate()
            .filter(|(_, layer)| layer.visible)
            .filter_map(|(z, layer)| {
                layer.bbox.map(|bbox| SpatialEntry {
                    layer_id: layer.id,
                    z,
                    bbox,
                })
            })
            .collect();
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// All entries whose bbox contains `point`, in no particular order.
    pub fn query_point(&self, point: &Point) -> Vec<&SpatialEntry> {
        let envelope = AABB::from_point([point.x, point.y]);
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .collect()
    }

    /// The front-most layer whose bbox contains `point`.
    pub fn topmost_at(&self, point: &Point) -> Option<LayerId> {
        self.query_point(point)
            .into_iter()
            .max_by_key(|entry| entry.z)
            .map(|entry| entry.layer_id)
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

impl std::fmt::Debug for SpatialIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpatialIndex")
            .field("len", &self.tree.size())
            .finish()
    }
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::{LayerObject, RectShape};
    use uuid::Uuid;

    fn layer_with_bbox(rect: Rect) -> Layer {
        let mut layer = Layer::regional_mask("mask").with_object(LayerObject::Rect(RectShape {
            id: Uuid::new_v4(),
            rect,
        }));
        layer.bbox = layer.computed_bbox();
        layer
    }

    #[test]
    fn test_topmost_prefers_later_layers() {
        let back = layer_with_bbox(Rect::new(0.0, 0.0, 100.0, 100.0));
        let front = layer_with_bbox(Rect::new(50.0, 50.0, 100.0, 100.0));
        let index = SpatialIndex::from_layers(&[back.clone(), front.clone()]);

        assert_eq!(index.len(), 2);
        assert_eq!(index.topmost_at(&Point::new(10.0, 10.0)), Some(back.id));
        assert_eq!(index.topmost_at(&Point::new(75.0, 75.0)), Some(front.id));
        assert_eq!(index.topmost_at(&Point::new(500.0, 500.0)), None);
    }

    #[test]
    fn test_hidden_and_empty_layers_not_indexed() {
        let hidden = layer_with_bbox(Rect::new(0.0, 0.0, 10.0, 10.0)).with_visibility(false);
        let empty = Layer::regional_mask("empty");
        let index = SpatialIndex::from_layers(&[hidden, empty]);
        assert!(index.is_empty());
    }
}
