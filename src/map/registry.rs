use std::collections::{BTreeMap, HashMap};

use crate::geometry::{Feature, FeatureId, FeatureIdAllocator};
use crate::map::native::{HandleId, LineId, Scene};

/// Native objects drawn for one feature.
#[derive(Debug, Clone, PartialEq)]
pub enum Visuals {
    Marker { handle: HandleId },
    Poly { handles: Vec<HandleId>, line: LineId },
}

impl Visuals {
    pub fn dispose(self, scene: &mut Scene) {
        match self {
            Visuals::Marker { handle } => {
                scene.remove_handle(handle);
            }
            Visuals::Poly { handles, line } => {
                for handle in handles {
                    scene.remove_handle(handle);
                }
                scene.remove_line(line);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureEntry {
    pub model: Feature,
    pub visuals: Visuals,
}

/// Features of one map, keyed by id, plus the reverse index from native
/// handles to the feature vertex they stand for.
#[derive(Debug, Default)]
pub struct FeatureRegistry {
    ids: FeatureIdAllocator,
    features: BTreeMap<FeatureId, FeatureEntry>,
    owners: HashMap<HandleId, (FeatureId, usize)>,
}

impl FeatureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self) -> FeatureId {
        self.ids.allocate()
    }

    pub fn insert(&mut self, id: FeatureId, entry: FeatureEntry) {
        match &entry.visuals {
            Visuals::Marker { handle } => {
                self.owners.insert(*handle, (id, 0));
            }
            Visuals::Poly { handles, .. } => {
                for (index, handle) in handles.iter().enumerate() {
                    self.owners.insert(*handle, (id, index));
                }
            }
        }
        self.features.insert(id, entry);
    }

    pub fn get(&self, id: FeatureId) -> Option<&FeatureEntry> {
        self.features.get(&id)
    }

    pub fn get_mut(&mut self, id: FeatureId) -> Option<&mut FeatureEntry> {
        self.features.get_mut(&id)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn ids(&self) -> Vec<FeatureId> {
        self.features.keys().copied().collect()
    }

    pub fn remove(&mut self, id: FeatureId) -> Option<FeatureEntry> {
        let entry = self.features.remove(&id)?;
        self.owners.retain(|_, (owner, _)| *owner != id);
        Some(entry)
    }

    pub fn drain(&mut self) -> Vec<(FeatureId, FeatureEntry)> {
        self.owners.clear();
        std::mem::take(&mut self.features).into_iter().collect()
    }

    pub fn owner(&self, handle: HandleId) -> Option<(FeatureId, usize)> {
        self.owners.get(&handle).copied()
    }

    pub fn bind_handle(&mut self, handle: HandleId, id: FeatureId, index: usize) {
        self.owners.insert(handle, (id, index));
    }

    pub fn unbind_handle(&mut self, handle: HandleId) {
        self.owners.remove(&handle);
    }
}
