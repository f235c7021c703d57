use crate::component::InstanceId;
use crate::hash::map::HashMap;

/// Process-wide map from (component, structural key) to the instance that
/// owns that position.
///
/// Entries are removed explicitly on unmount; an inner map left empty is
/// dropped with it.
#[derive(Default)]
pub(crate) struct Registry {
    by_component: HashMap<usize, HashMap<u64, InstanceId>>,
}

impl Registry {
    pub(crate) fn lookup(&self, component: usize, structural_key: u64) -> Option<InstanceId> {
        self.by_component
            .get(&component)
            .and_then(|positions| positions.get(&structural_key))
            .copied()
    }

    pub(crate) fn insert(&mut self, component: usize, structural_key: u64, instance: InstanceId) {
        self.by_component
            .entry(component)
            .or_default()
            .insert(structural_key, instance);
    }

    pub(crate) fn remove(&mut self, component: usize, structural_key: u64, instance: InstanceId) {
        let Some(positions) = self.by_component.get_mut(&component) else {
            return;
        };
        if positions.get(&structural_key) == Some(&instance) {
            positions.remove(&structural_key);
        }
        if positions.is_empty() {
            self.by_component.remove(&component);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.by_component.values().map(HashMap::len).sum()
    }

    #[cfg(test)]
    pub(crate) fn component_count(&self) -> usize {
        self.by_component.len()
    }
}
