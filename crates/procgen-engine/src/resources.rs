//! Host resources referenced by generated entries
//!
//! The engine never interprets resource content. A `ResourceStore` is shared
//! by reference between a procedure and its duplicates (undo snapshots,
//! background previews); edits go through [`ResourceStore::modify`], which
//! copies a resource before touching it when anyone else still holds it.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::codec::{ByteReader, ByteWriter};
use crate::error::{ProcEngineError, Result};

/// Version tag of the resource-store blob
pub const RESOURCE_STORE_VERSION: u16 = 1;

/// What a resource represents for the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Geometry,
    Material,
    Texture,
}

impl ResourceKind {
    pub fn to_u8(self) -> u8 {
        match self {
            Self::Geometry => 0,
            Self::Material => 1,
            Self::Texture => 2,
        }
    }

    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Geometry),
            1 => Some(Self::Material),
            2 => Some(Self::Texture),
            _ => None,
        }
    }
}

/// Opaque host resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    /// Unique name within a store
    pub name: String,
    pub kind: ResourceKind,
    /// Host-defined payload
    pub data: Vec<u8>,
}

impl Resource {
    pub fn new(name: impl Into<String>, kind: ResourceKind, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            kind,
            data,
        }
    }

    pub fn geometry(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self::new(name, ResourceKind::Geometry, data)
    }

    pub fn material(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self::new(name, ResourceKind::Material, data)
    }
}

/// Shared handle attached to decorated entries
///
/// Two handles are equal when the resources they point at are equal, so
/// collections produced from a reloaded procedure compare equal to the
/// originals.
#[derive(Debug, Clone)]
pub struct ResourceHandle(Arc<Resource>);

impl ResourceHandle {
    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn kind(&self) -> ResourceKind {
        self.0.kind
    }

    pub fn resource(&self) -> &Resource {
        &self.0
    }

    /// Whether both handles share the same allocation
    pub fn ptr_eq(&self, other: &ResourceHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for ResourceHandle {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || *self.0 == *other.0
    }
}

impl Serialize for ResourceHandle {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.name)
    }
}

/// Ordered, name-keyed set of resources
#[derive(Debug, Clone, Default)]
pub struct ResourceStore {
    items: Vec<Arc<Resource>>,
}

impl ResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.items.iter().position(|r| r.name == name)
    }

    /// Insert a resource, replacing any resource with the same name
    pub fn insert(&mut self, resource: Resource) -> ResourceHandle {
        let item = Arc::new(resource);
        match self.position(&item.name) {
            Some(pos) => self.items[pos] = Arc::clone(&item),
            None => self.items.push(Arc::clone(&item)),
        }
        ResourceHandle(item)
    }

    /// Look up a resource by name
    pub fn get(&self, name: &str) -> Option<ResourceHandle> {
        self.position(name).map(|pos| ResourceHandle(Arc::clone(&self.items[pos])))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Remove a resource by name
    ///
    /// Handles already attached to entries keep the resource alive.
    pub fn remove(&mut self, name: &str) -> Option<ResourceHandle> {
        self.position(name).map(|pos| ResourceHandle(self.items.remove(pos)))
    }

    /// Mutate a resource in place, copying it first if it is shared
    ///
    /// Returns false when no resource has that name.
    pub fn modify(&mut self, name: &str, f: impl FnOnce(&mut Resource)) -> bool {
        let Some(pos) = self.position(name) else {
            log::warn!("Cannot modify unknown resource '{}'", name);
            return false;
        };
        let resource = Arc::make_mut(&mut self.items[pos]);
        let original_name = resource.name.clone();
        f(resource);
        if resource.name != original_name {
            log::warn!("Resource '{}' cannot be renamed through modify", original_name);
            resource.name = original_name;
        }
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = ResourceHandle> + '_ {
        self.items.iter().map(|r| ResourceHandle(Arc::clone(r)))
    }

    /// Names of all resources of the given kind, in store order
    pub fn names_of_kind(&self, kind: ResourceKind) -> Vec<&str> {
        self.items
            .iter()
            .filter(|r| r.kind == kind)
            .map(|r| r.name.as_str())
            .collect()
    }

    pub(crate) fn encode(&self, writer: &mut ByteWriter) {
        writer.write_u16(RESOURCE_STORE_VERSION);
        writer.write_len(self.items.len());
        for item in &self.items {
            writer.write_str(&item.name);
            writer.write_u8(item.kind.to_u8());
            writer.write_bytes(&item.data);
        }
    }

    pub(crate) fn decode(reader: &mut ByteReader<'_>) -> Result<Self> {
        reader.read_version("resource store", RESOURCE_STORE_VERSION)?;
        let count = reader.read_count(9)?;
        let mut store = ResourceStore::new();
        for _ in 0..count {
            let name = reader.read_str()?;
            let kind_tag = reader.read_u8()?;
            let kind = ResourceKind::from_u8(kind_tag).ok_or_else(|| {
                ProcEngineError::decode(format!("unknown resource kind {} for '{}'", kind_tag, name))
            })?;
            let data = reader.read_bytes()?;
            store.insert(Resource { name, kind, data });
        }
        Ok(store)
    }
}

impl PartialEq for ResourceStore {
    fn eq(&self, other: &Self) -> bool {
        self.items.len() == other.items.len()
            && self.items.iter().zip(&other.items).all(|(a, b)| **a == **b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_replaces_by_name() {
        let mut store = ResourceStore::new();
        store.insert(Resource::geometry("cube", vec![1]));
        store.insert(Resource::geometry("cube", vec![2]));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("cube").unwrap().resource().data, vec![2]);
    }

    #[test]
    fn test_modify_copies_shared_resource() {
        let mut original = ResourceStore::new();
        original.insert(Resource::geometry("cube", vec![1, 2, 3]));
        let mut copy = original.clone();

        assert!(copy.modify("cube", |r| r.data.push(4)));

        assert_eq!(original.get("cube").unwrap().resource().data, vec![1, 2, 3]);
        assert_eq!(copy.get("cube").unwrap().resource().data, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_modify_unknown_is_noop() {
        let mut store = ResourceStore::new();
        assert!(!store.modify("missing", |r| r.data.clear()));
    }

    #[test]
    fn test_handles_compare_by_content() {
        let mut a = ResourceStore::new();
        let mut b = ResourceStore::new();
        let ha = a.insert(Resource::material("red", vec![255, 0, 0]));
        let hb = b.insert(Resource::material("red", vec![255, 0, 0]));
        assert!(!ha.ptr_eq(&hb));
        assert_eq!(ha, hb);
    }

    #[test]
    fn test_encode_decode_store() {
        let mut store = ResourceStore::new();
        store.insert(Resource::geometry("cube", vec![1, 2]));
        store.insert(Resource::material("stone", vec![]));

        let mut w = ByteWriter::new();
        store.encode(&mut w);
        let bytes = w.into_bytes();
        let decoded = ResourceStore::decode(&mut ByteReader::new(&bytes)).unwrap();
        assert_eq!(decoded, store);
        assert_eq!(decoded.names_of_kind(ResourceKind::Material), vec!["stone"]);
    }
}
