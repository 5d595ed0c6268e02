//! Object id allocation.

use std::collections::HashMap;

use crate::entity::MAX_OBJECT_ID;
use crate::error::{WorldError, WorldResult};

/// Tracks which object ids are handed out and which are in use.
///
/// Clients create entities under ids the server sent them beforehand. An id
/// is `sent` from allocation until it is released, and `used` while an
/// entity exists under it. Id 0 is never handed out.
#[derive(Debug, Clone)]
pub struct ObjectIdAllocator {
    sent: Vec<bool>,
    used: Vec<bool>,
    /// Ids handed to each client, by net id.
    owned: HashMap<u32, Vec<u16>>,
    next: u16,
}

impl Default for ObjectIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectIdAllocator {
    #[must_use]
    pub fn new() -> Self {
        let len = usize::from(MAX_OBJECT_ID) + 1;
        Self {
            sent: vec![false; len],
            used: vec![false; len],
            owned: HashMap::new(),
            next: 1,
        }
    }

    /// Hands up to `count` free ids to `net_id`.
    ///
    /// Returns fewer ids when the space runs out.
    pub fn allocate(&mut self, net_id: u32, count: usize) -> Vec<u16> {
        let mut ids = Vec::with_capacity(count);
        let mut scanned = 0;
        while ids.len() < count && scanned < usize::from(MAX_OBJECT_ID) {
            let id = self.next;
            self.next = if id >= MAX_OBJECT_ID { 1 } else { id + 1 };
            scanned += 1;

            let index = usize::from(id);
            if self.sent[index] || self.used[index] {
                continue;
            }
            self.sent[index] = true;
            ids.push(id);
        }
        self.owned.entry(net_id).or_default().extend(&ids);
        tracing::trace!(net_id, count = ids.len(), "allocated object ids");
        ids
    }

    /// Marks `id` as backing a live entity.
    pub fn mark_used(&mut self, id: u16) -> WorldResult<()> {
        let index = Self::index(id)?;
        self.sent[index] = true;
        self.used[index] = true;
        Ok(())
    }

    #[must_use]
    pub fn is_used(&self, id: u16) -> bool {
        Self::index(id).is_ok_and(|index| self.used[index])
    }

    #[must_use]
    pub fn is_sent(&self, id: u16) -> bool {
        Self::index(id).is_ok_and(|index| self.sent[index])
    }

    /// Records that `id` now belongs to `net_id` after a migration.
    pub fn transfer(&mut self, id: u16, from: Option<u32>, to: u32) {
        if let Some(from) = from {
            if let Some(ids) = self.owned.get_mut(&from) {
                ids.retain(|owned| *owned != id);
            }
        }
        let ids = self.owned.entry(to).or_default();
        if !ids.contains(&id) {
            ids.push(id);
        }
    }

    /// Frees `id` once its entity is gone.
    pub fn release(&mut self, id: u16) {
        let Ok(index) = Self::index(id) else {
            return;
        };
        self.sent[index] = false;
        self.used[index] = false;
        for ids in self.owned.values_mut() {
            ids.retain(|owned| *owned != id);
        }
    }

    /// Returns the ids a dropped client held but never used.
    pub fn release_client(&mut self, net_id: u32) -> usize {
        let Some(ids) = self.owned.remove(&net_id) else {
            return 0;
        };
        let mut freed = 0;
        for id in ids {
            let index = usize::from(id);
            if !self.used[index] {
                self.sent[index] = false;
                freed += 1;
            }
        }
        freed
    }

    /// Ids currently attributed to `net_id`.
    #[must_use]
    pub fn owned_by(&self, net_id: u32) -> &[u16] {
        self.owned.get(&net_id).map_or(&[], Vec::as_slice)
    }

    fn index(id: u16) -> WorldResult<usize> {
        if id == 0 || id > MAX_OBJECT_ID {
            return Err(WorldError::ObjectIdOutOfRange(id));
        }
        Ok(usize::from(id))
    }
}
