//! Script handle pool.

use crate::error::{WorldError, WorldResult};

/// First script handle; pool index 0 maps here.
pub const SCRIPT_HANDLE_BASE: u32 = 0x20000;

/// Fixed-capacity pool mapping script handles to entity handles.
///
/// Freed indices are reused lowest first, matching how the game's own
/// pools hand out slots.
#[derive(Debug, Clone)]
pub struct ScriptHandlePool {
    slots: Vec<Option<u32>>,
    capacity: usize,
}

impl ScriptHandlePool {
    #[must_use]
    pub const fn new(capacity: usize) -> Self {
        Self {
            slots: Vec::new(),
            capacity,
        }
    }

    /// Allocates a script handle for `entity_handle`.
    pub fn insert(&mut self, entity_handle: u32) -> WorldResult<u32> {
        let index = match self.slots.iter().position(Option::is_none) {
            Some(index) => index,
            None if self.slots.len() < self.capacity => {
                self.slots.push(None);
                self.slots.len() - 1
            }
            None => {
                return Err(WorldError::HandlePoolExhausted {
                    capacity: self.capacity,
                })
            }
        };
        self.slots[index] = Some(entity_handle);
        Ok(SCRIPT_HANDLE_BASE + index as u32)
    }

    /// Entity handle behind a script handle.
    #[must_use]
    pub fn get(&self, script_handle: u32) -> Option<u32> {
        let index = script_handle.checked_sub(SCRIPT_HANDLE_BASE)? as usize;
        self.slots.get(index).copied().flatten()
    }

    /// Existing script handle for `entity_handle`, if one was handed out.
    #[must_use]
    pub fn find(&self, entity_handle: u32) -> Option<u32> {
        self.slots
            .iter()
            .position(|slot| *slot == Some(entity_handle))
            .map(|index| SCRIPT_HANDLE_BASE + index as u32)
    }

    pub fn remove(&mut self, script_handle: u32) -> Option<u32> {
        let index = script_handle.checked_sub(SCRIPT_HANDLE_BASE)? as usize;
        self.slots.get_mut(index)?.take()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_start_at_base() {
        let mut pool = ScriptHandlePool::new(4);
        assert_eq!(pool.insert(0x1_0007).unwrap(), 0x20000);
        assert_eq!(pool.insert(0x1_0008).unwrap(), 0x20001);
        assert_eq!(pool.get(0x20001), Some(0x1_0008));
        assert_eq!(pool.get(0x1_0008), None);
        assert_eq!(pool.get(5), None);
    }

    #[test]
    fn freed_slots_are_reused() {
        let mut pool = ScriptHandlePool::new(4);
        let first = pool.insert(1).unwrap();
        let _second = pool.insert(2).unwrap();
        assert_eq!(pool.remove(first), Some(1));
        assert_eq!(pool.get(first), None);
        assert_eq!(pool.insert(3).unwrap(), first);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn full_pool_is_an_error() {
        let mut pool = ScriptHandlePool::new(1);
        pool.insert(1).unwrap();
        assert_eq!(
            pool.insert(2),
            Err(WorldError::HandlePoolExhausted { capacity: 1 })
        );
    }

    #[test]
    fn find_returns_existing_handle() {
        let mut pool = ScriptHandlePool::new(8);
        pool.insert(10).unwrap();
        let handle = pool.insert(20).unwrap();
        assert_eq!(pool.find(20), Some(handle));
        assert_eq!(pool.find(30), None);
    }
}
