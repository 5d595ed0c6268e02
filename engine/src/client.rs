//! Client slots and per-client bitsets.

/// Maximum number of concurrently addressable clients.
pub const MAX_CLIENTS: usize = 2048;

const WORDS: usize = MAX_CLIENTS / 64;

/// Dense index of a connected client, below [`MAX_CLIENTS`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClientSlot(u16);

impl ClientSlot {
    /// Returns `None` if `index` is not below [`MAX_CLIENTS`].
    #[must_use]
    pub const fn new(index: u16) -> Option<Self> {
        if (index as usize) < MAX_CLIENTS {
            Some(Self(index))
        } else {
            None
        }
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Fixed-size set of client slots.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ClientSet {
    words: [u64; WORDS],
}

impl Default for ClientSet {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientSet {
    #[must_use]
    pub const fn new() -> Self {
        Self { words: [0; WORDS] }
    }

    /// Inserts `slot`, returning `true` if it was not present.
    pub fn insert(&mut self, slot: ClientSlot) -> bool {
        let (word, mask) = locate(slot);
        let was_set = self.words[word] & mask != 0;
        self.words[word] |= mask;
        !was_set
    }

    /// Removes `slot`, returning `true` if it was present.
    pub fn remove(&mut self, slot: ClientSlot) -> bool {
        let (word, mask) = locate(slot);
        let was_set = self.words[word] & mask != 0;
        self.words[word] &= !mask;
        was_set
    }

    #[must_use]
    pub fn contains(&self, slot: ClientSlot) -> bool {
        let (word, mask) = locate(slot);
        self.words[word] & mask != 0
    }

    pub fn clear(&mut self) {
        self.words = [0; WORDS];
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Iterates members in ascending slot order.
    pub fn iter(&self) -> impl Iterator<Item = ClientSlot> + '_ {
        self.words.iter().enumerate().flat_map(|(word_idx, &word)| {
            (0..64u16).filter_map(move |bit| {
                (word & (1u64 << bit) != 0).then(|| ClientSlot(word_idx as u16 * 64 + bit))
            })
        })
    }
}

impl std::fmt::Debug for ClientSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.iter().map(ClientSlot::index)).finish()
    }
}

impl FromIterator<ClientSlot> for ClientSet {
    fn from_iter<I: IntoIterator<Item = ClientSlot>>(iter: I) -> Self {
        let mut set = Self::new();
        for slot in iter {
            set.insert(slot);
        }
        set
    }
}

const fn locate(slot: ClientSlot) -> (usize, u64) {
    let index = slot.index();
    (index / 64, 1u64 << (index % 64))
}
