//! Dense tile-index set with constant-time membership

const NO_SLOT: usize = usize::MAX;

/// Unordered set of tile indices
///
/// Members are packed in a dense list for iteration; `slots` maps a tile
/// index to its position in that list so insert, remove and lookup never
/// scan. Removal swaps the last member into the hole.
#[derive(Debug, Clone, Default)]
pub(crate) struct TileSet {
    items: Vec<usize>,
    slots: Vec<usize>,
}

impl TileSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            slots: Vec::new(),
        }
    }

    /// Add `index`; false if it was already a member
    pub fn insert(&mut self, index: usize) -> bool {
        if self.contains(index) {
            return false;
        }
        if index >= self.slots.len() {
            self.slots.resize(index + 1, NO_SLOT);
        }
        self.slots[index] = self.items.len();
        self.items.push(index);
        true
    }

    /// Drop `index`; false if it was not a member
    pub fn remove(&mut self, index: usize) -> bool {
        let Some(&slot) = self.slots.get(index) else {
            return false;
        };
        if slot == NO_SLOT {
            return false;
        }
        self.slots[index] = NO_SLOT;
        self.items.swap_remove(slot);
        if let Some(&moved) = self.items.get(slot) {
            self.slots[moved] = slot;
        }
        true
    }

    pub fn contains(&self, index: usize) -> bool {
        self.slots.get(index).is_some_and(|&slot| slot != NO_SLOT)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.items
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.items.iter().copied()
    }

    pub fn to_vec(&self) -> Vec<usize> {
        self.items.clone()
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.slots.clear();
    }

    /// Replace the members with `indices`, kept in the order given
    pub fn rebuild(&mut self, indices: impl IntoIterator<Item = usize>) {
        self.clear();
        for index in indices {
            self.insert(index);
        }
    }
}
