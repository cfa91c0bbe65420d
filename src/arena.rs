// index reused across clear(), so a NodeId from before one must not outlive it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(usize);

// in-memory analogue of the reference's page file; insert/free mirror
// PageManager::new_id/remove_page
#[derive(Debug)]
pub(crate) struct Arena<T> {
    slots: Vec<Option<T>>,
    free: Vec<usize>,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Arena {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }
}

impl<T> Arena<T> {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, value: T) -> NodeId {
        if let Some(idx) = self.free.pop() {
            self.slots[idx] = Some(value);
            NodeId(idx)
        } else {
            self.slots.push(Some(value));
            NodeId(self.slots.len() - 1)
        }
    }

    pub(crate) fn get(&self, id: NodeId) -> &T {
        self.slots[id.0]
            .as_ref()
            .expect("arena slot accessed after removal")
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> &mut T {
        self.slots[id.0]
            .as_mut()
            .expect("arena slot accessed after removal")
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &T> {
        self.slots.iter().filter_map(|s| s.as_ref())
    }
}
