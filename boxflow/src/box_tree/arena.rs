//! Slab storage for box nodes, keyed by `BoxId`. A destroyed box's id goes
//! on a free list and is recycled, so holding an id across a destroy of
//! that same box is a logic error (and panics on access).

use super::{BoxId, BoxNode};

#[derive(Debug, Default)]
pub struct BoxArena {
    slots: Vec<Option<BoxNode>>,
    free_list: Vec<BoxId>,
}

impl BoxArena {
    pub fn allocate(&mut self, node: BoxNode) -> BoxId {
        if let Some(id) = self.free_list.pop() {
            debug_assert!(self.slots[id.0].is_none());
            self.slots[id.0] = Some(node);
            return id;
        }
        self.slots.push(Some(node));
        BoxId(self.slots.len() - 1)
    }

    pub fn deallocate(&mut self, id: BoxId) {
        self.slots[id.0].take().expect("freeing a free box");
        self.free_list.push(id);
    }
}

impl std::ops::Index<BoxId> for BoxArena {
    type Output = BoxNode;

    fn index(&self, id: BoxId) -> &BoxNode {
        self.slots[id.0].as_ref().expect("use of a box after free")
    }
}

impl std::ops::IndexMut<BoxId> for BoxArena {
    fn index_mut(&mut self, id: BoxId) -> &mut BoxNode {
        self.slots[id.0].as_mut().expect("use of a box after free")
    }
}
