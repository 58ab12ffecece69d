//! B+tree node codec.
//!
//! A [`Node`] wraps one raw 4096-byte page and interprets it as either a
//! leaf or an internal node of the tree, per the on-disk layout below.
//! Every accessor is a typed read/write at a fixed byte offset; callers are
//! responsible for not indexing past a node's own `num_cells`/`num_keys`.
//!
//! ```text
//! common header (6 bytes)
//!   0  node_type    u8     0 = internal, 1 = leaf
//!   1  is_root      u8
//!   2  parent       u32    reserved, unused
//!
//! leaf body
//!   6  num_cells    u32
//!  10  next_leaf    u32
//!  14  cells        LEAF_NODE_MAX_CELLS * (key: u32, row: Row)
//!
//! internal body
//!   6  num_keys     u32
//!  10  right_child  u32
//!  14  cells        N * (child: u32, key: u32)
//! ```

use super::pager::PAGE_SIZE;
use super::row::ROW_SIZE;
use crate::errors::Error;

const NODE_TYPE_OFFSET: usize = 0;
const NODE_TYPE_SIZE: usize = 1;
const IS_ROOT_OFFSET: usize = NODE_TYPE_OFFSET + NODE_TYPE_SIZE;
const IS_ROOT_SIZE: usize = 1;
const PARENT_POINTER_OFFSET: usize = IS_ROOT_OFFSET + IS_ROOT_SIZE;
const PARENT_POINTER_SIZE: usize = 4;
pub const COMMON_NODE_HEADER_SIZE: usize = PARENT_POINTER_OFFSET + PARENT_POINTER_SIZE;

const LEAF_NODE_NUM_CELLS_OFFSET: usize = COMMON_NODE_HEADER_SIZE;
const LEAF_NODE_NUM_CELLS_SIZE: usize = 4;
const LEAF_NODE_NEXT_LEAF_OFFSET: usize = LEAF_NODE_NUM_CELLS_OFFSET + LEAF_NODE_NUM_CELLS_SIZE;
const LEAF_NODE_NEXT_LEAF_SIZE: usize = 4;
pub const LEAF_NODE_HEADER_SIZE: usize = LEAF_NODE_NEXT_LEAF_OFFSET + LEAF_NODE_NEXT_LEAF_SIZE;

const LEAF_NODE_KEY_SIZE: usize = 4;
const LEAF_NODE_VALUE_SIZE: usize = ROW_SIZE;
pub const LEAF_NODE_CELL_SIZE: usize = LEAF_NODE_KEY_SIZE + LEAF_NODE_VALUE_SIZE;
pub const LEAF_NODE_SPACE_FOR_CELLS: usize = PAGE_SIZE - LEAF_NODE_HEADER_SIZE;
pub const LEAF_NODE_MAX_CELLS: usize = LEAF_NODE_SPACE_FOR_CELLS / LEAF_NODE_CELL_SIZE;

pub const LEAF_NODE_RIGHT_SPLIT_COUNT: usize = (LEAF_NODE_MAX_CELLS + 1).div_ceil(2);
pub const LEAF_NODE_LEFT_SPLIT_COUNT: usize = (LEAF_NODE_MAX_CELLS + 1) - LEAF_NODE_RIGHT_SPLIT_COUNT;

const INTERNAL_NODE_NUM_KEYS_OFFSET: usize = COMMON_NODE_HEADER_SIZE;
const INTERNAL_NODE_NUM_KEYS_SIZE: usize = 4;
const INTERNAL_NODE_RIGHT_CHILD_OFFSET: usize =
    INTERNAL_NODE_NUM_KEYS_OFFSET + INTERNAL_NODE_NUM_KEYS_SIZE;
const INTERNAL_NODE_RIGHT_CHILD_SIZE: usize = 4;
const INTERNAL_NODE_HEADER_SIZE: usize =
    INTERNAL_NODE_RIGHT_CHILD_OFFSET + INTERNAL_NODE_RIGHT_CHILD_SIZE;
const INTERNAL_NODE_CHILD_SIZE: usize = 4;
const INTERNAL_NODE_KEY_SIZE: usize = 4;
const INTERNAL_NODE_CELL_SIZE: usize = INTERNAL_NODE_CHILD_SIZE + INTERNAL_NODE_KEY_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Internal,
    Leaf,
}

/// One page, interpreted as a B+tree node. Owns its buffer directly; there
/// is no separate "dirty" flag because the Pager always flushes whatever is
/// resident in the cache on close.
#[derive(Debug, Clone)]
pub struct Node {
    data: [u8; PAGE_SIZE],
}

impl Node {
    pub fn from_raw(data: [u8; PAGE_SIZE]) -> Self {
        Node { data }
    }

    pub fn raw(&self) -> &[u8; PAGE_SIZE] {
        &self.data
    }

    pub fn initialize_leaf_node(&mut self) {
        self.data = [0u8; PAGE_SIZE];
        // set_node_type/set_node_root never fail against a fresh [0; PAGE_SIZE] buffer
        self.set_node_type(NodeType::Leaf).unwrap();
        self.set_node_root(false).unwrap();
        self.set_leaf_node_num_cells(0).unwrap();
        self.set_leaf_node_next_leaf(0).unwrap();
    }

    pub fn initialize_internal_node(&mut self) {
        self.data = [0u8; PAGE_SIZE];
        self.set_node_type(NodeType::Internal).unwrap();
        self.set_node_root(false).unwrap();
        self.set_internal_node_num_keys(0).unwrap();
    }

    pub fn get_node_type(&self) -> Result<NodeType, Error> {
        match self.data[NODE_TYPE_OFFSET] {
            0 => Ok(NodeType::Internal),
            1 => Ok(NodeType::Leaf),
            other => Err(Error::Storage(format!("invalid node type byte: {}", other))),
        }
    }

    pub fn set_node_type(&mut self, node_type: NodeType) -> Result<(), Error> {
        self.data[NODE_TYPE_OFFSET] = match node_type {
            NodeType::Internal => 0,
            NodeType::Leaf => 1,
        };
        Ok(())
    }

    pub fn is_node_root(&self) -> Result<bool, Error> {
        Ok(self.data[IS_ROOT_OFFSET] == 1)
    }

    pub fn set_node_root(&mut self, is_root: bool) -> Result<(), Error> {
        self.data[IS_ROOT_OFFSET] = is_root as u8;
        Ok(())
    }

    // --- leaf accessors ---

    pub fn leaf_node_num_cells(&self) -> Result<u32, Error> {
        Ok(read_u32(&self.data, LEAF_NODE_NUM_CELLS_OFFSET))
    }

    pub fn set_leaf_node_num_cells(&mut self, num: u32) -> Result<(), Error> {
        write_u32(&mut self.data, LEAF_NODE_NUM_CELLS_OFFSET, num);
        Ok(())
    }

    pub fn leaf_node_next_leaf(&self) -> Result<u32, Error> {
        Ok(read_u32(&self.data, LEAF_NODE_NEXT_LEAF_OFFSET))
    }

    pub fn set_leaf_node_next_leaf(&mut self, next_leaf: u32) -> Result<(), Error> {
        write_u32(&mut self.data, LEAF_NODE_NEXT_LEAF_OFFSET, next_leaf);
        Ok(())
    }

    fn leaf_node_cell_offset(&self, cell_num: usize) -> Result<usize, Error> {
        if cell_num >= LEAF_NODE_MAX_CELLS {
            return Err(Error::Storage(format!(
                "cell {} out of bounds (max {})",
                cell_num, LEAF_NODE_MAX_CELLS
            )));
        }
        Ok(LEAF_NODE_HEADER_SIZE + cell_num * LEAF_NODE_CELL_SIZE)
    }

    pub fn leaf_node_cell(&self, cell_num: usize) -> Result<&[u8], Error> {
        let offset = self.leaf_node_cell_offset(cell_num)?;
        Ok(&self.data[offset..offset + LEAF_NODE_CELL_SIZE])
    }

    pub fn leaf_node_key(&self, cell_num: usize) -> Result<u32, Error> {
        let offset = self.leaf_node_cell_offset(cell_num)?;
        Ok(read_u32(&self.data, offset))
    }

    pub fn set_leaf_node_key(&mut self, cell_num: usize, key: u32) -> Result<(), Error> {
        let offset = self.leaf_node_cell_offset(cell_num)?;
        write_u32(&mut self.data, offset, key);
        Ok(())
    }

    pub fn leaf_node_value(&self, cell_num: usize) -> Result<&[u8], Error> {
        let offset = self.leaf_node_cell_offset(cell_num)? + LEAF_NODE_KEY_SIZE;
        Ok(&self.data[offset..offset + LEAF_NODE_VALUE_SIZE])
    }

    pub fn set_leaf_node_value(&mut self, cell_num: usize, value: &[u8]) -> Result<(), Error> {
        if value.len() != LEAF_NODE_VALUE_SIZE {
            return Err(Error::Storage(format!(
                "value size mismatch (expected {}, got {})",
                LEAF_NODE_VALUE_SIZE,
                value.len()
            )));
        }
        let offset = self.leaf_node_cell_offset(cell_num)? + LEAF_NODE_KEY_SIZE;
        self.data[offset..offset + LEAF_NODE_VALUE_SIZE].copy_from_slice(value);
        Ok(())
    }

    // --- internal accessors ---

    pub fn internal_node_num_keys(&self) -> Result<u32, Error> {
        Ok(read_u32(&self.data, INTERNAL_NODE_NUM_KEYS_OFFSET))
    }

    pub fn set_internal_node_num_keys(&mut self, num_keys: u32) -> Result<(), Error> {
        write_u32(&mut self.data, INTERNAL_NODE_NUM_KEYS_OFFSET, num_keys);
        Ok(())
    }

    pub fn internal_node_right_child(&self) -> Result<u32, Error> {
        Ok(read_u32(&self.data, INTERNAL_NODE_RIGHT_CHILD_OFFSET))
    }

    pub fn set_internal_node_right_child(&mut self, right_child: u32) -> Result<(), Error> {
        write_u32(&mut self.data, INTERNAL_NODE_RIGHT_CHILD_OFFSET, right_child);
        Ok(())
    }

    fn internal_node_cell_offset(&self, cell_num: u32) -> usize {
        INTERNAL_NODE_HEADER_SIZE + cell_num as usize * INTERNAL_NODE_CELL_SIZE
    }

    /// Child pointer at `child_num`; routes to `right_child` when
    /// `child_num == num_keys`, per the tree's fan-out convention.
    pub fn internal_node_child(&self, child_num: u32) -> Result<u32, Error> {
        let num_keys = self.internal_node_num_keys()?;
        if child_num > num_keys {
            return Err(Error::Storage(format!(
                "child index {} exceeds num_keys {}",
                child_num, num_keys
            )));
        }
        if child_num == num_keys {
            self.internal_node_right_child()
        } else {
            let offset = self.internal_node_cell_offset(child_num);
            Ok(read_u32(&self.data, offset))
        }
    }

    pub fn set_internal_node_child(&mut self, child_num: u32, child_page: u32) -> Result<(), Error> {
        let num_keys = self.internal_node_num_keys()?;
        if child_num == num_keys {
            return self.set_internal_node_right_child(child_page);
        }
        let offset = self.internal_node_cell_offset(child_num);
        write_u32(&mut self.data, offset, child_page);
        Ok(())
    }

    pub fn internal_node_key(&self, key_num: u32) -> Result<u32, Error> {
        let num_keys = self.internal_node_num_keys()?;
        if key_num >= num_keys {
            return Err(Error::Storage(format!(
                "key index {} exceeds num_keys {}",
                key_num, num_keys
            )));
        }
        let offset = self.internal_node_cell_offset(key_num) + INTERNAL_NODE_CHILD_SIZE;
        Ok(read_u32(&self.data, offset))
    }

    pub fn set_internal_node_key(&mut self, key_num: u32, key: u32) -> Result<(), Error> {
        let num_keys = self.internal_node_num_keys()?;
        if key_num >= num_keys {
            return Err(Error::Storage(format!(
                "key index {} exceeds num_keys {}",
                key_num, num_keys
            )));
        }
        let offset = self.internal_node_cell_offset(key_num) + INTERNAL_NODE_CHILD_SIZE;
        write_u32(&mut self.data, offset, key);
        Ok(())
    }

    /// For a leaf, the key of its last cell; for an internal node, its last
    /// separator key. Undefined (returns whatever key 0/num_cells-1 decodes
    /// to) on an empty node — callers only call this on non-empty nodes.
    pub fn get_node_max_key(&self) -> Result<u32, Error> {
        match self.get_node_type()? {
            NodeType::Internal => self.internal_node_key(self.internal_node_num_keys()? - 1),
            NodeType::Leaf => self.leaf_node_key((self.leaf_node_num_cells()? - 1) as usize),
        }
    }
}

fn read_u32(data: &[u8; PAGE_SIZE], offset: usize) -> u32 {
    u32::from_le_bytes(data[offset..offset + 4].try_into().unwrap())
}

fn write_u32(data: &mut [u8; PAGE_SIZE], offset: usize, value: u32) {
    data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaf_max_cells_matches_layout() {
        assert_eq!(LEAF_NODE_CELL_SIZE, 297);
        assert_eq!(LEAF_NODE_HEADER_SIZE, 14);
        assert_eq!(LEAF_NODE_MAX_CELLS, 13);
        assert_eq!(LEAF_NODE_LEFT_SPLIT_COUNT, 7);
        assert_eq!(LEAF_NODE_RIGHT_SPLIT_COUNT, 7);
    }

    #[test]
    fn node_type_round_trips_through_a_single_byte() {
        let mut node = Node::from_raw([0u8; PAGE_SIZE]);
        node.set_node_type(NodeType::Leaf).unwrap();
        assert_eq!(node.get_node_type().unwrap(), NodeType::Leaf);
        node.set_node_type(NodeType::Internal).unwrap();
        assert_eq!(node.get_node_type().unwrap(), NodeType::Internal);
    }

    #[test]
    fn leaf_cells_store_key_and_value() {
        let mut node = Node::from_raw([0u8; PAGE_SIZE]);
        node.initialize_leaf_node();
        node.set_leaf_node_num_cells(1).unwrap();
        node.set_leaf_node_key(0, 42).unwrap();
        node.set_leaf_node_value(0, &[7u8; ROW_SIZE]).unwrap();
        assert_eq!(node.leaf_node_key(0).unwrap(), 42);
        assert_eq!(node.leaf_node_value(0).unwrap(), &[7u8; ROW_SIZE][..]);
    }

    #[test]
    fn internal_child_routes_to_right_child_at_num_keys() {
        let mut node = Node::from_raw([0u8; PAGE_SIZE]);
        node.initialize_internal_node();
        node.set_internal_node_num_keys(1).unwrap();
        node.set_internal_node_child(0, 5).unwrap();
        node.set_internal_node_key(0, 10).unwrap();
        node.set_internal_node_right_child(9).unwrap();
        assert_eq!(node.internal_node_child(0).unwrap(), 5);
        assert_eq!(node.internal_node_child(1).unwrap(), 9);
    }
}
