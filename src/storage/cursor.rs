//! A logical position `(page, cell)` inside the tree, used both for
//! sequential scan and as the insertion point returned by a key search.

use super::btree::NodeType;
use super::row::Row;
use super::table::Table;
use crate::errors::Error;

pub struct Cursor<'a> {
    table: &'a mut Table,
    pub page_num: u32,
    pub cell_num: u32,
    pub end_of_table: bool,
}

impl<'a> Cursor<'a> {
    /// The leftmost position in the tree, with `end_of_table` set when the
    /// table is empty. `find` itself never sets `end_of_table` — that's
    /// this constructor's job (see `leaf_node_find`'s contract).
    pub fn table_start(table: &'a mut Table) -> Result<Self, Error> {
        let mut cursor = Self::find(table, 0)?;
        let num_cells = cursor
            .table
            .pager
            .get_page(cursor.page_num)?
            .leaf_node_num_cells()?;
        cursor.end_of_table = num_cells == 0;
        Ok(cursor)
    }

    /// Finds the leaf position where `key` lives (or would be inserted).
    pub fn find(table: &'a mut Table, key: u32) -> Result<Self, Error> {
        let root_page_num = table.root_page_num;
        Self::find_from(table, root_page_num, key)
    }

    fn find_from(table: &'a mut Table, page_num: u32, key: u32) -> Result<Self, Error> {
        let node_type = table.pager.get_page(page_num)?.get_node_type()?;
        match node_type {
            NodeType::Leaf => Self::leaf_node_find(table, page_num, key),
            NodeType::Internal => {
                let child_page_num = {
                    let node = table.pager.get_page(page_num)?;
                    let num_keys = node.internal_node_num_keys()?;
                    let mut min_index = 0u32;
                    let mut max_index = num_keys;
                    while min_index < max_index {
                        let mid = (min_index + max_index) / 2;
                        if node.internal_node_key(mid)? >= key {
                            max_index = mid;
                        } else {
                            min_index = mid + 1;
                        }
                    }
                    node.internal_node_child(min_index)?
                };
                Self::find_from(table, child_page_num, key)
            }
        }
    }

    /// Binary search over a leaf's cells using the half-open interval
    /// `[min, one_past_max)`. On a miss, returns `min` — the position where
    /// `key` would be inserted to keep the leaf sorted.
    fn leaf_node_find(table: &'a mut Table, page_num: u32, key: u32) -> Result<Self, Error> {
        let cell_num = {
            let node = table.pager.get_page(page_num)?;
            let mut min_index = 0u32;
            let mut one_past_max_index = node.leaf_node_num_cells()?;
            let mut found = None;
            while min_index != one_past_max_index {
                let index = (min_index + one_past_max_index) / 2;
                let key_at_index = node.leaf_node_key(index as usize)?;
                if key == key_at_index {
                    found = Some(index);
                    break;
                }
                if key < key_at_index {
                    one_past_max_index = index;
                } else {
                    min_index = index + 1;
                }
            }
            found.unwrap_or(min_index)
        };

        Ok(Cursor {
            table,
            page_num,
            cell_num,
            end_of_table: false,
        })
    }

    pub fn read_row(&mut self) -> Result<Row, Error> {
        let node = self.table.pager.get_page(self.page_num)?;
        let bytes = node.leaf_node_value(self.cell_num as usize)?;
        Row::decode(bytes)
    }

    /// Advances to the next cell, following the leaf's `next_leaf` sibling
    /// link when the current leaf is exhausted.
    pub fn advance(&mut self) -> Result<(), Error> {
        let page_num = self.page_num;
        let node = self.table.pager.get_page(page_num)?;
        let num_cells = node.leaf_node_num_cells()?;

        self.cell_num += 1;
        if self.cell_num >= num_cells {
            let next_leaf = node.leaf_node_next_leaf()?;
            if next_leaf == 0 {
                self.end_of_table = true;
            } else {
                self.page_num = next_leaf;
                self.cell_num = 0;
            }
        }
        Ok(())
    }
}
