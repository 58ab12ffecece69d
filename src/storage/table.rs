//! Table facade: owns the Pager and the root page index, and exposes the
//! two operations the REPL needs — `insert` and `select` — plus the
//! B+tree's leaf-split and root-promotion machinery.

use std::path::Path;

use tracing::info;

use super::btree::{
    Node, NodeType, COMMON_NODE_HEADER_SIZE, LEAF_NODE_CELL_SIZE, LEAF_NODE_HEADER_SIZE,
    LEAF_NODE_LEFT_SPLIT_COUNT, LEAF_NODE_MAX_CELLS, LEAF_NODE_RIGHT_SPLIT_COUNT,
    LEAF_NODE_SPACE_FOR_CELLS,
};
use super::cursor::Cursor;
use super::pager::Pager;
use super::row::{Row, ROW_SIZE};
use crate::errors::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecuteResult {
    Success,
    DuplicateKey,
}

pub struct Table {
    pub(super) pager: Pager,
    pub root_page_num: u32,
}

impl Table {
    pub fn open(path: &Path) -> Result<Self, Error> {
        let mut pager = Pager::open(path)?;
        if pager.num_pages() == 0 {
            let root = pager.get_page(0)?;
            root.initialize_leaf_node();
            root.set_node_root(true)?;
            info!("initialized new table at page 0");
        }
        Ok(Table {
            pager,
            root_page_num: 0,
        })
    }

    pub fn close(&mut self) -> Result<(), Error> {
        self.pager.close()
    }

    pub fn insert(&mut self, row: Row) -> Result<ExecuteResult, Error> {
        let key = row.id;
        let (page_num, cell_num) = {
            let cursor = Cursor::find(self, key)?;
            (cursor.page_num, cursor.cell_num)
        };

        let node = self.pager.get_page(page_num)?;
        let num_cells = node.leaf_node_num_cells()?;
        if cell_num < num_cells && node.leaf_node_key(cell_num as usize)? == key {
            return Ok(ExecuteResult::DuplicateKey);
        }

        if num_cells as usize >= LEAF_NODE_MAX_CELLS {
            self.leaf_node_split_and_insert(page_num, cell_num, &row)?;
        } else {
            let encoded = row.encode();
            let node = self.pager.get_page(page_num)?;
            for i in (cell_num..num_cells).rev() {
                let cell = node.leaf_node_cell(i as usize)?.to_vec();
                let key = u32::from_le_bytes(cell[0..4].try_into().unwrap());
                node.set_leaf_node_key(i as usize + 1, key)?;
                node.set_leaf_node_value(i as usize + 1, &cell[4..])?;
            }
            node.set_leaf_node_num_cells(num_cells + 1)?;
            node.set_leaf_node_key(cell_num as usize, key)?;
            node.set_leaf_node_value(cell_num as usize, &encoded)?;
        }
        Ok(ExecuteResult::Success)
    }

    pub fn select(&mut self) -> Result<Vec<Row>, Error> {
        let mut rows = Vec::new();
        let mut cursor = Cursor::table_start(self)?;
        while !cursor.end_of_table {
            rows.push(cursor.read_row()?);
            cursor.advance()?;
        }
        Ok(rows)
    }

    /// Splits a full leaf in two, interleaving the new `(key, row)` into
    /// the existing cells before dividing them `LEFT_SPLIT_COUNT` /
    /// `RIGHT_SPLIT_COUNT`. If the leaf being split is the root, promotes a
    /// new internal root over it; otherwise this tree has no parent to
    /// update and the condition is fatal (no internal-node splitting).
    fn leaf_node_split_and_insert(
        &mut self,
        old_page_num: u32,
        cursor_cell: u32,
        row: &Row,
    ) -> Result<(), Error> {
        let new_page_num = self.pager.allocate_page();

        let (old_is_root, old_next_leaf, mut combined) = {
            let old_node = self.pager.get_page(old_page_num)?;
            let old_is_root = old_node.is_node_root()?;
            let old_next_leaf = old_node.leaf_node_next_leaf()?;
            let mut combined: Vec<(u32, [u8; ROW_SIZE])> =
                Vec::with_capacity(LEAF_NODE_MAX_CELLS + 1);
            for i in 0..LEAF_NODE_MAX_CELLS as u32 {
                if i == cursor_cell {
                    combined.push((row.id, row.encode()));
                }
                combined.push((
                    old_node.leaf_node_key(i as usize)?,
                    old_node.leaf_node_value(i as usize)?.try_into().unwrap(),
                ));
            }
            if cursor_cell as usize == LEAF_NODE_MAX_CELLS {
                combined.push((row.id, row.encode()));
            }
            (old_is_root, old_next_leaf, combined)
        };
        debug_assert_eq!(combined.len(), LEAF_NODE_MAX_CELLS + 1);

        let right_half = combined.split_off(LEAF_NODE_LEFT_SPLIT_COUNT);

        {
            let old_node = self.pager.get_page(old_page_num)?;
            old_node.set_leaf_node_num_cells(LEAF_NODE_LEFT_SPLIT_COUNT as u32)?;
            for (idx, (key, value)) in combined.into_iter().enumerate() {
                old_node.set_leaf_node_key(idx, key)?;
                old_node.set_leaf_node_value(idx, &value)?;
            }
            old_node.set_leaf_node_next_leaf(new_page_num)?;
        }

        {
            let new_node = self.pager.get_page(new_page_num)?;
            new_node.initialize_leaf_node();
            new_node.set_leaf_node_num_cells(LEAF_NODE_RIGHT_SPLIT_COUNT as u32)?;
            for (idx, (key, value)) in right_half.into_iter().enumerate() {
                new_node.set_leaf_node_key(idx, key)?;
                new_node.set_leaf_node_value(idx, &value)?;
            }
            new_node.set_leaf_node_next_leaf(old_next_leaf)?;
        }

        if old_is_root {
            self.create_new_root(new_page_num)
        } else {
            Err(Error::Storage(
                "Need to implement updating parent after split".into(),
            ))
        }
    }

    /// Replaces a full root leaf with a new internal root pointing at the
    /// old root's contents (copied to a fresh page) and its new sibling.
    fn create_new_root(&mut self, new_page_num: u32) -> Result<(), Error> {
        let left_page_num = self.pager.allocate_page();
        let old_root_bytes = *self.pager.get_page(self.root_page_num)?.raw();

        let left_max_key = {
            let left_node = self.pager.get_page(left_page_num)?;
            *left_node = Node::from_raw(old_root_bytes);
            left_node.set_node_root(false)?;
            left_node.get_node_max_key()?
        };

        let root = self.pager.get_page(self.root_page_num)?;
        root.initialize_internal_node();
        root.set_node_root(true)?;
        root.set_internal_node_num_keys(1)?;
        root.set_internal_node_child(0, left_page_num)?;
        root.set_internal_node_key(0, left_max_key)?;
        root.set_internal_node_right_child(new_page_num)?;

        info!(left_page_num, new_page_num, "promoted new internal root");
        Ok(())
    }

    pub fn print_constants(&self) -> String {
        format!(
            "ROW_SIZE: {}\nCOMMON_NODE_HEADER_SIZE: {}\nLEAF_NODE_HEADER_SIZE: {}\nLEAF_NODE_CELL_SIZE: {}\nLEAF_NODE_SPACE_FOR_CELLS: {}\nLEAF_NODE_MAX_CELLS: {}",
            ROW_SIZE,
            COMMON_NODE_HEADER_SIZE,
            LEAF_NODE_HEADER_SIZE,
            LEAF_NODE_CELL_SIZE,
            LEAF_NODE_SPACE_FOR_CELLS,
            LEAF_NODE_MAX_CELLS,
        )
    }

    pub fn print_tree(&mut self) -> Result<String, Error> {
        let mut out = String::new();
        let root = self.root_page_num;
        self.print_tree_at(root, 0, &mut out)?;
        Ok(out)
    }

    fn print_tree_at(&mut self, page_num: u32, indent: usize, out: &mut String) -> Result<(), Error> {
        let pad = "  ".repeat(indent);
        let node_type = self.pager.get_page(page_num)?.get_node_type()?;
        match node_type {
            NodeType::Leaf => {
                let num_cells = self.pager.get_page(page_num)?.leaf_node_num_cells()?;
                out.push_str(&format!("{}- leaf (size {})\n", pad, num_cells));
                for i in 0..num_cells {
                    let key = self.pager.get_page(page_num)?.leaf_node_key(i as usize)?;
                    out.push_str(&format!("{}  - {}\n", pad, key));
                }
            }
            NodeType::Internal => {
                let num_keys = self.pager.get_page(page_num)?.internal_node_num_keys()?;
                out.push_str(&format!("{}- internal (size {})\n", pad, num_keys));
                for i in 0..num_keys {
                    let child = self.pager.get_page(page_num)?.internal_node_child(i)?;
                    self.print_tree_at(child, indent + 1, out)?;
                    let key = self.pager.get_page(page_num)?.internal_node_key(i)?;
                    out.push_str(&format!("{}- key {}\n", pad, key));
                }
                let right_child = self.pager.get_page(page_num)?.internal_node_right_child()?;
                self.print_tree_at(right_child, indent + 1, out)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::pager::PAGE_SIZE;
    use tempfile::NamedTempFile;

    fn open_temp() -> (Table, NamedTempFile) {
        let file = NamedTempFile::new().unwrap();
        let table = Table::open(file.path()).unwrap();
        (table, file)
    }

    #[test]
    fn insert_then_select_round_trips() {
        let (mut table, _file) = open_temp();
        table
            .insert(Row::new(1, "cstack", "foo@bar.com"))
            .unwrap();
        let rows = table.select().unwrap();
        assert_eq!(rows, vec![Row::new(1, "cstack", "foo@bar.com")]);
    }

    #[test]
    fn duplicate_key_is_rejected() {
        let (mut table, _file) = open_temp();
        assert_eq!(
            table.insert(Row::new(1, "a", "a@b.com")).unwrap(),
            ExecuteResult::Success
        );
        assert_eq!(
            table.insert(Row::new(1, "b", "b@b.com")).unwrap(),
            ExecuteResult::DuplicateKey
        );
        assert_eq!(table.select().unwrap().len(), 1);
    }

    #[test]
    fn select_returns_rows_in_ascending_key_order() {
        let (mut table, _file) = open_temp();
        for id in [3, 1, 2] {
            table
                .insert(Row::new(id, "user", "user@email.com"))
                .unwrap();
        }
        let ids: Vec<u32> = table.select().unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn inserting_past_one_leaf_promotes_a_new_root() {
        let (mut table, _file) = open_temp();
        for id in 1..=14u32 {
            table
                .insert(Row::new(id, "user", "user@email.com"))
                .unwrap();
        }
        let ids: Vec<u32> = table.select().unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, (1..=14).collect::<Vec<_>>());
        assert!(table
            .pager
            .get_page(0)
            .unwrap()
            .get_node_type()
            .unwrap()
            == NodeType::Internal);
    }

    #[test]
    fn close_and_reopen_preserves_rows() {
        let file = NamedTempFile::new().unwrap();
        {
            let mut table = Table::open(file.path()).unwrap();
            for id in 1..=13u32 {
                table
                    .insert(Row::new(id, "user", "user@email.com"))
                    .unwrap();
            }
            table.close().unwrap();
        }
        let mut table = Table::open(file.path()).unwrap();
        let ids: Vec<u32> = table.select().unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, (1..=13).collect::<Vec<_>>());
        assert_eq!(file.path().metadata().unwrap().len(), PAGE_SIZE as u64);
    }
}
