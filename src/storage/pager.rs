//! Demand-paging page cache over a single backing file.
//!
//! Pages are addressed by a small integer that equals the page's file offset
//! in units of [`PAGE_SIZE`]. A page is faulted in from disk on first
//! reference and stays resident until [`Pager::close`] flushes it back.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use tracing::{debug, warn};

use super::btree::Node;
use crate::errors::Error;

pub const PAGE_SIZE: usize = 4096;
pub const TABLE_MAX_PAGES: usize = 100;

pub struct Pager {
    file: File,
    file_length: u64,
    num_pages: u32,
    // Boxed so moving a Pager around only copies a pointer — the page
    // table itself is ~400KB (100 * PAGE_SIZE) and far too large to carry
    // on the stack through ordinary call frames.
    pages: Box<heapless::Vec<Option<Node>, TABLE_MAX_PAGES>>,
}

impl Pager {
    pub fn open(path: &Path) -> Result<Self, Error> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        let file_length = file.metadata()?.len();
        if file_length % PAGE_SIZE as u64 != 0 {
            return Err(Error::Storage(
                "Db file is not a whole number of pages. Corrupt file.".into(),
            ));
        }
        let num_pages = (file_length / PAGE_SIZE as u64) as u32;

        let mut pages = Box::new(heapless::Vec::new());
        for _ in 0..TABLE_MAX_PAGES {
            // capacity is fixed to TABLE_MAX_PAGES, so this never fails
            let _ = pages.push(None);
        }

        debug!(file_length, num_pages, "pager opened");
        Ok(Pager {
            file,
            file_length,
            num_pages,
            pages,
        })
    }

    pub fn num_pages(&self) -> u32 {
        self.num_pages
    }

    /// Returns the buffer for page `i`, faulting it in from disk if needed.
    pub fn get_page(&mut self, page_num: u32) -> Result<&mut Node, Error> {
        if page_num as usize >= TABLE_MAX_PAGES {
            return Err(Error::Storage(format!(
                "Tried to fetch page number out of bounds. {} >= {}",
                page_num, TABLE_MAX_PAGES
            )));
        }

        if self.pages[page_num as usize].is_none() {
            let mut buf = [0u8; PAGE_SIZE];
            let pages_on_disk = (self.file_length / PAGE_SIZE as u64) as u32;
            if page_num < pages_on_disk {
                self.file
                    .seek(SeekFrom::Start(page_num as u64 * PAGE_SIZE as u64))?;
                self.file.read_exact(&mut buf)?;
            }
            self.pages[page_num as usize] = Some(Node::from_raw(buf));
            if page_num >= self.num_pages {
                self.num_pages = page_num + 1;
            }
        }

        Ok(self.pages[page_num as usize].as_mut().unwrap())
    }

    /// Returns the next free page index. Side-effect-free: the caller must
    /// call `get_page` on the returned index to actually materialize it.
    pub fn allocate_page(&self) -> u32 {
        self.num_pages
    }

    pub fn flush(&mut self, page_num: u32) -> Result<(), Error> {
        match &self.pages[page_num as usize] {
            None => Err(Error::Storage("Tried to flush null page".into())),
            Some(node) => {
                self.file
                    .seek(SeekFrom::Start(page_num as u64 * PAGE_SIZE as u64))?;
                self.file.write_all(node.raw())?;
                Ok(())
            }
        }
    }

    pub fn close(&mut self) -> Result<(), Error> {
        for i in 0..self.num_pages {
            if self.pages[i as usize].is_some() {
                self.flush(i)?;
            } else {
                warn!(page = i, "skipping flush of page never faulted in");
            }
        }
        self.file.sync_all()?;
        Ok(())
    }
}
