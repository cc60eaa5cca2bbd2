use smallvec::SmallVec;

use super::{DentryId, FileKind, BLOCKS_PER_FILE};

/// Ordered child entries of a directory; insertion order is the order
/// `readdir` reports.
pub type DirEntries = SmallVec<[DentryId; 8]>;

/// A file's fixed block table. Slots are allocated lazily on first write
/// and own their zero-filled buffers outright.
#[derive(Debug, Default)]
pub struct BlockTable {
    slots: [Option<Box<[u8]>>; BLOCKS_PER_FILE],
}

impl BlockTable {
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
        }
    }

    pub fn slot(&self, index: usize) -> Option<&[u8]> {
        self.slots.get(index)?.as_deref()
    }

    pub fn slot_mut(&mut self, index: usize) -> Option<&mut [u8]> {
        self.slots.get_mut(index)?.as_deref_mut()
    }

    pub fn is_allocated(&self, index: usize) -> bool {
        self.slot(index).is_some()
    }

    /// Install a freshly allocated buffer; slot must be within the table.
    pub fn install(&mut self, index: usize, block: Box<[u8]>) {
        self.slots[index] = Some(block);
    }

    pub fn allocated(&self) -> impl Iterator<Item = (usize, &[u8])> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_deref().map(|b| (i, b)))
    }

    pub fn allocated_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
}

/// Directory payloads carry children; file payloads carry the block table.
#[derive(Debug)]
pub enum InodeData {
    File(BlockTable),
    Dir(DirEntries),
}

/// The record owning an entry's content and metadata.
#[derive(Debug)]
pub struct Inode {
    /// unique, stable identifier
    pub ino: u64,
    pub kind: FileKind,
    /// logical size in bytes; always zero for directories
    pub size: u64,
    pub data: InodeData,
}

impl Inode {
    pub fn new(ino: u64, kind: FileKind) -> Self {
        let data = match kind {
            FileKind::RegularFile => InodeData::File(BlockTable::new()),
            FileKind::Directory => InodeData::Dir(DirEntries::new()),
        };
        Inode {
            ino,
            kind,
            size: 0,
            data,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }

    pub fn children(&self) -> Option<&DirEntries> {
        match &self.data {
            InodeData::Dir(children) => Some(children),
            InodeData::File(_) => None,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut DirEntries> {
        match &mut self.data {
            InodeData::Dir(children) => Some(children),
            InodeData::File(_) => None,
        }
    }

    pub fn child_count(&self) -> u64 {
        self.children().map_or(0, |c| c.len() as u64)
    }

    pub fn table(&self) -> Option<&BlockTable> {
        match &self.data {
            InodeData::File(table) => Some(table),
            InodeData::Dir(_) => None,
        }
    }

    pub fn table_mut(&mut self) -> Option<&mut BlockTable> {
        match &mut self.data {
            InodeData::File(table) => Some(table),
            InodeData::Dir(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_slots_start_unallocated() {
        let table = BlockTable::new();
        assert_eq!(table.allocated_count(), 0);
        assert!(!table.is_allocated(0));
        assert!(table.slot(BLOCKS_PER_FILE).is_none());
    }

    #[test]
    fn install_and_enumerate() {
        let mut table = BlockTable::new();
        table.install(3, vec![0u8; 16].into_boxed_slice());
        table.install(7, vec![0u8; 16].into_boxed_slice());
        let allocated: Vec<usize> = table.allocated().map(|(i, _)| i).collect();
        assert_eq!(allocated, vec![3, 7]);
        assert_eq!(table.allocated_count(), 2);
    }

    #[test]
    fn kind_selects_payload() {
        let file = Inode::new(2, FileKind::RegularFile);
        assert!(file.table().is_some());
        assert!(file.children().is_none());

        let dir = Inode::new(3, FileKind::Directory);
        assert!(dir.children().is_some());
        assert!(dir.table().is_none());
        assert_eq!(dir.child_count(), 0);
    }
}
