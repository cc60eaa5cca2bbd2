use super::FileKind;

/// Stable handle to an arena slot.
///
/// Ids stay valid until the entry is removed; removed slots may be reused
/// by later insertions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DentryId(u32);

/// A named entry in the tree, binding a name to an inode inside a parent
/// directory.
///
/// The parent id is a plain lookup key, never used to free anything; the
/// owning edge runs the other way, from the parent inode's child list.
#[derive(Debug)]
pub struct Dentry {
    pub name: String,
    /// cached inode number; must equal the owned inode's `ino`
    pub ino: u64,
    /// mirrors the inode kind; never changes after creation
    pub kind: FileKind,
    /// absent only for the root
    pub parent: Option<DentryId>,
}

/// Slot arena holding every live dentry of a volume.
#[derive(Debug, Default)]
pub struct DentryArena {
    slots: Vec<Option<Dentry>>,
    free: Vec<u32>,
}

impl DentryArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, dentry: Dentry) -> DentryId {
        match self.free.pop() {
            Some(index) => {
                self.slots[index as usize] = Some(dentry);
                DentryId(index)
            }
            None => {
                self.slots.push(Some(dentry));
                DentryId(self.slots.len() as u32 - 1)
            }
        }
    }

    pub fn get(&self, id: DentryId) -> Option<&Dentry> {
        self.slots.get(id.0 as usize)?.as_ref()
    }

    pub fn get_mut(&mut self, id: DentryId) -> Option<&mut Dentry> {
        self.slots.get_mut(id.0 as usize)?.as_mut()
    }

    pub fn remove(&mut self, id: DentryId) -> Option<Dentry> {
        let slot = self.slots.get_mut(id.0 as usize)?;
        let dentry = slot.take()?;
        self.free.push(id.0);
        Some(dentry)
    }

    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (DentryId, &Dentry)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|d| (DentryId(i as u32), d)))
    }
}
