//! path walk from the root of the dentry tree

use crate::device::BlockStore;

use super::{DentryId, FileKind, Volume};

/// Outcome of resolving a path.
///
/// On a full match `dentry` is the target and `found` is true. Otherwise
/// `dentry` is the deepest entry the walk reached and `unresolved` counts
/// the components left over; creators accept exactly one (the missing
/// leaf) and treat anything deeper as a dead path.
#[derive(Debug, Clone, Copy)]
pub struct Resolution {
    pub dentry: DentryId,
    pub found: bool,
    /// the returned entry is the volume root
    pub is_root: bool,
    pub unresolved: usize,
}

impl<S: BlockStore> Volume<S> {
    /// Walk `path` component by component. Separators collapse ("//a" and
    /// "/a/" resolve like "/a"); no case normalization, no partial name
    /// matches.
    pub fn resolve(&self, path: &str) -> Resolution {
        let components: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();
        let mut current = self.root;

        for (walked, component) in components.iter().enumerate() {
            let stop = |at: DentryId| Resolution {
                dentry: at,
                found: false,
                is_root: at == self.root,
                unresolved: components.len() - walked,
            };

            let is_dir = self
                .arena
                .get(current)
                .map_or(false, |d| d.kind == FileKind::Directory);
            if !is_dir {
                return stop(current);
            }
            match self.lookup_child(current, component) {
                Some(next) => current = next,
                None => return stop(current),
            }
        }

        Resolution {
            dentry: current,
            found: true,
            is_root: current == self.root,
            unresolved: 0,
        }
    }

    /// Linear scan of a directory's children for an exact name match.
    pub(crate) fn lookup_child(&self, dir: DentryId, name: &str) -> Option<DentryId> {
        let ino = self.arena.get(dir)?.ino;
        let children = self.inodes.get(&ino)?.children()?;
        children
            .iter()
            .copied()
            .find(|&child| self.arena.get(child).map_or(false, |d| d.name == name))
    }

    /// Full path of a live entry, for the bridge's reverse lookups.
    pub(crate) fn path_of(&self, id: DentryId) -> String {
        let mut parts = Vec::new();
        let mut current = Some(id);
        while let Some(c) = current {
            match self.arena.get(c) {
                Some(d) if d.parent.is_some() => {
                    parts.push(d.name.as_str());
                    current = d.parent;
                }
                _ => break,
            }
        }
        if parts.is_empty() {
            "/".to_string()
        } else {
            parts.reverse();
            format!("/{}", parts.join("/"))
        }
    }

    /// The dentry naming `ino`. One-to-one because hard links do not
    /// exist in this filesystem.
    pub(crate) fn dentry_by_ino(&self, ino: u64) -> Option<DentryId> {
        self.arena
            .iter()
            .find(|(_, d)| d.ino == ino)
            .map(|(id, _)| id)
    }
}

/// Last component of a path; the root path has no leaf.
pub(crate) fn leaf_name(path: &str) -> Option<&str> {
    path.split('/').filter(|c| !c.is_empty()).next_back()
}
