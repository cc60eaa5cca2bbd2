use serde::{Deserialize, Serialize};

/// an enum to describe the type of an entry
#[derive(Serialize, Deserialize, Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum FileKind {
    /// a regular file
    #[default]
    RegularFile,
    /// a directory
    Directory,
}

impl FileKind {
    pub fn is_dir(self) -> bool {
        self == FileKind::Directory
    }
}

/// implement a trait to convert [FileKind] to [fuser::FileType]
impl From<FileKind> for fuser::FileType {
    fn from(kind: FileKind) -> Self {
        match kind {
            FileKind::RegularFile => fuser::FileType::RegularFile,
            FileKind::Directory => fuser::FileType::Directory,
        }
    }
}
