mod common;

use common::fresh_volume;
use flatfs::{FileKind, FilesystemOps, FsError, Target};

#[test]
fn mkdir_then_getattr() {
    let (mut fs, _) = fresh_volume();
    fs.mkdir("/docs").unwrap();

    let attrs = fs.getattr("/docs").unwrap();
    assert_eq!(attrs.kind, FileKind::Directory);
    assert_eq!(attrs.child_count, 0);
    assert!(!attrs.is_root);

    let root = fs.getattr("/").unwrap();
    assert_eq!(root.child_count, 1);
    assert!(root.is_root);
}

#[test]
fn mkdir_twice_fails() {
    let (mut fs, _) = fresh_volume();
    fs.mkdir("/a").unwrap();
    assert_eq!(fs.mkdir("/a"), Err(FsError::AlreadyExists));
}

#[test]
fn mknod_twice_fails() {
    let (mut fs, _) = fresh_volume();
    fs.mknod("/a.txt", FileKind::RegularFile).unwrap();
    assert_eq!(
        fs.mknod("/a.txt", FileKind::RegularFile),
        Err(FsError::AlreadyExists)
    );
}

#[test]
fn nested_creation_and_lookup() {
    let (mut fs, _) = fresh_volume();
    fs.mkdir("/a").unwrap();
    fs.mkdir("/a/b").unwrap();
    fs.mknod("/a/b/c.txt", FileKind::RegularFile).unwrap();

    let attrs = fs.getattr("/a/b/c.txt").unwrap();
    assert_eq!(attrs.kind, FileKind::RegularFile);
    assert_eq!(attrs.size, 0);

    // separators collapse
    assert!(fs.getattr("//a///b/").is_ok());
    assert_eq!(fs.getattr("/a/b/missing"), Err(FsError::NotFound));
}

#[test]
fn creation_through_missing_intermediate_fails() {
    let (mut fs, _) = fresh_volume();
    assert_eq!(fs.mkdir("/no/such/parent"), Err(FsError::NotFound));
    assert_eq!(
        fs.mknod("/no/file.txt", FileKind::RegularFile),
        Err(FsError::NotFound)
    );
}

#[test]
fn creation_through_a_file_fails() {
    let (mut fs, _) = fresh_volume();
    fs.mknod("/plain", FileKind::RegularFile).unwrap();
    assert_eq!(fs.mkdir("/plain/sub"), Err(FsError::Unsupported));
    assert_eq!(
        fs.mknod("/plain/sub.txt", FileKind::RegularFile),
        Err(FsError::Unsupported)
    );
}

#[test]
fn unlink_removes_files_only() {
    let (mut fs, _) = fresh_volume();
    fs.mknod("/f", FileKind::RegularFile).unwrap();
    fs.mkdir("/d").unwrap();

    assert_eq!(fs.unlink("/d"), Err(FsError::IsDirectory));
    assert_eq!(fs.unlink("/missing"), Err(FsError::NotFound));

    fs.unlink("/f").unwrap();
    assert_eq!(fs.getattr("/f"), Err(FsError::NotFound));
    // the freed name is immediately reusable
    fs.mknod("/f", FileKind::RegularFile).unwrap();
}

#[test]
fn rmdir_requires_an_empty_directory() {
    let (mut fs, _) = fresh_volume();
    fs.mkdir("/d").unwrap();
    fs.mknod("/d/child", FileKind::RegularFile).unwrap();

    assert_eq!(fs.rmdir("/d"), Err(FsError::NotEmpty));
    fs.unlink("/d/child").unwrap();
    fs.rmdir("/d").unwrap();
    assert_eq!(fs.getattr("/d"), Err(FsError::NotFound));
}

#[test]
fn rmdir_on_a_file_fails() {
    let (mut fs, _) = fresh_volume();
    fs.mknod("/f", FileKind::RegularFile).unwrap();
    assert_eq!(fs.rmdir("/f"), Err(FsError::NotDirectory));
}

#[test]
fn the_root_cannot_be_removed() {
    let (mut fs, _) = fresh_volume();
    assert_eq!(fs.unlink("/"), Err(FsError::Invalid));
    assert_eq!(fs.rmdir("/"), Err(FsError::Invalid));
}

#[test]
fn readdir_walks_children_in_creation_order() {
    let (mut fs, _) = fresh_volume();
    fs.mkdir("/dir").unwrap();
    for name in ["zebra", "alpha", "mango"] {
        fs.mknod(&format!("/dir/{name}"), FileKind::RegularFile)
            .unwrap();
    }

    let mut seen = Vec::new();
    let mut index = 0;
    while let Some(name) = fs.read_entry("/dir", index).unwrap() {
        seen.push(name);
        index += 1;
    }
    assert_eq!(seen, ["zebra", "alpha", "mango"]);

    assert_eq!(fs.read_entry("/dir", 99).unwrap(), None);
    assert_eq!(fs.read_entry("/nope", 0), Err(FsError::NotFound));
}

#[test]
fn rename_moves_content_and_frees_the_source() {
    let (mut fs, _) = fresh_volume();
    fs.mknod("/a", FileKind::RegularFile).unwrap();
    fs.write(Target::Path("/a"), b"hi", 0).unwrap();

    fs.rename("/a", "/b").unwrap();

    assert_eq!(fs.getattr("/a"), Err(FsError::NotFound));
    let back = fs.read(Target::Path("/b"), 2, 0).unwrap();
    assert_eq!(back, b"hi");
}

#[test]
fn rename_keeps_the_inode_number() {
    let (mut fs, _) = fresh_volume();
    fs.mknod("/a", FileKind::RegularFile).unwrap();
    let before = fs.getattr("/a").unwrap().ino;
    fs.rename("/a", "/b").unwrap();
    assert_eq!(fs.getattr("/b").unwrap().ino, before);
}

#[test]
fn rename_onto_an_existing_target_fails() {
    let (mut fs, _) = fresh_volume();
    fs.mknod("/a", FileKind::RegularFile).unwrap();
    fs.mknod("/b", FileKind::RegularFile).unwrap();
    assert_eq!(fs.rename("/a", "/b"), Err(FsError::AlreadyExists));
    // both entries survive the refusal
    assert!(fs.getattr("/a").is_ok());
    assert!(fs.getattr("/b").is_ok());
}

#[test]
fn rename_of_a_missing_source_fails() {
    let (mut fs, _) = fresh_volume();
    assert_eq!(fs.rename("/ghost", "/b"), Err(FsError::NotFound));
}

#[test]
fn rename_to_itself_is_a_no_op() {
    let (mut fs, _) = fresh_volume();
    fs.mknod("/a", FileKind::RegularFile).unwrap();
    fs.rename("/a", "/a").unwrap();
    assert!(fs.getattr("/a").is_ok());
}

#[test]
fn renamed_directory_keeps_a_working_subtree() {
    let (mut fs, _) = fresh_volume();
    fs.mkdir("/old").unwrap();
    fs.mknod("/old/inner", FileKind::RegularFile).unwrap();

    fs.rename("/old", "/new").unwrap();

    assert_eq!(fs.getattr("/old"), Err(FsError::NotFound));
    assert!(fs.getattr("/new/inner").is_ok());
    // the moved child can still be unlinked through its new parent
    fs.unlink("/new/inner").unwrap();
    fs.rmdir("/new").unwrap();
}

#[test]
fn access_is_an_existence_check() {
    let (mut fs, _) = fresh_volume();
    fs.mknod("/here", FileKind::RegularFile).unwrap();
    assert!(fs.check_access("/here").is_ok());
    assert!(fs.check_access("/").is_ok());
    assert_eq!(fs.check_access("/gone"), Err(FsError::NotFound));
}

#[test]
fn handles_survive_until_release() {
    let (mut fs, _) = fresh_volume();
    fs.mknod("/f", FileKind::RegularFile).unwrap();

    let fh = fs.open("/f").unwrap();
    fs.write(Target::Handle(fh), b"via handle", 0).unwrap();
    let back = fs.read(Target::Handle(fh), 10, 0).unwrap();
    assert_eq!(back, b"via handle");

    fs.release(fh);
    assert_eq!(
        fs.read(Target::Handle(fh), 10, 0),
        Err(FsError::NotFound)
    );
    // the path keeps working regardless
    assert!(fs.read(Target::Path("/f"), 10, 0).is_ok());
}

#[test]
fn open_directory_rejects_files() {
    let (mut fs, _) = fresh_volume();
    fs.mknod("/f", FileKind::RegularFile).unwrap();
    assert_eq!(fs.open_directory("/f"), Err(FsError::NotDirectory));
    assert!(fs.open_directory("/").is_ok());
    assert_eq!(fs.open("/missing"), Err(FsError::NotFound));
}

#[test]
fn root_size_reports_volume_usage() {
    let (mut fs, _) = fresh_volume();
    assert_eq!(fs.getattr("/").unwrap().size, 0);

    fs.mknod("/f", FileKind::RegularFile).unwrap();
    fs.write(Target::Path("/f"), &[1u8; 100], 0).unwrap();
    let used = fs.getattr("/").unwrap().size;
    assert_eq!(used, common::BLOCK_SIZE as u64);

    fs.unlink("/f").unwrap();
    assert_eq!(fs.getattr("/").unwrap().size, 0);
}

#[test]
fn over_long_names_are_rejected() {
    let (mut fs, _) = fresh_volume();
    let name = "x".repeat(flatfs::MAX_NAME_LEN + 1);
    assert_eq!(fs.mkdir(&format!("/{name}")), Err(FsError::Invalid));
}
