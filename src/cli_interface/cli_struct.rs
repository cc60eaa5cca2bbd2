use clap::Parser;

#[derive(Parser, Debug, PartialEq)]
#[command(author, version, about, long_about)]
pub enum FlatFsCli {
    /// create a new file system image
    Mkfs(MkfsArgs),
    /// register an image with `FUSE` and mount it
    Mount(MountArgs),
}

/// make a new fs subcommand
#[derive(clap::Args, Debug, PartialEq)]
#[command(author, version, about = "make a new file system image")]
pub struct MkfsArgs {
    /// the path of the file system image file
    #[clap(short = 'p', long)]
    pub image_file_path: String,
    /// the size of the file system in bytes
    #[clap(short, long)]
    pub size: u64,
    /// the inode count of the file system
    #[clap(short, long)]
    pub inode_count: u64,
    /// the block size of the file system
    #[clap(short, long)]
    pub block_size: u32,
}

/// mount a fs subcommand
#[derive(clap::Args, Debug, PartialEq)]
#[command(author, version, about = "mount a file system image")]
pub struct MountArgs {
    /// the path of the file system image file
    #[clap(short = 'p', long)]
    pub image_file_path: String,
    /// the mount point of the file system
    #[clap(short, long)]
    pub mount_point: String,
}

/// test the `mkfs` subcommand arguments
#[cfg(test)]
mod mkfs_parse_args_tests {
    use super::*;
    /// test short parameter form
    #[test]
    fn test_short_parameter_form() {
        let args = FlatFsCli::parse_from([
            "flatfs", "mkfs", "-p", "test", "-s", "1048576", "-i", "1024", "-b", "512",
        ]);
        assert_eq!(
            args,
            FlatFsCli::Mkfs(MkfsArgs {
                image_file_path: "test".to_string(),
                size: 1048576,
                inode_count: 1024,
                block_size: 512,
            })
        );
    }
    /// test long parameter form
    #[test]
    fn test_long_parameter_form() {
        let args = FlatFsCli::parse_from([
            "flatfs",
            "mkfs",
            "--image-file-path",
            "test",
            "--size",
            "1048576",
            "--inode-count",
            "1024",
            "--block-size",
            "512",
        ]);
        assert_eq!(
            args,
            FlatFsCli::Mkfs(MkfsArgs {
                image_file_path: "test".to_string(),
                size: 1048576,
                inode_count: 1024,
                block_size: 512,
            })
        );
    }
}
