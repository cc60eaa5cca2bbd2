use clap::Parser;
use flatfs::cli_interface::FlatFsCli;

/// CLI entry: create a flatfs image, or register it with `FUSE` and mount
/// it.
///
/// Mounting blocks until the filesystem is unmounted again.
fn main() -> anyhow::Result<()> {
    env_logger::builder().format_timestamp_nanos().init();
    let args = FlatFsCli::parse();
    match args {
        FlatFsCli::Mkfs(args) => {
            flatfs::mkfs::mkfs(
                args.image_file_path,
                args.size,
                args.inode_count,
                args.block_size,
            )?;
        }
        FlatFsCli::Mount(args) => {
            flatfs::mount::mount(args.image_file_path, args.mount_point)?;
        }
    }
    Ok(())
}
