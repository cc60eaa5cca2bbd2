//! register a flatfs image with `FUSE` and mount it
use fuser::MountOption;
use std::path::Path;

use crate::device::ImageStore;
use crate::{FuseBridge, Volume};

/// Mount the image at `mountpoint` and serve requests until unmounted.
///
/// A mount failure is fatal to the caller: the error propagates out of
/// `main` instead of serving an unmounted core.
pub fn mount<P>(image_path: P, mountpoint: P) -> anyhow::Result<()>
where
    P: AsRef<Path>,
{
    let store = ImageStore::open(image_path)?;
    let volume = Volume::mount(store)?;

    let opts = vec![
        MountOption::FSName("flatfs".to_string()),
        MountOption::DefaultPermissions,
    ];

    Ok(fuser::mount2(FuseBridge::new(volume), mountpoint, &opts)?)
}
