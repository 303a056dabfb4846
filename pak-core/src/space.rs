//! Free-space probing for the extraction preflight check.

use std::path::{Path, PathBuf};

use sysinfo::Disks;

use crate::error::Result;

pub trait SpaceProbe {
    /// Free bytes on the volume that holds `path`.
    fn free_bytes(&self, path: &Path) -> Result<u64>;
}

/// Probe backed by the OS disk list. The queried path does not have to
/// exist yet; the nearest existing ancestor decides the volume.
#[derive(Debug, Default)]
pub struct DiskProbe;

impl SpaceProbe for DiskProbe {
    fn free_bytes(&self, path: &Path) -> Result<u64> {
        let target = existing_ancestor(path)?;

        let disks = Disks::new_with_refreshed_list();
        let mut best: Option<(usize, u64)> = None;
        for disk in disks.list() {
            let mount = disk.mount_point();
            if target.starts_with(mount) {
                let depth = mount.components().count();
                if best.is_none_or(|(d, _)| depth >= d) {
                    best = Some((depth, disk.available_space()));
                }
            }
        }

        best.map(|(_, free)| free).ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no volume found for {}", target.display()),
            )
            .into()
        })
    }
}

fn existing_ancestor(path: &Path) -> Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    for candidate in absolute.ancestors() {
        if candidate.exists() {
            return Ok(candidate.canonicalize()?);
        }
    }
    Ok(PathBuf::from("/"))
}
