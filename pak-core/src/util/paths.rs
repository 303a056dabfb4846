use std::path::{Component, Path, PathBuf};

/// Lexically normalize a path: resolve `.` and `..` components without
/// touching the filesystem. Leading `..` components that cannot be popped
/// are kept, matching `Path::normalize` semantics of the original format's
/// mount points (which routinely start with `../../..`).
pub fn normalize(path: &Path) -> PathBuf {
    let mut out: Vec<Component> = Vec::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                _ => out.push(comp),
            },
            other => out.push(other),
        }
    }
    out.iter().collect()
}

/// Render a path in container form: forward slashes, no platform quirks.
pub fn to_pak_path(path: &Path) -> String {
    let s = path.to_string_lossy();
    if s.contains('\\') {
        s.replace('\\', "/")
    } else {
        s.into_owned()
    }
}
