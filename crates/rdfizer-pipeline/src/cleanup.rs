//! Ownership-gated removal of scratch state.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use rdfizer_core::{shell_quote, ErrorInfo, ExecContext, RdfizerError};
use tracing::{info, warn};

use crate::container::{ContainerRuntime, Mount};

fn cleanup_error(code: &str, message: impl Into<String>, path: &Path) -> RdfizerError {
    RdfizerError::Cleanup(
        ErrorInfo::new(code, message).with_context("path", path.display().to_string()),
    )
}

/// Scratch directory whose removal depends on whether this run created it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScratchDir {
    path: PathBuf,
    pre_existed: bool,
}

/// What [`ScratchDir::finish`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScratchOutcome {
    /// Deleted, or already gone.
    Removed,
    /// Retention was requested.
    Kept,
    /// The directory was there before the run and is never removed.
    PreExisting,
    /// Deletion failed; the directory is left behind and the run goes on.
    RemovalFailed,
}

impl ScratchDir {
    /// Records whether `path` exists, then creates it.
    pub fn track(path: impl Into<PathBuf>) -> Result<Self, RdfizerError> {
        let path = path.into();
        let pre_existed = path.exists();
        fs::create_dir_all(&path)
            .map_err(|err| cleanup_error("scratch_create", err.to_string(), &path))?;
        Ok(Self { path, pre_existed })
    }

    /// Like [`ScratchDir::track`] but empties the directory first.
    pub fn track_fresh(path: impl Into<PathBuf>) -> Result<Self, RdfizerError> {
        let path = path.into();
        let pre_existed = path.exists();
        if pre_existed {
            fs::remove_dir_all(&path)
                .map_err(|err| cleanup_error("scratch_reset", err.to_string(), &path))?;
        }
        fs::create_dir_all(&path)
            .map_err(|err| cleanup_error("scratch_create", err.to_string(), &path))?;
        Ok(Self { path, pre_existed })
    }

    /// Tracked directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True when the directory was there before [`ScratchDir::track`].
    pub fn pre_existed(&self) -> bool {
        self.pre_existed
    }

    /// Removes the directory only when this run created it and `keep` is false.
    pub fn finish(self, keep: bool) -> ScratchOutcome {
        if keep {
            return ScratchOutcome::Kept;
        }
        if self.pre_existed {
            info!(dir = %self.path.display(), "directory existed before the run; skipping cleanup");
            return ScratchOutcome::PreExisting;
        }
        match fs::remove_dir_all(&self.path) {
            Ok(()) => ScratchOutcome::Removed,
            Err(err) if err.kind() == io::ErrorKind::NotFound => ScratchOutcome::Removed,
            Err(err) => {
                warn!(dir = %self.path.display(), %err, "could not remove scratch directory");
                ScratchOutcome::RemovalFailed
            }
        }
    }
}

/// Host directory and the container path it is mounted at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MountScope<'a> {
    /// Host directory.
    pub root: &'a Path,
    /// Where `root` appears inside the container.
    pub mount_point: &'a str,
}

/// How a file ended up gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// Nothing to remove.
    AlreadyAbsent,
    /// Host `remove_file` succeeded.
    Direct,
    /// Host delete was refused; `rm -f` ran in the container.
    ViaContainer,
}

/// Container path of `path` under `scope`; anything outside the root,
/// including `..` escapes, is rejected.
pub fn container_path_in_scope(path: &Path, scope: MountScope<'_>) -> Result<String, RdfizerError> {
    let outside = || {
        cleanup_error(
            "outside_mount_root",
            format!("cannot remove file outside mounted root: {}", path.display()),
            path,
        )
    };
    let relative = path.strip_prefix(scope.root).map_err(|_| outside())?;
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::CurDir => {}
            _ => return Err(outside()),
        }
    }
    if parts.is_empty() {
        return Err(outside());
    }
    Ok(format!(
        "{}/{}",
        scope.mount_point.trim_end_matches('/'),
        parts.join("/")
    ))
}

/// Deletes `path` through the container with `rm -f`.
pub fn remove_via_container(
    ctx: &mut ExecContext<'_>,
    runtime: &ContainerRuntime,
    path: &Path,
    scope: MountScope<'_>,
) -> Result<(), RdfizerError> {
    let container_path = container_path_in_scope(path, scope)?;
    let mounts = [Mount::read_write(scope.root, scope.mount_point)];
    let script = format!("rm -f {}", shell_quote(&container_path));
    let outcome = ctx.run(&runtime.shell_command(&mounts, &script))?;
    if outcome.success() {
        return Ok(());
    }
    Err(RdfizerError::Cleanup(
        ErrorInfo::new(
            "fallback_removal_failed",
            format!("failed to remove file with Docker fallback: {}", path.display()),
        )
        .with_context("path", path.display().to_string())
        .with_context("exit_code", outcome.exit_code.to_string())
        .with_hint(format!("see log for details: {}", ctx.log_label())),
    ))
}

/// Removes `path`, retrying inside the container when the host delete is
/// refused for permissions.
pub fn remove_file_with_fallback(
    ctx: &mut ExecContext<'_>,
    runtime: &ContainerRuntime,
    path: &Path,
    scope: MountScope<'_>,
) -> Result<Removal, RdfizerError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(Removal::Direct),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Removal::AlreadyAbsent),
        Err(err) if err.kind() == io::ErrorKind::PermissionDenied => {
            warn!(path = %path.display(), "permission denied; removing through the container");
            remove_via_container(ctx, runtime, path, scope)?;
            Ok(Removal::ViaContainer)
        }
        Err(err) => Err(cleanup_error("remove_file", err.to_string(), path)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope(root: &Path) -> MountScope<'_> {
        MountScope {
            root,
            mount_point: "/data/out",
        }
    }

    #[test]
    fn paths_inside_root_map_to_mount() {
        let root = Path::new("/host/out");
        let mapped = container_path_in_scope(Path::new("/host/out/s/s.nt"), scope(root)).unwrap();
        assert_eq!(mapped, "/data/out/s/s.nt");
    }

    #[test]
    fn failed_scratch_removal_is_reported_not_raised() {
        let dir = tempfile::tempdir().unwrap();
        let scratch_path = dir.path().join("scratch");
        let scratch = ScratchDir::track(&scratch_path).unwrap();
        assert!(!scratch.pre_existed());

        // A plain file where the directory was makes remove_dir_all fail.
        fs::remove_dir(&scratch_path).unwrap();
        fs::write(&scratch_path, b"not a directory").unwrap();

        assert_eq!(scratch.finish(false), ScratchOutcome::RemovalFailed);
        assert!(scratch_path.is_file());
    }

    #[test]
    fn paths_outside_root_are_rejected() {
        let root = Path::new("/host/out");
        for candidate in ["/host/other/s.nt", "/host/out/../etc/passwd", "/host/out"] {
            let err = container_path_in_scope(Path::new(candidate), scope(root)).unwrap_err();
            assert_eq!(err.info().code, "outside_mount_root", "{candidate}");
        }
    }
}
