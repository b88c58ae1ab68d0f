/// Path classification and single-entry removal
///
/// Directory trees are removed with openat/fstatat/unlinkat so that a symlink
/// planted inside a scratch directory is unlinked, never followed.
use crate::config::types::{CleanupError, PathKind, RemovalPolicy, RemovalStrategy, Result};
use nix::errno::Errno;
use std::ffi::{CStr, CString};
use std::fs;
use std::io;
use std::os::fd::RawFd;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

struct FdGuard(RawFd);

impl FdGuard {
    fn as_raw_fd(&self) -> RawFd {
        self.0
    }
}

impl Drop for FdGuard {
    fn drop(&mut self) {
        if self.0 >= 0 {
            unsafe {
                libc::close(self.0);
            }
        }
    }
}

/// Classify `path` without following a final symlink.
///
/// A missing path, a path under a non-directory and a dangling symlink are
/// all `Absent`. Other lookup errors (permission denied) are returned.
pub fn classify(path: &Path) -> io::Result<PathKind> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if is_absent_error(&e) => return Ok(PathKind::Absent),
        Err(e) => return Err(e),
    };

    let file_type = meta.file_type();
    if file_type.is_symlink() {
        return match fs::metadata(path) {
            Ok(_) => Ok(PathKind::Symlink),
            Err(e) if is_absent_error(&e) => Ok(PathKind::Absent),
            Err(e) => Err(e),
        };
    }

    if file_type.is_file() {
        Ok(PathKind::File)
    } else if file_type.is_dir() {
        Ok(PathKind::Directory)
    } else {
        Ok(PathKind::Other)
    }
}

fn is_absent_error(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::NotFound || err.raw_os_error() == Some(libc::ENOTDIR)
}

/// Remove a regular file
pub fn remove_file(path: &Path) -> Result<()> {
    fs::remove_file(path).map_err(|e| {
        CleanupError::Filesystem(format!("Failed to remove file {}: {}", path.display(), e))
    })
}

/// Remove a symlink itself, leaving its target alone
pub fn remove_link(path: &Path) -> Result<()> {
    fs::remove_file(path).map_err(|e| {
        CleanupError::Filesystem(format!("Failed to remove link {}: {}", path.display(), e))
    })
}

/// Remove a directory and everything below it
pub fn remove_tree(path: &Path, policy: RemovalPolicy) -> Result<()> {
    match policy.strategy {
        RemovalStrategy::Standard => fs::remove_dir_all(path).map_err(|e| {
            CleanupError::Filesystem(format!("Failed to remove tree {}: {}", path.display(), e))
        }),
        RemovalStrategy::Secure => remove_tree_secure(path, policy.one_filesystem),
    }
}

/// Open the directory that holds the tree root. Symlinks along this path
/// are resolved like any other lookup; only entries at and below the root
/// are handled with `*at` calls that never follow links.
fn open_parent_dir(path: &Path) -> Result<FdGuard> {
    let path_c = CString::new(path.as_os_str().as_bytes()).map_err(|_| {
        CleanupError::Filesystem(format!(
            "directory path contains a NUL byte: {}",
            path.display()
        ))
    })?;

    let fd = unsafe {
        libc::open(
            path_c.as_ptr(),
            libc::O_RDONLY | libc::O_DIRECTORY | libc::O_CLOEXEC,
        )
    };
    if fd < 0 {
        return Err(CleanupError::Filesystem(format!(
            "open directory failed for {}: {}",
            path.display(),
            io::Error::last_os_error()
        )));
    }

    Ok(FdGuard(fd))
}

fn fstatat_nofollow(parent_fd: RawFd, name: &CStr) -> Result<libc::stat> {
    let mut st = std::mem::MaybeUninit::<libc::stat>::zeroed();
    let rc = unsafe {
        libc::fstatat(
            parent_fd,
            name.as_ptr(),
            st.as_mut_ptr(),
            libc::AT_SYMLINK_NOFOLLOW,
        )
    };
    if rc != 0 {
        return Err(CleanupError::Filesystem(format!(
            "fstatat failed for entry {:?}: {}",
            name,
            io::Error::last_os_error()
        )));
    }

    Ok(unsafe { st.assume_init() })
}

fn unlink_at(parent_fd: RawFd, name: &CStr, flags: libc::c_int) -> Result<()> {
    let rc = unsafe { libc::unlinkat(parent_fd, name.as_ptr(), flags) };
    if rc != 0 {
        return Err(CleanupError::Filesystem(format!(
            "unlinkat failed for entry {:?}: {}",
            name,
            io::Error::last_os_error()
        )));
    }
    Ok(())
}

fn remove_subdir(
    parent_fd: RawFd,
    name: &CStr,
    root_dev: Option<libc::dev_t>,
) -> Result<()> {
    let child_fd = unsafe {
        libc::openat(
            parent_fd,
            name.as_ptr(),
            libc::O_RDONLY | libc::O_DIRECTORY | libc::O_CLOEXEC | libc::O_NOFOLLOW,
        )
    };
    if child_fd < 0 {
        return Err(CleanupError::Filesystem(format!(
            "openat failed for directory {:?}: {}",
            name,
            io::Error::last_os_error()
        )));
    }
    let child = FdGuard(child_fd);

    remove_dir_contents(child.as_raw_fd(), root_dev)?;
    unlink_at(parent_fd, name, libc::AT_REMOVEDIR)
}

/// Collect entry names first so the directory stream is closed before any
/// recursion or unlinking happens.
fn read_entry_names(dir_fd: RawFd) -> Result<Vec<CString>> {
    let iter_fd = unsafe { libc::dup(dir_fd) };
    if iter_fd < 0 {
        return Err(CleanupError::Filesystem(format!(
            "dup for directory iteration failed: {}",
            io::Error::last_os_error()
        )));
    }

    let dir = unsafe { libc::fdopendir(iter_fd) };
    if dir.is_null() {
        let err = io::Error::last_os_error();
        unsafe {
            libc::close(iter_fd);
        }
        return Err(CleanupError::Filesystem(format!("fdopendir failed: {}", err)));
    }

    let mut names = Vec::new();
    let result = loop {
        Errno::clear();
        let entry = unsafe { libc::readdir(dir) };
        if entry.is_null() {
            let errno = Errno::last_raw();
            if errno != 0 {
                break Err(CleanupError::Filesystem(format!(
                    "readdir failed: {}",
                    io::Error::from_raw_os_error(errno)
                )));
            }
            break Ok(());
        }

        let name = unsafe { CStr::from_ptr((*entry).d_name.as_ptr()) };
        let bytes = name.to_bytes();
        if bytes != b"." && bytes != b".." {
            names.push(name.to_owned());
        }
    };

    unsafe {
        libc::closedir(dir);
    }
    result.map(|()| names)
}

fn remove_dir_contents(dir_fd: RawFd, root_dev: Option<libc::dev_t>) -> Result<()> {
    for name in read_entry_names(dir_fd)? {
        let st = fstatat_nofollow(dir_fd, &name)?;

        if st.st_mode & libc::S_IFMT == libc::S_IFDIR {
            if let Some(dev) = root_dev {
                if st.st_dev != dev {
                    return Err(CleanupError::Filesystem(format!(
                        "Refusing to cross filesystem boundary at directory {:?}",
                        name
                    )));
                }
            }
            remove_subdir(dir_fd, &name, root_dev)?;
        } else {
            unlink_at(dir_fd, &name, 0)?;
        }
    }

    Ok(())
}

/// Remove a tree without following symlinks, using openat/fstatat/unlinkat.
/// With `one_filesystem` set, directories on a different device than the
/// root of the tree are left in place and reported as an error.
pub fn remove_tree_secure(path: &Path, one_filesystem: bool) -> Result<()> {
    remove_tree_at(path, one_filesystem).map_err(|e| match e {
        CleanupError::Filesystem(msg) => CleanupError::Filesystem(format!(
            "Failed to remove tree {}: {}",
            path.display(),
            msg
        )),
        other => other,
    })
}

fn remove_tree_at(path: &Path, one_filesystem: bool) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if p.as_os_str().is_empty() => Path::new("."),
        Some(p) => p,
        None => {
            return Err(CleanupError::Filesystem(
                "path has no parent directory".to_string(),
            ))
        }
    };
    let name_os = path.file_name().ok_or_else(|| {
        CleanupError::Filesystem("path has no file name".to_string())
    })?;
    let name_c = CString::new(name_os.as_bytes()).map_err(|_| {
        CleanupError::Filesystem("path contains a NUL byte".to_string())
    })?;

    let parent_fd = open_parent_dir(parent)?;
    let st = fstatat_nofollow(parent_fd.as_raw_fd(), &name_c)?;

    if st.st_mode & libc::S_IFMT == libc::S_IFDIR {
        let root_dev = one_filesystem.then_some(st.st_dev);
        remove_subdir(parent_fd.as_raw_fd(), &name_c, root_dev)
    } else {
        unlink_at(parent_fd.as_raw_fd(), &name_c, 0)
    }
}
