use anyhow::{bail, Result};
use std::{ffi::CString, os::unix::ffi::OsStrExt, path::Path};

#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LockMode {
    Read,
    Write,
}

/// An advisory flock on a companion lock file; released on drop.
pub struct PathLock {
    fd: libc::c_int,
    path: CString,
}

impl PathLock {
    pub fn lock<P>(p: P, mode: LockMode) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let p = p.as_ref();
        let path = CString::new(p.as_os_str().as_bytes())?;
        let fd = unsafe {
            libc::open(
                path.as_ptr(),
                libc::O_CLOEXEC | libc::O_RDWR | libc::O_CREAT,
                0o666,
            )
        };
        if fd < 0 {
            bail!("could not open lock file {:?}", p);
        }
        let op = match mode {
            LockMode::Read => libc::LOCK_SH,
            LockMode::Write => libc::LOCK_EX,
        };
        if unsafe { libc::flock(fd, op) } != 0 {
            unsafe { libc::close(fd) };
            bail!("could not lock file {:?}", p);
        }
        Ok(PathLock { fd, path })
    }

    #[allow(clippy::unused_self)]
    #[inline]
    /// unlocks by running the destructor
    pub fn unlock(self) {}
}

impl Drop for PathLock {
    fn drop(&mut self) {
        unsafe {
            libc::unlink(self.path.as_ptr());
            libc::close(self.fd);
        }
    }
}
