use anyhow::{bail, Result};
use cask_core::types::TrustId;
use std::env;
use std::ffi::CStr;

/// The principal new equivalence members are stamped with: the
/// `CASK_USER_ID` environment variable when set, otherwise the effective
/// user's name from the password database.
pub fn current_trust_id() -> Result<TrustId> {
    if let Ok(id) = env::var("CASK_USER_ID") {
        if !id.is_empty() {
            return Ok(id);
        }
    }
    let uid = unsafe { libc::geteuid() };
    let pw = unsafe { libc::getpwuid(uid) };
    if pw.is_null() {
        bail!("unknown user ID {uid}");
    }
    let name = unsafe { CStr::from_ptr((*pw).pw_name) };
    Ok(name.to_string_lossy().into_owned())
}
