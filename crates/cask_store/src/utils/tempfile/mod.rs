use rand::distr::Alphanumeric;
use rand::{rng, Rng};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io;

const NUM_RAND_CHARS: usize = 32;
const DOT: char = '.';

fn tmpname() -> OsString {
    (0..=NUM_RAND_CHARS)
        .map(|i| {
            if i == 0 {
                DOT
            } else {
                rng().sample(Alphanumeric) as char
            }
        })
        .collect::<String>()
        .into()
}

/// Open a fresh dot-prefixed staging file inside `p`; the caller renames it
/// into place once the content is complete.
pub async fn tempfile_in<P>(p: P) -> io::Result<(File, PathBuf)>
where
    P: AsRef<Path>,
{
    let path = p.as_ref().join(tmpname());
    let file = OpenOptions::new()
        .mode(0o644)
        .write(true)
        .create_new(true)
        .open(&path)
        .await?;
    Ok((file, path))
}
