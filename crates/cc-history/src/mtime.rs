//! Millisecond file timestamps
//!
//! Timestamps are milliseconds since the Unix epoch, stored as `i64` so that
//! they can be written to the journal unchanged. A missing or unreadable file
//! reports 0, which every caller treats as "does not exist".

use filetime::FileTime;
use std::fs;
use std::io;
use std::path::Path;

/// Last modification time of `path` in epoch milliseconds, 0 when unavailable
pub fn last_modified(path: &Path) -> i64 {
    match fs::metadata(path) {
        Ok(metadata) => to_millis(FileTime::from_last_modification_time(&metadata)),
        Err(_) => 0,
    }
}

/// Set the modification time of `path` to `millis` epoch milliseconds
pub fn set_last_modified(path: &Path, millis: i64) -> io::Result<()> {
    filetime::set_file_mtime(path, from_millis(millis))
}

fn to_millis(time: FileTime) -> i64 {
    time.unix_seconds() * 1000 + i64::from(time.nanoseconds() / 1_000_000)
}

fn from_millis(millis: i64) -> FileTime {
    let seconds = millis.div_euclid(1000);
    let nanos = (millis.rem_euclid(1000) * 1_000_000) as u32;
    FileTime::from_unix_time(seconds, nanos)
}
