mod io;

use std::sync::{Mutex, MutexGuard};

pub use self::io::{get_stream_pair, StreamReader, StreamWriter};

/// Locks a mutex, recovering the guard if a previous holder panicked
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
