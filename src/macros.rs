#![allow(unused_macros)]

/// Helper macro for locking items
///
/// ```rust, ignore
///  let mut failures = lock!(self.failures);
///  failures.push(failure);
/// ```
macro_rules! lock {
    ($lock:expr) => {
        $lock.lock().expect("Failed to acquire lock")
    };
}

/// Helper macro for consuming a locked collection once all worker tasks are done
///
/// ```rust, ignore
///  let failures = into_inner!(failures)?;
/// ```
macro_rules! into_inner {
    ($lock:expr) => {
        $lock.into_inner().map_err(|_| crate::Error::LockError)
    };
}
