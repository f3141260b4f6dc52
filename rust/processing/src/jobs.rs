// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Background jobs on the rayon pool.
//!
//! A presentation layer hands an expensive stage to [`spawn_job`] and polls
//! the returned [`JobHandle`] (or blocks on it) instead of running the stage
//! on its own thread.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, TryRecvError};

use crate::error::{Error, Result};

/// Completion handle of a background job.
#[derive(Debug)]
pub struct JobHandle<T> {
    rx: Receiver<Result<T>>,
}

impl<T> JobHandle<T> {
    /// Block until the job finishes.
    pub fn wait(self) -> Result<T> {
        self.rx.recv().map_err(|_| Error::WorkerLost)?
    }

    /// Take the result if the job has finished; `None` while it is running.
    pub fn try_take(&mut self) -> Option<Result<T>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(Error::WorkerLost)),
        }
    }
}

/// Run `job` on the rayon pool.
///
/// A panicking job reports [`Error::WorkerLost`] instead of taking the pool
/// down.
pub fn spawn_job<T, F>(job: F) -> JobHandle<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    rayon::spawn(move || {
        let result = catch_unwind(AssertUnwindSafe(job)).unwrap_or_else(|_| {
            tracing::error!("Background job panicked");
            Err(Error::WorkerLost)
        });
        // The receiver may have been dropped; nobody is waiting then
        let _ = tx.send(result);
    });
    JobHandle { rx }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_wait_returns_result() {
        let handle = spawn_job(|| Ok((1..=10).sum::<u32>()));
        assert_eq!(handle.wait().unwrap(), 55);
    }

    #[test]
    fn test_error_is_forwarded() {
        let handle: JobHandle<()> = spawn_job(|| Err(Error::InvalidParameter("bad".into())));
        assert!(matches!(handle.wait(), Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn test_try_take_polls() {
        let (gate_tx, gate_rx) = mpsc::channel::<()>();
        let mut handle = spawn_job(move || {
            gate_rx.recv().map_err(|_| Error::WorkerLost)?;
            Ok("done")
        });

        assert!(handle.try_take().is_none());
        gate_tx.send(()).unwrap();

        let mut result = None;
        for _ in 0..500 {
            if let Some(r) = handle.try_take() {
                result = Some(r);
                break;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        assert_eq!(result.unwrap().unwrap(), "done");
    }

    #[test]
    fn test_panic_reports_worker_lost() {
        let handle: JobHandle<u8> = spawn_job(|| panic!("boom"));
        assert!(matches!(handle.wait(), Err(Error::WorkerLost)));
    }
}
