//! Lazily created HTTP transport handle.

use crate::Result;
use std::sync::{PoisonError, RwLock};

/// Holds at most one transport handle.
///
/// The handle is built on first use. Closing drops it; the next use builds a
/// fresh one rather than resetting the old handle.
pub(crate) struct TransportSlot<T> {
    handle: RwLock<Option<T>>,
}

impl<T: Clone> TransportSlot<T> {
    pub fn empty() -> Self {
        Self {
            handle: RwLock::new(None),
        }
    }

    /// Returns the current handle, building one with `open` if there is none.
    pub fn get_or_open(&self, open: impl FnOnce() -> Result<T>) -> Result<T> {
        if let Some(handle) = self
            .handle
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            return Ok(handle.clone());
        }

        let mut slot = self.handle.write().unwrap_or_else(PoisonError::into_inner);
        match slot.as_ref() {
            Some(handle) => Ok(handle.clone()),
            None => {
                let handle = open()?;
                *slot = Some(handle.clone());
                Ok(handle)
            }
        }
    }

    /// Drops the current handle. Returns `false` if there was none.
    pub fn close(&self) -> bool {
        let previous = self
            .handle
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        previous.is_some()
    }

    pub fn is_open(&self) -> bool {
        self.handle
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}
