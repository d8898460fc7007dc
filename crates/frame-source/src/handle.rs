//! Scoped ownership of a frame source

use std::ops::{Deref, DerefMut};
use tracing::debug;

use crate::FrameSource;

/// Holds a source for the length of a run and releases it on drop
pub struct SourceHandle<S: FrameSource> {
    source: S,
    released: bool,
}

impl<S: FrameSource> SourceHandle<S> {
    /// Take ownership of an opened source
    pub fn acquire(source: S) -> Self {
        debug!("Acquired source {}", source.name());
        Self {
            source,
            released: false,
        }
    }

    /// Release early. Dropping the handle afterwards is a no-op.
    pub fn release(&mut self) {
        if !self.released {
            self.source.release();
            self.released = true;
            debug!("Released source {}", self.source.name());
        }
    }
}

impl<S: FrameSource> Deref for SourceHandle<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.source
    }
}

impl<S: FrameSource> DerefMut for SourceHandle<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.source
    }
}

impl<S: FrameSource> Drop for SourceHandle<S> {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FrameEvent, SourceError};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingSource {
        releases: Arc<AtomicUsize>,
    }

    impl FrameSource for CountingSource {
        fn next_frame(&mut self) -> Result<FrameEvent, SourceError> {
            Ok(FrameEvent::EndOfStream)
        }

        fn release(&mut self) {
            self.releases.fetch_add(1, Ordering::SeqCst);
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    #[test]
    fn test_release_on_drop() {
        let releases = Arc::new(AtomicUsize::new(0));
        {
            let _handle = SourceHandle::acquire(CountingSource {
                releases: releases.clone(),
            });
        }
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_explicit_release_is_not_repeated() {
        let releases = Arc::new(AtomicUsize::new(0));
        let mut handle = SourceHandle::acquire(CountingSource {
            releases: releases.clone(),
        });
        handle.release();
        handle.release();
        drop(handle);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }
}
