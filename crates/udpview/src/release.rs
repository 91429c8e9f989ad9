//! Scoped ownership of a [`VideoSource`] that releases it exactly once.

use std::ops::{Deref, DerefMut};

use crate::video::VideoSource;

/// Owns a [`VideoSource`] and calls [`VideoSource::release`] when dropped.
///
/// Because the release happens in [`Drop`], it runs on every path out of the owning scope: a
/// normal return, an early `break`, a `?`, or a panic unwinding through it.
#[must_use = "`Release` should be assigned to a variable, or the source is released immediately"]
pub struct Release<S: VideoSource> {
    source: S,
}

impl<S: VideoSource> Release<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }
}

impl<S: VideoSource> Deref for Release<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.source
    }
}

impl<S: VideoSource> DerefMut for Release<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.source
    }
}

impl<S: VideoSource> Drop for Release<S> {
    fn drop(&mut self) {
        log::debug!("releasing video source");
        self.source.release();
    }
}

#[cfg(test)]
mod tests {
    use std::{
        cell::Cell,
        panic::{catch_unwind, AssertUnwindSafe},
    };

    use super::*;
    use crate::frame::Frame;

    struct Counting<'a> {
        releases: &'a Cell<u32>,
    }

    impl VideoSource for Counting<'_> {
        fn is_open(&self) -> bool {
            true
        }

        fn read(&mut self, frame: &mut Frame) {
            frame.clear();
        }

        fn release(&mut self) {
            self.releases.set(self.releases.get() + 1);
        }
    }

    #[test]
    fn releases_on_scope_exit() {
        let releases = Cell::new(0);
        {
            let mut source = Release::new(Counting {
                releases: &releases,
            });
            assert!(source.is_open());
            source.read(&mut Frame::new());
            assert_eq!(releases.get(), 0);
        }
        assert_eq!(releases.get(), 1);
    }

    #[test]
    fn releases_during_unwind() {
        let releases = Cell::new(0);
        let result = catch_unwind(AssertUnwindSafe(|| {
            let _source = Release::new(Counting {
                releases: &releases,
            });
            panic!("display went away");
        }));
        assert!(result.is_err());
        assert_eq!(releases.get(), 1);
    }
}
