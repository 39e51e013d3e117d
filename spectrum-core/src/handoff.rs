//! # Spectrum Handoff Module
//!
//! The one piece of state shared between the capture thread (producer) and
//! the display timer (consumer).
//!
//! The consumer clears a `ready` flag before it reads and sets it again when
//! the read is over; while the flag is clear the producer drops its result
//! instead of publishing. Publishing swaps a whole [`PublishedSpectrum`] in
//! one go, so a reader only ever sees a complete spectrum. The producer never
//! waits: if the slot is contended it drops the quantum.

use std::ops::Deref;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, TryLockError};

use crate::config::DisplayGeometry;
use crate::display::{map_to_display, DisplayPoint};

/// The unit that is swapped into the handle on every publish.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PublishedSpectrum {
    /// Post-processed magnitudes.
    pub magnitudes: Vec<f32>,
    /// Size exponent of the window the magnitudes came from.
    pub log2_len: u32,
    /// Sample rate of the quantum, in Hz.
    pub sample_rate: f32,
    /// Publish counter; 0 is the initial empty spectrum.
    pub sequence: u64,
}

impl PublishedSpectrum {
    pub fn is_empty(&self) -> bool {
        self.magnitudes.is_empty()
    }

    /// Maps the magnitudes to screen space.
    pub fn display_series(&self, geometry: &DisplayGeometry) -> Vec<DisplayPoint> {
        map_to_display(&self.magnitudes, self.log2_len, geometry)
    }
}

struct Shared {
    ready: AtomicBool,
    slot: Mutex<Arc<PublishedSpectrum>>,
}

/// Cloneable handle to the last published spectrum.
#[derive(Clone)]
pub struct SpectrumHandle {
    shared: Arc<Shared>,
}

impl SpectrumHandle {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                ready: AtomicBool::new(true),
                slot: Mutex::new(Arc::new(PublishedSpectrum::default())),
            }),
        }
    }

    /// Whether no read is currently in progress.
    pub fn is_ready(&self) -> bool {
        self.shared.ready.load(Ordering::Acquire)
    }

    /// Replaces the published spectrum, unless a read is in progress.
    ///
    /// Returns `false` when the spectrum was dropped. Never blocks.
    pub fn publish(&self, magnitudes: Vec<f32>, log2_len: u32, sample_rate: f32) -> bool {
        if !self.is_ready() {
            return false;
        }

        let mut slot = match self.shared.slot.try_lock() {
            Ok(slot) => slot,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => return false,
        };

        let sequence = slot.sequence + 1;
        *slot = Arc::new(PublishedSpectrum {
            magnitudes,
            log2_len,
            sample_rate,
            sequence,
        });
        true
    }

    /// The last published spectrum, without touching the ready flag.
    pub fn snapshot(&self) -> Arc<PublishedSpectrum> {
        self.shared
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Starts a read: publishing is suspended until the guard is dropped.
    pub fn begin_read(&self) -> SpectrumReadGuard<'_> {
        self.shared.ready.store(false, Ordering::Release);
        SpectrumReadGuard {
            handle: self,
            snapshot: self.snapshot(),
        }
    }

    /// Builds the display series for the current spectrum.
    pub fn current_display_series(&self, geometry: &DisplayGeometry) -> Vec<DisplayPoint> {
        self.begin_read().display_series(geometry)
    }
}

impl Default for SpectrumHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// An in-progress read. Dropping it lets the producer publish again.
pub struct SpectrumReadGuard<'a> {
    handle: &'a SpectrumHandle,
    snapshot: Arc<PublishedSpectrum>,
}

impl Deref for SpectrumReadGuard<'_> {
    type Target = PublishedSpectrum;

    fn deref(&self) -> &PublishedSpectrum {
        &self.snapshot
    }
}

impl Drop for SpectrumReadGuard<'_> {
    fn drop(&mut self) {
        self.handle.shared.ready.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty_and_ready() {
        let handle = SpectrumHandle::new();
        assert!(handle.is_ready());
        let snapshot = handle.snapshot();
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.sequence, 0);
    }

    #[test]
    fn publish_replaces_wholesale() {
        let handle = SpectrumHandle::new();
        assert!(handle.publish(vec![1.0, 2.0, 3.0], 3, 48_000.0));
        assert!(handle.publish(vec![4.0], 1, 44_100.0));
        let snapshot = handle.snapshot();
        assert_eq!(snapshot.magnitudes, vec![4.0]);
        assert_eq!(snapshot.log2_len, 1);
        assert_eq!(snapshot.sample_rate, 44_100.0);
        assert_eq!(snapshot.sequence, 2);
    }

    #[test]
    fn publishes_during_read_are_dropped() {
        let handle = SpectrumHandle::new();
        handle.publish(vec![1.0; 4], 3, 48_000.0);

        {
            let read = handle.begin_read();
            assert!(!handle.is_ready());
            for i in 0..100 {
                assert!(!handle.publish(vec![i as f32; 8], 4, 48_000.0));
            }
            assert_eq!(read.magnitudes, vec![1.0; 4]);
            assert_eq!(handle.snapshot().magnitudes, vec![1.0; 4]);
        }

        assert!(handle.is_ready());
        assert!(handle.publish(vec![9.0; 2], 2, 48_000.0));
        assert_eq!(handle.begin_read().magnitudes, vec![9.0; 2]);
    }

    #[test]
    fn display_series_releases_the_read() {
        let handle = SpectrumHandle::new();
        handle.publish(vec![0.0; 3], 3, 48_000.0);
        assert_eq!(handle.current_display_series(&DisplayGeometry::default()).len(), 3);
        assert!(handle.is_ready());
    }

    #[test]
    fn clones_share_the_slot() {
        let producer = SpectrumHandle::new();
        let consumer = producer.clone();
        producer.publish(vec![0.5], 1, 8_000.0);
        assert_eq!(consumer.snapshot().magnitudes, vec![0.5]);
    }
}
