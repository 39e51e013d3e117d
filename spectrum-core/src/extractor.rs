//! # Sample Extraction Module
//!
//! Copies float32 samples out of a capture buffer. The buffer is only
//! borrowed for the duration of the copy: a [`BufferLock`] is taken, the
//! bytes are reinterpreted as native-endian `f32`, and the lock is released
//! when it goes out of scope, whatever path the copy takes.

use std::ops::Deref;

use log::warn;

use crate::error::Result;

/// Size in bytes of one captured sample.
pub const BYTES_PER_SAMPLE: usize = std::mem::size_of::<f32>();

/// A capture buffer that can be mapped for reading.
///
/// Implementors backed by native memory acquire whatever lock the platform
/// requires in `lock_for_read` and hand back a [`BufferLock`] whose release
/// hook undoes it.
pub trait CaptureBuffer {
    /// Maps the buffer for reading, or fails with
    /// [`SpectrumError::BufferAccess`](crate::SpectrumError::BufferAccess).
    fn lock_for_read(&self) -> Result<BufferLock<'_>>;
}

/// Scoped read access to the raw bytes of a capture buffer.
pub struct BufferLock<'a> {
    bytes: &'a [u8],
    release: Option<Box<dyn FnOnce() + 'a>>,
}

impl<'a> BufferLock<'a> {
    /// A lock over memory that needs no explicit release.
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, release: None }
    }

    /// A lock that runs `release` exactly once when dropped.
    pub fn with_release(bytes: &'a [u8], release: impl FnOnce() + 'a) -> Self {
        Self {
            bytes,
            release: Some(Box::new(release)),
        }
    }
}

impl Deref for BufferLock<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.bytes
    }
}

impl Drop for BufferLock<'_> {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl CaptureBuffer for [u8] {
    fn lock_for_read(&self) -> Result<BufferLock<'_>> {
        Ok(BufferLock::new(self))
    }
}

impl CaptureBuffer for Vec<u8> {
    fn lock_for_read(&self) -> Result<BufferLock<'_>> {
        Ok(BufferLock::new(self.as_slice()))
    }
}

/// Copies every sample out of `buffer`.
///
/// The lock is held only while the bytes are copied.
pub fn extract_samples<B: CaptureBuffer + ?Sized>(buffer: &B) -> Result<Vec<f32>> {
    let lock = buffer.lock_for_read()?;
    Ok(samples_from_bytes(&lock))
}

/// Reinterprets native-endian bytes as `f32` samples.
///
/// The slice does not need to be aligned. A trailing partial sample is
/// ignored.
pub fn samples_from_bytes(bytes: &[u8]) -> Vec<f32> {
    let chunks = bytes.chunks_exact(BYTES_PER_SAMPLE);
    if !chunks.remainder().is_empty() {
        warn!(
            "[EXTRACT] Ignoring {} trailing byte(s) of a {}-byte capture buffer",
            chunks.remainder().len(),
            bytes.len()
        );
    }
    chunks.map(bytemuck::pod_read_unaligned::<f32>).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SpectrumError;
    use std::cell::Cell;

    /// Stand-in for a platform buffer that tracks lock/unlock calls.
    struct MappedBuffer {
        bytes: Vec<u8>,
        lockable: bool,
        releases: Cell<u32>,
    }

    impl CaptureBuffer for MappedBuffer {
        fn lock_for_read(&self) -> Result<BufferLock<'_>> {
            if !self.lockable {
                return Err(SpectrumError::BufferAccess("buffer is busy".into()));
            }
            Ok(BufferLock::with_release(&self.bytes, || {
                self.releases.set(self.releases.get() + 1)
            }))
        }
    }

    fn to_bytes(samples: &[f32]) -> Vec<u8> {
        bytemuck::cast_slice(samples).to_vec()
    }

    #[test]
    fn reads_native_endian_floats() {
        let samples = [0.0f32, 1.5, -0.25, 3.0e-3];
        assert_eq!(extract_samples(&to_bytes(&samples)).unwrap(), samples);
    }

    #[test]
    fn handles_unaligned_slices() {
        let mut bytes = vec![0u8];
        bytes.extend(to_bytes(&[0.5, -0.5]));
        assert_eq!(samples_from_bytes(&bytes[1..]), vec![0.5, -0.5]);
    }

    #[test]
    fn drops_trailing_partial_sample() {
        let mut bytes = to_bytes(&[1.0, 2.0]);
        bytes.extend([0xAB, 0xCD]);
        assert_eq!(samples_from_bytes(&bytes), vec![1.0, 2.0]);
    }

    #[test]
    fn empty_buffer_yields_no_samples() {
        assert!(extract_samples(&Vec::<u8>::new()).unwrap().is_empty());
    }

    #[test]
    fn lock_is_released_after_copy() {
        let buffer = MappedBuffer {
            bytes: to_bytes(&[0.1, 0.2, 0.3]),
            lockable: true,
            releases: Cell::new(0),
        };
        let samples = extract_samples(&buffer).unwrap();
        assert_eq!(samples.len(), 3);
        assert_eq!(buffer.releases.get(), 1);
    }

    #[test]
    fn lock_failure_is_a_buffer_access_error() {
        let buffer = MappedBuffer {
            bytes: to_bytes(&[0.1]),
            lockable: false,
            releases: Cell::new(0),
        };
        assert!(matches!(
            extract_samples(&buffer),
            Err(SpectrumError::BufferAccess(_))
        ));
        assert_eq!(buffer.releases.get(), 0);
    }
}
