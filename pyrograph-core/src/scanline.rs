//! Scanline buffer
//!
//! Holds one row of per-pixel laser intensities. The protocol layer fills
//! it completely before a raster move starts; the step ISR reads it
//! element-wise during the move. It is never written while a move is in
//! progress.

use heapless::Vec;

/// Maximum supported scanline width in pixels
pub const SCANLINE_CAPACITY: usize = 1024;

/// A line longer than [`SCANLINE_CAPACITY`] was offered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CapacityError;

/// Fixed-capacity buffer of one scanline's intensities
#[derive(Debug, Clone, Default)]
pub struct ScanlineBuffer {
    data: Vec<u8, SCANLINE_CAPACITY>,
}

impl ScanlineBuffer {
    /// Create an empty buffer
    pub const fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// Replace the buffer contents with one scanline
    pub fn load(&mut self, pixels: &[u8]) -> Result<(), CapacityError> {
        self.data.clear();
        self.data.extend_from_slice(pixels).map_err(|_| CapacityError)
    }

    /// Number of pixels currently loaded
    pub fn len(&self) -> u16 {
        self.data.len() as u16
    }

    /// True if no scanline is loaded
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Intensity at `index`. Indices come from validated job parameters;
    /// out-of-range access is a precondition violation, not a runtime
    /// fault.
    pub fn pixel(&self, index: u16) -> u8 {
        debug_assert!(index < self.len());
        self.data[usize::from(index)]
    }

    /// The loaded pixels
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_and_read() {
        let mut line = ScanlineBuffer::new();
        line.load(&[1, 2, 3]).unwrap();
        assert_eq!(line.len(), 3);
        assert_eq!(line.pixel(0), 1);
        assert_eq!(line.pixel(2), 3);
    }

    #[test]
    fn test_reload_replaces_contents() {
        let mut line = ScanlineBuffer::new();
        line.load(&[9; 100]).unwrap();
        line.load(&[5, 6]).unwrap();
        assert_eq!(line.as_slice(), &[5, 6]);
    }

    #[test]
    fn test_overlong_line_rejected() {
        let mut line = ScanlineBuffer::new();
        let too_long = [0u8; SCANLINE_CAPACITY + 1];
        assert_eq!(line.load(&too_long), Err(CapacityError));
    }

    #[test]
    fn test_full_capacity_accepted() {
        let mut line = ScanlineBuffer::new();
        let full = [7u8; SCANLINE_CAPACITY];
        assert!(line.load(&full).is_ok());
        assert_eq!(line.len(), SCANLINE_CAPACITY as u16);
    }
}
