//! Sample type and scratch buffer definitions

/// Type alias for audio samples (f32, matching host plugin buffers)
pub type Sample = f32;

/// Planar scratch buffer: one contiguous lane per channel, sized once
/// at prepare-time and never resized in the processing path.
#[derive(Debug, Clone)]
pub struct PlanarBuffer {
    lanes: Vec<Vec<Sample>>,
}

impl PlanarBuffer {
    pub fn new(channels: usize, capacity: usize) -> Self {
        Self {
            lanes: vec![vec![0.0; capacity]; channels],
        }
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.lanes.len()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.lanes.first().map_or(0, Vec::len)
    }

    /// Borrow the first `len` samples of one channel lane.
    #[inline]
    pub fn lane(&self, channel: usize, len: usize) -> &[Sample] {
        &self.lanes[channel][..len]
    }

    #[inline]
    pub fn lane_mut(&mut self, channel: usize, len: usize) -> &mut [Sample] {
        &mut self.lanes[channel][..len]
    }

    pub fn clear(&mut self) {
        for lane in &mut self.lanes {
            lane.fill(0.0);
        }
    }
}
