//! Fixed-capacity sample buffers shared between driver and plugin
//!
//! Buffers are sized generously at allocation time because the driver may
//! call back before the final block size is known. They live exactly as long
//! as the audio callback that owns them.

/// Frames per channel allocated for every buffer
pub const MAX_BLOCK_FRAMES: usize = 8192;

/// Number of plugin input and output channels
pub const CHANNELS: usize = 2;

/// Two input and two output mono channels, allocated and freed as a unit
pub struct SampleBufferSet {
    inputs: [Vec<f32>; CHANNELS],
    outputs: [Vec<f32>; CHANNELS],
    capacity: usize,
}

impl SampleBufferSet {
    pub fn new(capacity: usize) -> Self {
        Self {
            inputs: [vec![0.0; capacity], vec![0.0; capacity]],
            outputs: [vec![0.0; capacity], vec![0.0; capacity]],
            capacity,
        }
    }

    /// Frames per channel
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Split interleaved stereo input into the two mono input channels
    pub fn deinterleave_input(&mut self, input: &[f32], frames: usize) {
        let [left, right] = &mut self.inputs;
        for (i, frame) in input.chunks_exact(CHANNELS).take(frames).enumerate() {
            left[i] = frame[0];
            right[i] = frame[1];
        }
    }

    /// Write the two mono output channels back as interleaved stereo
    pub fn interleave_output(&self, output: &mut [f32], frames: usize) {
        let [left, right] = &self.outputs;
        for (i, frame) in output.chunks_exact_mut(CHANNELS).take(frames).enumerate() {
            frame[0] = left[i];
            frame[1] = right[i];
        }
    }

    /// Borrow the first `frames` samples of every channel for one process call
    pub fn ports(&mut self, frames: usize) -> ProcessBuffers<'_> {
        assert!(
            frames <= self.capacity,
            "block of {} frames exceeds buffer capacity {}",
            frames,
            self.capacity
        );
        let [in_l, in_r] = &self.inputs;
        let [out_l, out_r] = &mut self.outputs;
        ProcessBuffers {
            inputs: [&in_l[..frames], &in_r[..frames]],
            outputs: [&mut out_l[..frames], &mut out_r[..frames]],
        }
    }
}

/// The buffers a plugin reads and writes during one `process()` call
pub struct ProcessBuffers<'a> {
    pub inputs: [&'a [f32]; CHANNELS],
    pub outputs: [&'a mut [f32]; CHANNELS],
}

impl ProcessBuffers<'_> {
    pub fn frames(&self) -> usize {
        self.inputs[0].len()
    }
}
