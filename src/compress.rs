//! Framebuffer compression predictor.
//!
//! A window of 32 RGBA pixels occupies two 64B cache lines uncompressed.
//! The window is stored as a per-channel base value plus fixed-width
//! deltas, and is compressed only if the result fits one line.

pub const WINDOW_NUM_PIXELS: usize = 32;
pub const NUM_CHANNELS: usize = 4;

/// Size of a compressed window, one cache line
pub const WINDOW_SIZE_COMPRESSED: u64 = 64;
/// Size of an uncompressed window
pub const WINDOW_SIZE: u64 = 2 * WINDOW_SIZE_COMPRESSED;

/// Largest total delta width (over all channels) that still fits one line:
/// 48 header bits + 32 * 14 payload bits <= 512
const COMPRESS_THRESHOLD: u32 = 14;

/// skip (1) + prediction (8) + width (3) bits per channel
const HEADER_BITS: u32 = (1 + 8 + 3) * NUM_CHANNELS as u32;
const UNCOMPRESSED_BITS: u32 = (WINDOW_NUM_PIXELS * NUM_CHANNELS * 8) as u32;

pub type Pixel = [u8; NUM_CHANNELS];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelWindow {
    pub pixels: [Pixel; WINDOW_NUM_PIXELS],
}

impl PixelWindow {
    pub fn filled(pixel: Pixel) -> Self {
        Self {
            pixels: [pixel; WINDOW_NUM_PIXELS],
        }
    }
}

impl Default for PixelWindow {
    fn default() -> Self {
        Self::filled([0; NUM_CHANNELS])
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CompressResult {
    pub did_compression: bool,
    pub compress_ratio: f64,

    /// Channel is constant over the window
    pub skip: [bool; NUM_CHANNELS],
    /// Base value each delta is taken from
    pub prediction: [u8; NUM_CHANNELS],
    /// Width of the deltas, at most 8
    pub num_bits: [u8; NUM_CHANNELS],
}

impl CompressResult {
    /// Number of cache lines the window occupies
    pub fn num_lines(&self) -> u64 {
        if self.did_compression {
            1
        } else {
            2
        }
    }
}

/// Number of bits needed to represent `value`
fn bit_length(value: u8) -> u8 {
    (u8::BITS - value.leading_zeros()) as u8
}

pub fn compress(window: &PixelWindow) -> CompressResult {
    let mut min = [u8::MAX; NUM_CHANNELS];
    let mut max = [u8::MIN; NUM_CHANNELS];
    for pixel in &window.pixels {
        for c in 0..NUM_CHANNELS {
            min[c] = min[c].min(pixel[c]);
            max[c] = max[c].max(pixel[c]);
        }
    }

    let mut num_bits = [0u8; NUM_CHANNELS];
    let mut skip = [false; NUM_CHANNELS];
    for c in 0..NUM_CHANNELS {
        num_bits[c] = bit_length(max[c] - min[c]);
        skip[c] = num_bits[c] == 0;
    }

    let total_bits: u32 = num_bits.iter().map(|&bits| bits as u32).sum();
    let did_compression = total_bits <= COMPRESS_THRESHOLD;
    let compress_ratio = if did_compression {
        let compressed_bits = HEADER_BITS + WINDOW_NUM_PIXELS as u32 * total_bits;
        UNCOMPRESSED_BITS as f64 / compressed_bits as f64
    } else {
        1.0
    };

    CompressResult {
        did_compression,
        compress_ratio,
        skip,
        prediction: min,
        num_bits,
    }
}
