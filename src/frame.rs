//! Frames of pixel windows and reads of them through the cache hierarchy

use log::trace;
use rand::Rng;

use crate::compress::{compress, PixelWindow, WINDOW_SIZE, WINDOW_SIZE_COMPRESSED};
use crate::error::FrameError;
use crate::memory::{AccessType, MemoryHierarchy, SimStats};

const BLACK: [u8; 4] = [0, 0, 0, 0];
const WHITE: [u8; 4] = [255, 255, 255, 255];

/// Content pattern of a generated frame
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FramePattern {
    Black,
    Checkerboard,
    Random,
}

impl FramePattern {
    pub const ALL: [FramePattern; 3] = [
        FramePattern::Black,
        FramePattern::Checkerboard,
        FramePattern::Random,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FramePattern::Black => "black",
            FramePattern::Checkerboard => "checkerboard",
            FramePattern::Random => "random",
        }
    }
}

/// Handle to a frame owned by a `FrameStore`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameId(usize);

/// A texture laid out as consecutive windows
#[derive(Clone, Debug)]
pub struct Frame {
    /// Address of the first window
    pub base_address: u64,
    pub windows: Vec<PixelWindow>,
}

impl Frame {
    pub fn num_windows(&self) -> usize {
        self.windows.len()
    }

    /// Address of the first cache line of a window
    pub fn line_address(&self, window_id: usize) -> u64 {
        self.base_address + window_id as u64 * WINDOW_SIZE
    }

    /// Read one window, touching the second line only if it is uncompressed
    pub fn read_window(
        &self,
        window_id: usize,
        mem: &mut MemoryHierarchy,
        stats: &mut SimStats,
    ) -> f64 {
        let result = compress(&self.windows[window_id]);
        let line = self.line_address(window_id);
        trace!(
            "Window {} at {:#x}: compressed={}",
            window_id,
            line,
            result.did_compression
        );

        let mut total_time = mem.access(AccessType::Read, line, stats);
        if !result.did_compression {
            total_time +=
                mem.access(AccessType::Read, line + WINDOW_SIZE_COMPRESSED, stats);
        }
        total_time
    }

    /// Read every window in ascending order and return the total time
    pub fn read(&self, mem: &mut MemoryHierarchy, stats: &mut SimStats) -> f64 {
        (0..self.num_windows())
            .map(|window_id| self.read_window(window_id, mem, stats))
            .sum()
    }

    /// Read every window in descending order and return the total time
    pub fn read_backwards(&self, mem: &mut MemoryHierarchy, stats: &mut SimStats) -> f64 {
        (0..self.num_windows())
            .rev()
            .map(|window_id| self.read_window(window_id, mem, stats))
            .sum()
    }
}

/// Owns frames and hands out their addresses.
///
/// Frames are placed back to back in creation order; freeing a frame
/// leaves the addresses of the others untouched.
#[derive(Default)]
pub struct FrameStore {
    frames: Vec<Option<Frame>>,
    next_address: u64,
}

impl FrameStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, windows: Vec<PixelWindow>) -> FrameId {
        let base_address = self.next_address;
        self.next_address += windows.len() as u64 * WINDOW_SIZE;
        self.frames.push(Some(Frame {
            base_address,
            windows,
        }));
        FrameId(self.frames.len() - 1)
    }

    pub fn new_black(&mut self, num_windows: usize) -> FrameId {
        self.insert(vec![PixelWindow::filled(BLACK); num_windows])
    }

    /// Alternating black and white windows
    pub fn new_checkerboard(&mut self, num_windows: usize) -> FrameId {
        let windows = (0..num_windows)
            .map(|i| PixelWindow::filled(if i % 2 == 0 { BLACK } else { WHITE }))
            .collect();
        self.insert(windows)
    }

    pub fn new_random(&mut self, num_windows: usize, rng: &mut impl Rng) -> FrameId {
        let windows = (0..num_windows)
            .map(|_| {
                let mut window = PixelWindow::default();
                for pixel in window.pixels.iter_mut() {
                    rng.fill(pixel);
                }
                window
            })
            .collect();
        self.insert(windows)
    }

    pub fn new_frame(
        &mut self,
        pattern: FramePattern,
        num_windows: usize,
        rng: &mut impl Rng,
    ) -> FrameId {
        match pattern {
            FramePattern::Black => self.new_black(num_windows),
            FramePattern::Checkerboard => self.new_checkerboard(num_windows),
            FramePattern::Random => self.new_random(num_windows, rng),
        }
    }

    pub fn get(&self, id: FrameId) -> Option<&Frame> {
        self.frames.get(id.0).and_then(Option::as_ref)
    }

    /// Like `get`, but a dead handle is an error
    pub fn frame(&self, id: FrameId) -> Result<&Frame, FrameError> {
        self.get(id).ok_or(FrameError::MissingFrame(id.0))
    }

    /// Release a frame, returning it if it was still alive
    pub fn free(&mut self, id: FrameId) -> Option<Frame> {
        self.frames.get_mut(id.0).and_then(Option::take)
    }

    pub fn len(&self) -> usize {
        self.frames.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
