/// Game loop timing and control system
///
/// The host drives frames: it hands back a timestamp (milliseconds) for each
/// frame it was asked to schedule. Every start mints a fresh loop token, so
/// frames scheduled by an earlier run are recognised and ignored.
use crate::core::math::clamp;
use std::collections::VecDeque;

/// Largest delta a single frame may report (one frame at 60 FPS)
pub const DEFAULT_MAX_DELTA: f64 = 1000.0 / 60.0;

/// FPS tracking window (average over last N frames)
const FPS_WINDOW_SIZE: usize = 60;

/// Identity of one start..stop run of the loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoopToken(u64);

/// Handle for a pending frame request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameRequestId(u64);

/// Frame requests waiting for the host to fire them
#[derive(Debug, Default)]
pub struct FrameQueue {
    next_id: u64,
    pending: VecDeque<(FrameRequestId, LoopToken)>,
}

impl FrameQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask for a frame on behalf of `token`
    pub fn request(&mut self, token: LoopToken) -> FrameRequestId {
        self.next_id += 1;
        let id = FrameRequestId(self.next_id);
        self.pending.push_back((id, token));
        id
    }

    /// Cancel a request; unknown or already fired ids are ignored
    pub fn cancel(&mut self, id: FrameRequestId) {
        self.pending.retain(|(pending, _)| *pending != id);
    }

    /// Fire the oldest pending request
    pub fn take(&mut self) -> Option<LoopToken> {
        self.pending.pop_front().map(|(_, token)| token)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Game loop state: running flag, loop identity and frame timing
#[derive(Debug)]
pub struct LoopController {
    running: bool,

    /// Token of the current run
    token: LoopToken,
    tokens_minted: u64,

    /// Request scheduled for the next frame, if any
    pending: Option<FrameRequestId>,
    queue: FrameQueue,

    /// Timestamp of the previous frame of this run
    last_timestamp: Option<f64>,
    max_delta: f64,
    delta_time: f64,

    /// Frame timing history for FPS calculation
    frame_times: VecDeque<f64>,
    frame_count: u64,
    current_fps: f64,
}

impl LoopController {
    pub fn new(max_delta: f64) -> Self {
        Self {
            running: false,
            token: LoopToken(0),
            tokens_minted: 0,
            pending: None,
            queue: FrameQueue::new(),
            last_timestamp: None,
            max_delta: max_delta.max(0.0),
            delta_time: 0.0,
            frame_times: VecDeque::with_capacity(FPS_WINDOW_SIZE),
            frame_count: 0,
            current_fps: 0.0,
        }
    }

    /// Start a new run and request its first frame.
    ///
    /// Returns false, leaving the current run untouched, when already running.
    pub fn start(&mut self) -> bool {
        if self.running {
            log::warn!("Game loop already running");
            return false;
        }

        self.tokens_minted += 1;
        self.token = LoopToken(self.tokens_minted);
        self.running = true;
        self.last_timestamp = None;
        self.pending = Some(self.queue.request(self.token));
        log::info!("Game loop started");
        true
    }

    /// Stop the current run. Safe to call when not running.
    pub fn stop(&mut self) {
        if self.running {
            log::info!("Game loop stopped");
        }
        self.running = false;
        if let Some(id) = self.pending.take() {
            self.queue.cancel(id);
        }
        self.last_timestamp = None;
    }

    /// Accept a fired frame and compute its delta.
    ///
    /// Returns `None` for frames that belong to a stopped or superseded run.
    pub fn begin_frame(&mut self, token: LoopToken, timestamp: f64) -> Option<f64> {
        if !self.running || token != self.token {
            log::debug!("Ignoring stale frame");
            return None;
        }
        self.pending = None;

        let delta = match self.last_timestamp {
            Some(last) => clamp(timestamp - last, 0.0, self.max_delta),
            None => 0.0,
        };
        self.last_timestamp = Some(timestamp);
        self.delta_time = delta;
        self.frame_count += 1;

        // Store frame time for FPS calculation
        self.frame_times.push_back(delta);
        if self.frame_times.len() > FPS_WINDOW_SIZE {
            self.frame_times.pop_front();
        }

        // Update FPS counter every 10 frames
        if self.frame_count % 10 == 0 {
            self.update_fps();
        }

        Some(delta)
    }

    /// Request the frame after the current one
    pub fn schedule_next(&mut self) {
        if self.running {
            self.pending = Some(self.queue.request(self.token));
        }
    }

    /// Stop and forget all timing history
    pub fn reset(&mut self) {
        self.stop();
        self.delta_time = 0.0;
        self.frame_times.clear();
        self.frame_count = 0;
        self.current_fps = 0.0;
    }

    /// Fire the next pending frame request
    pub fn take_request(&mut self) -> Option<LoopToken> {
        self.queue.take()
    }

    pub fn queue(&self) -> &FrameQueue {
        &self.queue
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn token(&self) -> LoopToken {
        self.token
    }

    /// Delta of the most recent frame, in milliseconds
    pub fn delta_time(&self) -> f64 {
        self.delta_time
    }

    pub fn max_delta(&self) -> f64 {
        self.max_delta
    }

    pub fn fps(&self) -> f64 {
        self.current_fps
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    fn update_fps(&mut self) {
        if self.frame_times.is_empty() {
            self.current_fps = 0.0;
            return;
        }

        let total: f64 = self.frame_times.iter().sum();
        let avg_frame_time = total / self.frame_times.len() as f64;

        self.current_fps = if avg_frame_time > 0.0 {
            1000.0 / avg_frame_time
        } else {
            0.0
        };
    }
}

impl Default for LoopController {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DELTA)
    }
}
