//! Interaction and animation state machine
//!
//! Owns everything that changes per frame: the cube's displayed and target
//! orientation, the drag/coast/auto-rotate mode, the animation clock and the
//! orbit light position. The DOM glue feeds it pointer events and drives
//! [`CubeController::tick`] once per animation frame while visible; the
//! module itself never touches the browser, so all of the timing-sensitive
//! behavior is testable by stepping ticks by hand.

use glam::{DVec2, DVec3};

/// Radians of rotation per pixel of pointer travel
pub const DRAG_SENSITIVITY: f64 = 0.005;
/// Target-angle increment per tick while idle
pub const AUTO_ROTATE_STEP: f64 = 0.002;
/// Per-tick multiplier applied to coast velocity after a drag ends
pub const COAST_DECAY: f64 = 0.92;
/// Coast velocity magnitude below which auto-rotation re-engages
pub const COAST_EPSILON: f64 = 0.0001;
/// Fraction of the remaining distance covered per tick by the easing
pub const EASE_FACTOR: f64 = 0.12;
/// Animation clock advance per rendered frame
pub const CLOCK_STEP: f64 = 0.01;
/// Delay before auto-rotation resumes after a drag ends
pub const RESUME_DELAY_MS: u32 = 300;

const ORBIT_RADIUS: f64 = 5.0;
const ORBIT_HEIGHT: f64 = 3.0;
const BOB_AMPLITUDE: f64 = 1.5;
/// Initial orientation (x tilt, y turn)
const INITIAL_ROTATION: DVec2 = DVec2::new(-1.0, 0.7);

/// How the target orientation advances each tick
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SpinMode {
    /// Idle: constant angular increments
    Auto,
    /// Pointer captured; targets follow the pointer directly
    Dragging { last: DVec2, velocity: DVec2 },
    /// Post-drag inertia: targets advance by a decaying velocity
    Coasting { velocity: DVec2 },
}

/// Everything the glue needs to draw one frame
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frame {
    /// Current (x tilt, y turn) of the cube group
    pub rotation: DVec2,
    /// World position of the orbiting light
    pub orbit_light: DVec3,
}

pub struct CubeController {
    running: bool,
    mode: SpinMode,
    current: DVec2,
    target: DVec2,
    clock: f64,
}

impl CubeController {
    pub fn new() -> Self {
        Self {
            running: false,
            mode: SpinMode::Auto,
            current: INITIAL_ROTATION,
            target: INITIAL_ROTATION,
            clock: 0.0,
        }
    }

    /// Returns true if this call actually started the loop (so the caller
    /// should schedule the first frame). Idempotent.
    pub fn start(&mut self) -> bool {
        if self.running {
            return false;
        }
        self.running = true;
        true
    }

    /// Idempotent; returns true if the loop was running.
    pub fn stop(&mut self) -> bool {
        let was_running = self.running;
        self.running = false;
        was_running
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn mode(&self) -> SpinMode {
        self.mode
    }

    /// Pointer pressed on the render surface: capture the drag, zero the
    /// accumulated velocity.
    pub fn pointer_down(&mut self, pos: DVec2) {
        self.mode = SpinMode::Dragging {
            last: pos,
            velocity: DVec2::ZERO,
        };
    }

    /// Pointer moved while captured; ignored outside a drag.
    pub fn pointer_move(&mut self, pos: DVec2) {
        if let SpinMode::Dragging { last, velocity } = &mut self.mode {
            let delta = pos - *last;
            // Horizontal travel turns around y, vertical tilts around x
            self.target.y += delta.x * DRAG_SENSITIVITY;
            self.target.x += delta.y * DRAG_SENSITIVITY;
            *velocity = DVec2::new(delta.y, delta.x) * DRAG_SENSITIVITY;
            *last = pos;
        }
    }

    /// Pointer released or left the surface. Returns true if a drag ended,
    /// in which case the caller schedules [`resume_auto`] after
    /// [`RESUME_DELAY_MS`].
    ///
    /// [`resume_auto`]: CubeController::resume_auto
    pub fn pointer_up(&mut self) -> bool {
        if let SpinMode::Dragging { velocity, .. } = self.mode {
            self.mode = SpinMode::Coasting { velocity };
            true
        } else {
            false
        }
    }

    /// Re-engage auto-rotation after the post-drag delay. A drag that
    /// started in the interim supersedes the pending resume, so this is a
    /// no-op while dragging.
    pub fn resume_auto(&mut self) {
        if let SpinMode::Coasting { .. } = self.mode {
            self.mode = SpinMode::Auto;
        }
    }

    /// Advance one frame: update targets per the current mode, ease the
    /// displayed orientation, move the orbit light and advance the clock.
    /// Returns `None` while stopped (no scene mutation occurs).
    pub fn tick(&mut self) -> Option<Frame> {
        if !self.running {
            return None;
        }

        match &mut self.mode {
            SpinMode::Dragging { .. } => {}
            SpinMode::Auto => {
                self.target += DVec2::splat(AUTO_ROTATE_STEP);
            }
            SpinMode::Coasting { velocity } => {
                self.target += *velocity;
                *velocity *= COAST_DECAY;
                if velocity.x.abs() < COAST_EPSILON && velocity.y.abs() < COAST_EPSILON {
                    self.mode = SpinMode::Auto;
                }
            }
        }

        // First-order exponential smoothing toward the target; orientation
        // never snaps, even across mode transitions.
        self.current += (self.target - self.current) * EASE_FACTOR;

        let orbit_light = DVec3::new(
            (self.clock * 0.4).cos() * ORBIT_RADIUS,
            ORBIT_HEIGHT + (self.clock * 0.25).sin() * BOB_AMPLITUDE,
            (self.clock * 0.4).sin() * ORBIT_RADIUS,
        );
        self.clock += CLOCK_STEP;

        Some(Frame {
            rotation: self.current,
            orbit_light,
        })
    }

    #[cfg(test)]
    fn target(&self) -> DVec2 {
        self.target
    }
}

impl Default for CubeController {
    fn default() -> Self {
        Self::new()
    }
}
