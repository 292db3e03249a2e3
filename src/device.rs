//! Simulated positioner devices.
//!
//! A [`Device`] is one addressable sub-unit of a positioner: a rotary
//! axis with time-based motion, or an antenna stand that only switches
//! polarization. Devices are pure state; nothing here does I/O or talks
//! to a runtime. Motion is computed on read: a moving axis stores the
//! snapshot it started from (`start`, `target`, `motion_started`), and
//! every query folds elapsed time into a fresh position.

use std::time::Instant;

use tracing::warn;

/// Fraction of the nameplate speed a drive actually achieves while
/// positioning. Every motion runs at `SLOWDOWN_FACTOR * speed`, so a
/// simulated move takes realistically longer than the configured rate
/// alone would suggest.
pub const SLOWDOWN_FACTOR: f64 = 0.8;

const DEFAULT_SPEED_DEG_PER_SEC: f64 = 4.9;
const DEFAULT_LIMIT_CW: f64 = 90.0;
const DEFAULT_LIMIT_ACW: f64 = -91.0;

// ============================================================================
// Rotary axis
// ============================================================================

/// One rotary axis with lazily recomputed motion.
#[derive(Debug, Clone)]
pub struct Axis {
    name: String,
    current: f64,
    start: f64,
    target: f64,
    speed: f64,
    busy: bool,
    motion_started: Option<Instant>,
    limit_cw: f64,
    limit_acw: f64,
    retry_count: u32,
}

impl Axis {
    /// A parked axis at position 0 with positioner defaults.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            current: 0.0,
            start: 0.0,
            target: 0.0,
            speed: DEFAULT_SPEED_DEG_PER_SEC,
            busy: false,
            motion_started: None,
            limit_cw: DEFAULT_LIMIT_CW,
            limit_acw: DEFAULT_LIMIT_ACW,
            retry_count: 0,
        }
    }

    /// Axis name as used in selection commands.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Position at `now`, recomputed from the motion snapshot.
    ///
    /// While busy, the position advances from `start` toward `target` at
    /// `SLOWDOWN_FACTOR * speed` and clamps exactly at the target, at
    /// which point `busy` clears. Idle axes are untouched. With zero
    /// speed a started motion covers no distance and never arrives.
    pub fn position_at(&mut self, now: Instant) -> f64 {
        if self.busy {
            if let Some(started) = self.motion_started {
                let elapsed = now.saturating_duration_since(started).as_secs_f64();
                let travelled = SLOWDOWN_FACTOR * self.speed * elapsed;
                let span = self.target - self.start;
                if travelled >= span.abs() {
                    self.current = self.target;
                    self.busy = false;
                } else {
                    self.current = self.start + travelled * span.signum();
                }
            }
        }
        self.current
    }

    /// Begin moving toward `target`, starting from wherever the axis
    /// actually is at `now`. A motion already in flight is superseded
    /// from its recomputed position.
    pub fn start_motion(&mut self, target: f64, now: Instant) {
        self.position_at(now);
        if self.speed == 0.0 {
            warn!(axis = %self.name, "motion commanded with zero speed; axis will never arrive");
        }
        self.start = self.current;
        self.target = target;
        self.busy = true;
        self.motion_started = Some(now);
    }

    /// Freeze the axis at its position as of `now`.
    pub fn stop(&mut self, now: Instant) {
        self.position_at(now);
        self.busy = false;
    }

    /// Whether a motion is still in flight as of `now`.
    pub fn is_busy(&mut self, now: Instant) -> bool {
        self.position_at(now);
        self.busy
    }

    /// Commanded target of the current or last motion.
    pub fn target(&self) -> f64 {
        self.target
    }

    /// Nameplate speed in degrees per second.
    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Set the nameplate speed. Takes effect from the next recompute.
    pub fn set_speed(&mut self, speed: f64) {
        self.speed = speed;
    }

    /// Clockwise travel limit. Reported only; motion is not clamped.
    pub fn limit_cw(&self) -> f64 {
        self.limit_cw
    }

    /// Anticlockwise travel limit. Reported only; motion is not clamped.
    pub fn limit_acw(&self) -> f64 {
        self.limit_acw
    }

    /// Store a new clockwise limit.
    pub fn set_limit_cw(&mut self, value: f64) {
        self.limit_cw = value;
    }

    /// Store a new anticlockwise limit.
    pub fn set_limit_acw(&mut self, value: f64) {
        self.limit_acw = value;
    }
}

// ============================================================================
// Retry/offset adjustment
// ============================================================================

/// Offset policy applied to commanded targets.
///
/// The emulated controllers land slightly off target and accept a small
/// corrective move a bounded number of times: a far move (beyond
/// `far_distance`) restarts the allowance, nearby corrections consume it,
/// and once `max_tries` is spent further near moves go unadjusted.
#[derive(Debug, Clone, Copy)]
pub struct AdjustmentPolicy {
    /// Offset added to every adjusted target.
    pub offset: f64,
    /// Travel distance beyond which a move counts as far.
    pub far_distance: f64,
    /// Near corrective moves adjusted after each far move.
    pub max_tries: u32,
}

impl Default for AdjustmentPolicy {
    fn default() -> Self {
        Self {
            offset: 0.0,
            far_distance: 10.0,
            max_tries: 5,
        }
    }
}

impl AdjustmentPolicy {
    /// Adjustment for a move of `axis` to `requested`, updating the
    /// axis retry counter.
    pub fn adjust(&self, axis: &mut Axis, requested: f64, now: Instant) -> f64 {
        let distance = (axis.position_at(now) - requested).abs();
        if distance > self.far_distance {
            axis.retry_count = 0;
            self.offset
        } else if axis.retry_count < self.max_tries {
            axis.retry_count += 1;
            self.offset
        } else {
            0.0
        }
    }
}

// ============================================================================
// Antenna stand
// ============================================================================

/// Antenna polarization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarization {
    /// Horizontal, the power-on state.
    Horizontal,
    /// Vertical.
    Vertical,
}

/// An antenna stand: switches polarization, never moves, never busy.
#[derive(Debug, Clone)]
pub struct AntennaStand {
    name: String,
    polarization: Polarization,
}

impl AntennaStand {
    /// A stand in the power-on (horizontal) state.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            polarization: Polarization::Horizontal,
        }
    }

    /// Stand name as used in selection commands.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current polarization.
    pub fn polarization(&self) -> Polarization {
        self.polarization
    }

    /// Switch polarization. Instantaneous on the emulated hardware.
    pub fn set_polarization(&mut self, polarization: Polarization) {
        self.polarization = polarization;
    }
}

// ============================================================================
// Device
// ============================================================================

/// One addressable sub-unit of a positioner.
#[derive(Debug, Clone)]
pub enum Device {
    /// A rotary axis.
    Rotary(Axis),
    /// An antenna polarization stand.
    Stand(AntennaStand),
}

impl Device {
    /// Name used by selection commands.
    pub fn name(&self) -> &str {
        match self {
            Device::Rotary(axis) => axis.name(),
            Device::Stand(stand) => stand.name(),
        }
    }

    /// Busy state as of `now`; stands are never busy.
    pub fn is_busy(&mut self, now: Instant) -> bool {
        match self {
            Device::Rotary(axis) => axis.is_busy(now),
            Device::Stand(_) => false,
        }
    }

    /// The rotary axis, if this device is one.
    pub fn as_axis(&self) -> Option<&Axis> {
        match self {
            Device::Rotary(axis) => Some(axis),
            Device::Stand(_) => None,
        }
    }

    /// Mutable rotary axis, if this device is one.
    pub fn as_axis_mut(&mut self) -> Option<&mut Axis> {
        match self {
            Device::Rotary(axis) => Some(axis),
            Device::Stand(_) => None,
        }
    }

    /// The antenna stand, if this device is one.
    pub fn as_stand(&self) -> Option<&AntennaStand> {
        match self {
            Device::Rotary(_) => None,
            Device::Stand(stand) => Some(stand),
        }
    }

    /// Mutable antenna stand, if this device is one.
    pub fn as_stand_mut(&mut self) -> Option<&mut AntennaStand> {
        match self {
            Device::Rotary(_) => None,
            Device::Stand(stand) => Some(stand),
        }
    }
}
