//! Vötsch climate chambers.
//!
//! Two tiers share the `$01`-prefixed ASCII dialect:
//!
//! - [`Votsch`] is the bare monitor (Vc and Vt cabinets): it reports a
//!   fixed temperature frame and acknowledges writes without keeping
//!   state. The models differ only in how many filler fields the
//!   I-report carries.
//! - [`Vc37060`] is the full chamber: settable temperature and humidity
//!   with slope-limited (ramped) setpoints, fan speed, and a 32-bit
//!   control block echoed back in every report.
//!
//! Unknown commands are answered with an explanatory echo
//! (`'<cmd>' is an unknown command.`) rather than a terse sentinel.

use std::sync::Arc;
use std::time::Instant;

use crate::clock::Clock;
use crate::dispatch::{Command, CommandSet, Refusal, Response, Sentinel};
use crate::error::AppResult;
use crate::format;
use crate::instruments::Instrument;

// ============================================================================
// Ramped setpoint
// ============================================================================

/// A setpoint that approaches its nominal value at a bounded slope.
///
/// The chamber does not jump to a newly commanded nominal value: it walks
/// there from `ramp_origin` at the configured rate (units per minute) and
/// reports the walking value. Rates are magnitudes with one direction
/// active at a time; with both rates zero the nominal value is reported
/// directly.
#[derive(Debug, Clone)]
pub struct RampedSetpoint {
    nominal: f64,
    ramp_origin: f64,
    ramp_started: Option<Instant>,
    rate_up: f64,
    rate_down: f64,
}

impl RampedSetpoint {
    /// A settled setpoint: nominal and origin coincide, no slopes.
    pub fn new(initial: f64) -> Self {
        Self {
            nominal: initial,
            ramp_origin: initial,
            ramp_started: None,
            rate_up: 0.0,
            rate_down: 0.0,
        }
    }

    /// Last commanded nominal value.
    pub fn nominal(&self) -> f64 {
        self.nominal
    }

    /// The value reported at `now`: the origin walked toward nominal at
    /// the applicable rate, clamped at nominal. A zero rate in the
    /// applicable direction holds the value at the origin.
    pub fn moving_setpoint(&self, now: Instant) -> f64 {
        if self.rate_up == 0.0 && self.rate_down == 0.0 {
            return self.nominal;
        }
        let Some(started) = self.ramp_started else {
            return self.nominal;
        };
        let elapsed = now.saturating_duration_since(started).as_secs_f64();
        if self.nominal > self.ramp_origin {
            (self.ramp_origin + self.rate_up / 60.0 * elapsed).min(self.nominal)
        } else if self.nominal < self.ramp_origin {
            (self.ramp_origin - self.rate_down / 60.0 * elapsed).max(self.nominal)
        } else {
            self.nominal
        }
    }

    /// Whether an up/down rate pair is acceptable: both are magnitudes
    /// and at most one direction may be active.
    pub fn slopes_valid(up: f64, down: f64) -> bool {
        up >= 0.0 && down >= 0.0 && (up == 0.0 || down == 0.0)
    }

    /// Install a new rate pair and restart the ramp clock. The current
    /// moving setpoint becomes the new ramp origin first, so re-issuing a
    /// slope command continues from the reported value instead of
    /// rewinding to the old origin. An invalid pair changes nothing.
    pub fn set_slopes(&mut self, up: f64, down: f64, now: Instant) -> bool {
        if !Self::slopes_valid(up, down) {
            return false;
        }
        self.ramp_origin = self.moving_setpoint(now);
        self.rate_up = up;
        self.rate_down = down;
        self.ramp_started = Some(now);
        true
    }

    /// Command a new nominal value. The current moving setpoint becomes
    /// the new ramp origin first, so a ramp in flight continues smoothly
    /// instead of restarting.
    pub fn retarget(&mut self, new_nominal: f64, now: Instant) {
        self.ramp_origin = self.moving_setpoint(now);
        self.nominal = new_nominal;
        self.ramp_started = Some(now);
    }
}

// ============================================================================
// Vc / Vt monitor
// ============================================================================

const MONITOR_TEMPERATURE: f64 = 27.1;

const MONITOR_HELP: &str = "ASCII description of the protocol\nContains multiple lines";

/// Monitor cabinet model; decides the I-report filler count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VotschModel {
    /// Vc cabinet: twelve filler fields.
    Vc,
    /// Vt cabinet: fourteen filler fields.
    Vt,
}

impl VotschModel {
    fn filler_fields(self) -> usize {
        match self {
            VotschModel::Vc => 12,
            VotschModel::Vt => 14,
        }
    }

    fn label(self) -> &'static str {
        match self {
            VotschModel::Vc => "Vc",
            VotschModel::Vt => "Vt",
        }
    }
}

/// Bare Vötsch monitor: fixed temperature, stateless writes.
pub struct Votsch {
    commands: Arc<CommandSet<Votsch>>,
    model: VotschModel,
    actual_temperature: f64,
}

impl Votsch {
    /// A monitor cabinet of the given model.
    pub fn new(model: VotschModel) -> AppResult<Self> {
        let commands = CommandSet::builder(Sentinel::UnknownEcho)
            .bind("$01I", monitor_report)
            .bind("$01?", monitor_help)
            .bind("$01E", monitor_accept_targets)
            .bind("$01U", monitor_accept_slopes)
            .build()?;
        Ok(Self {
            commands: Arc::new(commands),
            model,
            actual_temperature: MONITOR_TEMPERATURE,
        })
    }
}

impl Instrument for Votsch {
    fn name(&self) -> &str {
        self.model.label()
    }

    fn respond(&mut self, line: &str) -> String {
        let commands = Arc::clone(&self.commands);
        commands.dispatch(self, line)
    }
}

fn monitor_report(m: &mut Votsch, _cmd: &Command<'_>) -> Response {
    let mut out = format::zero_padded(m.actual_temperature);
    out.push_str(" 0019.8 ");
    for _ in 0..m.model.filler_fields() {
        out.push_str("0000.1 ");
    }
    out.push_str(&"0".repeat(32));
    Ok(out)
}

fn monitor_help(_m: &mut Votsch, _cmd: &Command<'_>) -> Response {
    Ok(MONITOR_HELP.to_string())
}

fn monitor_accept_targets(_m: &mut Votsch, _cmd: &Command<'_>) -> Response {
    // Nothing settable on the monitor; the write is acknowledged by silence.
    Ok(String::new())
}

fn monitor_accept_slopes(_m: &mut Votsch, cmd: &Command<'_>) -> Response {
    Ok(if cmd.words().count() == 5 { "0" } else { "" }.to_string())
}

// ============================================================================
// Vc3 7060 chamber
// ============================================================================

const CHAMBER_HELP: &str = "\
ASCII STANDARD PROTOCOL
$01E t h f s1 s2 s3 s4 bits   set nominal temperature, humidity and fan
                              speed; s1..s4 are spare channels; bits is
                              the 32 character control block
$01U tu td hu hd              set ramp slopes in units per minute
                              (temperature up/down, humidity up/down)
$01I                          report nominal and actual values followed
                              by the control block
$01?                          this description";

/// Vc3 7060 climate chamber with ramped temperature and humidity.
pub struct Vc37060 {
    commands: Arc<CommandSet<Vc37060>>,
    clock: Arc<dyn Clock>,
    temperature: RampedSetpoint,
    humidity: RampedSetpoint,
    actual_temperature: f64,
    actual_humidity: f64,
    fan_speed: f64,
    bits: String,
}

impl Vc37060 {
    /// A chamber idling near room conditions.
    pub fn new(clock: Arc<dyn Clock>) -> AppResult<Self> {
        let commands = CommandSet::builder(Sentinel::UnknownEcho)
            .bind("$01I", chamber_report)
            .bind("$01?", chamber_help)
            .bind("$01E", chamber_set_targets)
            .bind("$01U", chamber_set_slopes)
            .build()?;
        Ok(Self {
            commands: Arc::new(commands),
            clock,
            temperature: RampedSetpoint::new(19.2),
            humidity: RampedSetpoint::new(54.0),
            actual_temperature: 19.1,
            actual_humidity: 53.8,
            fan_speed: 0.0,
            bits: "0".repeat(32),
        })
    }
}

impl Instrument for Vc37060 {
    fn name(&self) -> &str {
        "Vc37060"
    }

    fn respond(&mut self, line: &str) -> String {
        let commands = Arc::clone(&self.commands);
        commands.dispatch(self, line)
    }
}

/// Fourteen zero-padded numeric fields and the control block: moving
/// setpoint and actual value for temperature and humidity, fan speed,
/// then nine spare zeros.
fn chamber_report(c: &mut Vc37060, _cmd: &Command<'_>) -> Response {
    let now = c.clock.now();
    let mut fields = vec![
        c.temperature.moving_setpoint(now),
        c.actual_temperature,
        c.humidity.moving_setpoint(now),
        c.actual_humidity,
        c.fan_speed,
    ];
    fields.extend(std::iter::repeat(0.0).take(9));
    let mut parts: Vec<String> = fields.into_iter().map(format::zero_padded).collect();
    parts.push(c.bits.clone());
    Ok(parts.join(" "))
}

fn chamber_help(_c: &mut Vc37060, _cmd: &Command<'_>) -> Response {
    Ok(CHAMBER_HELP.to_string())
}

/// `$01E t h f s1 s2 s3 s4 bits`: retarget both setpoints, store fan
/// speed and control block. The spare channels are parsed and dropped.
/// Anything malformed refuses, which surfaces as the unknown-command
/// echo with the chamber untouched.
fn chamber_set_targets(c: &mut Vc37060, cmd: &Command<'_>) -> Response {
    let words: Vec<&str> = cmd.words().collect();
    if words.len() < 9 {
        return Err(Refusal::Malformed);
    }
    let mut values = [0.0f64; 7];
    for (slot, word) in values.iter_mut().zip(&words[1..8]) {
        *slot = word.parse().map_err(|_| Refusal::Malformed)?;
    }
    let now = c.clock.now();
    c.temperature.retarget(values[0], now);
    c.humidity.retarget(values[1], now);
    c.fan_speed = values[2];
    // Crude sensor model: the chamber settles close to, not on, the target.
    c.actual_temperature = values[0] + 3.0;
    c.actual_humidity = values[1] + 5.0;
    c.bits = words[8].to_string();
    Ok("0".to_string())
}

/// `$01U tu td hu hd`: install ramp slopes. A malformed or conflicting
/// request is dropped silently, leaving the ramps as they were.
fn chamber_set_slopes(c: &mut Vc37060, cmd: &Command<'_>) -> Response {
    let words: Vec<&str> = cmd.words().collect();
    if words.len() != 5 {
        return Ok(String::new());
    }
    let mut rates = [0.0f64; 4];
    for (slot, word) in rates.iter_mut().zip(&words[1..5]) {
        match word.parse() {
            Ok(value) => *slot = value,
            Err(_) => return Ok(String::new()),
        }
    }
    let [up, down, humidity_up, humidity_down] = rates;
    if !RampedSetpoint::slopes_valid(up, down)
        || !RampedSetpoint::slopes_valid(humidity_up, humidity_down)
    {
        return Ok(String::new());
    }
    let now = c.clock.now();
    c.temperature.set_slopes(up, down, now);
    c.humidity.set_slopes(humidity_up, humidity_down, now);
    Ok("0".to_string())
}
