//! Generic rotary-positioner instrument.
//!
//! One engine serves every positioner dialect: the instrument owns an
//! ordered set of [`Device`]s, a current selection, the retry/offset
//! policy, and a [`Profile`] describing the family's response habits
//! (decimal places, which commands echo, which stay silent). The
//! per-family constructors differ only in their command table, profile,
//! and device roster.
//!
//! Two families are wired up:
//!
//! - **Innco CO3000**: three rotary discs (`DS1`, `DS2`, `AS3`), chatty
//!   dialect that echoes motion targets and new speeds, `E - x` for
//!   anything it does not understand.
//! - **Maturo NCD**: two rotary axes (`1`, `3`) and an antenna stand
//!   (`0`, the power-on selection), terse dialect where writes are
//!   silent, `E - x` for bad commands and `E - V` for attributes the
//!   selected device does not have.

use std::sync::Arc;

use crate::clock::Clock;
use crate::device::{AdjustmentPolicy, AntennaStand, Axis, Device, Polarization};
use crate::dispatch::{Command, CommandSet, Refusal, Response, Sentinel};
use crate::error::AppResult;
use crate::format;
use crate::instruments::Instrument;

// ============================================================================
// Family configuration
// ============================================================================

/// How the identity reply is assembled.
#[derive(Debug, Clone, Copy)]
pub enum IdnStyle {
    /// `vendor,model,serial,firmware`.
    CommaJoined,
    /// `vendor,model_serial`.
    VendorModelSerial,
}

/// Identity strings reported by `*IDN?`.
#[derive(Debug, Clone)]
pub struct Identity {
    /// Manufacturer name.
    pub vendor: &'static str,
    /// Model designation.
    pub model: &'static str,
    /// Serial number.
    pub serial: &'static str,
    /// Firmware revision.
    pub firmware: &'static str,
}

/// Response habits of one positioner family.
#[derive(Debug, Clone)]
pub struct Profile {
    /// Identity assembly style.
    pub idn_style: IdnStyle,
    /// Decimal places of the coarse position query.
    pub position_decimals: usize,
    /// Decimal places of the fine position query, where the family has one.
    pub fine_position_decimals: usize,
    /// Decimal places of limit queries.
    pub limit_decimals: usize,
    /// Decimal places of speed replies.
    pub speed_decimals: usize,
    /// Reply to a successful device selection (`"1"`, or empty for silent).
    pub select_echo: &'static str,
    /// Echo the unadjusted target when a motion command is accepted.
    pub echo_motion_target: bool,
    /// Echo the new speed when it is set.
    pub echo_new_speed: bool,
}

// ============================================================================
// Instrument state
// ============================================================================

/// A positioner instrument: devices, selection, policy, dialect.
pub struct Positioner {
    commands: Arc<CommandSet<Positioner>>,
    label: &'static str,
    identity: Identity,
    profile: Profile,
    devices: Vec<Device>,
    // Index into `devices`; kept valid by `select_device`.
    current: usize,
    policy: AdjustmentPolicy,
    clock: Arc<dyn Clock>,
}

impl Positioner {
    /// Innco CO3000 rotary-disc controller.
    pub fn innco_co3000(clock: Arc<dyn Clock>, offset: f64) -> AppResult<Self> {
        let commands = CommandSet::builder(Sentinel::Fixed("E - x"))
            .bind("*IDN?", identity)
            .bind("*OPT?", list_devices)
            .bind("CP", query_position)
            .bind("WL", query_limit_cw)
            .bind("CL", query_limit_acw)
            .bind("NSP", query_speed)
            .bind("LD {num} DG NP GO", start_motion)
            .bind("LD {name} DV", select_device)
            .bind("BU", query_busy)
            .bind("LD {num} NSP", set_speed)
            .build()?;
        Ok(Self {
            commands: Arc::new(commands),
            label: "CO3000",
            identity: Identity {
                vendor: "innco GmbH",
                model: "CO3000",
                serial: "sim",
                firmware: "1.02.62",
            },
            profile: Profile {
                idn_style: IdnStyle::CommaJoined,
                position_decimals: 1,
                fine_position_decimals: 1,
                limit_decimals: 1,
                speed_decimals: 1,
                select_echo: "1",
                echo_motion_target: true,
                echo_new_speed: true,
            },
            devices: vec![
                Device::Rotary(Axis::new("DS1")),
                Device::Rotary(Axis::new("DS2")),
                Device::Rotary(Axis::new("AS3")),
            ],
            current: 0,
            policy: AdjustmentPolicy {
                offset,
                ..AdjustmentPolicy::default()
            },
            clock,
        })
    }

    /// Maturo NCD positioner controller.
    pub fn maturo_ncd(clock: Arc<dyn Clock>, offset: f64) -> AppResult<Self> {
        let commands = CommandSet::builder(Sentinel::Fixed("E - x"))
            .not_supported(Sentinel::Fixed("E - V"))
            .bind("*IDN?", identity)
            .bind("CP", query_position)
            .bind("RP", query_position_fine)
            .bind("WL", query_limit_cw)
            .bind("CL", query_limit_acw)
            .bind("SP", query_speed)
            .bind("ST", stop)
            .bind("LD {num} DG NP GO", start_motion)
            .bind("LD {num} DG WL", set_limit_cw)
            .bind("LD {num} DG CL", set_limit_acw)
            .bind("LD {name} DV", select_device)
            .bind("BU", query_busy)
            .bind("LD {num} SP", set_speed)
            .bind("PH", polarize_horizontal)
            .bind("PV", polarize_vertical)
            .bind("P?", query_polarization)
            .build()?;
        Ok(Self {
            commands: Arc::new(commands),
            label: "NCD",
            identity: Identity {
                vendor: "Maturo",
                model: "NCD",
                serial: "266",
                firmware: "",
            },
            profile: Profile {
                idn_style: IdnStyle::VendorModelSerial,
                position_decimals: 0,
                fine_position_decimals: 2,
                limit_decimals: 2,
                speed_decimals: 0,
                select_echo: "",
                echo_motion_target: false,
                echo_new_speed: false,
            },
            devices: vec![
                Device::Rotary(Axis::new("1")),
                Device::Rotary(Axis::new("3")),
                Device::Stand(AntennaStand::new("0")),
            ],
            // The NCD powers up talking to its antenna stand.
            current: 2,
            policy: AdjustmentPolicy {
                offset,
                ..AdjustmentPolicy::default()
            },
            clock,
        })
    }

    fn current_axis(&self) -> Result<&Axis, Refusal> {
        self.devices[self.current]
            .as_axis()
            .ok_or(Refusal::NotSupported)
    }

    fn current_axis_mut(&mut self) -> Result<&mut Axis, Refusal> {
        self.devices[self.current]
            .as_axis_mut()
            .ok_or(Refusal::NotSupported)
    }

    fn current_stand(&self) -> Result<&AntennaStand, Refusal> {
        self.devices[self.current]
            .as_stand()
            .ok_or(Refusal::NotSupported)
    }

    fn current_stand_mut(&mut self) -> Result<&mut AntennaStand, Refusal> {
        self.devices[self.current]
            .as_stand_mut()
            .ok_or(Refusal::NotSupported)
    }
}

impl Instrument for Positioner {
    fn name(&self) -> &str {
        self.label
    }

    fn respond(&mut self, line: &str) -> String {
        let commands = Arc::clone(&self.commands);
        commands.dispatch(self, line)
    }
}

// ============================================================================
// Shared handlers
// ============================================================================

fn identity(p: &mut Positioner, _cmd: &Command<'_>) -> Response {
    let id = &p.identity;
    Ok(match p.profile.idn_style {
        IdnStyle::CommaJoined => {
            format!("{},{},{},{}", id.vendor, id.model, id.serial, id.firmware)
        }
        IdnStyle::VendorModelSerial => format!("{},{}_{}", id.vendor, id.model, id.serial),
    })
}

fn list_devices(p: &mut Positioner, _cmd: &Command<'_>) -> Response {
    let names: Vec<&str> = p.devices.iter().map(Device::name).collect();
    Ok(names.join(","))
}

fn query_position(p: &mut Positioner, _cmd: &Command<'_>) -> Response {
    let now = p.clock.now();
    let places = p.profile.position_decimals;
    let axis = p.current_axis_mut()?;
    Ok(format::decimals(axis.position_at(now), places))
}

fn query_position_fine(p: &mut Positioner, _cmd: &Command<'_>) -> Response {
    let now = p.clock.now();
    let places = p.profile.fine_position_decimals;
    let axis = p.current_axis_mut()?;
    Ok(format::decimals(axis.position_at(now), places))
}

fn query_limit_cw(p: &mut Positioner, _cmd: &Command<'_>) -> Response {
    let places = p.profile.limit_decimals;
    Ok(format::decimals(p.current_axis()?.limit_cw(), places))
}

fn query_limit_acw(p: &mut Positioner, _cmd: &Command<'_>) -> Response {
    let places = p.profile.limit_decimals;
    Ok(format::decimals(p.current_axis()?.limit_acw(), places))
}

fn query_speed(p: &mut Positioner, _cmd: &Command<'_>) -> Response {
    let places = p.profile.speed_decimals;
    Ok(format::decimals(p.current_axis()?.speed(), places))
}

fn set_speed(p: &mut Positioner, cmd: &Command<'_>) -> Response {
    let speed = cmd.num(0)?;
    let echo = p.profile.echo_new_speed;
    let places = p.profile.speed_decimals;
    p.current_axis_mut()?.set_speed(speed);
    Ok(if echo {
        format::decimals(speed, places)
    } else {
        String::new()
    })
}

/// Accept a motion command: adjust the target per policy, start the move,
/// and echo the *unadjusted* request where the dialect is chatty.
fn start_motion(p: &mut Positioner, cmd: &Command<'_>) -> Response {
    let requested = cmd.num(0)?;
    let now = p.clock.now();
    let policy = p.policy;
    let echo = p.profile.echo_motion_target;
    let axis = p.current_axis_mut()?;
    let adjustment = policy.adjust(axis, requested, now);
    axis.start_motion(requested + adjustment, now);
    Ok(if echo {
        format::float_echo(requested)
    } else {
        String::new()
    })
}

fn select_device(p: &mut Positioner, cmd: &Command<'_>) -> Response {
    let name = cmd.name(0)?;
    let index = p
        .devices
        .iter()
        .position(|device| device.name() == name)
        .ok_or(Refusal::UnknownDevice)?;
    p.current = index;
    Ok(p.profile.select_echo.to_string())
}

fn query_busy(p: &mut Positioner, _cmd: &Command<'_>) -> Response {
    let now = p.clock.now();
    // Every device gets its recompute; no short-circuit.
    let mut busy = false;
    for device in &mut p.devices {
        busy |= device.is_busy(now);
    }
    Ok(if busy { "1" } else { "0" }.to_string())
}

fn stop(p: &mut Positioner, _cmd: &Command<'_>) -> Response {
    let now = p.clock.now();
    // Stopping a stand is a no-op, not a refusal.
    if let Some(axis) = p.devices[p.current].as_axis_mut() {
        axis.stop(now);
    }
    Ok(String::new())
}

fn set_limit_cw(p: &mut Positioner, cmd: &Command<'_>) -> Response {
    let value = cmd.num(0)?;
    p.current_axis_mut()?.set_limit_cw(value);
    Ok(String::new())
}

fn set_limit_acw(p: &mut Positioner, cmd: &Command<'_>) -> Response {
    let value = cmd.num(0)?;
    p.current_axis_mut()?.set_limit_acw(value);
    Ok(String::new())
}

fn polarize_horizontal(p: &mut Positioner, _cmd: &Command<'_>) -> Response {
    p.current_stand_mut()?
        .set_polarization(Polarization::Horizontal);
    Ok(String::new())
}

fn polarize_vertical(p: &mut Positioner, _cmd: &Command<'_>) -> Response {
    p.current_stand_mut()?
        .set_polarization(Polarization::Vertical);
    Ok(String::new())
}

fn query_polarization(p: &mut Positioner, _cmd: &Command<'_>) -> Response {
    Ok(match p.current_stand()?.polarization() {
        Polarization::Vertical => "1",
        Polarization::Horizontal => "0",
    }
    .to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn innco() -> (Positioner, Arc<ManualClock>) {
        innco_with_offset(0.0)
    }

    fn innco_with_offset(offset: f64) -> (Positioner, Arc<ManualClock>) {
        let clock = ManualClock::new();
        let instrument = Positioner::innco_co3000(Arc::clone(&clock) as Arc<dyn Clock>, offset)
            .unwrap();
        (instrument, clock)
    }

    fn ncd() -> (Positioner, Arc<ManualClock>) {
        let clock = ManualClock::new();
        let instrument =
            Positioner::maturo_ncd(Arc::clone(&clock) as Arc<dyn Clock>, 0.0).unwrap();
        (instrument, clock)
    }

    // ------------------------------------------------------------------
    // Innco CO3000
    // ------------------------------------------------------------------

    #[test]
    fn test_innco_identity() {
        let (mut p, _clock) = innco();
        assert_eq!(p.respond("*IDN?\r"), "innco GmbH,CO3000,sim,1.02.62");
    }

    #[test]
    fn test_innco_option_lists_devices() {
        let (mut p, _clock) = innco();
        assert_eq!(p.respond("*OPT?"), "DS1,DS2,AS3");
    }

    #[test]
    fn test_innco_initial_queries() {
        let (mut p, _clock) = innco();
        assert_eq!(p.respond("CP"), "0.0");
        assert_eq!(p.respond("WL"), "90.0");
        assert_eq!(p.respond("CL"), "-91.0");
        assert_eq!(p.respond("NSP"), "4.9");
        assert_eq!(p.respond("BU"), "0");
    }

    #[test]
    fn test_innco_motion_echoes_unadjusted_target() {
        let (mut p, _clock) = innco();
        assert_eq!(p.respond("LD -123.4 DG NP GO"), "-123.4");
        let (mut p, _clock) = innco_with_offset(1.5);
        assert_eq!(p.respond("LD 100 DG NP GO"), "100.0");
    }

    #[test]
    fn test_innco_motion_lifecycle() {
        let (mut p, clock) = innco();
        p.respond("LD 39.2 DG NP GO");
        assert_eq!(p.respond("BU"), "1");
        clock.advance_secs(5.0);
        // 0.8 * 4.9 * 5 = 19.6 degrees covered.
        assert_eq!(p.respond("CP"), "19.6");
        assert_eq!(p.respond("BU"), "1");
        clock.advance_secs(5.1);
        assert_eq!(p.respond("CP"), "39.2");
        assert_eq!(p.respond("BU"), "0");
    }

    #[test]
    fn test_innco_offset_lands_off_target() {
        let (mut p, clock) = innco_with_offset(1.5);
        assert_eq!(p.respond("LD 50 DG NP GO"), "50.0");
        clock.advance_secs(60.0);
        assert_eq!(p.respond("CP"), "51.5");
    }

    #[test]
    fn test_innco_selection_echoes_one_and_switches() {
        let (mut p, _clock) = innco();
        assert_eq!(p.respond("LD DS2 DV"), "1");
        assert_eq!(p.respond("LD 5.2 NSP"), "5.2");
        assert_eq!(p.respond("NSP"), "5.2");
        // DS1 kept its own speed.
        assert_eq!(p.respond("LD DS1 DV"), "1");
        assert_eq!(p.respond("NSP"), "4.9");
    }

    #[test]
    fn test_innco_unknown_device_is_bad_command() {
        let (mut p, _clock) = innco();
        assert_eq!(p.respond("LD DS9 DV"), "E - x");
    }

    #[test]
    fn test_innco_bad_command() {
        let (mut p, _clock) = innco();
        assert_eq!(p.respond("FLURB"), "E - x");
        assert_eq!(p.respond("LD x DG NP GO"), "E - x");
    }

    #[test]
    fn test_innco_busy_covers_unselected_devices() {
        let (mut p, clock) = innco();
        p.respond("LD 100 DG NP GO");
        assert_eq!(p.respond("LD DS2 DV"), "1");
        // DS1 is still in flight even though DS2 is selected.
        assert_eq!(p.respond("BU"), "1");
        clock.advance_secs(60.0);
        assert_eq!(p.respond("BU"), "0");
    }

    #[test]
    fn test_innco_trailing_garbage_tolerated() {
        let (mut p, _clock) = innco();
        assert_eq!(p.respond("BU  ; "), "0");
        assert_eq!(p.respond("CP  "), "0.0");
    }

    // ------------------------------------------------------------------
    // Maturo NCD
    // ------------------------------------------------------------------

    #[test]
    fn test_ncd_identity() {
        let (mut p, _clock) = ncd();
        assert_eq!(p.respond("*IDN?"), "Maturo,NCD_266");
    }

    #[test]
    fn test_ncd_powers_up_on_antenna_stand() {
        let (mut p, _clock) = ncd();
        assert_eq!(p.respond("SP"), "E - V");
        assert_eq!(p.respond("CP"), "E - V");
        assert_eq!(p.respond("P?"), "0");
    }

    #[test]
    fn test_ncd_sp_with_query_suffix_still_refused_on_stand() {
        let (mut p, _clock) = ncd();
        assert_eq!(p.respond("SP?"), "E - V");
    }

    #[test]
    fn test_ncd_rotary_queries_after_selection() {
        let (mut p, _clock) = ncd();
        assert_eq!(p.respond("LD 1 DV"), "");
        assert_eq!(p.respond("CP"), "0");
        assert_eq!(p.respond("RP"), "0.00");
        assert_eq!(p.respond("WL"), "90.00");
        assert_eq!(p.respond("CL"), "-91.00");
        assert_eq!(p.respond("SP"), "5");
    }

    #[test]
    fn test_ncd_limit_write_and_readback() {
        let (mut p, _clock) = ncd();
        p.respond("LD 1 DV");
        assert_eq!(p.respond("LD 123 DG WL"), "");
        assert_eq!(p.respond("LD -93.2 DG CL"), "");
        assert_eq!(p.respond("WL"), "123.00");
        assert_eq!(p.respond("CL"), "-93.20");
    }

    #[test]
    fn test_ncd_motion_is_silent_and_tracked() {
        let (mut p, clock) = ncd();
        p.respond("LD 3 DV");
        assert_eq!(p.respond("LD 45 DG NP GO"), "");
        assert_eq!(p.respond("BU"), "1");
        clock.advance_secs(60.0);
        assert_eq!(p.respond("BU"), "0");
        assert_eq!(p.respond("CP"), "45");
        assert_eq!(p.respond("RP"), "45.00");
    }

    #[test]
    fn test_ncd_stop_freezes_motion() {
        let (mut p, clock) = ncd();
        p.respond("LD 1 DV");
        p.respond("LD 100 DG NP GO");
        clock.advance_secs(5.0);
        assert_eq!(p.respond("ST"), "");
        assert_eq!(p.respond("BU"), "0");
        // 0.8 * 4.9 * 5 = 19.6, reported without decimals.
        assert_eq!(p.respond("CP"), "20");
        clock.advance_secs(60.0);
        assert_eq!(p.respond("CP"), "20");
    }

    #[test]
    fn test_ncd_stop_on_stand_is_silent_noop() {
        let (mut p, _clock) = ncd();
        assert_eq!(p.respond("ST"), "");
    }

    #[test]
    fn test_ncd_speed_set_is_silent() {
        let (mut p, _clock) = ncd();
        p.respond("LD 1 DV");
        assert_eq!(p.respond("LD 5.2 SP"), "");
        assert_eq!(p.respond("SP"), "5");
    }

    #[test]
    fn test_ncd_polarization_cycle() {
        let (mut p, _clock) = ncd();
        assert_eq!(p.respond("P?"), "0");
        assert_eq!(p.respond("PV"), "");
        assert_eq!(p.respond("P?"), "1");
        assert_eq!(p.respond("PH"), "");
        assert_eq!(p.respond("P?"), "0");
    }

    #[test]
    fn test_ncd_polarization_refused_on_rotary() {
        let (mut p, _clock) = ncd();
        p.respond("LD 1 DV");
        assert_eq!(p.respond("PH"), "E - V");
        assert_eq!(p.respond("PV"), "E - V");
        assert_eq!(p.respond("P?"), "E - V");
    }

    #[test]
    fn test_ncd_motion_refused_on_stand() {
        let (mut p, _clock) = ncd();
        assert_eq!(p.respond("LD 10 DG NP GO"), "E - V");
    }

    #[test]
    fn test_ncd_unknown_device_and_bad_command() {
        let (mut p, _clock) = ncd();
        assert_eq!(p.respond("LD 7 DV"), "E - x");
        assert_eq!(p.respond("gibberish"), "E - x");
    }
}
