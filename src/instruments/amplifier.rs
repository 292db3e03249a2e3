//! RF power amplifiers.
//!
//! [`Bba150`] speaks a SCPI-flavoured dialect and is deliberately
//! permissive: commands are matched case-insensitively and anything
//! unrecognised still gets a placeholder answer, so sequencer scripts
//! probing optional subsystems keep running. [`Empower`] uses terse
//! two-letter commands, matched case-sensitively, and carries real
//! state for its gain and control mode.

use std::sync::Arc;

use crate::dispatch::{Command, CommandSet, Response, Sentinel};
use crate::error::AppResult;
use crate::instruments::Instrument;

// ============================================================================
// Rohde & Schwarz BBA150
// ============================================================================

/// Broadband amplifier with a fixed, canned SCPI surface.
pub struct Bba150 {
    commands: Arc<CommandSet<Bba150>>,
}

impl Bba150 {
    /// A BBA150 answering its documented queries with plausible values.
    pub fn new() -> AppResult<Self> {
        let commands = CommandSet::builder(Sentinel::Fixed(""))
            .fold_case()
            .bind("*IDN?", bba_identity)
            .bind("SENS:NFR?", bba_frequency_range)
            .bind("UNIT:POW DBM", bba_accept_unit)
            .bind("SENS:NPOW?", bba_nominal_power)
            .bind("SYST:ERR?", bba_system_error)
            .bind("CONT1:AMOD:FGA?", bba_fixed_gain)
            .catch_all(bba_default)
            .build()?;
        Ok(Self {
            commands: Arc::new(commands),
        })
    }
}

impl Instrument for Bba150 {
    fn name(&self) -> &str {
        "BBA150"
    }

    fn respond(&mut self, line: &str) -> String {
        let commands = Arc::clone(&self.commands);
        commands.dispatch(self, line)
    }
}

fn bba_identity(_a: &mut Bba150, _cmd: &Command<'_>) -> Response {
    Ok("Rohde & Schwarz,simulated BBA150,102044,SW:01.96,FPGA:01.05".to_string())
}

fn bba_frequency_range(_a: &mut Bba150, _cmd: &Command<'_>) -> Response {
    // Lower and upper band edge in Hz.
    Ok("2600000000,5900000000".to_string())
}

fn bba_accept_unit(_a: &mut Bba150, _cmd: &Command<'_>) -> Response {
    Ok(String::new())
}

fn bba_nominal_power(_a: &mut Bba150, _cmd: &Command<'_>) -> Response {
    Ok("47.7".to_string())
}

fn bba_system_error(_a: &mut Bba150, _cmd: &Command<'_>) -> Response {
    Ok("Simulated error".to_string())
}

fn bba_fixed_gain(_a: &mut Bba150, _cmd: &Command<'_>) -> Response {
    Ok("47.7".to_string())
}

/// Queries get a labelled placeholder so the far side always has a value
/// to parse; writes are swallowed.
fn bba_default(_a: &mut Bba150, cmd: &Command<'_>) -> Response {
    if cmd.text().ends_with('?') {
        Ok(format!("example BBS150 response value for '{}'", cmd.text()))
    } else {
        Ok(String::new())
    }
}

// ============================================================================
// Empower
// ============================================================================

/// How the Empower amplifier derives its output level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GainControlMode {
    /// Voltage variable attenuator: gain follows the commanded value.
    Vva,
    /// Automatic level control: output power is regulated.
    Alc,
}

/// Empower RF amplifier with settable gain and control mode.
pub struct Empower {
    commands: Arc<CommandSet<Empower>>,
    /// Gain as a fraction of full scale; the wire carries percent.
    gain: f64,
    mode: GainControlMode,
    active: bool,
}

impl Empower {
    /// An Empower amplifier in standby, VVA mode, zero gain.
    pub fn new() -> AppResult<Self> {
        let commands = CommandSet::builder(Sentinel::Fixed(""))
            .bind("IN?", emp_unit_model)
            .bind("IM", emp_manufacturer)
            .bind("IS?", emp_serial_number)
            .bind("IV?", emp_firmware_version)
            .bind("G?", emp_query_gain)
            .bind("G{num}", emp_set_gain)
            .bind("MA", emp_mode_alc)
            .bind("MV", emp_mode_vva)
            .bind("MS", emp_standby)
            .bind("MO", emp_operate)
            .bind("M?", emp_query_mode)
            .catch_all(emp_default)
            .build()?;
        Ok(Self {
            commands: Arc::new(commands),
            gain: 0.0,
            mode: GainControlMode::Vva,
            active: false,
        })
    }

    /// Whether the amplifier stage is switched on (MO) or in standby (MS).
    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl Instrument for Empower {
    fn name(&self) -> &str {
        "Empower"
    }

    fn respond(&mut self, line: &str) -> String {
        let commands = Arc::clone(&self.commands);
        commands.dispatch(self, line)
    }
}

fn emp_unit_model(_a: &mut Empower, _cmd: &Command<'_>) -> Response {
    Ok("BBS3G6QHM".to_string())
}

fn emp_manufacturer(_a: &mut Empower, _cmd: &Command<'_>) -> Response {
    // The hardware really does prefix the name with a blank.
    Ok(" Empower RF Systems, Inc.".to_string())
}

fn emp_serial_number(_a: &mut Empower, _cmd: &Command<'_>) -> Response {
    Ok("4711".to_string())
}

fn emp_firmware_version(_a: &mut Empower, _cmd: &Command<'_>) -> Response {
    Ok("4.2".to_string())
}

fn emp_query_gain(a: &mut Empower, _cmd: &Command<'_>) -> Response {
    Ok(format!("{}", (a.gain * 100.0).round() as i64))
}

/// `G<percent>`: the integer part of the argument becomes the gain, for
/// example `G47.7` sets 47 percent.
fn emp_set_gain(a: &mut Empower, cmd: &Command<'_>) -> Response {
    a.gain = cmd.num(0)?.trunc() / 100.0;
    Ok(String::new())
}

fn emp_mode_alc(a: &mut Empower, _cmd: &Command<'_>) -> Response {
    a.mode = GainControlMode::Alc;
    Ok(String::new())
}

fn emp_mode_vva(a: &mut Empower, _cmd: &Command<'_>) -> Response {
    a.mode = GainControlMode::Vva;
    Ok(String::new())
}

fn emp_standby(a: &mut Empower, _cmd: &Command<'_>) -> Response {
    a.active = false;
    Ok(String::new())
}

fn emp_operate(a: &mut Empower, _cmd: &Command<'_>) -> Response {
    a.active = true;
    Ok(String::new())
}

fn emp_query_mode(a: &mut Empower, _cmd: &Command<'_>) -> Response {
    Ok(match a.mode {
        GainControlMode::Vva => "VOA",
        GainControlMode::Alc => "AOA",
    }
    .to_string())
}

fn emp_default(_a: &mut Empower, _cmd: &Command<'_>) -> Response {
    Ok("Default Empower response value".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    // ------------------------------------------------------------------
    // BBA150
    // ------------------------------------------------------------------

    #[test]
    fn test_bba_identity() {
        let mut a = Bba150::new().unwrap();
        assert_eq!(
            a.respond("*IDN?"),
            "Rohde & Schwarz,simulated BBA150,102044,SW:01.96,FPGA:01.05"
        );
    }

    #[test]
    fn test_bba_known_queries() {
        let mut a = Bba150::new().unwrap();
        assert_eq!(a.respond("SENS:NFR?"), "2600000000,5900000000");
        assert_eq!(a.respond("SENS:NPOW?"), "47.7");
        assert_eq!(a.respond("SYST:ERR?"), "Simulated error");
        assert_eq!(a.respond("CONT1:AMOD:FGA?"), "47.7");
    }

    #[test]
    fn test_bba_case_insensitive() {
        let mut a = Bba150::new().unwrap();
        assert_eq!(a.respond("sens:npow?"), "47.7");
        assert_eq!(a.respond("Syst:Err?"), "Simulated error");
        assert_eq!(a.respond("unit:pow dbm"), "");
    }

    #[test]
    fn test_bba_unknown_query_gets_placeholder() {
        let mut a = Bba150::new().unwrap();
        assert_eq!(
            a.respond("CONT2:AMOD:FGA?\r"),
            "example BBS150 response value for 'CONT2:AMOD:FGA?'"
        );
    }

    #[test]
    fn test_bba_unknown_write_is_silent() {
        let mut a = Bba150::new().unwrap();
        assert_eq!(a.respond("CONT1:AMOD FIX"), "");
        assert_eq!(a.respond("OUTP ON"), "");
    }

    // ------------------------------------------------------------------
    // Empower
    // ------------------------------------------------------------------

    #[test]
    fn test_empower_identity_block() {
        let mut a = Empower::new().unwrap();
        assert_eq!(a.respond("IN?"), "BBS3G6QHM");
        assert_eq!(a.respond("IM"), " Empower RF Systems, Inc.");
        assert_eq!(a.respond("IS?"), "4711");
        assert_eq!(a.respond("IV?"), "4.2");
    }

    #[test]
    fn test_empower_gain_roundtrip() {
        let mut a = Empower::new().unwrap();
        assert_eq!(a.respond("G?"), "0");
        assert_eq!(a.respond("G47.7"), "");
        assert_eq!(a.respond("G?"), "47");
        assert_eq!(a.respond("G100"), "");
        assert_eq!(a.respond("G?"), "100");
    }

    #[test]
    fn test_empower_mode_and_power_state() {
        let mut a = Empower::new().unwrap();
        assert_eq!(a.respond("M?"), "VOA");
        assert_eq!(a.respond("MA"), "");
        assert_eq!(a.respond("M?"), "AOA");
        assert_eq!(a.respond("MV"), "");
        assert_eq!(a.respond("M?"), "VOA");
        assert!(!a.is_active());
        a.respond("MO");
        assert!(a.is_active());
        a.respond("MS");
        assert!(!a.is_active());
    }

    #[test]
    fn test_empower_is_case_sensitive() {
        let mut a = Empower::new().unwrap();
        assert_eq!(a.respond("in?"), "Default Empower response value");
        assert_eq!(a.respond("m?"), "Default Empower response value");
    }

    #[test]
    fn test_empower_unknown_gets_default() {
        let mut a = Empower::new().unwrap();
        assert_eq!(a.respond("XYZZY"), "Default Empower response value");
    }
}
