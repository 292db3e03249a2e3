//! Emulated instrument families.
//!
//! Every family implements [`Instrument`]: one trimmed command line in,
//! one response string out. The transport neither knows nor cares which
//! dialect is behind the trait; [`InstrumentKind`] is the selectable
//! roster and the factory that builds a boxed instance.

pub mod amplifier;
pub mod climate;
pub mod optimus;
pub mod positioner;

use std::sync::Arc;

use clap::ValueEnum;

use crate::clock::Clock;
use crate::error::AppResult;

pub use amplifier::{Bba150, Empower};
pub use climate::{RampedSetpoint, Vc37060, Votsch, VotschModel};
pub use optimus::Optimus;
pub use positioner::{Identity, IdnStyle, Positioner, Profile};

/// A simulated instrument: one command line in, one response out.
pub trait Instrument: Send {
    /// Short family label for logs.
    fn name(&self) -> &str;

    /// React to one command line. An empty response means the transport
    /// writes nothing back.
    fn respond(&mut self, line: &str) -> String;
}

/// Instrument families selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InstrumentKind {
    /// Vötsch Vc climate chamber (temperature monitor).
    Vc,
    /// Vötsch Vt climate chamber (temperature monitor).
    Vt,
    /// Vötsch Vc³ 7060 climate chamber with ramped setpoints.
    Vc37060,
    /// Innco CO3000 rotary-disc controller.
    RotaryDisc,
    /// Maturo NCD positioner controller.
    Ncd,
    /// Rohde & Schwarz BBA150 RF amplifier.
    Bba150,
    /// Empower RF amplifier.
    Empower,
    /// Optimus probe positioner.
    Optimus,
}

impl InstrumentKind {
    /// TCP port the family listens on by default. The RF amplifiers use
    /// the SCPI raw-socket port, everything else shares 2049.
    pub fn default_port(self) -> u16 {
        match self {
            InstrumentKind::Bba150 | InstrumentKind::Empower => 5025,
            _ => 2049,
        }
    }

    /// Response line terminator. Every current family answers with a
    /// bare carriage return.
    pub fn response_eol(self) -> &'static str {
        "\r"
    }

    /// Build a fresh instrument of this family.
    ///
    /// `offset` feeds the positioner adjustment policy and is ignored by
    /// families that have none.
    pub fn build(self, clock: Arc<dyn Clock>, offset: f64) -> AppResult<Box<dyn Instrument>> {
        Ok(match self {
            InstrumentKind::Vc => Box::new(Votsch::new(VotschModel::Vc)?),
            InstrumentKind::Vt => Box::new(Votsch::new(VotschModel::Vt)?),
            InstrumentKind::Vc37060 => Box::new(Vc37060::new(clock)?),
            InstrumentKind::RotaryDisc => Box::new(Positioner::innco_co3000(clock, offset)?),
            InstrumentKind::Ncd => Box::new(Positioner::maturo_ncd(clock, offset)?),
            InstrumentKind::Bba150 => Box::new(Bba150::new()?),
            InstrumentKind::Empower => Box::new(Empower::new()?),
            InstrumentKind::Optimus => Box::new(Optimus::new()?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;

    #[test]
    fn test_ports_per_family() {
        assert_eq!(InstrumentKind::Vc.default_port(), 2049);
        assert_eq!(InstrumentKind::RotaryDisc.default_port(), 2049);
        assert_eq!(InstrumentKind::Bba150.default_port(), 5025);
        assert_eq!(InstrumentKind::Empower.default_port(), 5025);
    }

    #[test]
    fn test_every_family_builds() {
        for kind in [
            InstrumentKind::Vc,
            InstrumentKind::Vt,
            InstrumentKind::Vc37060,
            InstrumentKind::RotaryDisc,
            InstrumentKind::Ncd,
            InstrumentKind::Bba150,
            InstrumentKind::Empower,
            InstrumentKind::Optimus,
        ] {
            let instrument = kind.build(Arc::new(SystemClock), 0.0);
            assert!(instrument.is_ok(), "family {kind:?} failed to build");
        }
    }
}
