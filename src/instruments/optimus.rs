//! Optimus antenna measurement robot.
//!
//! Plain-word command set: two linear axes (x, y in millimetres) and two
//! rotary axes (phi, theta in degrees). Axes power up unreferenced and
//! report no position until `mv_to_zero` or an explicit move has given
//! them one; `status` refuses with `nack` until every axis is referenced.

use std::sync::Arc;

use crate::dispatch::{Command, CommandSet, Refusal, Response, Sentinel};
use crate::error::AppResult;
use crate::instruments::Instrument;

/// Four-axis measurement robot.
pub struct Optimus {
    commands: Arc<CommandSet<Optimus>>,
    x: Option<f64>,
    y: Option<f64>,
    phi: Option<f64>,
    theta: Option<f64>,
    x_status: i32,
    y_status: i32,
    phi_status: i32,
    theta_status: i32,
    sensor_power: i32,
    motor_power: i32,
}

impl Optimus {
    /// A robot fresh from power-up: no axis referenced yet.
    pub fn new() -> AppResult<Self> {
        let commands = CommandSet::builder(Sentinel::Fixed("nack"))
            .bind("mv_to_zero", opt_zero_all)
            .bind("move_x_to {num}", opt_move_x)
            .bind("move_y_to {num}", opt_move_y)
            .bind("rotate_phi_to {num}", opt_rotate_phi)
            .bind("rotate_theta_to {num}", opt_rotate_theta)
            .bind("*IDN?", opt_identity)
            .bind("status", opt_status)
            .build()?;
        Ok(Self {
            commands: Arc::new(commands),
            x: None,
            y: None,
            phi: None,
            theta: None,
            x_status: 0,
            y_status: 0,
            phi_status: 0,
            theta_status: 0,
            sensor_power: 0,
            motor_power: 0,
        })
    }
}

impl Instrument for Optimus {
    fn name(&self) -> &str {
        "Optimus"
    }

    fn respond(&mut self, line: &str) -> String {
        let commands = Arc::clone(&self.commands);
        commands.dispatch(self, line)
    }
}

/// Reference run: drives every axis to its zero mark.
fn opt_zero_all(r: &mut Optimus, _cmd: &Command<'_>) -> Response {
    r.x = Some(0.0);
    r.y = Some(0.0);
    r.phi = Some(0.0);
    r.theta = Some(0.0);
    Ok("ack".to_string())
}

fn opt_move_x(r: &mut Optimus, cmd: &Command<'_>) -> Response {
    r.x = Some(cmd.num(0)?);
    Ok("ok".to_string())
}

fn opt_move_y(r: &mut Optimus, cmd: &Command<'_>) -> Response {
    r.y = Some(cmd.num(0)?);
    Ok("ok".to_string())
}

fn opt_rotate_phi(r: &mut Optimus, cmd: &Command<'_>) -> Response {
    r.phi = Some(cmd.num(0)?);
    Ok("ok".to_string())
}

fn opt_rotate_theta(r: &mut Optimus, cmd: &Command<'_>) -> Response {
    r.theta = Some(cmd.num(0)?);
    Ok("ok".to_string())
}

fn opt_identity(_r: &mut Optimus, _cmd: &Command<'_>) -> Response {
    Ok("Ericsson, Optimus, 123, PA1".to_string())
}

/// Power flags, then position and drive status per axis. Unreferenced
/// axes have no position to report, so the whole query refuses.
fn opt_status(r: &mut Optimus, _cmd: &Command<'_>) -> Response {
    let (Some(x), Some(y), Some(phi), Some(theta)) = (r.x, r.y, r.phi, r.theta) else {
        return Err(Refusal::NotSupported);
    };
    Ok(format!(
        "{}, {}, {:.1} ({}), {:.1} ({}), {:.1} ({}), {:.1} ({})",
        r.sensor_power,
        r.motor_power,
        x,
        r.x_status,
        y,
        r.y_status,
        phi,
        r.phi_status,
        theta,
        r.theta_status,
    ))
}
