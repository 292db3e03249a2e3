//! # Socket Instrument Library
//!
//! Emulators for the laboratory instruments our test benches talk to,
//! served over plain TCP so control software can be exercised without
//! the hardware. Each emulator speaks the ASCII dialect of its real
//! counterpart closely enough that the controlling side cannot tell the
//! difference, including the quirks.
//!
//! ## Crate Structure
//!
//! - **`clock`**: The `Clock` trait that makes motion and ramp timing
//!   injectable, with a `ManualClock` for tests.
//! - **`config`**: Settings loaded from a TOML file and environment
//!   variables via `figment`.
//! - **`device`**: Moving parts shared by the positioner families: the
//!   rotary `Axis` with time-based motion and the mast/stand.
//! - **`dispatch`**: The ordered command table mapping pattern strings
//!   to handler functions, and the refusal/sentinel machinery.
//! - **`error`**: The crate-wide `EmulatorError` enum.
//! - **`format`**: Wire number formats (zero-padded fields, float
//!   echoes) and printable rendering of control characters for logs.
//! - **`instruments`**: The emulated families: Innco and Maturo
//!   positioners, Vötsch climate cabinets, the BBA150 and Empower RF
//!   amplifiers, and the Optimus measurement robot.
//! - **`pattern`**: The tiny `{num}`/`{name}` placeholder language the
//!   command tables are written in.
//! - **`server`**: The single-client TCP loop that frames lines and
//!   writes replies.

pub mod clock;
pub mod config;
pub mod device;
pub mod dispatch;
pub mod error;
pub mod format;
pub mod instruments;
pub mod pattern;
pub mod server;
