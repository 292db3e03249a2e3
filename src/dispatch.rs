//! First-match-wins command dispatch.
//!
//! A [`CommandSet`] is an ordered table of (pattern, handler) bindings
//! compiled once when an instrument is built. Dispatch walks the table in
//! declaration order, invokes the handler of the first pattern that
//! matches a prefix of the trimmed line, and turns the handler's verdict
//! into wire text. Table order is semantic: overlapping patterns (`LD
//! {num} DG NP GO` vs `LD {name} DV`) resolve to whichever was bound
//! first.
//!
//! Handlers never panic and never bubble process errors. A handler either
//! produces a response string (possibly empty, which the transport
//! suppresses) or a [`Refusal`], which the dispatcher converts to the
//! dialect's sentinel (`E - V`, `E - x`, `nack`, or an explanatory echo).
//! A line matching no pattern at all gets the bad-command sentinel.

use tracing::debug;

use crate::error::AppResult;
use crate::pattern::{Capture, Pattern};

// ============================================================================
// Handler verdicts
// ============================================================================

/// Why a handler declined a command that matched its pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refusal {
    /// The selected device lacks the attribute (speed on an antenna
    /// stand, polarization on a rotary axis).
    NotSupported,
    /// A device-name lookup missed.
    UnknownDevice,
    /// A parameter failed strict validation.
    Malformed,
}

/// Handler outcome: wire text, or a refusal for the dispatcher to render.
pub type Response = Result<String, Refusal>;

/// One command handler over instrument state `S`.
pub type Handler<S> = fn(&mut S, &Command<'_>) -> Response;

// ============================================================================
// Matched command
// ============================================================================

/// A trimmed command line together with its pattern captures.
#[derive(Debug)]
pub struct Command<'a> {
    text: &'a str,
    captures: Vec<Capture>,
}

impl<'a> Command<'a> {
    /// The trimmed line as received, original case.
    pub fn text(&self) -> &'a str {
        self.text
    }

    /// Whitespace-separated words of the line, for dialects that carry a
    /// parameter block after the command word (Vötsch `$01E`).
    pub fn words(&self) -> std::str::SplitWhitespace<'a> {
        self.text.split_whitespace()
    }

    /// The `i`-th captured number.
    pub fn num(&self, i: usize) -> Result<f64, Refusal> {
        match self.captures.get(i) {
            Some(Capture::Number(value)) => Ok(*value),
            _ => Err(Refusal::Malformed),
        }
    }

    /// The `i`-th captured name.
    pub fn name(&self, i: usize) -> Result<&str, Refusal> {
        match self.captures.get(i) {
            Some(Capture::Name(name)) => Ok(name),
            _ => Err(Refusal::Malformed),
        }
    }
}

// ============================================================================
// Sentinels
// ============================================================================

/// Dialect response for lines no handler accepts.
#[derive(Debug, Clone, Copy)]
pub enum Sentinel {
    /// A fixed string (`E - x`, `nack`, or empty for silent dialects).
    Fixed(&'static str),
    /// An explanatory echo: `'<line>' is an unknown command.`
    UnknownEcho,
}

impl Sentinel {
    fn render(&self, line: &str) -> String {
        match self {
            Sentinel::Fixed(text) => (*text).to_string(),
            Sentinel::UnknownEcho => format!("'{line}' is an unknown command."),
        }
    }
}

// ============================================================================
// Command set
// ============================================================================

struct Binding<S> {
    pattern: Pattern,
    handler: Handler<S>,
}

/// Ordered, compiled command table for one instrument family.
pub struct CommandSet<S> {
    bindings: Vec<Binding<S>>,
    fold_case: bool,
    bad_command: Sentinel,
    not_supported: Option<Sentinel>,
}

impl<S> CommandSet<S> {
    /// Start building a table. `bad_command` answers unmatched lines.
    pub fn builder(bad_command: Sentinel) -> CommandSetBuilder<S> {
        CommandSetBuilder {
            bindings: Vec::new(),
            error: None,
            fold_case: false,
            bad_command,
            not_supported: None,
        }
    }

    /// Resolve one line to wire text against `state`.
    pub fn dispatch(&self, state: &mut S, raw: &str) -> String {
        let line = raw.trim();
        for binding in &self.bindings {
            if let Some(captures) = binding.pattern.match_prefix(line, self.fold_case) {
                let command = Command {
                    text: line,
                    captures,
                };
                return match (binding.handler)(state, &command) {
                    Ok(response) => response,
                    Err(refusal) => {
                        debug!(?refusal, command = line, "handler refused command");
                        self.refusal_sentinel(refusal).render(line)
                    }
                };
            }
        }
        debug!(command = line, "no pattern matched command");
        self.bad_command.render(line)
    }

    fn refusal_sentinel(&self, refusal: Refusal) -> Sentinel {
        match refusal {
            Refusal::NotSupported => self.not_supported.unwrap_or(self.bad_command),
            Refusal::UnknownDevice | Refusal::Malformed => self.bad_command,
        }
    }
}

/// Builder for [`CommandSet`]. Pattern compile errors are deferred to
/// [`CommandSetBuilder::build`] so tables read as flat declarations.
pub struct CommandSetBuilder<S> {
    bindings: Vec<Binding<S>>,
    error: Option<crate::error::EmulatorError>,
    fold_case: bool,
    bad_command: Sentinel,
    not_supported: Option<Sentinel>,
}

impl<S> CommandSetBuilder<S> {
    /// Append a binding. Order of calls is match order.
    pub fn bind(mut self, spec: &str, handler: Handler<S>) -> Self {
        if self.error.is_none() {
            match Pattern::compile(spec) {
                Ok(pattern) => self.bindings.push(Binding { pattern, handler }),
                Err(err) => self.error = Some(err),
            }
        }
        self
    }

    /// Append a trailing binding that accepts every line.
    pub fn catch_all(mut self, handler: Handler<S>) -> Self {
        self.bindings.push(Binding {
            pattern: Pattern::catch_all(),
            handler,
        });
        self
    }

    /// Compare literal pattern text case-insensitively.
    pub fn fold_case(mut self) -> Self {
        self.fold_case = true;
        self
    }

    /// Sentinel for [`Refusal::NotSupported`]; defaults to the
    /// bad-command sentinel.
    pub fn not_supported(mut self, sentinel: Sentinel) -> Self {
        self.not_supported = Some(sentinel);
        self
    }

    /// Finish the table, surfacing the first pattern error if any.
    pub fn build(self) -> AppResult<CommandSet<S>> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(CommandSet {
                bindings: self.bindings,
                fold_case: self.fold_case,
                bad_command: self.bad_command,
                not_supported: self.not_supported,
            }),
        }
    }
}
