use std::fmt;
use std::sync::Arc;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::board::BoardModel;
use crate::error::AppError;

/// Line-level operations of the legacy sysfs numeric-pin protocol. One
/// implementation talks to the real filesystem, the mock stands in for a
/// board under test.
pub trait GpioBackend: Send + Sync {
    fn claim(&self, pin: u32) -> Result<(), AppError>;
    fn release(&self, pin: u32) -> Result<(), AppError>;
    fn set_direction(&self, pin: u32, direction: Direction) -> Result<(), AppError>;
    fn read_value(&self, pin: u32) -> Result<u8, AppError>;
    fn write_value(&self, pin: u32, value: u8) -> Result<(), AppError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::In => "in",
            Direction::Out => "out",
        }
    }
}

/// Logical level of one line. `Unknown` is the sentinel recorded when a
/// value read fails; it stays until a later refresh succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PinLevel {
    Low,
    High,
    Unknown,
}

impl PinLevel {
    pub fn from_raw(raw: u8) -> Self {
        if raw == 0 { PinLevel::Low } else { PinLevel::High }
    }

    pub fn inverted(self) -> Self {
        match self {
            PinLevel::Low => PinLevel::High,
            PinLevel::High => PinLevel::Low,
            PinLevel::Unknown => PinLevel::Unknown,
        }
    }

    pub fn as_raw(self) -> Option<u8> {
        match self {
            PinLevel::Low => Some(0),
            PinLevel::High => Some(1),
            PinLevel::Unknown => None,
        }
    }
}

impl fmt::Display for PinLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PinLevel::Low => "0",
            PinLevel::High => "1",
            PinLevel::Unknown => "?",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Constructed,
    Exported,
    Released,
}

/// Owns the digital I/O lines of one detected board.
///
/// Output lines drive through an inverting isolation stage: the stored
/// logical level is always the complement of the raw sysfs value
/// (`stored = 1 - raw`), and `change` writes the stored level back as-is.
///
/// Lifecycle is `new` -> `export` -> any number of `refresh` /
/// `toggle_output` / `change` -> `unexport`. Dropping a still-exported
/// controller releases its lines, but nothing runs on SIGKILL or a crash:
/// lines claimed by a dead process stay exported in sysfs until released
/// externally, and a fresh `export` against them fails on the claim.
pub struct GpioController<B: GpioBackend> {
    model: BoardModel,
    backend: Arc<B>,
    output_pins: Vec<u32>,
    input_pins: Vec<u32>,
    output_state: Vec<PinLevel>,
    input_state: Vec<PinLevel>,
    phase: Phase,
}

impl<B: GpioBackend> GpioController<B> {
    /// Copies the model's line tables. Claims nothing until `export`.
    pub fn new(model: BoardModel, backend: Arc<B>) -> Self {
        let map = model.pin_map();
        Self {
            model,
            backend,
            output_pins: map.outputs.to_vec(),
            input_pins: map.inputs.to_vec(),
            output_state: Vec::new(),
            input_state: Vec::new(),
            phase: Phase::Constructed,
        }
    }

    pub fn model(&self) -> BoardModel {
        self.model
    }

    pub fn output_pins(&self) -> &[u32] {
        &self.output_pins
    }

    pub fn input_pins(&self) -> &[u32] {
        &self.input_pins
    }

    pub fn output_state(&self) -> &[PinLevel] {
        &self.output_state
    }

    pub fn input_state(&self) -> &[PinLevel] {
        &self.input_state
    }

    pub fn is_exported(&self) -> bool {
        self.phase == Phase::Exported
    }

    fn ensure_exported(&self) -> Result<(), AppError> {
        match self.phase {
            Phase::Exported => Ok(()),
            Phase::Constructed => Err(AppError::InvalidState(format!(
                "{} lines not exported yet",
                self.model
            ))),
            Phase::Released => Err(AppError::InvalidState(format!(
                "{} lines already released",
                self.model
            ))),
        }
    }

    /// Claims every line and records its initial state, outputs first.
    /// All-or-nothing: any claim, direction or initial-read failure releases
    /// whatever was already claimed and leaves the controller re-exportable.
    pub fn export(&mut self) -> Result<(), AppError> {
        match self.phase {
            Phase::Constructed => {}
            Phase::Exported => {
                return Err(AppError::Export(format!(
                    "{} lines already claimed",
                    self.model
                )));
            }
            Phase::Released => {
                return Err(AppError::Export(format!(
                    "{} lines already released",
                    self.model
                )));
            }
        }

        let total = self.output_pins.len() + self.input_pins.len();
        let mut claimed: Vec<u32> = Vec::with_capacity(total);
        let mut raw_levels: Vec<u8> = Vec::with_capacity(total);

        let plan = self
            .output_pins
            .iter()
            .map(|&pin| (pin, Direction::Out))
            .chain(self.input_pins.iter().map(|&pin| (pin, Direction::In)));
        for (pin, direction) in plan {
            if let Err(e) = self.backend.claim(pin) {
                self.rollback(&claimed);
                return Err(AppError::Export(format!("claim pin {pin}: {e}")));
            }
            claimed.push(pin);
            if let Err(e) = self.backend.set_direction(pin, direction) {
                self.rollback(&claimed);
                return Err(AppError::Export(format!("set direction on pin {pin}: {e}")));
            }
            match self.backend.read_value(pin) {
                Ok(raw) => raw_levels.push(raw),
                Err(e) => {
                    self.rollback(&claimed);
                    return Err(AppError::Export(format!("initial read of pin {pin}: {e}")));
                }
            }
        }

        let split = self.output_pins.len();
        self.output_state = raw_levels[..split]
            .iter()
            .map(|&raw| PinLevel::from_raw(raw).inverted())
            .collect();
        self.input_state = raw_levels[split..]
            .iter()
            .map(|&raw| PinLevel::from_raw(raw))
            .collect();
        self.phase = Phase::Exported;
        info!(
            "{}: claimed {} output and {} input lines",
            self.model,
            self.output_pins.len(),
            self.input_pins.len()
        );
        Ok(())
    }

    fn rollback(&self, claimed: &[u32]) {
        for &pin in claimed {
            if let Err(e) = self.backend.release(pin) {
                warn!("rollback release of pin {pin}: {e}");
            }
        }
    }

    /// Re-reads every line in slot order, outputs first. A failed read is
    /// logged and recorded as `Unknown` for that slot only; the remaining
    /// slots are still read. Read-only on the hardware.
    pub fn refresh(&mut self) -> Result<(), AppError> {
        self.ensure_exported()?;
        for i in 0..self.output_pins.len() {
            let pin = self.output_pins[i];
            self.output_state[i] = match self.backend.read_value(pin) {
                Ok(raw) => PinLevel::from_raw(raw).inverted(),
                Err(e) => {
                    let err = AppError::Read(format!("output pin {pin}: {e}"));
                    warn!("{err}");
                    PinLevel::Unknown
                }
            };
        }
        for i in 0..self.input_pins.len() {
            let pin = self.input_pins[i];
            self.input_state[i] = match self.backend.read_value(pin) {
                Ok(raw) => PinLevel::from_raw(raw),
                Err(e) => {
                    let err = AppError::Read(format!("input pin {pin}: {e}"));
                    warn!("{err}");
                    PinLevel::Unknown
                }
            };
        }
        Ok(())
    }

    /// Flips the stored logical level for an output slot without touching
    /// the hardware. Pair with `change` to assert the new level.
    pub fn toggle_output(&mut self, index: usize) -> Result<PinLevel, AppError> {
        self.ensure_exported()?;
        let len = self.output_pins.len();
        let slot = self.output_state.get_mut(index).ok_or_else(|| {
            AppError::InvalidPin(format!("output slot {index} out of range 0..{len}"))
        })?;
        *slot = match *slot {
            PinLevel::Low => PinLevel::High,
            PinLevel::High => PinLevel::Low,
            PinLevel::Unknown => {
                return Err(AppError::InvalidState(format!(
                    "output slot {index} level unknown, refresh first"
                )));
            }
        };
        Ok(*slot)
    }

    /// Writes the currently stored level for the slot back to the line,
    /// verbatim. The caller flips the stored level first (`toggle_output`);
    /// with the inverting driver the line then reads back as the complement
    /// and the next refresh confirms the stored level.
    pub fn change(&mut self, index: usize) -> Result<(), AppError> {
        self.ensure_exported()?;
        let len = self.output_pins.len();
        let level = *self.output_state.get(index).ok_or_else(|| {
            AppError::InvalidPin(format!("output slot {index} out of range 0..{len}"))
        })?;
        let raw = level.as_raw().ok_or_else(|| {
            AppError::Write(format!("output slot {index} level unknown, refresh first"))
        })?;
        let pin = self.output_pins[index];
        self.backend
            .write_value(pin, raw)
            .map_err(|e| AppError::Write(format!("pin {pin}: {e}")))
    }

    /// Releases every line, outputs first. Failures are logged and
    /// collected, never fatal: a line already released out from under us
    /// must not take the shutdown path down with it. Terminal: every
    /// operation after this fails with `InvalidState`.
    pub fn unexport(&mut self) -> Vec<AppError> {
        if self.phase != Phase::Exported {
            let warning = AppError::Unexport(format!(
                "{} lines not claimed, nothing to release",
                self.model
            ));
            warn!("{warning}");
            return vec![warning];
        }
        let mut warnings = Vec::new();
        for &pin in self.output_pins.iter().chain(self.input_pins.iter()) {
            if let Err(e) = self.backend.release(pin) {
                let warning = AppError::Unexport(format!("release pin {pin}: {e}"));
                warn!("{warning}");
                warnings.push(warning);
            }
        }
        self.phase = Phase::Released;
        warnings
    }
}

impl<B: GpioBackend> Drop for GpioController<B> {
    fn drop(&mut self) {
        if self.phase == Phase::Exported {
            self.unexport();
        }
    }
}
