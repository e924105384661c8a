use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

use crate::error::AppError;
use crate::gpio::{Direction, GpioBackend};

/// In-memory board for tests. Models the inverting output drivers on the
/// MIC isolation stage: a write drives the pad to the complement of the
/// written value, and reads always return the pad level. Claims, releases
/// and injected faults are observable through the helper methods.
#[derive(Default)]
pub struct MockGpioBackend {
    pins: Mutex<HashMap<u32, MockPinState>>, // keyed by line number
    claim_log: Mutex<Vec<u32>>,
    release_log: Mutex<Vec<u32>>,
    failing_claims: Mutex<HashSet<u32>>,
    failing_reads: Mutex<HashSet<u32>>,
    failing_writes: Mutex<HashSet<u32>>,
}

#[derive(Clone, Copy, Default)]
struct MockPinState {
    claimed: bool,
    direction: Option<Direction>,
    level: u8, // raw pad level, what a value-file read returns
}

impl MockGpioBackend {
    /// Sets the raw pad level directly, simulating an external signal.
    pub fn set_level(&self, pin: u32, level: u8) {
        let mut pins = self.pins.lock().unwrap_or_else(PoisonError::into_inner);
        pins.entry(pin).or_default().level = level & 1;
    }

    pub fn level(&self, pin: u32) -> Option<u8> {
        let pins = self.pins.lock().unwrap_or_else(PoisonError::into_inner);
        pins.get(&pin).map(|state| state.level)
    }

    pub fn is_claimed(&self, pin: u32) -> bool {
        let pins = self.pins.lock().unwrap_or_else(PoisonError::into_inner);
        pins.get(&pin).is_some_and(|state| state.claimed)
    }

    /// Claims in the order they were issued, across the backend's lifetime.
    pub fn claim_log(&self) -> Vec<u32> {
        self.claim_log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn release_log(&self) -> Vec<u32> {
        self.release_log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn fail_claims(&self, pins: &[u32]) {
        self.failing_claims
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(pins);
    }

    pub fn fail_reads(&self, pins: &[u32]) {
        self.failing_reads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(pins);
    }

    pub fn fail_writes(&self, pins: &[u32]) {
        self.failing_writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(pins);
    }

    pub fn clear_failures(&self) {
        for set in [&self.failing_claims, &self.failing_reads, &self.failing_writes] {
            set.lock().unwrap_or_else(PoisonError::into_inner).clear();
        }
    }

    fn is_failing(set: &Mutex<HashSet<u32>>, pin: u32) -> bool {
        set.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&pin)
    }
}

impl GpioBackend for MockGpioBackend {
    fn claim(&self, pin: u32) -> Result<(), AppError> {
        if Self::is_failing(&self.failing_claims, pin) {
            return Err(AppError::Gpio(format!("claim pin {pin}: injected failure")));
        }
        let mut pins = self
            .pins
            .lock()
            .map_err(|e| AppError::Gpio(format!("lock poisoned: {e}")))?;
        let entry = pins.entry(pin).or_default();
        if entry.claimed {
            return Err(AppError::Gpio(format!("pin {pin}: device or resource busy")));
        }
        entry.claimed = true;
        self.claim_log
            .lock()
            .map_err(|e| AppError::Gpio(format!("lock poisoned: {e}")))?
            .push(pin);
        Ok(())
    }

    fn release(&self, pin: u32) -> Result<(), AppError> {
        let mut pins = self
            .pins
            .lock()
            .map_err(|e| AppError::Gpio(format!("lock poisoned: {e}")))?;
        match pins.get_mut(&pin) {
            Some(entry) if entry.claimed => {
                entry.claimed = false;
                entry.direction = None;
                self.release_log
                    .lock()
                    .map_err(|e| AppError::Gpio(format!("lock poisoned: {e}")))?
                    .push(pin);
                Ok(())
            }
            _ => Err(AppError::Gpio(format!("pin {pin}: invalid argument"))),
        }
    }

    fn set_direction(&self, pin: u32, direction: Direction) -> Result<(), AppError> {
        let mut pins = self
            .pins
            .lock()
            .map_err(|e| AppError::Gpio(format!("lock poisoned: {e}")))?;
        match pins.get_mut(&pin) {
            Some(entry) if entry.claimed => {
                entry.direction = Some(direction);
                Ok(())
            }
            _ => Err(AppError::Gpio(format!("pin {pin}: no such device"))),
        }
    }

    fn read_value(&self, pin: u32) -> Result<u8, AppError> {
        if Self::is_failing(&self.failing_reads, pin) {
            return Err(AppError::Gpio(format!("read pin {pin}: injected failure")));
        }
        let pins = self
            .pins
            .lock()
            .map_err(|e| AppError::Gpio(format!("lock poisoned: {e}")))?;
        match pins.get(&pin) {
            Some(entry) if entry.claimed => Ok(entry.level),
            _ => Err(AppError::Gpio(format!("pin {pin}: no such device"))),
        }
    }

    fn write_value(&self, pin: u32, value: u8) -> Result<(), AppError> {
        if Self::is_failing(&self.failing_writes, pin) {
            return Err(AppError::Gpio(format!("write pin {pin}: injected failure")));
        }
        if value > 1 {
            return Err(AppError::Gpio(format!("pin {pin}: value must be 0 or 1")));
        }
        let mut pins = self
            .pins
            .lock()
            .map_err(|e| AppError::Gpio(format!("lock poisoned: {e}")))?;
        match pins.get_mut(&pin) {
            Some(entry) if entry.claimed => {
                if entry.direction != Some(Direction::Out) {
                    return Err(AppError::Gpio(format!(
                        "pin {pin}: operation not permitted"
                    )));
                }
                // inverting driver: the pad settles at the complement
                entry.level = 1 - value;
                Ok(())
            }
            _ => Err(AppError::Gpio(format!("pin {pin}: no such device"))),
        }
    }
}
