use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;

use crate::board::BoardModel;
use crate::error::AppError;
use crate::gpio::{GpioBackend, GpioController, PinLevel};

/// Polled view of both state vectors, in slot order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub outputs: Vec<PinLevel>,
    pub inputs: Vec<PinLevel>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PinLayout {
    pub model: BoardModel,
    pub inputs: Vec<u32>,
    pub outputs: Vec<u32>,
}

/// What the front-end consumes: periodic state snapshots and user toggle
/// requests, serialized through one mutex around the controller so a poll
/// loop and a command source can share it.
pub struct Panel<B: GpioBackend> {
    controller: Mutex<GpioController<B>>,
    poll_interval: Duration,
}

impl<B: GpioBackend> Panel<B> {
    pub fn new(controller: GpioController<B>, poll_interval: Duration) -> Self {
        Self {
            controller: Mutex::new(controller),
            poll_interval,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn pin_layout(&self) -> PinLayout {
        let controller = self.controller.lock();
        PinLayout {
            model: controller.model(),
            inputs: controller.input_pins().to_vec(),
            outputs: controller.output_pins().to_vec(),
        }
    }

    pub fn snapshot(&self) -> Result<Snapshot, AppError> {
        let mut controller = self.controller.lock();
        controller.refresh()?;
        Ok(Snapshot {
            outputs: controller.output_state().to_vec(),
            inputs: controller.input_state().to_vec(),
        })
    }

    /// Flips the stored level for the slot, then re-asserts it onto the
    /// line. A failed write reverts the flip so the stored state still
    /// matches the hardware.
    pub fn request_change(&self, index: usize) -> Result<PinLevel, AppError> {
        let mut controller = self.controller.lock();
        let level = controller.toggle_output(index)?;
        if let Err(e) = controller.change(index) {
            // reverting our own flip of a known level cannot fail
            let _ = controller.toggle_output(index);
            return Err(e);
        }
        Ok(level)
    }

    /// Consumes the panel and releases the lines, returning the collected
    /// per-pin warnings.
    pub fn release(self) -> Vec<AppError> {
        self.controller.into_inner().unexport()
    }
}
