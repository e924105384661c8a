pub mod backend;
pub mod board;
pub mod config;
pub mod error;
pub mod gpio;
pub mod panel;

pub use backend::{MockGpioBackend, SysfsBackend};
pub use board::{BoardDescriptor, BoardModel, PinMap};
pub use config::AppConfig;
pub use error::AppError;
pub use gpio::{Direction, GpioBackend, GpioController, PinLevel};
pub use panel::{Panel, PinLayout, Snapshot};
