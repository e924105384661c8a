use std::fs;
use std::path::PathBuf;

use crate::error::AppError;
use crate::gpio::{Direction, GpioBackend};

/// Speaks the legacy numeric-pin protocol under a sysfs GPIO root
/// (`/sys/class/gpio` on a real board): decimal line numbers written to
/// `export`/`unexport`, direction and value as one short file per line.
pub struct SysfsBackend {
    root: PathBuf,
}

impl SysfsBackend {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    fn pin_file(&self, pin: u32, name: &str) -> PathBuf {
        self.root.join(format!("gpio{pin}")).join(name)
    }
}

impl GpioBackend for SysfsBackend {
    fn claim(&self, pin: u32) -> Result<(), AppError> {
        fs::write(self.root.join("export"), pin.to_string())
            .map_err(|e| AppError::Gpio(format!("export pin {pin}: {e}")))
    }

    fn release(&self, pin: u32) -> Result<(), AppError> {
        fs::write(self.root.join("unexport"), pin.to_string())
            .map_err(|e| AppError::Gpio(format!("unexport pin {pin}: {e}")))
    }

    fn set_direction(&self, pin: u32, direction: Direction) -> Result<(), AppError> {
        fs::write(self.pin_file(pin, "direction"), direction.as_str())
            .map_err(|e| AppError::Gpio(format!("set direction on pin {pin}: {e}")))
    }

    fn read_value(&self, pin: u32) -> Result<u8, AppError> {
        let contents = fs::read_to_string(self.pin_file(pin, "value"))
            .map_err(|e| AppError::Gpio(format!("read pin {pin}: {e}")))?;
        match contents.trim_end() {
            "0" => Ok(0),
            "1" => Ok(1),
            other => Err(AppError::Gpio(format!(
                "pin {pin}: unexpected value {other:?}"
            ))),
        }
    }

    fn write_value(&self, pin: u32, value: u8) -> Result<(), AppError> {
        fs::write(self.pin_file(pin, "value"), if value == 0 { "0" } else { "1" })
            .map_err(|e| AppError::Gpio(format!("write pin {pin}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    // A scratch directory mimicking an already-populated sysfs tree: the
    // kernel normally creates gpioN/ in response to the export write, here
    // the test lays it out up front.
    fn scratch_root(tag: &str) -> PathBuf {
        let root = std::env::temp_dir().join(format!("micdio-sysfs-{tag}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&root);
        fs::create_dir_all(root.join("gpio63")).unwrap();
        fs::write(root.join("export"), "").unwrap();
        fs::write(root.join("unexport"), "").unwrap();
        fs::write(root.join("gpio63/direction"), "in").unwrap();
        fs::write(root.join("gpio63/value"), "0\n").unwrap();
        root
    }

    fn read(path: &Path) -> String {
        fs::read_to_string(path).unwrap()
    }

    #[test]
    fn claim_and_release_write_the_line_number() {
        let root = scratch_root("claim");
        let backend = SysfsBackend::new(&root);
        backend.claim(63).unwrap();
        assert_eq!(read(&root.join("export")), "63");
        backend.release(63).unwrap();
        assert_eq!(read(&root.join("unexport")), "63");
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn direction_and_value_files_carry_expected_bytes() {
        let root = scratch_root("files");
        let backend = SysfsBackend::new(&root);
        backend.set_direction(63, Direction::Out).unwrap();
        assert_eq!(read(&root.join("gpio63/direction")), "out");
        backend.write_value(63, 1).unwrap();
        assert_eq!(read(&root.join("gpio63/value")), "1");
        backend.write_value(63, 0).unwrap();
        assert_eq!(read(&root.join("gpio63/value")), "0");
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn value_read_tolerates_trailing_newline() {
        let root = scratch_root("read");
        let backend = SysfsBackend::new(&root);
        assert_eq!(backend.read_value(63).unwrap(), 0);
        fs::write(root.join("gpio63/value"), "1\n").unwrap();
        assert_eq!(backend.read_value(63).unwrap(), 1);
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn garbage_value_payload_is_rejected() {
        let root = scratch_root("garbage");
        let backend = SysfsBackend::new(&root);
        fs::write(root.join("gpio63/value"), "maybe").unwrap();
        assert!(matches!(backend.read_value(63), Err(AppError::Gpio(_))));
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn missing_line_directory_surfaces_as_gpio_error() {
        let root = scratch_root("missing");
        let backend = SysfsBackend::new(&root);
        assert!(matches!(backend.read_value(149), Err(AppError::Gpio(_))));
        assert!(
            matches!(backend.set_direction(149, Direction::In), Err(AppError::Gpio(_)))
        );
        let _ = fs::remove_dir_all(&root);
    }
}
