//! Screen acquisition is delegated to `grim` (and `slurp` for interactive
//! region selection); this module only runs them and decodes their PNG
//! output.

use std::process::{Command, Stdio};

use image::RgbaImage;
use thiserror::Error;

const GRIM_COMMAND: &str = "grim";
const SLURP_COMMAND: &str = "slurp";

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("command failed: {command}: {message}")]
    CommandFailed { command: String, message: String },
    #[error("command io error: {command}")]
    CommandIo {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid capture selection: {message}")]
    InvalidSelection { message: String },
    #[error("failed to decode captured image: {message}")]
    ImageReadFailed { message: String },
}

/// Raw process calls behind a capture. Each capture call returns PNG bytes.
pub trait CaptureBackend {
    fn run_full_capture(&self) -> Result<Vec<u8>, CaptureError>;
    fn run_region_selection(&self) -> Result<String, CaptureError>;
    fn run_region_capture(&self, geometry: &str) -> Result<Vec<u8>, CaptureError>;
}

/// Source of captures for the controller; runs on a worker thread.
pub trait CaptureSource: Send + Sync {
    fn capture_full(&self) -> Result<RgbaImage, CaptureError>;
    fn capture_region(&self) -> Result<RgbaImage, CaptureError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemCaptureBackend;

impl CaptureBackend for SystemCaptureBackend {
    fn run_full_capture(&self) -> Result<Vec<u8>, CaptureError> {
        run_command_output(GRIM_COMMAND, &["-t", "png", "-"])
    }

    fn run_region_selection(&self) -> Result<String, CaptureError> {
        let stdout = run_command_output(SLURP_COMMAND, &[])?;
        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }

    fn run_region_capture(&self, geometry: &str) -> Result<Vec<u8>, CaptureError> {
        run_command_output(GRIM_COMMAND, &["-t", "png", "-g", geometry, "-"])
    }
}

impl<B> CaptureSource for B
where
    B: CaptureBackend + Send + Sync,
{
    fn capture_full(&self) -> Result<RgbaImage, CaptureError> {
        capture_full_with(self)
    }

    fn capture_region(&self) -> Result<RgbaImage, CaptureError> {
        capture_region_with(self)
    }
}

pub fn capture_full_with<B: CaptureBackend + ?Sized>(
    backend: &B,
) -> Result<RgbaImage, CaptureError> {
    let png = backend.run_full_capture()?;
    let image = decode_png(&png)?;
    tracing::info!(width = image.width(), height = image.height(), "captured full screen");
    Ok(image)
}

pub fn capture_region_with<B: CaptureBackend + ?Sized>(
    backend: &B,
) -> Result<RgbaImage, CaptureError> {
    let raw_geometry = backend.run_region_selection()?;
    let geometry = raw_geometry.trim();
    if geometry.is_empty() {
        return Err(CaptureError::InvalidSelection {
            message: "region selection returned no geometry".to_string(),
        });
    }
    validate_geometry(geometry)?;

    let png = backend.run_region_capture(geometry)?;
    let image = decode_png(&png)?;
    tracing::info!(
        geometry,
        width = image.width(),
        height = image.height(),
        "captured screen region"
    );
    Ok(image)
}

/// Accepts the `X,Y WxH` form printed by `slurp`.
fn validate_geometry(geometry: &str) -> Result<(), CaptureError> {
    let invalid = || CaptureError::InvalidSelection {
        message: format!("unexpected region geometry: {geometry}"),
    };
    let (origin, size) = geometry.split_once(' ').ok_or_else(invalid)?;
    let (x, y) = origin.split_once(',').ok_or_else(invalid)?;
    let (width, height) = size.split_once('x').ok_or_else(invalid)?;
    x.parse::<i32>().map_err(|_| invalid())?;
    y.parse::<i32>().map_err(|_| invalid())?;
    let width = width.parse::<u32>().map_err(|_| invalid())?;
    let height = height.parse::<u32>().map_err(|_| invalid())?;
    if width == 0 || height == 0 {
        return Err(CaptureError::InvalidSelection {
            message: format!("region has zero size: {geometry}"),
        });
    }
    Ok(())
}

fn decode_png(bytes: &[u8]) -> Result<RgbaImage, CaptureError> {
    image::load_from_memory_with_format(bytes, image::ImageFormat::Png)
        .map(|image| image.to_rgba8())
        .map_err(|err| CaptureError::ImageReadFailed {
            message: err.to_string(),
        })
}

fn run_command_output(command: &str, args: &[&str]) -> Result<Vec<u8>, CaptureError> {
    let output = Command::new(command)
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|err| CaptureError::CommandIo {
            command: command.to_string(),
            source: err,
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(CaptureError::CommandFailed {
            command: command.to_string(),
            message: format!("exit status: {}; stderr: {}", output.status, stderr.trim()),
        });
    }

    if output.stdout.is_empty() {
        return Err(CaptureError::CommandFailed {
            command: command.to_string(),
            message: "command produced no stdout output".to_string(),
        });
    }

    Ok(output.stdout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::io::Cursor;

    struct FakeCaptureBackend {
        png: Vec<u8>,
        region_selection: String,
        fail_full_capture: bool,
        calls: RefCell<Vec<String>>,
    }

    impl FakeCaptureBackend {
        fn new(region_selection: &str) -> Self {
            let image = RgbaImage::from_pixel(3, 2, image::Rgba([1, 2, 3, 255]));
            let mut png = Vec::new();
            image
                .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
                .unwrap();
            Self {
                png,
                region_selection: region_selection.to_string(),
                fail_full_capture: false,
                calls: RefCell::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }
    }

    impl CaptureBackend for FakeCaptureBackend {
        fn run_full_capture(&self) -> Result<Vec<u8>, CaptureError> {
            self.calls.borrow_mut().push("grim -".to_string());
            if self.fail_full_capture {
                return Err(CaptureError::CommandFailed {
                    command: "grim".to_string(),
                    message: "no outputs".to_string(),
                });
            }
            Ok(self.png.clone())
        }

        fn run_region_selection(&self) -> Result<String, CaptureError> {
            self.calls.borrow_mut().push("slurp".to_string());
            Ok(self.region_selection.clone())
        }

        fn run_region_capture(&self, geometry: &str) -> Result<Vec<u8>, CaptureError> {
            self.calls.borrow_mut().push(format!("grim -g {geometry} -"));
            Ok(self.png.clone())
        }
    }

    #[test]
    fn capture_full_decodes_backend_png() {
        let backend = FakeCaptureBackend::new("");
        let image = capture_full_with(&backend).expect("full capture");
        assert_eq!(image.dimensions(), (3, 2));
        assert_eq!(backend.calls(), vec!["grim -"]);
    }

    #[test]
    fn capture_full_propagates_command_failure() {
        let mut backend = FakeCaptureBackend::new("");
        backend.fail_full_capture = true;
        let err = capture_full_with(&backend).unwrap_err();
        assert!(matches!(err, CaptureError::CommandFailed { .. }));
    }

    #[test]
    fn capture_region_passes_trimmed_geometry_to_grim() {
        let backend = FakeCaptureBackend::new("10,20 300x200\n");
        let image = capture_region_with(&backend).expect("region capture");
        assert_eq!(image.dimensions(), (3, 2));
        assert_eq!(backend.calls(), vec!["slurp", "grim -g 10,20 300x200 -"]);
    }

    #[test]
    fn capture_region_rejects_empty_selection() {
        let backend = FakeCaptureBackend::new("  \n");
        let err = capture_region_with(&backend).unwrap_err();
        assert!(matches!(err, CaptureError::InvalidSelection { .. }));
        assert_eq!(backend.calls(), vec!["slurp"]);
    }

    #[test]
    fn capture_region_rejects_malformed_or_empty_geometry() {
        for selection in ["garbage", "1,2 0x5", "a,b 3x3"] {
            let backend = FakeCaptureBackend::new(selection);
            let err = capture_region_with(&backend).unwrap_err();
            assert!(matches!(err, CaptureError::InvalidSelection { .. }), "{selection}");
        }
    }

    #[test]
    fn decode_png_reports_invalid_bytes() {
        let err = decode_png(b"not a png").unwrap_err();
        assert!(matches!(err, CaptureError::ImageReadFailed { .. }));
    }
}
