//! Configuration validation using Validation.
//!
//! Every rule is evaluated and all violations are reported together.

use super::error::{ConfigError, ConfigViolation};
use super::AppConfig;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

type Check = Validation<(), NonEmptyVec<ConfigViolation>>;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

fn check(ok: bool, violation: impl FnOnce() -> ConfigViolation) -> Check {
    if ok {
        Validation::success(())
    } else {
        Validation::fail(violation())
    }
}

fn non_empty(field: &'static str, value: &str) -> Check {
    check(!value.trim().is_empty(), || ConfigViolation::EmptyField { field })
}

impl AppConfig {
    /// Evaluate every rule, accumulating ALL violations.
    pub fn validate(&self) -> Validation<(), NonEmptyVec<ConfigViolation>> {
        let camera = &self.camera;
        let quality = self.output.jpeg_quality;
        let level = self.logging.level.to_ascii_lowercase();

        let checks = vec![
            non_empty("camera.ip", &camera.ip),
            non_empty("camera.camera_id", &camera.camera_id),
            check(camera.port != 0, || ConfigViolation::InvalidPort),
            check(camera.protocol.eq_ignore_ascii_case("rtsp"), || {
                ConfigViolation::UnsupportedProtocol(camera.protocol.clone())
            }),
            check(camera.timeout > 0, || ConfigViolation::ZeroTimeout),
            check((1..=100).contains(&quality), || {
                ConfigViolation::JpegQualityOutOfRange(quality)
            }),
            check(LOG_LEVELS.contains(&level.as_str()), || {
                ConfigViolation::UnknownLogLevel(self.logging.level.clone())
            }),
        ];

        Validation::all_vec(checks).map(|_| ())
    }

    /// Consume the configuration, returning it only if it is valid.
    pub fn validated(self) -> Result<Self, ConfigError> {
        match self.validate() {
            Validation::Success(_) => Ok(self),
            Validation::Failure(errors) => {
                Err(ConfigError::Invalid(errors.iter().cloned().collect()))
            }
        }
    }
}
