use crate::error::{ensure_positive, ConfigError};
use serde::{Deserialize, Serialize};

/// Driver commands for a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DriverInput {
    pub throttle: f64,
    pub brake: f64,
    pub steering: f64,
}

/// A time-ordered driver-input trace, one sample per simulation tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ManoeuvreChannels")]
pub struct Manoeuvre {
    steering: Vec<f64>,
    throttle: Vec<f64>,
    brake: Vec<f64>,
    time: Vec<f64>,
}

impl Manoeuvre {
    /// Builds a manoeuvre from four equally long channels.
    ///
    /// Steering must lie in `[-1, 1]`; throttle and brake in `[0, 1]`;
    /// timestamps must be finite and never decrease.
    pub fn new(
        steering: Vec<f64>,
        throttle: Vec<f64>,
        brake: Vec<f64>,
        time: Vec<f64>,
    ) -> Result<Self, ConfigError> {
        let expected = time.len();
        for (channel, samples) in [
            ("steering", &steering),
            ("throttle", &throttle),
            ("brake", &brake),
        ] {
            if samples.len() != expected {
                return Err(ConfigError::ManoeuvreLength {
                    channel,
                    expected,
                    actual: samples.len(),
                });
            }
        }

        check_range("steering", &steering, -1.0, 1.0)?;
        check_range("throttle", &throttle, 0.0, 1.0)?;
        check_range("brake", &brake, 0.0, 1.0)?;
        if let Some((index, &value)) = time.iter().enumerate().find(|(_, t)| !t.is_finite()) {
            return Err(ConfigError::InputOutOfRange {
                channel: "time",
                index,
                value,
                min: f64::NEG_INFINITY,
                max: f64::INFINITY,
            });
        }
        if let Some(index) = (1..time.len()).find(|&i| time[i] < time[i - 1]) {
            return Err(ConfigError::InputOutOfRange {
                channel: "time",
                index,
                value: time[index],
                min: time[index - 1],
                max: f64::INFINITY,
            });
        }

        Ok(Self {
            steering,
            throttle,
            brake,
            time,
        })
    }

    /// Holds `input` for `steps` ticks sampled at `frequency`.
    pub fn constant(steps: usize, frequency: f64, input: DriverInput) -> Result<Self, ConfigError> {
        let dt = 1.0 / ensure_positive("frequency", frequency)?;
        Self::new(
            vec![input.steering; steps],
            vec![input.throttle; steps],
            vec![input.brake; steps],
            (0..steps).map(|i| i as f64 * dt).collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<DriverInput> {
        Some(DriverInput {
            throttle: *self.throttle.get(index)?,
            brake: *self.brake.get(index)?,
            steering: *self.steering.get(index)?,
        })
    }

    pub fn time(&self) -> &[f64] {
        &self.time
    }

    pub fn iter(&self) -> impl Iterator<Item = DriverInput> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i))
    }
}

#[derive(Deserialize)]
struct ManoeuvreChannels {
    steering: Vec<f64>,
    throttle: Vec<f64>,
    brake: Vec<f64>,
    time: Vec<f64>,
}

impl TryFrom<ManoeuvreChannels> for Manoeuvre {
    type Error = ConfigError;

    fn try_from(raw: ManoeuvreChannels) -> Result<Self, Self::Error> {
        Self::new(raw.steering, raw.throttle, raw.brake, raw.time)
    }
}

fn check_range(
    channel: &'static str,
    samples: &[f64],
    min: f64,
    max: f64,
) -> Result<(), ConfigError> {
    match samples
        .iter()
        .enumerate()
        .find(|(_, v)| !(min..=max).contains(*v))
    {
        Some((index, &value)) => Err(ConfigError::InputOutOfRange {
            channel,
            index,
            value,
            min,
            max,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::{DriverInput, Manoeuvre};
    use crate::error::ConfigError;

    #[test]
    fn constant_manoeuvre_samples_at_frequency() {
        let input = DriverInput {
            throttle: 0.4,
            brake: 0.0,
            steering: -0.2,
        };
        let manoeuvre = Manoeuvre::constant(5, 100.0, input).expect("manoeuvre");
        assert_eq!(manoeuvre.len(), 5);
        assert_eq!(manoeuvre.get(4), Some(input));
        assert_eq!(manoeuvre.get(5), None);
        assert!((manoeuvre.time()[4] - 0.04).abs() < 1e-12);
        assert_eq!(manoeuvre.iter().count(), 5);
    }

    #[test]
    fn rejects_mismatched_channels() {
        let err = Manoeuvre::new(vec![0.0; 3], vec![0.0; 2], vec![0.0; 3], vec![0.0; 3])
            .expect_err("length mismatch");
        assert_eq!(
            err,
            ConfigError::ManoeuvreLength {
                channel: "throttle",
                expected: 3,
                actual: 2,
            }
        );
    }

    #[test]
    fn rejects_inputs_out_of_range() {
        let err = Manoeuvre::new(vec![0.0, 1.5], vec![0.0; 2], vec![0.0; 2], vec![0.0, 0.1])
            .expect_err("steering out of range");
        assert!(matches!(
            err,
            ConfigError::InputOutOfRange {
                channel: "steering",
                index: 1,
                ..
            }
        ));

        assert!(Manoeuvre::new(vec![0.0], vec![f64::NAN], vec![0.0], vec![0.0]).is_err());
        assert!(Manoeuvre::new(vec![0.0], vec![0.0], vec![-0.1], vec![0.0]).is_err());
        assert!(Manoeuvre::constant(3, 0.0, DriverInput::default()).is_err());
    }

    #[test]
    fn rejects_timestamps_that_go_backwards() {
        let err = Manoeuvre::new(
            vec![0.0; 4],
            vec![0.0; 4],
            vec![0.0; 4],
            vec![0.0, 0.01, 0.005, 0.02],
        )
        .expect_err("time went backwards");
        assert_eq!(
            err,
            ConfigError::InputOutOfRange {
                channel: "time",
                index: 2,
                value: 0.005,
                min: 0.01,
                max: f64::INFINITY,
            }
        );

        // Repeated timestamps are still ordered.
        assert!(Manoeuvre::new(vec![0.0; 2], vec![0.0; 2], vec![0.0; 2], vec![0.1, 0.1]).is_ok());
    }

    #[test]
    fn deserializes_from_channel_document() {
        let manoeuvre: Manoeuvre = serde_json::from_str(
            r#"{"steering":[0.0,0.1],"throttle":[1.0,1.0],"brake":[0.0,0.0],"time":[0.0,0.001]}"#,
        )
        .expect("deserialize");
        assert_eq!(manoeuvre.get(1).map(|input| input.steering), Some(0.1));

        let invalid = serde_json::from_str::<Manoeuvre>(
            r#"{"steering":[0.0],"throttle":[2.0],"brake":[0.0],"time":[0.0]}"#,
        );
        assert!(invalid.is_err());
    }
}
