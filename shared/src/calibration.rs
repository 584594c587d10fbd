//! Sensor Calibration Engine
//!
//! Simulates a reading for every channel in the calibration table, flags
//! readings that fall outside the channel's range or drift too far, and
//! aggregates the per-channel outcomes into a [`CalibrationReport`].
//!
//! Randomness is injected so a seeded generator reproduces a calibration run.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::{CalibrationReading, Channel, ReadingStatus, RobotSnapshot, SensorMap};

/// Valid range and unit of one channel
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSpec {
    pub channel: Channel,
    pub min: f64,
    pub max: f64,
    pub unit: &'static str,
}

impl ChannelSpec {
    pub fn width(&self) -> f64 {
        self.max - self.min
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Channels calibrated on every robot, in calibration order
pub const CHANNEL_TABLE: [ChannelSpec; 3] = [
    ChannelSpec {
        channel: Channel::Temperature,
        min: -40.0,
        max: 85.0,
        unit: "C",
    },
    ChannelSpec {
        channel: Channel::Proximity,
        min: 0.0,
        max: 500.0,
        unit: "cm",
    },
    ChannelSpec {
        channel: Channel::Pressure,
        min: 0.0,
        max: 1000.0,
        unit: "kPa",
    },
];

/// Tolerances applied during calibration, as fractions of a channel's width
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationProfile {
    /// Bound on the simulated calibration adjustment
    pub max_offset_fraction: f64,
    /// Offsets beyond this are reported as drift
    pub drift_fraction: f64,
}

impl Default for CalibrationProfile {
    fn default() -> Self {
        Self {
            max_offset_fraction: 0.05,
            drift_fraction: 0.10,
        }
    }
}

/// Overall outcome of a calibration run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationStatus {
    Success,
    CompletedWithWarnings,
}

/// Result of calibrating every channel of one robot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationReport {
    pub robot_id: String,
    pub robot_name: String,
    pub timestamp: DateTime<Utc>,
    pub sensors: BTreeMap<Channel, CalibrationReading>,
    pub status: CalibrationStatus,
    /// `"<channel>: <message>"` for each flagged channel, in calibration order
    pub warnings: Vec<String>,
}

impl CalibrationReport {
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Merge the readings into a snapshot and stamp its last calibration
    pub fn apply_to(&self, snapshot: &RobotSnapshot) -> RobotSnapshot {
        let mut next = snapshot.clone();
        for (channel, reading) in &self.sensors {
            next.sensors.insert(channel.clone(), Some(reading.clone()));
        }
        next.last_calibration = Some(self.timestamp);
        next
    }
}

/// Outcome of a sensor health check
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HealthReport {
    pub healthy: bool,
    pub issues: Vec<String>,
}

/// Simulated raw reading for a channel.
///
/// Channels outside the calibration table read 0.
pub fn base_value<R: Rng + ?Sized>(channel: &Channel, rng: &mut R) -> f64 {
    match channel {
        // ambient room temperature, 22 +/- 5
        Channel::Temperature => rng.gen_range(17.0..27.0),
        Channel::Proximity => rng.gen_range(100.0..300.0),
        // atmospheric pressure, 101.3 +/- 5
        Channel::Pressure => rng.gen_range(96.3..106.3),
        Channel::Other(_) => 0.0,
    }
}

/// Simulated calibration adjustment, bounded by the profile's offset fraction
pub fn calibration_offset<R: Rng + ?Sized>(
    spec: &ChannelSpec,
    profile: &CalibrationProfile,
    rng: &mut R,
) -> f64 {
    let max_offset = spec.width() * profile.max_offset_fraction;
    if !(max_offset.is_finite() && max_offset > 0.0) {
        return 0.0;
    }
    rng.gen_range(-max_offset..max_offset)
}

/// Build and classify the reading for one channel.
///
/// The range check runs first and the drift check second; when both fire the
/// drift message is the one kept.
pub fn classify(
    spec: &ChannelSpec,
    profile: &CalibrationProfile,
    raw_value: f64,
    adjustment: f64,
    timestamp: DateTime<Utc>,
) -> CalibrationReading {
    let calibrated_value = raw_value + adjustment;
    let offset = calibrated_value - raw_value;

    let mut reading = CalibrationReading {
        sensor_type: Some(spec.channel.clone()),
        raw_value,
        calibrated_value: Some(Some(calibrated_value)),
        offset,
        unit: spec.unit.to_string(),
        status: ReadingStatus::Ok,
        message: None,
        timestamp,
    };

    if !spec.contains(calibrated_value) {
        reading.flag(format!(
            "Value {}{} outside normal range",
            calibrated_value, spec.unit
        ));
    }

    if offset.abs() > spec.width() * profile.drift_fraction {
        reading.flag(format!(
            "Significant sensor drift detected: {:.2}{}",
            offset, spec.unit
        ));
    }

    reading
}

/// Calibrates robots against a channel table using an injected generator
#[derive(Debug, Clone)]
pub struct CalibrationEngine<R> {
    rng: R,
    channels: Vec<ChannelSpec>,
    profile: CalibrationProfile,
}

impl<R: Rng> CalibrationEngine<R> {
    /// Engine over the standard channel table and default tolerances
    pub fn new(rng: R) -> Self {
        Self {
            rng,
            channels: CHANNEL_TABLE.to_vec(),
            profile: CalibrationProfile::default(),
        }
    }

    pub fn with_profile(mut self, profile: CalibrationProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Replace the channel table
    pub fn with_channels(mut self, channels: Vec<ChannelSpec>) -> Self {
        self.channels = channels;
        self
    }

    pub fn profile(&self) -> &CalibrationProfile {
        &self.profile
    }

    pub fn calibrate(&mut self, snapshot: &RobotSnapshot) -> CalibrationReport {
        self.calibrate_at(snapshot, Utc::now())
    }

    /// Calibrate every channel, stamping readings and report with `timestamp`
    pub fn calibrate_at(
        &mut self,
        snapshot: &RobotSnapshot,
        timestamp: DateTime<Utc>,
    ) -> CalibrationReport {
        let mut sensors = BTreeMap::new();
        let mut warnings = Vec::new();

        for spec in &self.channels {
            let raw = base_value(&spec.channel, &mut self.rng);
            let adjustment = calibration_offset(spec, &self.profile, &mut self.rng);
            let reading = classify(spec, &self.profile, raw, adjustment, timestamp);

            if let (true, Some(message)) = (reading.is_warning(), &reading.message) {
                warnings.push(format!("{}: {}", spec.channel, message));
            }
            sensors.insert(spec.channel.clone(), reading);
        }

        let status = if warnings.is_empty() {
            CalibrationStatus::Success
        } else {
            CalibrationStatus::CompletedWithWarnings
        };

        CalibrationReport {
            robot_id: snapshot.id.clone(),
            robot_name: snapshot.name.clone(),
            timestamp,
            sensors,
            status,
            warnings,
        }
    }
}

/// Check a set of readings, reporting channels without data or with warnings
pub fn validate_health(readings: &SensorMap) -> HealthReport {
    let mut issues = Vec::new();

    for (channel, reading) in readings {
        match reading {
            Some(r) if !r.has_no_data() => {
                if r.is_warning() {
                    let message = r.message.as_deref().unwrap_or("warning");
                    issues.push(format!("{}: {}", channel, message));
                }
            }
            _ => issues.push(format!("{}: No data available", channel)),
        }
    }

    HealthReport {
        healthy: issues.is_empty(),
        issues,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn temperature() -> ChannelSpec {
        CHANNEL_TABLE[0].clone()
    }

    fn robot() -> RobotSnapshot {
        RobotSnapshot::new("r-7", "Surveyor", "sensor-array", None)
    }

    #[test]
    fn test_report_covers_every_channel() {
        let mut engine = CalibrationEngine::new(StdRng::seed_from_u64(7));
        let report = engine.calibrate(&robot());

        assert_eq!(report.robot_id, "r-7");
        assert_eq!(report.robot_name, "Surveyor");
        let channels: Vec<&Channel> = report.sensors.keys().collect();
        assert_eq!(channels, [&Channel::Temperature, &Channel::Proximity, &Channel::Pressure]);

        for (channel, reading) in &report.sensors {
            assert_eq!(reading.sensor_type.as_ref(), Some(channel));
            let calibrated = reading.value().unwrap();
            assert_eq!(reading.offset, calibrated - reading.raw_value);
            assert_eq!(reading.timestamp, report.timestamp);
        }
        assert_eq!(report.sensors[&Channel::Temperature].unit, "C");
        assert_eq!(report.sensors[&Channel::Proximity].unit, "cm");
        assert_eq!(report.sensors[&Channel::Pressure].unit, "kPa");
    }

    #[test]
    fn test_default_tolerances_stay_clean() {
        for seed in 0..200 {
            let mut engine = CalibrationEngine::new(StdRng::seed_from_u64(seed));
            let report = engine.calibrate(&robot());
            assert_eq!(report.status, CalibrationStatus::Success);
            assert!(report.warnings.is_empty());

            for (channel, reading) in &report.sensors {
                let spec = CHANNEL_TABLE.iter().find(|s| &s.channel == channel).unwrap();
                assert!(reading.offset.abs() <= spec.width() * 0.05);
            }
        }
    }

    #[test]
    fn test_seeded_runs_repeat() {
        let at = Utc::now();
        let a = CalibrationEngine::new(StdRng::seed_from_u64(42)).calibrate_at(&robot(), at);
        let b = CalibrationEngine::new(StdRng::seed_from_u64(42)).calibrate_at(&robot(), at);
        assert_eq!(a, b);
    }

    #[test]
    fn test_base_values_within_noise_model() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..500 {
            let t = base_value(&Channel::Temperature, &mut rng);
            assert!((17.0..27.0).contains(&t));
            let p = base_value(&Channel::Proximity, &mut rng);
            assert!((100.0..300.0).contains(&p));
            let kpa = base_value(&Channel::Pressure, &mut rng);
            assert!((96.3..106.3).contains(&kpa));
        }
        assert_eq!(base_value(&Channel::from("humidity"), &mut rng), 0.0);
    }

    #[test]
    fn test_range_warning() {
        let reading = classify(&temperature(), &CalibrationProfile::default(), 84.0, 2.0, Utc::now());
        assert_eq!(reading.status, ReadingStatus::Warning);
        assert_eq!(reading.message.as_deref(), Some("Value 86C outside normal range"));
    }

    #[test]
    fn test_drift_warning() {
        let reading = classify(&temperature(), &CalibrationProfile::default(), 20.0, 13.0, Utc::now());
        assert_eq!(reading.value(), Some(33.0));
        assert_eq!(reading.status, ReadingStatus::Warning);
        assert_eq!(
            reading.message.as_deref(),
            Some("Significant sensor drift detected: 13.00C")
        );

        let pressure = CHANNEL_TABLE[2].clone();
        let reading = classify(&pressure, &CalibrationProfile::default(), 500.0, -150.0, Utc::now());
        assert_eq!(
            reading.message.as_deref(),
            Some("Significant sensor drift detected: -150.00kPa")
        );
    }

    #[test]
    fn test_drift_message_wins_over_range() {
        let reading = classify(&temperature(), &CalibrationProfile::default(), 80.0, 13.0, Utc::now());
        assert!(!temperature().contains(reading.value().unwrap()));
        assert_eq!(reading.status, ReadingStatus::Warning);
        assert_eq!(
            reading.message.as_deref(),
            Some("Significant sensor drift detected: 13.00C")
        );
    }

    #[test]
    fn test_in_range_small_offset_is_ok() {
        let reading = classify(&temperature(), &CalibrationProfile::default(), 21.5, 0.75, Utc::now());
        assert_eq!(reading.status, ReadingStatus::Ok);
        assert!(reading.message.is_none());
    }

    #[test]
    fn test_warnings_follow_channel_order() {
        let loose = CalibrationProfile {
            max_offset_fraction: 0.5,
            drift_fraction: 0.10,
        };
        let mut saw_warning = false;

        for seed in 0..50 {
            let mut engine = CalibrationEngine::new(StdRng::seed_from_u64(seed)).with_profile(loose);
            let report = engine.calibrate(&robot());

            assert_eq!(
                report.status == CalibrationStatus::CompletedWithWarnings,
                report.has_warnings()
            );

            let positions: Vec<usize> = report
                .warnings
                .iter()
                .map(|w| {
                    CHANNEL_TABLE
                        .iter()
                        .position(|s| w.starts_with(&format!("{}: ", s.channel)))
                        .unwrap()
                })
                .collect();
            assert!(positions.windows(2).all(|p| p[0] < p[1]));

            let flagged = report.sensors.values().filter(|r| r.is_warning()).count();
            assert_eq!(flagged, report.warnings.len());
            saw_warning |= report.has_warnings();
        }

        assert!(saw_warning);
    }

    #[test]
    fn test_custom_channel_reads_zero() {
        let humidity = ChannelSpec {
            channel: Channel::from("humidity"),
            min: 0.0,
            max: 100.0,
            unit: "%",
        };
        let mut engine = CalibrationEngine::new(StdRng::seed_from_u64(3))
            .with_channels(vec![humidity.clone()]);
        let report = engine.calibrate(&robot());

        let reading = &report.sensors[&humidity.channel];
        assert_eq!(reading.raw_value, 0.0);
        assert!(reading.offset.abs() <= 5.0);
    }

    #[test]
    fn test_zero_width_channel_has_no_offset() {
        let fixed = ChannelSpec {
            channel: Channel::from("reference"),
            min: 0.0,
            max: 0.0,
            unit: "V",
        };
        let mut rng = StdRng::seed_from_u64(9);
        assert_eq!(calibration_offset(&fixed, &CalibrationProfile::default(), &mut rng), 0.0);
    }

    #[test]
    fn test_oversized_offset_fraction_does_not_overflow() {
        let profile = CalibrationProfile {
            max_offset_fraction: 1e307,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(4);
        assert_eq!(calibration_offset(&temperature(), &profile, &mut rng), 0.0);

        let bogus = CalibrationProfile {
            max_offset_fraction: f64::NAN,
            ..Default::default()
        };
        assert_eq!(calibration_offset(&temperature(), &bogus, &mut rng), 0.0);

        let report = CalibrationEngine::new(StdRng::seed_from_u64(4))
            .with_profile(profile)
            .calibrate(&robot());
        assert_eq!(report.status, CalibrationStatus::Success);
        assert!(report.sensors.values().all(|r| r.offset == 0.0));
    }

    #[test]
    fn test_apply_to_stores_readings() {
        let robot = robot();
        let report = CalibrationEngine::new(StdRng::seed_from_u64(5)).calibrate(&robot);
        let updated = report.apply_to(&robot);

        assert_eq!(updated.last_calibration, Some(report.timestamp));
        for channel in Channel::FIXED {
            assert_eq!(updated.sensors[&channel].as_ref(), report.sensors.get(&channel));
        }
        assert!(robot.last_calibration.is_none());
    }

    #[test]
    fn test_health_reports_missing_data() {
        let report = CalibrationEngine::new(StdRng::seed_from_u64(11)).calibrate(&robot());
        let mut readings = SensorMap::new();
        readings.insert(Channel::Temperature, None);
        readings.insert(
            Channel::Proximity,
            Some(report.sensors[&Channel::Proximity].clone()),
        );

        let health = validate_health(&readings);
        assert!(!health.healthy);
        assert_eq!(health.issues, ["temperature: No data available"]);
    }

    #[test]
    fn test_health_ignores_readings_without_a_value_field() {
        let readings: SensorMap = serde_json::from_value(serde_json::json!({
            "temperature": null,
            "proximity": {"status": "ok"},
        }))
        .unwrap();

        let health = validate_health(&readings);
        assert!(!health.healthy);
        assert_eq!(health.issues, ["temperature: No data available"]);

        let mut typed = SensorMap::new();
        typed.insert(Channel::Temperature, None);
        typed.insert(
            Channel::Proximity,
            Some(CalibrationReading {
                status: ReadingStatus::Ok,
                ..Default::default()
            }),
        );
        assert_eq!(validate_health(&typed), health);
    }

    #[test]
    fn test_health_reports_warnings_and_blank_values() {
        let profile = CalibrationProfile::default();
        let flagged = classify(&temperature(), &profile, 84.0, 2.0, Utc::now());
        let mut blank = classify(&CHANNEL_TABLE[2], &profile, 101.0, 1.0, Utc::now());
        blank.calibrated_value = Some(None);

        let mut readings = SensorMap::new();
        readings.insert(Channel::Pressure, Some(blank));
        readings.insert(Channel::Temperature, Some(flagged));

        let health = validate_health(&readings);
        assert!(!health.healthy);
        assert_eq!(
            health.issues,
            [
                "temperature: Value 86C outside normal range",
                "pressure: No data available",
            ]
        );
    }

    #[test]
    fn test_health_all_clean() {
        let robot = robot();
        let report = CalibrationEngine::new(StdRng::seed_from_u64(2)).calibrate(&robot);
        let health = validate_health(&report.apply_to(&robot).sensors);
        assert!(health.healthy);
        assert!(health.issues.is_empty());

        assert!(validate_health(&SensorMap::new()).healthy);
    }
}
