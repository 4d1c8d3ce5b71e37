//! Alarm monitor implementation

use vigil_protocol::AlarmSummary;

use crate::config::{AlarmConfig, ThresholdConfig};
use crate::time::{elapsed, Tick};

/// Monitored alarm conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Condition {
    /// Systolic or diastolic above bound
    BloodPressure,
    /// Temperature above bound
    Temperature,
    /// Pulse below bound
    Pulse,
    /// Battery below bound
    Battery,
    /// EKG frequency above bound
    Ekg,
}

impl Condition {
    pub const COUNT: usize = 5;

    pub const ALL: [Condition; Self::COUNT] = [
        Condition::BloodPressure,
        Condition::Temperature,
        Condition::Pulse,
        Condition::Battery,
        Condition::Ekg,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Bit in [`AlarmSummary::active`]
    pub fn bit(self) -> u8 {
        1 << self.index()
    }
}

/// Hysteresis state of one condition
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConditionState {
    #[default]
    Normal,
    OutOfRange,
    /// Out of range but acknowledged within the window
    Suppressed,
}

/// Latest values an evaluation looks at
///
/// `None` means the signal is disabled or has no sample yet; such a
/// condition evaluates as Normal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AlarmInputs {
    pub temperature: Option<u32>,
    pub systolic: Option<u32>,
    pub diastolic: Option<u32>,
    pub pulse: Option<u32>,
    pub ekg_frequency: Option<u32>,
    pub battery: u16,
}

/// Last acknowledgment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AckRecord {
    /// Tick the acknowledgment was granted
    pub granted_at: Option<Tick>,
    /// Not yet consumed by an evaluation
    pub pending: bool,
}

impl AckRecord {
    /// Within `window` ticks of the grant
    pub fn is_fresh(&self, now: Tick, window: Tick) -> bool {
        self.granted_at
            .is_some_and(|granted| elapsed(now, granted) < window)
    }
}

/// Alarm state machine for all conditions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmMonitor {
    thresholds: ThresholdConfig,
    config: AlarmConfig,
    states: [ConditionState; Condition::COUNT],
    strikes: [u32; Condition::COUNT],
    ack: AckRecord,
}

impl AlarmMonitor {
    pub fn new(thresholds: ThresholdConfig, config: AlarmConfig) -> Self {
        Self {
            thresholds,
            config,
            states: [ConditionState::Normal; Condition::COUNT],
            strikes: [0; Condition::COUNT],
            ack: AckRecord::default(),
        }
    }

    pub fn state(&self, condition: Condition) -> ConditionState {
        self.states[condition.index()]
    }

    /// Cumulative transitions into OutOfRange
    pub fn strikes(&self, condition: Condition) -> u32 {
        self.strikes[condition.index()]
    }

    pub fn ack(&self) -> AckRecord {
        self.ack
    }

    /// Record an acknowledgment at `now`
    ///
    /// Re-acknowledging refreshes the grant tick.
    pub fn acknowledge(&mut self, now: Tick) {
        self.ack = AckRecord {
            granted_at: Some(now),
            pending: true,
        };
    }

    fn out_of_range(&self, condition: Condition, inputs: &AlarmInputs) -> bool {
        let t = &self.thresholds;
        let above = |value: Option<u32>, max: u32| value.is_some_and(|v| v > max);
        match condition {
            Condition::BloodPressure => {
                above(inputs.systolic, t.systolic_max) || above(inputs.diastolic, t.diastolic_max)
            }
            Condition::Temperature => above(inputs.temperature, t.temperature_max),
            Condition::Pulse => inputs.pulse.is_some_and(|v| v < t.pulse_min),
            Condition::Battery => inputs.battery < t.battery_min,
            Condition::Ekg => above(inputs.ekg_frequency, t.ekg_freq_max),
        }
    }

    fn trip(&mut self, condition: Condition) {
        let i = condition.index();
        self.states[i] = ConditionState::OutOfRange;
        self.strikes[i] = self.strikes[i].saturating_add(1);
        info!("alarm {} tripped, strike {}", condition, self.strikes[i]);
    }

    /// Evaluate every condition at `now`
    pub fn evaluate(&mut self, now: Tick, inputs: &AlarmInputs) {
        let window = self.config.ack_window;
        let fresh = self.ack.is_fresh(now, window);

        for condition in Condition::ALL {
            let out = self.out_of_range(condition, inputs);
            match (self.states[condition.index()], out) {
                (_, false) => self.states[condition.index()] = ConditionState::Normal,
                (ConditionState::Normal, true) => self.trip(condition),
                (ConditionState::Suppressed, true) if !fresh => self.trip(condition),
                (ConditionState::OutOfRange | ConditionState::Suppressed, true) => {}
            }
        }

        if self.ack.pending {
            self.ack.pending = false;
            if fresh {
                for state in self.states.iter_mut() {
                    if *state == ConditionState::OutOfRange {
                        *state = ConditionState::Suppressed;
                    }
                }
            }
        }
    }

    /// Blink half-period of a condition's indicator
    pub fn blink_period(&self, condition: Condition) -> Tick {
        match condition {
            Condition::BloodPressure => 1,
            Condition::Temperature => 2,
            Condition::Pulse => 4,
            Condition::Battery => self.config.battery_blink,
            Condition::Ekg => self.config.ekg_blink,
        }
    }

    /// Whether a condition's indicator is lit at `now`
    ///
    /// OutOfRange blinks, Suppressed is steady, Normal is dark.
    pub fn indicator(&self, condition: Condition, now: Tick) -> bool {
        match self.state(condition) {
            ConditionState::Normal => false,
            ConditionState::Suppressed => true,
            ConditionState::OutOfRange => (now / self.blink_period(condition).max(1)) % 2 == 0,
        }
    }

    /// Bitmask of conditions not Normal
    pub fn active(&self) -> u8 {
        Condition::ALL
            .iter()
            .filter(|c| self.state(**c) != ConditionState::Normal)
            .fold(0, |bits, c| bits | c.bit())
    }

    pub fn summary(&self, battery: u16) -> AlarmSummary {
        AlarmSummary {
            active: self.active(),
            strikes: self.strikes,
            battery,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn monitor() -> AlarmMonitor {
        AlarmMonitor::new(ThresholdConfig::default(), AlarmConfig::default())
    }

    fn bench_inputs() -> AlarmInputs {
        AlarmInputs {
            temperature: Some(75),
            systolic: Some(80),
            diastolic: Some(80),
            pulse: Some(50),
            ekg_frequency: Some(300),
            battery: 200,
        }
    }

    #[test]
    fn test_initial_evaluation() {
        let mut alarms = monitor();
        alarms.evaluate(1, &bench_inputs());
        assert_eq!(alarms.state(Condition::BloodPressure), ConditionState::Normal);
        assert_eq!(alarms.state(Condition::Temperature), ConditionState::OutOfRange);
        assert_eq!(alarms.state(Condition::Pulse), ConditionState::OutOfRange);
        assert_eq!(alarms.state(Condition::Battery), ConditionState::Normal);
        assert_eq!(alarms.state(Condition::Ekg), ConditionState::Normal);
        assert_eq!(alarms.strikes(Condition::BloodPressure), 0);
    }

    #[test]
    fn test_blood_pressure_ack_window() {
        let mut alarms = monitor();
        let mut inputs = bench_inputs();
        alarms.evaluate(1, &inputs);

        inputs.systolic = Some(180);
        alarms.evaluate(2, &inputs);
        assert_eq!(alarms.strikes(Condition::BloodPressure), 1);
        assert_eq!(alarms.state(Condition::BloodPressure), ConditionState::OutOfRange);

        alarms.acknowledge(3);
        alarms.evaluate(3, &inputs);
        assert_eq!(alarms.strikes(Condition::BloodPressure), 1);
        assert_eq!(alarms.state(Condition::BloodPressure), ConditionState::Suppressed);

        alarms.evaluate(30, &inputs);
        assert_eq!(alarms.strikes(Condition::BloodPressure), 2);
        assert_eq!(alarms.state(Condition::BloodPressure), ConditionState::OutOfRange);
    }

    #[test]
    fn test_diastolic_alone_trips() {
        let mut alarms = monitor();
        let mut inputs = bench_inputs();
        inputs.diastolic = Some(95);
        alarms.evaluate(1, &inputs);
        assert_eq!(alarms.state(Condition::BloodPressure), ConditionState::OutOfRange);
    }

    #[test]
    fn test_ack_does_not_presuppress_later_trips() {
        let mut alarms = monitor();
        let mut inputs = AlarmInputs {
            battery: 200,
            ..Default::default()
        };
        alarms.acknowledge(1);
        alarms.evaluate(1, &inputs);
        assert!(!alarms.ack().pending);

        inputs.temperature = Some(40);
        alarms.evaluate(2, &inputs);
        assert_eq!(alarms.state(Condition::Temperature), ConditionState::OutOfRange);
    }

    #[test]
    fn test_stale_ack_is_ignored() {
        let mut alarms = monitor();
        alarms.acknowledge(0);
        alarms.evaluate(25, &bench_inputs());
        assert_eq!(alarms.state(Condition::Pulse), ConditionState::OutOfRange);
    }

    #[test]
    fn test_missing_samples_are_normal() {
        let mut alarms = monitor();
        alarms.evaluate(1, &AlarmInputs {
            battery: 10,
            ..Default::default()
        });
        assert_eq!(alarms.active(), Condition::Battery.bit());
    }

    #[test]
    fn test_returns_to_normal() {
        let mut alarms = monitor();
        let mut inputs = bench_inputs();
        alarms.evaluate(1, &inputs);
        inputs.pulse = Some(72);
        alarms.evaluate(2, &inputs);
        assert_eq!(alarms.state(Condition::Pulse), ConditionState::Normal);
        assert_eq!(alarms.strikes(Condition::Pulse), 1);
    }

    #[test]
    fn test_indicator_blinks_until_acknowledged() {
        let mut alarms = monitor();
        alarms.evaluate(4, &bench_inputs());
        // Pulse blinks with half-period 4
        assert!(!alarms.indicator(Condition::Pulse, 4));
        assert!(alarms.indicator(Condition::Pulse, 8));
        assert!(!alarms.indicator(Condition::BloodPressure, 8));

        alarms.acknowledge(9);
        alarms.evaluate(9, &bench_inputs());
        assert!(alarms.indicator(Condition::Pulse, 12));
        assert!(alarms.indicator(Condition::Pulse, 13));
    }

    #[test]
    fn test_summary() {
        let mut alarms = monitor();
        alarms.evaluate(1, &bench_inputs());
        let summary = alarms.summary(150);
        assert_eq!(
            summary.active,
            Condition::Temperature.bit() | Condition::Pulse.bit()
        );
        assert_eq!(summary.strikes, [0, 1, 1, 0, 0]);
        assert_eq!(summary.battery, 150);
    }

    proptest! {
        #[test]
        fn test_suppressed_exactly_within_window(ack_at in 0u32..1000, offset in 0u32..60) {
            let mut alarms = monitor();
            let mut inputs = bench_inputs();
            inputs.systolic = Some(200);
            alarms.evaluate(ack_at, &inputs);
            alarms.acknowledge(ack_at);
            alarms.evaluate(ack_at, &inputs);
            prop_assert_eq!(alarms.strikes(Condition::BloodPressure), 1);

            let now = ack_at + offset;
            alarms.evaluate(now, &inputs);
            let window = AlarmConfig::default().ack_window;
            if offset < window {
                prop_assert_eq!(alarms.state(Condition::BloodPressure), ConditionState::Suppressed);
                prop_assert_eq!(alarms.strikes(Condition::BloodPressure), 1);
            } else {
                prop_assert_eq!(alarms.state(Condition::BloodPressure), ConditionState::OutOfRange);
                prop_assert_eq!(alarms.strikes(Condition::BloodPressure), 2);
            }
        }
    }
}
