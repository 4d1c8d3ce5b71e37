//! Monitor state and the device task table
//!
//! [`SystemState`] owns every buffer and state machine of the monitor and
//! is handed to the scheduler each round inside a [`Monitor`], together
//! with the board's peripherals. [`MonitorTask`] is the closed set of
//! device tasks.

use portable_atomic::{AtomicBool, Ordering};
use vigil_hal::{ControlOutput, SensorInput, Uart};
use vigil_protocol::InitializeCommand;

use crate::alarm::{AlarmInputs, AlarmMonitor};
use crate::comms::CommsPort;
use crate::config::MonitorConfig;
use crate::correction::compute;
use crate::display::{DisplaySink, DisplaySnapshot};
use crate::ekg::EkgState;
use crate::fault::Fault;
use crate::measure::{
    edge_rate, read_ekg_block, read_temperature, CuffOutcome, CuffPhase, Edges, MeasureFlags,
    MeasureTimers, MeasurementBuffers, MeasurementSelect, PressureCycle, Signal,
};
use crate::scheduler::{Round, Scheduler, Task};
use crate::status::BatteryState;
use crate::time::{Periodic, Tick};

/// Arena slot of each device task
pub const TASK_MEASURE: u8 = 0;
pub const TASK_COMPUTE: u8 = 1;
pub const TASK_WARNING: u8 = 2;
pub const TASK_DISPLAY: u8 = 3;
pub const TASK_STATUS: u8 = 4;
pub const TASK_KEYPAD: u8 = 5;
pub const TASK_COMMS: u8 = 6;
pub const TASK_EKG: u8 = 7;

/// Local acknowledge button
///
/// Pressed from interrupt context, consumed by the keypad task.
#[derive(Debug, Default)]
pub struct Keypad {
    ack: AtomicBool,
}

impl Keypad {
    pub const fn new() -> Self {
        Self {
            ack: AtomicBool::new(false),
        }
    }

    pub fn press_ack(&self) {
        self.ack.store(true, Ordering::Release);
    }

    /// Consume a pending press
    pub fn take_ack(&self) -> bool {
        self.ack.swap(false, Ordering::AcqRel)
    }
}

/// Everything the monitor knows
pub struct SystemState<'a> {
    pub config: MonitorConfig,
    /// Edge counters shared with the edge interrupts
    pub edges: &'a Edges,
    /// Progress flags shared with interrupt context
    pub flags: &'a MeasureFlags,
    pub keypad: &'a Keypad,
    pub select: MeasurementSelect,
    pub buffers: MeasurementBuffers,
    pub timers: MeasureTimers,
    pub cuff: PressureCycle,
    pub alarms: AlarmMonitor,
    pub battery: BatteryState,
    pub ekg: EkgState,
    pub patient: InitializeCommand,
    /// Mirror to the remote display
    pub remote_display: bool,
    compute_timer: Periodic,
    warning_timer: Periodic,
    display_timer: Periodic,
}

impl<'a> SystemState<'a> {
    /// Boot state: every measurement enabled and EKG armed
    pub fn new(
        config: MonitorConfig,
        edges: &'a Edges,
        flags: &'a MeasureFlags,
        keypad: &'a Keypad,
    ) -> Self {
        let timing = config.timing;
        flags.set(MeasureFlags::EKG_MEASURE);
        Self {
            edges,
            flags,
            keypad,
            select: MeasurementSelect::default(),
            buffers: MeasurementBuffers::new(),
            timers: MeasureTimers::new(&timing),
            cuff: PressureCycle::new(config.pressure.release_floor),
            alarms: AlarmMonitor::new(config.thresholds, config.alarm),
            battery: BatteryState::new(&config.battery, timing.status_period),
            ekg: EkgState::new(config.ekg),
            patient: InitializeCommand::default(),
            remote_display: false,
            compute_timer: Periodic::new(timing.compute_period),
            warning_timer: Periodic::new(timing.warning_period),
            display_timer: Periodic::new(timing.display_period),
            config,
        }
    }

    /// Latest corrected value of an enabled signal
    pub fn corrected(&self, signal: Signal) -> Option<u32> {
        if self.select.is_enabled(signal) {
            self.buffers.latest_corrected(signal)
        } else {
            None
        }
    }

    /// Latest EKG frequency while EKG is enabled
    pub fn ekg_frequency(&self) -> Option<u32> {
        if self.select.contains(MeasurementSelect::EKG) {
            self.ekg.frequency()
        } else {
            None
        }
    }

    pub fn alarm_inputs(&self) -> AlarmInputs {
        AlarmInputs {
            temperature: self.corrected(Signal::Temperature),
            systolic: self.corrected(Signal::Systolic),
            diastolic: self.corrected(Signal::Diastolic),
            pulse: self.corrected(Signal::Pulse),
            ekg_frequency: self.ekg_frequency(),
            battery: self.battery.level(),
        }
    }

    /// Arm EKG acquisition
    pub fn start_ekg(&mut self) {
        self.select.enable(MeasurementSelect::EKG);
        self.flags.set(MeasureFlags::EKG_MEASURE);
    }

    /// Disarm EKG acquisition and drop the partial window
    pub fn stop_ekg(&mut self) {
        self.select.disable(MeasurementSelect::EKG);
        self.flags.clear(MeasureFlags::EKG_MEASURE);
        self.ekg.disarm(self.flags);
    }

    fn measure<S, O>(&mut self, sensor: &mut S, output: &mut O, now: Tick) -> Result<bool, Fault>
    where
        S: SensorInput,
        O: ControlOutput,
    {
        let tps = self.config.timing.ticks_per_second;
        let mut published = false;

        if self.timers.pulse.due(now) {
            let count = self.edges.pulse.take();
            if self.select.is_enabled(Signal::Pulse) {
                let rate = edge_rate(count, self.timers.pulse.period(), tps);
                self.buffers.publish(Signal::Pulse, rate)?;
                published = true;
            }
        }

        if self.timers.respiration.due(now) {
            let count = self.edges.respiration.take();
            if self.select.is_enabled(Signal::Respiration) {
                let rate = edge_rate(count, self.timers.respiration.period(), tps);
                self.buffers.publish(Signal::Respiration, rate)?;
                published = true;
            }
        }

        if self.timers.temperature.due(now) && self.select.is_enabled(Signal::Temperature) {
            match read_temperature(sensor) {
                Ok(raw) => {
                    self.buffers.publish(Signal::Temperature, raw)?;
                    published = true;
                }
                Err(e) => warn!("temperature read failed: {}", e),
            }
        }

        if !self.select.contains(MeasurementSelect::PRESSURE) {
            if self.cuff.phase() != CuffPhase::Idle {
                self.cuff.abort(output, self.flags);
            }
        } else if self.timers.pressure.due(now) {
            match self.cuff.poll(sensor, output, self.flags) {
                Ok(CuffOutcome::Complete {
                    systolic,
                    diastolic,
                }) => {
                    self.buffers.publish(Signal::Systolic, systolic as u32)?;
                    self.buffers.publish(Signal::Diastolic, diastolic as u32)?;
                    published = true;
                }
                Ok(CuffOutcome::Pending | CuffOutcome::Abandoned) => {}
                Err(e) => {
                    warn!("cuff read failed: {}", e);
                    self.cuff.abort(output, self.flags);
                }
            }
        }

        Ok(published)
    }

    fn sample_ekg<S: SensorInput>(&mut self, sensor: &mut S, now: Tick) -> Result<(), Fault> {
        if self.timers.ekg.due(now) {
            match read_ekg_block(sensor, self.ekg.config().sample_shift) {
                Ok(block) => self.ekg.commit_block(&block, self.flags)?,
                Err(e) => warn!("ekg read failed: {}", e),
            }
        }
        self.ekg.process(self.flags);
        Ok(())
    }
}

/// Per-round context: the state plus the board's peripherals
pub struct Monitor<'a, S, O, U, D> {
    pub state: SystemState<'a>,
    pub sensor: S,
    pub output: O,
    pub link: U,
    pub display: D,
    pub comms: CommsPort,
}

impl<'a, S, O, U, D> Monitor<'a, S, O, U, D> {
    pub fn new(state: SystemState<'a>, sensor: S, output: O, link: U, display: D) -> Self {
        Self {
            state,
            sensor,
            output,
            link,
            display,
            comms: CommsPort::new(),
        }
    }
}

/// Device tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MonitorTask {
    /// Edge-count conversion, temperature and cuff polling
    Measure,
    /// Correct pending samples, then unlink until new samples arrive
    Compute,
    /// Alarm evaluation
    Warning,
    /// Local display refresh
    Display,
    /// Battery decay
    Status,
    /// Local acknowledge button
    Keypad,
    /// Serial link
    Comms,
    /// EKG block acquisition and analysis, unlinked while disarmed
    Ekg,
}

impl MonitorTask {
    /// Every task with its arena slot
    pub const TABLE: [(u8, MonitorTask); 8] = [
        (TASK_MEASURE, MonitorTask::Measure),
        (TASK_COMPUTE, MonitorTask::Compute),
        (TASK_WARNING, MonitorTask::Warning),
        (TASK_DISPLAY, MonitorTask::Display),
        (TASK_STATUS, MonitorTask::Status),
        (TASK_KEYPAD, MonitorTask::Keypad),
        (TASK_COMMS, MonitorTask::Comms),
        (TASK_EKG, MonitorTask::Ekg),
    ];

    /// Tasks queued at boot; compute joins once samples exist
    pub const BOOT: [u8; 7] = [
        TASK_MEASURE,
        TASK_WARNING,
        TASK_DISPLAY,
        TASK_STATUS,
        TASK_KEYPAD,
        TASK_COMMS,
        TASK_EKG,
    ];
}

/// Register the task table and queue the boot set
pub fn install(scheduler: &mut Scheduler<MonitorTask>) -> Result<(), Fault> {
    for (id, task) in MonitorTask::TABLE {
        scheduler.register(id, task)?;
    }
    for id in MonitorTask::BOOT {
        scheduler.request_add(id)?;
    }
    Ok(())
}

impl<S, O, U, D> Task<Monitor<'_, S, O, U, D>> for MonitorTask
where
    S: SensorInput,
    O: ControlOutput,
    U: Uart,
    D: DisplaySink,
{
    fn run(
        &mut self,
        ctx: &mut Monitor<'_, S, O, U, D>,
        round: &mut Round<'_>,
    ) -> Result<(), Fault> {
        let now = round.tick();
        let state = &mut ctx.state;
        match self {
            MonitorTask::Measure => {
                if state.measure(&mut ctx.sensor, &mut ctx.output, now)? {
                    round.request_add(TASK_COMPUTE)?;
                }
            }
            MonitorTask::Compute => {
                if state.compute_timer.due(now) {
                    compute(&mut state.buffers, &state.config.calibration);
                    round.request_remove(TASK_COMPUTE);
                }
            }
            MonitorTask::Warning => {
                if state.warning_timer.due(now) {
                    let inputs = state.alarm_inputs();
                    state.alarms.evaluate(now, &inputs);
                }
            }
            MonitorTask::Display => {
                if state.display_timer.due(now) {
                    let snapshot = DisplaySnapshot::capture(
                        now,
                        &state.buffers,
                        &state.alarms,
                        state.ekg_frequency(),
                        state.battery.level(),
                        state.remote_display,
                    );
                    if let Err(e) = ctx.display.show(&snapshot) {
                        warn!("display refresh failed: {}", e);
                    }
                }
            }
            MonitorTask::Status => {
                state.battery.update(now);
            }
            MonitorTask::Keypad => {
                if state.keypad.take_ack() {
                    info!("alarms acknowledged locally at {}", now);
                    state.alarms.acknowledge(now);
                }
            }
            MonitorTask::Comms => {
                ctx.comms.service(&mut ctx.link, state, round)?;
            }
            MonitorTask::Ekg => {
                if state.flags.contains(MeasureFlags::EKG_MEASURE) {
                    state.sample_ekg(&mut ctx.sensor, now)?;
                } else {
                    round.request_remove(TASK_EKG);
                }
            }
        }
        Ok(())
    }
}
