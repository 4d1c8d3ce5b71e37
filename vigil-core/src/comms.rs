//! Serial link service
//!
//! The comms task drains the link every round, feeds the bytes through a
//! [`FrameReceiver`] into the double [`ComBuffers`], and answers each
//! complete request. Protocol errors are reported back to the sender as
//! Error responses and never stop the monitor.

use vigil_hal::Uart;
use vigil_protocol::messages::resolve_header;
use vigil_protocol::{
    parse_request, ComBuffers, CommandId, Direction, EkgBlock, ErrorCode, FrameReceiver,
    MeasureResponse, Request, Response, StartStopTarget, TaskId,
};

use crate::fault::Fault;
use crate::measure::{MeasurementSelect, Signal};
use crate::scheduler::Round;
use crate::system::{SystemState, TASK_EKG};
use crate::time::Tick;

/// Receive side of the link
pub struct CommsPort {
    receiver: FrameReceiver,
    buffers: ComBuffers,
}

impl Default for CommsPort {
    fn default() -> Self {
        Self::new()
    }
}

impl CommsPort {
    pub fn new() -> Self {
        Self {
            receiver: FrameReceiver::new(),
            buffers: ComBuffers::new(),
        }
    }

    /// Drain the link and answer every complete request
    pub fn service<U: Uart>(
        &mut self,
        link: &mut U,
        state: &mut SystemState<'_>,
        round: &mut Round<'_>,
    ) -> Result<(), Fault> {
        loop {
            let byte = match link.read_byte() {
                Ok(Some(byte)) => byte,
                Ok(None) => break,
                Err(e) => {
                    warn!("link read failed: {}", e);
                    break;
                }
            };

            let fed = self.receiver.feed(byte, &mut self.buffers, |header| {
                resolve_header(header, Direction::Request)
                    .ok()
                    .map(|(_, _, len)| len)
            });
            match fed {
                Ok(false) => {}
                Ok(true) => self.answer(link, state, round)?,
                Err(e) => {
                    warn!("frame dropped: {}", e);
                    let task = self.error_task();
                    reply(link, &Response::Error { task, code: e.into() });
                }
            }
        }
        Ok(())
    }

    /// Task an error report is sent from
    fn error_task(&self) -> TaskId {
        self.receiver
            .header()
            .and_then(|h| TaskId::from_u8(h.task))
            .unwrap_or(TaskId::Measure)
    }

    fn answer<U: Uart>(
        &mut self,
        link: &mut U,
        state: &mut SystemState<'_>,
        round: &mut Round<'_>,
    ) -> Result<(), Fault> {
        let parsed = match self.buffers.ready() {
            Some(frame) => parse_request(frame),
            None => return Ok(()),
        };
        self.buffers.release();

        let response = match parsed {
            Ok(request) => {
                match ekg_control(&request) {
                    Some(true) => round.request_add(TASK_EKG)?,
                    Some(false) => round.request_remove(TASK_EKG),
                    None => {}
                }
                respond(state, &request, round.tick())
            }
            Err(e) => {
                warn!("bad request: {}", e);
                Response::Error {
                    task: self.error_task(),
                    code: e.code(),
                }
            }
        };
        reply(link, &response);
        Ok(())
    }
}

/// `Some(true)` when a request arms EKG acquisition, `Some(false)` when it
/// disarms it
fn ekg_control(request: &Request) -> Option<bool> {
    let targets_ekg = |target: &StartStopTarget| match *target {
        StartStopTarget::Ekg => true,
        StartStopTarget::Measure(mask) => mask & MeasurementSelect::EKG != 0,
    };
    match request {
        Request::Start(target) if targets_ekg(target) => Some(true),
        Request::Stop(target) if targets_ekg(target) => Some(false),
        _ => None,
    }
}

fn reply<U: Uart>(link: &mut U, response: &Response) {
    let encoded = match response.to_frame().and_then(|frame| frame.encode_to_vec()) {
        Ok(bytes) => bytes,
        Err(e) => {
            error!("response encode failed: {}", e);
            return;
        }
    };
    if let Err(e) = link.write(&encoded) {
        warn!("link write failed: {}", e);
    }
}

/// Apply a request to the monitor state and build its response
pub fn respond(state: &mut SystemState<'_>, request: &Request, now: Tick) -> Response {
    match request {
        Request::Measure(req) => Response::Measure(measurements(state, req.select)),
        Request::EkgBlock(req) => {
            let index = req.block;
            match state.ekg.buffer().block(index as usize) {
                Some(samples) => Response::EkgBlock(EkgBlock { index, samples }),
                None => Response::Error {
                    task: TaskId::Ekg,
                    code: ErrorCode::InvalidPayload,
                },
            }
        }
        Request::Warning(req) => {
            if req.acknowledge {
                info!("alarms acknowledged remotely at {}", now);
                state.alarms.acknowledge(now);
            }
            Response::Warning(state.alarms.summary(state.battery.level()))
        }
        Request::Initialize { task, data } => {
            state.patient = data.clone();
            info!("patient record set");
            ack(*task, CommandId::Initialize)
        }
        Request::Start(target) => {
            // The EKG bit also arms acquisition
            if let StartStopTarget::Measure(mask) = *target {
                state.select.enable(mask & !MeasurementSelect::EKG);
            }
            if ekg_control(request).is_some() {
                state.start_ekg();
            }
            ack(request.task(), CommandId::Start)
        }
        Request::Stop(target) => {
            if let StartStopTarget::Measure(mask) = *target {
                state.select.disable(mask & !MeasurementSelect::EKG);
            }
            if ekg_control(request).is_some() {
                state.stop_ekg();
            }
            ack(request.task(), CommandId::Stop)
        }
        Request::Display { task, on } => {
            state.remote_display = *on;
            ack(*task, CommandId::Display)
        }
    }
}

fn ack(task: TaskId, command: CommandId) -> Response {
    Response::Ack { task, command }
}

/// Latest corrected values of the signals in `select`, zero elsewhere
fn measurements(state: &SystemState<'_>, select: u16) -> MeasureResponse {
    let value = |signal: Signal| {
        if select & signal.select_bit() != 0 {
            state.corrected(signal).unwrap_or(0)
        } else {
            0
        }
    };
    let ekg_frequency = if select & MeasurementSelect::EKG != 0 {
        state.ekg_frequency().unwrap_or(0)
    } else {
        0
    };
    MeasureResponse {
        temperature: value(Signal::Temperature),
        systolic: value(Signal::Systolic),
        diastolic: value(Signal::Diastolic),
        pulse: value(Signal::Pulse),
        respiration: value(Signal::Respiration),
        ekg_frequency,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MonitorConfig;
    use crate::measure::{Edges, MeasureFlags};
    use crate::scheduler::{Scheduler, Task};
    use crate::system::Keypad;
    use heapless::{Deque, Vec};
    use vigil_hal::{LinkError, UartRx, UartTx};
    use vigil_protocol::{
        parse_response, AlarmSummary, InitializeCommand, MeasureRequest, WarningRequest,
    };

    #[derive(Default)]
    struct Loopback {
        rx: Deque<u8, 512>,
        tx: Vec<u8, 1024>,
    }

    impl Loopback {
        fn send(&mut self, bytes: &[u8]) {
            for &b in bytes {
                self.rx.push_back(b).unwrap();
            }
        }

        fn send_request(&mut self, request: &Request) {
            let frame = request.to_frame().unwrap();
            self.send(&frame.encode_to_vec().unwrap());
        }

        /// Split the transmitted bytes into frames
        fn frames(&self) -> impl Iterator<Item = &[u8]> {
            self.tx
                .split_inclusive(|&b| b == b'~')
                .filter(|f| !f.is_empty())
        }
    }

    impl UartTx for Loopback {
        fn write(&mut self, data: &[u8]) -> Result<(), LinkError> {
            self.tx.extend_from_slice(data).map_err(|_| LinkError::TxFull)
        }
    }

    impl UartRx for Loopback {
        fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, LinkError> {
            let mut n = 0;
            while let (Some(slot), Some(b)) = (buf.get_mut(n), self.rx.front().copied()) {
                *slot = b;
                self.rx.pop_front();
                n += 1;
            }
            Ok(n)
        }
    }

    /// Runs only the comms service, so tests see exactly its effects
    struct CommsOnly;

    struct Ctx<'a> {
        state: SystemState<'a>,
        link: Loopback,
        port: CommsPort,
    }

    impl<'a> Task<Ctx<'a>> for CommsOnly {
        fn run(&mut self, ctx: &mut Ctx<'a>, round: &mut Round<'_>) -> Result<(), Fault> {
            ctx.port.service(&mut ctx.link, &mut ctx.state, round)
        }
    }

    fn setup<'a>(
        edges: &'a Edges,
        flags: &'a MeasureFlags,
        keypad: &'a Keypad,
    ) -> (Scheduler<CommsOnly>, Ctx<'a>) {
        let mut scheduler = Scheduler::new();
        scheduler.register(0, CommsOnly).unwrap();
        scheduler.request_add(0).unwrap();
        let ctx = Ctx {
            state: SystemState::new(MonitorConfig::default(), edges, flags, keypad),
            link: Loopback::default(),
            port: CommsPort::new(),
        };
        (scheduler, ctx)
    }

    #[test]
    fn test_measure_request_returns_selected_values() {
        let (edges, flags, keypad) = (Edges::new(), MeasureFlags::new(0), Keypad::new());
        let (mut scheduler, mut ctx) = setup(&edges, &flags, &keypad);
        ctx.state.buffers.publish(Signal::Temperature, 37).unwrap();
        ctx.state.buffers.publish(Signal::Pulse, 72).unwrap();
        crate::correction::compute(&mut ctx.state.buffers, &ctx.state.config.calibration);

        ctx.link.send_request(&Request::Measure(MeasureRequest {
            select: MeasurementSelect::TEMPERATURE,
        }));
        scheduler.schedule(&mut ctx).unwrap();

        let frame = ctx.link.frames().next().unwrap();
        let response = parse_response(frame, TaskId::Measure).unwrap();
        assert_eq!(
            response,
            Response::Measure(MeasureResponse {
                temperature: 37,
                ..Default::default()
            })
        );
    }

    #[test]
    fn test_warning_ack_and_summary() {
        let (edges, flags, keypad) = (Edges::new(), MeasureFlags::new(0), Keypad::new());
        let (mut scheduler, mut ctx) = setup(&edges, &flags, &keypad);
        ctx.link.send_request(&Request::Warning(WarningRequest { acknowledge: true }));
        scheduler.schedule(&mut ctx).unwrap();

        assert_eq!(ctx.state.alarms.ack().granted_at, Some(1));
        let frame = ctx.link.frames().next().unwrap();
        assert_eq!(
            parse_response(frame, TaskId::Warning).unwrap(),
            Response::Warning(AlarmSummary {
                battery: 200,
                ..Default::default()
            })
        );
    }

    #[test]
    fn test_device_commands() {
        let (edges, flags, keypad) = (Edges::new(), MeasureFlags::new(0), Keypad::new());
        let (mut scheduler, mut ctx) = setup(&edges, &flags, &keypad);
        let patient = InitializeCommand::new("Dr. Grey", "M. Smith").unwrap();
        ctx.link.send_request(&Request::Initialize {
            task: TaskId::Warning,
            data: patient.clone(),
        });
        ctx.link
            .send_request(&Request::Stop(StartStopTarget::Measure(MeasurementSelect::PULSE)));
        ctx.link.send_request(&Request::Stop(StartStopTarget::Ekg));
        ctx.link.send_request(&Request::Display {
            task: TaskId::Measure,
            on: true,
        });
        scheduler.schedule(&mut ctx).unwrap();

        assert_eq!(ctx.state.patient, patient);
        assert!(!ctx.state.select.contains(MeasurementSelect::PULSE));
        assert!(!ctx.state.select.contains(MeasurementSelect::EKG));
        assert!(!flags.contains(MeasureFlags::EKG_MEASURE));
        assert!(ctx.state.remote_display);

        let expected = [
            (TaskId::Warning, CommandId::Initialize),
            (TaskId::Measure, CommandId::Stop),
            (TaskId::Ekg, CommandId::Stop),
            (TaskId::Measure, CommandId::Display),
        ];
        let mut frames = ctx.link.frames();
        for (task, command) in expected {
            let frame = frames.next().unwrap();
            assert_eq!(
                parse_response(frame, task).unwrap(),
                Response::Ack { task, command }
            );
        }
        assert!(frames.next().is_none());
    }

    #[test]
    fn test_ekg_start_queues_ekg_task() {
        let (edges, flags, keypad) = (Edges::new(), MeasureFlags::new(0), Keypad::new());
        let (mut scheduler, mut ctx) = setup(&edges, &flags, &keypad);
        scheduler.register(TASK_EKG, CommsOnly).unwrap();
        ctx.state.stop_ekg();
        ctx.link.send_request(&Request::Start(StartStopTarget::Ekg));
        scheduler.schedule(&mut ctx).unwrap();
        assert!(flags.contains(MeasureFlags::EKG_MEASURE));
        assert!(!scheduler.is_queued(TASK_EKG));

        scheduler.schedule(&mut ctx).unwrap();
        assert!(scheduler.is_queued(TASK_EKG));
    }

    #[test]
    fn test_ekg_stop_then_start_in_one_drain_stays_linked() {
        let (edges, flags, keypad) = (Edges::new(), MeasureFlags::new(0), Keypad::new());
        let (mut scheduler, mut ctx) = setup(&edges, &flags, &keypad);
        scheduler.register(TASK_EKG, CommsOnly).unwrap();
        scheduler.request_add(TASK_EKG).unwrap();
        scheduler.schedule(&mut ctx).unwrap();
        assert!(scheduler.is_queued(TASK_EKG));

        ctx.link.send(b"S2|P|E~");
        ctx.link.send(b"S2|S|E~");
        for _ in 0..3 {
            scheduler.schedule(&mut ctx).unwrap();
        }
        assert!(flags.contains(MeasureFlags::EKG_MEASURE));
        assert!(ctx.state.select.contains(MeasurementSelect::EKG));
        assert!(scheduler.is_queued(TASK_EKG));
    }

    #[test]
    fn test_measure_mask_ekg_bit_drives_acquisition() {
        let (edges, flags, keypad) = (Edges::new(), MeasureFlags::new(0), Keypad::new());
        let (mut scheduler, mut ctx) = setup(&edges, &flags, &keypad);
        scheduler.register(TASK_EKG, CommsOnly).unwrap();
        scheduler.request_add(TASK_EKG).unwrap();
        scheduler.schedule(&mut ctx).unwrap();

        let mask = MeasurementSelect::EKG | MeasurementSelect::PULSE;
        ctx.link
            .send_request(&Request::Stop(StartStopTarget::Measure(mask)));
        scheduler.schedule(&mut ctx).unwrap();
        assert!(!ctx.state.select.contains(MeasurementSelect::EKG));
        assert!(!ctx.state.select.contains(MeasurementSelect::PULSE));
        assert!(!flags.contains(MeasureFlags::EKG_MEASURE));
        scheduler.schedule(&mut ctx).unwrap();
        assert!(!scheduler.is_queued(TASK_EKG));

        ctx.link
            .send_request(&Request::Start(StartStopTarget::Measure(MeasurementSelect::EKG)));
        scheduler.schedule(&mut ctx).unwrap();
        assert!(ctx.state.select.contains(MeasurementSelect::EKG));
        assert!(flags.contains(MeasureFlags::EKG_MEASURE));
        assert!(!ctx.state.select.contains(MeasurementSelect::PULSE));
        scheduler.schedule(&mut ctx).unwrap();
        assert!(scheduler.is_queued(TASK_EKG));
    }

    #[test]
    fn test_ekg_block_out_of_range() {
        let (edges, flags, keypad) = (Edges::new(), MeasureFlags::new(0), Keypad::new());
        let (_, mut ctx) = setup(&edges, &flags, &keypad);
        let response = respond(
            &mut ctx.state,
            &Request::EkgBlock(vigil_protocol::EkgRequest { block: 8 }),
            1,
        );
        assert_eq!(
            response,
            Response::Error {
                task: TaskId::Ekg,
                code: ErrorCode::InvalidPayload
            }
        );

        let response = respond(
            &mut ctx.state,
            &Request::EkgBlock(vigil_protocol::EkgRequest { block: 2 }),
            1,
        );
        assert!(matches!(response, Response::EkgBlock(EkgBlock { index: 2, .. })));
    }

    #[test]
    fn test_errors_reported_to_sender() {
        let (edges, flags, keypad) = (Edges::new(), MeasureFlags::new(0), Keypad::new());
        let (mut scheduler, mut ctx) = setup(&edges, &flags, &keypad);
        // Unsupported command for the warning task
        ctx.link.send(b"S1|S|E~");
        // Bad end marker
        ctx.link.send(b"S1|W|\x01X~");
        // Unknown task
        ctx.link.send(b"S9|M|E~");
        // Valid request still answered afterwards
        ctx.link.send(b"S1|W|\x00E~");
        scheduler.schedule(&mut ctx).unwrap();
        assert_eq!(scheduler.fault(), None);

        let mut frames = ctx.link.frames();
        let expected = [
            (TaskId::Warning, ErrorCode::Unsupported),
            (TaskId::Warning, ErrorCode::Framing),
            (TaskId::Measure, ErrorCode::UnknownTask),
        ];
        for (task, code) in expected {
            let frame = frames.next().unwrap();
            assert_eq!(
                parse_response(frame, task).unwrap(),
                Response::Error { task, code }
            );
        }
        let frame = frames.next().unwrap();
        assert!(matches!(
            parse_response(frame, TaskId::Warning).unwrap(),
            Response::Warning(_)
        ));
    }
}
