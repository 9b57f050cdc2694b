use std::error::Error;
use std::time::{Duration, Instant};

use crate::drivers::dualshock4::hid_report::{encode, OutputState, OUTPUT_REPORT_SIZE};
use crate::input::{
    animation::{Animation, ColorCycle},
    mock::RecordingTransport,
    session::{DeviceSession, SessionState},
    timer::TimerQueue,
};

const PERIOD: Duration = Duration::from_millis(50);

fn new_session(transport: &RecordingTransport, timers: &mut TimerQueue) -> DeviceSession {
    DeviceSession::new(
        "hidraw0".to_string(),
        Box::new(transport.clone()),
        Box::new(ColorCycle::default()),
        timers,
        PERIOD,
        Instant::now(),
    )
}

#[test]
fn test_new_session_is_active() -> Result<(), Box<dyn Error>> {
    let transport = RecordingTransport::new();
    let mut timers = TimerQueue::new();
    let session = new_session(&transport, &mut timers);

    assert_eq!(session.state(), SessionState::Active);
    assert_eq!(session.id(), "hidraw0");
    assert_eq!(timers.len(), 1);
    assert_eq!(transport.count(), 0);

    Ok(())
}

#[test]
fn test_update_sends_animation_state() -> Result<(), Box<dyn Error>> {
    let transport = RecordingTransport::new();
    let mut timers = TimerQueue::new();
    let mut session = new_session(&transport, &mut timers);

    session.update(0.0);
    session.update(0.05);

    let reports = transport.reports();
    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|r| r.len() == OUTPUT_REPORT_SIZE));
    let expected = encode(&ColorCycle::default().output_state(0.0))?;
    assert_eq!(reports[0], expected.to_vec());
    assert_ne!(reports[0], reports[1]);
    assert_eq!(session.reports_sent(), 2);

    Ok(())
}

#[test]
fn test_terminate_sends_neutral_report() -> Result<(), Box<dyn Error>> {
    let transport = RecordingTransport::new();
    let mut timers = TimerQueue::new();
    let mut session = new_session(&transport, &mut timers);
    session.update(1.0);

    session.terminate(&mut timers);

    let reports = transport.reports();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[1], encode(&OutputState::neutral())?.to_vec());
    assert!(timers.is_empty());

    Ok(())
}

#[test]
fn test_write_failure_keeps_session_active() -> Result<(), Box<dyn Error>> {
    let transport = RecordingTransport::new();
    let mut timers = TimerQueue::new();
    let mut session = new_session(&transport, &mut timers);

    transport.set_failing(true);
    session.update(0.0);
    assert_eq!(session.state(), SessionState::Active);
    assert_eq!(session.write_failures(), 1);
    assert_eq!(timers.len(), 1);

    transport.set_failing(false);
    session.update(0.05);
    assert_eq!(session.reports_sent(), 1);
    assert_eq!(transport.count(), 1);

    Ok(())
}

#[test]
fn test_input_reports_do_not_send() -> Result<(), Box<dyn Error>> {
    let transport = RecordingTransport::new();
    let mut timers = TimerQueue::new();
    let session = new_session(&transport, &mut timers);

    session.on_input_report(&[0x11, 0xc0, 0x00, 0x80, 0x80]);
    session.on_input_report(&[]);
    assert_eq!(transport.count(), 0);

    Ok(())
}
