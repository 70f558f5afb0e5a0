//! Procedure call sequences against scripted instruments.
//!
//! Run with: cargo test --test procedures

use lab_serial::adapters::{MockHandle, MockTransport};
use lab_serial::devices::ika::{self, Function};
use lab_serial::devices::{aladdin, vici};
use lab_serial::instrument::{DeviceProfile, ManualClock, PollSettings, SerialCommandDevice};
use lab_serial::procedures::{self, TransferPlan};
use lab_serial::DeviceError;
use std::time::Duration;

fn attached(profile: DeviceProfile) -> (SerialCommandDevice, MockHandle, ManualClock) {
    let clock = ManualClock::new();
    let mut device = SerialCommandDevice::new(profile).with_clock(clock.clone());
    let (transport, handle) = MockTransport::new();
    device.attach(transport).unwrap();
    (device, handle, clock)
}

/// Wrap a pump status payload the way the pump frames it (address 00).
fn pump(payload: &str) -> String {
    format!("\u{2}00{}\u{3}", payload)
}

fn queue_pump_setup(handle: &MockHandle) {
    handle.queue_reply(pump("SNE1000V3.930")); // VER
    handle.queue_reply(pump("S")); // VOL ML
    handle.queue_reply(pump("S")); // RAT 0 MM
    handle.queue_reply(pump("W")); // HOM
    handle.queue_reply(pump("S")); // FUN: homed
    for _ in 0..4 {
        handle.queue_reply(pump("S")); // DIA VOL RAT DIR
    }
    handle.queue_reply(pump("I")); // RUN
}

#[test]
fn test_infusion_run_sequence() {
    let (mut device, handle, _) = attached(aladdin::profile("/dev/ttyPUMP", 9600));
    queue_pump_setup(&handle);
    handle.queue_reply(pump("I"));
    handle.queue_reply(pump("I"));
    handle.queue_reply(pump("S"));
    handle.queue_reply(pump("S")); // STP

    let idle = procedures::run_transfer(&mut device, &TransferPlan::default()).unwrap();

    assert_eq!(idle.raw(), "S");
    assert_eq!(
        handle.writes(),
        [
            "VER", "VOL ML", "RAT 0 MM", "HOM", "FUN", "DIA4.61", "VOL20.000", "RAT5.000",
            "DIR INF", "RUN", "FUN", "FUN", "FUN", "STP",
        ]
        .iter()
        .map(|c| format!("{}\r", c))
        .collect::<Vec<_>>()
    );
}

#[test]
fn test_withdrawal_sets_direction() {
    let (mut device, handle, _) = attached(aladdin::profile("/dev/ttyPUMP", 9600));
    queue_pump_setup(&handle);
    handle.queue_reply(pump("END"));
    handle.queue_reply(pump("S"));

    procedures::run_transfer(&mut device, &TransferPlan::withdraw(1.5, 2.0)).unwrap();

    let writes = handle.writes();
    assert!(writes.contains(&"DIR WDR\r".to_string()));
    assert!(writes.contains(&"VOL1.500\r".to_string()));
    assert_eq!(writes.last().map(String::as_str), Some("STP\r"));
}

#[test]
fn test_stuck_pump_is_stopped() {
    let (mut device, handle, clock) = attached(aladdin::profile("/dev/ttyPUMP", 9600));
    queue_pump_setup(&handle);
    for _ in 0..4 {
        handle.queue_reply(pump("I"));
    }
    handle.queue_reply(pump("S")); // STP
    let plan = TransferPlan::default().with_max_wait(Duration::from_secs(2));
    let before_run = clock.elapsed();

    let err = procedures::run_transfer(&mut device, &plan).unwrap_err();

    match err.downcast_ref::<DeviceError>() {
        Some(DeviceError::PollTimeout { attempts, .. }) => assert_eq!(*attempts, 4),
        other => panic!("expected PollTimeout, got {:?}", other),
    }
    assert!(err.to_string().contains("Pump did not finish"));
    assert_eq!(handle.writes().last().map(String::as_str), Some("STP\r"));
    assert_eq!(handle.pending_replies(), 0);
    assert_eq!(clock.elapsed() - before_run, Duration::from_secs(2));
}

#[test]
fn test_unidentified_pump_aborts_before_motion() {
    let (mut device, handle, _) = attached(aladdin::profile("/dev/ttyPUMP", 9600));
    handle.queue_reply(pump("?"));

    let err = procedures::run_transfer(&mut device, &TransferPlan::default()).unwrap_err();

    assert!(matches!(
        err.downcast_ref::<DeviceError>(),
        Some(DeviceError::UnexpectedReply { .. })
    ));
    assert_eq!(handle.writes(), vec!["VER\r".to_string()]);
}

#[test]
fn test_valve_port_selection_sequence() {
    let (mut device, handle, _) = attached(vici::profile("/dev/ttyVALVE", 9600));
    handle.queue_reply("\r"); // AM3
    handle.queue_reply("\r"); // NP10
    handle.queue_reply(""); // HM, no reply
    handle.queue_reply(""); // GO5, no reply
    handle.queue_reply("Position is = 1\r");
    handle.queue_reply("Position is = 5\r");

    let reply = procedures::select_port(
        &mut device,
        10,
        5,
        PollSettings::new(Duration::from_millis(200), Duration::from_secs(5)),
    )
    .unwrap();

    assert_eq!(reply.raw(), "Position is = 5");
    assert_eq!(
        handle.writes(),
        vec!["AM3\r", "NP10\r", "HM\r", "GO5\r", "CP\r", "CP\r"]
    );
}

#[test]
fn test_valve_port_out_of_range() {
    let (mut device, handle, _) = attached(vici::profile("/dev/ttyVALVE", 9600));

    let settings = PollSettings::new(Duration::from_millis(200), Duration::from_secs(5));
    let err = procedures::select_port(&mut device, 10, 11, settings).unwrap_err();

    assert!(matches!(
        err.downcast_ref::<DeviceError>(),
        Some(DeviceError::InvalidArgument(_))
    ));
    assert_eq!(handle.write_count(), 0);
}

#[test]
fn test_timed_stirring_run() {
    let (mut device, handle, clock) = attached(ika::profile("/dev/ttyPLATE", 9600));
    handle.queue_reply("0 4\r\n"); // IN_PV_4
    handle.queue_reply(""); // OUT_SP_4
    handle.queue_reply(""); // START_4
    handle.queue_reply(""); // STOP_4
    let before = clock.elapsed();

    procedures::stir_for(&mut device, 500.0, Duration::from_secs(5)).unwrap();

    let writes = handle.writes();
    assert_eq!(writes.len(), 4);
    assert_eq!(writes[0], "IN_PV_4\r\n");
    assert!(writes[1].starts_with("OUT_SP_4@500"));
    assert_eq!(writes[2], "START_4\r\n");
    assert_eq!(writes[3], "STOP_4\r\n");
    assert!(clock.elapsed() - before >= Duration::from_secs(5));
}

#[test]
fn test_wait_for_plate_temperature() {
    let (mut device, handle, clock) = attached(ika::profile("/dev/ttyPLATE", 9600));
    handle.queue_reply("20.0 2\r\n");
    handle.queue_reply("61.5 2\r\n");
    handle.queue_reply("99.8 2\r\n");
    let before = clock.elapsed();

    let reply = procedures::wait_for_temperature(
        &mut device,
        Function::PlateTemperature,
        100.0,
        0.5,
        PollSettings::new(Duration::from_secs(10), Duration::from_secs(60)),
    )
    .unwrap();

    assert_eq!(reply.value(), Some(99.8));
    assert_eq!(handle.write_count(), 3);
    assert_eq!(clock.elapsed() - before, Duration::from_secs(20));
}

#[test]
fn test_plate_reset() {
    let (mut device, handle, _) = attached(ika::profile("/dev/ttyPLATE", 9600));
    handle.queue_reply("");

    procedures::reset_plate(&mut device).unwrap();

    assert_eq!(handle.writes(), vec!["RESET\r\n".to_string()]);
}

#[test]
fn test_model_detection() {
    let (mut device, handle, _) = attached(ika::profile("/dev/ttyPLATE", 9600));
    handle.queue_reply("\u{2}IKARET\u{3}\r\n");

    assert_eq!(ika::detect_model(&mut device).unwrap(), "IKARET");
}
