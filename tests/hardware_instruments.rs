//! Hardware tests for the pump, valve and plate drivers
//!
//! These tests require real instruments connected to the system.
//! Run with: cargo test --test hardware_instruments --features hardware_tests -- --ignored --nocapture
//!
//! Hardware Setup:
//! - WPI Aladdin pump on `LABSERIAL_PUMP_PORT` (default /dev/ttyUSB0)
//! - VICI actuator on `LABSERIAL_VALVE_PORT` (default /dev/ttyUSB1)
//! - IKA plate on `LABSERIAL_PLATE_PORT` (default /dev/ttyUSB2)
//! - All at 9600 baud

#![cfg(feature = "hardware_tests")]

use lab_serial::devices::ika::{self, Function};
use lab_serial::devices::{aladdin, vici};
use lab_serial::instrument::{PollSettings, SerialCommandDevice};
use std::time::Duration;

fn port(var: &str, default: &str) -> String {
    std::env::var(var).unwrap_or_else(|_| default.to_string())
}

#[test]
#[ignore] // Hardware-only test
fn test_pump_identifies_and_reports_status() {
    lab_serial::logging::init("debug");
    let profile = aladdin::profile(&port("LABSERIAL_PUMP_PORT", "/dev/ttyUSB0"), 9600);
    let mut pump = SerialCommandDevice::connect(profile).expect("pump port should open");

    let firmware = aladdin::verify(&mut pump).expect("pump should answer VER");
    println!("Pump firmware: {}", firmware);

    let status = aladdin::status(&mut pump).expect("pump should answer FUN");
    println!("Pump status: {:?}", status);
    pump.close();
}

#[test]
#[ignore] // Hardware-only test
fn test_valve_round_trip_to_port_two() {
    lab_serial::logging::init("debug");
    let profile = vici::profile(&port("LABSERIAL_VALVE_PORT", "/dev/ttyUSB1"), 9600);
    let mut valve = SerialCommandDevice::connect(profile).expect("valve port should open");

    let settings = PollSettings::new(Duration::from_millis(200), Duration::from_secs(10));
    let reply = lab_serial::procedures::select_port(&mut valve, 10, 2, settings)
        .expect("valve should reach port 2");
    println!("Valve: {}", reply);

    vici::home(&mut valve).expect("valve should accept HM");
    vici::wait_for_position(&mut valve, 1, settings).expect("valve should return home");
}

#[test]
#[ignore] // Hardware-only test
fn test_plate_reads_temperature() {
    lab_serial::logging::init("debug");
    let profile = ika::profile(&port("LABSERIAL_PLATE_PORT", "/dev/ttyUSB2"), 9600);
    let mut plate = SerialCommandDevice::connect(profile).expect("plate port should open");

    let model = ika::detect_model(&mut plate).expect("plate should answer IN_TYPE");
    println!("Detected device model: {}", model);

    let temperature = ika::actual(&mut plate, Function::PlateTemperature)
        .expect("plate should report its temperature");
    println!("Plate temperature: {} °C", temperature);
    assert!((-20.0..400.0).contains(&temperature));
}
