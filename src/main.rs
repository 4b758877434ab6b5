// src/main.rs
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use log::error;

use tensile_rig::calibration::{calibrate_sensor, StepDecision};
use tensile_rig::plot::{self, PlotStyle};
use tensile_rig::{
    export, CalibrationStore, SensorKind, SimulatedRig, TestConfig, TestPipeline,
};

const INPUT_PATH: &str = "input.json";
const CALIBRATION_PATH: &str = "calibration.json";

fn main() -> Result<()> {
    env_logger::init();
    let config = TestConfig::load(INPUT_PATH)
        .with_context(|| format!("reading test configuration from {INPUT_PATH}"))?;
    let mut store = CalibrationStore::load(CALIBRATION_PATH)
        .with_context(|| format!("reading calibration data from {CALIBRATION_PATH}"))?;

    loop {
        println!("Select an option:");
        println!("1 - Test");
        println!("2 - Calibration");
        println!("3 - Exit Program");
        match prompt("Enter your choice (1/2/3): ")?.as_str() {
            "1" => {
                if let Err(e) = run_test(&config, &store) {
                    error!("test run failed: {e:#}");
                    println!("\nTest failed: {e:#}\n");
                }
            }
            "2" => calibration_menu(&mut store)?,
            "3" => {
                println!("\nExiting program.\n");
                return Ok(());
            }
            _ => println!("\nInvalid choice. Please enter 1, 2, or 3.\n"),
        }
    }
}

fn run_test(config: &TestConfig, store: &CalibrationStore) -> Result<()> {
    println!(
        "\nRunning test with {} Hz sampling rate for {} s",
        config.sampling_rate_hz,
        config.test_duration_s()
    );
    let mut device = SimulatedRig::default();
    let pipeline = TestPipeline::new(config, store);
    let (series, summary) = pipeline.run(&mut device)?;

    println!("\nTest Complete.\n");
    println!("Max Force = {:.4} N", summary.max_force_n);
    println!(
        "Displacement at Break = {:.5} m (+/- {:.5} m)",
        summary.displacement_at_break_m, summary.displacement_uncertainty_m
    );
    println!(
        "Velocity at Break = {:.4} m/s",
        summary.velocity_at_break_m_s
    );
    println!("Average Velocity = {:.4} m/s", summary.average_velocity_m_s);
    for warning in &summary.warnings {
        println!(
            "WARNING: {} variation {:.4} below {:.4}; check the sensor connection",
            warning.sensor, warning.variation, warning.threshold
        );
    }

    let csv_path = export::export_csv(Path::new(&config.output_dir), &summary, &series)?;
    println!("\nResults written to {}", csv_path.display());

    let style = PlotStyle::default();
    let time_png = plot::render_time_series_png(&series, style)?;
    let time_path = csv_path.with_extension("time.png");
    std::fs::write(&time_path, time_png)?;
    let fd_png = plot::render_force_displacement_png(&series, style)?;
    let fd_path = csv_path.with_extension("force_displacement.png");
    std::fs::write(&fd_path, fd_png)?;
    println!(
        "Plots written to {} and {}\n",
        time_path.display(),
        fd_path.display()
    );
    Ok(())
}

fn calibration_menu(store: &mut CalibrationStore) -> Result<()> {
    println!("\nCalibration selected.\n");
    println!(
        "Load cell calibration last performed: {}",
        store.last_calibrated(SensorKind::LoadCell)
    );
    println!(
        "Ultrasonic sensor calibration last performed: {}\n",
        store.last_calibrated(SensorKind::Ultrasonic)
    );
    loop {
        println!("Select an option:");
        println!("1 - Calibrate Load Cell");
        println!("2 - Calibrate Ultrasonic Sensor");
        println!("3 - Exit Calibration");
        match prompt("Enter your choice (1/2/3): ")?.as_str() {
            "1" => run_calibration(store, SensorKind::LoadCell)?,
            "2" => run_calibration(store, SensorKind::Ultrasonic)?,
            "3" => {
                println!("\nReturning to main menu.\n");
                return Ok(());
            }
            _ => println!("\nInvalid choice. Please enter 1, 2, or 3.\n"),
        }
    }
}

fn run_calibration(store: &mut CalibrationStore, kind: SensorKind) -> Result<()> {
    println!("\nCalibrating {kind}.");
    if kind == SensorKind::LoadCell {
        println!("Position load cell in vertical orientation.");
    }
    let mut device = SimulatedRig::default();
    let completed = calibrate_sensor(&mut device, store, kind, |_, reference| {
        confirm_step(kind, reference)
    })
    .with_context(|| format!("calibrating {kind}"))?;
    if completed {
        store
            .save(CALIBRATION_PATH)
            .with_context(|| format!("saving calibration to {CALIBRATION_PATH}"))?;
        println!("\n{kind} calibration complete.\n");
    } else {
        println!("\nCalibration cancelled.\n");
    }
    Ok(())
}

fn confirm_step(kind: SensorKind, reference: f64) -> StepDecision {
    loop {
        match kind {
            SensorKind::LoadCell => {
                println!("\nPlace {:.0} g on load cell.", reference * 1000.0);
            }
            SensorKind::Ultrasonic => {
                println!(
                    "\nPlace object {:.0} mm away from ultrasonic sensor.",
                    reference * 1000.0
                );
            }
        }
        match prompt("Press 'y' when ready or 'c' to cancel: ") {
            Ok(choice) if choice.eq_ignore_ascii_case("y") => return StepDecision::Proceed,
            Ok(choice) if choice.eq_ignore_ascii_case("c") => return StepDecision::Cancel,
            Ok(_) => println!("\nError. Please press 'y' to confirm or 'c' to cancel."),
            Err(_) => return StepDecision::Cancel,
        }
    }
}

fn prompt(text: &str) -> io::Result<String> {
    print!("{text}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_owned())
}
