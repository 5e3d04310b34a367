use std::fs::File;
use std::io::{BufWriter, Write};
use std::thread;
use std::time::{Duration, Instant};

use clap::{Command, arg, value_parser};
use log::{debug, info, warn};

use flightaxis_connector::{
    ActuatorFrame, Airframe, Configuration, DEFAULT_SIMULATOR_HOST, FlightAxis, StandardState,
    validate_speedup,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let matches = Command::new("flightaxis_record")
        .version("1.0")
        .about("fly RealFlight with a fixed actuator frame and save the aircraft state to a file")
        .arg(
            arg!(--simulator_host <VALUE>)
                .help("address of the FlightAxis server")
                .default_value(DEFAULT_SIMULATOR_HOST),
        )
        .arg(
            arg!(--frame <NAME>)
                .help(
                    "harness frame name; 'heli' demixes the swashplate, \
                     'rev4' swaps channel halves",
                )
                .default_value("flightaxis"),
        )
        .arg(
            arg!(--pwm <MICROS>)
                .help("pulse width sent on every channel")
                .value_parser(value_parser!(u16))
                .default_value("1500"),
        )
        .arg(
            arg!(--speedup <FACTOR>)
                .help("simulated seconds per wall-clock second, positive")
                .value_parser(parse_speedup)
                .default_value("1.0"),
        )
        .arg(
            arg!(--ticks <COUNT>)
                .help("number of ticks to record")
                .value_parser(value_parser!(u32))
                .default_value("1000"),
        )
        .arg(
            arg!(--output <PATH>)
                .help("file receiving length-prefixed postcard records")
                .default_value("flightaxis.bin"),
        )
        .get_matches();

    let simulator_host = matches.get_one::<String>("simulator_host").unwrap();
    let frame_name = matches.get_one::<String>("frame").unwrap();
    let pwm = *matches.get_one::<u16>("pwm").unwrap();
    let speedup = *matches.get_one::<f64>("speedup").unwrap();
    let ticks = *matches.get_one::<u32>("ticks").unwrap();
    let output = matches.get_one::<String>("output").unwrap();

    let configuration = Configuration {
        simulator_host: simulator_host.clone(),
        speedup,
        airframe: Airframe::from_frame_name(frame_name),
        ..Default::default()
    };
    configuration.validate()?;
    debug!("Connecting to RealFlight simulator at {}", simulator_host);
    info!("Flying {:?} at {:.1} Hz", configuration.airframe, configuration.rate_hz());

    let mut axis = FlightAxis::with_configuration(&configuration);
    let mut writer = BufWriter::new(File::create(output)?);
    let period = Duration::from_secs_f64(1.0 / configuration.rate_hz());
    let frame = ActuatorFrame::splat(pwm);

    let mut recorded = 0;
    for _ in 0..ticks {
        let started = Instant::now();
        match axis.update(&frame) {
            Ok(state) => {
                write_record(&mut writer, state)?;
                recorded += 1;
            }
            Err(e) => warn!("Tick skipped: {}", e),
        }
        if let Some(remaining) = period.checked_sub(started.elapsed()) {
            thread::sleep(remaining);
        }
    }
    writer.flush()?;

    if let Err(e) = axis.release_control() {
        warn!("Failed to restore original controller: {}", e);
    }

    let statistics = axis.statistics();
    println!(
        "recorded {} of {} ticks to {} ({:.1} ticks/s, {} errors: {:?})",
        recorded, ticks, output, statistics.frequency, statistics.error_count, statistics.failures
    );
    Ok(())
}

fn parse_speedup(value: &str) -> Result<f64, String> {
    let speedup: f64 = value.parse().map_err(|e| format!("{}", e))?;
    validate_speedup(speedup).map_err(|e| e.to_string())
}

/// Append one state as a little-endian `u32` length followed by its postcard encoding.
fn write_record(
    writer: &mut impl Write,
    state: &StandardState,
) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = postcard::to_stdvec(state)?;
    writer.write_all(&(bytes.len() as u32).to_le_bytes())?;
    writer.write_all(&bytes)?;
    Ok(())
}
