//! BLE Sighting Simulation
//!
//! Generates a synthetic walk for testing HomeScout:
//! - The user walks a slowly turning path with GPS noise
//! - One follower device (a tracker in a bag) is seen on most scans
//! - Background devices (passers-by, parked cars) are seen once or twice
//!
//! # Usage
//! ```bash
//! ./simulation --minutes 30 --speed 0 | ./homescout run --stdin --exit-on-eof
//! ```

use std::io::{self, Write};
use std::time::Duration;

use clap::Parser;
use rand::prelude::*;
use rand_distr::{Distribution, Normal, Poisson};

use homescout::types::Sighting;

// ============================================================================
// Walk Constants
// ============================================================================

/// Start of the walk (Zurich, Kreis 5)
const START_LAT: f64 = 47.392_143_869_763_74;
const START_LON: f64 = 8.525_952_486_036_404;
/// Meters per degree of latitude on the mean-radius sphere
const METERS_PER_DEG_LAT: f64 = 111_195.08;
/// MAC of the simulated tracker
const FOLLOWER_MAC: &str = "AA:BB:CC:DD:EE:FF";
/// Probability that a scan picks up the follower
const FOLLOWER_DETECTION_RATE: f64 = 0.8;
/// GPS fix noise (meters, 1 sigma)
const GPS_NOISE_M: f64 = 4.0;

const BACKGROUND_TYPES: &[&str] = &["Unknown", "Headphones", "Phone", "Watch", "Tile", "SmartTag"];

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "simulation")]
#[command(about = "Synthetic BLE sighting stream for HomeScout testing")]
#[command(version = "1.0")]
struct Args {
    /// Walk duration in minutes (1-120)
    #[arg(short, long, default_value = "30", value_parser = clap::value_parser!(u32).range(1..=120))]
    minutes: u32,

    /// Seconds between BLE scans
    #[arg(short, long, default_value = "30", value_parser = clap::value_parser!(u32).range(1..=600))]
    interval_secs: u32,

    /// Time compression factor (1 = real-time, 0 = no delay)
    #[arg(short, long, default_value = "0")]
    speed: u32,

    /// Walking speed (m/s)
    #[arg(long, default_value = "1.3")]
    walk_speed: f64,

    /// Mean number of new background devices per scan
    #[arg(short, long, default_value = "2.0")]
    background: f64,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Suppress the walk log on stderr
    #[arg(short, long)]
    quiet: bool,
}

// ============================================================================
// Simulation State
// ============================================================================

struct Walker {
    lat: f64,
    lon: f64,
    heading_rad: f64,
    rng: StdRng,
    gps_noise: Normal<f64>,
    turn: Normal<f64>,
}

impl Walker {
    fn new(seed: Option<u64>) -> Result<Self, rand_distr::NormalError> {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            lat: START_LAT,
            lon: START_LON,
            heading_rad: 0.6,
            rng,
            gps_noise: Normal::new(0.0, GPS_NOISE_M)?,
            turn: Normal::new(0.0, 0.15)?,
        })
    }

    /// Advance `meters` along a gently wandering heading.
    fn step(&mut self, meters: f64) {
        self.heading_rad += self.turn.sample(&mut self.rng);
        let north = meters * self.heading_rad.cos();
        let east = meters * self.heading_rad.sin();
        self.lat += north / METERS_PER_DEG_LAT;
        self.lon += east / (METERS_PER_DEG_LAT * self.lat.to_radians().cos());
    }

    /// Current position with GPS noise applied.
    fn fix(&mut self) -> (f64, f64) {
        let dn = self.gps_noise.sample(&mut self.rng);
        let de = self.gps_noise.sample(&mut self.rng);
        (
            self.lat + dn / METERS_PER_DEG_LAT,
            self.lon + de / (METERS_PER_DEG_LAT * self.lat.to_radians().cos()),
        )
    }

    fn random_mac(&mut self) -> String {
        let bytes: [u8; 6] = self.rng.gen();
        bytes
            .iter()
            .map(|b| format!("{b:02X}"))
            .collect::<Vec<_>>()
            .join(":")
    }
}

fn log_walk(minute: f64, message: &str, quiet: bool) {
    if !quiet {
        eprintln!("[{minute:>6.1} min] {message}");
    }
}

fn emit(out: &mut impl Write, sighting: &Sighting) -> io::Result<()> {
    let line = serde_json::to_string(sighting).map_err(io::Error::other)?;
    writeln!(out, "{line}")
}

// ============================================================================
// Main
// ============================================================================

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let mut walker = Walker::new(args.seed)?;
    let background = Poisson::new(args.background.max(0.01))?;

    let interval_ms = i64::from(args.interval_secs) * 1_000;
    let scans = args.minutes * 60 / args.interval_secs;
    // Walk ends now so every sighting is inside the retention window
    let start_ms = chrono::Utc::now().timestamp_millis() - i64::from(scans) * interval_ms;
    let step_m = args.walk_speed * f64::from(args.interval_secs);

    log_walk(0.0, &"=".repeat(60), args.quiet);
    log_walk(0.0, "HOMESCOUT BLE SIMULATION", args.quiet);
    log_walk(0.0, &format!("  Duration: {} min ({} scans)", args.minutes, scans), args.quiet);
    log_walk(0.0, &format!("  Walk speed: {:.1} m/s", args.walk_speed), args.quiet);
    log_walk(0.0, &format!("  Follower: {FOLLOWER_MAC}"), args.quiet);
    if let Some(seed) = args.seed {
        log_walk(0.0, &format!("  Random seed: {seed}"), args.quiet);
    }
    log_walk(0.0, &"=".repeat(60), args.quiet);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut follower_seen = 0u32;
    let mut background_seen = 0u32;
    // Background devices that may be seen once more on the next scan
    let mut lingering: Vec<(String, &'static str)> = Vec::new();

    for scan in 0..=scans {
        let ts = start_ms + i64::from(scan) * interval_ms;
        let minute = f64::from(scan * args.interval_secs) / 60.0;
        if scan > 0 {
            walker.step(step_m);
        }

        if walker.rng.gen_bool(FOLLOWER_DETECTION_RATE) {
            let (lat, lon) = walker.fix();
            emit(&mut out, &Sighting::new(FOLLOWER_MAC, ts, lat, lon, "AirTag"))?;
            follower_seen += 1;
        }

        for (mac, device_type) in lingering.drain(..) {
            let (lat, lon) = walker.fix();
            emit(&mut out, &Sighting::new(mac, ts, lat, lon, device_type))?;
            background_seen += 1;
        }

        let arrivals = background.sample(&mut walker.rng) as usize;
        for _ in 0..arrivals {
            let mac = walker.random_mac();
            let device_type = BACKGROUND_TYPES[walker.rng.gen_range(0..BACKGROUND_TYPES.len())];
            let (lat, lon) = walker.fix();
            emit(&mut out, &Sighting::new(mac.clone(), ts, lat, lon, device_type))?;
            background_seen += 1;
            if walker.rng.gen_bool(0.3) {
                lingering.push((mac, device_type));
            }
        }

        out.flush()?;

        if scan > 0 && scan % 10 == 0 {
            log_walk(
                minute,
                &format!("follower seen {follower_seen}x, {background_seen} background sightings"),
                args.quiet,
            );
        }

        if args.speed > 0 {
            std::thread::sleep(Duration::from_secs_f64(
                f64::from(args.interval_secs) / f64::from(args.speed),
            ));
        }
    }

    log_walk(
        f64::from(args.minutes),
        &format!("DONE: follower {follower_seen}x, background {background_seen}"),
        args.quiet,
    );
    Ok(())
}
