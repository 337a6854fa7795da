//! Swarm Sim headless demo
//!
//! Runs the simulation thread on a phone-sized play area, feeds it synthetic
//! volume readings and logs the population once per second.
//!
//! Usage: `swarm-sim [config.json]` (set `RUST_LOG=info` to see output)

use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use swarm_sim::SimConfig;
use swarm_sim::feed::{self, VolumeSample};
use swarm_sim::runtime;
use swarm_sim::sim::{Command, EntityKind, SimEvent, Simulation};

const SCREEN_WIDTH: f32 = 1080.0;
const SCREEN_HEIGHT: f32 = 1920.0;
const RUN_SECONDS: u64 = 60;
/// Seconds between synthetic volume readings
const FEED_PERIOD: u64 = 5;

/// Slowly rotating buy/sell mix for one source
fn synthetic_volume(second: u64, phase: f64) -> VolumeSample {
    let x = second as f64 / 10.0 + phase;
    VolumeSample::new(600.0 + 500.0 * x.sin(), 600.0 + 500.0 * x.cos())
}

fn main() -> ExitCode {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => match SimConfig::load(&path) {
            Ok(config) => config,
            Err(e) => {
                log::error!("Failed to load {path}: {e}");
                return ExitCode::FAILURE;
            }
        },
        None => SimConfig::default(),
    };
    log::info!("Swarm Sim starting ({SCREEN_WIDTH}x{SCREEN_HEIGHT})");

    let handle = runtime::spawn(Simulation::new(config));
    handle.send(Command::ReportScreenBounds {
        width: SCREEN_WIDTH,
        height: SCREEN_HEIGHT,
    });

    for second in 0..RUN_SECONDS {
        if second % FEED_PERIOD == 0 {
            let a = synthetic_volume(second, 0.0);
            let b = synthetic_volume(second, 2.0);
            handle.send(Command::SetFamilySpeedMultiplier {
                kind: EntityKind::FamilyA,
                value: a.speed_multiplier(),
            });
            handle.send(Command::SetFamilySpeedMultiplier {
                kind: EntityKind::FamilyB,
                value: b.speed_multiplier(),
            });
            handle.send(Command::SetSpawnCondition(feed::sell_pressure(&a, &b)));
        }

        thread::sleep(Duration::from_secs(1));

        let mut latest = None;
        for frame in handle.frames().try_iter() {
            for event in &frame.events {
                match event {
                    SimEvent::Spawned { id, kind, cause } => {
                        log::debug!("Spawned {id} {kind:?} ({cause:?})")
                    }
                    SimEvent::Removed { id, kind } => log::debug!("Removed {id} {kind:?}"),
                    SimEvent::Released { .. } => {}
                }
            }
            latest = Some(frame);
        }

        if let Some(frame) = latest {
            log::info!(
                "t={:>2}s tick {:>5} | A {} B {} Stable {} Roamer {}",
                second + 1,
                frame.tick,
                frame.count(EntityKind::FamilyA),
                frame.count(EntityKind::FamilyB),
                frame.count(EntityKind::Stable),
                frame.count(EntityKind::Roamer),
            );
        }
    }

    match handle.shutdown() {
        Some(sim) => {
            log::info!("Finished after {} ticks", sim.tick_count());
            ExitCode::SUCCESS
        }
        None => ExitCode::FAILURE,
    }
}
