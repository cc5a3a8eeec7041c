// runs the simulation without a window and logs a line every 100 ticks
use std::time::Instant;

use bevy::log::{info, LogPlugin};
use bevy::prelude::*;
use bevy_sph_fluid::{SimConfig, SphPipeline};

const TICKS: u64 = 1000;

fn main() {
    // only used for the log subscriber
    App::new().add_plugins(LogPlugin::default()).update();

    let config = SimConfig { seed: Some(42), smoothing_radius: 0.25, ..Default::default() };
    let mut sph = match SphPipeline::initialize(&config) {
        Ok(sph) => sph,
        Err(err) => {
            error!("{err}");
            std::process::exit(1);
        }
    };

    let start = Instant::now();
    for _ in 0..TICKS {
        let stats = sph.step();
        if stats.tick % 100 == 0 {
            info!(
                "tick {:>4}: density [{:.2}, {:.2}] mean {:.2}, max speed {:.3}, recovered {}",
                stats.tick,
                stats.min_density,
                stats.max_density,
                stats.mean_density,
                stats.max_speed,
                stats.recovered
            );
        }
    }
    let secs = start.elapsed().as_secs_f64();
    info!(
        "{TICKS} ticks of {} particles in {secs:.2} s ({:.2} ms/tick)",
        sph.particles().len(),
        secs * 1000.0 / TICKS as f64
    );
}
