use std::error::Error;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;

use argh::FromArgs;
use indicatif::{ProgressBar, ProgressStyle};
use rand::prelude::*;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use scoutflock::render::{Canvas, GifAnimation, PngFrames, SnapshotLog, TextGrid};
use scoutflock::{Flock, ScoutAssignment, Simulation, SimulationConfig, UpdateMode};

#[derive(FromArgs)]
/// Boids flocking with scout subgroups.
struct Args {
    /// path to a JSON config file, overridden by the flags below
    #[argh(option)]
    config: Option<PathBuf>,

    /// number of boids
    #[argh(option)]
    population: Option<usize>,

    /// number of steps to run
    #[argh(option)]
    steps: Option<usize>,

    /// plane width
    #[argh(option)]
    width: Option<f32>,

    /// plane height
    #[argh(option)]
    height: Option<f32>,

    /// seed for the initial scatter
    #[argh(option)]
    seed: Option<u64>,

    /// update boids in place, one after another, instead of from a frozen flock
    #[argh(switch)]
    sequential: bool,

    /// how many boids (from index 0) scout towards +x
    #[argh(option)]
    scouts1: Option<usize>,

    /// how many boids (after group 1) scout towards -x
    #[argh(option)]
    scouts2: Option<usize>,

    /// directory to write one PNG per step into
    #[argh(option)]
    frames: Option<PathBuf>,

    /// path of an animated GIF to write
    #[argh(option)]
    gif: Option<PathBuf>,

    /// pixels per plane unit for PNG/GIF output
    #[argh(option, default = "5.0")]
    scale: f32,

    /// radius of a drawn boid in pixels
    #[argh(option, default = "2")]
    draw_radius: i32,

    /// print each step as a text grid
    #[argh(switch)]
    text: bool,

    /// write every snapshot as JSON lines to this file
    #[argh(option)]
    snapshots: Option<PathBuf>,

    /// debug logging
    #[argh(switch, short = 'v')]
    verbose: bool,
}

impl Args {
    fn into_config(self) -> Result<(SimulationConfig, Outputs), Box<dyn Error>> {
        let mut config = match &self.config {
            Some(path) => SimulationConfig::load(path)?,
            None => SimulationConfig::default(),
        };
        if let Some(population) = self.population {
            config.population = population;
        }
        if let Some(steps) = self.steps {
            config.steps = steps;
        }
        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if self.sequential {
            config.update_mode = UpdateMode::Sequential;
        }
        config.scouts = ScoutAssignment {
            group1: self.scouts1.unwrap_or(config.scouts.group1),
            group2: self.scouts2.unwrap_or(config.scouts.group2),
        };
        let outputs = Outputs {
            frames: self.frames,
            gif: self.gif,
            scale: self.scale,
            draw_radius: self.draw_radius,
            text: self.text,
            snapshots: self.snapshots,
        };
        Ok((config, outputs))
    }
}

struct Outputs {
    frames: Option<PathBuf>,
    gif: Option<PathBuf>,
    scale: f32,
    draw_radius: i32,
    text: bool,
    snapshots: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args: Args = argh::from_env();

    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .init();

    let (config, outputs) = args.into_config()?;
    config.validate()?;

    let flock = match config.boids.clone() {
        Some(boids) => Flock::from_boids(
            boids,
            config.bounds(),
            config.parameters,
            &config.scouts,
            config.update_mode,
        )?,
        None => {
            let mut rng = match config.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_rng(&mut rand::rng()),
            };
            Flock::random(
                config.population,
                config.bounds(),
                config.parameters,
                &config.scouts,
                config.update_mode,
                &mut rng,
            )?
        }
    };

    let mut sim = Simulation::new(flock);
    let canvas = Canvas::new(config.bounds(), outputs.scale, outputs.draw_radius);
    if let Some(dir) = outputs.frames {
        info!(dir = %dir.display(), "writing frames");
        sim.add_renderer(Box::new(PngFrames::new(canvas.clone(), dir)?));
    }
    if let Some(path) = outputs.gif {
        info!(path = %path.display(), "writing gif");
        sim.add_renderer(Box::new(GifAnimation::create(canvas, path, 100)?));
    }
    if outputs.text {
        sim.add_renderer(Box::new(TextGrid::new(io::stdout(), config.bounds(), 50, 25)));
    }
    if let Some(path) = outputs.snapshots {
        sim.add_renderer(Box::new(SnapshotLog::new(BufWriter::new(File::create(path)?))));
    }

    // The text grid owns stdout, so keep the bar out of its way
    let pbar = if outputs.text {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(config.steps as u64)
    };
    pbar.set_style(ProgressStyle::with_template(
        "[{elapsed_precise}/{eta_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}",
    )?);

    sim.run(config.steps, |_| pbar.inc(1))?;
    pbar.finish();
    Ok(())
}
