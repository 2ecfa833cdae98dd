use clap::Parser;
use gridwave::control::ControlEvent;
use gridwave::patch::{self, Patch};
use gridwave::player::{open_sink, Player};
use gridwave::samples::SampleBank;
use gridwave::scheduler::Scheduler;
use gridwave::{EngineConfig, DEFAULT_SAMPLE_RATE};
use log::LevelFilter;
use simple_logger::SimpleLogger;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gridwave")]
#[command(about = "Grid-driven dataflow instrument with bandlimited oscillators")]
struct Cli {
    /// Patch to load (JSON). Defaults to the built-in demo patch.
    #[arg(long)]
    patch: Option<PathBuf>,

    /// Render to this WAV file instead of pacing in real time.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Sample for playback operators (16-bit WAV, left channel).
    #[arg(long)]
    sample: Option<PathBuf>,

    /// Ticks to run.
    #[arg(long, default_value = "800")]
    ticks: u64,

    /// Output sample rate in Hz.
    #[arg(
        long,
        default_value_t = DEFAULT_SAMPLE_RATE as u32,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    sample_rate: u32,

    /// Hold pad `x,y` for the whole run. Repeatable.
    #[arg(long, value_parser = parse_pad)]
    press: Vec<(u8, u8)>,

    /// Write the loaded patch back out (JSON).
    #[arg(long)]
    save_patch: Option<PathBuf>,

    /// More logging (-v info, -vv debug).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn parse_pad(s: &str) -> Result<(u8, u8), String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected x,y, got {:?}", s))?;
    let x = x.trim().parse().map_err(|e| format!("bad x: {}", e))?;
    let y = y.trim().parse().map_err(|e| format!("bad y: {}", e))?;
    Ok((x, y))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    SimpleLogger::new().with_level(level).init()?;

    let patch = match &cli.patch {
        Some(path) => Patch::load(path)?,
        None => patch::demo(),
    };
    if let Some(path) = &cli.save_patch {
        patch.save(path)?;
    }

    let samples = match &cli.sample {
        Some(path) => SampleBank::load_or_silent(path),
        None => SampleBank::default(),
    };
    let config = EngineConfig {
        sample_rate: cli.sample_rate as f64,
    };
    let mut scheduler = Scheduler::new(config, patch.build()?).with_samples(samples);
    for &(x, y) in &cli.press {
        if scheduler.push_control(ControlEvent::press(x, y)).is_err() {
            log::warn!("control queue full, dropping press at {},{}", x, y);
        }
    }

    let sink = open_sink(cli.out.as_deref(), cli.sample_rate);
    let mut player = Player::new(scheduler, sink);
    player.run(cli.ticks)?;

    log::info!(
        "ran {} ticks ({:.2} s of audio)",
        player.scheduler().ticks(),
        player.scheduler().ticks() as f64 * config.block_duration()
    );
    Ok(())
}
