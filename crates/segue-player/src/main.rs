//! Segue player - plays a library as a harmonic AutoDJ tour
//!
//! ```text
//! segue-player [OPTIONS] [LIBRARY.json]
//! ```

use anyhow::{bail, Context, Result};
use segue_core::audio::{get_output_devices, start_audio_output, BounceSink};
use segue_core::config::{default_config_path, load_config, AutoDjConfig};
use segue_core::engine::{engine_channel, CrossfadeEngine};
use segue_core::library::{
    analyze_library, load_library, scan_audio_files, JsonAnalysisCache, SidecarAnalyzer,
    TrackRecord,
};
use segue_core::loader::{test_tone, WavBufferProvider, TEST_TONE_FREQ};
use segue_core::player::{
    event_channel, EndOfTour, OfflineClock, PlayerEvent, RealTimeClock, StopFlag, TourPlayer,
};
use segue_core::tour::{DistanceMatrix, Tour, TourReport, TourSolver};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::time::Duration;

const USAGE: &str = "\
Usage: segue-player [OPTIONS] [LIBRARY.json]

Options:
  --config <FILE>   Config file (default: ~/.config/segue/config.yaml)
  --scan <DIR>      Analyze the WAV files in DIR instead of reading a library
  --plan-only       Print the tour without playing it
  --bounce <FILE>   Render the tour to a WAV file instead of the audio device
  --test-tone       Play a 440 Hz tone to check the audio device
  --list-devices    List audio output devices
  -h, --help        Show this help

Type 'q' and Enter to stop playback.";

const TEST_TONE_SECS: f64 = 3.0;

#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    scan: Option<PathBuf>,
    bounce: Option<PathBuf>,
    library: Option<PathBuf>,
    plan_only: bool,
    test_tone: bool,
    list_devices: bool,
    help: bool,
}

impl Args {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Self> {
        let mut parsed = Self::default();
        while let Some(arg) = args.next() {
            let mut value = |flag: &str| {
                args.next()
                    .map(PathBuf::from)
                    .with_context(|| format!("{} needs a value", flag))
            };
            match arg.as_str() {
                "--config" => parsed.config = Some(value("--config")?),
                "--scan" => parsed.scan = Some(value("--scan")?),
                "--bounce" => parsed.bounce = Some(value("--bounce")?),
                "--plan-only" => parsed.plan_only = true,
                "--test-tone" => parsed.test_tone = true,
                "--list-devices" => parsed.list_devices = true,
                "-h" | "--help" => parsed.help = true,
                other if other.starts_with('-') => bail!("Unknown option: {}", other),
                other => {
                    if parsed.library.is_some() {
                        bail!("Only one library file can be given");
                    }
                    parsed.library = Some(PathBuf::from(other));
                }
            }
        }
        Ok(parsed)
    }
}

fn main() -> Result<()> {
    // RUST_LOG=debug for verbose output
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = match Args::parse(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{}\n\n{}", e, USAGE);
            std::process::exit(2);
        }
    };
    if args.help {
        println!("{}", USAGE);
        return Ok(());
    }

    if args.list_devices {
        for device in get_output_devices()? {
            println!("{}", device);
        }
        return Ok(());
    }

    let config_path = args.config.clone().unwrap_or_else(default_config_path);
    let config: AutoDjConfig = load_config(&config_path);

    if args.test_tone {
        return play_test_tone(&config);
    }

    let (tracks, provider) = load_tracks(&args, &config)?;
    if tracks.is_empty() {
        bail!("No tracks to play");
    }
    log::info!("Loaded {} tracks", tracks.len());

    let model = config.compatibility_model();
    let matrix = DistanceMatrix::build(&tracks, &model);
    let tour = TourSolver::new(&matrix, config.solver.clone()).solve();
    println!("{}", TourReport::new(&tour, &tracks, &matrix));

    if args.plan_only {
        return Ok(());
    }

    let player = TourPlayer::new(config.player.clone()).with_model(model);
    match &args.bounce {
        Some(out) => bounce(out, &config, player, &tour, &tracks, &provider),
        None => play_live(&config, player, &tour, &tracks, &provider),
    }
}

fn load_tracks(args: &Args, config: &AutoDjConfig) -> Result<(Vec<TrackRecord>, WavBufferProvider)> {
    if let Some(dir) = &args.scan {
        let paths = scan_audio_files(dir)?;
        log::info!("Found {} WAV files in {:?}", paths.len(), dir);
        let mut cache = JsonAnalysisCache::open(config.analysis_cache_path());
        let tracks = analyze_library(&paths, &SidecarAnalyzer, &mut cache);
        return Ok((tracks, WavBufferProvider::new()));
    }

    let Some(path) = args.library.clone().or_else(|| config.library_path.clone()) else {
        bail!("No library given\n\n{}", USAGE);
    };
    let tracks = load_library(&path)?;
    let provider = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => WavBufferProvider::with_base_dir(dir),
        _ => WavBufferProvider::new(),
    };
    Ok((tracks, provider))
}

fn play_live(
    config: &AutoDjConfig,
    player: TourPlayer,
    tour: &Tour,
    tracks: &[TrackRecord],
    provider: &WavBufferProvider,
) -> Result<()> {
    let system = start_audio_output(&config.audio, &config.engine)?;
    println!(
        "Audio: {} Hz, {} frames (~{:.1} ms)",
        system.sample_rate, system.buffer_size, system.latency_ms
    );

    let (tx, rx) = event_channel();
    let player = player.with_events(tx);
    watch_stdin(player.stop_flag());

    let mut engine = system.engine;
    let summary = std::thread::scope(|scope| {
        let control = scope.spawn(move || {
            let mut clock = RealTimeClock;
            player.play(tour, tracks, provider, &mut engine, &mut clock)
        });

        for event in rx.iter() {
            println!("{}", event);
        }
        control
            .join()
            .map_err(|_| anyhow::anyhow!("Player thread panicked"))
    })??;

    log::debug!("Playback summary: {:?}", summary);
    Ok(())
}

fn bounce(
    out: &Path,
    config: &AutoDjConfig,
    player: TourPlayer,
    tour: &Tour,
    tracks: &[TrackRecord],
    provider: &WavBufferProvider,
) -> Result<()> {
    let player = if player.config().end_of_tour == EndOfTour::Loop {
        log::warn!("Looping tours never end; bouncing a single pass");
        let mut player_config = player.config().clone();
        player_config.end_of_tour = EndOfTour::PlayOut;
        TourPlayer::new(player_config).with_model(config.compatibility_model())
    } else {
        player
    };

    let sample_rate = config.audio.target_sample_rate();
    let (mut engine, renderer) = engine_channel(CrossfadeEngine::new(sample_rate, &config.engine));
    let sink = BounceSink::create(out, sample_rate)?;
    let block_frames = config.audio.buffer_size.frames() as usize;
    let mut clock =
        OfflineClock::with_block_size(renderer, block_frames).with_sink(Box::new(sink));

    let (tx, rx) = event_channel();
    let player = player.with_events(tx);
    let summary = player.play(tour, tracks, provider, &mut engine, &mut clock)?;
    drop(player);
    for event in rx.iter() {
        if !matches!(event, PlayerEvent::TourFinished { .. }) {
            println!("{}", event);
        }
    }

    let frames = clock.rendered_frames();
    clock.finish()?;
    println!(
        "Bounced {} tracks ({} crossfades, {:.1}s) to {}",
        summary.played,
        summary.crossfades,
        frames as f64 / sample_rate as f64,
        out.display()
    );
    Ok(())
}

fn play_test_tone(config: &AutoDjConfig) -> Result<()> {
    let mut system = start_audio_output(&config.audio, &config.engine)?;
    println!("Playing {} Hz test tone for {:.0}s", TEST_TONE_FREQ, TEST_TONE_SECS);
    system
        .engine
        .play_track(test_tone(TEST_TONE_SECS, system.sample_rate))?;
    std::thread::sleep(Duration::from_secs_f64(TEST_TONE_SECS));
    system.engine.stop();
    Ok(())
}

/// Stop the tour when the user types `q`
fn watch_stdin(stop: StopFlag) {
    let spawned = std::thread::Builder::new()
        .name("segue-stdin".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if matches!(line.trim(), "q" | "quit") {
                    println!("Stopping...");
                    stop.stop();
                    break;
                }
            }
        });
    if let Err(e) = spawned {
        log::warn!("Could not watch stdin for stop requests: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args> {
        Args::parse(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_parse_args() {
        let args = parse(&["--config", "c.yaml", "--bounce", "out.wav", "lib.json"]).unwrap();
        assert_eq!(args.config, Some(PathBuf::from("c.yaml")));
        assert_eq!(args.bounce, Some(PathBuf::from("out.wav")));
        assert_eq!(args.library, Some(PathBuf::from("lib.json")));
        assert!(!args.plan_only);

        assert!(parse(&["--plan-only"]).unwrap().plan_only);
        assert!(parse(&["--bounce"]).is_err());
        assert!(parse(&["--frobnicate"]).is_err());
        assert!(parse(&["a.json", "b.json"]).is_err());
    }
}
