use clap::Parser;
use log::LevelFilter;
use pulsesync::{
    cli::{validate_render_args, Args, Command, RenderArgs},
    logging,
    offline::{render_offline, OfflineRender, RenderReport},
    renderer::waveform::PulseKind,
    ui::create_render_progress,
    Precision, Result, Settings, StaticTimelineSource, SyncEngine, Timeline, TickMapBuilder,
};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

fn main() {
    let args = Args::parse();
    initialize_logging(args.verbose);

    let settings = match Settings::load(args.settings.as_deref()) {
        Ok(settings) => settings,
        Err(e) => exit_with_error(&format!("Error loading settings: {}", e)),
    };

    let result = match &args.command {
        Command::Map { timeline } => print_tick_map(timeline, &settings),
        Command::Render(render) => {
            if let Err(error_msg) = validate_render_args(render, &settings) {
                exit_with_error(&error_msg);
            }
            render_timeline(render, &settings)
        }
    };

    if let Err(e) = result {
        exit_with_error(&format!("Error: {}", e));
    }
    log::info!("Done");
}

fn initialize_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    if let Err(e) = logging::init_logger(level, verbose) {
        eprintln!("Logging disabled: {}", e);
    }
    log::info!("Application starting");
}

fn exit_with_error(error_msg: &str) -> ! {
    log::error!("{}", error_msg);
    eprintln!("{}", error_msg);
    std::process::exit(1);
}

fn print_tick_map(path: &Path, settings: &Settings) -> Result<()> {
    let timeline = Timeline::from_file(path)?;
    let map = TickMapBuilder::new(Precision::new(settings.sample_rate)).build(&timeline)?;
    println!("{}", map);
    Ok(())
}

fn render_timeline(args: &RenderArgs, settings: &Settings) -> Result<()> {
    let timeline = Timeline::from_file(&args.timeline)?;
    let mut engine =
        SyncEngine::from_settings(StaticTimelineSource::with_timeline(0, timeline), settings);
    // Surface build errors instead of rendering silence
    engine.rebuild()?;

    let controls = engine.controls();
    if let Some(path) = &args.state {
        controls.restore(&fs::read(path)?)?;
    }
    if let Some(delay_ms) = args.delay_ms {
        controls.set_delay(delay_ms / 1000.0);
    }
    if args.always_on {
        controls.set_always_on(true);
    }

    let mut renderer = engine.create_renderer();
    renderer.prepare(
        settings.sample_rate,
        settings.max_block_size,
        settings.channels,
    );

    let total_frames = (args.seconds * settings.sample_rate).round() as u64;
    let request = OfflineRender {
        start_sample: args.start_sample,
        playing: !args.stopped,
        total_frames,
        block_size: args.block_size.unwrap_or(settings.max_block_size),
    };

    let mut writer = match &args.output {
        Some(path) => Some(BufWriter::new(File::create(path)?)),
        None => None,
    };
    let progress = create_render_progress(total_frames, settings.sample_rate);
    let report = render_offline(&mut renderer, request, |block| {
        if let Some(writer) = writer.as_mut() {
            for sample in block {
                writer.write_all(&sample.to_le_bytes())?;
            }
        }
        progress.inc(block.len() as u64);
        Ok(())
    })?;
    progress.finish_and_clear();
    if let Some(mut writer) = writer {
        writer.flush()?;
    }

    print_report(&report, settings.sample_rate, args.list_ticks);
    let bounds = renderer.bounds();
    println!(
        "Allowed spacing: {}..={} samples",
        bounds.min_samples, bounds.max_samples
    );

    if let Some(path) = &args.save_state {
        fs::write(path, controls.to_bytes())?;
        println!("Saved state to {}", path.display());
    }
    Ok(())
}

fn print_report(report: &RenderReport, sample_rate: f64, list_ticks: bool) {
    println!(
        "Rendered {} frames ({:.3} s)",
        report.frames,
        report.frames as f64 / sample_rate
    );
    println!(
        "Pulses: {} ({} accents)",
        report.pulse_count(),
        report.accent_count()
    );
    if let Some((min, max)) = report.spacing_range() {
        println!("Spacing: {}..={} samples", min, max);
    }

    if list_ticks {
        for pulse in &report.pulses {
            let marker = match pulse.kind {
                PulseKind::Regular => "tick",
                PulseKind::Accent => "TICK (bar)",
            };
            println!(
                "  {:>10}  {:>10.6}s  {}",
                pulse.start,
                pulse.start as f64 / sample_rate,
                marker
            );
        }
    }
}
