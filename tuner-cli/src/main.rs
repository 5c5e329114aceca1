//! # Tuner - command-line front end
//!
//! Prints a live readout of a tuner session to the terminal.
//!
//! ## Architecture
//! - **Main Thread**: redraws the status line on the session's display cadence
//! - **Audio Thread**: owned by [`TunerSession`], runs the analysis pipeline
//! - **Stdin Thread**: waits for Enter and signals shutdown

mod cli;
mod display;

use std::io::{self, Write};
use std::thread;

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::{after, bounded, never, select, tick};
use log::{info, warn};
use tuner_core::audio::{AudioSource, CpalSource};
use tuner_core::synth::ToneSource;
use tuner_core::TunerSession;

use cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&cli.log_level))
        .init();

    let config = cli.load_config()?;
    info!("[MAIN] Configuration: {config:?}");

    match cli.simulate {
        Some(frequency) => {
            let source = ToneSource::new(frequency, config.sample_rate)
                .with_amplitude(cli.amplitude)
                .real_time(config.frame_size);
            run(TunerSession::with_chromatic_notes(source, config), &cli)
        }
        None => {
            let source = CpalSource::new(config.sample_rate);
            run(TunerSession::with_chromatic_notes(source, config), &cli)
        }
    }
}

/// Starts the session and redraws its state until the user quits, the
/// requested duration elapses or the capture ends.
fn run<S: AudioSource>(mut session: TunerSession<S>, cli: &Cli) -> Result<()> {
    let duration = cli.run_duration()?;
    session.start().context("failed to start the tuner")?;

    match duration {
        Some(d) => println!("Listening for {:.1}s...", d.as_secs_f64()),
        None => println!("Listening... press Enter to stop."),
    }

    let quit_rx = if duration.is_none() {
        let (quit_tx, quit_rx) = bounded(1);
        thread::spawn(move || {
            let mut line = String::new();
            let _ = io::stdin().read_line(&mut line);
            let _ = quit_tx.send(());
        });
        quit_rx
    } else {
        never()
    };
    let deadline = duration.map(after).unwrap_or_else(never);
    let refresh = tick(session.config().display_interval());

    let mut stdout = io::stdout();
    loop {
        select! {
            recv(refresh) -> _ => {
                let state = session.snapshot();
                // Pad to overwrite the remains of a longer previous line.
                print!("\r{:<96}", display::render(&state));
                stdout.flush()?;
                if !state.is_running {
                    println!();
                    warn!("[MAIN] Capture ended");
                    break;
                }
            },
            recv(quit_rx) -> _ => break,
            recv(deadline) -> _ => {
                println!();
                break;
            },
        }
    }

    session.stop();
    info!("[MAIN] Tuner stopped");
    Ok(())
}
