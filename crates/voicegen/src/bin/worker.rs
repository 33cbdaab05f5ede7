use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::Ordering;

use log::info;
use voicegen::config::load_config_or_default;
use voicegen::{telemetry, AudioStorage, CommandSynthesizer, Database, Worker};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("voicegen-worker: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> voicegen::Result<()> {
    let config = load_config_or_default(std::env::args_os().nth(1).map(PathBuf::from))?;
    telemetry::init_logging(&config.logging)?;

    info!("Starting voicegen worker v{}", env!("CARGO_PKG_VERSION"));
    info!("Database: {:?}", config.database_path);
    info!("Audio output: {:?}", config.audio_dir());

    let db = Database::open(&config.database_path, config.store.busy_timeout())?;
    let storage = AudioStorage::new(&config.public_dir);
    let synthesizer = CommandSynthesizer::from_config(&config.synthesis);

    let mut worker = Worker::new(
        db,
        storage,
        Box::new(synthesizer),
        config.worker.poll_interval(),
    );

    if config.worker.fail_orphaned_on_startup {
        worker.fail_orphaned()?;
    }

    let shutdown = worker.shutdown_flag();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal, finishing current job...");
        shutdown.store(true, Ordering::Relaxed);
    })?;

    worker.run();
    Ok(())
}
