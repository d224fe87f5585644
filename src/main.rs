use std::{
    io::{self, BufRead},
    sync::{mpsc, Arc, Mutex},
};

use clap::Parser;
use log::{error, info};
use tokio::sync::broadcast;

use midi_playlist::{
    cli::{self, Args, CliCommand},
    clock_engine::spawn_clock_engine,
    config,
    engine::DirectiveSender,
    playlist::Playlist,
    playlist_file,
    session::PlaybackSession,
    session_manager::spawn_session_manager,
    terminal_view::{spawn_renderer, ViewState},
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut clog = colog::default_builder();
    clog.filter(None, log::LevelFilter::Debug);
    clog.init();

    std::panic::set_hook(Box::new(|panic_info| {
        let current_thread = std::thread::current();
        let thread_name = current_thread.name().unwrap_or("unnamed");
        log::error!("panic in thread '{}': {}", thread_name, panic_info);
    }));

    let args = Args::parse();

    let config_path = match args.config.clone() {
        Some(path) => path,
        None => config::default_config_path()?,
    };
    let mut config = config::load_or_create(&config_path)?;
    let persisted_files = config.files.clone();
    if let Some(track_seconds) = args.track_seconds {
        config.engine.nominal_track_seconds = track_seconds;
    }

    let mut playlist = Playlist::new();
    for path in &args.playlists {
        match playlist_file::read_playlist(path) {
            Ok(tracks) => {
                info!("Loaded {} tracks from {}", tracks.len(), path.display());
                playlist.extend(tracks);
                config.files.remember_playlist_dir(path);
            }
            Err(err) => error!("Failed to read playlist {}: {}", path.display(), err),
        }
    }
    playlist.extend(
        args.tracks
            .iter()
            .map(|path| path.to_string_lossy().into_owned()),
    );

    let (bus_sender, _) = broadcast::channel(1024);
    let view = Arc::new(Mutex::new(ViewState::default()));
    let renderer_thread = spawn_renderer(bus_sender.subscribe(), view.clone())?;

    let default_tempo = config.playback.default_tempo_bpm;
    let (directive_sender, directive_receiver) = mpsc::channel();
    let session =
        PlaybackSession::with_default_tempo(DirectiveSender::new(directive_sender), default_tempo);
    let (session_handle, session_thread) =
        spawn_session_manager(playlist, session, bus_sender.clone())?;
    let engine_thread = spawn_clock_engine(
        directive_receiver,
        session_handle.clone(),
        &config.engine,
        default_tempo,
    )?;

    println!("{}", cli::HELP);
    for line in io::stdin().lock().lines() {
        let line = line?;
        match cli::parse_command(&line, &mut config.files, &config.playback) {
            Ok(None) => {}
            Ok(Some(CliCommand::Dispatch(message))) => {
                if !session_handle.send(message) {
                    error!("Session service is no longer running");
                    break;
                }
            }
            Ok(Some(CliCommand::List)) => {
                let view = view.lock().expect("view state lock poisoned");
                println!("{}", view.render_playlist());
            }
            Ok(Some(CliCommand::Status)) => {
                let view = view.lock().expect("view state lock poisoned");
                println!("{}", view.render_status());
            }
            Ok(Some(CliCommand::Help)) => println!("{}", cli::HELP),
            Ok(Some(CliCommand::Quit)) => break,
            Err(message) => println!("{}", message),
        }
    }

    session_handle.shutdown();
    drop(session_handle);
    if session_thread.join().is_err() {
        error!("Session service thread panicked");
    }
    if engine_thread.join().is_err() {
        error!("Clock engine thread panicked");
    }
    drop(bus_sender);
    if renderer_thread.join().is_err() {
        error!("Renderer thread panicked");
    }

    if config.files != persisted_files {
        let mut saved = config::load_or_create(&config_path)?;
        saved.files = config.files;
        config::save(&config_path, &saved)?;
        info!("Saved last used directories to {}", config_path.display());
    }
    Ok(())
}
