use std::path::PathBuf;

use clap::{Parser, Subcommand};
use music_bridge_core::{
    boundary, AccountService, AppConfig, ToneAnalyser, ToneSummary, TrackRecord, CHANNELS,
    SAMPLE_RATE,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

const DEFAULT_BLOCK_FRAMES: usize = 4096;

fn main() -> music_bridge_core::Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    init_tracing(&config.logging.filter);

    let service = AccountService::with_config(&config.account);
    if cli.username.is_some() || cli.password.is_some() {
        let username = cli.username.as_deref().unwrap_or_default();
        let password = cli.password.as_deref().unwrap_or_default();
        if !service.login(username, password) {
            tracing::warn!(error = ?service.last_error(), "login failed");
        }
    }

    let output = Output { json: cli.json };
    match cli.command {
        Commands::Search { query, exclude } => run_search(&service, &output, &query, &exclude),
        Commands::Playlists { user } => run_playlists(&service, &output, user),
        Commands::Playlist { name, user } => run_playlist(&service, &output, &name, user),
        Commands::Stream {
            track_id,
            frames,
            block,
        } => run_stream(&service, &output, &track_id, frames, block),
        Commands::Settings => output.emit(&boundary::settings(&service), |info| {
            println!("{}: {}", music_bridge_core::SETTINGS_WINDOW_TITLE, status(info.logged_in));
            println!("  account      {}", info.account_name.as_deref().unwrap_or("-"));
            println!("  last login   {}", info.last_login_utc.as_deref().unwrap_or("-"));
            println!("  remember me  {}", info.remember_me);
            println!("  auto login   {}", info.auto_login);
        }),
    }
}

fn run_search(
    service: &AccountService,
    output: &Output,
    query: &str,
    exclude: &[String],
) -> music_bridge_core::Result<()> {
    tracing::info!(query, excluded = exclude.len(), "searching catalog");
    let tracks = service.search_missing(query, exclude);
    output.emit(&tracks, |tracks| print_tracks(tracks))
}

fn run_playlists(
    service: &AccountService,
    output: &Output,
    user: bool,
) -> music_bridge_core::Result<()> {
    let playlists = if user {
        service.list_user_playlists()
    } else {
        service.list_playlists()
    };
    output.emit(&playlists, |playlists| {
        for playlist in playlists {
            println!(
                "{:<28} {:>2} tracks  {}",
                playlist.name, playlist.track_count, playlist.description
            );
        }
    })
}

fn run_playlist(
    service: &AccountService,
    output: &Output,
    name: &str,
    user: bool,
) -> music_bridge_core::Result<()> {
    let view = if user {
        service.load_user_playlist(name)?
    } else {
        service.load_playlist(name)?
    };
    output.emit(&view, |view| {
        println!("{} - {}", view.name, view.description);
        print_tracks(&view.tracks);
    })
}

#[derive(Debug, Serialize)]
struct StreamReport {
    session: u64,
    track: TrackRecord,
    frames_read: u64,
    total_frames: u64,
    seconds: f64,
    tone: Option<ToneSummary>,
}

fn run_stream(
    service: &AccountService,
    output: &Output,
    track_id: &str,
    frame_limit: Option<u64>,
    block: usize,
) -> music_bridge_core::Result<()> {
    let stream = service.start_stream(track_id)?;
    let session = stream.id();
    let limit = frame_limit.unwrap_or(u64::MAX);

    let probe_len = SAMPLE_RATE as usize * CHANNELS;
    let mut probe = Vec::with_capacity(probe_len);
    let mut buffer = vec![0.0_f32; block.max(1) * CHANNELS];
    let mut frames_read = 0u64;

    while frames_read < limit {
        let request = (limit - frames_read).min(block.max(1) as u64) as usize;
        let read = boundary::read_stream(service, session, Some(buffer.as_mut_slice()), request);
        if read == 0 {
            break;
        }
        frames_read += read as u64;

        let take = (probe_len - probe.len()).min(read * CHANNELS);
        probe.extend_from_slice(&buffer[..take]);
    }

    let report = StreamReport {
        session,
        track: stream.track(),
        frames_read,
        total_frames: stream.total_frames(),
        seconds: stream.position_seconds(),
        tone: probe_tone(&probe)?,
    };
    boundary::close_stream(service, session);
    tracing::debug!(session, frames_read, "stream closed");

    output.emit(&report, |report| {
        println!(
            "session {} streamed {} / {} frames ({:.2}s) of {} - {}",
            report.session,
            report.frames_read,
            report.total_frames,
            report.seconds,
            report.track.artist,
            report.track.title
        );
        if let Some(tone) = &report.tone {
            println!(
                "  left  {:>7.1} Hz  rms {:.3}",
                tone.left.dominant_hz, tone.left.rms
            );
            println!(
                "  right {:>7.1} Hz  rms {:.3}",
                tone.right.dominant_hz, tone.right.rms
            );
        }
    })
}

fn probe_tone(samples: &[f32]) -> music_bridge_core::Result<Option<ToneSummary>> {
    if samples.len() < 2 * CHANNELS {
        return Ok(None);
    }
    let mut analyser = ToneAnalyser::with_sample_rate(SAMPLE_RATE);
    analyser.analyse(samples).map(Some)
}

fn print_tracks(tracks: &[TrackRecord]) {
    for track in tracks {
        println!(
            "{:<8} {:<20} {:<16} {:<16} {:>4}s",
            track.id, track.title, track.artist, track.album, track.duration_seconds
        );
    }
}

fn status(logged_in: bool) -> &'static str {
    if logged_in {
        "signed in"
    } else {
        "signed out"
    }
}

struct Output {
    json: bool,
}

impl Output {
    fn emit<T: Serialize>(&self, value: &T, plain: impl FnOnce(&T)) -> music_bridge_core::Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            plain(value);
        }
        Ok(())
    }
}

fn init_tracing(default_filter: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "In-process virtual music streaming service", long_about = None)]
struct Cli {
    /// JSON configuration file with account and logging settings.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Sign in with this account before running the command.
    #[arg(short, long, global = true)]
    username: Option<String>,
    #[arg(short, long, global = true)]
    password: Option<String>,
    /// Print results as JSON.
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search the catalog by title, artist or album.
    Search {
        query: String,
        /// Track ids to leave out of the results.
        #[arg(long)]
        exclude: Vec<String>,
    },
    /// List library playlists, or the account's own with `--user`.
    Playlists {
        #[arg(long)]
        user: bool,
    },
    /// Show the tracks of one playlist.
    Playlist {
        name: String,
        #[arg(long)]
        user: bool,
    },
    /// Render a track's synthetic stream and report what was produced.
    Stream {
        track_id: String,
        /// Stop after this many frames instead of the whole track.
        #[arg(short, long)]
        frames: Option<u64>,
        /// Frames requested per read.
        #[arg(short, long, default_value_t = DEFAULT_BLOCK_FRAMES)]
        block: usize,
    },
    /// Show the current account settings.
    Settings,
}
