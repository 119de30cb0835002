mod app;
mod config;
mod hub;
mod lyrics;
mod media;
mod playlists;
mod settings;
mod weather;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use time::OffsetDateTime;

#[derive(Debug, Parser)]
#[command(name = "standby", version, about = "Ambient home dashboard client")]
struct Cli {
    /// Override config file path.
    #[arg(long)]
    config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the dashboard loop (default).
    Run,
    /// Print the current media view to stdout (headless).
    Status,
    /// Print the current weather view to stdout (headless).
    Weather,
    /// Print the playlist catalog to stdout (headless).
    Playlists,
    /// Start a catalog playlist on the speaker, by id or title.
    Play { playlist: String },

    /// Toggle play/pause on the active source.
    PlayPause,
    /// Skip to the next track on the active source.
    Next,
    /// Skip to the previous track on the active source.
    Prev,
    /// Set speaker volume (0-100).
    Volume { percent: u8 },
    /// Toggle shuffle on the speaker.
    Shuffle,
    /// Turn on an entity (scene, script, or switch).
    Trigger { entity_id: String },

    /// Enable or disable synced lyrics.
    SetLyrics { on: bool },
    /// Set background overlay darkness (0-100).
    SetDarkness { value: u8 },
    /// Set the player pane layout.
    SetLayout { layout: LayoutArg },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LayoutArg {
    Classic,
    Cinematic,
}

impl From<LayoutArg> for settings::PlayerLayout {
    fn from(value: LayoutArg) -> Self {
        match value {
            LayoutArg::Classic => settings::PlayerLayout::Classic,
            LayoutArg::Cinematic => settings::PlayerLayout::Cinematic,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let cli = Cli::parse();
    let cfg = config::load(cli.config.as_deref()).context("load config")?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => {
            let settings_path = settings::default_settings_path()?;
            let prefs = settings::load(&settings_path);
            let mut app = app::App::new(cfg, prefs)?;
            app.run().await?;
        }
        Command::Status => {
            let hub = make_hub(&cfg)?;
            let (speaker, tv) = poll_both(&hub, &cfg).await;
            match media::reconcile(speaker.as_ref(), tv.as_ref()) {
                None => println!("offline"),
                Some(np) => print_status(&np, speaker.as_ref(), tv.as_ref()),
            }
        }
        Command::Weather => {
            let hub = make_hub(&cfg)?;
            let snapshot = hub.get_state(&cfg.entities.weather).await?;
            let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
            print_weather(&weather::derive(&snapshot, now));
        }
        Command::Playlists => {
            let hub = make_hub(&cfg)?;
            let entries = playlists::fetch_catalog(&hub, &cfg.entities.speaker).await?;
            if entries.is_empty() {
                println!("no playlists");
            }
            for (i, e) in entries.iter().enumerate() {
                let color = playlists::color::resolve(&hub, e.thumbnail.as_deref(), &e.title).await;
                println!("{:02}. {}  ({})  {}", i + 1, e.title, e.content_type, color.css());
            }
        }
        Command::Play { playlist } => {
            let hub = make_hub(&cfg)?;
            let entries = playlists::fetch_catalog(&hub, &cfg.entities.speaker).await?;
            let index = playlists::find_now_playing(&entries, &playlist)
                .with_context(|| format!("no playlist matching {playlist:?}"))?;
            let entry = &entries[index];
            anyhow::ensure!(entry.playable, "{} is not playable", entry.title);
            hub.play_media(&cfg.entities.speaker, &entry.id, &entry.content_type)
                .await?;
            println!("playing {}", entry.title);
        }
        Command::PlayPause => {
            let hub = make_hub(&cfg)?;
            let target = active_target(&hub, &cfg).await?;
            hub.media_play_pause(&target).await?;
        }
        Command::Next => {
            let hub = make_hub(&cfg)?;
            let target = active_target(&hub, &cfg).await?;
            hub.media_next_track(&target).await?;
        }
        Command::Prev => {
            let hub = make_hub(&cfg)?;
            let target = active_target(&hub, &cfg).await?;
            hub.media_previous_track(&target).await?;
        }
        Command::Volume { percent } => {
            let hub = make_hub(&cfg)?;
            // Volume always targets the speaker.
            hub.set_volume(&cfg.entities.speaker, f64::from(percent.min(100)) / 100.0)
                .await?;
        }
        Command::Shuffle => {
            let hub = make_hub(&cfg)?;
            let snapshot = hub.get_state(&cfg.entities.speaker).await?;
            let current = snapshot.attr_bool("shuffle").unwrap_or(false);
            hub.set_shuffle(&cfg.entities.speaker, !current).await?;
            println!("shuffle {}", if current { "off" } else { "on" });
        }
        Command::Trigger { entity_id } => {
            let hub = make_hub(&cfg)?;
            hub.turn_on(&entity_id).await?;
        }
        Command::SetLyrics { on } => mutate_settings(|s| s.set_show_lyrics(on))?,
        Command::SetDarkness { value } => mutate_settings(|s| s.set_darkness(value))?,
        Command::SetLayout { layout } => mutate_settings(|s| s.set_layout(layout.into()))?,
    }

    Ok(())
}

fn make_hub(cfg: &config::Config) -> anyhow::Result<hub::HubClient> {
    anyhow::ensure!(
        !cfg.hub.token.is_empty(),
        "no hub token configured; edit {}",
        config::default_config_path()?.display()
    );
    hub::HubClient::new(&cfg.hub.host, &cfg.hub.token)
}

async fn poll_both(
    hub: &hub::HubClient,
    cfg: &config::Config,
) -> (Option<hub::EntitySnapshot>, Option<hub::EntitySnapshot>) {
    let (speaker, tv) = tokio::join!(
        hub.get_state(&cfg.entities.speaker),
        hub.get_state(&cfg.entities.tv),
    );
    (speaker.ok(), tv.ok())
}

/// Resolve which entity transport commands should hit right now.
async fn active_target(hub: &hub::HubClient, cfg: &config::Config) -> anyhow::Result<String> {
    let (speaker, tv) = poll_both(hub, cfg).await;
    let source =
        media::select_source(speaker.as_ref(), tv.as_ref()).context("no media entity reachable")?;
    Ok(match source {
        media::ActiveSource::Speaker => cfg.entities.speaker.clone(),
        media::ActiveSource::Tv => cfg.entities.tv.clone(),
    })
}

fn print_status(
    np: &media::NowPlaying,
    speaker: Option<&hub::EntitySnapshot>,
    tv: Option<&hub::EntitySnapshot>,
) {
    let glyph = if np.is_playing() { ">" } else { "||" };
    let kind = if np.tv_mode { "video" } else { "music" };
    println!("{glyph} {kind} [{}] {}", np.state, np.title);
    if !np.artist.is_empty() {
        println!("    by {}", np.artist);
    }
    if !np.album.is_empty() {
        println!("    on {}", np.album);
    }
    if !np.playlist.is_empty() {
        println!("    playlist: {}", np.playlist);
    }
    let snapshot = match np.source {
        media::ActiveSource::Speaker => speaker,
        media::ActiveSource::Tv => tv,
    };
    if let Some(snap) = snapshot
        && let Some(pos) = media::position::estimate(snap, OffsetDateTime::now_utc())
    {
        println!("    position: {:.0}s", pos);
    }
    println!("    volume: {}%  shuffle: {}", np.volume_percent, np.shuffle);
    if !np.source_name.is_empty() {
        println!("    source: {}", np.source_name);
    }
}

fn print_weather(view: &weather::WeatherView) {
    println!("{} ({})", view.label, view.icon);
    println!("    now:   {}", weather::fmt_temp(view.temperature, &view.unit));
    println!(
        "    range: {} / {}",
        weather::fmt_temp(view.high, &view.unit),
        weather::fmt_temp(view.low, &view.unit)
    );
    println!("    feels: {}", weather::fmt_temp(view.feels_like, &view.unit));
}

fn mutate_settings(f: impl FnOnce(&mut settings::Settings)) -> anyhow::Result<()> {
    let path = settings::default_settings_path()?;
    let mut prefs = settings::load(&path);
    f(&mut prefs);
    settings::save(&prefs, &path)?;
    println!("{}", serde_json::to_string_pretty(&prefs)?);
    Ok(())
}
