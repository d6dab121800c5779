//! Story CLI Tool
//!
//! Command-line interface for creating stories from editor scripts,
//! inspecting story bundles, simulating playback and rendering previews.

mod logging;
mod script;
mod sinks;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use story_core::{Color, Policy, Privacy, StoryBundle, StoryId, StoryItem};
use story_editor::{EditorConfig, Publisher, StoryDraft};
use story_player::progress::format_duration;
use story_player::{FrameCompositor, ManualClock, PlaybackController, PlaybackObserver};

use script::{EditStep, PlayStep};
use sinks::{BundleSink, DirUploader};

#[derive(Parser)]
#[command(name = "storyctl")]
#[command(about = "Create, inspect and play ephemeral stories")]
#[command(version)]
struct Cli {
    /// Enable debug logging (RUST_LOG is honored)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON file overriding the duration policy values
    #[arg(long, global = true)]
    policy: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum PrivacyArg {
    Public,
    Friends,
    Private,
}

impl From<PrivacyArg> for Privacy {
    fn from(value: PrivacyArg) -> Self {
        match value {
            PrivacyArg::Public => Privacy::Public,
            PrivacyArg::Friends => Privacy::Friends,
            PrivacyArg::Private => Privacy::Private,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Edit a new story from a script and publish it into a bundle
    Create {
        /// Story bundle file, created if missing
        bundle: PathBuf,

        /// Author name for a new bundle
        #[arg(long, default_value = "me")]
        author: String,

        /// Gradient background as two colors, e.g. "#ff0080,#0040ff"
        #[arg(long, conflicts_with_all = ["image", "video"])]
        gradient: Option<String>,

        /// Image uri
        #[arg(long, conflicts_with = "video")]
        image: Option<String>,

        /// Local video file
        #[arg(long, requires = "duration")]
        video: Option<PathBuf>,

        /// Source video duration in seconds
        #[arg(long)]
        duration: Option<f64>,

        /// JSON editor script
        #[arg(short, long)]
        script: Option<PathBuf>,

        /// Directory uploaded video is copied to
        #[arg(long, default_value = "media")]
        media_dir: PathBuf,

        #[arg(long, value_enum)]
        privacy: Option<PrivacyArg>,
    },

    /// Show bundle information
    Info {
        bundle: PathBuf,
    },

    /// Simulate a viewing session
    Play {
        bundle: PathBuf,

        /// JSON viewer script; without one every item plays to completion
        #[arg(short, long)]
        script: Option<PathBuf>,

        /// Index of the first item to show
        #[arg(long, default_value = "0")]
        start: usize,

        /// Also play items past their retention window
        #[arg(long)]
        include_expired: bool,

        /// Write a preview frame after every script step into this directory
        #[arg(long)]
        frames: Option<PathBuf>,

        #[arg(long, default_value = "1080")]
        width: u32,

        #[arg(long, default_value = "1920")]
        height: u32,
    },

    /// Render one item to a PNG preview
    Render {
        bundle: PathBuf,

        /// Story id
        #[arg(long)]
        item: u64,

        #[arg(short, long)]
        output: PathBuf,

        #[arg(long, default_value = "1080")]
        width: u32,

        #[arg(long, default_value = "1920")]
        height: u32,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let policy = match &cli.policy {
        Some(path) => {
            let file = File::open(path).context("Failed to open policy file")?;
            Policy::from_json(BufReader::new(file)).context("Failed to read policy file")?
        }
        None => Policy::default(),
    };

    match cli.command {
        Commands::Create {
            bundle,
            author,
            gradient,
            image,
            video,
            duration,
            script,
            media_dir,
            privacy,
        } => {
            let draft = build_draft(gradient, image, video, duration, privacy, &policy)?;
            create_story(bundle, &author, draft, script, media_dir, &policy)?
        }

        Commands::Info { bundle } => print_info(&read_bundle(&bundle)?, &policy),

        Commands::Play {
            bundle,
            script,
            start,
            include_expired,
            frames,
            width,
            height,
        } => play_bundle(
            &bundle,
            script,
            start,
            include_expired,
            frames,
            (width, height),
            &policy,
        )?,

        Commands::Render {
            bundle,
            item,
            output,
            width,
            height,
        } => render_item(&bundle, StoryId(item), &output, (width, height))?,
    }

    Ok(())
}

fn read_bundle(path: &Path) -> Result<StoryBundle> {
    let file = File::open(path).context("Failed to open story bundle")?;
    StoryBundle::read(BufReader::new(file)).context("Failed to read story bundle")
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse {}", path.display()))
}

fn build_draft(
    gradient: Option<String>,
    image: Option<String>,
    video: Option<PathBuf>,
    duration: Option<f64>,
    privacy: Option<PrivacyArg>,
    policy: &Policy,
) -> Result<StoryDraft> {
    let config = EditorConfig::default();
    let mut draft = match (gradient, image, video) {
        (_, Some(uri), _) => StoryDraft::image(uri, config),
        (_, _, Some(path)) => {
            let duration = duration.context("--duration is required for video")?;
            let uri = format!("file://{}", path.display());
            StoryDraft::video(uri, duration, policy, config)
                .map_err(|err| anyhow::anyhow!(err.user_message()))?
        }
        (Some(colors), _, _) => {
            let (from, to) = parse_gradient(&colors)?;
            StoryDraft::gradient(from, to, config)
        }
        (None, None, None) => StoryDraft::gradient(
            Color::rgb(0x83, 0x3a, 0xb4),
            Color::rgb(0xfd, 0x1d, 0x1d),
            config,
        ),
    };

    if let Some(privacy) = privacy {
        draft.set_privacy(privacy.into());
    }
    Ok(draft)
}

fn parse_gradient(value: &str) -> Result<(Color, Color)> {
    let Some((from, to)) = value.split_once(',') else {
        bail!("Gradient must be two colors separated by a comma");
    };
    let from = from.trim().parse().context("Invalid gradient start color")?;
    let to = to.trim().parse().context("Invalid gradient end color")?;
    Ok((from, to))
}

fn create_story(
    bundle: PathBuf,
    author: &str,
    mut draft: StoryDraft,
    script: Option<PathBuf>,
    media_dir: PathBuf,
    policy: &Policy,
) -> Result<()> {
    println!("Editing {} story", draft.media().kind());

    if let Some(script) = script {
        let steps: Vec<EditStep> = read_json(&script)?;
        println!("Replaying {} editor steps", steps.len());
        script::run_edit_script(&mut draft, &steps);
    }

    if let Some(trim) = draft.trim() {
        let window = trim.window();
        println!(
            "Trim: {:.1}s - {:.1}s ({:.1}s of {:.1}s, max {:.1}s)",
            window.start,
            window.end,
            window.span(),
            trim.source_duration(),
            trim.max_span()
        );
    }

    let sink = BundleSink::open(&bundle, author).context("Failed to open story bundle")?;
    let mut publisher = Publisher::new(DirUploader::new(media_dir), sink, policy.clone());

    match publisher.submit(&draft) {
        Ok(item) => {
            println!(
                "Published story {} with {} overlays to {} ({} stories)",
                item.id(),
                item.overlays().len(),
                bundle.display(),
                publisher.sink().bundle().items.len()
            );
            Ok(())
        }
        Err(err) => {
            eprintln!("{}", err.user_message());
            Err(publish_failure(err))
        }
    }
}

/// Keeps the editor error in the chain so callers can still tell a
/// retryable failure from a rejected draft
fn publish_failure(err: story_editor::Error) -> anyhow::Error {
    anyhow::Error::new(err).context("Failed to publish story")
}

fn print_info(bundle: &StoryBundle, policy: &Policy) {
    let now = Utc::now();
    println!("\n=== Story Bundle ===");
    println!("Version: {}", bundle.header.version);
    println!("Author: {}", bundle.header.author);
    println!("Items: {}", bundle.items.len());
    println!(
        "Active: {}",
        bundle.active_items(now, policy).len()
    );

    println!("\n=== Items ===");
    for item in &bundle.items {
        let remaining = item.expires_at(policy) - now;
        let expiry = if item.is_expired(now, policy) {
            "expired".to_string()
        } else {
            format!(
                "expires in {}",
                format_duration(remaining.num_seconds().max(0) as f64)
            )
        };
        println!(
            "  Story {}: {} {}, {} overlays, {}, {}, {}",
            item.id(),
            item.kind(),
            item.content().uri().unwrap_or("(gradient)"),
            item.overlays().len(),
            format_duration(item.duration_hint().as_secs_f64()),
            item.privacy(),
            expiry
        );
        for overlay in item.overlays() {
            println!(
                "    Overlay {} {:?} at ({:.0}, {:.0}) x{:.2} size {:.0} color {}",
                overlay.id(),
                overlay.text(),
                overlay.position().x,
                overlay.position().y,
                overlay.scale(),
                overlay.base_size(),
                overlay.style().color
            );
        }
    }
}

/// Prints every item the viewer moves to
struct PrintObserver;

impl PlaybackObserver for PrintObserver {
    fn on_index_changed(&mut self, index: usize, item: &StoryItem) {
        println!("  > showing item {} (story {}, {})", index, item.id(), item.kind());
    }

    fn on_exit(&mut self, reason: story_player::ExitReason) {
        println!("  > session ended: {:?}", reason);
    }
}

fn play_bundle(
    path: &Path,
    script: Option<PathBuf>,
    start: usize,
    include_expired: bool,
    frames: Option<PathBuf>,
    (width, height): (u32, u32),
    policy: &Policy,
) -> Result<()> {
    let bundle = read_bundle(path)?;
    let items = if include_expired {
        bundle.items.clone()
    } else {
        bundle.active_items(Utc::now(), policy)
    };
    println!("Playing {} stories by {}", items.len(), bundle.header.author);

    let clock = ManualClock::new();
    let mut controller =
        PlaybackController::open(items, start, policy, clock.clone()).with_observer(PrintObserver);
    if controller.is_exited() {
        println!("Nothing to play");
        return Ok(());
    }

    let compositor = FrameCompositor::new(width, height).context("Invalid frame size")?;
    if let Some(dir) = &frames {
        std::fs::create_dir_all(dir).context("Failed to create frames directory")?;
    }

    match script {
        Some(script) => {
            let steps: Vec<PlayStep> = read_json(&script)?;
            let mut failure = None;
            script::run_play_script(&mut controller, &clock, &steps, width as f32, |i, c| {
                let (Some(dir), Some(item), None) = (&frames, c.current_item(), &failure) else {
                    return;
                };
                let frame_path = dir.join(format!("frame_{:04}.png", i));
                if let Err(err) = compositor.render_to_file(item, &c.segments(), &frame_path) {
                    failure = Some(err);
                }
            });
            if let Some(err) = failure {
                return Err(err).context("Failed to save frame");
            }
            if !controller.is_exited() {
                println!(
                    "Script finished on item {:?} at {:.0}%",
                    controller.current_index(),
                    controller.progress() * 100.0
                );
            }
        }
        None => script::play_to_end(&mut controller, &clock),
    }

    Ok(())
}

fn render_item(path: &Path, id: StoryId, output: &Path, (width, height): (u32, u32)) -> Result<()> {
    let bundle = read_bundle(path)?;
    let item = bundle.get_item(id).context("Failed to find story")?;

    let compositor = FrameCompositor::new(width, height).context("Invalid frame size")?;
    compositor
        .render_to_file(item, &[], output)
        .context("Failed to save frame")?;
    println!("Saved story {} preview to {}", id, output.display());
    Ok(())
}
