use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use keytype_core::filter::{WindowFilter, current_process_name};
use keytype_core::layout::{klid_for, layout_names};
use keytype_core::speed::SpeedConfig;
use keytype_core::types::{WindowDescriptor, WindowHandle};
use keytype_engine::directory::WindowDirectory;
use keytype_engine::engine::KeytypeEngine;
use keytype_engine::session::{SessionResult, SessionStage, TypingStatus};
use keytype_engine::tracker::TrackingMode;
use keytype_engine::traits::Platform;
use keytype_platform::ClipboardText;
use keytype_platform::test::RecordingPlatform;
use keytype_runtime::{ConfigStore, TypingDefaults};
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};

/// Types text into another window as synthesized keystrokes.
#[derive(Parser, Debug)]
#[command(name = "keytype", author, version, about, long_about = None)]
struct Cli {
    /// Settings file to use instead of the per-user default
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List windows that can receive text
    Windows,
    /// List selectable keyboard layouts
    Layouts,
    /// Print every foreground window change until Ctrl+C
    Watch,
    /// Type text into a window
    Type(TypeArgs),
    /// Show or initialise the settings file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the effective settings as JSON
    Show,
    /// Print where the settings file lives
    Path,
    /// Write the default settings if no file exists yet
    Init,
}

#[derive(Args, Debug)]
struct TypeArgs {
    /// Target window: a label from `keytype windows`, or a title (exact, then substring)
    #[arg(short, long)]
    window: Option<String>,

    /// Text to type
    #[arg(short, long, conflicts_with_all = ["stdin", "clipboard"])]
    text: Option<String>,

    /// Read the text from standard input
    #[arg(long, conflicts_with = "clipboard")]
    stdin: bool,

    /// Type the current clipboard contents
    #[arg(long)]
    clipboard: bool,

    /// Keyboard layout name (see `keytype layouts`)
    #[arg(short, long)]
    layout: Option<String>,

    /// auto, medium, slow, super-slow, or a delay such as `20ms`
    #[arg(short, long)]
    speed: Option<SpeedConfig>,

    /// Keep typing when another window takes focus
    #[arg(long)]
    no_abort_on_focus_change: bool,

    /// Seconds to wait for a focus switch when no --window is given
    #[arg(long, default_value_t = 3)]
    countdown: u64,

    /// Run against an in-memory backend and print what would be typed
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let store = match &cli.config {
        Some(path) => ConfigStore::at_path(path),
        None => ConfigStore::open_default()?,
    };

    match cli.command {
        Command::Windows => list_windows(),
        Command::Layouts => {
            list_layouts();
            Ok(())
        }
        Command::Watch => watch().await,
        Command::Type(args) => type_text(&store, args).await,
        Command::Config { action } => config(&store, action),
    }
}

fn own_filter() -> WindowFilter {
    WindowFilter::new(&current_process_name())
}

fn list_windows() -> anyhow::Result<()> {
    let platform = keytype_platform::native_platform()?;
    let mut dir = WindowDirectory::new(own_filter());
    let windows = dir.refresh(&platform);
    if windows.is_empty() {
        println!("(no windows found)");
    }
    for w in windows {
        println!("{}", w.label());
    }
    Ok(())
}

fn list_layouts() {
    for name in layout_names() {
        match klid_for(name) {
            Some(klid) => println!("{name}\t{klid}"),
            None => println!("{name}"),
        }
    }
}

fn describe_mode(mode: &TrackingMode) -> String {
    match mode {
        TrackingMode::Stopped => "stopped".into(),
        TrackingMode::EventHook => "event hook".into(),
        TrackingMode::Polling {
            fallback_reason: None,
        } => "polling".into(),
        TrackingMode::Polling {
            fallback_reason: Some(reason),
        } => format!("polling (event hook unavailable: {reason})"),
    }
}

async fn watch() -> anyhow::Result<()> {
    let platform = Arc::new(keytype_platform::native_platform()?);
    let (tx, _rx) = unbounded_channel();
    let mut engine = KeytypeEngine::new(platform, own_filter(), tx);

    let mode = engine.start_foreground_tracking(|w| {
        println!("[{}] {}", w.generation, w.title);
    })?;
    if let TrackingMode::Polling {
        fallback_reason: Some(reason),
    } = &mode
    {
        log::warn!("foreground event hook unavailable, polling instead: {reason}");
    }
    log::info!("watching foreground changes ({}); Ctrl+C to stop", describe_mode(&mode));

    tokio::signal::ctrl_c().await.context("wait for Ctrl+C")?;
    engine.stop_foreground_tracking();
    Ok(())
}

fn config(store: &ConfigStore, action: ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            let cfg = store.load()?;
            println!("{}", serde_json::to_string_pretty(&cfg)?);
        }
        ConfigAction::Path => println!("{}", store.path().display()),
        ConfigAction::Init => {
            if store.path().exists() {
                println!("{} already exists", store.path().display());
            } else {
                store.save(&store.load()?)?;
                println!("wrote {}", store.path().display());
            }
        }
    }
    Ok(())
}

fn describe_status(status: &TypingStatus) -> String {
    match status {
        TypingStatus::Ready => "ready".into(),
        TypingStatus::Typing => "typing...".into(),
        TypingStatus::Stopping => "stopping...".into(),
        TypingStatus::Stopped { by_user: true } => "stopped".into(),
        TypingStatus::Stopped { by_user: false } => "stopped: focus moved to another window".into(),
        TypingStatus::TypedTo(title) => format!("typed to \"{title}\""),
        TypingStatus::Error(msg) => format!("error: {msg}"),
    }
}

fn spawn_status_printer(mut rx: UnboundedReceiver<TypingStatus>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(status) = rx.recv().await {
            match status {
                TypingStatus::Error(_) => log::error!("{}", describe_status(&status)),
                _ => log::info!("{}", describe_status(&status)),
            }
        }
    })
}

enum TextSource {
    Inline(String),
    Stdin,
    Clipboard,
}

impl TextSource {
    fn from_args(args: &TypeArgs) -> anyhow::Result<Self> {
        match (&args.text, args.stdin, args.clipboard) {
            (Some(text), _, _) => Ok(Self::Inline(text.clone())),
            (None, true, _) => Ok(Self::Stdin),
            (None, false, true) => Ok(Self::Clipboard),
            (None, false, false) => anyhow::bail!("nothing to type: pass --text, --stdin or --clipboard"),
        }
    }

    fn read(self, clipboard: &dyn ClipboardText) -> anyhow::Result<String> {
        match self {
            Self::Inline(text) => Ok(text),
            Self::Stdin => {
                let mut text = String::new();
                std::io::stdin()
                    .read_to_string(&mut text)
                    .context("read text from stdin")?;
                Ok(text)
            }
            Self::Clipboard => clipboard.clipboard_text().context("read clipboard"),
        }
    }
}

async fn type_text(store: &ConfigStore, args: TypeArgs) -> anyhow::Result<()> {
    let defaults = TypingDefaults::from_config(&store.load()?)
        .with_layout(args.layout.as_deref())
        .with_speed(args.speed)
        .without_focus_abort(args.no_abort_on_focus_change);
    let source = TextSource::from_args(&args)?;

    if args.dry_run {
        let target = WindowDescriptor::new(WindowHandle::Hwnd(1), "Dry run", "dry-run");
        let platform = Arc::new(RecordingPlatform::new().with_windows(vec![target.clone()]));
        let text = source.read(&*platform)?;
        let result = run_typing(platform.clone(), &defaults, &text, Some(target), 0).await?;
        println!("{}", platform.typed_text());
        log::info!(
            "{} events, {} characters sent",
            platform.events().len(),
            result.chars_sent
        );
        return Ok(());
    }

    let platform = Arc::new(keytype_platform::native_platform()?);
    let text = source.read(&*platform)?;
    let target = match &args.window {
        Some(query) => {
            let mut dir = WindowDirectory::new(own_filter());
            dir.refresh(&*platform);
            let found = dir
                .find(query)
                .cloned()
                .with_context(|| format!("no window matches {query:?}; see `keytype windows`"))?;
            Some(found)
        }
        None => None,
    };

    let result = run_typing(platform, &defaults, &text, target, args.countdown).await?;
    match result.stage {
        SessionStage::Completed => Ok(()),
        SessionStage::Cancelled => {
            println!("cancelled after {} characters", result.chars_sent);
            Ok(())
        }
        _ => anyhow::bail!(
            "typing failed after {} characters: {}",
            result.chars_sent,
            result.error.unwrap_or_else(|| "unknown error".into())
        ),
    }
}

async fn run_typing<P: Platform>(
    platform: Arc<P>,
    defaults: &TypingDefaults,
    text: &str,
    target: Option<WindowDescriptor>,
    countdown: u64,
) -> anyhow::Result<SessionResult> {
    let (tx, rx) = unbounded_channel();
    let printer = spawn_status_printer(rx);
    let mut engine =
        KeytypeEngine::new(platform, own_filter(), tx).with_altgr_style(defaults.altgr_style);

    // Without an explicit target, whatever the user focuses next is the target.
    if target.is_none() {
        let mode = engine.start_foreground_tracking(|_| {})?;
        log::debug!("foreground tracking: {}", describe_mode(&mode));
        println!("Switch to the target window within {countdown}s...");
        tokio::time::sleep(Duration::from_secs(countdown)).await;
    }

    let handle = engine.start_typing_session(
        text,
        target,
        &defaults.layout_name,
        defaults.speed,
        defaults.abort_on_focus_change,
    )?;

    let wait = handle.wait();
    tokio::pin!(wait);
    let result = loop {
        tokio::select! {
            result = &mut wait => break result,
            signal = tokio::signal::ctrl_c() => {
                signal.context("wait for Ctrl+C")?;
                engine.stop_active_session();
            }
        }
    };

    engine.stop_foreground_tracking();
    // Closing the status channel ends the printer.
    drop(engine);
    let _ = printer.await;
    Ok(result)
}
