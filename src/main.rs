//! Pi Sentry - Motion-Triggered Camera Binary
//!
//! Runs the sentry loop on a Raspberry Pi, plus a few hardware self-tests and
//! the capture receiver.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use pi_sentry::receiver::DEFAULT_RECEIVER_PORT;
use pi_sentry::sentry::BLINK_DURATION;
use pi_sentry::{
    capture_single_image, install_signal_handler, start_receiver, CaptureUploader, Hardware,
    ImageCapturer, MotionDetector, ReceiverConfig, SentryConfig, SentryLoop, StatusIndicator,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn, Level};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "pi_sentry")]
#[command(about = "📷 Pi Sentry - Motion-Triggered Camera")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = "Captures a photo whenever the PIR sensor sees motion and uploads it")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Use simulated GPIO, PIR and camera
    #[arg(long, global = true)]
    mock: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Directory captures are written to
    #[arg(long, global = true)]
    captures_dir: Option<PathBuf>,

    /// Upload endpoint URL
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Bearer token for uploads
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Keep captures local
    #[arg(long, global = true)]
    no_upload: bool,

    /// Seconds to idle after each capture
    #[arg(long, global = true)]
    cooldown: Option<f64>,

    /// Seconds to let the PIR sensor settle
    #[arg(long, global = true)]
    calibration: Option<f64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the sentry loop (default)
    Run,

    /// Take a single photo and exit
    Capture(CaptureArgs),

    /// Upload one image file
    Upload(UploadArgs),

    /// Blink the status LED
    Blink(BlinkArgs),

    /// Wait once for motion
    Watch(WatchArgs),

    /// Run the capture receiver
    Receive(ReceiveArgs),
}

#[derive(Args)]
struct CaptureArgs {
    /// File name inside the captures directory
    #[arg(long)]
    filename: Option<String>,
}

#[derive(Args)]
struct UploadArgs {
    /// Image to upload
    path: PathBuf,
}

#[derive(Args)]
struct BlinkArgs {
    /// Number of blinks
    #[arg(long, default_value_t = 3)]
    count: u32,

    /// Seconds the LED stays on
    #[arg(long, default_value_t = 0.5)]
    duration: f64,

    /// Seconds between blinks
    #[arg(long, default_value_t = 0.5)]
    gap: f64,
}

#[derive(Args)]
struct WatchArgs {
    /// Give up after this many seconds
    #[arg(long)]
    timeout: Option<f64>,
}

#[derive(Args)]
struct ReceiveArgs {
    /// Receiver bind address
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Receiver port
    #[arg(short, long, default_value_t = DEFAULT_RECEIVER_PORT)]
    port: u16,

    /// Directory received images are stored in
    #[arg(long, env = "RECEIVER_DIR", default_value = "received")]
    dir: PathBuf,

    /// Secret for the admin routes
    #[arg(long, env = "ADMIN_API_KEY")]
    admin_api_key: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = build_config(&cli)?;

    init_logging(cli.debug || config.debug)?;

    print_banner();

    match &cli.command {
        Some(Commands::Run) | None => run_command(&config).await?,
        Some(Commands::Capture(args)) => capture_command(&config, args).await?,
        Some(Commands::Upload(args)) => upload_command(&config, args).await?,
        Some(Commands::Blink(args)) => blink_command(&config, args).await?,
        Some(Commands::Watch(args)) => watch_command(&config, args).await?,
        Some(Commands::Receive(args)) => receive_command(&config, args).await?,
    }

    Ok(())
}

/// Environment first, then command-line overrides.
fn build_config(cli: &Cli) -> anyhow::Result<SentryConfig> {
    let mut config = SentryConfig::from_env();

    if cli.mock {
        config = config.with_mock_hardware(true);
    }
    if let Some(dir) = &cli.captures_dir {
        config = config.with_captures_dir(dir);
    }
    if let Some(endpoint) = &cli.endpoint {
        config.api_endpoint = endpoint.clone();
    }
    if let Some(key) = &cli.api_key {
        config.api_key = key.clone();
    }
    if cli.no_upload {
        config = config.with_upload(false);
    }
    if let Some(secs) = cli.cooldown {
        config = config.with_cooldown(seconds(secs)?);
    }
    if let Some(secs) = cli.calibration {
        config = config.with_calibration(seconds(secs)?);
    }

    Ok(config)
}

fn seconds(secs: f64) -> anyhow::Result<Duration> {
    Duration::try_from_secs_f64(secs).with_context(|| format!("invalid duration: {}s", secs))
}

fn init_logging(debug: bool) -> anyhow::Result<()> {
    let level = if debug { Level::DEBUG } else { Level::INFO };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::from_level(level).into())
                .from_env_lossy(),
        )
        .with_target(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

fn print_banner() {
    println!("📷 Pi Sentry - Motion-Triggered Camera");
    println!("   Version: {}", env!("CARGO_PKG_VERSION"));
    println!();
}

async fn run_command(config: &SentryConfig) -> anyhow::Result<()> {
    info!("Pi Sentry starting");
    if config.mock_hardware {
        warn!("Running with simulated hardware");
    }
    info!("  - Captures directory: {}", config.captures_dir.display());
    info!("  - Resolution: {}", config.resolution);
    info!("  - Cooldown: {:?}", config.cooldown);
    if config.upload_enabled {
        info!("  - Uploading to: {}", config.api_endpoint);
    } else {
        info!("  - Uploads disabled");
    }

    config.validate()?;
    startup_pattern(config).await?;

    let sentry = SentryLoop::from_config(config)?;
    let _signals = install_signal_handler(sentry.shutdown_flag())?;

    let report = sentry.run().await?;
    println!(
        "Captured {} image(s), {} uploaded, {} failed",
        report.captures, report.uploads_succeeded, report.uploads_failed
    );

    Ok(())
}

/// Five quick blinks on a short-lived indicator before the loop takes the LED.
async fn startup_pattern(config: &SentryConfig) -> anyhow::Result<()> {
    let indicator = StatusIndicator::new(Hardware::status_led(config)?)?;
    let blinked = indicator.blink(BLINK_DURATION, 5, BLINK_DURATION).await;
    indicator.cleanup()?;
    blinked?;
    Ok(())
}

async fn capture_command(config: &SentryConfig, args: &CaptureArgs) -> anyhow::Result<()> {
    let hardware = Hardware::from_config(config)?;
    let mut capturer = ImageCapturer::new(hardware.camera, &config.captures_dir, config.resolution)?
        .with_warmup(config.camera_warmup);

    let path = capture_single_image(&mut capturer, args.filename.as_deref()).await?;
    println!("{}", path.display());

    Ok(())
}

async fn upload_command(config: &SentryConfig, args: &UploadArgs) -> anyhow::Result<()> {
    let uploader = CaptureUploader::from_config(config)?;

    if uploader.upload(&args.path).await {
        println!("Uploaded {} to {}", args.path.display(), uploader.endpoint());
        Ok(())
    } else {
        eprintln!("Upload of {} failed", args.path.display());
        std::process::exit(1);
    }
}

async fn blink_command(config: &SentryConfig, args: &BlinkArgs) -> anyhow::Result<()> {
    let indicator = StatusIndicator::new(Hardware::status_led(config)?)?;
    let blinked = indicator
        .blink(seconds(args.duration)?, args.count, seconds(args.gap)?)
        .await;
    indicator.cleanup()?;
    blinked?;

    println!("Blinked {} time(s)", args.count);
    Ok(())
}

async fn watch_command(config: &SentryConfig, args: &WatchArgs) -> anyhow::Result<()> {
    let timeout = args.timeout.map(seconds).transpose()?;
    let hardware = Hardware::from_config(config)?;
    let mut detector = MotionDetector::new(hardware.motion, config.calibration);

    detector.calibrate().await;
    detector.start();
    println!("Waiting for motion...");
    let seen = detector.wait_for_motion(timeout).await;
    detector.stop();
    detector.cleanup()?;

    if seen? {
        println!("Motion detected");
    } else {
        println!("No motion before timeout");
    }
    Ok(())
}

async fn receive_command(config: &SentryConfig, args: &ReceiveArgs) -> anyhow::Result<()> {
    let receiver = ReceiverConfig::new(&args.host, args.port)
        .with_captures_dir(&args.dir)
        .with_api_key(Some(config.api_key.clone()))
        .with_admin_api_key(args.admin_api_key.clone());

    start_receiver(receiver).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from([
            "pi_sentry",
            "--mock",
            "--no-upload",
            "--cooldown",
            "2.5",
            "blink",
            "--count",
            "4",
        ])
        .unwrap();

        assert!(cli.mock);
        assert!(cli.no_upload);
        assert_eq!(cli.cooldown, Some(2.5));
        match cli.command {
            Some(Commands::Blink(args)) => assert_eq!(args.count, 4),
            _ => panic!("expected blink"),
        }
    }

    #[test]
    fn test_default_command_is_run() {
        let cli = Cli::try_parse_from(["pi_sentry"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.mock);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["pi_sentry", "capture", "--mock", "--filename", "a.jpg"])
            .unwrap();
        assert!(cli.mock);
        match cli.command {
            Some(Commands::Capture(args)) => assert_eq!(args.filename.as_deref(), Some("a.jpg")),
            _ => panic!("expected capture"),
        }
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::try_parse_from([
            "pi_sentry",
            "--calibration",
            "0",
            "--endpoint",
            "http://127.0.0.1:3050/capture",
            "--api-key",
            "secret",
        ])
        .unwrap();

        let config = build_config(&cli).unwrap();
        assert_eq!(config.calibration, Duration::ZERO);
        assert_eq!(config.api_endpoint, "http://127.0.0.1:3050/capture");
        assert_eq!(config.api_key, "secret");
    }

    #[test]
    fn test_negative_duration_rejected() {
        assert!(seconds(-1.0).is_err());
        assert_eq!(seconds(0.1).unwrap(), Duration::from_millis(100));
    }
}
