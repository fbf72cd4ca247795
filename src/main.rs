use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tutor_gateway::voice::{AudioIn, PlaybackControl};
use tutor_gateway::{Config, HttpTutorClient, Recorder, Scenario, Session, Speaker, SpeakerOut};

/// Tutor - voice session client for a remote AI tutor
#[derive(Parser)]
#[command(name = "tutor", version, about)]
struct Cli {
    /// Backend base address (overrides config file)
    #[arg(long, env = "TUTOR_API_BASE")]
    api_base: Option<String>,

    /// Playback rate multiplier for synthesized replies
    #[arg(long, env = "TUTOR_PLAYBACK_SPEED")]
    speed: Option<f32>,

    /// Path to a TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Check that the tutor backend is reachable and healthy
    Health,
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test speaker output
    TestSpeaker,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "tutor_gateway=info,tutor=info",
        1 => "tutor_gateway=debug,tutor=debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    // The session owns cpal streams, which are not Send; keep it on the
    // thread driving the runtime.
    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> tutor_gateway::Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(api_base) = cli.api_base {
        config.override_api_base(&api_base);
    }
    if let Some(speed) = cli.speed {
        config.override_playback_speed(speed);
    }

    match cli.command {
        Some(Command::Health) => health(&config).await,
        Some(Command::TestMic { duration }) => test_mic(duration).await,
        Some(Command::TestSpeaker) => test_speaker().await,
        None => interactive(config).await,
    }
}

/// Probe the backend health endpoint
async fn health(config: &Config) -> tutor_gateway::Result<()> {
    let client = HttpTutorClient::new(config.api_base.clone());
    let info = client.health().await?;
    println!("backend: {}", config.api_base);
    println!("status:  {}", info.status);
    println!("stt:     {}", info.models.stt);
    println!("chat:    {}", info.models.chat);
    Ok(())
}

/// Record for a few seconds and report what was captured
async fn test_mic(duration: u64) -> tutor_gateway::Result<()> {
    let mut recorder = Recorder::new()?;
    println!("recording for {duration}s...");
    recorder.begin()?;
    tokio::time::sleep(Duration::from_secs(duration)).await;

    match recorder.end() {
        Some(clip) => {
            println!(
                "captured {} bytes ({}ms, {})",
                clip.bytes.len(),
                clip.duration.as_millis(),
                clip.mime
            );
        }
        None => println!("nothing captured"),
    }
    Ok(())
}

/// Play a short test tone
async fn test_speaker() -> tutor_gateway::Result<()> {
    const TONE_RATE: u32 = 24000;

    let mut speaker = SpeakerOut::new()?;
    let samples: Vec<f32> = (0..TONE_RATE)
        .map(|i| {
            let t = i as f32 / TONE_RATE as f32;
            0.3 * (2.0 * std::f32::consts::PI * 440.0 * t).sin()
        })
        .collect();

    println!("playing a 1s test tone...");
    let handle = speaker.start_pcm(samples, TONE_RATE, 1.0)?;
    while !handle.is_finished() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    println!("done");
    Ok(())
}

/// Map terminal input onto the session triggers
async fn interactive(config: Config) -> tutor_gateway::Result<()> {
    use tokio::io::{AsyncBufReadExt, BufReader};

    let backend = HttpTutorClient::new(config.api_base.clone());
    let mic = Recorder::new()?;
    let speaker = SpeakerOut::new()?;
    let mut session = Session::new(backend, mic, speaker, config.playback_speed);

    println!("tutor session ({})", config.api_base);
    println!("  /rec           hold: start recording (<= {}s)", tutor_gateway::SOFT_MAX_CLIP_SECS);
    println!("  /stop          release: stop and send the clip");
    println!("  /scenario X    roleplay: tutor, school, store, or home");
    println!("  /clear         clear the conversation");
    println!("  /dump          print the conversation as JSON");
    println!("  /quit          exit");
    println!("  anything else  sent as typed text");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut printed_seq = 0u64;

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        };
        let Some(line) = line else { break };
        let line = line.trim();

        match line {
            "" => {}
            "/quit" | "/q" => break,
            "/rec" => session.press_start(),
            "/stop" => session.press_end().await,
            "/clear" => {
                session.clear_log();
                printed_seq = 0;
                println!("(conversation cleared)");
            }
            "/dump" => {
                let entries: Vec<_> = session.transcript().entries().collect();
                println!("{}", serde_json::to_string_pretty(&entries)?);
            }
            _ if line.starts_with("/scenario") => {
                let arg = line.trim_start_matches("/scenario").trim();
                match arg.parse::<Scenario>() {
                    Ok(scenario) => {
                        session.set_scenario(scenario);
                        println!("(scenario: {scenario})");
                    }
                    Err(e) => println!("({e})"),
                }
            }
            _ if line.starts_with('/') => println!("(unknown command: {line})"),
            text => session.send_text(text).await,
        }

        for utterance in session.entries_after(printed_seq) {
            let prefix = match utterance.speaker {
                Speaker::User => "you  ",
                Speaker::Tutor => "tutor",
            };
            println!("{prefix}> {}", utterance.text);
            printed_seq = utterance.sequence;
        }
        tracing::debug!(phase = %session.phase(), "trigger handled");
    }

    // Dropping the session releases any held microphone or playback device
    Ok(())
}
