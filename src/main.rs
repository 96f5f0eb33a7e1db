use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use base64::Engine as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use vox_cli::Config;
use vox_cli::api::{self, ApiClient};
use vox_cli::audio::{
    self, AudioContext, AudioSink, CAPTURE_SAMPLE_RATE, PcmCollector, Recorder, SYNTH_SAMPLE_RATE,
    StreamPlayer, TeeSink,
};
use vox_cli::cache::{AudioCache, CacheKey};
use vox_cli::synthesis::{SynthesisRequest, SynthesisSession};

/// Upper bound on one synthesis request, connect to last frame
const SYNTHESIS_DEADLINE: Duration = Duration::from_secs(120);

/// vox - voice I/O for the terminal
#[derive(Parser)]
#[command(name = "vox", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Speak text with streaming TTS
    Say {
        /// Text to speak
        text: String,

        /// Voice id (system name or enrolled voice id)
        #[arg(long)]
        voice: Option<String>,

        /// Language hint (auto, Chinese, English, Japanese, ...)
        #[arg(short, long, default_value = "auto")]
        lang: String,

        /// Voice style instruction (e.g. "warm and expressive, moderate pace")
        #[arg(short, long)]
        instruct: Option<String>,

        /// Speech rate (0.5-2.0)
        #[arg(short, long, default_value = "1.0")]
        speed: f64,

        /// Also save the audio to a WAV file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Skip the audio cache
        #[arg(long)]
        no_cache: bool,
    },
    /// Transcribe speech to text
    Hear {
        /// Transcribe an existing WAV file instead of recording
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Recording duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,

        /// Text context to improve recognition (e.g. domain terms)
        #[arg(short, long)]
        context: Option<String>,

        /// Skip the transcription cache
        #[arg(long)]
        no_cache: bool,
    },
    /// Manage voice profiles
    Voice {
        #[command(subcommand)]
        command: VoiceCommand,
    },
    /// Manage the audio cache
    Cache {
        #[command(subcommand)]
        command: CacheCommand,
    },
    /// Manage authentication
    Auth {
        #[command(subcommand)]
        command: AuthCommand,
    },
}

#[derive(Subcommand)]
enum VoiceCommand {
    /// List system and enrolled voices
    List,
    /// Record and enroll a voice clone
    Enroll {
        /// Name for the cloned voice
        #[arg(short, long)]
        name: Option<String>,

        /// Recording duration in seconds (10-20s recommended)
        #[arg(short, long, default_value = "15")]
        duration: u64,

        /// Use an existing WAV file instead of recording
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Delete an enrolled voice
    Delete {
        /// Voice id to delete
        voice_id: String,
    },
}

#[derive(Subcommand)]
enum CacheCommand {
    /// Show cache size and file count
    Status,
    /// Delete all cached audio
    Clear,
}

#[derive(Subcommand)]
enum AuthCommand {
    /// Save the API credential
    Login {
        /// DashScope API key
        #[arg(long)]
        token: String,
    },
    /// Show current auth status
    Status,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn,vox_cli=warn",
        1 => "info,vox_cli=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load()?;

    match cli.command {
        Command::Say {
            text,
            voice,
            lang,
            instruct,
            speed,
            output,
            no_cache,
        } => cmd_say(config, &text, voice, lang, instruct, speed, output, no_cache).await,
        Command::Hear {
            file,
            duration,
            context,
            no_cache,
        } => cmd_hear(&config, file, duration, context, no_cache).await,
        Command::Voice { command } => match command {
            VoiceCommand::List => cmd_voice_list(&config).await,
            VoiceCommand::Enroll {
                name,
                duration,
                file,
            } => cmd_voice_enroll(config, name, duration, file).await,
            VoiceCommand::Delete { voice_id } => cmd_voice_delete(&config, &voice_id).await,
        },
        Command::Cache { command } => match command {
            CacheCommand::Status => cmd_cache_status(&config),
            CacheCommand::Clear => cmd_cache_clear(&config),
        },
        Command::Auth { command } => match command {
            AuthCommand::Login { token } => cmd_auth_login(config, token),
            AuthCommand::Status => cmd_auth_status(&config),
        },
    }
}

#[allow(clippy::too_many_arguments)]
async fn cmd_say(
    mut config: Config,
    text: &str,
    voice: Option<String>,
    lang: String,
    instruct: Option<String>,
    speed: f64,
    output: Option<PathBuf>,
    no_cache: bool,
) -> anyhow::Result<()> {
    let api_key = config.require_api_key()?;

    let voice = voice
        .or_else(|| config.state.last_voice.clone())
        .unwrap_or_else(|| "Cherry".to_string());
    let model = api::resolve_model(&voice, instruct.is_some());

    let mut request = SynthesisRequest::new(model, &voice, text);
    request.language = lang;
    request.instruction = instruct;
    request.speech_rate = speed;

    eprintln!("voice {voice} ({model})");

    let cache = AudioCache::new(config.cache_dir());
    let ctx = AudioContext::new();
    let player = StreamPlayer::new(&ctx)?;
    let mut sink = TeeSink::new(player, PcmCollector::new());

    let mut session = SynthesisSession::new(&api_key);
    if !no_cache {
        session = session.with_cache(&cache);
    }

    let started = Instant::now();
    let mut first_frame = true;
    let outcome = tokio::time::timeout(
        SYNTHESIS_DEADLINE,
        session.run(&request, |pcm| {
            if first_frame {
                first_frame = false;
                eprintln!("first audio {:?}", started.elapsed());
            }
            if let Err(e) = sink.write(pcm) {
                tracing::warn!(error = %e, "dropping frame, playback sink failed");
            }
        }),
    )
    .await
    .unwrap_or_else(|_| {
        Err(vox_cli::Error::Transport(
            "synthesis deadline exceeded".to_string(),
        ))
    });

    // Drain whatever was delivered before checking the outcome; partial
    // audio already handed to the sink stays played.
    sink.close()?;
    outcome?;

    let (_player, collector) = sink.into_inner();
    if let Some(path) = output {
        audio::write_wav_file(&path, collector.bytes(), SYNTH_SAMPLE_RATE)?;
        eprintln!("saved to {}", path.display());
    }

    config.state.last_voice = Some(voice);
    if request.language != "auto" {
        config.state.last_lang = Some(request.language);
    }
    config.save_state()?;

    Ok(())
}

async fn cmd_hear(
    config: &Config,
    file: Option<PathBuf>,
    duration: u64,
    context: Option<String>,
    no_cache: bool,
) -> anyhow::Result<()> {
    let api_key = config.require_api_key()?;
    let cache = AudioCache::new(config.cache_dir());
    let context = context.unwrap_or_default();

    let (wav_data, cache_key) = if let Some(path) = file {
        let data = std::fs::read(&path)?;
        eprintln!("file {}", path.display());

        // Key transcripts by file content plus context
        let mut keyed = data.clone();
        keyed.extend_from_slice(format!(":{context}").as_bytes());
        (data, Some(CacheKey::digest(keyed)))
    } else {
        eprintln!("recording for {duration}s... (speak now)");

        let ctx = AudioContext::new();
        let mut recorder = Recorder::new(&ctx)?;
        recorder.start()?;
        tokio::time::sleep(Duration::from_secs(duration)).await;
        let pcm = recorder.stop();

        eprintln!("recorded {} bytes", pcm.len());
        (audio::pcm_to_wav(&pcm, CAPTURE_SAMPLE_RATE)?, None)
    };

    if !no_cache
        && let Some(key) = &cache_key
        && let Some(cached) = cache.lookup_transcript(key)
    {
        eprintln!("cached");
        println!("{cached}");
        return Ok(());
    }

    eprintln!("model {}", api::MODEL_ASR_FLASH);
    let started = Instant::now();

    let client = ApiClient::new(api_key);
    let text = client.transcribe(&wav_data, &context).await?;

    eprintln!("latency {:?}", started.elapsed());

    if !no_cache
        && !text.is_empty()
        && let Some(key) = &cache_key
    {
        cache.store_transcript(key, &text);
    }

    // Transcript goes to stdout so it can be piped
    println!("{text}");
    Ok(())
}

async fn cmd_voice_list(config: &Config) -> anyhow::Result<()> {
    println!("System voices:");
    for v in api::SYSTEM_VOICES {
        println!("  {:<12} {}  {}", v.id, v.gender, v.language);
    }

    let Ok(api_key) = config.require_api_key() else {
        println!("\n  (login to see enrolled voices)");
        return Ok(());
    };

    let client = ApiClient::new(api_key);
    let voices = client.list_voices(0, 50).await?;

    if voices.is_empty() {
        println!("\nNo enrolled voices. Use: vox voice enroll");
        return Ok(());
    }

    println!("\nEnrolled voices:");
    for v in voices {
        println!("  {}  {}  {}", v.voice, v.language, v.target_model);
    }
    Ok(())
}

async fn cmd_voice_enroll(
    mut config: Config,
    name: Option<String>,
    duration: u64,
    file: Option<PathBuf>,
) -> anyhow::Result<()> {
    let api_key = config.require_api_key()?;

    let wav_data = if let Some(path) = file {
        eprintln!("using audio file: {}", path.display());
        std::fs::read(&path)?
    } else {
        eprintln!("recording for {duration}s... (speak now)");

        let ctx = AudioContext::new();
        let mut recorder = Recorder::with_sample_rate(&ctx, SYNTH_SAMPLE_RATE)?;
        recorder.start()?;
        tokio::time::sleep(Duration::from_secs(duration)).await;
        let pcm = recorder.stop();
        eprintln!("recorded {} bytes", pcm.len());

        let wav = audio::pcm_to_wav(&pcm, SYNTH_SAMPLE_RATE)?;

        // Keep a local copy next to the cache
        let voices_dir = config.data_dir.join("voices");
        std::fs::create_dir_all(&voices_dir)?;
        let local = voices_dir.join(format!("recording-{}.wav", unix_timestamp()));
        if let Err(e) = std::fs::write(&local, &wav) {
            tracing::warn!(error = %e, "failed to save local copy");
        }

        wav
    };

    let name = name.unwrap_or_else(|| format!("vox{}", unix_timestamp() % 10_000_000_000));

    eprintln!("enrolling voice {name}...");
    let client = ApiClient::new(api_key);
    let encoded = base64::engine::general_purpose::STANDARD.encode(&wav_data);
    let voice_id = client.enroll_voice(&name, &encoded).await?;

    println!("voice enrolled: {voice_id}");
    println!("  use it: vox say --voice {voice_id} \"Hello!\"");

    config.state.last_voice = Some(voice_id);
    config.save_state()?;
    Ok(())
}

async fn cmd_voice_delete(config: &Config, voice_id: &str) -> anyhow::Result<()> {
    let api_key = config.require_api_key()?;
    let client = ApiClient::new(api_key);
    client.delete_voice(voice_id).await?;
    println!("deleted {voice_id}");
    Ok(())
}

fn cmd_cache_status(config: &Config) -> anyhow::Result<()> {
    let cache = AudioCache::new(config.cache_dir());
    let (files, bytes) = cache.status()?;
    println!("path:  {}", cache.dir().display());
    println!("files: {files}");
    println!("size:  {}", format_size(bytes));
    Ok(())
}

fn cmd_cache_clear(config: &Config) -> anyhow::Result<()> {
    let cache = AudioCache::new(config.cache_dir());
    let removed = cache.clear()?;
    println!("cleared {removed} cached files");
    Ok(())
}

fn cmd_auth_login(mut config: Config, token: String) -> anyhow::Result<()> {
    config.credentials.api_key = Some(token);
    config.save_credentials()?;
    println!("authenticated with dashscope");
    Ok(())
}

fn cmd_auth_status(config: &Config) -> anyhow::Result<()> {
    match config.require_api_key() {
        Ok(key) => {
            let tail = &key[key.len().saturating_sub(4)..];
            println!("authenticated (key ...{tail})");
        }
        Err(_) => println!("not authenticated - run: vox auth login --token <key>"),
    }
    Ok(())
}

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

#[allow(clippy::cast_precision_loss)]
fn format_size(bytes: u64) -> String {
    match bytes {
        b if b >= 1 << 30 => format!("{:.1} GB", b as f64 / f64::from(1u32 << 30)),
        b if b >= 1 << 20 => format!("{:.1} MB", b as f64 / f64::from(1u32 << 20)),
        b if b >= 1 << 10 => format!("{:.1} KB", b as f64 / f64::from(1u32 << 10)),
        b => format!("{b} B"),
    }
}
