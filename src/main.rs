//! Bookvoice command line interface

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::Level;

use bookvoice::audio::{encode_with_ffmpeg, AudioOutput};
use bookvoice::engine::{
    create_engine, describe_engine, list_available_engines, list_engines, EngineConfig,
};
use bookvoice::server::{ConversionServer, ServerConfig};
use bookvoice::subtitles::{group_entries, write_subtitles, SubtitleFormat, TimingTracker};
use bookvoice::text::join_wrapped_lines;

#[derive(Parser)]
#[command(name = "bookvoice", version, about = "Multi-engine text-to-speech")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Synthesize text to an audio file
    Speak {
        /// Text to synthesize; omit to read from --file
        text: Option<String>,

        /// Read the text from a file instead
        #[arg(short, long, conflicts_with = "text")]
        file: Option<PathBuf>,

        /// Engine to use
        #[arg(short, long, default_value = "kokoro")]
        engine: String,

        /// Voice name, weighted formula, or reference audio path
        #[arg(long, default_value = "af_heart")]
        voice: String,

        /// Playback-rate multiplier
        #[arg(short, long, default_value_t = 1.0)]
        speed: f32,

        /// Literal split pattern overriding sentence chunking
        #[arg(long)]
        split_rule: Option<String>,

        /// Compute device (cpu, cuda, mps)
        #[arg(short, long, default_value = "cpu")]
        device: String,

        /// Language code
        #[arg(short, long, default_value = "en-us")]
        lang: String,

        /// Engine-specific setting, repeatable (key=value)
        #[arg(long = "set", value_parser = parse_key_value)]
        settings: Vec<(String, String)>,

        /// Output audio path; non-WAV extensions are encoded via ffmpeg
        #[arg(short, long, default_value = "output.wav")]
        output: PathBuf,

        /// Also write subtitles in this format (srt, vtt, ass)
        #[arg(long)]
        subtitles: Option<String>,

        /// Maximum words per subtitle caption
        #[arg(long, default_value_t = 10)]
        max_subtitle_words: usize,

        /// Join hard-wrapped lines before synthesis
        #[arg(long)]
        join_lines: bool,
    },

    /// List the voices an engine offers
    Voices {
        /// Engine name
        engine: String,
    },

    /// List registered engines and their availability
    Engines,

    /// Run the conversion job server
    Serve {
        /// Bind host
        #[arg(long)]
        host: Option<String>,

        /// Bind port
        #[arg(short, long)]
        port: Option<u16>,

        /// Server configuration file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got '{}'", raw)),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .init();

    match cli.command {
        Command::Speak {
            text,
            file,
            engine,
            voice,
            speed,
            split_rule,
            device,
            lang,
            settings,
            output,
            subtitles,
            max_subtitle_words,
            join_lines,
        } => speak(SpeakArgs {
            text,
            file,
            engine,
            voice,
            speed,
            split_rule,
            device,
            lang,
            settings,
            output,
            subtitles,
            max_subtitle_words,
            join_lines,
        }),
        Command::Voices { engine } => voices(&engine),
        Command::Engines => engines(),
        Command::Serve { host, port, config } => serve(host, port, config),
    }
}

struct SpeakArgs {
    text: Option<String>,
    file: Option<PathBuf>,
    engine: String,
    voice: String,
    speed: f32,
    split_rule: Option<String>,
    device: String,
    lang: String,
    settings: Vec<(String, String)>,
    output: PathBuf,
    subtitles: Option<String>,
    max_subtitle_words: usize,
    join_lines: bool,
}

fn speak(args: SpeakArgs) -> anyhow::Result<()> {
    let text = match (args.text, &args.file) {
        (Some(text), _) => text,
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        (None, None) => bail!("provide text to speak or --file"),
    };
    let text = if args.join_lines {
        join_wrapped_lines(&text)
    } else {
        text
    };

    let subtitle_format = args
        .subtitles
        .as_deref()
        .map(|name| {
            SubtitleFormat::from_name(name)
                .with_context(|| format!("unknown subtitle format '{}'", name))
        })
        .transpose()?;

    let mut builder = EngineConfig::builder()
        .lang_code(&args.lang)
        .device(&args.device);
    for (key, value) in args.settings {
        builder = builder.set(key, value);
    }
    let config = builder.build();

    let mut engine = create_engine(&args.engine, &args.lang, &args.device, &config)?;

    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        bar.set_style(style);
    }
    bar.set_message("synthesizing...");

    let started = Instant::now();
    let mut samples: Vec<f32> = Vec::new();
    let mut sample_rate = engine.sample_rate();
    let mut tracker = TimingTracker::new();
    {
        let stream = engine.synthesize(&text, &args.voice, args.speed, args.split_rule.as_deref())?;
        for (i, chunk) in stream.enumerate() {
            let chunk = chunk?;
            sample_rate = chunk.sample_rate;
            samples.extend_from_slice(&chunk.audio);
            tracker.record(&chunk);
            bar.set_message(format!(
                "synthesized chunk {} ({:.1}s of audio)",
                i + 1,
                tracker.elapsed()
            ));
            bar.tick();
        }
    }
    bar.finish_and_clear();

    if samples.is_empty() {
        bail!("synthesis produced no audio");
    }

    write_audio(&samples, sample_rate, &args.output)?;
    println!("Wrote {}", args.output.display());

    if let Some(format) = subtitle_format {
        let entries = group_entries(tracker.entries(), args.max_subtitle_words);
        let path = args.output.with_extension(format.extension());
        write_subtitles(&path, format, &entries)?;
        println!("Wrote {} ({} captions)", path.display(), entries.len());
    }

    let elapsed = started.elapsed().as_secs_f32();
    let audio_secs = tracker.elapsed();
    if elapsed > 0.0 {
        println!(
            "{:.1}s of audio in {:.1}s ({:.1}x realtime)",
            audio_secs,
            elapsed,
            audio_secs / elapsed
        );
    }
    Ok(())
}

fn write_audio(samples: &[f32], sample_rate: u32, output: &Path) -> anyhow::Result<()> {
    let is_wav = output
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"));
    if is_wav {
        AudioOutput::save(samples, sample_rate, output)?;
        return Ok(());
    }
    let temp = tempfile_wav_path(output);
    AudioOutput::save(samples, sample_rate, &temp)?;
    let result = encode_with_ffmpeg(&temp, output);
    let _ = std::fs::remove_file(&temp);
    result.map_err(Into::into)
}

fn tempfile_wav_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "bookvoice".to_string());
    output.with_file_name(format!(".{}.tmp.wav", stem))
}

fn voices(engine: &str) -> anyhow::Result<()> {
    let info = describe_engine(engine)?;
    if info.requires_reference {
        println!(
            "{} clones from reference audio; pass a sample path as the voice.",
            info.display_name
        );
        return Ok(());
    }

    use bookvoice::engine::{language_description, VOICES};
    let mut current_language = None;
    for id in VOICES {
        let language = id.chars().next().and_then(language_description);
        if language != current_language {
            if let Some(language) = language {
                println!("\n{}", language);
            }
            current_language = language;
        }
        println!("  {}", id);
    }
    Ok(())
}

fn engines() -> anyhow::Result<()> {
    let available = list_available_engines();
    for name in list_engines() {
        let info = describe_engine(&name)?;
        let marker = if available.contains(&name) { "✓" } else { "✗" };
        println!("{} {:<10} {}", marker, name, info.description);
    }
    Ok(())
}

fn serve(host: Option<String>, port: Option<u16>, config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let mut config = match config_path {
        Some(path) => ServerConfig::load(&path)?,
        None => ServerConfig::default(),
    };
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }

    println!("Listening on http://{}", config.bind_addr());
    let server = ConversionServer::new(config)?;
    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    runtime.block_on(server.run())?;
    Ok(())
}
