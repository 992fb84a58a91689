use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pcm_session::engine::convert::frames_in;
use pcm_session::engine::metadata::{LoftyStore, MetadataStore, TagValue};
use pcm_session::{BitDepth, DecodeSession, DecoderConfig};

/// Decode an audio file to raw PCM, optionally exporting it as WAV
#[derive(Parser, Debug)]
#[command(name = "pcm-session")]
#[command(version)]
struct Args {
    /// Audio file to open
    file: PathBuf,

    /// TOML decoder configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Render at 44.1 kHz stereo 16-bit with noise reduction
    #[arg(long, conflicts_with = "config")]
    tracker: bool,

    /// Seek to this position (ms) before reading
    #[arg(long)]
    seek: Option<u64>,

    /// Bytes requested per read
    #[arg(long)]
    read_size: Option<usize>,

    /// Linear output gain
    #[arg(long)]
    scale: Option<f32>,

    /// Write the decoded stream to a WAV file
    #[arg(long, value_name = "OUT")]
    wav: Option<PathBuf>,

    /// Print the file's tags
    #[arg(long)]
    tags: bool,

    /// Set a tag, e.g. --set trkn=3/12 (repeatable)
    #[arg(long = "set", value_name = "KEY=VALUE")]
    set: Vec<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pcm_session=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    if args.tags || !args.set.is_empty() {
        edit_tags(&args.file, args.tags, &args.set)?;
        if args.wav.is_none() && args.seek.is_none() {
            return Ok(());
        }
    }

    let mut config = match (&args.config, args.tracker) {
        (Some(path), _) => DecoderConfig::from_toml_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        (None, true) => DecoderConfig::tracker(),
        (None, false) => DecoderConfig::default(),
    };
    if let Some(read_size) = args.read_size {
        config.read_size = read_size;
    }

    let mut session = DecodeSession::open(&args.file, config)
        .with_context(|| format!("Failed to open {}", args.file.display()))?;
    if let Some(scale) = args.scale {
        session.set_scale(scale).context("Invalid scale")?;
    }

    println!("Title:     {}", session.title());
    println!("Length:    {} ms", session.length());
    println!(
        "Format:    {} Hz, {} ch, {} bit (source {} Hz)",
        session.frequency(),
        session.channels(),
        session.bits_per_sample(),
        session.source_frequency()
    );
    println!("Bitrate:   {} bps", session.bitrate());

    if let Some(target) = args.seek {
        session
            .seek(target)
            .with_context(|| format!("Failed to seek to {} ms", target))?;
    }

    let mut writer = match &args.wav {
        Some(out) => Some(create_wav(out, &session)?),
        None => None,
    };

    let depth = session.config().output.bits_per_sample;
    let mut total = 0usize;
    // Reads need not end on a sample boundary.
    let mut carry: Vec<u8> = Vec::new();
    loop {
        let chunk = session.read_default().context("Decoding failed")?;
        if chunk.is_empty() {
            break;
        }
        total += chunk.len();
        if let Some(writer) = writer.as_mut() {
            carry.extend_from_slice(&chunk);
            let whole = carry.len() - carry.len() % depth.bytes();
            write_pcm(writer, &carry[..whole], depth)?;
            carry.drain(..whole);
        }
    }

    if let Some(writer) = writer {
        writer.finalize().context("Failed to finish WAV file")?;
    }

    let frames = frames_in(total, session.channels(), depth);
    info!(bytes = total, frames, "Decoded stream");
    println!("Decoded:   {} bytes, ending at {:.2} ms", total, session.position());

    session.close();
    Ok(())
}

fn edit_tags(path: &Path, print: bool, assignments: &[String]) -> Result<()> {
    let mut store = LoftyStore::open(path)
        .with_context(|| format!("Failed to read tags from {}", path.display()))?;

    for assignment in assignments {
        let Some((key, value)) = assignment.split_once('=') else {
            bail!("Expected KEY=VALUE, got {:?}", assignment);
        };
        store
            .set(key, TagValue::from(value))
            .with_context(|| format!("Failed to set {}", key))?;
    }
    if !assignments.is_empty() {
        store.save().context("Failed to save tags")?;
        info!(count = assignments.len(), "Updated tags");
    }

    if print {
        for key in store.keys() {
            match store.get(&key) {
                Some(TagValue::Text(text)) => println!("{:>6}: {}", key, text),
                Some(TagValue::Binary(bytes)) => println!("{:>6}: <{} bytes>", key, bytes.len()),
                None => {}
            }
        }
    }
    Ok(())
}

type WavFileWriter = hound::WavWriter<std::io::BufWriter<std::fs::File>>;

fn create_wav(out: &Path, session: &DecodeSession) -> Result<WavFileWriter> {
    let spec = hound::WavSpec {
        channels: session.channels(),
        sample_rate: session.frequency(),
        bits_per_sample: session.bits_per_sample(),
        sample_format: hound::SampleFormat::Int,
    };
    hound::WavWriter::create(out, spec)
        .with_context(|| format!("Failed to create {}", out.display()))
}

/// Re-reads little-endian PCM bytes as samples for hound.
fn write_pcm<W>(writer: &mut hound::WavWriter<W>, bytes: &[u8], depth: BitDepth) -> Result<()>
where
    W: std::io::Write + std::io::Seek,
{
    match depth {
        BitDepth::U8 => {
            for &b in bytes {
                writer.write_sample((b as i16 - 128) as i8)?;
            }
        }
        BitDepth::S16 => {
            for b in bytes.chunks_exact(2) {
                writer.write_sample(i16::from_le_bytes([b[0], b[1]]))?;
            }
        }
        BitDepth::S24 => {
            for b in bytes.chunks_exact(3) {
                // sign-extend from the top byte
                writer.write_sample(i32::from_le_bytes([0, b[0], b[1], b[2]]) >> 8)?;
            }
        }
        BitDepth::S32 => {
            for b in bytes.chunks_exact(4) {
                writer.write_sample(i32::from_le_bytes([b[0], b[1], b[2], b[3]]))?;
            }
        }
    }
    Ok(())
}
