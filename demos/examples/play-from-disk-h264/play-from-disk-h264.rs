use anyhow::Result;
use bytes::{BufMut, Bytes, BytesMut};
use clap::Parser;
use env_logger::Target;
use log::{debug, info, warn};
use media::H264FrameClassifier;
use media::io::h264_reader::AccessUnitReader;
use playback::{
    DefaultPlayback, OutputSurface, PlaybackCommand, PlaybackQuality, PlayerBuilder, PlayerEvent,
    SurfaceEvent, TimeRange, VideoSettings,
};
use sansio::Protocol;
use shared::TaggedBytes;
use shared::error::Error;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, Write};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

const READ_BUFFER_CAPACITY: usize = 1_048_576;
const SYNTHETIC_PAYLOAD_SIZE: usize = 1200;

#[derive(Parser)]
#[command(name = "play-from-disk-h264")]
#[command(author = "Rain Liu <yliu@webrtc.rs>")]
#[command(version = "0.1.0")]
#[command(about = "An example of play-from-disk-h264 with stall recovery.")]
struct Cli {
    #[arg(short, long)]
    debug: bool,
    #[arg(short, long, default_value_t = format!("INFO"))]
    log_level: String,
    #[arg(short, long, default_value_t = format!(""))]
    output_log_file: String,
    /// Annex-B H.264 file, a synthetic stream is played when omitted
    #[arg(short, long)]
    video: Option<String>,
    #[arg(long, default_value_t = 30)]
    fps: u32,
    /// Number of synthetic frames
    #[arg(long, default_value_t = 300)]
    frames: u64,
    /// Wedge the simulated decoder at this frame index
    #[arg(long)]
    stall_at: Option<u64>,
    #[arg(long, default_value_t = 5)]
    stall_threshold: u32,
    /// Pace frames at the stream rate instead of as fast as possible
    #[arg(long)]
    realtime: bool,
}

/// Renderer stand-in: decodes every appended frame unless wedged, and only
/// recovers from a wedge when seeked.
struct SimulatedSurface {
    frame_duration: f64,
    buffered: Option<TimeRange>,
    position: f64,
    quality: PlaybackQuality,
    wedged: bool,
    seek_completed: bool,
}

impl SimulatedSurface {
    fn new(fps: u32) -> Self {
        Self {
            frame_duration: 1.0 / f64::from(fps.max(1)),
            buffered: None,
            position: 0.0,
            quality: PlaybackQuality::default(),
            wedged: false,
            seek_completed: false,
        }
    }

    fn take_seek_completed(&mut self) -> bool {
        std::mem::take(&mut self.seek_completed)
    }
}

impl OutputSurface for SimulatedSurface {
    fn append_data(&mut self, data: &[u8]) -> shared::error::Result<()> {
        if data.is_empty() {
            return Err(Error::ErrAppendRejected("empty frame".to_owned()));
        }

        let range = self
            .buffered
            .get_or_insert(TimeRange::new(self.position, self.position));
        range.end += self.frame_duration;

        if !self.wedged {
            self.quality.decoded_frames += 1;
            self.position = (self.position + self.frame_duration).min(range.end);
        }
        Ok(())
    }

    fn request_removal(&mut self, start: f64, end: f64) -> shared::error::Result<()> {
        if start > end {
            return Err(Error::ErrRemovalRejected { start, end });
        }
        if let Some(range) = self.buffered.as_mut() {
            // never evict what has not been played yet
            range.start = range.start.max(end.min(self.position));
            debug!(
                "removed [{start:.3}, {end:.3}), buffered now [{:.3}, {:.3})",
                range.start, range.end
            );
        }
        Ok(())
    }

    fn buffered_ranges(&self) -> Vec<TimeRange> {
        self.buffered.iter().copied().collect()
    }

    fn playback_quality(&self) -> Option<PlaybackQuality> {
        Some(self.quality)
    }

    fn force_seek(&mut self, position: f64) -> shared::error::Result<()> {
        self.position = position;
        self.wedged = false;
        self.seek_completed = true;
        Ok(())
    }
}

fn synthetic_access_unit(index: u64, gop: u64) -> Bytes {
    let mut au = BytesMut::with_capacity(SYNTHETIC_PAYLOAD_SIZE + 32);
    if index % gop == 0 {
        au.put_slice(&[0x00, 0x00, 0x00, 0x01, 0x67, 0x42, 0x00, 0x1F]);
        au.put_slice(&[0x00, 0x00, 0x00, 0x01, 0x68, 0xCE, 0x3C, 0x80]);
        au.put_slice(&[0x00, 0x00, 0x00, 0x01, 0x65, 0x88, 0x84]);
    } else {
        au.put_slice(&[0x00, 0x00, 0x00, 0x01, 0x41, 0x9A]);
    }
    au.put_bytes(0xA5, SYNTHETIC_PAYLOAD_SIZE);
    au.freeze()
}

type AccessUnits = Box<dyn Iterator<Item = shared::error::Result<Bytes>>>;

fn access_units(video: Option<&str>, frames: u64, gop: u64) -> Result<AccessUnits> {
    let Some(video_path) = video else {
        return Ok(Box::new(
            (0..frames).map(move |i| Ok(synthetic_access_unit(i, gop))),
        ));
    };

    let file = File::open(video_path)?;
    let mut reader = AccessUnitReader::new(BufReader::new(file), READ_BUFFER_CAPACITY);
    Ok(Box::new(std::iter::from_fn(move || {
        match reader.next_access_unit() {
            Err(Error::ErrIoEOF) => None,
            result => Some(result),
        }
    })))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let output_log_file = cli.output_log_file;
    let log_level = log::LevelFilter::from_str(&cli.log_level)?;
    if cli.debug {
        env_logger::Builder::new()
            .target(if !output_log_file.is_empty() {
                Target::Pipe(Box::new(
                    OpenOptions::new()
                        .create(true)
                        .write(true)
                        .truncate(true)
                        .open(output_log_file)?,
                ))
            } else {
                Target::Stdout
            })
            .format(|buf, record| {
                writeln!(
                    buf,
                    "{}:{} [{}] {} - {}",
                    record.file().unwrap_or("unknown"),
                    record.line().unwrap_or(0),
                    record.level(),
                    chrono::Local::now().format("%H:%M:%S.%6f"),
                    record.args()
                )
            })
            .filter(None, log_level)
            .init();
    }

    if let Some(video_path) = &cli.video {
        if !Path::new(video_path).exists() {
            return Err(anyhow::anyhow!("video file: '{}' not exist", video_path));
        }
    }

    let stopped = Arc::new(AtomicBool::new(false));
    {
        let stopped = Arc::clone(&stopped);
        ctrlc::set_handler(move || stopped.store(true, Ordering::SeqCst))?;
    }
    println!("Press Ctrl-C to stop");

    let fps = cli.fps.max(1);
    let frame_duration = Duration::from_secs(1) / fps;
    let mut player = PlayerBuilder::new()
        .with_stall_threshold(cli.stall_threshold)
        .build(
            SimulatedSurface::new(fps),
            H264FrameClassifier::new(),
            DefaultPlayback::new(VideoSettings { max_fps: fps }),
        );
    player.handle_write(PlaybackCommand::Play)?;

    let mut recoveries = 0u32;
    let mut pushed = 0u64;
    let start = Instant::now();
    for (index, access_unit) in access_units(cli.video.as_deref(), cli.frames, u64::from(fps))?
        .enumerate()
    {
        if stopped.load(Ordering::SeqCst) {
            break;
        }
        let index = index as u64;
        let access_unit = access_unit?;

        if cli.stall_at == Some(index) {
            warn!("wedging the simulated decoder at frame {index}");
            player.surface_mut().wedged = true;
        }

        let now = if cli.realtime {
            Instant::now()
        } else {
            start + frame_duration * index as u32
        };
        player.handle_read(TaggedBytes::new(now, access_unit))?;
        pushed += 1;

        // the simulated seek finishes before the next frame arrives
        if player.surface_mut().take_seek_completed() {
            player.handle_event(SurfaceEvent::SeekCompleted)?;
        }

        while let Some(event) = player.poll_event() {
            match event {
                PlayerEvent::StallDetected { count } => debug!("stalled x{count}"),
                PlayerEvent::RecoverySeek { position } => {
                    recoveries += 1;
                    info!("frame {index}: recovery seek to {position:.3}s");
                }
                event => debug!("frame {index}: {event:?}"),
            }
        }

        if index % u64::from(fps) == 0 {
            if let Some(stats) = player.momentum_quality_stats() {
                info!("momentum: {}", serde_json::to_string(stats)?);
            }
        }

        if cli.realtime {
            std::thread::sleep(frame_duration);
        }
    }

    player.close()?;

    let surface = player.surface();
    println!(
        "pushed {} frames, decoded {}, {} recovery seek(s), position {:.3}s",
        pushed, surface.quality.decoded_frames, recoveries, surface.position
    );

    Ok(())
}
