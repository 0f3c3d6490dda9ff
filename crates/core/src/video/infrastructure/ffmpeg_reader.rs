use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::{VideoReader, VideoSource};

/// Device input format used when a camera source doesn't name one.
#[cfg(target_os = "macos")]
pub const DEFAULT_CAMERA_FORMAT: &str = "avfoundation";
#[cfg(target_os = "windows")]
pub const DEFAULT_CAMERA_FORMAT: &str = "dshow";
#[cfg(not(any(target_os = "macos", target_os = "windows")))]
pub const DEFAULT_CAMERA_FORMAT: &str = "v4l2";

/// Decodes camera or file frames via ffmpeg-next (libavdevice, libavformat,
/// libavcodec).
///
/// Converts each decoded frame to RGB24 and stamps it with a monotonic
/// timestamp relative to the first frame.
pub struct FfmpegReader {
    state: Option<OpenStream>,
}

struct OpenStream {
    ictx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    stream_index: usize,
    time_base_ms: f64,
    frame_interval_ms: f64,
}

// Safety: FfmpegReader is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegReader {}

impl FfmpegReader {
    pub fn new() -> Self {
        Self { state: None }
    }
}

impl Default for FfmpegReader {
    fn default() -> Self {
        Self::new()
    }
}

fn open_input(
    source: &VideoSource,
) -> Result<ffmpeg_next::format::context::Input, Box<dyn std::error::Error>> {
    match source {
        VideoSource::File(path) => Ok(ffmpeg_next::format::input(path)?),
        VideoSource::Camera { device, format } => {
            ffmpeg_next::device::register_all();
            let wanted = format.as_deref().unwrap_or(DEFAULT_CAMERA_FORMAT);
            // Demuxer names can carry aliases, e.g. "video4linux2,v4l2".
            let input_format = ffmpeg_next::device::input::video()
                .find(|f| f.name().split(',').any(|n| n == wanted))
                .ok_or_else(|| format!("camera input format '{wanted}' is not available"))?;
            let ctx = ffmpeg_next::format::open_with(
                device,
                &ffmpeg_next::format::Format::Input(input_format),
                ffmpeg_next::Dictionary::new(),
            )?;
            Ok(ctx.input())
        }
    }
}

impl VideoReader for FfmpegReader {
    fn open(&mut self, source: &VideoSource) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        let ictx = open_input(source)?;
        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or("No video stream found")?;

        let stream_index = stream.index();
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = codec_ctx.decoder().video()?;

        let rate = stream.rate();
        let fps = if rate.denominator() != 0 {
            rate.numerator() as f64 / rate.denominator() as f64
        } else {
            0.0
        };
        let tb = stream.time_base();
        let time_base_ms = if tb.denominator() != 0 {
            tb.numerator() as f64 / tb.denominator() as f64 * 1000.0
        } else {
            0.0
        };

        let metadata = VideoMetadata {
            width: decoder.width(),
            height: decoder.height(),
            fps,
            codec: decoder
                .codec()
                .map(|c| c.name().to_string())
                .unwrap_or_default(),
            source: source.to_string(),
            live: source.is_camera(),
        };

        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            ffmpeg_next::format::Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        self.state = Some(OpenStream {
            ictx,
            decoder,
            scaler,
            stream_index,
            time_base_ms,
            frame_interval_ms: metadata.frame_interval_ms().unwrap_or(0.0),
        });

        Ok(metadata)
    }

    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
        let Some(state) = self.state.as_mut() else {
            return Box::new(std::iter::once(Err("FfmpegReader: not opened".into())));
        };

        Box::new(FfmpegFrameIter {
            state,
            frame_index: 0,
            first_pts: None,
            flushing: false,
            done: false,
        })
    }

    fn close(&mut self) {
        self.state = None;
    }
}

/// Lazy iterator that decodes frames one at a time.
struct FfmpegFrameIter<'a> {
    state: &'a mut OpenStream,
    frame_index: usize,
    first_pts: Option<i64>,
    flushing: bool,
    done: bool,
}

impl FfmpegFrameIter<'_> {
    fn try_receive(&mut self) -> Option<Result<Frame, Box<dyn std::error::Error>>> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        if self.state.decoder.receive_frame(&mut decoded).is_err() {
            return None;
        }

        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
        if let Err(e) = self.state.scaler.run(&decoded, &mut rgb_frame) {
            return Some(Err(Box::new(e)));
        }

        let timestamp_ms = self.timestamp_ms(decoded.timestamp());
        let width = rgb_frame.width();
        let height = rgb_frame.height();
        let pixels = extract_rgb_pixels(&rgb_frame, width, height);
        let frame = Frame::new(pixels, width, height, 3, self.frame_index, timestamp_ms);
        self.frame_index += 1;
        Some(Ok(frame))
    }

    /// Presentation time relative to the first frame, falling back to the
    /// nominal frame interval when the stream carries no usable PTS.
    fn timestamp_ms(&mut self, pts: Option<i64>) -> f64 {
        match pts {
            Some(pts) if self.state.time_base_ms > 0.0 => {
                let first = *self.first_pts.get_or_insert(pts);
                (pts - first) as f64 * self.state.time_base_ms
            }
            _ => self.frame_index as f64 * self.state.frame_interval_ms,
        }
    }
}

impl Iterator for FfmpegFrameIter<'_> {
    type Item = Result<Frame, Box<dyn std::error::Error>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        if let Some(result) = self.try_receive() {
            return Some(result);
        }

        if self.flushing {
            self.done = true;
            return None;
        }

        loop {
            let Some((stream, packet)) = self.state.ictx.packets().next() else {
                let _ = self.state.decoder.send_eof();
                self.flushing = true;
                if let Some(result) = self.try_receive() {
                    return Some(result);
                }
                self.done = true;
                return None;
            };

            if stream.index() != self.state.stream_index {
                continue;
            }

            if self.state.decoder.send_packet(&packet).is_err() {
                continue;
            }

            if let Some(result) = self.try_receive() {
                return Some(result);
            }
        }
    }
}

/// Copies pixel data from an ffmpeg frame into a contiguous RGB buffer.
///
/// ffmpeg frames may pad each row (stride > width*3); the padding is dropped.
fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let w = width as usize;
    let h = height as usize;

    let mut pixels = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + w * 3]);
    }
    pixels
}
