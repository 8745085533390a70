//! Frame sources for the tracker: a directory of still images for bench testing, and
//! (with the `camera` feature) a live OpenCV capture device.

use image::ImageReader;
use log::{debug, info};
use note_vision::{Frame, FrameSource, VisionError};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tif", "tiff", "webp"];

/// Replays the images of a directory in file-name order, optionally forever.
pub struct ImageDirSource {
    files: Vec<PathBuf>,
    next: usize,
    looping: bool,
}

impl ImageDirSource {
    pub fn open(dir: impl AsRef<Path>, looping: bool) -> io::Result<Self> {
        let dir = dir.as_ref();
        let mut files: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| ext.to_ascii_lowercase())
                    .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
            })
            .collect();
        files.sort();
        info!("replaying {} images from {}", files.len(), dir.display());
        Ok(Self {
            files,
            next: 0,
            looping,
        })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FrameSource for ImageDirSource {
    fn next_frame(&mut self) -> Result<Frame, VisionError> {
        if self.next >= self.files.len() {
            if !self.looping || self.files.is_empty() {
                return Err(VisionError::NoFrame("image directory exhausted".into()));
            }
            self.next = 0;
        }
        let path = &self.files[self.next];
        self.next += 1;
        debug!("reading {}", path.display());

        let image = ImageReader::open(path)
            .map_err(|err| VisionError::NoFrame(format!("{}: {err}", path.display())))?
            .decode()
            .map_err(|err| VisionError::NoFrame(format!("{}: {err}", path.display())))?;
        Ok(image.to_rgb8())
    }
}

/// Hands back a frame that was already pulled (to learn the camera geometry) before
/// resuming the wrapped source.
pub struct Primed<S> {
    first: Option<Frame>,
    inner: S,
}

impl<S: FrameSource> Primed<S> {
    /// Pulls the first frame from `inner`. Retries up to `attempts` times.
    pub fn new(mut inner: S, attempts: usize) -> Result<Self, VisionError> {
        let mut last = VisionError::NoFrame("no attempts made".into());
        for _ in 0..attempts.max(1) {
            match inner.next_frame() {
                Ok(frame) => {
                    return Ok(Self {
                        first: Some(frame),
                        inner,
                    });
                }
                Err(err) => {
                    debug!("waiting for a first frame: {err}");
                    last = err;
                }
            }
        }
        Err(last)
    }

    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.first.as_ref().map(|frame| frame.dimensions())
    }
}

impl<S: FrameSource> FrameSource for Primed<S> {
    fn next_frame(&mut self) -> Result<Frame, VisionError> {
        match self.first.take() {
            Some(frame) => Ok(frame),
            None => self.inner.next_frame(),
        }
    }
}

#[cfg(feature = "camera")]
pub use camera::CameraSource;

#[cfg(feature = "camera")]
mod camera {
    use super::*;
    use opencv::{
        core::Mat,
        imgproc,
        prelude::*,
        videoio::{self, VideoCapture},
    };

    /// A live capture device, converted from OpenCV's BGR layout to RGB frames.
    pub struct CameraSource {
        capture: VideoCapture,
        bgr: Mat,
        rgb: Mat,
    }

    impl CameraSource {
        pub fn open(index: i32) -> opencv::Result<Self> {
            let capture = VideoCapture::new(index, videoio::CAP_ANY)?;
            if !capture.is_opened()? {
                return Err(opencv::Error::new(
                    opencv::core::StsError,
                    format!("camera {index} could not be opened"),
                ));
            }
            info!(
                "camera {index} open at {}x{}",
                capture.get(videoio::CAP_PROP_FRAME_WIDTH)?,
                capture.get(videoio::CAP_PROP_FRAME_HEIGHT)?
            );
            Ok(Self {
                capture,
                bgr: Mat::default(),
                rgb: Mat::default(),
            })
        }

        fn grab(&mut self) -> opencv::Result<Option<Frame>> {
            if !self.capture.read(&mut self.bgr)? || self.bgr.empty() {
                return Ok(None);
            }
            imgproc::cvt_color(&self.bgr, &mut self.rgb, imgproc::COLOR_BGR2RGB, 0)?;
            let width = self.rgb.cols() as u32;
            let height = self.rgb.rows() as u32;
            let bytes = self.rgb.data_bytes()?.to_vec();
            Ok(Frame::from_raw(width, height, bytes))
        }
    }

    impl FrameSource for CameraSource {
        fn next_frame(&mut self) -> Result<Frame, VisionError> {
            match self.grab() {
                Ok(Some(frame)) => Ok(frame),
                Ok(None) => Err(VisionError::NoFrame("camera returned an empty frame".into())),
                Err(err) => Err(VisionError::NoFrame(err.to_string())),
            }
        }
    }
}
