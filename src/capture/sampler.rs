use chrono::Utc;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ DynamicImage, GenericImageView };
use log::{ error, warn };
use std::sync::Arc;

use super::{ ReadyState, VideoSource };
use crate::error::Result;
use crate::models::frame::CapturedFrame;

pub const DEFAULT_SCALE: f32 = 0.5;
pub const DEFAULT_JPEG_QUALITY: u8 = 60;

/// Turns the current stream frame into a downscaled JPEG still.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameSampler {
    scale: f32,
    quality: u8,
}

impl Default for FrameSampler {
    fn default() -> Self {
        Self::new(DEFAULT_SCALE, DEFAULT_JPEG_QUALITY)
    }
}

impl FrameSampler {
    pub fn new(scale: f32, quality: u8) -> Self {
        Self {
            // Never upscale; non-finite or non-positive factors fall back.
            scale: if scale.is_finite() && scale > 0.0 { scale.min(1.0) } else { DEFAULT_SCALE },
            quality: quality.clamp(1, 100),
        }
    }

    /// Returns `None` when the stream is not ready or yields nothing usable.
    pub fn sample(&self, source: &dyn VideoSource) -> Option<CapturedFrame> {
        if source.ready_state() < ReadyState::HaveCurrentData {
            return None;
        }

        let image = source.current_frame()?;
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return None;
        }

        match self.encode(&image) {
            Ok(frame) => Some(frame),
            Err(e) => {
                warn!("Failed to encode sampled frame: {}", e);
                None
            }
        }
    }

    /// Scales and JPEG-encodes a non-empty raster.
    pub fn encode(&self, image: &DynamicImage) -> Result<CapturedFrame> {
        let (width, height) = image.dimensions();
        let target_w = ((width as f32) * self.scale).round().max(1.0) as u32;
        let target_h = ((height as f32) * self.scale).round().max(1.0) as u32;
        // JPEG carries no alpha channel.
        let raster = image.resize_exact(target_w, target_h, FilterType::Triangle).to_rgb8();

        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, self.quality).encode_image(&raster)?;

        Ok(CapturedFrame {
            jpeg,
            width: target_w,
            height: target_h,
            captured_at: Utc::now(),
        })
    }

    /// Samples on the blocking pool; decoding and encoding are CPU bound.
    pub async fn sample_blocking(&self, source: Arc<dyn VideoSource>) -> Option<CapturedFrame> {
        let sampler = *self;
        match tokio::task::spawn_blocking(move || sampler.sample(source.as_ref())).await {
            Ok(frame) => frame,
            Err(e) => {
                error!("Frame sampling worker failed: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    struct FakeSource {
        state: ReadyState,
        frame: Option<DynamicImage>,
    }

    impl VideoSource for FakeSource {
        fn ready_state(&self) -> ReadyState {
            self.state
        }

        fn current_frame(&self) -> Option<DynamicImage> {
            self.frame.clone()
        }
    }

    fn solid(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, image::Rgba([10, 200, 30, 255])))
    }

    #[test]
    fn not_ready_stream_yields_nothing() {
        for state in [ReadyState::HaveNothing, ReadyState::HaveMetadata] {
            let source = FakeSource { state, frame: Some(solid(64, 36)) };
            assert!(FrameSampler::default().sample(&source).is_none());
        }
    }

    #[test]
    fn zero_sized_frame_yields_nothing() {
        let source = FakeSource { state: ReadyState::HaveEnoughData, frame: Some(solid(0, 0)) };
        assert!(FrameSampler::default().sample(&source).is_none());
    }

    #[test]
    fn ready_stream_is_halved_and_jpeg_encoded() {
        let source = FakeSource { state: ReadyState::HaveCurrentData, frame: Some(solid(128, 72)) };
        let frame = FrameSampler::default().sample(&source).expect("frame");

        assert_eq!((frame.width, frame.height), (64, 36));
        assert_eq!(&frame.jpeg[..2], &[0xff, 0xd8]);

        let decoded = image::load_from_memory(&frame.jpeg).unwrap();
        assert_eq!(decoded.dimensions(), (64, 36));
    }

    #[test]
    fn unusable_scale_factors_fall_back_or_cap() {
        assert_eq!(FrameSampler::new(f32::INFINITY, 60), FrameSampler::default());
        assert_eq!(FrameSampler::new(f32::NAN, 60), FrameSampler::default());
        assert_eq!(FrameSampler::new(-2.0, 60), FrameSampler::default());

        let source = FakeSource { state: ReadyState::HaveCurrentData, frame: Some(solid(40, 20)) };
        let frame = FrameSampler::new(8.0, 60).sample(&source).expect("frame");
        assert_eq!((frame.width, frame.height), (40, 20));
    }

    #[test]
    fn encode_produces_decodable_jpeg() {
        let frame = FrameSampler::new(1.0, 90).encode(&solid(12, 8)).unwrap();
        let decoded = image::load_from_memory(&frame.jpeg).unwrap();
        assert_eq!(decoded.dimensions(), (12, 8));
    }

    #[test]
    fn tiny_frames_never_collapse_to_zero() {
        let source = FakeSource { state: ReadyState::HaveCurrentData, frame: Some(solid(1, 1)) };
        let frame = FrameSampler::default().sample(&source).expect("frame");
        assert_eq!((frame.width, frame.height), (1, 1));
    }
}
