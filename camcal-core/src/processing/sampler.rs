//! Strided frame sampling over a decoded video.
//!
//! Every frame is decoded, but only frames whose sequential index is a
//! multiple of the stride are yielded. Consecutive frames of a hand-held board
//! are nearly identical, so this cuts detector work without losing views.

use crate::error::CoreResult;
use crate::external::FrameReader;
use image::GrayImage;

/// A frame kept by the sampler, with its index in the decoded stream.
#[derive(Debug, Clone)]
pub struct SampledFrame {
    pub index: u64,
    pub image: GrayImage,
}

/// Lazy iterator over every `stride`-th frame of a [`FrameReader`].
///
/// The sampler owns the reader; the video is released when the sampler is
/// dropped, whether or not the stream was read to the end. A decode error is
/// yielded once and ends the iteration.
pub struct FrameSampler<R: FrameReader> {
    reader: R,
    stride: u64,
    frames_read: u64,
    done: bool,
}

impl<R: FrameReader> FrameSampler<R> {
    /// Wraps `reader`; a stride of 0 is treated as 1.
    pub fn new(reader: R, stride: usize) -> Self {
        Self {
            reader,
            stride: stride.max(1) as u64,
            frames_read: 0,
            done: false,
        }
    }

    /// Number of frames decoded so far, sampled or not.
    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }
}

impl<R: FrameReader> Iterator for FrameSampler<R> {
    type Item = CoreResult<SampledFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            match self.reader.read_frame() {
                Ok(Some(image)) => {
                    let index = self.frames_read;
                    self.frames_read += 1;
                    if index % self.stride == 0 {
                        return Some(Ok(SampledFrame { index, image }));
                    }
                }
                Ok(None) => {
                    self.done = true;
                    return None;
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::external::mocks::MockFrameReader;

    fn frames(count: u32) -> Vec<GrayImage> {
        (0..count)
            .map(|i| GrayImage::from_pixel(2, 2, image::Luma([i as u8])))
            .collect()
    }

    #[test]
    fn test_yields_every_tenth_frame() {
        let reader = MockFrameReader::new(frames(25));
        let sampler = FrameSampler::new(reader, 10);
        let indices: Vec<u64> = sampler.map(|f| f.unwrap().index).collect();
        assert_eq!(indices, vec![0, 10, 20]);
    }

    #[test]
    fn test_sampled_frame_matches_decoded_frame() {
        let reader = MockFrameReader::new(frames(12));
        let sampled: Vec<SampledFrame> = FrameSampler::new(reader, 10)
            .collect::<CoreResult<_>>()
            .unwrap();
        assert_eq!(sampled[1].image.get_pixel(0, 0).0[0], 10);
    }

    #[test]
    fn test_counts_all_decoded_frames() {
        let reader = MockFrameReader::new(frames(23));
        let mut sampler = FrameSampler::new(reader, 10);
        while sampler.next().is_some() {}
        assert_eq!(sampler.frames_read(), 23);
    }

    #[test]
    fn test_empty_video_yields_nothing() {
        let mut sampler = FrameSampler::new(MockFrameReader::new(Vec::new()), 10);
        assert!(sampler.next().is_none());
        assert!(sampler.next().is_none());
    }

    #[test]
    fn test_decode_error_ends_iteration() {
        let reader = MockFrameReader::new(frames(15)).fail_after(12);
        let mut sampler = FrameSampler::new(reader, 10);
        assert!(sampler.next().unwrap().is_ok());
        assert!(sampler.next().unwrap().is_ok());
        assert!(matches!(sampler.next(), Some(Err(CoreError::FrameDecode(_)))));
        assert!(sampler.next().is_none());
    }

    #[test]
    fn test_zero_stride_samples_every_frame() {
        let sampler = FrameSampler::new(MockFrameReader::new(frames(3)), 0);
        assert_eq!(sampler.count(), 3);
    }
}
