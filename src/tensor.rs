//! Owned image tensors.
//!
//! Decoded frames are returned as [`ImageTensor`] values: tightly-packed
//! 8-bit RGB buffers with an explicit shape and layout. Batched requests
//! return an [`ImageBatch`], a rank-4 tensor with one slot per requested
//! frame. FFmpeg frames frequently carry per-row padding (stride >
//! width × 3); construction strips that padding so the buffers can be
//! handed to consumers as-is.

use image::RgbImage;

use crate::error::DecodeError;
use crate::options::FrameShape;

/// A single decoded frame as a rank-3 tensor of `u8`.
///
/// The shape is `[height, width, 3]` for [`FrameShape::Hwc`] and
/// `[3, height, width]` for [`FrameShape::Chw`]. Data is tightly packed in
/// row-major order over the shape.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct ImageTensor {
    shape: Vec<usize>,
    layout: FrameShape,
    data: Vec<u8>,
}

impl ImageTensor {
    /// Build a tensor from a tightly-packed interleaved RGB buffer of
    /// `height * width * 3` bytes, permuting to planar when the requested
    /// layout is CHW.
    pub(crate) fn from_packed_rgb(
        height: usize,
        width: usize,
        layout: FrameShape,
        packed: Vec<u8>,
    ) -> Result<Self, DecodeError> {
        let expected = height * width * 3;
        if packed.len() != expected {
            return Err(DecodeError::Internal(format!(
                "RGB buffer has {} bytes, expected {expected} for {width}x{height}",
                packed.len()
            )));
        }
        let data = match layout {
            FrameShape::Hwc => packed,
            FrameShape::Chw => permute_hwc_to_chw(height, width, &packed),
        };
        Ok(Self {
            shape: layout.frame_dims(height, width).to_vec(),
            layout,
            data,
        })
    }

    /// The tensor's shape.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Number of axes. Always 3 for a single decoded frame.
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// The memory layout this tensor was materialised in.
    pub fn layout(&self) -> FrameShape {
        self.layout
    }

    /// Frame height in pixels.
    pub fn height(&self) -> usize {
        match self.layout {
            FrameShape::Hwc => self.shape[0],
            FrameShape::Chw => self.shape[1],
        }
    }

    /// Frame width in pixels.
    pub fn width(&self) -> usize {
        match self.layout {
            FrameShape::Hwc => self.shape[1],
            FrameShape::Chw => self.shape[2],
        }
    }

    /// The raw pixel bytes, tightly packed over [`shape`](Self::shape).
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consume the tensor and take ownership of the pixel bytes.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Convert to an [`image::RgbImage`].
    ///
    /// CHW tensors are permuted back to interleaved rows first.
    pub fn to_rgb_image(&self) -> Option<RgbImage> {
        let (height, width) = (self.height(), self.width());
        let interleaved = match self.layout {
            FrameShape::Hwc => self.data.clone(),
            FrameShape::Chw => permute_chw_to_hwc(height, width, &self.data),
        };
        RgbImage::from_raw(width as u32, height as u32, interleaved)
    }
}

/// A batch of decoded frames as a rank-4 tensor of `u8`.
///
/// The shape is `[len, height, width, 3]` or `[len, 3, height, width]`
/// depending on the layout. Slots are written in the order frames were
/// requested.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct ImageBatch {
    shape: Vec<usize>,
    layout: FrameShape,
    data: Vec<u8>,
}

impl ImageBatch {
    /// Allocate a zeroed batch of `len` frames of `height` × `width`.
    pub(crate) fn zeroed(len: usize, height: usize, width: usize, layout: FrameShape) -> Self {
        let frame = layout.frame_dims(height, width);
        let mut shape = Vec::with_capacity(4);
        shape.push(len);
        shape.extend_from_slice(&frame);
        let data = vec![0; len * height * width * 3];
        Self {
            shape,
            layout,
            data,
        }
    }

    /// Copy one decoded frame into the given slot.
    ///
    /// The frame's shape and layout must match the batch's per-frame shape.
    pub(crate) fn write_slot(&mut self, slot: usize, frame: &ImageTensor) -> Result<(), DecodeError> {
        if slot >= self.shape[0] {
            return Err(DecodeError::Internal(format!(
                "Batch slot {slot} out of range for {} frames",
                self.shape[0]
            )));
        }
        if frame.layout() != self.layout || frame.shape() != &self.shape[1..] {
            return Err(DecodeError::Internal(format!(
                "Frame shape {:?} does not match batch slot shape {:?}",
                frame.shape(),
                &self.shape[1..]
            )));
        }
        let stride = frame.data().len();
        self.data[slot * stride..(slot + 1) * stride].copy_from_slice(frame.data());
        Ok(())
    }

    /// The batch's shape; the leading axis is the number of frames.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Number of frames in the batch.
    pub fn len(&self) -> usize {
        self.shape[0]
    }

    /// Whether the batch contains no frames.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The memory layout of every frame in the batch.
    pub fn layout(&self) -> FrameShape {
        self.layout
    }

    /// The raw pixel bytes of the whole batch.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Copy one slot back out as a standalone [`ImageTensor`].
    pub fn frame(&self, slot: usize) -> Option<ImageTensor> {
        if slot >= self.len() {
            return None;
        }
        let stride = self.shape[1..].iter().product::<usize>();
        Some(ImageTensor {
            shape: self.shape[1..].to_vec(),
            layout: self.layout,
            data: self.data[slot * stride..(slot + 1) * stride].to_vec(),
        })
    }
}

/// Strip per-row padding from an interleaved RGB plane.
pub(crate) fn pack_rgb_rows(data: &[u8], stride: usize, height: usize, width: usize) -> Vec<u8> {
    let row_bytes = width * 3;
    if stride == row_bytes {
        data[..row_bytes * height].to_vec()
    } else {
        let mut packed = Vec::with_capacity(row_bytes * height);
        for row in 0..height {
            let start = row * stride;
            packed.extend_from_slice(&data[start..start + row_bytes]);
        }
        packed
    }
}

fn permute_hwc_to_chw(height: usize, width: usize, packed: &[u8]) -> Vec<u8> {
    let plane = height * width;
    let mut out = vec![0; plane * 3];
    for pixel in 0..plane {
        let src = pixel * 3;
        out[pixel] = packed[src];
        out[plane + pixel] = packed[src + 1];
        out[2 * plane + pixel] = packed[src + 2];
    }
    out
}

fn permute_chw_to_hwc(height: usize, width: usize, planar: &[u8]) -> Vec<u8> {
    let plane = height * width;
    let mut out = vec![0; plane * 3];
    for pixel in 0..plane {
        let dst = pixel * 3;
        out[dst] = planar[pixel];
        out[dst + 1] = planar[plane + pixel];
        out[dst + 2] = planar[2 * plane + pixel];
    }
    out
}
