//! Double-buffered feedback field.
//!
//! Trail and diffusion effects need the previous step's field while the new
//! one is being written. A single texture would make that a device-side data
//! race, so the field is a ping-pong pair: kernels read the `current` texture
//! and write the `standby` one, and [`FeedbackSurface::swap`] promotes the
//! freshly written texture after the step's dispatches.

use crate::gpu::buffers::read_mapped_bytes;

/// Pixel format of the feedback field: four 16-bit float channels.
pub const FIELD_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

/// Bytes per RGBA16F pixel.
const BYTES_PER_PIXEL: u32 = 8;

/// One field texture and its view.
///
/// The same view serves both binding types: read-only sampled in one
/// dispatch (`texture_2d<f32>` + `textureLoad`) and write-only storage in
/// the other (`texture_storage_2d<rgba16float, write>`) -- never both in
/// the same dispatch.
struct FieldTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl FieldTexture {
    fn new(device: &wgpu::Device, label: &str, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: FIELD_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::STORAGE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }
}

/// A presentable CPU-side copy of the field, decoded to f32.
///
/// `pixels` is row-major RGBA, `width * height * 4` values.
#[derive(Debug, Clone)]
pub struct FieldImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Row-major RGBA channel data.
    pub pixels: Vec<f32>,
}

impl FieldImage {
    /// An all-black image, used by tests and as a placeholder.
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0.0; (width * height * 4) as usize],
        }
    }
}

/// Ping-pong pair of RGBA16F field textures plus a pooled readback buffer.
pub struct FeedbackSurface {
    width: u32,
    height: u32,
    current: FieldTexture,
    standby: FieldTexture,
    readback: wgpu::Buffer,
    padded_bytes_per_row: u32,
}

impl FeedbackSurface {
    /// Allocate both textures and the readback buffer.
    ///
    /// wgpu zero-initializes textures, so the field starts black.
    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let unpadded = width * BYTES_PER_PIXEL;
        let padded_bytes_per_row = unpadded.div_ceil(align) * align;

        let readback = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("field_readback"),
            size: (padded_bytes_per_row * height) as u64,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            width,
            height,
            current: FieldTexture::new(device, "field_a", width, height),
            standby: FieldTexture::new(device, "field_b", width, height),
            readback,
            padded_bytes_per_row,
        }
    }

    /// Field width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Field height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// The previous step's field, for read-only kernel bindings.
    pub fn read_view(&self) -> &wgpu::TextureView {
        &self.current.view
    }

    /// The next field, for write-only storage bindings.
    pub fn write_view(&self) -> &wgpu::TextureView {
        &self.standby.view
    }

    /// Promote the freshly written texture to current.
    ///
    /// Called once per step, after the field and element dispatches have
    /// been encoded. The old current texture becomes the next write target.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.current, &mut self.standby);
    }

    /// Copy the current field to the CPU and decode it to f32 RGBA.
    ///
    /// Does not mutate the surface; the pooled readback buffer is reused
    /// across calls.
    pub fn present(&self, device: &wgpu::Device, queue: &wgpu::Queue) -> FieldImage {
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("field_present"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.current.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &self.readback,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(self.padded_bytes_per_row),
                    rows_per_image: Some(self.height),
                },
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
        queue.submit(std::iter::once(encoder.finish()));

        let bytes = read_mapped_bytes(device, &self.readback);
        let mut image = FieldImage::empty(self.width, self.height);
        if bytes.is_empty() {
            return image;
        }

        // Strip the per-row copy padding while decoding the half floats.
        for y in 0..self.height as usize {
            let row = &bytes[y * self.padded_bytes_per_row as usize..];
            for x in 0..(self.width * 4) as usize {
                let lo = row[x * 2] as u16;
                let hi = row[x * 2 + 1] as u16;
                image.pixels[y * (self.width * 4) as usize + x] =
                    f16_bits_to_f32(lo | (hi << 8));
            }
        }
        image
    }
}

/// Decode IEEE 754 half-precision bits to f32.
pub fn f16_bits_to_f32(bits: u16) -> f32 {
    let sign = if bits & 0x8000 != 0 { -1.0_f32 } else { 1.0 };
    let exp = ((bits >> 10) & 0x1F) as i32;
    let frac = (bits & 0x3FF) as u32;
    match exp {
        // Subnormals: frac * 2^-24
        0 => sign * frac as f32 * (2.0_f32).powi(-24),
        0x1F => {
            if frac == 0 {
                sign * f32::INFINITY
            } else {
                f32::NAN
            }
        }
        _ => sign * (1.0 + frac as f32 / 1024.0) * (2.0_f32).powi(exp - 15),
    }
}

/// Encode an f32 as IEEE 754 half-precision bits (round toward zero).
pub fn f32_to_f16_bits(x: f32) -> u16 {
    let bits = x.to_bits();
    let sign = ((bits >> 31) & 1) as u16;
    let exp = ((bits >> 23) & 0xFF) as i32;
    let frac = bits & 0x7F_FFFF;

    if exp == 0xFF {
        // Inf / NaN
        return (sign << 15) | 0x7C00 | u16::from(frac != 0);
    }

    let half_exp = exp - 127 + 15;
    if half_exp >= 31 {
        // Overflow to infinity.
        return (sign << 15) | 0x7C00;
    }
    if half_exp <= 0 {
        if half_exp < -10 {
            // Underflow to signed zero.
            return sign << 15;
        }
        let frac_with_hidden = frac | 0x80_0000;
        return (sign << 15) | (frac_with_hidden >> (13 + (1 - half_exp))) as u16;
    }

    (sign << 15) | ((half_exp as u16) << 10) | (frac >> 13) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn f16_known_values() {
        assert_eq!(f32_to_f16_bits(0.0), 0x0000);
        assert_eq!(f32_to_f16_bits(1.0), 0x3C00);
        assert_eq!(f32_to_f16_bits(-2.0), 0xC000);
        assert_eq!(f32_to_f16_bits(0.5), 0x3800);
        assert_eq!(f32_to_f16_bits(f32::INFINITY), 0x7C00);

        assert_eq!(f16_bits_to_f32(0x3C00), 1.0);
        assert_eq!(f16_bits_to_f32(0xC000), -2.0);
        assert_eq!(f16_bits_to_f32(0x3800), 0.5);
        assert_eq!(f16_bits_to_f32(0x7C00), f32::INFINITY);
        assert!(f16_bits_to_f32(0x7C01).is_nan());
    }

    #[test]
    fn f16_round_trip_exact_values() {
        // Values exactly representable in half precision survive both ways.
        for &v in &[0.0_f32, 1.0, -1.0, 0.25, 255.0, 1024.0, -0.125] {
            assert_eq!(f16_bits_to_f32(f32_to_f16_bits(v)), v, "value {v}");
        }
    }

    #[test]
    fn f16_subnormal_decode() {
        // Smallest positive subnormal: 2^-24.
        let tiny = f16_bits_to_f32(0x0001);
        assert!((tiny - 5.9604645e-8).abs() < 1e-12);
    }
}
