//! Element state buffers and CPU<->GPU marshaling.
//!
//! A [`StateBuffer`] owns the CPU-side element array plus two device buffers
//! that live for the whole run: the storage buffer the kernels mutate and a
//! staging buffer for readback. Both are allocated once at construction and
//! reused every step, so the steady-state frame loop performs no allocation.

use wgpu::util::DeviceExt;

use crate::element::DeviceRecord;

use std::error::Error;
use std::fmt;

/// Fatal mismatch between the CPU record layout and the shader's declared
/// layout. A silent mismatch corrupts memory across the boundary, so this is
/// checked before anything is uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutMismatch {
    /// Record label ([`DeviceRecord::LABEL`]).
    pub record: &'static str,
    /// Byte size of the CPU-side record.
    pub cpu_size: usize,
    /// Byte size the shader declares.
    pub shader_size: usize,
}

impl fmt::Display for LayoutMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} record layout mismatch: CPU size {} bytes, shader expects {} bytes",
            self.record, self.cpu_size, self.shader_size
        )
    }
}

impl Error for LayoutMismatch {}

/// Minimum buffer size (wgpu rejects zero-sized buffers).
const MIN_BUF_SIZE: u64 = 4;

/// CPU-owned element array mirrored into a persistent device storage buffer.
pub struct StateBuffer<T: DeviceRecord> {
    elements: Vec<T>,
    storage: wgpu::Buffer,
    staging: wgpu::Buffer,
    // True when the device copy is newer than `elements`; readback is
    // deferred until someone actually asks for the data.
    device_dirty: bool,
}

impl<T: DeviceRecord> StateBuffer<T> {
    /// Create the device buffers and seed the storage buffer with `elements`.
    ///
    /// Fails fast with [`LayoutMismatch`] when the CPU record size diverges
    /// from the size the shader declares.
    pub fn new(device: &wgpu::Device, elements: Vec<T>) -> Result<Self, LayoutMismatch> {
        let cpu_size = std::mem::size_of::<T>();
        if cpu_size != T::SHADER_SIZE {
            return Err(LayoutMismatch {
                record: T::LABEL,
                cpu_size,
                shader_size: T::SHADER_SIZE,
            });
        }

        let byte_len = ((elements.len() * cpu_size) as u64).max(MIN_BUF_SIZE);

        let storage = if elements.is_empty() {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(T::LABEL),
                size: byte_len,
                usage: wgpu::BufferUsages::STORAGE
                    | wgpu::BufferUsages::COPY_SRC
                    | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        } else {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(T::LABEL),
                contents: bytemuck::cast_slice(&elements),
                usage: wgpu::BufferUsages::STORAGE
                    | wgpu::BufferUsages::COPY_SRC
                    | wgpu::BufferUsages::COPY_DST,
            })
        };

        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("staging"),
            size: byte_len,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Ok(Self {
            elements,
            storage,
            staging,
            device_dirty: false,
        })
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// True when the buffer holds no elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// The device storage buffer, for bind group construction.
    pub fn storage(&self) -> &wgpu::Buffer {
        &self.storage
    }

    /// Copy the CPU array into the device buffer, byte-for-byte.
    ///
    /// No-op while the device copy is the newer of the two (a dispatch has
    /// written it and nothing has synced since): overwriting it with the
    /// stale CPU array would silently reset the simulation. The steady-state
    /// loop therefore uploads only on the first step and after an explicit
    /// sync.
    pub fn upload(&self, queue: &wgpu::Queue) {
        if self.device_dirty || self.elements.is_empty() {
            return;
        }
        queue.write_buffer(&self.storage, 0, bytemuck::cast_slice(&self.elements));
    }

    /// Record that a dispatch has mutated the device copy.
    ///
    /// The actual download happens lazily in [`StateBuffer::synced`].
    pub fn mark_device_dirty(&mut self) {
        self.device_dirty = true;
    }

    /// The CPU-side elements, downloading from the device first if a
    /// dispatch has written them since the last sync.
    ///
    /// The buffer map wait inside is the synchronization barrier of the
    /// step pipeline: it blocks until all submitted device work is done.
    pub fn synced(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) -> &[T] {
        if self.device_dirty {
            self.download(device, queue);
            self.device_dirty = false;
        }
        &self.elements
    }

    /// Force a download of the device copy into the CPU array.
    pub fn download(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) {
        if self.elements.is_empty() {
            return;
        }

        let byte_len = (self.elements.len() * std::mem::size_of::<T>()) as u64;
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("state_readback"),
        });
        encoder.copy_buffer_to_buffer(&self.storage, 0, &self.staging, 0, byte_len);
        queue.submit(std::iter::once(encoder.finish()));

        read_mapped(device, &self.staging, &mut self.elements);
    }
}

/// Block on mapping a staging buffer and copy its contents into `out`.
fn read_mapped<T: bytemuck::Pod>(device: &wgpu::Device, buffer: &wgpu::Buffer, out: &mut [T]) {
    let slice = buffer.slice(..);
    let (tx, rx) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    device.poll(wgpu::Maintain::Wait);
    if let Ok(Ok(())) = rx.recv() {
        let data = slice.get_mapped_range();
        out.copy_from_slice(&bytemuck::cast_slice(&data)[..out.len()]);
        drop(data);
        buffer.unmap();
    } else {
        tracing::error!("staging buffer map failed; element state not refreshed");
    }
}

/// Map a readback buffer and return its raw bytes.
///
/// Shared by [`StateBuffer`] and the surface readback path in
/// [`crate::gpu::surface`].
pub(crate) fn read_mapped_bytes(device: &wgpu::Device, buffer: &wgpu::Buffer) -> Vec<u8> {
    let slice = buffer.slice(..);
    let (tx, rx) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    device.poll(wgpu::Maintain::Wait);
    match rx.recv() {
        Ok(Ok(())) => {
            let data = slice.get_mapped_range();
            let bytes = data.to_vec();
            drop(data);
            buffer.unmap();
            bytes
        }
        _ => {
            tracing::error!("readback buffer map failed");
            Vec::new()
        }
    }
}
