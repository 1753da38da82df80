//! Plain-data simulation element records shared with the compute shaders.
//!
//! Every record here crosses the CPU/GPU boundary byte-for-byte, so field
//! order, primitive widths, and the absence of implicit padding are part of
//! the wire contract with the WGSL structs in `gpu/shaders/`. The shader-side
//! byte size is pinned through [`DeviceRecord::SHADER_SIZE`] and checked both
//! at compile time (below) and again when a [`crate::gpu::StateBuffer`] is
//! created.

use std::mem;

/// Marker for plain-data records that mirror a WGSL struct.
///
/// `SHADER_SIZE` is the byte size the shader declares for the record. The
/// WGSL side deliberately uses scalar fields (no `vec2`/`vec4` members) so
/// the storage-buffer stride stays at the packed size with no alignment
/// padding.
pub trait DeviceRecord: bytemuck::Pod {
    /// Byte size of the matching WGSL struct.
    const SHADER_SIZE: usize;
    /// Short name used for buffer labels and error messages.
    const LABEL: &'static str;
}

/// One two-segment pendulum: joint state plus a fixed display color.
///
/// Must match `struct Pendulum` in `gpu/shaders/pendulum.wgsl` exactly.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PendulumState {
    /// Joint angles in radians (upper, lower).
    pub angles: [f32; 2],
    /// Segment lengths in field pixels.
    pub lengths: [f32; 2],
    /// Segment masses.
    pub masses: [f32; 2],
    /// Angular velocity per joint.
    pub velocity: [f32; 2],
    /// Angular acceleration per joint.
    pub acceleration: [f32; 2],
    /// Display color assigned at spawn time, RGBA in [0, 1].
    pub color: [f32; 4],
}

impl DeviceRecord for PendulumState {
    const SHADER_SIZE: usize = 56;
    const LABEL: &'static str = "pendulum";
}

/// One trail-following agent: position and heading.
///
/// Must match `struct Agent` in `gpu/shaders/slime.wgsl` exactly.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct AgentState {
    /// Position in field pixels.
    pub position: [f32; 2],
    /// Heading in radians.
    pub angle: f32,
}

impl DeviceRecord for AgentState {
    const SHADER_SIZE: usize = 12;
    const LABEL: &'static str = "agent";
}

// Layout drift between the Rust records and the shader structs corrupts
// memory across the boundary; refuse to compile instead.
const _: () = assert!(mem::size_of::<PendulumState>() == PendulumState::SHADER_SIZE);
const _: () = assert!(mem::size_of::<AgentState>() == AgentState::SHADER_SIZE);
const _: () = assert!(mem::align_of::<PendulumState>() == 4);
const _: () = assert!(mem::align_of::<AgentState>() == 4);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pendulum_layout_is_packed() {
        assert_eq!(mem::size_of::<PendulumState>(), 56);
        // 14 f32 fields, no padding anywhere.
        assert_eq!(mem::size_of::<PendulumState>(), 14 * mem::size_of::<f32>());
    }

    #[test]
    fn agent_layout_is_packed() {
        assert_eq!(mem::size_of::<AgentState>(), 12);
        assert_eq!(mem::size_of::<AgentState>(), 3 * mem::size_of::<f32>());
    }

    #[test]
    fn records_round_trip_through_bytes() {
        let agent = AgentState {
            position: [12.5, -3.0],
            angle: 1.25,
        };
        let bytes = bytemuck::bytes_of(&agent);
        let back: AgentState = *bytemuck::from_bytes(bytes);
        assert_eq!(agent, back);

        let pendulum = PendulumState {
            angles: [-1.5707964, -1.5697964],
            lengths: [100.0, 100.0],
            masses: [10.0, 10.0],
            velocity: [0.0, 0.0],
            acceleration: [0.0, 0.0],
            color: [1.0, 0.5, 0.25, 1.0],
        };
        let bytes = bytemuck::bytes_of(&pendulum);
        let back: PendulumState = *bytemuck::from_bytes(bytes);
        assert_eq!(pendulum, back);
    }
}
