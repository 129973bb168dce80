// SPDX-License-Identifier: CEPL-1.0
//! Backend-neutral capability values, as reported by a [`Driver`](crate::Driver).

use std::fmt;

use bitflags::bitflags;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Format {
    B8G8R8A8Unorm,
    B8G8R8A8Srgb,
    R8G8B8A8Unorm,
    R8G8B8A8Srgb,
    /// Anything else, carried as the backend's raw enum value.
    Other(i32),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColorSpace {
    SrgbNonlinear,
    Other(i32),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SurfaceFormat {
    pub format: Format,
    pub color_space: ColorSpace,
}

impl SurfaceFormat {
    pub const fn new(format: Format, color_space: ColorSpace) -> Self {
        Self { format, color_space }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PresentMode {
    Immediate,
    /// Low-latency triple buffering.
    Mailbox,
    /// Vsync queue. Every conformant implementation supports it.
    Fifo,
    FifoRelaxed,
    Other(i32),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Extent2D {
    pub width: u32,
    pub height: u32,
}

impl Extent2D {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for Extent2D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SurfaceCapabilities {
    /// `u32::MAX` in both axes means the surface size is decided by the swapchain.
    pub current_extent: Extent2D,
    pub min_image_extent: Extent2D,
    pub max_image_extent: Extent2D,
    pub min_image_count: u32,
    /// 0 means no upper bound.
    pub max_image_count: u32,
}

impl SurfaceCapabilities {
    /// Sentinel value of `current_extent.width` for window-sized surfaces.
    pub const UNDEFINED_EXTENT: u32 = u32::MAX;

    pub fn has_current_extent(&self) -> bool {
        self.current_extent.width != Self::UNDEFINED_EXTENT
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct QueueFlags: u32 {
        const GRAPHICS = 0b0001;
        const COMPUTE = 0b0010;
        const TRANSFER = 0b0100;
        const SPARSE_BINDING = 0b1000;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueueFamily {
    pub flags: QueueFlags,
    pub queue_count: u32,
}

impl QueueFamily {
    pub fn supports_graphics(&self) -> bool {
        self.flags.contains(QueueFlags::GRAPHICS)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DeviceType {
    DiscreteGpu,
    IntegratedGpu,
    VirtualGpu,
    Cpu,
    Other,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhysicalDeviceInfo {
    pub name: String,
    pub device_type: DeviceType,
}

/// Graphics and present family picks. `None` means no family qualified.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    pub graphics: Option<u32>,
    pub present: Option<u32>,
}

impl QueueFamilyIndices {
    pub fn is_shared(&self) -> bool {
        self.graphics.is_some() && self.graphics == self.present
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SharingMode {
    Exclusive,
    Concurrent,
}
