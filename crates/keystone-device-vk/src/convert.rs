// SPDX-License-Identifier: CEPL-1.0
// vk <-> keystone capability values.

use ash::vk;
use keystone_device::{
  ColorSpace, DeviceType, Extent2D, Format, PresentMode, QueueFamily, QueueFlags, SharingMode,
  SurfaceCapabilities, SurfaceFormat,
};

pub(crate) fn format_to_vk(f: Format) -> vk::Format {
  match f {
    Format::B8G8R8A8Unorm => vk::Format::B8G8R8A8_UNORM,
    Format::B8G8R8A8Srgb => vk::Format::B8G8R8A8_SRGB,
    Format::R8G8B8A8Unorm => vk::Format::R8G8B8A8_UNORM,
    Format::R8G8B8A8Srgb => vk::Format::R8G8B8A8_SRGB,
    Format::Other(raw) => vk::Format::from_raw(raw),
  }
}

pub(crate) fn format_from_vk(f: vk::Format) -> Format {
  match f {
    vk::Format::B8G8R8A8_UNORM => Format::B8G8R8A8Unorm,
    vk::Format::B8G8R8A8_SRGB => Format::B8G8R8A8Srgb,
    vk::Format::R8G8B8A8_UNORM => Format::R8G8B8A8Unorm,
    vk::Format::R8G8B8A8_SRGB => Format::R8G8B8A8Srgb,
    other => Format::Other(other.as_raw()),
  }
}

pub(crate) fn color_space_to_vk(cs: ColorSpace) -> vk::ColorSpaceKHR {
  match cs {
    ColorSpace::SrgbNonlinear => vk::ColorSpaceKHR::SRGB_NONLINEAR,
    ColorSpace::Other(raw) => vk::ColorSpaceKHR::from_raw(raw),
  }
}

pub(crate) fn color_space_from_vk(cs: vk::ColorSpaceKHR) -> ColorSpace {
  match cs {
    vk::ColorSpaceKHR::SRGB_NONLINEAR => ColorSpace::SrgbNonlinear,
    other => ColorSpace::Other(other.as_raw()),
  }
}

pub(crate) fn surface_format_from_vk(f: vk::SurfaceFormatKHR) -> SurfaceFormat {
  SurfaceFormat::new(format_from_vk(f.format), color_space_from_vk(f.color_space))
}

pub(crate) fn present_mode_to_vk(m: PresentMode) -> vk::PresentModeKHR {
  match m {
    PresentMode::Immediate => vk::PresentModeKHR::IMMEDIATE,
    PresentMode::Mailbox => vk::PresentModeKHR::MAILBOX,
    PresentMode::Fifo => vk::PresentModeKHR::FIFO,
    PresentMode::FifoRelaxed => vk::PresentModeKHR::FIFO_RELAXED,
    PresentMode::Other(raw) => vk::PresentModeKHR::from_raw(raw),
  }
}

pub(crate) fn present_mode_from_vk(m: vk::PresentModeKHR) -> PresentMode {
  match m {
    vk::PresentModeKHR::IMMEDIATE => PresentMode::Immediate,
    vk::PresentModeKHR::MAILBOX => PresentMode::Mailbox,
    vk::PresentModeKHR::FIFO => PresentMode::Fifo,
    vk::PresentModeKHR::FIFO_RELAXED => PresentMode::FifoRelaxed,
    other => PresentMode::Other(other.as_raw()),
  }
}

pub(crate) fn extent_to_vk(e: Extent2D) -> vk::Extent2D {
  vk::Extent2D { width: e.width, height: e.height }
}

pub(crate) fn extent_from_vk(e: vk::Extent2D) -> Extent2D {
  Extent2D::new(e.width, e.height)
}

pub(crate) fn capabilities_from_vk(caps: &vk::SurfaceCapabilitiesKHR) -> SurfaceCapabilities {
  SurfaceCapabilities {
    current_extent: extent_from_vk(caps.current_extent),
    min_image_extent: extent_from_vk(caps.min_image_extent),
    max_image_extent: extent_from_vk(caps.max_image_extent),
    min_image_count: caps.min_image_count,
    max_image_count: caps.max_image_count,
  }
}

pub(crate) fn queue_family_from_vk(q: &vk::QueueFamilyProperties) -> QueueFamily {
  let pairs = [
    (vk::QueueFlags::GRAPHICS, QueueFlags::GRAPHICS),
    (vk::QueueFlags::COMPUTE, QueueFlags::COMPUTE),
    (vk::QueueFlags::TRANSFER, QueueFlags::TRANSFER),
    (vk::QueueFlags::SPARSE_BINDING, QueueFlags::SPARSE_BINDING),
  ];
  let flags = pairs
    .iter()
    .filter(|(vk_bit, _)| q.queue_flags.contains(*vk_bit))
    .fold(QueueFlags::empty(), |acc, (_, bit)| acc | *bit);
  QueueFamily { flags, queue_count: q.queue_count }
}

pub(crate) fn device_type_from_vk(t: vk::PhysicalDeviceType) -> DeviceType {
  match t {
    vk::PhysicalDeviceType::DISCRETE_GPU => DeviceType::DiscreteGpu,
    vk::PhysicalDeviceType::INTEGRATED_GPU => DeviceType::IntegratedGpu,
    vk::PhysicalDeviceType::VIRTUAL_GPU => DeviceType::VirtualGpu,
    vk::PhysicalDeviceType::CPU => DeviceType::Cpu,
    _ => DeviceType::Other,
  }
}

pub(crate) fn sharing_to_vk(s: SharingMode) -> vk::SharingMode {
  match s {
    SharingMode::Exclusive => vk::SharingMode::EXCLUSIVE,
    SharingMode::Concurrent => vk::SharingMode::CONCURRENT,
  }
}
