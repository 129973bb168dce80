// SPDX-License-Identifier: CEPL-1.0
use std::fmt;

use thiserror::Error;

use crate::caps::{
    Extent2D, Format, PhysicalDeviceInfo, PresentMode, QueueFamily, SharingMode,
    SurfaceCapabilities, SurfaceFormat,
};

/// Opaque driver handle. Copies alias the same object; the chain decides who destroys it.
pub trait Handle: Copy + Eq + fmt::Debug {}

impl<T: Copy + Eq + fmt::Debug> Handle for T {}

/// The window side of surface creation.
pub trait WindowSurface {
    /// Live framebuffer size in pixels.
    fn framebuffer_size(&self) -> Extent2D;
}

#[derive(Debug, Error)]
#[error("{call} failed: {reason}")]
pub struct DriverError {
    pub call: &'static str,
    pub reason: String,
}

impl DriverError {
    pub fn new(call: &'static str, reason: impl fmt::Display) -> Self {
        Self {
            call,
            reason: reason.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstanceDesc {
    pub app_name: String,
    pub validation: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceDesc {
    /// Unique queue family indices; one queue is created from each.
    pub queue_families: Vec<u32>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SwapchainDesc {
    pub surface_format: SurfaceFormat,
    pub present_mode: PresentMode,
    pub extent: Extent2D,
    pub image_count: u32,
    pub sharing: SharingMode,
    /// Families sharing the images. Empty for [`SharingMode::Exclusive`].
    pub queue_families: Vec<u32>,
}

/// Graphics runtime as seen by the resource chain.
///
/// The query methods are pure reads. Every `create_*` hands back a handle the
/// caller owns until it passes it to the matching `destroy_*`; the driver
/// itself never destroys anything on its own.
pub trait Driver {
    type Window: WindowSurface + ?Sized;

    type Instance: Handle;
    type Surface: Handle;
    type PhysicalDevice: Handle;
    type Device: Handle;
    type Queue: Handle;
    type Swapchain: Handle;
    type Image: Handle;
    type ImageView: Handle;
    type RenderPass: Handle;
    type Framebuffer: Handle;

    fn enumerate_physical_devices(
        &self,
        instance: Self::Instance,
    ) -> Result<Vec<Self::PhysicalDevice>, DriverError>;

    fn physical_device_info(
        &self,
        instance: Self::Instance,
        physical: Self::PhysicalDevice,
    ) -> Result<PhysicalDeviceInfo, DriverError>;

    fn queue_families(
        &self,
        instance: Self::Instance,
        physical: Self::PhysicalDevice,
    ) -> Result<Vec<QueueFamily>, DriverError>;

    fn surface_support(
        &self,
        physical: Self::PhysicalDevice,
        family: u32,
        surface: Self::Surface,
    ) -> Result<bool, DriverError>;

    fn surface_formats(
        &self,
        physical: Self::PhysicalDevice,
        surface: Self::Surface,
    ) -> Result<Vec<SurfaceFormat>, DriverError>;

    fn present_modes(
        &self,
        physical: Self::PhysicalDevice,
        surface: Self::Surface,
    ) -> Result<Vec<PresentMode>, DriverError>;

    fn surface_capabilities(
        &self,
        physical: Self::PhysicalDevice,
        surface: Self::Surface,
    ) -> Result<SurfaceCapabilities, DriverError>;

    fn create_instance(
        &mut self,
        window: &Self::Window,
        desc: &InstanceDesc,
    ) -> Result<Self::Instance, DriverError>;

    fn create_surface(
        &mut self,
        instance: Self::Instance,
        window: &Self::Window,
    ) -> Result<Self::Surface, DriverError>;

    fn create_device(
        &mut self,
        instance: Self::Instance,
        physical: Self::PhysicalDevice,
        desc: &DeviceDesc,
    ) -> Result<Self::Device, DriverError>;

    fn device_queue(&self, device: Self::Device, family: u32) -> Result<Self::Queue, DriverError>;

    fn create_swapchain(
        &mut self,
        device: Self::Device,
        surface: Self::Surface,
        desc: &SwapchainDesc,
    ) -> Result<Self::Swapchain, DriverError>;

    /// Images owned by `swapchain`; they go away with it.
    fn swapchain_images(
        &self,
        device: Self::Device,
        swapchain: Self::Swapchain,
    ) -> Result<Vec<Self::Image>, DriverError>;

    fn create_image_view(
        &mut self,
        device: Self::Device,
        image: Self::Image,
        format: Format,
    ) -> Result<Self::ImageView, DriverError>;

    fn create_render_pass(
        &mut self,
        device: Self::Device,
        format: Format,
    ) -> Result<Self::RenderPass, DriverError>;

    fn create_framebuffer(
        &mut self,
        device: Self::Device,
        render_pass: Self::RenderPass,
        view: Self::ImageView,
        extent: Extent2D,
    ) -> Result<Self::Framebuffer, DriverError>;

    /// Block until `device` has no work in flight. Errors are not actionable here.
    fn wait_idle(&self, device: Self::Device);

    fn destroy_framebuffer(&mut self, device: Self::Device, framebuffer: Self::Framebuffer);
    fn destroy_render_pass(&mut self, device: Self::Device, render_pass: Self::RenderPass);
    fn destroy_image_view(&mut self, device: Self::Device, view: Self::ImageView);
    fn destroy_swapchain(&mut self, device: Self::Device, swapchain: Self::Swapchain);
    fn destroy_device(&mut self, device: Self::Device);
    fn destroy_surface(&mut self, instance: Self::Instance, surface: Self::Surface);
    fn destroy_instance(&mut self, instance: Self::Instance);
}
