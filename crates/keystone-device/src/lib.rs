// SPDX-License-Identifier: CEPL-1.0
//! Device bootstrap core: capability negotiation and the ordered
//! instance → surface → device → swapchain → views → render pass → framebuffers
//! chain, independent of any particular graphics backend.
#![deny(unsafe_op_in_unsafe_fn)]

pub mod caps;
mod chain;
mod context;
mod driver;
mod error;
pub mod policy;

pub use caps::{
    ColorSpace, DeviceType, Extent2D, Format, PhysicalDeviceInfo, PresentMode, QueueFamily,
    QueueFamilyIndices, QueueFlags, SharingMode, SurfaceCapabilities, SurfaceFormat,
};
pub use chain::Stage;
pub use context::{ContextConfig, DeviceContext};
pub use driver::{
    DeviceDesc, Driver, DriverError, Handle, InstanceDesc, SwapchainDesc, WindowSurface,
};
pub use error::{ConfigurationError, InitError};
pub use policy::DevicePolicy;
