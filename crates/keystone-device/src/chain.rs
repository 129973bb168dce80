// SPDX-License-Identifier: CEPL-1.0
//! Creation steps of the device chain and the release stack that undoes them.

use std::fmt;

use tracing::{debug, info, warn};

use crate::context::DeviceContext;
use crate::driver::{DeviceDesc, Driver, DriverError, InstanceDesc, SwapchainDesc, WindowSurface};
use crate::error::{ConfigurationError, InitError};
use crate::policy;

/// How far the chain has come. Each state includes every state before it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Empty,
    InstanceReady,
    SurfaceReady,
    /// Physical device picked, logical device and queues live.
    DeviceReady,
    SwapchainReady,
    /// Swapchain images fetched, one view per image.
    ImagesReady,
    RenderPassReady,
    FramebuffersReady,
}

impl Stage {
    pub const ALL: [Stage; 8] = [
        Stage::Empty,
        Stage::InstanceReady,
        Stage::SurfaceReady,
        Stage::DeviceReady,
        Stage::SwapchainReady,
        Stage::ImagesReady,
        Stage::RenderPassReady,
        Stage::FramebuffersReady,
    ];

    pub fn next(self) -> Option<Stage> {
        Self::ALL.get(self as usize + 1).copied()
    }

    pub fn previous(self) -> Option<Stage> {
        (self as usize).checked_sub(1).map(|i| Self::ALL[i])
    }

    /// What reaching this stage creates.
    pub fn name(self) -> &'static str {
        match self {
            Stage::Empty => "nothing",
            Stage::InstanceReady => "instance",
            Stage::SurfaceReady => "surface",
            Stage::DeviceReady => "logical device",
            Stage::SwapchainReady => "swapchain",
            Stage::ImagesReady => "image views",
            Stage::RenderPassReady => "render pass",
            Stage::FramebuffersReady => "framebuffers",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An owned handle together with whatever its destroy call needs.
enum Release<D: Driver> {
    Instance(D::Instance),
    Surface {
        instance: D::Instance,
        surface: D::Surface,
    },
    Device(D::Device),
    Swapchain {
        device: D::Device,
        swapchain: D::Swapchain,
    },
    ImageView {
        device: D::Device,
        view: D::ImageView,
    },
    RenderPass {
        device: D::Device,
        render_pass: D::RenderPass,
    },
    Framebuffer {
        device: D::Device,
        framebuffer: D::Framebuffer,
    },
}

impl<D: Driver> Release<D> {
    fn stage(&self) -> Stage {
        match self {
            Release::Instance(_) => Stage::InstanceReady,
            Release::Surface { .. } => Stage::SurfaceReady,
            Release::Device(_) => Stage::DeviceReady,
            Release::Swapchain { .. } => Stage::SwapchainReady,
            Release::ImageView { .. } => Stage::ImagesReady,
            Release::RenderPass { .. } => Stage::RenderPassReady,
            Release::Framebuffer { .. } => Stage::FramebuffersReady,
        }
    }

    fn run(self, driver: &mut D) {
        match self {
            Release::Framebuffer { device, framebuffer } => {
                debug!("destroy framebuffer {framebuffer:?}");
                driver.destroy_framebuffer(device, framebuffer);
            }
            Release::RenderPass { device, render_pass } => {
                debug!("destroy render pass {render_pass:?}");
                driver.destroy_render_pass(device, render_pass);
            }
            Release::ImageView { device, view } => {
                debug!("destroy image view {view:?}");
                driver.destroy_image_view(device, view);
            }
            Release::Swapchain { device, swapchain } => {
                debug!("destroy swapchain {swapchain:?}");
                driver.destroy_swapchain(device, swapchain);
            }
            Release::Device(device) => {
                debug!("destroy device {device:?}");
                driver.destroy_device(device);
            }
            Release::Surface { instance, surface } => {
                debug!("destroy surface {surface:?}");
                driver.destroy_surface(instance, surface);
            }
            Release::Instance(instance) => {
                debug!("destroy instance {instance:?}");
                driver.destroy_instance(instance);
            }
        }
    }
}

/// Every owned handle, in creation order. Popping it is the teardown order.
pub(crate) struct ReleaseStack<D: Driver> {
    entries: Vec<Release<D>>,
}

impl<D: Driver> ReleaseStack<D> {
    pub(crate) fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn push(&mut self, entry: Release<D>) {
        self.entries.push(entry);
    }

    fn live_device(&self) -> Option<D::Device> {
        self.entries.iter().find_map(|e| match e {
            Release::Device(device) => Some(*device),
            _ => None,
        })
    }

    /// Destroy everything created after `keep`, newest first.
    pub(crate) fn unwind_above(&mut self, keep: Stage, driver: &mut D) -> usize {
        let doomed = self.entries.iter().rev().take_while(|e| e.stage() > keep).count();
        if doomed == 0 {
            return 0;
        }
        if let Some(device) = self.live_device() {
            driver.wait_idle(device);
        }
        for _ in 0..doomed {
            if let Some(entry) = self.entries.pop() {
                entry.run(driver);
            }
        }
        doomed
    }
}

fn missing(stage: Stage, what: &'static str) -> InitError {
    InitError::StageCreation {
        stage,
        source: DriverError::new(what, "prerequisite handle is not live"),
    }
}

impl<D: Driver> DeviceContext<D> {
    pub(crate) fn create_instance(&mut self, window: &D::Window) -> Result<(), InitError> {
        let stage = Stage::InstanceReady;
        let desc = InstanceDesc {
            app_name: self.config.app_name.clone(),
            validation: self.config.validation,
        };
        let instance = self
            .driver
            .create_instance(window, &desc)
            .map_err(InitError::stage_creation(stage))?;
        self.releases.push(Release::Instance(instance));
        self.instance = Some(instance);
        Ok(())
    }

    pub(crate) fn create_surface(&mut self, window: &D::Window) -> Result<(), InitError> {
        let stage = Stage::SurfaceReady;
        let instance = self.instance.ok_or_else(|| missing(stage, "instance"))?;
        let surface = self
            .driver
            .create_surface(instance, window)
            .map_err(InitError::stage_creation(stage))?;
        self.releases.push(Release::Surface { instance, surface });
        self.surface = Some(surface);
        Ok(())
    }

    pub(crate) fn create_device(&mut self) -> Result<(), InitError> {
        let stage = Stage::DeviceReady;
        let on_err = InitError::stage_creation;
        let instance = self.instance.ok_or_else(|| missing(stage, "instance"))?;
        let surface = self.surface.ok_or_else(|| missing(stage, "surface"))?;

        let physicals = self
            .driver
            .enumerate_physical_devices(instance)
            .map_err(on_err(stage))?;
        let infos = physicals
            .iter()
            .map(|&p| self.driver.physical_device_info(instance, p))
            .collect::<Result<Vec<_>, _>>()
            .map_err(on_err(stage))?;
        let index = policy::select_physical_device(self.config.device_policy, &infos)
            .ok_or(InitError::configuration(stage, ConfigurationError::NoPhysicalDevice))?;
        let physical = physicals[index];
        info!(
            "selected physical device [{index}] - {} ({:?})",
            infos[index].name, infos[index].device_type
        );

        let families = self
            .driver
            .queue_families(instance, physical)
            .map_err(on_err(stage))?;
        let presentable: Vec<bool> = (0..families.len() as u32)
            .map(|i| match self.driver.surface_support(physical, i, surface) {
                Ok(supported) => supported,
                Err(e) => {
                    warn!("surface support query for family {i}: {e}");
                    false
                }
            })
            .collect();
        let picked = policy::select_queue_families(&families, &presentable);
        let graphics = picked
            .graphics
            .ok_or(InitError::configuration(stage, ConfigurationError::NoGraphicsQueue))?;
        let present = picked
            .present
            .ok_or(InitError::configuration(stage, ConfigurationError::NoPresentQueue))?;
        info!("queue families: graphics={graphics} present={present}");

        let desc = DeviceDesc {
            queue_families: policy::unique_families(graphics, present),
        };
        let device = self
            .driver
            .create_device(instance, physical, &desc)
            .map_err(on_err(stage))?;
        self.releases.push(Release::Device(device));

        let graphics_queue = self.driver.device_queue(device, graphics).map_err(on_err(stage))?;
        let present_queue = self.driver.device_queue(device, present).map_err(on_err(stage))?;

        self.physical_device = Some(physical);
        self.device = Some(device);
        self.queue_families = picked;
        self.graphics_queue = Some(graphics_queue);
        self.present_queue = Some(present_queue);
        Ok(())
    }

    pub(crate) fn create_swapchain(&mut self, window: &D::Window) -> Result<(), InitError> {
        let stage = Stage::SwapchainReady;
        let on_err = InitError::stage_creation;
        let surface = self.surface.ok_or_else(|| missing(stage, "surface"))?;
        let physical = self.physical_device.ok_or_else(|| missing(stage, "physical device"))?;
        let device = self.device.ok_or_else(|| missing(stage, "device"))?;
        let (Some(graphics), Some(present)) =
            (self.queue_families.graphics, self.queue_families.present)
        else {
            return Err(missing(stage, "queue families"));
        };

        let caps = self
            .driver
            .surface_capabilities(physical, surface)
            .map_err(on_err(stage))?;
        let formats = self
            .driver
            .surface_formats(physical, surface)
            .map_err(on_err(stage))?;
        let modes = self
            .driver
            .present_modes(physical, surface)
            .map_err(on_err(stage))?;

        let surface_format = policy::choose_surface_format(&formats);
        let present_mode = policy::choose_present_mode(&modes, self.config.vsync);
        let extent = policy::resolve_extent(&caps, window.framebuffer_size());
        let image_count = policy::choose_image_count(&caps);
        let (sharing, queue_families) = policy::image_sharing(graphics, present);

        let desc = SwapchainDesc {
            surface_format,
            present_mode,
            extent,
            image_count,
            sharing,
            queue_families,
        };
        let swapchain = self
            .driver
            .create_swapchain(device, surface, &desc)
            .map_err(on_err(stage))?;
        self.releases.push(Release::Swapchain { device, swapchain });

        info!(
            "swapchain ready ({extent}, {:?} / {:?}, {present_mode:?}, images min={} -> requested={image_count})",
            surface_format.format, surface_format.color_space, caps.min_image_count
        );
        self.swapchain = Some(swapchain);
        self.surface_format = Some(surface_format);
        self.extent = Some(extent);
        self.present_mode = Some(present_mode);
        Ok(())
    }

    pub(crate) fn create_image_views(&mut self) -> Result<(), InitError> {
        let stage = Stage::ImagesReady;
        let on_err = InitError::stage_creation;
        let device = self.device.ok_or_else(|| missing(stage, "device"))?;
        let swapchain = self.swapchain.ok_or_else(|| missing(stage, "swapchain"))?;
        let format = self
            .surface_format
            .ok_or_else(|| missing(stage, "surface format"))?
            .format;

        let images = self
            .driver
            .swapchain_images(device, swapchain)
            .map_err(on_err(stage))?;
        let mut views = Vec::with_capacity(images.len());
        for &image in &images {
            let view = self
                .driver
                .create_image_view(device, image, format)
                .map_err(on_err(stage))?;
            self.releases.push(Release::ImageView { device, view });
            views.push(view);
        }

        debug!("{} swapchain images, {} views", images.len(), views.len());
        self.images = images;
        self.image_views = views;
        Ok(())
    }

    pub(crate) fn create_render_pass(&mut self) -> Result<(), InitError> {
        let stage = Stage::RenderPassReady;
        let device = self.device.ok_or_else(|| missing(stage, "device"))?;
        let format = self
            .surface_format
            .ok_or_else(|| missing(stage, "surface format"))?
            .format;

        let render_pass = self
            .driver
            .create_render_pass(device, format)
            .map_err(InitError::stage_creation(stage))?;
        self.releases.push(Release::RenderPass {
            device,
            render_pass,
        });
        self.render_pass = Some(render_pass);
        Ok(())
    }

    pub(crate) fn create_framebuffers(&mut self) -> Result<(), InitError> {
        let stage = Stage::FramebuffersReady;
        let device = self.device.ok_or_else(|| missing(stage, "device"))?;
        let render_pass = self.render_pass.ok_or_else(|| missing(stage, "render pass"))?;
        let extent = self.extent.ok_or_else(|| missing(stage, "extent"))?;

        let mut framebuffers = Vec::with_capacity(self.image_views.len());
        for &view in &self.image_views {
            let framebuffer = self
                .driver
                .create_framebuffer(device, render_pass, view, extent)
                .map_err(InitError::stage_creation(stage))?;
            self.releases.push(Release::Framebuffer {
                device,
                framebuffer,
            });
            framebuffers.push(framebuffer);
        }
        self.framebuffers = framebuffers;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_are_ordered_and_linked() {
        for pair in Stage::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
            assert_eq!(pair[0].next(), Some(pair[1]));
            assert_eq!(pair[1].previous(), Some(pair[0]));
        }
        assert_eq!(Stage::Empty.previous(), None);
        assert_eq!(Stage::FramebuffersReady.next(), None);
    }

    #[test]
    fn stage_display_names_what_it_creates() {
        assert_eq!(Stage::SwapchainReady.to_string(), "swapchain");
        assert_eq!(Stage::ImagesReady.to_string(), "image views");
    }
}
