// SPDX-License-Identifier: CEPL-1.0
use tracing::{debug, error, info, warn};

use crate::caps::{Extent2D, PresentMode, QueueFamilyIndices, SurfaceFormat};
use crate::chain::{ReleaseStack, Stage};
use crate::driver::{Driver, WindowSurface};
use crate::error::InitError;
use crate::policy::DevicePolicy;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContextConfig {
    pub app_name: String,
    /// Ask the driver for its validation layer and debug messenger.
    pub validation: bool,
    pub device_policy: DevicePolicy,
    pub vsync: bool,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            app_name: "keystone".into(),
            validation: false,
            device_policy: DevicePolicy::First,
            vsync: true,
        }
    }
}

/// Every live handle of one device chain, plus the driver that made them.
///
/// Fields fill in creation order and are only ever set once their stage has
/// succeeded, so a populated field implies all earlier ones are populated.
/// Dropping the context tears the chain down.
pub struct DeviceContext<D: Driver> {
    pub(crate) driver: D,
    pub(crate) config: ContextConfig,
    stage: Stage,
    pub(crate) releases: ReleaseStack<D>,

    pub(crate) instance: Option<D::Instance>,
    pub(crate) surface: Option<D::Surface>,
    pub(crate) physical_device: Option<D::PhysicalDevice>,
    pub(crate) device: Option<D::Device>,
    pub(crate) queue_families: QueueFamilyIndices,
    pub(crate) graphics_queue: Option<D::Queue>,
    pub(crate) present_queue: Option<D::Queue>,
    pub(crate) swapchain: Option<D::Swapchain>,
    pub(crate) surface_format: Option<SurfaceFormat>,
    pub(crate) extent: Option<Extent2D>,
    pub(crate) present_mode: Option<PresentMode>,
    pub(crate) images: Vec<D::Image>,
    pub(crate) image_views: Vec<D::ImageView>,
    pub(crate) render_pass: Option<D::RenderPass>,
    pub(crate) framebuffers: Vec<D::Framebuffer>,
}

impl<D: Driver> DeviceContext<D> {
    /// An empty chain. Nothing is created until [`advance`](Self::advance).
    pub fn new(driver: D, config: ContextConfig) -> Self {
        Self {
            driver,
            config,
            stage: Stage::Empty,
            releases: ReleaseStack::new(),
            instance: None,
            surface: None,
            physical_device: None,
            device: None,
            queue_families: QueueFamilyIndices::default(),
            graphics_queue: None,
            present_queue: None,
            swapchain: None,
            surface_format: None,
            extent: None,
            present_mode: None,
            images: Vec::new(),
            image_views: Vec::new(),
            render_pass: None,
            framebuffers: Vec::new(),
        }
    }

    /// Run the whole chain. On failure everything already created is destroyed
    /// before the error is returned.
    pub fn initialize(driver: D, window: &D::Window, config: ContextConfig) -> Result<Self, InitError> {
        let mut ctx = Self::new(driver, config);
        while ctx.stage < Stage::FramebuffersReady {
            if let Err(err) = ctx.advance(window) {
                error!("device init failed at {}: {err}", err.stage());
                ctx.shutdown();
                return Err(err);
            }
        }
        info!("device chain ready ({} framebuffers)", ctx.framebuffers.len());
        Ok(ctx)
    }

    /// Perform exactly one creation step.
    ///
    /// A failing step leaves the context in the stage it was in before the
    /// call, with anything the step half-built already destroyed.
    pub fn advance(&mut self, window: &D::Window) -> Result<Stage, InitError> {
        let Some(target) = self.stage.next() else {
            return Ok(self.stage);
        };
        let step = match target {
            Stage::Empty => Ok(()),
            Stage::InstanceReady => self.create_instance(window),
            Stage::SurfaceReady => self.create_surface(window),
            Stage::DeviceReady => self.create_device(),
            Stage::SwapchainReady => self.create_swapchain(window),
            Stage::ImagesReady => self.create_image_views(),
            Stage::RenderPassReady => self.create_render_pass(),
            Stage::FramebuffersReady => self.create_framebuffers(),
        };
        match step {
            Ok(()) => {
                self.stage = target;
                debug!("stage reached: {target} ({} owned handles)", self.releases.len());
                Ok(target)
            }
            Err(err) => {
                self.releases.unwind_above(self.stage, &mut self.driver);
                Err(err)
            }
        }
    }

    /// Tear down everything this context created, newest first. Calling it
    /// again is a no-op.
    pub fn shutdown(&mut self) {
        if self.stage == Stage::Empty && self.releases.is_empty() {
            return;
        }
        info!("shutting down device chain from {:?}", self.stage);
        self.rewind(Stage::Empty);
    }

    /// Recreate the swapchain and everything built on it, e.g. after a resize.
    ///
    /// A zero-sized window skips the rebuild and leaves the chain as it is.
    pub fn rebuild_swapchain(&mut self, window: &D::Window) -> Result<(), InitError> {
        if self.stage < Stage::DeviceReady {
            warn!("swapchain rebuild requested before the device exists ({:?})", self.stage);
            return Ok(());
        }
        let size = window.framebuffer_size();
        if size.is_empty() {
            debug!("framebuffer is {size}, skipping swapchain rebuild");
            return Ok(());
        }
        self.rewind(Stage::DeviceReady);
        while self.stage < Stage::FramebuffersReady {
            self.advance(window)?;
        }
        info!("swapchain rebuilt for {size}");
        Ok(())
    }

    fn rewind(&mut self, keep: Stage) {
        let released = self.releases.unwind_above(keep, &mut self.driver);
        debug!("released {released} handles down to {keep:?}");
        self.clear_above(keep);
        self.stage = self.stage.min(keep);
    }

    fn clear_above(&mut self, keep: Stage) {
        if keep < Stage::FramebuffersReady {
            self.framebuffers.clear();
        }
        if keep < Stage::RenderPassReady {
            self.render_pass = None;
        }
        if keep < Stage::ImagesReady {
            self.images.clear();
            self.image_views.clear();
        }
        if keep < Stage::SwapchainReady {
            self.swapchain = None;
            self.surface_format = None;
            self.extent = None;
            self.present_mode = None;
        }
        if keep < Stage::DeviceReady {
            self.physical_device = None;
            self.device = None;
            self.queue_families = QueueFamilyIndices::default();
            self.graphics_queue = None;
            self.present_queue = None;
        }
        if keep < Stage::SurfaceReady {
            self.surface = None;
        }
        if keep < Stage::InstanceReady {
            self.instance = None;
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn instance(&self) -> Option<D::Instance> {
        self.instance
    }

    pub fn surface(&self) -> Option<D::Surface> {
        self.surface
    }

    pub fn physical_device(&self) -> Option<D::PhysicalDevice> {
        self.physical_device
    }

    pub fn device(&self) -> Option<D::Device> {
        self.device
    }

    pub fn queue_families(&self) -> QueueFamilyIndices {
        self.queue_families
    }

    pub fn graphics_queue(&self) -> Option<D::Queue> {
        self.graphics_queue
    }

    pub fn present_queue(&self) -> Option<D::Queue> {
        self.present_queue
    }

    pub fn swapchain(&self) -> Option<D::Swapchain> {
        self.swapchain
    }

    pub fn surface_format(&self) -> Option<SurfaceFormat> {
        self.surface_format
    }

    pub fn extent(&self) -> Option<Extent2D> {
        self.extent
    }

    pub fn present_mode(&self) -> Option<PresentMode> {
        self.present_mode
    }

    /// Owned by the swapchain, never destroyed directly.
    pub fn images(&self) -> &[D::Image] {
        &self.images
    }

    pub fn image_views(&self) -> &[D::ImageView] {
        &self.image_views
    }

    pub fn render_pass(&self) -> Option<D::RenderPass> {
        self.render_pass
    }

    pub fn framebuffers(&self) -> &[D::Framebuffer] {
        &self.framebuffers
    }
}

impl<D: Driver> Drop for DeviceContext<D> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
