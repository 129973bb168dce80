// SPDX-License-Identifier: CEPL-1.0
//! Recording in-memory driver for exercising the chain without a GPU.
#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::rc::Rc;

use keystone_device::{
    ColorSpace, DeviceDesc, DeviceType, Driver, DriverError, Extent2D, Format, InstanceDesc,
    PhysicalDeviceInfo, PresentMode, QueueFamily, QueueFlags, SurfaceCapabilities, SurfaceFormat,
    SwapchainDesc, WindowSurface,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Kind {
    Instance,
    Surface,
    Device,
    Swapchain,
    ImageView,
    RenderPass,
    Framebuffer,
}

impl Kind {
    pub const CHAIN: [Kind; 7] = [
        Kind::Instance,
        Kind::Surface,
        Kind::Device,
        Kind::Swapchain,
        Kind::ImageView,
        Kind::RenderPass,
        Kind::Framebuffer,
    ];

    /// Kinds that must already be gone before `self` may be destroyed.
    fn dependents(self) -> &'static [Kind] {
        match self {
            Kind::Instance => &[Kind::Surface, Kind::Device],
            Kind::Surface => &[Kind::Swapchain],
            Kind::Device => &[Kind::Swapchain, Kind::ImageView, Kind::RenderPass, Kind::Framebuffer],
            Kind::Swapchain => &[Kind::ImageView],
            Kind::ImageView => &[Kind::Framebuffer],
            Kind::RenderPass => &[Kind::Framebuffer],
            Kind::Framebuffer => &[],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    Create(Kind, u64),
    Destroy(Kind, u64),
    WaitIdle(u64),
}

#[derive(Debug, Default)]
pub struct Journal {
    pub events: Vec<Event>,
    live: BTreeSet<(Kind, u64)>,
    pub device_descs: Vec<DeviceDesc>,
    pub swapchain_descs: Vec<SwapchainDesc>,
    pub instance_descs: Vec<InstanceDesc>,
}

impl Journal {
    pub fn created(&self) -> Vec<(Kind, u64)> {
        self.events
            .iter()
            .filter_map(|e| match *e {
                Event::Create(k, id) => Some((k, id)),
                _ => None,
            })
            .collect()
    }

    pub fn destroyed(&self) -> Vec<(Kind, u64)> {
        self.events
            .iter()
            .filter_map(|e| match *e {
                Event::Destroy(k, id) => Some((k, id)),
                _ => None,
            })
            .collect()
    }

    pub fn created_count(&self, kind: Kind) -> usize {
        self.created().iter().filter(|(k, _)| *k == kind).count()
    }

    pub fn live(&self) -> usize {
        self.live.len()
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
    }
}

#[derive(Clone, Debug)]
pub struct Hardware {
    pub devices: Vec<PhysicalDeviceInfo>,
    pub families: Vec<QueueFamily>,
    pub presentable: Vec<bool>,
    pub formats: Vec<SurfaceFormat>,
    pub modes: Vec<PresentMode>,
    pub caps: SurfaceCapabilities,
}

impl Default for Hardware {
    fn default() -> Self {
        Self {
            devices: vec![PhysicalDeviceInfo {
                name: "Fake GPU".into(),
                device_type: DeviceType::DiscreteGpu,
            }],
            families: vec![QueueFamily {
                flags: QueueFlags::GRAPHICS | QueueFlags::COMPUTE | QueueFlags::TRANSFER,
                queue_count: 4,
            }],
            presentable: vec![true],
            formats: vec![
                SurfaceFormat::new(Format::B8G8R8A8Srgb, ColorSpace::SrgbNonlinear),
                SurfaceFormat::new(Format::B8G8R8A8Unorm, ColorSpace::SrgbNonlinear),
            ],
            modes: vec![PresentMode::Fifo, PresentMode::Mailbox],
            caps: SurfaceCapabilities {
                current_extent: Extent2D::new(800, 600),
                min_image_extent: Extent2D::new(1, 1),
                max_image_extent: Extent2D::new(4096, 4096),
                min_image_count: 2,
                max_image_count: 0,
            },
        }
    }
}

pub struct FakeWindow {
    size: Cell<Extent2D>,
}

impl FakeWindow {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: Cell::new(Extent2D::new(width, height)),
        }
    }

    pub fn resize(&self, width: u32, height: u32) {
        self.size.set(Extent2D::new(width, height));
    }
}

impl WindowSurface for FakeWindow {
    fn framebuffer_size(&self) -> Extent2D {
        self.size.get()
    }
}

pub struct FakeDriver {
    pub hardware: Hardware,
    journal: Rc<RefCell<Journal>>,
    next_id: u64,
    /// Decline the n-th (0-based) creation of this kind.
    fail_on: Option<(Kind, usize)>,
}

impl FakeDriver {
    pub fn new(hardware: Hardware) -> (Self, Rc<RefCell<Journal>>) {
        let journal = Rc::new(RefCell::new(Journal::default()));
        let driver = Self {
            hardware,
            journal: Rc::clone(&journal),
            next_id: 1,
            fail_on: None,
        };
        (driver, journal)
    }

    pub fn failing(hardware: Hardware, kind: Kind, nth: usize) -> (Self, Rc<RefCell<Journal>>) {
        let (mut driver, journal) = Self::new(hardware);
        driver.fail_on = Some((kind, nth));
        (driver, journal)
    }

    fn create(&mut self, kind: Kind, call: &'static str) -> Result<u64, DriverError> {
        let mut journal = self.journal.borrow_mut();
        if let Some((fail_kind, nth)) = self.fail_on {
            if fail_kind == kind && journal.created_count(kind) == nth {
                return Err(DriverError::new(call, "ERROR_INITIALIZATION_FAILED"));
            }
        }
        let id = self.next_id;
        self.next_id += 1;
        journal.events.push(Event::Create(kind, id));
        journal.live.insert((kind, id));
        Ok(id)
    }

    fn destroy(&mut self, kind: Kind, id: u64) {
        let mut journal = self.journal.borrow_mut();
        assert!(
            journal.live.remove(&(kind, id)),
            "{kind:?} {id} destroyed while not live"
        );
        for dependent in kind.dependents() {
            assert!(
                !journal.live.iter().any(|(k, _)| k == dependent),
                "{kind:?} {id} destroyed while a {dependent:?} is still live"
            );
        }
        journal.events.push(Event::Destroy(kind, id));
    }

    fn assert_live(&self, kind: Kind, id: u64) {
        assert!(
            self.journal.borrow().live.contains(&(kind, id)),
            "{kind:?} {id} used while not live"
        );
    }
}

impl Driver for FakeDriver {
    type Window = FakeWindow;

    type Instance = u64;
    type Surface = u64;
    type PhysicalDevice = u64;
    type Device = u64;
    type Queue = (u64, u32);
    type Swapchain = u64;
    type Image = (u64, u32);
    type ImageView = u64;
    type RenderPass = u64;
    type Framebuffer = u64;

    fn enumerate_physical_devices(&self, instance: u64) -> Result<Vec<u64>, DriverError> {
        self.assert_live(Kind::Instance, instance);
        Ok((0..self.hardware.devices.len() as u64).collect())
    }

    fn physical_device_info(&self, _instance: u64, physical: u64) -> Result<PhysicalDeviceInfo, DriverError> {
        Ok(self.hardware.devices[physical as usize].clone())
    }

    fn queue_families(&self, _instance: u64, _physical: u64) -> Result<Vec<QueueFamily>, DriverError> {
        Ok(self.hardware.families.clone())
    }

    fn surface_support(&self, _physical: u64, family: u32, surface: u64) -> Result<bool, DriverError> {
        self.assert_live(Kind::Surface, surface);
        Ok(self.hardware.presentable.get(family as usize).copied().unwrap_or(false))
    }

    fn surface_formats(&self, _physical: u64, _surface: u64) -> Result<Vec<SurfaceFormat>, DriverError> {
        Ok(self.hardware.formats.clone())
    }

    fn present_modes(&self, _physical: u64, _surface: u64) -> Result<Vec<PresentMode>, DriverError> {
        Ok(self.hardware.modes.clone())
    }

    fn surface_capabilities(&self, _physical: u64, _surface: u64) -> Result<SurfaceCapabilities, DriverError> {
        Ok(self.hardware.caps)
    }

    fn create_instance(&mut self, _window: &FakeWindow, desc: &InstanceDesc) -> Result<u64, DriverError> {
        self.journal.borrow_mut().instance_descs.push(desc.clone());
        self.create(Kind::Instance, "create_instance")
    }

    fn create_surface(&mut self, instance: u64, _window: &FakeWindow) -> Result<u64, DriverError> {
        self.assert_live(Kind::Instance, instance);
        self.create(Kind::Surface, "create_surface")
    }

    fn create_device(&mut self, instance: u64, _physical: u64, desc: &DeviceDesc) -> Result<u64, DriverError> {
        self.assert_live(Kind::Instance, instance);
        self.journal.borrow_mut().device_descs.push(desc.clone());
        self.create(Kind::Device, "create_device")
    }

    fn device_queue(&self, device: u64, family: u32) -> Result<(u64, u32), DriverError> {
        self.assert_live(Kind::Device, device);
        Ok((device, family))
    }

    fn create_swapchain(&mut self, device: u64, surface: u64, desc: &SwapchainDesc) -> Result<u64, DriverError> {
        self.assert_live(Kind::Device, device);
        self.assert_live(Kind::Surface, surface);
        self.journal.borrow_mut().swapchain_descs.push(desc.clone());
        self.create(Kind::Swapchain, "create_swapchain")
    }

    fn swapchain_images(&self, device: u64, swapchain: u64) -> Result<Vec<(u64, u32)>, DriverError> {
        self.assert_live(Kind::Device, device);
        self.assert_live(Kind::Swapchain, swapchain);
        let count = self
            .journal
            .borrow()
            .swapchain_descs
            .last()
            .map_or(0, |d| d.image_count);
        Ok((0..count).map(|i| (swapchain, i)).collect())
    }

    fn create_image_view(&mut self, device: u64, image: (u64, u32), _format: Format) -> Result<u64, DriverError> {
        self.assert_live(Kind::Device, device);
        self.assert_live(Kind::Swapchain, image.0);
        self.create(Kind::ImageView, "create_image_view")
    }

    fn create_render_pass(&mut self, device: u64, _format: Format) -> Result<u64, DriverError> {
        self.assert_live(Kind::Device, device);
        self.create(Kind::RenderPass, "create_render_pass")
    }

    fn create_framebuffer(
        &mut self,
        device: u64,
        render_pass: u64,
        view: u64,
        _extent: Extent2D,
    ) -> Result<u64, DriverError> {
        self.assert_live(Kind::Device, device);
        self.assert_live(Kind::RenderPass, render_pass);
        self.assert_live(Kind::ImageView, view);
        self.create(Kind::Framebuffer, "create_framebuffer")
    }

    fn wait_idle(&self, device: u64) {
        self.assert_live(Kind::Device, device);
        self.journal.borrow_mut().events.push(Event::WaitIdle(device));
    }

    fn destroy_framebuffer(&mut self, _device: u64, framebuffer: u64) {
        self.destroy(Kind::Framebuffer, framebuffer);
    }

    fn destroy_render_pass(&mut self, _device: u64, render_pass: u64) {
        self.destroy(Kind::RenderPass, render_pass);
    }

    fn destroy_image_view(&mut self, _device: u64, view: u64) {
        self.destroy(Kind::ImageView, view);
    }

    fn destroy_swapchain(&mut self, _device: u64, swapchain: u64) {
        self.destroy(Kind::Swapchain, swapchain);
    }

    fn destroy_device(&mut self, device: u64) {
        self.destroy(Kind::Device, device);
    }

    fn destroy_surface(&mut self, instance: u64, surface: u64) {
        self.assert_live(Kind::Instance, instance);
        self.destroy(Kind::Surface, surface);
    }

    fn destroy_instance(&mut self, instance: u64) {
        self.destroy(Kind::Instance, instance);
    }
}
