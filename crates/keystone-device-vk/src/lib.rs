// SPDX-License-Identifier: CEPL-1.0
use std::ffi::{c_char, CString};

use tracing::{debug, info, warn};

use raw_window_handle::{HasDisplayHandle, HasWindowHandle, RawDisplayHandle, RawWindowHandle};
use keystone_device::{
  DeviceDesc, Driver, DriverError, Extent2D, Format, InstanceDesc, PhysicalDeviceInfo, PresentMode,
  QueueFamily, SurfaceCapabilities, SurfaceFormat, SwapchainDesc, WindowSurface,
};

use ash::{vk, Entry, Instance};
use ash::khr::{surface, swapchain};

mod convert;
mod debug;

use convert::*;
use debug::{validation_available, DebugMessenger, VALIDATION_LAYER};

/// Anything that can back a Vulkan surface: raw handles plus a live size.
pub trait PresentTarget: HasWindowHandle + HasDisplayHandle + WindowSurface {}

impl<T: HasWindowHandle + HasDisplayHandle + WindowSurface + ?Sized> PresentTarget for T {}

fn raw_handles(window: &dyn PresentTarget) -> Result<(RawDisplayHandle, RawWindowHandle), DriverError> {
  let dh = window.display_handle().map_err(|e| DriverError::new("display_handle", e))?.as_raw();
  let wh = window.window_handle().map_err(|e| DriverError::new("window_handle", e))?.as_raw();
  Ok((dh, wh))
}

fn vk_err(call: &'static str) -> impl Fn(vk::Result) -> DriverError {
  move |e| DriverError::new(call, e)
}

/// [`Driver`] over a linked Vulkan loader.
///
/// Holds the function tables (`ash::Instance`, `ash::Device`, extension
/// loaders) for the single instance/device pair it creates; the handles it
/// returns are the raw `vk` ones.
pub struct AshDriver {
  entry: Entry,
  instance: Option<Instance>,
  debug: Option<DebugMessenger>,
  surface_loader: Option<surface::Instance>,

  phys: Option<vk::PhysicalDevice>,
  device: Option<ash::Device>,
  swapchain_loader: Option<swapchain::Device>,
}

impl AshDriver {
  pub fn new() -> Self {
    Self {
      entry: Entry::linked(),
      instance: None,
      debug: None,
      surface_loader: None,
      phys: None,
      device: None,
      swapchain_loader: None,
    }
  }

  fn instance(&self) -> Result<&Instance, DriverError> {
    self.instance.as_ref().ok_or_else(|| DriverError::new("instance", "no live instance"))
  }

  fn surface_loader(&self) -> Result<&surface::Instance, DriverError> {
    self.surface_loader.as_ref().ok_or_else(|| DriverError::new("surface loader", "no live instance"))
  }

  fn device(&self) -> Result<&ash::Device, DriverError> {
    self.device.as_ref().ok_or_else(|| DriverError::new("device", "no live device"))
  }

  fn swapchain_loader(&self) -> Result<&swapchain::Device, DriverError> {
    self.swapchain_loader.as_ref().ok_or_else(|| DriverError::new("swapchain loader", "no live device"))
  }
}

impl Default for AshDriver {
  fn default() -> Self {
    Self::new()
  }
}

impl Driver for AshDriver {
  type Window = dyn PresentTarget;

  type Instance = vk::Instance;
  type Surface = vk::SurfaceKHR;
  type PhysicalDevice = vk::PhysicalDevice;
  type Device = vk::Device;
  type Queue = vk::Queue;
  type Swapchain = vk::SwapchainKHR;
  type Image = vk::Image;
  type ImageView = vk::ImageView;
  type RenderPass = vk::RenderPass;
  type Framebuffer = vk::Framebuffer;

  fn enumerate_physical_devices(&self, _instance: vk::Instance) -> Result<Vec<vk::PhysicalDevice>, DriverError> {
    unsafe { self.instance()?.enumerate_physical_devices() }.map_err(vk_err("vkEnumeratePhysicalDevices"))
  }

  fn physical_device_info(
    &self,
    _instance: vk::Instance,
    phys: vk::PhysicalDevice,
  ) -> Result<PhysicalDeviceInfo, DriverError> {
    let props = unsafe { self.instance()?.get_physical_device_properties(phys) };
    let name = props
      .device_name_as_c_str()
      .map(|s| s.to_string_lossy().into_owned())
      .unwrap_or_else(|_| "<unnamed>".into());
    Ok(PhysicalDeviceInfo { name, device_type: device_type_from_vk(props.device_type) })
  }

  fn queue_families(&self, _instance: vk::Instance, phys: vk::PhysicalDevice) -> Result<Vec<QueueFamily>, DriverError> {
    let qprops = unsafe { self.instance()?.get_physical_device_queue_family_properties(phys) };
    Ok(qprops.iter().map(queue_family_from_vk).collect())
  }

  fn surface_support(&self, phys: vk::PhysicalDevice, family: u32, surface: vk::SurfaceKHR) -> Result<bool, DriverError> {
    unsafe { self.surface_loader()?.get_physical_device_surface_support(phys, family, surface) }
      .map_err(vk_err("vkGetPhysicalDeviceSurfaceSupportKHR"))
  }

  fn surface_formats(&self, phys: vk::PhysicalDevice, surface: vk::SurfaceKHR) -> Result<Vec<SurfaceFormat>, DriverError> {
    let formats = unsafe { self.surface_loader()?.get_physical_device_surface_formats(phys, surface) }
      .map_err(vk_err("vkGetPhysicalDeviceSurfaceFormatsKHR"))?;
    Ok(formats.into_iter().map(surface_format_from_vk).collect())
  }

  fn present_modes(&self, phys: vk::PhysicalDevice, surface: vk::SurfaceKHR) -> Result<Vec<PresentMode>, DriverError> {
    let modes = unsafe { self.surface_loader()?.get_physical_device_surface_present_modes(phys, surface) }
      .map_err(vk_err("vkGetPhysicalDeviceSurfacePresentModesKHR"))?;
    Ok(modes.into_iter().map(present_mode_from_vk).collect())
  }

  fn surface_capabilities(
    &self,
    phys: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
  ) -> Result<SurfaceCapabilities, DriverError> {
    let caps = unsafe { self.surface_loader()?.get_physical_device_surface_capabilities(phys, surface) }
      .map_err(vk_err("vkGetPhysicalDeviceSurfaceCapabilitiesKHR"))?;
    Ok(capabilities_from_vk(&caps))
  }

  fn create_instance(&mut self, window: &Self::Window, desc: &InstanceDesc) -> Result<vk::Instance, DriverError> {
    if self.instance.is_some() {
      return Err(DriverError::new("vkCreateInstance", "an instance is already live"));
    }
    let (dh, _) = raw_handles(window)?;

    let app_name = CString::new(desc.app_name.as_str()).map_err(|e| DriverError::new("application name", e))?;
    let engine_name = c"keystone";
    let app_info = vk::ApplicationInfo {
      s_type: vk::StructureType::APPLICATION_INFO,
      p_application_name: app_name.as_ptr(),
      application_version: 0,
      p_engine_name: engine_name.as_ptr(),
      engine_version: 0,
      api_version: vk::API_VERSION_1_0,
      ..Default::default()
    };

    let mut ext_vec: Vec<*const c_char> = ash_window::enumerate_required_extensions(dh)
      .map_err(vk_err("enumerate_required_extensions"))?
      .to_vec();

    let validation = desc.validation && validation_available(&self.entry);
    if desc.validation && !validation {
      warn!("validation requested but {VALIDATION_LAYER:?} is not installed");
    }
    let layers: Vec<*const c_char> = if validation {
      ext_vec.push(ash::ext::debug_utils::NAME.as_ptr());
      vec![VALIDATION_LAYER.as_ptr()]
    } else {
      Vec::new()
    };

    let create_info = vk::InstanceCreateInfo {
      s_type: vk::StructureType::INSTANCE_CREATE_INFO,
      p_application_info: &app_info,
      enabled_extension_count: ext_vec.len() as u32,
      pp_enabled_extension_names: ext_vec.as_ptr(),
      enabled_layer_count: layers.len() as u32,
      pp_enabled_layer_names: layers.as_ptr(),
      ..Default::default()
    };

    let instance = unsafe { self.entry.create_instance(&create_info, None) }.map_err(vk_err("vkCreateInstance"))?;

    if validation {
      match DebugMessenger::new(&self.entry, &instance) {
        Ok(m) => self.debug = Some(m),
        Err(e) => warn!("debug messenger unavailable: {e}"),
      }
    }

    let handle = instance.handle();
    self.surface_loader = Some(surface::Instance::new(&self.entry, &instance));
    self.instance = Some(instance);
    info!("Created Vulkan instance (validation={validation})");
    Ok(handle)
  }

  fn create_surface(&mut self, _instance: vk::Instance, window: &Self::Window) -> Result<vk::SurfaceKHR, DriverError> {
    let (dh, wh) = raw_handles(window)?;
    let instance = self.instance()?;
    unsafe { ash_window::create_surface(&self.entry, instance, dh, wh, None) }.map_err(vk_err("create_surface"))
  }

  fn create_device(
    &mut self,
    _instance: vk::Instance,
    phys: vk::PhysicalDevice,
    desc: &DeviceDesc,
  ) -> Result<vk::Device, DriverError> {
    if self.device.is_some() {
      return Err(DriverError::new("vkCreateDevice", "a device is already live"));
    }
    let priorities = [1.0_f32];
    let qinfos: Vec<vk::DeviceQueueCreateInfo> = desc
      .queue_families
      .iter()
      .map(|&family| vk::DeviceQueueCreateInfo {
        s_type: vk::StructureType::DEVICE_QUEUE_CREATE_INFO,
        queue_family_index: family,
        queue_count: 1,
        p_queue_priorities: priorities.as_ptr(),
        ..Default::default()
      })
      .collect();

    let device_exts = [swapchain::NAME.as_ptr()];
    let dinfo = vk::DeviceCreateInfo {
      s_type: vk::StructureType::DEVICE_CREATE_INFO,
      queue_create_info_count: qinfos.len() as u32,
      p_queue_create_infos: qinfos.as_ptr(),
      enabled_extension_count: device_exts.len() as u32,
      pp_enabled_extension_names: device_exts.as_ptr(),
      ..Default::default()
    };

    let instance = self.instance()?;
    let device = unsafe { instance.create_device(phys, &dinfo, None) }.map_err(vk_err("vkCreateDevice"))?;
    let swapchain_loader = swapchain::Device::new(instance, &device);

    let handle = device.handle();
    self.phys = Some(phys);
    self.swapchain_loader = Some(swapchain_loader);
    self.device = Some(device);
    Ok(handle)
  }

  fn device_queue(&self, _device: vk::Device, family: u32) -> Result<vk::Queue, DriverError> {
    Ok(unsafe { self.device()?.get_device_queue(family, 0) })
  }

  fn create_swapchain(
    &mut self,
    _device: vk::Device,
    surface: vk::SurfaceKHR,
    desc: &SwapchainDesc,
  ) -> Result<vk::SwapchainKHR, DriverError> {
    let phys = self.phys.ok_or_else(|| DriverError::new("vkCreateSwapchainKHR", "no physical device"))?;
    // Only the transform is needed here; the chain already negotiated the rest.
    let caps = unsafe { self.surface_loader()?.get_physical_device_surface_capabilities(phys, surface) }
      .map_err(vk_err("vkGetPhysicalDeviceSurfaceCapabilitiesKHR"))?;

    let swap_info = vk::SwapchainCreateInfoKHR {
      s_type: vk::StructureType::SWAPCHAIN_CREATE_INFO_KHR,
      surface,
      min_image_count: desc.image_count,
      image_format: format_to_vk(desc.surface_format.format),
      image_color_space: color_space_to_vk(desc.surface_format.color_space),
      image_extent: extent_to_vk(desc.extent),
      image_array_layers: 1,
      image_usage: vk::ImageUsageFlags::COLOR_ATTACHMENT,
      image_sharing_mode: sharing_to_vk(desc.sharing),
      queue_family_index_count: desc.queue_families.len() as u32,
      p_queue_family_indices: desc.queue_families.as_ptr(),
      pre_transform: caps.current_transform,
      composite_alpha: vk::CompositeAlphaFlagsKHR::OPAQUE,
      present_mode: present_mode_to_vk(desc.present_mode),
      clipped: vk::TRUE,
      ..Default::default()
    };

    unsafe { self.swapchain_loader()?.create_swapchain(&swap_info, None) }.map_err(vk_err("vkCreateSwapchainKHR"))
  }

  fn swapchain_images(&self, _device: vk::Device, swapchain: vk::SwapchainKHR) -> Result<Vec<vk::Image>, DriverError> {
    unsafe { self.swapchain_loader()?.get_swapchain_images(swapchain) }.map_err(vk_err("vkGetSwapchainImagesKHR"))
  }

  fn create_image_view(&mut self, _device: vk::Device, image: vk::Image, format: Format) -> Result<vk::ImageView, DriverError> {
    let sub = vk::ImageSubresourceRange {
      aspect_mask: vk::ImageAspectFlags::COLOR,
      base_mip_level: 0,
      level_count: 1,
      base_array_layer: 0,
      layer_count: 1,
    };
    let iv_info = vk::ImageViewCreateInfo {
      s_type: vk::StructureType::IMAGE_VIEW_CREATE_INFO,
      image,
      view_type: vk::ImageViewType::TYPE_2D,
      format: format_to_vk(format),
      subresource_range: sub,
      ..Default::default()
    };
    unsafe { self.device()?.create_image_view(&iv_info, None) }.map_err(vk_err("vkCreateImageView"))
  }

  fn create_render_pass(&mut self, _device: vk::Device, format: Format) -> Result<vk::RenderPass, DriverError> {
    // Single color attachment -> present
    let color_att = vk::AttachmentDescription {
      format: format_to_vk(format),
      samples: vk::SampleCountFlags::TYPE_1,
      load_op: vk::AttachmentLoadOp::CLEAR,
      store_op: vk::AttachmentStoreOp::STORE,
      stencil_load_op: vk::AttachmentLoadOp::DONT_CARE,
      stencil_store_op: vk::AttachmentStoreOp::DONT_CARE,
      initial_layout: vk::ImageLayout::UNDEFINED,
      final_layout: vk::ImageLayout::PRESENT_SRC_KHR,
      ..Default::default()
    };
    let att_ref = vk::AttachmentReference { attachment: 0, layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL };

    let subpass = vk::SubpassDescription {
      pipeline_bind_point: vk::PipelineBindPoint::GRAPHICS,
      color_attachment_count: 1,
      p_color_attachments: &att_ref,
      ..Default::default()
    };

    let rp_info = vk::RenderPassCreateInfo {
      s_type: vk::StructureType::RENDER_PASS_CREATE_INFO,
      attachment_count: 1,
      p_attachments: &color_att,
      subpass_count: 1,
      p_subpasses: &subpass,
      ..Default::default()
    };
    unsafe { self.device()?.create_render_pass(&rp_info, None) }.map_err(vk_err("vkCreateRenderPass"))
  }

  fn create_framebuffer(
    &mut self,
    _device: vk::Device,
    render_pass: vk::RenderPass,
    view: vk::ImageView,
    extent: Extent2D,
  ) -> Result<vk::Framebuffer, DriverError> {
    let fb_info = vk::FramebufferCreateInfo {
      s_type: vk::StructureType::FRAMEBUFFER_CREATE_INFO,
      render_pass,
      attachment_count: 1,
      p_attachments: &view,
      width: extent.width,
      height: extent.height,
      layers: 1,
      ..Default::default()
    };
    unsafe { self.device()?.create_framebuffer(&fb_info, None) }.map_err(vk_err("vkCreateFramebuffer"))
  }

  fn wait_idle(&self, _device: vk::Device) {
    if let Some(d) = &self.device {
      unsafe { d.device_wait_idle() }.ok();
    }
  }

  fn destroy_framebuffer(&mut self, _device: vk::Device, framebuffer: vk::Framebuffer) {
    match &self.device {
      Some(d) => unsafe { d.destroy_framebuffer(framebuffer, None) },
      None => warn!("framebuffer {framebuffer:?} outlived its device"),
    }
  }

  fn destroy_render_pass(&mut self, _device: vk::Device, render_pass: vk::RenderPass) {
    match &self.device {
      Some(d) => unsafe { d.destroy_render_pass(render_pass, None) },
      None => warn!("render pass {render_pass:?} outlived its device"),
    }
  }

  fn destroy_image_view(&mut self, _device: vk::Device, view: vk::ImageView) {
    match &self.device {
      Some(d) => unsafe { d.destroy_image_view(view, None) },
      None => warn!("image view {view:?} outlived its device"),
    }
  }

  fn destroy_swapchain(&mut self, _device: vk::Device, swapchain: vk::SwapchainKHR) {
    match &self.swapchain_loader {
      Some(l) => unsafe { l.destroy_swapchain(swapchain, None) },
      None => warn!("swapchain {swapchain:?} outlived its device"),
    }
  }

  fn destroy_device(&mut self, _device: vk::Device) {
    self.swapchain_loader = None;
    self.phys = None;
    if let Some(d) = self.device.take() {
      unsafe { d.destroy_device(None) };
      debug!("Vulkan device destroyed");
    }
  }

  fn destroy_surface(&mut self, _instance: vk::Instance, surface: vk::SurfaceKHR) {
    match &self.surface_loader {
      Some(l) => unsafe { l.destroy_surface(surface, None) },
      None => warn!("surface {surface:?} outlived its instance"),
    }
  }

  fn destroy_instance(&mut self, _instance: vk::Instance) {
    if let Some(m) = self.debug.take() {
      m.destroy();
    }
    self.surface_loader = None;
    if let Some(i) = self.instance.take() {
      unsafe { i.destroy_instance(None) };
      debug!("Vulkan instance destroyed");
    }
  }
}
