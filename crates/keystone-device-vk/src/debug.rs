// SPDX-License-Identifier: CEPL-1.0
use std::ffi::CStr;

use ash::ext::debug_utils;
use ash::{vk, Entry, Instance};
use tracing::{debug, error, info, warn};

pub(crate) const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

unsafe extern "system" fn debug_callback(
  severity: vk::DebugUtilsMessageSeverityFlagsEXT,
  _types: vk::DebugUtilsMessageTypeFlagsEXT,
  data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
  _user: *mut std::os::raw::c_void,
) -> vk::Bool32 {
  if data.is_null() {
    return vk::FALSE;
  }
  // SAFETY: the loader hands us a valid callback struct for the duration of the call.
  let msg = unsafe {
    let p = (*data).p_message;
    if p.is_null() {
      return vk::FALSE;
    }
    CStr::from_ptr(p).to_string_lossy()
  };
  match severity {
    vk::DebugUtilsMessageSeverityFlagsEXT::ERROR => error!("[vulkan] {msg}"),
    vk::DebugUtilsMessageSeverityFlagsEXT::WARNING => warn!("[vulkan] {msg}"),
    vk::DebugUtilsMessageSeverityFlagsEXT::INFO => info!("[vulkan] {msg}"),
    _ => debug!("[vulkan] {msg}"),
  }
  vk::FALSE
}

/// Instance-scoped messenger; created right after the instance, destroyed right before it.
pub(crate) struct DebugMessenger {
  loader: debug_utils::Instance,
  messenger: vk::DebugUtilsMessengerEXT,
}

impl DebugMessenger {
  pub(crate) fn new(entry: &Entry, instance: &Instance) -> Result<Self, vk::Result> {
    let loader = debug_utils::Instance::new(entry, instance);
    let ci = vk::DebugUtilsMessengerCreateInfoEXT {
      s_type: vk::StructureType::DEBUG_UTILS_MESSENGER_CREATE_INFO_EXT,
      message_severity: vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
        | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
        | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
        | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
      message_type: vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
        | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
        | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
      pfn_user_callback: Some(debug_callback),
      ..Default::default()
    };
    let messenger = unsafe { loader.create_debug_utils_messenger(&ci, None)? };
    Ok(Self { loader, messenger })
  }

  pub(crate) fn destroy(self) {
    unsafe { self.loader.destroy_debug_utils_messenger(self.messenger, None) };
  }
}

/// Whether the Khronos validation layer is installed.
pub(crate) fn validation_available(entry: &Entry) -> bool {
  unsafe { entry.enumerate_instance_layer_properties() }
    .unwrap_or_default()
    .iter()
    .any(|l| l.layer_name_as_c_str().is_ok_and(|name| name == VALIDATION_LAYER))
}
