// SPDX-License-Identifier: CEPL-1.0
//! Window collaborator for the device chain, backed by winit.
#![deny(unsafe_op_in_unsafe_fn)]
use anyhow::{Context, Result};
use keystone_device::{Extent2D, WindowSurface};
use raw_window_handle::{
    DisplayHandle, HandleError, HasDisplayHandle, HasWindowHandle, WindowHandle,
};
use tracing::info;

pub use winit;

use winit::dpi::PhysicalSize;
use winit::event_loop::ActiveEventLoop;
use winit::window::{Window, WindowId};

/// An OS window the device chain can build a surface on.
pub struct PlatformWindow {
    window: Window,
}

impl PlatformWindow {
    pub fn create(event_loop: &ActiveEventLoop, title: &str, width: u32, height: u32) -> Result<Self> {
        let attrs = Window::default_attributes()
            .with_title(title)
            .with_inner_size(PhysicalSize::new(width.max(1), height.max(1)));
        let window = event_loop.create_window(attrs).context("create_window")?;
        let size = window.inner_size();
        info!("window \"{title}\" created ({}x{})", size.width, size.height);
        Ok(Self { window })
    }

    pub fn id(&self) -> WindowId {
        self.window.id()
    }

    pub fn request_redraw(&self) {
        self.window.request_redraw();
    }

    pub fn inner(&self) -> &Window {
        &self.window
    }
}

impl WindowSurface for PlatformWindow {
    fn framebuffer_size(&self) -> Extent2D {
        let size = self.window.inner_size();
        Extent2D::new(size.width, size.height)
    }
}

impl HasWindowHandle for PlatformWindow {
    fn window_handle(&self) -> Result<WindowHandle<'_>, HandleError> {
        self.window.window_handle()
    }
}

impl HasDisplayHandle for PlatformWindow {
    fn display_handle(&self) -> Result<DisplayHandle<'_>, HandleError> {
        self.window.display_handle()
    }
}
