// SPDX-License-Identifier: CEPL-1.0
#![deny(unsafe_op_in_unsafe_fn)]
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::Parser;
use keystone_core::init_tracing;
use keystone_device::DeviceContext;
use keystone_device_vk::AshDriver;
use keystone_platform::PlatformWindow;
use tracing::{error, info};

use keystone_platform::winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::WindowId,
};

mod config;

use config::{load_cfg, AppCfg, PolicyCfg};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML config file; missing means defaults
    #[arg(long, default_value = "keystone.toml")]
    config: PathBuf,
    /// Exit after this many loop iterations (0 = run until the window closes)
    #[arg(long, default_value_t = 0)]
    frames: u64,
    /// Physical device policy, overrides the config file
    #[arg(long, value_enum)]
    device_policy: Option<PolicyCfg>,
}

struct App {
    cfg: AppCfg,
    max_frames: u64,

    // Declared before `window`: the chain must go before the surface's window does.
    ctx: Option<DeviceContext<AshDriver>>,
    window: Option<PlatformWindow>,

    frames: u64,
    last_fps_instant: std::time::Instant,
    fps_frames: u32,
    failure: Option<anyhow::Error>,
}

impl App {
    fn new(cfg: AppCfg, max_frames: u64) -> Self {
        App {
            cfg,
            max_frames,
            ctx: None,
            window: None,
            frames: 0,
            last_fps_instant: std::time::Instant::now(),
            fps_frames: 0,
            failure: None,
        }
    }

    fn teardown(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(mut ctx) = self.ctx.take() {
            ctx.shutdown();
        }
        self.window = None;
        event_loop.exit();
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        error!("{err:#}");
        self.failure = Some(err);
        self.teardown(event_loop);
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let w = &self.cfg.window;
        let window = match PlatformWindow::create(event_loop, &w.title, w.width, w.height) {
            Ok(window) => window,
            Err(e) => return self.fail(event_loop, e),
        };

        match DeviceContext::<AshDriver>::initialize(AshDriver::new(), &window, self.cfg.device.context_config()) {
            Ok(ctx) => {
                info!(
                    "device ready ({:?}, {:?}, {} images)",
                    ctx.extent(),
                    ctx.present_mode(),
                    ctx.images().len()
                );
                self.ctx = Some(ctx);
                self.window = Some(window);
            }
            Err(e) => {
                let stage = e.stage();
                return self.fail(
                    event_loop,
                    anyhow::Error::new(e).context(format!("device initialization failed at stage \"{stage}\"")),
                );
            }
        }

        event_loop.set_control_flow(ControlFlow::Poll);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        if let Some(window) = &self.window {
            if window_id != window.id() {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                info!("CloseRequested");
                self.teardown(event_loop);
            }

            WindowEvent::Resized(new_size) => {
                info!("Resized → {}x{}", new_size.width, new_size.height);
                let (Some(ctx), Some(window)) = (self.ctx.as_mut(), self.window.as_ref()) else {
                    return;
                };
                if let Err(e) = ctx.rebuild_swapchain(window) {
                    let stage = e.stage();
                    self.fail(
                        event_loop,
                        anyhow::Error::new(e).context(format!("swapchain rebuild failed at stage \"{stage}\"")),
                    );
                }
            }

            WindowEvent::RedrawRequested => {
                // Frame recording and present are supplied elsewhere; the core only keeps the chain alive.
                self.fps_frames = self.fps_frames.saturating_add(1);
            }

            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.ctx.is_none() {
            return;
        }

        self.frames += 1;
        if self.max_frames > 0 && self.frames >= self.max_frames {
            info!("frame limit {} reached", self.max_frames);
            self.teardown(event_loop);
            return;
        }

        if let Some(w) = &self.window {
            w.request_redraw();
        }

        let now = std::time::Instant::now();
        if now.duration_since(self.last_fps_instant).as_secs_f32() >= 1.0 {
            info!("fps ~ {}", self.fps_frames);
            self.fps_frames = 0;
            self.last_fps_instant = now;
        }
    }
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let mut cfg = load_cfg(&args.config);
    if let Some(policy) = args.device_policy {
        cfg.device.policy = policy;
    }
    info!("device policy = {:?}, vsync = {}", cfg.device.policy, cfg.device.vsync);

    let event_loop: EventLoop<()> = EventLoop::new()?;
    let mut app = App::new(cfg, args.frames);
    event_loop.run_app(&mut app)?;

    match app.failure.take() {
        Some(err) => Err(err),
        None if app.frames == 0 && app.max_frames > 0 => Err(anyhow!("event loop ended before the device came up")),
        None => {
            info!("clean shutdown after {} loop iterations", app.frames);
            Ok(())
        }
    }
}
