// SPDX-License-Identifier: CEPL-1.0
use std::fs;
use std::path::Path;

use keystone_device::{ContextConfig, DevicePolicy};
use serde::Deserialize;
use tracing::{info, warn};

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
#[serde(default)]
pub struct AppCfg {
    pub window: WindowCfg,
    pub device: DeviceCfg,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct WindowCfg {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowCfg {
    fn default() -> Self {
        WindowCfg {
            title: "keystone".into(),
            width: 1280,
            height: 720,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct DeviceCfg {
    pub app_name: String,
    pub validation: bool,
    pub policy: PolicyCfg,
    pub vsync: bool,
}

impl Default for DeviceCfg {
    fn default() -> Self {
        DeviceCfg {
            app_name: "keystone".into(),
            validation: false,
            policy: PolicyCfg::First,
            vsync: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum PolicyCfg {
    #[default]
    First,
    Scored,
}

impl From<PolicyCfg> for DevicePolicy {
    fn from(p: PolicyCfg) -> Self {
        match p {
            PolicyCfg::First => DevicePolicy::First,
            PolicyCfg::Scored => DevicePolicy::Scored,
        }
    }
}

impl DeviceCfg {
    pub fn context_config(&self) -> ContextConfig {
        ContextConfig {
            app_name: self.app_name.clone(),
            validation: self.validation,
            device_policy: self.policy.into(),
            vsync: self.vsync,
        }
    }
}

/// Missing file means defaults; a malformed one is reported and also means defaults.
pub fn load_cfg(path: &Path) -> AppCfg {
    match fs::read_to_string(path) {
        Ok(s) => match toml::from_str::<AppCfg>(&s) {
            Ok(cfg) => {
                info!("config loaded from {}", path.display());
                cfg
            }
            Err(e) => {
                warn!("ignoring malformed {}: {e}", path.display());
                AppCfg::default()
            }
        },
        Err(_) => AppCfg::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_all_defaults() {
        let cfg: AppCfg = toml::from_str("").unwrap();
        assert_eq!(cfg, AppCfg::default());
        assert_eq!(cfg.device.context_config(), ContextConfig::default());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg: AppCfg = toml::from_str(
            r#"
            [window]
            width = 640

            [device]
            policy = "scored"
            vsync = false
            "#,
        )
        .unwrap();
        assert_eq!(cfg.window.width, 640);
        assert_eq!(cfg.window.height, 720);
        assert_eq!(cfg.window.title, "keystone");
        let ctx = cfg.device.context_config();
        assert_eq!(ctx.device_policy, DevicePolicy::Scored);
        assert!(!ctx.vsync);
        assert!(!ctx.validation);
    }

    #[test]
    fn unknown_policy_is_rejected() {
        assert!(toml::from_str::<AppCfg>("[device]\npolicy = \"fastest\"").is_err());
    }

    #[test]
    fn missing_and_malformed_files_fall_back() {
        let dir = std::env::temp_dir().join(format!("keystone-cfg-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();

        assert_eq!(load_cfg(&dir.join("absent.toml")), AppCfg::default());

        let bad = dir.join("bad.toml");
        fs::write(&bad, "[window\nwidth = ").unwrap();
        assert_eq!(load_cfg(&bad), AppCfg::default());

        let good = dir.join("good.toml");
        fs::write(&good, "[device]\nvalidation = true\n").unwrap();
        assert!(load_cfg(&good).device.validation);

        fs::remove_dir_all(&dir).ok();
    }
}
