// SPDX-License-Identifier: CEPL-1.0
//! Selection rules for each capability axis. Every function here is total.

use crate::caps::{
    ColorSpace, DeviceType, Extent2D, Format, PhysicalDeviceInfo, PresentMode, QueueFamily,
    QueueFamilyIndices, SharingMode, SurfaceCapabilities, SurfaceFormat,
};

pub const PREFERRED_SURFACE_FORMAT: SurfaceFormat =
    SurfaceFormat::new(Format::B8G8R8A8Unorm, ColorSpace::SrgbNonlinear);

/// Returned when the surface reports no formats at all.
pub const DEFAULT_SURFACE_FORMAT: SurfaceFormat = PREFERRED_SURFACE_FORMAT;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DevicePolicy {
    /// Take whatever the driver lists first.
    #[default]
    First,
    /// Rank by device type; ties keep enumeration order.
    Scored,
}

fn device_type_score(ty: DeviceType) -> u32 {
    match ty {
        DeviceType::DiscreteGpu => 1000,
        DeviceType::IntegratedGpu => 100,
        DeviceType::VirtualGpu => 10,
        DeviceType::Cpu => 1,
        DeviceType::Other => 0,
    }
}

/// Index of the chosen device, `None` only for an empty list.
pub fn select_physical_device(policy: DevicePolicy, devices: &[PhysicalDeviceInfo]) -> Option<usize> {
    match policy {
        DevicePolicy::First => (!devices.is_empty()).then_some(0),
        DevicePolicy::Scored => {
            let mut best: Option<(usize, u32)> = None;
            for (i, d) in devices.iter().enumerate() {
                let score = device_type_score(d.device_type);
                if best.map_or(true, |(_, s)| score > s) {
                    best = Some((i, score));
                }
            }
            best.map(|(i, _)| i)
        }
    }
}

/// Pick graphics and present families. Later qualifying families overwrite
/// earlier ones, so the result is the last match on each axis.
///
/// `presentable[i]` tells whether family `i` can present to the target
/// surface; missing entries count as `false`.
pub fn select_queue_families(families: &[QueueFamily], presentable: &[bool]) -> QueueFamilyIndices {
    families
        .iter()
        .enumerate()
        .fold(QueueFamilyIndices::default(), |mut acc, (i, family)| {
            let index = i as u32;
            if family.supports_graphics() {
                acc.graphics = Some(index);
            }
            if presentable.get(i).copied().unwrap_or(false) {
                acc.present = Some(index);
            }
            acc
        })
}

pub fn choose_surface_format(formats: &[SurfaceFormat]) -> SurfaceFormat {
    formats
        .iter()
        .copied()
        .find(|f| *f == PREFERRED_SURFACE_FORMAT)
        .or_else(|| formats.first().copied())
        .unwrap_or(DEFAULT_SURFACE_FORMAT)
}

pub fn choose_present_mode(modes: &[PresentMode], vsync: bool) -> PresentMode {
    let preference: &[PresentMode] = if vsync {
        &[PresentMode::Mailbox]
    } else {
        &[PresentMode::Immediate, PresentMode::Mailbox]
    };
    preference
        .iter()
        .copied()
        .find(|m| modes.contains(m))
        .unwrap_or(PresentMode::Fifo)
}

pub fn resolve_extent(caps: &SurfaceCapabilities, framebuffer: Extent2D) -> Extent2D {
    if caps.has_current_extent() {
        caps.current_extent
    } else {
        Extent2D {
            width: framebuffer
                .width
                .clamp(caps.min_image_extent.width, caps.max_image_extent.width),
            height: framebuffer
                .height
                .clamp(caps.min_image_extent.height, caps.max_image_extent.height),
        }
    }
}

pub fn choose_image_count(caps: &SurfaceCapabilities) -> u32 {
    let want = caps.min_image_count + 1;
    if caps.max_image_count == 0 {
        want
    } else {
        want.min(caps.max_image_count)
    }
}

/// Families that need a queue on the logical device, deduplicated.
pub fn unique_families(graphics: u32, present: u32) -> Vec<u32> {
    if graphics == present {
        vec![graphics]
    } else {
        vec![graphics, present]
    }
}

pub fn image_sharing(graphics: u32, present: u32) -> (SharingMode, Vec<u32>) {
    if graphics == present {
        (SharingMode::Exclusive, Vec::new())
    } else {
        (SharingMode::Concurrent, vec![graphics, present])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caps::QueueFlags;

    fn family(flags: QueueFlags) -> QueueFamily {
        QueueFamily { flags, queue_count: 1 }
    }

    fn caps(current: Extent2D, min: Extent2D, max: Extent2D) -> SurfaceCapabilities {
        SurfaceCapabilities {
            current_extent: current,
            min_image_extent: min,
            max_image_extent: max,
            min_image_count: 2,
            max_image_count: 0,
        }
    }

    fn device(name: &str, device_type: DeviceType) -> PhysicalDeviceInfo {
        PhysicalDeviceInfo {
            name: name.into(),
            device_type,
        }
    }

    #[test]
    fn queue_selection_keeps_last_match() {
        let families = [
            family(QueueFlags::GRAPHICS | QueueFlags::COMPUTE),
            family(QueueFlags::TRANSFER),
            family(QueueFlags::GRAPHICS),
            family(QueueFlags::COMPUTE),
        ];
        let presentable = [true, true, false, false];

        let picked = select_queue_families(&families, &presentable);

        assert_eq!(picked.graphics, Some(2));
        assert_eq!(picked.present, Some(1));
        assert!(!picked.is_shared());
    }

    #[test]
    fn queue_selection_can_coincide() {
        let families = [family(QueueFlags::COMPUTE), family(QueueFlags::GRAPHICS)];
        let picked = select_queue_families(&families, &[false, true]);
        assert_eq!(picked.graphics, Some(1));
        assert_eq!(picked.present, Some(1));
        assert!(picked.is_shared());
    }

    #[test]
    fn queue_selection_leaves_unmatched_unset() {
        let families = [family(QueueFlags::TRANSFER), family(QueueFlags::COMPUTE)];
        let picked = select_queue_families(&families, &[]);
        assert_eq!(picked, QueueFamilyIndices::default());
    }

    #[test]
    fn preferred_format_wins_from_any_position() {
        let other = SurfaceFormat::new(Format::R8G8B8A8Srgb, ColorSpace::SrgbNonlinear);
        let near_miss = SurfaceFormat::new(Format::B8G8R8A8Unorm, ColorSpace::Other(1_000_104_002));
        let formats = [other, near_miss, PREFERRED_SURFACE_FORMAT];
        assert_eq!(choose_surface_format(&formats), PREFERRED_SURFACE_FORMAT);
    }

    #[test]
    fn format_falls_back_to_first_then_default() {
        let first = SurfaceFormat::new(Format::Other(64), ColorSpace::Other(7));
        let second = SurfaceFormat::new(Format::R8G8B8A8Unorm, ColorSpace::SrgbNonlinear);
        assert_eq!(choose_surface_format(&[first, second]), first);
        assert_eq!(choose_surface_format(&[]), DEFAULT_SURFACE_FORMAT);
    }

    #[test]
    fn mailbox_preferred_even_when_listed_last() {
        let modes = [PresentMode::Fifo, PresentMode::Immediate, PresentMode::Mailbox];
        assert_eq!(choose_present_mode(&modes, true), PresentMode::Mailbox);
    }

    #[test]
    fn fifo_chosen_without_being_listed() {
        assert_eq!(choose_present_mode(&[PresentMode::Immediate], true), PresentMode::Fifo);
        assert_eq!(choose_present_mode(&[], true), PresentMode::Fifo);
    }

    #[test]
    fn vsync_off_prefers_immediate() {
        let modes = [PresentMode::Mailbox, PresentMode::Immediate];
        assert_eq!(choose_present_mode(&modes, false), PresentMode::Immediate);
        assert_eq!(choose_present_mode(&[PresentMode::Mailbox], false), PresentMode::Mailbox);
        assert_eq!(choose_present_mode(&[PresentMode::FifoRelaxed], false), PresentMode::Fifo);
    }

    #[test]
    fn concrete_current_extent_used_verbatim() {
        let c = caps(
            Extent2D::new(800, 600),
            Extent2D::new(1000, 1000),
            Extent2D::new(2000, 2000),
        );
        assert_eq!(resolve_extent(&c, Extent2D::new(1, 1)), Extent2D::new(800, 600));
    }

    #[test]
    fn sentinel_extent_clamps_each_axis() {
        let c = caps(
            Extent2D::new(u32::MAX, u32::MAX),
            Extent2D::new(100, 100),
            Extent2D::new(1920, 1080),
        );
        assert_eq!(resolve_extent(&c, Extent2D::new(4000, 50)), Extent2D::new(1920, 100));
        assert_eq!(resolve_extent(&c, Extent2D::new(640, 480)), Extent2D::new(640, 480));
    }

    #[test]
    fn image_count_respects_bounds() {
        let mut c = caps(Extent2D::default(), Extent2D::default(), Extent2D::default());
        c.min_image_count = 2;
        c.max_image_count = 0;
        assert_eq!(choose_image_count(&c), 3);
        c.max_image_count = 2;
        assert_eq!(choose_image_count(&c), 2);
        c.max_image_count = 8;
        assert_eq!(choose_image_count(&c), 3);
    }

    #[test]
    fn first_policy_ignores_device_type() {
        let devices = [device("llvmpipe", DeviceType::Cpu), device("dGPU", DeviceType::DiscreteGpu)];
        assert_eq!(select_physical_device(DevicePolicy::First, &devices), Some(0));
        assert_eq!(select_physical_device(DevicePolicy::First, &[]), None);
    }

    #[test]
    fn scored_policy_ranks_by_type_and_keeps_order_on_ties() {
        let devices = [
            device("llvmpipe", DeviceType::Cpu),
            device("iGPU", DeviceType::IntegratedGpu),
            device("dGPU a", DeviceType::DiscreteGpu),
            device("dGPU b", DeviceType::DiscreteGpu),
        ];
        assert_eq!(select_physical_device(DevicePolicy::Scored, &devices), Some(2));
        assert_eq!(select_physical_device(DevicePolicy::Scored, &[]), None);
        assert_eq!(
            select_physical_device(DevicePolicy::Scored, &[device("?", DeviceType::Other)]),
            Some(0)
        );
    }

    #[test]
    fn sharing_follows_family_split() {
        assert_eq!(unique_families(0, 0), vec![0]);
        assert_eq!(unique_families(0, 2), vec![0, 2]);
        assert_eq!(image_sharing(1, 1), (SharingMode::Exclusive, vec![]));
        assert_eq!(image_sharing(0, 2), (SharingMode::Concurrent, vec![0, 2]));
    }
}
