//! Grid layout and dispatch sizing for a vegetation field.
//!
//! Instances are laid out row-major on a square-ish grid whose row width is
//! `floor(sqrt(N))`. `N` need not be a perfect square: the last row is
//! partial, and the kernel must bound-check against `amount`.

use super::record::INSTANCE_STRIDE;

/// Threads per workgroup along X in the vegetation kernel. Must match
/// `@workgroup_size` in vegetation.wgsl.
pub const VEGETATION_WORKGROUP_SIZE: u32 = 8;

/// Grid layout derived from an instance count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridLayout {
    /// Total instance count
    pub amount: u32,
    /// Instances per grid row, `floor(sqrt(amount))`
    pub amount_per_row: u32,
}

impl GridLayout {
    pub fn new(amount: u32) -> Self {
        Self {
            amount,
            amount_per_row: amount_per_row(amount),
        }
    }

    /// Number of rows needed to hold every instance (last row may be partial).
    pub fn rows(&self) -> u32 {
        if self.amount_per_row == 0 {
            0
        } else {
            self.amount.div_ceil(self.amount_per_row)
        }
    }

    /// Workgroups along X for one dispatch. Y and Z are always 1.
    pub fn workgroups(&self) -> u32 {
        workgroup_count(self.amount, VEGETATION_WORKGROUP_SIZE)
    }
}

/// `floor(sqrt(n))`, exact for every `u32`.
///
/// The float estimate can land one off for large `n`; the correction loops
/// guarantee `r*r <= n < (r+1)*(r+1)`.
pub fn amount_per_row(n: u32) -> u32 {
    let n64 = n as u64;
    let mut r = (n as f64).sqrt() as u64;
    while r * r > n64 {
        r -= 1;
    }
    while (r + 1) * (r + 1) <= n64 {
        r += 1;
    }
    r as u32
}

/// `ceil(n / group_size)`. Zero instances dispatch zero groups.
pub fn workgroup_count(n: u32, group_size: u32) -> u32 {
    if group_size == 0 {
        return 0;
    }
    n.div_ceil(group_size)
}

/// Largest instance count a single one-axis dispatch and a single storage
/// binding can cover under `limits`.
pub fn max_instances(limits: &wgpu::Limits) -> u32 {
    let by_dispatch =
        limits.max_compute_workgroups_per_dimension as u64 * VEGETATION_WORKGROUP_SIZE as u64;
    let by_binding = limits.max_storage_buffer_binding_size as u64 / INSTANCE_STRIDE;
    let by_buffer = limits.max_buffer_size as u64 / INSTANCE_STRIDE;
    by_dispatch.min(by_binding).min(by_buffer).min(u32::MAX as u64) as u32
}

/// Clamp a requested count into what `limits` allows. Returns the count to
/// use and whether it was reduced.
pub fn clamp_instance_count(requested: u32, limits: &wgpu::Limits) -> (u32, bool) {
    let max = max_instances(limits);
    if requested > max {
        (max, true)
    } else {
        (requested, false)
    }
}
