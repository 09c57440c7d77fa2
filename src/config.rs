//! Centralized builder for DIF contexts.
//!
//! Goals:
//! - One fluent place to describe a block format instead of a nine-argument call.
//! - Same validation as DifCtx::new (the builder funnels into it on build()).
//! - Partial-guard coverage: guard_interval(n) lowers the number of data bytes
//!   covered by the guard CRC (default: the whole data region).
//!
//! Defaults: 512+8 extended LBA (block_size=520), interleaved, tuple at the start of metadata,
//! Type 1, all checks, init_ref_tag=0, app_tag=0, apptag_mask=0.

use anyhow::{anyhow, Result};

use crate::ctx::{data_size_for, DifCtx, DifFlags, DifLocation, DifType};

/// Builder producing a validated DifCtx.
#[derive(Clone, Debug)]
pub struct DifCtxBuilder {
    block_size: u32,
    md_size: u32,
    md_interleave: bool,
    dif_loc: DifLocation,
    dif_type: DifType,
    dif_flags: DifFlags,
    init_ref_tag: u32,
    apptag_mask: u16,
    app_tag: u16,
    /// None => вся data-область блока.
    guard_interval: Option<u32>,
}

impl Default for DifCtxBuilder {
    fn default() -> Self {
        Self {
            block_size: 520,
            md_size: 8,
            md_interleave: true,
            dif_loc: DifLocation::Start,
            dif_type: DifType::Type1,
            dif_flags: DifFlags::all_checks(),
            init_ref_tag: 0,
            apptag_mask: 0,
            app_tag: 0,
            guard_interval: None,
        }
    }
}

impl DifCtxBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing context (e.g. to derive a variant with another ref tag).
    pub fn from_ctx(ctx: &DifCtx) -> Self {
        Self {
            block_size: ctx.block_size(),
            md_size: ctx.md_size(),
            md_interleave: ctx.md_interleave(),
            dif_loc: ctx.dif_loc(),
            dif_type: ctx.dif_type(),
            dif_flags: ctx.dif_flags(),
            init_ref_tag: ctx.init_ref_tag(),
            apptag_mask: ctx.apptag_mask(),
            app_tag: ctx.app_tag(),
            guard_interval: Some(ctx.guard_interval()),
        }
    }

    /// Block geometry. With md_interleave (the default) block_size is data + metadata
    /// (520/8); for a separate metadata buffer it is the data block alone (512/8).
    pub fn block_size(mut self, block_size: u32, md_size: u32) -> Self {
        self.block_size = block_size;
        self.md_size = md_size;
        self
    }

    pub fn md_interleave(mut self, on: bool) -> Self {
        self.md_interleave = on;
        self
    }

    pub fn dif_loc(mut self, loc: DifLocation) -> Self {
        self.dif_loc = loc;
        self
    }

    pub fn dif_type(mut self, ty: DifType) -> Self {
        self.dif_type = ty;
        self
    }

    /// Raw dif type (e.g. straight from a namespace format descriptor).
    pub fn dif_type_raw(mut self, code: u32) -> Result<Self> {
        self.dif_type =
            DifType::from_u32(code).ok_or_else(|| anyhow!("invalid dif_type {}", code))?;
        Ok(self)
    }

    pub fn dif_flags(mut self, flags: DifFlags) -> Self {
        self.dif_flags = flags;
        self
    }

    pub fn init_ref_tag(mut self, tag: u32) -> Self {
        self.init_ref_tag = tag;
        self
    }

    /// Application tag and its don't-care mask.
    pub fn app_tag(mut self, app_tag: u16, apptag_mask: u16) -> Self {
        self.app_tag = app_tag;
        self.apptag_mask = apptag_mask;
        self
    }

    /// Partial guard coverage (None => whole data region).
    pub fn guard_interval(mut self, interval: Option<u32>) -> Self {
        self.guard_interval = interval;
        self
    }

    /// Finish the builder and validate.
    pub fn build(self) -> Result<DifCtx> {
        let data_size = data_size_for(self.block_size, self.md_size, self.md_interleave);
        DifCtx::with_guard_interval(
            self.block_size,
            self.md_size,
            self.md_interleave,
            self.dif_loc,
            self.dif_type,
            self.dif_flags,
            self.init_ref_tag,
            self.apptag_mask,
            self.app_tag,
            self.guard_interval.unwrap_or(data_size),
        )
    }
}
