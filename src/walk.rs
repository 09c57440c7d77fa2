//! walk: обход payload по блокам.
//!
//! BlockWalker проверяет длину payload под num_blocks и раскладку, после чего
//! лениво выдаёт BlockRef для блоков 0..num_blocks строго по возрастанию.
//! BlockRef: это только абсолютные смещения (data-область и запись метаданных),
//! сами байты читаются/пишутся через sgl::SglCursor, поэтому блок, разрезанный
//! между буферами, обрабатывается прозрачно.
//!
//! Раскладки:
//! - Interleaved: блок i = [data(data_size)][md(md_size)] по смещению i*block_size.
//! - Separate (DIX): data по i*data_size в списке данных, md по i*md_size в буфере метаданных.

use anyhow::{anyhow, Result};
use std::iter::FusedIterator;

use crate::ctx::DifCtx;

/// Раскладка метаданных относительно данных.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Interleaved,
    Separate,
}

/// Позиции одного блока.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRef {
    /// Индекс блока (0-based).
    pub index: u32,
    /// Абсолютное смещение data-области.
    pub data: usize,
    /// Абсолютное смещение записи метаданных (в том же списке для Interleaved,
    /// в буфере метаданных для Separate).
    pub md: usize,
}

impl BlockRef {
    /// Абсолютное смещение tuple.
    #[inline]
    pub fn tuple(&self, ctx: &DifCtx) -> usize {
        self.md + ctx.dif_offset()
    }
}

/// Проверить, что фактическая длина буфера совпадает с ожидаемой.
pub(crate) fn check_len(what: &str, actual: usize, num_blocks: u32, unit: u32) -> Result<()> {
    let expected = (num_blocks as usize)
        .checked_mul(unit as usize)
        .ok_or_else(|| anyhow!("{}: {} blocks x {} bytes overflows", what, num_blocks, unit))?;
    if actual != expected {
        return Err(anyhow!(
            "{} length mismatch: got {} bytes, expected {} ({} blocks x {} bytes)",
            what,
            actual,
            expected,
            num_blocks,
            unit
        ));
    }
    Ok(())
}

/// Ленивый, конечный, одноразовый обход блоков.
#[derive(Debug, Clone)]
pub struct BlockWalker {
    layout: Layout,
    block_size: usize,
    data_size: usize,
    md_size: usize,
    next: u32,
    num_blocks: u32,
}

impl BlockWalker {
    /// Interleaved payload длиной `payload_len` (должно быть num_blocks * block_size).
    pub fn interleaved(payload_len: usize, num_blocks: u32, ctx: &DifCtx) -> Result<Self> {
        check_len("payload", payload_len, num_blocks, ctx.block_size())?;
        Ok(Self::new(Layout::Interleaved, num_blocks, ctx))
    }

    /// DIX: список данных (num_blocks * data_size) + буфер метаданных (num_blocks * md_size).
    pub fn separate(data_len: usize, md_len: usize, num_blocks: u32, ctx: &DifCtx) -> Result<Self> {
        check_len("data payload", data_len, num_blocks, ctx.data_size())?;
        check_len("metadata buffer", md_len, num_blocks, ctx.md_size())?;
        Ok(Self::new(Layout::Separate, num_blocks, ctx))
    }

    fn new(layout: Layout, num_blocks: u32, ctx: &DifCtx) -> Self {
        Self {
            layout,
            block_size: ctx.block_size() as usize,
            data_size: ctx.data_size() as usize,
            md_size: ctx.md_size() as usize,
            next: 0,
            num_blocks,
        }
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }
}

impl Iterator for BlockWalker {
    type Item = BlockRef;

    fn next(&mut self) -> Option<BlockRef> {
        if self.next >= self.num_blocks {
            return None;
        }
        let index = self.next;
        self.next += 1;
        let i = index as usize;
        let blk = match self.layout {
            Layout::Interleaved => {
                let data = i * self.block_size;
                BlockRef {
                    index,
                    data,
                    md: data + self.data_size,
                }
            }
            Layout::Separate => BlockRef {
                index,
                data: i * self.data_size,
                md: i * self.md_size,
            },
        };
        Some(blk)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.num_blocks - self.next) as usize;
        (left, Some(left))
    }
}

impl ExactSizeIterator for BlockWalker {}
impl FusedIterator for BlockWalker {}
