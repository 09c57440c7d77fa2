//! sgl: курсор по scatter-gather списку буферов.
//!
//! Список это `&[S]` / `&mut [S]`, где S: AsRef<[u8]> (AsMut<[u8]> для записи):
//! подходят `&mut [u8]`, `&[u8]`, `Vec<u8>`. Адресация: абсолютным байтовым
//! смещением от начала списка; SglCursor запоминает (индекс буфера, абсолютное
//! начало этого буфера), так что последовательный проход вперёд: амортизированно O(1).
//! Назад курсор перематывается с начала.
//!
//! Все обращения: через проверяемые срезы; буферы нулевой длины пропускаются.

use anyhow::{anyhow, Result};

/// Суммарная длина списка.
pub fn total_len<S: AsRef<[u8]>>(bufs: &[S]) -> usize {
    bufs.iter().map(|b| b.as_ref().len()).sum()
}

/// Индексный курсор: bufs[idx] начинается с абсолютного смещения `start`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SglCursor {
    idx: usize,
    start: usize,
}

impl SglCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Переставить курсор на буфер, содержащий абсолютный байт `abs`.
    /// Возвращает смещение внутри этого буфера.
    fn seek(&mut self, lens: impl Fn(usize) -> Option<usize>, abs: usize) -> Result<usize> {
        if abs < self.start {
            self.idx = 0;
            self.start = 0;
        }
        loop {
            let len = lens(self.idx)
                .ok_or_else(|| anyhow!("sgl offset {} is past the end of the buffer list", abs))?;
            if abs < self.start + len {
                return Ok(abs - self.start);
            }
            self.start += len;
            self.idx += 1;
        }
    }

    /// Пройти по кускам диапазона [abs, abs+len), вызывая `f` для каждого.
    pub fn for_each_chunk<S, F>(&mut self, bufs: &[S], abs: usize, len: usize, mut f: F) -> Result<()>
    where
        S: AsRef<[u8]>,
        F: FnMut(&[u8]),
    {
        if len == 0 {
            return Ok(());
        }
        let mut off = self.seek(|i| bufs.get(i).map(|b| b.as_ref().len()), abs)?;
        let mut left = len;
        while left > 0 {
            let buf = bufs
                .get(self.idx)
                .ok_or_else(|| anyhow!("sgl range {}+{} overruns the buffer list", abs, len))?
                .as_ref();
            let n = (buf.len() - off).min(left);
            if n > 0 {
                f(&buf[off..off + n]);
            }
            left -= n;
            if left > 0 {
                self.start += buf.len();
                self.idx += 1;
                off = 0;
            }
        }
        Ok(())
    }

    /// То же, что for_each_chunk, но с изменяемыми кусками.
    pub fn for_each_chunk_mut<S, F>(
        &mut self,
        bufs: &mut [S],
        abs: usize,
        len: usize,
        mut f: F,
    ) -> Result<()>
    where
        S: AsRef<[u8]> + AsMut<[u8]>,
        F: FnMut(&mut [u8]),
    {
        if len == 0 {
            return Ok(());
        }
        let mut off = self.seek(|i| bufs.get(i).map(|b| b.as_ref().len()), abs)?;
        let mut left = len;
        while left > 0 {
            let buf = bufs
                .get_mut(self.idx)
                .ok_or_else(|| anyhow!("sgl range {}+{} overruns the buffer list", abs, len))?
                .as_mut();
            let blen = buf.len();
            let n = (blen - off).min(left);
            if n > 0 {
                f(&mut buf[off..off + n]);
            }
            left -= n;
            if left > 0 {
                self.start += blen;
                self.idx += 1;
                off = 0;
            }
        }
        Ok(())
    }

    /// Скопировать [abs, abs+out.len()) в `out`.
    pub fn read<S: AsRef<[u8]>>(&mut self, bufs: &[S], abs: usize, out: &mut [u8]) -> Result<()> {
        let mut pos = 0;
        self.for_each_chunk(bufs, abs, out.len(), |chunk| {
            out[pos..pos + chunk.len()].copy_from_slice(chunk);
            pos += chunk.len();
        })
    }

    /// Записать `src` начиная с abs.
    pub fn write<S>(&mut self, bufs: &mut [S], abs: usize, src: &[u8]) -> Result<()>
    where
        S: AsRef<[u8]> + AsMut<[u8]>,
    {
        let mut pos = 0;
        self.for_each_chunk_mut(bufs, abs, src.len(), |chunk| {
            let n = chunk.len();
            chunk.copy_from_slice(&src[pos..pos + n]);
            pos += n;
        })
    }

    /// XOR одного байта по абсолютному смещению.
    pub fn xor_byte<S>(&mut self, bufs: &mut [S], abs: usize, mask: u8) -> Result<()>
    where
        S: AsRef<[u8]> + AsMut<[u8]>,
    {
        self.for_each_chunk_mut(bufs, abs, 1, |chunk| chunk[0] ^= mask)
    }
}
