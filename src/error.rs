//! error: отчёт о нарушении целостности (первый сбойный блок).
//!
//! Ошибки контракта (неверный контекст, длина payload и т.п.) идут обычным
//! anyhow::Error с текстом. Нарушение целостности приходит как DifError внутри
//! anyhow::Error; достать его можно через `err.downcast_ref::<DifError>()`.

use serde::Serialize;
use std::fmt;

use crate::consts::{DIF_APPTAG_ERROR, DIF_DATA_ERROR, DIF_GUARD_ERROR, DIF_REFTAG_ERROR};

/// Информация об ошибке DIF в первом сбойном блоке.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DifError {
    /// Битовая маска DIF_*_ERROR.
    pub err_type: u8,
    /// Ожидаемое (пересчитанное) значение поля, расширенное до u32.
    pub expected: u32,
    /// Фактическое (сохранённое) значение поля.
    pub actual: u32,
    /// Индекс блока (0-based).
    pub err_offset: u32,
}

impl DifError {
    pub fn new(err_type: u8, expected: u32, actual: u32, err_offset: u32) -> Self {
        Self {
            err_type,
            expected,
            actual,
            err_offset,
        }
    }

    /// Человекочитаемое имя поля для err_type.
    pub fn kind_name(&self) -> &'static str {
        match self.err_type {
            DIF_GUARD_ERROR => "guard",
            DIF_APPTAG_ERROR => "app_tag",
            DIF_REFTAG_ERROR => "ref_tag",
            DIF_DATA_ERROR => "data",
            _ => "unknown",
        }
    }
}

impl fmt::Display for DifError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DIF {} error at block {}: expected={:#x}, actual={:#x}",
            self.kind_name(),
            self.err_offset,
            self.expected,
            self.actual
        )
    }
}

impl std::error::Error for DifError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_and_downcast() {
        let e = DifError::new(DIF_GUARD_ERROR, 0x1234, 0x1235, 2);
        assert_eq!(
            e.to_string(),
            "DIF guard error at block 2: expected=0x1234, actual=0x1235"
        );
        let any: anyhow::Error = e.into();
        assert_eq!(any.downcast_ref::<DifError>(), Some(&e));
    }

    #[test]
    fn serializes_as_json() {
        let e = DifError::new(DIF_REFTAG_ERROR, 102, 103, 2);
        let s = serde_json::to_string(&e).unwrap();
        assert_eq!(s, r#"{"err_type":1,"expected":102,"actual":103,"err_offset":2}"#);
    }
}
