//! Общие константы формата DIF/DIX (флаги проверки, биты ошибок, раскладка tuple).

// -------- Check flags (dif_flags) --------
// Биты совпадают с полем PRCHK команды NVMe, поэтому маску можно OR'ить напрямую.
pub const DIF_FLAGS_REFTAG_CHECK: u32 = 1 << 26;
pub const DIF_FLAGS_APPTAG_CHECK: u32 = 1 << 27;
pub const DIF_FLAGS_GUARD_CHECK: u32 = 1 << 28;

/// Все три проверки разом.
pub const DIF_FLAGS_ALL_CHECKS: u32 =
    DIF_FLAGS_REFTAG_CHECK | DIF_FLAGS_APPTAG_CHECK | DIF_FLAGS_GUARD_CHECK;

// -------- Error bits (DifError::err_type, inject_flags) --------
pub const DIF_REFTAG_ERROR: u8 = 0x1;
pub const DIF_APPTAG_ERROR: u8 = 0x2;
pub const DIF_GUARD_ERROR: u8 = 0x4;
pub const DIF_DATA_ERROR: u8 = 0x8;

// -------- Tuple (8 bytes) --------
// Layout (big-endian):
// [guard u16][app_tag u16][ref_tag u32]
pub const DIF_TUPLE_SIZE: usize = 8;

pub const DIF_OFF_GUARD: usize = 0;
pub const DIF_OFF_APP_TAG: usize = 2;
pub const DIF_OFF_REF_TAG: usize = 4;

/// apptag_mask, при которой все биты app_tag: "don't care".
pub const APPTAG_MASK_ALL: u16 = 0xFFFF;
