// Базовые модули
pub mod consts;
pub mod config;
pub mod ctx;
pub mod error;

// Wire-формат и guard
pub mod tuple;  // src/tuple.rs: 8-байтовый tuple (big-endian)
pub mod crc16;  // src/crc16.rs: CRC-16/T10-DIF

// Обход payload
pub mod sgl;    // src/sgl.rs : курсор по списку буферов
pub mod walk;   // src/walk.rs: BlockWalker / BlockRef

// Generate / verify / copy / inject
pub mod engine; // src/engine/{mod,generate,verify,copy,inject}.rs

// Удобные реэкспорты
pub use config::DifCtxBuilder;
pub use ctx::{DifCtx, DifFlags, DifLocation, DifType};
pub use error::DifError;
pub use tuple::DifTuple;

pub use consts::{
    DIF_APPTAG_ERROR, DIF_DATA_ERROR, DIF_FLAGS_ALL_CHECKS, DIF_FLAGS_APPTAG_CHECK,
    DIF_FLAGS_GUARD_CHECK, DIF_FLAGS_REFTAG_CHECK, DIF_GUARD_ERROR, DIF_REFTAG_ERROR,
    DIF_TUPLE_SIZE,
};

pub use engine::copy::{dif_generate_copy, dif_verify_copy};
pub use engine::generate::{dif_generate, dix_generate};
pub use engine::inject::{dif_inject_error, dix_inject_error};
pub use engine::verify::{dif_verify, dix_verify};
