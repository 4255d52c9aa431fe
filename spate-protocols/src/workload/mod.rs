//! Workload generation
//!
//! Produces the keys and values that requests carry. The protocol codecs
//! decide how bytes go on the wire; this module decides what those bytes are:
//! which key an iterator selects next, how large the value is, what content
//! fills it, and when it expires.

pub mod crc;
pub mod import;
pub mod object_gen;

pub use crc::{checksum, CrcObjectGenerator, CRC_SIZE};
pub use import::{
    CaptureReader, FileReader, ImportObjectGenerator, ImportedItem, ImportedKeylist,
};
pub use object_gen::{
    DataObject, ObjectGenerator, KEY_GAUSSIAN, KEY_GET_ITER, KEY_RANDOM, KEY_SET_ITER,
};
