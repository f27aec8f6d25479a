//! Codecs
//!
//! WAV encoding of rendered buffers and the provenance fingerprint hidden
//! inside them.

pub mod fingerprint;
pub mod wav;

pub use fingerprint::{
    embed, extract, verify, AudioFingerprint, FingerprintStore, MemoryFingerprintStore,
    Verification,
};
pub use wav::{decode_wav, encode_pcm16, encode_wav, DecodedWav, WAV_HEADER_LEN};
