use chacha20::{
    cipher::{KeyIvInit, StreamCipher},
    ChaCha8, Key, Nonce,
};

use crate::scratchpad::ScratchPad;

const CHUNK_SIZE: usize = 32;
const NONCE_SIZE: usize = 12;

// Stage 1 shared by v2 and v3: expand the input over the whole scratchpad.
//
// The input is consumed in 32-byte chunks. Each chunk is folded into a
// running BLAKE3 chain, and the chain keys a ChaCha8 keystream that is XORed
// over one window of the (zeroed) pad. The nonce for the next window is taken
// from the tail of the bytes just written, so every window depends on all the
// previous ones.
pub(crate) fn chacha8_fill<const WORDS: usize>(input: &[u8], pad: &mut ScratchPad<WORDS>) {
    let bytes = pad.as_bytes_mut();
    bytes.fill(0);

    let mut chain: [u8; 32] = blake3::hash(input).into();
    let mut nonce = [0u8; NONCE_SIZE];
    nonce.copy_from_slice(&chain[..NONCE_SIZE]);

    let memory_bytes = WORDS * 8;
    let num_chunks = input.len().div_ceil(CHUNK_SIZE);
    let mut output_offset = 0;

    for (chunk_index, chunk) in input.chunks(CHUNK_SIZE).enumerate() {
        // rechain over a fixed 64-byte block, zero-padded past short chunks
        let mut block = [0u8; 64];
        block[..32].copy_from_slice(&chain);
        block[32..32 + chunk.len()].copy_from_slice(chunk);
        chain = blake3::hash(&block).into();

        let mut cipher = ChaCha8::new(Key::from_slice(&chain), Nonce::from_slice(&nonce));

        let remaining = memory_bytes - output_offset;
        let current = remaining.min(remaining / (num_chunks - chunk_index));

        // The window starts at chunk_index * current, not at the running
        // offset; the gaps and overlaps this produces when window sizes vary
        // are part of the hash definition. Bounds are clamped to the pad so
        // chunk counts whose rounding overshoots the end write short.
        let start = (chunk_index * current).min(memory_bytes);
        let end = (start + current).min(memory_bytes);
        let part = &mut bytes[start..end];
        cipher.apply_keystream(part);

        output_offset += current;

        let tail = &part[part.len().saturating_sub(NONCE_SIZE)..];
        nonce[..tail.len()].copy_from_slice(tail);
    }
}
