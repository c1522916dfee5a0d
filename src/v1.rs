use aes::Block;
use tiny_keccak::keccakp;

use crate::{
    scratchpad::{load32, load64, store32, store64},
    Error, Hash, HASH_SIZE,
};

// Tweakable parameters
pub const MEMORY_SIZE: usize = 32768;
pub const SCRATCHPAD_ITERS: usize = 5000;
pub const ITERS: usize = 1;
pub const BUFFER_SIZE: usize = 42;
pub const SLOT_LENGTH: usize = 256;

// Fixed by the construction
pub const KECCAK_WORDS: usize = 25;
pub const INPUT_SIZE: usize = KECCAK_WORDS * 8;
pub const MAX_PADDED_INPUT: usize = 120;
const STAGE_1_MAX: usize = MEMORY_SIZE / KECCAK_WORDS;

pub type ScratchPad = crate::scratchpad::ScratchPad<MEMORY_SIZE>;

// Stage 1: repeated Keccak permutations of the input lanes, combined into a
// running value that chains every word written to the pad.
// MEMORY_SIZE = 25 * 1310 + 18, so the second call covers the 18-word tail.
fn stage_1(
    lanes: &mut [u64; KECCAK_WORDS],
    bytes: &mut [u8],
    rows: (usize, usize),
    cols: (usize, usize),
) {
    for i in rows.0..=rows.1 {
        keccakp(lanes);

        let mut rand = 0u64;
        for j in cols.0..=cols.1 {
            let left = lanes[(j + 1) % KECCAK_WORDS];
            let right = lanes[(j + 2) % KECCAK_WORDS];
            let xor = left ^ right;
            let v = match xor & 0x3 {
                0 => left & right,
                1 => !(left & right),
                2 => !xor,
                3 => xor,
                _ => unreachable!(),
            };
            rand = (lanes[j] ^ rand) ^ v;
            store64(bytes, i * KECCAK_WORDS + j, rand);
        }
    }
}

// Stage 2: slot permutation over the 32-bit view. Each 256-word chunk is
// folded into 256 slot accumulators through a partial Fisher-Yates walk whose
// order is driven by the pad itself.
fn stage_2(bytes: &mut [u8]) {
    const SMALL_PAD_LEN: usize = MEMORY_SIZE * 2;

    let mut slots = [0u32; SLOT_LENGTH];
    for (k, slot) in slots.iter_mut().enumerate() {
        *slot = load32(bytes, SMALL_PAD_LEN - SLOT_LENGTH + k);
    }

    let mut indices = [0u16; SLOT_LENGTH];
    for _ in 0..ITERS {
        for j in 0..SMALL_PAD_LEN / SLOT_LENGTH {
            let base = j * SLOT_LENGTH;

            // precompute the signed sum of this chunk
            let mut total_sum = 0u32;
            for k in 0..SLOT_LENGTH {
                indices[k] = k as u16;
                let pad_value = load32(bytes, base + k);
                if slots[k] >> 31 == 0 {
                    total_sum = total_sum.wrapping_add(pad_value);
                } else {
                    total_sum = total_sum.wrapping_sub(pad_value);
                }
            }

            for slot_idx in (0..SLOT_LENGTH).rev() {
                let index_in_indices =
                    (load32(bytes, base + slot_idx) % (slot_idx as u32 + 1)) as usize;
                let index = indices[index_in_indices] as usize;
                indices[index_in_indices] = indices[slot_idx];

                let s1 = (slots[index] >> 31) as i32;
                let pad_value = load32(bytes, base + index);
                let local_sum = if s1 == 0 {
                    total_sum.wrapping_sub(pad_value)
                } else {
                    total_sum.wrapping_add(pad_value)
                };

                slots[index] = slots[index].wrapping_add(local_sum);

                // keep the total consistent with the slot's new sign
                let s2 = (slots[index] >> 31) as i32;
                total_sum =
                    total_sum.wrapping_sub(2u32.wrapping_mul(pad_value.wrapping_mul((s2 - s1) as u32)));
            }
        }
    }

    for (k, slot) in slots.iter().enumerate() {
        store32(bytes, SMALL_PAD_LEN - SLOT_LENGTH + k, *slot);
    }
}

// Stage 3: the memory-hard core. Two 42-word circular buffers primed from
// pad-derived addresses, one AES round per iteration, and a 16-way dispatch
// on successive nibbles of the running result. The digest falls out of the
// last four iterations.
fn stage_3(bytes: &mut [u8]) -> Hash {
    let key = Block::default();
    let mut block = Block::default();

    let last = load64(bytes, MEMORY_SIZE - 1);
    let mut addr_a = (last >> 15) & 0x7FFF;
    let mut addr_b = last & 0x7FFF;

    let mut buffer_a = [0u64; BUFFER_SIZE];
    let mut buffer_b = [0u64; BUFFER_SIZE];
    for i in 0..BUFFER_SIZE as u64 {
        buffer_a[i as usize] = load64(bytes, ((addr_a + i) % MEMORY_SIZE as u64) as usize);
        buffer_b[i as usize] = load64(bytes, ((addr_b + i) % MEMORY_SIZE as u64) as usize);
    }

    let mut digest = [0u8; HASH_SIZE];

    for i in 0..SCRATCHPAD_ITERS {
        let mem_a = buffer_a[i % BUFFER_SIZE];
        let mem_b = buffer_b[i % BUFFER_SIZE];

        block[..8].copy_from_slice(&mem_b.to_le_bytes());
        block[8..].copy_from_slice(&mem_a.to_le_bytes());
        aes::hazmat::cipher_round(&mut block, &key);

        let hash1 = u64::from_le_bytes(<[u8; 8]>::try_from(&block[..8]).unwrap());
        let mut result = !(hash1 ^ mem_a ^ mem_b);

        for j in 0..HASH_SIZE {
            let a = buffer_a[(j + i) % BUFFER_SIZE];
            let b = buffer_b[(j + i) % BUFFER_SIZE];

            result = match (result >> (j * 2)) & 0xf {
                0 => result.rotate_left(j as u32) ^ b,
                1 => !(result.rotate_left(j as u32) ^ a),
                2 => !(result ^ a),
                3 => result ^ b,
                4 => result ^ a.wrapping_add(b),
                5 => result ^ a.wrapping_sub(b),
                6 => result ^ b.wrapping_sub(a),
                7 => result ^ a.wrapping_mul(b),
                8 => result ^ (a & b),
                9 => result ^ (a | b),
                10 => result ^ (a ^ b),
                11 => result ^ a.wrapping_sub(result),
                12 => result ^ b.wrapping_sub(result),
                13 => result ^ a.wrapping_add(result),
                14 => result ^ result.wrapping_sub(a),
                15 => result ^ result.wrapping_sub(b),
                _ => unreachable!(),
            };
        }

        addr_b = result & 0x7FFF;
        buffer_a[i % BUFFER_SIZE] = result;
        buffer_b[i % BUFFER_SIZE] = load64(bytes, addr_b as usize);

        addr_a = (result >> 15) & 0x7FFF;
        store64(bytes, addr_a as usize, result);

        // the last four iterations stream the digest out, big-endian
        let index = SCRATCHPAD_ITERS - i - 1;
        if index < HASH_SIZE / 8 {
            digest[index * 8..(index + 1) * 8].copy_from_slice(&result.to_be_bytes());
        }
    }

    Hash::from(digest)
}

// Hash a full 200-byte block. Stage 1 overwrites every word of the pad, so a
// dirty scratchpad from a previous invocation is safe to pass back in.
pub fn hash(input: &[u8; INPUT_SIZE], pad: &mut ScratchPad) -> Hash {
    let mut lanes = [0u64; KECCAK_WORDS];
    for (lane, chunk) in lanes.iter_mut().zip(input.chunks_exact(8)) {
        *lane = u64::from_le_bytes(<[u8; 8]>::try_from(chunk).unwrap());
    }

    let bytes = pad.as_bytes_mut();
    stage_1(&mut lanes, bytes, (0, STAGE_1_MAX - 1), (0, KECCAK_WORDS - 1));
    stage_1(&mut lanes, bytes, (STAGE_1_MAX, STAGE_1_MAX), (0, 17));

    stage_2(bytes);
    stage_3(bytes)
}

// Hash a short input by zero-padding it to the 200-byte block.
pub fn hash_padded(input: &[u8], pad: &mut ScratchPad) -> Result<Hash, Error> {
    if input.len() > MAX_PADDED_INPUT {
        return Err(Error::InvalidInputLength);
    }

    let mut padded = [0u8; INPUT_SIZE];
    padded[..input.len()].copy_from_slice(input);
    Ok(hash(&padded, pad))
}
