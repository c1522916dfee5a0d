use aes::Block;

use crate::{
    fill::chacha8_fill,
    math::{isqrt, wide},
    scratchpad::{load64, store64, xor64},
    Hash,
};

// Tweakable parameters; the pad is ~429 KiB
pub const MEMORY_SIZE: usize = 429 * 128;
pub const SCRATCHPAD_ITERS: usize = 3;
pub const BUFFER_SIZE: usize = MEMORY_SIZE / 2;

// Stage 3 AES round key
const KEY: [u8; 16] = *b"xelishash-pow-v2";

pub type ScratchPad = crate::scratchpad::ScratchPad<MEMORY_SIZE>;

// Stage 3: the pad is split into two halves and walked with data-dependent
// addresses on both sides. Each inner step reads three words, dispatches on a
// nibble of the running result, and mirrors a write-back pair across the
// halves, so no step can be reordered or batched.
fn stage_3(bytes: &mut [u8]) {
    let key = Block::from(KEY);
    let mut block = Block::default();

    let (half_a, half_b) = bytes.split_at_mut(BUFFER_SIZE * 8);
    let buffer_size = BUFFER_SIZE as u64;

    let mut addr_a = load64(half_b, BUFFER_SIZE - 1);
    let mut addr_b = load64(half_a, BUFFER_SIZE - 1) >> 32;
    let mut r: usize = 0;

    for i in 0..SCRATCHPAD_ITERS {
        let mem_a = load64(half_a, (addr_a % buffer_size) as usize);
        let mem_b = load64(half_b, (addr_b % buffer_size) as usize);

        block[..8].copy_from_slice(&mem_b.to_le_bytes());
        block[8..].copy_from_slice(&mem_a.to_le_bytes());
        aes::hazmat::cipher_round(&mut block, &key);

        let hash1 = u64::from_le_bytes(<[u8; 8]>::try_from(&block[..8]).unwrap());
        let mut result = !(hash1 ^ mem_a ^ mem_b);

        for j in 0..BUFFER_SIZE {
            let a = load64(half_a, (result % buffer_size) as usize);
            let b = load64(
                half_b,
                ((!result.rotate_right(r as u32)) % buffer_size) as usize,
            );
            // r scans the whole pad, crossing from half a into half b
            let c = if r < BUFFER_SIZE {
                load64(half_a, r)
            } else {
                load64(half_b, r - BUFFER_SIZE)
            };
            r = (r + 1) % MEMORY_SIZE;

            // the | 1, | 2, | 4, | 8 masks keep every divisor nonzero
            let v = match result.rotate_left(c as u32) & 0xf {
                0 => result ^ (c.rotate_left(i.wrapping_mul(j) as u32) ^ b),
                1 => result ^ (c.rotate_right(i.wrapping_mul(j) as u32) ^ a),
                2 => result ^ (a ^ b ^ c),
                3 => result ^ a.wrapping_add(b).wrapping_mul(c),
                4 => result ^ b.wrapping_sub(c).wrapping_mul(a),
                5 => result ^ c.wrapping_sub(a).wrapping_add(b),
                6 => result ^ a.wrapping_sub(b).wrapping_add(c),
                7 => result ^ b.wrapping_mul(c).wrapping_add(a),
                8 => result ^ c.wrapping_mul(a).wrapping_add(b),
                9 => result ^ a.wrapping_mul(b).wrapping_mul(c),
                10 => result ^ (wide(a, b) % (c | 1) as u128) as u64,
                11 => {
                    let divisor = wide(result.rotate_left(r as u32), a | 2);
                    result ^ (wide(b, c) % divisor) as u64
                }
                12 => result ^ (wide(c, a) / (b | 4) as u128) as u64,
                13 => {
                    let t1 = wide(result.rotate_left(r as u32), b);
                    let t2 = wide(a, c | 8);
                    result ^ if t1 > t2 { (t1 / t2) as u64 } else { a ^ b }
                }
                14 => result ^ (wide(b, a).wrapping_mul(c as u128) >> 64) as u64,
                15 => {
                    let t2 = wide(result.rotate_right(r as u32), b);
                    result ^ (wide(a, c).wrapping_mul(t2) >> 64) as u64
                }
                _ => unreachable!(),
            };

            result = v.rotate_left(1);

            let t = load64(half_a, BUFFER_SIZE - j - 1) ^ result;
            store64(half_a, BUFFER_SIZE - j - 1, t);
            xor64(half_b, j, t.rotate_right(result as u32));
        }

        addr_a = result;
        addr_b = isqrt(result);
    }
}

fn stage_4(bytes: &[u8]) -> Hash {
    let digest: [u8; 32] = blake3::hash(bytes).into();
    Hash::from(digest)
}

// Hash an arbitrary-length input. Stage 1 zeroes and refills the whole pad,
// so a dirty scratchpad from a previous invocation is safe to pass back in.
pub fn hash(input: &[u8], pad: &mut ScratchPad) -> Hash {
    chacha8_fill(input, pad);
    stage_3(pad.as_bytes_mut());
    stage_4(pad.as_bytes())
}

#[cfg(test)]
mod tests {
    use rand::{rngs::OsRng, RngCore};

    use super::*;

    #[test]
    fn zero_input() {
        let mut pad = ScratchPad::default();
        let digest = hash(&[0u8; 112], &mut pad);

        assert_eq!(
            digest,
            Hash::from_hex("7edb70f0748573902728a4691e9e2d7e4043ee34c823a11390d3d6e15fbe921b")
                .unwrap()
        );
    }

    #[test]
    fn fixed_input() {
        let input = [
            172, 236, 108, 212, 181, 31, 109, 45, 44, 242, 54, 225, 143, 133, 89, 44, 179, 108,
            39, 191, 32, 116, 229, 33, 63, 130, 33, 120, 185, 89, 146, 141, 10, 79, 183, 107, 238,
            122, 92, 222, 25, 134, 90, 107, 116, 110, 236, 53, 255, 5, 214, 126, 24, 216, 97, 199,
            148, 239, 253, 102, 199, 184, 232, 253, 158, 145, 86, 187, 112, 81, 78, 70, 80, 110,
            33, 37, 159, 233, 198, 1, 178, 108, 210, 100, 109, 155, 106, 124, 124, 83, 89, 50,
            197, 115, 231, 32, 74, 2, 92, 47, 25, 220, 135, 249, 122, 172, 220, 137, 143, 234, 68,
            188,
        ];

        let mut pad = ScratchPad::default();
        let digest = hash(&input, &mut pad);

        assert_eq!(
            digest,
            Hash::from_hex("c7729a1c04a4c4b2751194cb7de43391a2de6acacd37f4b25e1df8f262dd9eb3")
                .unwrap()
        );
    }

    #[test]
    fn reused_scratchpad() {
        let mut pad = ScratchPad::default();
        let mut input = [0u8; 112];
        OsRng.fill_bytes(&mut input);

        let first = hash(&input, &mut pad);
        let second = hash(&input, &mut pad);
        assert_eq!(first, second);
    }
}
