use aes::Block;

use crate::{
    fill::chacha8_fill,
    math::{isqrt, wide},
    scratchpad::{load64, store64, xor64},
    Hash,
};

// Tweakable parameters; the pad is ~531 KiB
pub const MEMORY_SIZE: usize = 531 * 128;
pub const SCRATCHPAD_ITERS: usize = 2;
pub const BUFFER_SIZE: usize = MEMORY_SIZE / 2;

// Stage 3 AES round key
const KEY: [u8; 16] = *b"xelishash-pow-v3";

pub type ScratchPad = crate::scratchpad::ScratchPad<MEMORY_SIZE>;

// xorshift-multiply avalanche behind the index mapping and the half selector.
// The 55/32/15 shift schedule is consensus-critical; do not swap in the
// textbook 33/33/33 finalizer.
#[inline(always)]
fn mix64(mut x: u64) -> u64 {
    x ^= x >> 55;
    x = x.wrapping_mul(0xff51afd7ed558ccd);
    x ^= x >> 32;
    x = x.wrapping_mul(0xc4ceb9fe1a85ec53);
    x ^= x >> 15;
    x
}

// Half an avalanche pass, then a multiply-high reduction into
// [0, BUFFER_SIZE) with no modulo bias
#[inline(always)]
fn map_index(mut x: u64) -> usize {
    x ^= x >> 33;
    x = x.wrapping_mul(0xff51afd7ed558ccd);
    ((x as u128 * BUFFER_SIZE as u128) >> 64) as usize
}

// Uniform selector between the two pad halves
#[inline(always)]
fn pick_half(seed: u64) -> bool {
    (mix64(seed) & (1u64 << 58)) != 0
}

#[inline(always)]
fn mulmod(a: u64, b: u64, m: u64) -> u64 {
    ((a as u128 * b as u128) % m as u128) as u64
}

// Square-and-multiply (base ^ exp) mod modulus; a zero modulus maps to 0
fn modpow(mut base: u64, mut exp: u64, modulus: u64) -> u64 {
    if modulus == 0 {
        return 0;
    }

    let mut result = 1u64;
    base %= modulus;
    while exp > 0 {
        if exp & 1 == 1 {
            result = mulmod(result, base, modulus);
        }
        base = mulmod(base, base, modulus);
        exp >>= 1;
    }

    result
}

// Stage 3: same half-split walk as v2, but every address goes through the
// multiply-high mapping, the write side is chosen by pick_half, and the outer
// addresses feed back through modpow and isqrt.
fn stage_3(bytes: &mut [u8]) {
    let key = Block::from(KEY);
    let mut block = Block::default();

    let (half_a, half_b) = bytes.split_at_mut(BUFFER_SIZE * 8);

    let mut addr_a = load64(half_b, BUFFER_SIZE - 1);
    let mut addr_b = load64(half_a, BUFFER_SIZE - 1) >> 32;
    let mut r: usize = 0;

    for i in 0..SCRATCHPAD_ITERS {
        let mem_a = load64(half_a, map_index(addr_a));
        let mem_b = load64(half_b, map_index(mem_a ^ addr_b));

        block[..8].copy_from_slice(&mem_b.to_le_bytes());
        block[8..].copy_from_slice(&mem_a.to_le_bytes());
        aes::hazmat::cipher_round(&mut block, &key);

        let hash1 = u64::from_le_bytes(<[u8; 8]>::try_from(&block[..8]).unwrap());
        let hash2 = u64::from_le_bytes(<[u8; 8]>::try_from(&block[8..]).unwrap());
        let mut result = !(hash1 ^ hash2);

        for j in 0..BUFFER_SIZE {
            let a = load64(half_a, map_index(result));
            let b = load64(half_b, map_index(a ^ !result.rotate_right(r as u32)));
            let c = if r < BUFFER_SIZE {
                load64(half_a, r)
            } else {
                load64(half_b, r - BUFFER_SIZE)
            };
            r = (r + 1) % MEMORY_SIZE;

            let v = match result.rotate_left(c as u32) & 0xf {
                0 => {
                    let t1 = wide(a.wrapping_add(i as u64), isqrt(b.wrapping_add(j as u64)));
                    let denom = mix64(c ^ result ^ i as u64 ^ j as u64) | 1;
                    (t1 % denom as u128) as u64
                }
                // isqrt(b | 2) >= 1, so the remainder is safe
                1 => {
                    let t1 = c.wrapping_add(i as u64) % isqrt(b | 2);
                    t1.rotate_left(i.wrapping_add(j) as u32)
                        .wrapping_mul(isqrt(a.wrapping_add(j as u64)))
                }
                2 => {
                    let t1 = isqrt(a.wrapping_add(i as u64));
                    let t2 = isqrt(c.wrapping_add(j as u64));
                    t1.wrapping_mul(t2) ^ b.wrapping_add(i as u64).wrapping_add(j as u64)
                }
                3 => a.wrapping_add(b).wrapping_mul(c),
                4 => b.wrapping_sub(c).wrapping_mul(a),
                5 => c.wrapping_sub(a).wrapping_add(b),
                6 => a.wrapping_sub(b).wrapping_add(c),
                7 => b.wrapping_mul(c).wrapping_add(a),
                8 => c.wrapping_mul(a).wrapping_add(b),
                9 => a.wrapping_mul(b).wrapping_mul(c),
                10 => (wide(a, b) % (c | 1) as u128) as u64,
                11 => {
                    let t1 = wide(b, c);
                    let t2 = wide(result.rotate_left(r as u32), a | 2);
                    if t2 > t1 {
                        c
                    } else {
                        (t1 % t2) as u64
                    }
                }
                12 => (wide(c, a) / (b | 4) as u128) as u64,
                13 => {
                    let t1 = wide(result.rotate_left(r as u32), b);
                    let t2 = wide(a, c | 8);
                    if t1 > t2 {
                        (t1 / t2) as u64
                    } else {
                        a ^ b
                    }
                }
                14 => (wide(b, a).wrapping_mul(c as u128) >> 64) as u64,
                15 => {
                    let t2 = wide(result.rotate_right(r as u32), b);
                    (wide(a, c).wrapping_mul(t2) >> 64) as u64
                }
                _ => unreachable!(),
            };

            let seed = v ^ result;
            result = seed.rotate_left(r as u32);

            let index_t = map_index(seed);
            let t = if pick_half(v) {
                load64(half_b, index_t)
            } else {
                load64(half_a, index_t)
            } ^ result;

            let index_a = map_index(t ^ result ^ 0x9e3779b97f4a7c15);
            let index_b = map_index(index_a as u64 ^ !result ^ 0xd2b74407b1ce6e93);

            let evicted = load64(half_a, index_a);
            store64(half_a, index_a, t);
            xor64(half_b, index_b, evicted ^ t.rotate_right(i.wrapping_add(j) as u32));
        }

        addr_a = modpow(addr_a, addr_b, result);
        addr_b = isqrt(result)
            .wrapping_mul(r as u64 + 1)
            .wrapping_mul(isqrt(addr_a));
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
            Hash::from_hex("69ac67285efd5ca22afc05c4ecee5bda169de4e9ef08fa39d4a6798494cd67a3")
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
            Hash::from_hex("f208b0decb1b68bb162844494f4f41538a650a74c22999155ca30ccee79c4653")
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

    #[test]
    fn map_index_stays_in_bounds() {
        for x in 0..10_000u64 {
            assert!(map_index(x) < BUFFER_SIZE);
        }
        assert!(map_index(0) < BUFFER_SIZE);
        assert!(map_index(u64::MAX) < BUFFER_SIZE);

        let mut rng = OsRng;
        for _ in 0..100_000 {
            assert!(map_index(rng.next_u64()) < BUFFER_SIZE);
        }
    }

    #[test]
    fn pick_half_is_balanced() {
        let mut rng = OsRng;
        let mut ones = 0u32;
        const SAMPLES: u32 = 100_000;

        for _ in 0..SAMPLES {
            if pick_half(rng.next_u64()) {
                ones += 1;
            }
        }

        let ratio = ones as f64 / SAMPLES as f64;
        assert!(
            (ratio - 0.5).abs() < 0.05,
            "pick_half is not balanced: ratio = {ratio}"
        );
    }

    #[test]
    fn modpow_basics() {
        assert_eq!(modpow(2, 10, 1_000), 24);
        assert_eq!(modpow(3, 0, 7), 1);
        assert_eq!(modpow(7, 13, 11), 7u64.pow(13) % 11);
        // zero modulus maps to zero rather than dividing by it
        assert_eq!(modpow(5, 3, 0), 0);
    }
}
