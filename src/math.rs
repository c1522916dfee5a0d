// 128-bit value from two 64-bit halves
#[inline(always)]
pub(crate) const fn wide(hi: u64, lo: u64) -> u128 {
    ((hi as u128) << 64) | lo as u128
}

// Integer floor square root by Newton's method.
// The seed is ceil(n / 2), written so it cannot wrap at n = u64::MAX; from
// there the iteration decreases monotonically onto the floor.
pub(crate) fn isqrt(n: u64) -> u64 {
    if n < 2 {
        return n;
    }

    let mut x = n;
    let mut y = (x >> 1) + (x & 1);
    while y < x {
        x = y;
        y = (x + n / x) >> 1;
    }

    x
}
