//! Integer factorization backend for the PicoCoin proof-of-work.
//!
//! The puzzle integers are derived from SHA3-256 prefixes, so they start at
//! 112 bits and grow with horizontal difficulty. `factor` combines trial
//! division, Miller–Rabin primality testing and Brent's cycle variant of
//! Pollard's rho, all over `num-bigint`.

use std::collections::BTreeMap;

use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::{One, Zero};

/// Trial-division bound applied before switching to rho.
const TRIAL_DIVISION_BOUND: u64 = 10_000;

/// Miller–Rabin witnesses. Deterministic for all n < 3.3 * 10^24; a strong
/// probabilistic test beyond that.
const MR_WITNESSES: [u32; 12] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37];

// ── Primality ────────────────────────────────────────────────────────────────

/// Miller–Rabin primality test.
pub fn is_prime(n: &BigUint) -> bool {
    let two = BigUint::from(2u32);
    if n < &two {
        return false;
    }
    if n == &two {
        return true;
    }
    if n.is_even() {
        return false;
    }

    // Write n - 1 = d * 2^s with d odd.
    let n_minus_one = n - 1u32;
    let s = n_minus_one.trailing_zeros().unwrap_or(0);
    let d = &n_minus_one >> s;

    'witness: for &a in &MR_WITNESSES {
        let a = BigUint::from(a);
        if &a >= n {
            continue;
        }
        let mut x = a.modpow(&d, n);
        if x.is_one() || x == n_minus_one {
            continue;
        }
        for _ in 1..s {
            x = x.modpow(&two, n);
            if x == n_minus_one {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

// ── Factorization ────────────────────────────────────────────────────────────

/// Factor `n` into `{prime: multiplicity}` with keys in ascending numeric
/// order. `factor(1)` is the empty map (the empty product); `factor(0)` is
/// `{0: 1}`, which no verifier accepts as a prime factorization.
pub fn factor(n: &BigUint) -> BTreeMap<BigUint, u32> {
    let mut factors = BTreeMap::new();

    if n.is_zero() {
        factors.insert(BigUint::zero(), 1);
        return factors;
    }
    if n.is_one() {
        return factors;
    }

    let mut m = n.clone();

    // Strip small primes first; most puzzle integers fall apart here.
    let mut d = 2u64;
    while d < TRIAL_DIVISION_BOUND {
        let big_d = BigUint::from(d);
        if &big_d * &big_d > m {
            break;
        }
        while (&m % &big_d).is_zero() {
            *factors.entry(big_d.clone()).or_insert(0) += 1;
            m /= &big_d;
        }
        d = if d == 2 { 3 } else { d + 2 };
    }

    if m.is_one() {
        return factors;
    }

    // Split the remaining cofactor recursively with rho.
    let mut stack = vec![m];
    while let Some(m) = stack.pop() {
        if is_prime(&m) {
            *factors.entry(m).or_insert(0) += 1;
            continue;
        }
        let d = rho_split(&m);
        stack.push(&m / &d);
        stack.push(d);
    }

    factors
}

/// Rebuild the integer a factorization describes: the product of
/// prime^multiplicity over all entries.
pub fn defact(factors: &BTreeMap<BigUint, u32>) -> BigUint {
    factors
        .iter()
        .fold(BigUint::one(), |acc, (p, m)| acc * p.pow(*m))
}

/// Find one non-trivial divisor of composite `m`, retrying Brent's rho with
/// successive polynomial offsets until it succeeds.
fn rho_split(m: &BigUint) -> BigUint {
    if m.is_even() {
        return BigUint::from(2u32);
    }
    for c in 1u64.. {
        if let Some(d) = brent_rho(m, &BigUint::from(c)) {
            return d;
        }
    }
    unreachable!("rho exhausted every polynomial offset")
}

/// Brent's variant of Pollard's rho on x² + c mod n. Returns a non-trivial
/// divisor, or None when this offset collapses to the trivial cycle.
fn brent_rho(n: &BigUint, c: &BigUint) -> Option<BigUint> {
    let one = BigUint::one();
    let batch = 128u64;

    let mut y = BigUint::from(2u32);
    let mut g = one.clone();
    let mut q = one.clone();
    let mut ys = y.clone();
    let mut r = 1u64;
    let mut x;

    loop {
        x = y.clone();
        for _ in 0..r {
            y = (&y * &y + c) % n;
        }
        let mut k = 0u64;
        while k < r && g.is_one() {
            ys = y.clone();
            for _ in 0..batch.min(r - k) {
                y = (&y * &y + c) % n;
                q = (&q * abs_diff(&x, &y)) % n;
            }
            g = q.gcd(n);
            k += batch;
        }
        r *= 2;
        if !g.is_one() {
            break;
        }
    }

    if g == *n {
        // The batched gcd skipped past the divisor; replay one step at a time.
        loop {
            ys = (&ys * &ys + c) % n;
            g = abs_diff(&x, &ys).gcd(n);
            if !g.is_one() {
                break;
            }
        }
    }

    if g == *n {
        None
    } else {
        Some(g)
    }
}

fn abs_diff(a: &BigUint, b: &BigUint) -> BigUint {
    if a > b {
        a - b
    } else {
        b - a
    }
}
