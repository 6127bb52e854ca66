//! OS-backed CSPRNG wrapper: unbiased range sampling and random alnum
//! strings.
//!
//! `fill` pulls bytes straight from the OS CSPRNG. `range`/`range64` do
//! rejection sampling against the unbiased ceiling `n.wrapping_neg() %
//! n` rather than a plain modulo, so the last partial bucket of the
//! output range never gets picked more often than the rest. `rand_az`
//! builds alnum strings one unbiased draw at a time, used for temp-file
//! suffixes.

/// Fill `out` with cryptographically secure random bytes from the OS.
///
/// Retries on interrupt (`getrandom::Error::INTERRUPTED` surfaces as a
/// retryable condition on Unix); any other failure means the system's
/// entropy source is unusable, which this library treats as
/// non-recoverable and aborts the process: entropy starvation has no
/// safe fallback for code that mints keys and nonces.
pub fn fill(out: &mut [u8]) {
    loop {
        match getrandom::getrandom(out) {
            Ok(()) => return,
            Err(err) if would_retry(err) => continue,
            Err(err) => {
                panic!("lumimaja-core: OS CSPRNG failure, aborting: {err}");
            }
        }
    }
}

fn would_retry(err: getrandom::Error) -> bool {
    err.raw_os_error() == Some(libc_eintr())
}

#[cfg(unix)]
fn libc_eintr() -> i32 {
    4 // EINTR, stable across all Unix targets this crate supports
}

#[cfg(not(unix))]
fn libc_eintr() -> i32 {
    -1 // never matches; non-Unix getrandom backends don't report EINTR
}

fn random_u32() -> u32 {
    let mut buf = [0u8; 4];
    fill(&mut buf);
    u32::from_ne_bytes(buf)
}

fn random_u64() -> u64 {
    let mut buf = [0u8; 8];
    fill(&mut buf);
    u64::from_ne_bytes(buf)
}

/// Returns a uniform `u32` in `[0, n)` with no modulo bias, via rejection
/// sampling. `range(1)` returns 0. `range(0)` is undefined (panics).
pub fn range(n: u32) -> u32 {
    assert!(n > 0, "rng::range(0) is undefined");
    if n > 1 {
        let ceil = n.wrapping_neg() % n;
        loop {
            let r = random_u32();
            if r >= ceil {
                return r % n;
            }
        }
    } else {
        0
    }
}

/// 64-bit analogue of [`range`].
pub fn range64(n: u64) -> u64 {
    assert!(n > 0, "rng::range64(0) is undefined");
    if n > 1 {
        let ceil = n.wrapping_neg() % n;
        loop {
            let r = random_u64();
            if r >= ceil {
                return r % n;
            }
        }
    } else {
        0
    }
}

const AZ_ALPHABET: &[u8; 36] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Random string of `len` characters from the 36-character alphabet
/// `a-z0-9`, one `range(36)` draw per position. Used for the write-path
/// temp-file suffix (`<path>.<8 alnum>.tmp`).
pub fn rand_az(len: usize) -> String {
    let mut s = String::with_capacity(len);
    for _ in 0..len {
        let idx = range(AZ_ALPHABET.len() as u32) as usize;
        s.push(AZ_ALPHABET[idx] as char);
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_never_reaches_bound() {
        for _ in 0..10_000 {
            assert!(range(7) < 7);
        }
    }

    #[test]
    fn range_of_one_is_always_zero() {
        for _ in 0..100 {
            assert_eq!(range(1), 0);
        }
    }

    #[test]
    #[should_panic]
    fn range_of_zero_panics() {
        range(0);
    }

    #[test]
    fn range64_never_reaches_bound() {
        for _ in 0..10_000 {
            assert!(range64(1_000_003) < 1_000_003);
        }
    }

    #[test]
    fn rand_az_uses_expected_alphabet() {
        let s = rand_az(64);
        assert_eq!(s.len(), 64);
        assert!(
            s.bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
        );
    }

    #[test]
    fn range_distribution_is_roughly_uniform() {
        // Coarse chi-squared-style sanity check, not a rigorous test:
        // over many draws each bucket should land within a generous
        // tolerance of the expected count.
        const N: u32 = 10;
        const SAMPLES: u32 = 200_000;
        let mut counts = [0u32; N as usize];
        for _ in 0..SAMPLES {
            counts[range(N) as usize] += 1;
        }
        let expected = SAMPLES / N;
        for count in counts {
            let diff = count.abs_diff(expected);
            assert!(
                diff < expected / 5,
                "bucket count {count} too far from expected {expected}"
            );
        }
    }
}
