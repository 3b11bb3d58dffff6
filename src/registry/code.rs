//! Room code generation.

use crate::models::RoomCode;
use rand::Rng;

pub const CODE_LENGTH: usize = 6;

/// Upper-case letters and digits without the look-alikes 0/O and 1/I/L.
pub const ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

/// Draw a code that `taken` rejects for none of the live rooms.
pub fn generate_unique(rng: &mut impl Rng, taken: impl Fn(&str) -> bool) -> RoomCode {
    loop {
        let code = generate(rng);
        if !taken(&code) {
            return code;
        }
    }
}

pub fn generate(rng: &mut impl Rng) -> RoomCode {
    (0..CODE_LENGTH)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

/// Canonical form of a code typed by a user.
pub fn normalize(code: &str) -> RoomCode {
    code.trim().to_ascii_uppercase()
}

/// Whether `code` could have come from `generate`.
pub fn is_well_formed(code: &str) -> bool {
    code.len() == CODE_LENGTH && code.bytes().all(|b| ALPHABET.contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn codes_use_the_unambiguous_alphabet() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..200 {
            let code = generate(&mut rng);
            assert!(is_well_formed(&code), "{code}");
            assert!(!code.contains(['0', 'O', '1', 'I', 'L']));
        }
    }

    #[test]
    fn generate_unique_skips_taken_codes() {
        let first = generate(&mut StdRng::seed_from_u64(9));
        let code = generate_unique(&mut StdRng::seed_from_u64(9), |c| c == first);
        assert_ne!(code, first);
    }

    #[test]
    fn normalize_trims_and_upcases() {
        assert_eq!(normalize("  k7qx3m "), "K7QX3M");
    }
}
