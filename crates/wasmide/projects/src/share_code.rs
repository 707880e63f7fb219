use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of characters in a share code.
pub const SHARE_CODE_LEN: usize = 8;

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Short random token granting read and fork access to a shared project.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShareCode(String);

impl ShareCode {
    /// A fresh code from the thread-local RNG.
    pub fn generate() -> Self {
        Self::generate_with(&mut rand::thread_rng())
    }

    pub fn generate_with<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let code = (0..SHARE_CODE_LEN)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
            .collect();
        Self(code)
    }

    /// Accept `raw` only if it has the shape of a generated code.
    pub fn parse(raw: &str) -> Option<Self> {
        let valid = raw.len() == SHARE_CODE_LEN && raw.bytes().all(|b| b.is_ascii_alphabetic());
        valid.then(|| Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShareCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn rejects_malformed_codes() {
        assert!(ShareCode::parse("abcdEFGH").is_some());
        assert!(ShareCode::parse("abcdEFG").is_none());
        assert!(ShareCode::parse("abcdEFG1").is_none());
        assert!(ShareCode::parse("abcdEFGHI").is_none());
        assert!(ShareCode::parse("").is_none());
    }

    #[test]
    fn codes_rarely_repeat() {
        let mut rng = StdRng::seed_from_u64(7);
        let codes: HashSet<_> = (0..10_000).map(|_| ShareCode::generate_with(&mut rng)).collect();
        assert_eq!(codes.len(), 10_000);
    }

    proptest! {
        #[test]
        fn generated_codes_are_well_formed(seed in any::<u64>()) {
            let code = ShareCode::generate_with(&mut StdRng::seed_from_u64(seed));
            prop_assert_eq!(code.as_str().len(), SHARE_CODE_LEN);
            prop_assert!(code.as_str().bytes().all(|b| b.is_ascii_alphabetic()));
            prop_assert_eq!(ShareCode::parse(code.as_str()), Some(code));
        }
    }
}
