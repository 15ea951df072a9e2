//! 6-character nanoid generation over the 62-symbol alphanumeric alphabet,
//! with bounded collision retry.

use crate::error::DialogError;

const ALPHABET: [char; 62] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i',
    'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z', 'A', 'B',
    'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R', 'S', 'T', 'U',
    'V', 'W', 'X', 'Y', 'Z',
];

const ID_LENGTH: usize = 6;
const MAX_ATTEMPTS: usize = 10;

/// Generate an id not already accepted by `exists`, retrying up to 10
/// times before giving up with `IdExhausted`.
pub fn generate_unique_id(mut exists: impl FnMut(&str) -> Result<bool, DialogError>) -> Result<String, DialogError> {
    for _ in 0..MAX_ATTEMPTS {
        let candidate = nanoid::nanoid!(ID_LENGTH, &ALPHABET);
        if !exists(&candidate)? {
            return Ok(candidate);
        }
    }
    Err(DialogError::IdExhausted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_six_char_ids() {
        let id = generate_unique_id(|_| Ok(false)).expect("generate");
        assert_eq!(id.len(), ID_LENGTH);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn retries_on_collision_then_exhausts() {
        let result = generate_unique_id(|_| Ok(true));
        assert!(matches!(result, Err(DialogError::IdExhausted)));
    }

    #[test]
    fn succeeds_after_a_few_collisions() {
        let mut attempts = 0;
        let result = generate_unique_id(|_| {
            attempts += 1;
            Ok(attempts < 3)
        });
        assert!(result.is_ok());
        assert_eq!(attempts, 3);
    }
}
