use rand::Rng;

/// Six-digit one-time code, never starting with zero.
pub fn generate_six_digit_code() -> String {
    let mut rng = rand::thread_rng();
    rng.gen_range(100_000..=999_999u32).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_six_digit_code() {
        for _ in 0..50 {
            let code = generate_six_digit_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
            assert_ne!(code.chars().next(), Some('0'));
        }
    }
}
