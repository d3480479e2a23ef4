/// Distance from an ASCII capital letter to its regional indicator symbol
const REGIONAL_INDICATOR_OFFSET: u32 = 0x1F1E6 - 'A' as u32;

/// Converts a two-letter country code into its flag emoji.
///
/// Codes are case-insensitive. Anything that is not exactly two ASCII letters gives an empty string.
pub fn country_code_to_flag(code: &str) -> String {
    let mut chars = code.chars();
    let letters = match (chars.next(), chars.next(), chars.next()) {
        (Some(first), Some(second), None) => [first, second],
        _ => return String::new(),
    };
    if !letters.iter().all(char::is_ascii_alphabetic) {
        return String::new();
    }
    letters
        .iter()
        .filter_map(|c| char::from_u32(c.to_ascii_uppercase() as u32 + REGIONAL_INDICATOR_OFFSET))
        .collect()
}
