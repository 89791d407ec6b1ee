pub mod url_validator;

/// 别名字符集（URL 安全）
const ALIAS_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_-";

pub fn generate_alias_id(length: usize) -> String {
    std::iter::repeat_with(|| ALIAS_ALPHABET[rand::random_range(0..ALIAS_ALPHABET.len())] as char)
        .take(length)
        .collect()
}

/// Ids of the wrong length or alphabet are treated as unknown.
pub fn is_valid_alias_id(id: &str, length: usize) -> bool {
    id.len() == length && id.bytes().all(|b| ALIAS_ALPHABET.contains(&b))
}
