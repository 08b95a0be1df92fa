//! 内容哈希
//!
//! 32 位 FNV-1a，按 UTF-16 码元计算，输出 base36 字符串，用作缓存键。
//!
//! 这里是标准 FNV-1a：异或与乘法都在 `u32` 上回绕。按浮点数运算、逐步截断为
//! 有符号 32 位整数的写法得到的值与此不同，两者的缓存键不通用。

const FNV_OFFSET_BASIS: u32 = 2_166_136_261;
const FNV_PRIME: u32 = 16_777_619;
const BASE36_DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// 计算文本的缓存键
pub fn content_hash(text: &str) -> String {
    let mut hash = FNV_OFFSET_BASIS;
    for unit in text.encode_utf16() {
        hash ^= u32::from(unit);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    to_base36(hash)
}

fn to_base36(mut value: u32) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::with_capacity(7);
    while value > 0 {
        digits.push(BASE36_DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}
