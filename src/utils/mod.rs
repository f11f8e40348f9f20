pub mod password;
pub mod validation;

/// 生成指定长度的随机字母数字串
pub fn generate_random_code(length: usize) -> String {
    use std::iter;

    let chars = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

    iter::repeat_with(|| chars[rand::random_range(0..chars.len())] as char)
        .take(length)
        .collect()
}

/// 生成大写字母数字随机串（推荐码、证书编号）
pub fn generate_upper_code(length: usize) -> String {
    use std::iter;

    // 去掉易混淆的 0/O/1/I
    let chars = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

    iter::repeat_with(|| chars[rand::random_range(0..chars.len())] as char)
        .take(length)
        .collect()
}
