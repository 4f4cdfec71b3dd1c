// ==========================================
// 药房配送协同系统 - 地名规范化
// ==========================================
// 城市/街区键名的唯一比较口径: 配置校验与区域解析共用
// ==========================================

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// 规范化地名: 去首尾空白、合并内部空白、小写、去除变音符号
pub fn normalize_place_name(input: &str) -> String {
    let stripped: String = input
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase();

    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}
