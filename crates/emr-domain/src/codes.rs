//! 患者编号生成
//!
//! 患者编号为"P"+4位零填充数字，按既有最大编号递增。

use emr_core::{EmrError, Result};
use regex::Regex;

/// 生成下一个患者编号
///
/// 不符合P0000格式的既有编号不参与取最大值；编号空间上限为P9999，
/// 耗尽时返回 `ExhaustedCodeSpace`。
pub fn generate_patient_code(existing_codes: &[String]) -> Result<String> {
    let pattern = Regex::new(r"^P\d{4}$").unwrap();
    let max = existing_codes
        .iter()
        .filter(|code| pattern.is_match(code))
        .filter_map(|code| code[1..].parse::<u32>().ok())
        .max()
        .unwrap_or(0);
    if max >= 9999 {
        return Err(EmrError::ExhaustedCodeSpace);
    }
    Ok(format!("P{:04}", max + 1))
}
