//! 解码前的记录尺寸检查。
//!
//! `shapefile` 按记录声明的部件数、顶点数预先分配内存，损坏的计数会直接耗尽内存，
//! 因此在交给它解码之前先核对计数与记录内容长度。

const HEADER_LEN: usize = 100;
const RECORD_HEADER_LEN: usize = 8;
/// 多部件记录中部件数之前的字节：形状类型 + 包围盒。
const MULTI_PART_PREFIX: usize = 4 + 32;

/// 顺序遍历记录，返回第一条计数与长度不符的记录序号及原因。
pub(crate) fn first_oversized_record(data: &[u8]) -> Option<(usize, String)> {
    let declared = be_i32(data, 24)
        .and_then(|words| usize::try_from(words).ok())
        .map(|words| words.saturating_mul(2))
        .unwrap_or(data.len());
    let limit = declared.min(data.len());

    let mut position = HEADER_LEN;
    let mut index = 0;
    while position + RECORD_HEADER_LEN <= limit {
        let Some(len_words) = be_i32(data, position + 4) else {
            break;
        };
        let Ok(len_words) = usize::try_from(len_words) else {
            return Some((index, format!("记录长度为负数: {len_words}")));
        };
        let start = position + RECORD_HEADER_LEN;
        let end = start.saturating_add(len_words.saturating_mul(2));
        let Some(content) = data.get(start..end) else {
            return Some((index, format!("内容越过文件末尾（偏移 {start}）")));
        };
        if let Err(message) = check_counts(content) {
            return Some((index, message));
        }
        position = end;
        index += 1;
    }
    None
}

fn check_counts(content: &[u8]) -> Result<(), String> {
    let Some(code) = le_i32(content, 0) else {
        return Err("记录缺少形状类型".to_string());
    };
    let needed = match code {
        // PolyLine / Polygon 及其 Z、M 变体，Multipatch
        3 | 5 | 13 | 15 | 23 | 25 | 31 => {
            let parts = count(content, MULTI_PART_PREFIX, "部件数")?;
            let points = count(content, MULTI_PART_PREFIX + 4, "点数")?;
            (MULTI_PART_PREFIX + 8)
                .saturating_add(parts.saturating_mul(4))
                .saturating_add(points.saturating_mul(16))
        }
        // MultiPoint 及其 Z、M 变体
        8 | 18 | 28 => {
            let points = count(content, MULTI_PART_PREFIX, "点数")?;
            (MULTI_PART_PREFIX + 4).saturating_add(points.saturating_mul(16))
        }
        _ => return Ok(()),
    };
    if needed > content.len() {
        return Err(format!(
            "声明的计数需要 {needed} 字节，但记录内容只有 {} 字节",
            content.len()
        ));
    }
    Ok(())
}

fn count(content: &[u8], offset: usize, what: &str) -> Result<usize, String> {
    let value = le_i32(content, offset).ok_or_else(|| format!("记录过短，缺少{what}"))?;
    usize::try_from(value).map_err(|_| format!("{what}为负数: {value}"))
}

fn be_i32(data: &[u8], offset: usize) -> Option<i32> {
    let bytes = data.get(offset..offset + 4)?;
    bytes.try_into().ok().map(i32::from_be_bytes)
}

fn le_i32(data: &[u8], offset: usize) -> Option<i32> {
    let bytes = data.get(offset..offset + 4)?;
    bytes.try_into().ok().map(i32::from_le_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_with(content: &[u8]) -> Vec<u8> {
        let mut data = vec![0u8; HEADER_LEN];
        data[0..4].copy_from_slice(&9994i32.to_be_bytes());
        let total = HEADER_LEN + RECORD_HEADER_LEN + content.len();
        data[24..28].copy_from_slice(&((total / 2) as i32).to_be_bytes());
        data.extend_from_slice(&1i32.to_be_bytes());
        data.extend_from_slice(&((content.len() / 2) as i32).to_be_bytes());
        data.extend_from_slice(content);
        data
    }

    fn polyline(parts: i32, points: i32, vertices: usize) -> Vec<u8> {
        let mut content = 3i32.to_le_bytes().to_vec();
        content.extend_from_slice(&[0u8; 32]);
        content.extend_from_slice(&parts.to_le_bytes());
        content.extend_from_slice(&points.to_le_bytes());
        content.extend_from_slice(&0i32.to_le_bytes());
        content.extend(std::iter::repeat_n(0u8, vertices * 16));
        content
    }

    #[test]
    fn consistent_records_pass() {
        assert_eq!(first_oversized_record(&file_with(&polyline(1, 2, 2))), None);

        let mut point = 1i32.to_le_bytes().to_vec();
        point.extend_from_slice(&[0u8; 16]);
        assert_eq!(first_oversized_record(&file_with(&point)), None);
    }

    #[test]
    fn huge_part_count_is_flagged() {
        let data = file_with(&polyline(i32::MAX, 1, 1));
        let (index, message) = first_oversized_record(&data).expect("应发现异常记录");
        assert_eq!(index, 0);
        assert!(message.contains("字节"));
    }

    #[test]
    fn negative_counts_and_truncation_are_flagged() {
        let data = file_with(&polyline(-1, 1, 1));
        assert!(first_oversized_record(&data).is_some_and(|(_, m)| m.contains("负数")));

        let mut data = file_with(&polyline(1, 2, 2));
        data.truncate(data.len() - 8);
        data[24..28].copy_from_slice(&(((HEADER_LEN + 200) / 2) as i32).to_be_bytes());
        assert!(first_oversized_record(&data).is_some_and(|(index, _)| index == 0));
    }
}
