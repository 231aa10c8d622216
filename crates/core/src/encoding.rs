use std::borrow::Cow;

use encoding_rs::{UTF_16LE, UTF_8};

/// Number of leading bytes inspected when guessing the encoding.
pub const SAMPLE_LIMIT: usize = 4096;
/// Minimum share of NUL bytes at one parity before UTF-16 is assumed.
pub const UTF16_NUL_FRACTION: f64 = 0.2;
/// How many times more NULs one parity must carry than the other.
pub const UTF16_NUL_RATIO: f64 = 1.5;

/// 偵測到的偏好設定檔編碼。 / Encoding chosen for a preferences buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectedEncoding {
    Utf8,
    Utf16Le,
    Utf16Be,
}

/// 將位元組解碼為去除 NUL 的文字，永不失敗。 / Decodes a buffer of unknown encoding into NUL-free text. Never fails.
pub fn normalize_bytes(bytes: &[u8]) -> String {
    let (encoding, has_bom) = detect_encoding(bytes);
    let text = match encoding {
        DetectedEncoding::Utf16Le => {
            let payload = if has_bom { &bytes[2..] } else { bytes };
            decode_utf16_le(payload)
        }
        DetectedEncoding::Utf16Be => {
            let payload = if has_bom { &bytes[2..] } else { bytes };
            decode_utf16_le(&swap_byte_pairs(payload))
        }
        DetectedEncoding::Utf8 => {
            let (cow, _had_errors) = UTF_8.decode_with_bom_removal(bytes);
            cow.into_owned()
        }
    };
    strip_nul(text)
}

/// 依 BOM 或 NUL 分布推斷編碼；第二個值表示是否有 UTF-16 BOM。 / Guesses the encoding from a BOM or the NUL distribution; the flag reports a UTF-16 BOM.
pub fn detect_encoding(bytes: &[u8]) -> (DetectedEncoding, bool) {
    if bytes.starts_with(b"\xFF\xFE") {
        return (DetectedEncoding::Utf16Le, true);
    }
    if bytes.starts_with(b"\xFE\xFF") {
        return (DetectedEncoding::Utf16Be, true);
    }

    let sample = &bytes[..bytes.len().min(SAMPLE_LIMIT)];
    if sample.len() < 4 {
        return (DetectedEncoding::Utf8, false);
    }

    let (odd, even) = nul_fractions(sample);
    if odd > UTF16_NUL_FRACTION && odd > even * UTF16_NUL_RATIO {
        (DetectedEncoding::Utf16Le, false)
    } else if even > UTF16_NUL_FRACTION && even > odd * UTF16_NUL_RATIO {
        (DetectedEncoding::Utf16Be, false)
    } else {
        (DetectedEncoding::Utf8, false)
    }
}

/// Share of NUL bytes at odd and at even offsets of the sample.
fn nul_fractions(sample: &[u8]) -> (f64, f64) {
    let mut zeros = [0usize; 2];
    let mut seen = [0usize; 2];
    for (idx, byte) in sample.iter().enumerate() {
        let parity = idx % 2;
        seen[parity] += 1;
        if *byte == 0 {
            zeros[parity] += 1;
        }
    }
    let fraction = |parity: usize| {
        if seen[parity] == 0 {
            0.0
        } else {
            zeros[parity] as f64 / seen[parity] as f64
        }
    };
    (fraction(1), fraction(0))
}

fn decode_utf16_le(bytes: &[u8]) -> String {
    let (cow, _had_errors) = UTF_16LE.decode_without_bom_handling(bytes);
    match cow {
        Cow::Borrowed(slice) => slice.to_owned(),
        Cow::Owned(string) => string,
    }
}

// 交換每組位元組，奇數長度時保留最後一個位元組。 / Swap each byte pair; an odd trailing byte is kept as is.
fn swap_byte_pairs(bytes: &[u8]) -> Vec<u8> {
    let mut swapped = Vec::with_capacity(bytes.len());
    let mut chunks = bytes.chunks_exact(2);
    for pair in &mut chunks {
        swapped.push(pair[1]);
        swapped.push(pair[0]);
    }
    swapped.extend_from_slice(chunks.remainder());
    swapped
}

fn strip_nul(text: String) -> String {
    if text.contains('\0') {
        text.replace('\0', "")
    } else {
        text
    }
}
