//! MC 終了コード（エラーコード）一覧
//!
//! 終了コードの名前・説明・エラー種別は `src/error_codes.toml` に定義し、
//! コンパイル時に埋め込んだものを初回アクセス時にパースします。
//! コード追加は TOML の編集だけで済み、呼び出し側の変更は不要です。

use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::HashMap;

use crate::error::MelsecError;
use crate::toml_helpers::extract_line_col_from_msg;

/// 終了コードのエラー種別。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum ErrorKind {
    /// PLC reported a request-level failure.
    #[default]
    Protocol,
    /// The target module rejects the command family itself.
    UnsupportedCommand,
}

#[derive(Debug, Deserialize)]
struct ErrorCodeEntry {
    // TOML では 16 進表記を文字列で書くことが多いので文字列/数値の両方を受け取る
    #[serde(deserialize_with = "parse_hex_or_int")]
    code: u16,
    name: Option<String>,
    description: Option<String>,
    #[serde(default)]
    kind: ErrorKind,
}

// serde 用ヘルパ: 整数または "0x...." 形式の文字列を u16 に変換する
fn parse_hex_or_int<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: serde::Deserializer<'de>,
{
    struct V;
    impl serde::de::Visitor<'_> for V {
        type Value = u16;
        fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "hex string like 0xNNNN or integer")
        }
        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            u16::try_from(v).map_err(|_| E::custom(format!("value out of range: {v}")))
        }
        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            let uv = u64::try_from(v).map_err(|_| E::custom(format!("negative value: {v}")))?;
            u16::try_from(uv).map_err(|_| E::custom(format!("value out of range: {v}")))
        }
        fn visit_str<E>(self, s: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            let s = s.trim();
            s.strip_prefix("0x").map_or_else(
                || {
                    s.parse::<u16>()
                        .map_err(|e| E::custom(format!("parse int: {e}")))
                },
                |hex| u16::from_str_radix(hex, 16).map_err(|e| E::custom(format!("parse hex: {e}"))),
            )
        }
    }
    deserializer.deserialize_any(V)
}

#[derive(Debug, Deserialize)]
struct ErrorCodesToml {
    #[serde(default)]
    codes: Vec<ErrorCodeEntry>,
}

struct ErrorEntry {
    name: Option<String>,
    description: Option<String>,
    kind: ErrorKind,
}

fn parse_codes_toml(s: &str) -> Result<HashMap<u16, ErrorEntry>, MelsecError> {
    let parsed: ErrorCodesToml = toml::from_str(s).map_err(|e| {
        let msg = e.to_string();
        if let Some((line, col)) = extract_line_col_from_msg(&msg) {
            MelsecError::Transport(format!("error_codes.toml parse error at {line}:{col}: {msg}"))
        } else {
            MelsecError::Transport(format!("error_codes.toml parse error: {msg}"))
        }
    })?;
    let mut map = HashMap::with_capacity(parsed.codes.len());
    for e in parsed.codes {
        map.insert(
            e.code,
            ErrorEntry {
                name: e.name,
                description: e.description,
                kind: e.kind,
            },
        );
    }
    Ok(map)
}

static COMPLETION_CODES: Lazy<HashMap<u16, ErrorEntry>> = Lazy::new(|| {
    match parse_codes_toml(include_str!("./error_codes.toml")) {
        Ok(m) => m,
        Err(e) => {
            // Corrupted embed: keep running with generic Protocol errors only.
            tracing::warn!("failed to parse embedded error_codes.toml: {e}");
            HashMap::new()
        }
    }
});

/// Registered error code name (e.g. "MC_ERR_C061") if available.
#[must_use]
pub fn code_name(code: u16) -> Option<&'static str> {
    COMPLETION_CODES.get(&code).and_then(|e| e.name.as_deref())
}

/// コード説明を返す。未登録コードは None。
#[must_use]
pub fn code_description(code: u16) -> Option<&'static str> {
    COMPLETION_CODES
        .get(&code)
        .and_then(|e| e.description.as_deref())
}

/// Map a non-zero completion code to its error kind.
#[must_use]
pub fn error_from_code(code: u16) -> MelsecError {
    match COMPLETION_CODES.get(&code) {
        Some(entry) if entry.kind == ErrorKind::UnsupportedCommand => {
            MelsecError::UnsupportedCommand(code)
        }
        Some(entry) => MelsecError::Protocol {
            code,
            description: entry
                .description
                .clone()
                .unwrap_or_else(|| "unrecognized completion code".to_string()),
        },
        None => MelsecError::Protocol {
            code,
            description: "unrecognized completion code".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_have_descriptions() {
        for code in [
            0xC050, 0xC051, 0xC052, 0xC053, 0xC054, 0xC056, 0xC058, 0xC059, 0xC05B, 0xC05C,
            0xC05F, 0xC060, 0xC061, 0xC06F, 0xC070, 0xC0B5, 0xC200, 0xC201, 0xC204,
        ] {
            assert!(
                code_description(code).is_some(),
                "missing description for 0x{code:04X}"
            );
        }
        assert_eq!(code_name(0xC061), Some("MC_ERR_C061"));
    }

    #[test]
    fn invalid_command_maps_to_unsupported() {
        assert!(matches!(
            error_from_code(0xC059),
            MelsecError::UnsupportedCommand(0xC059)
        ));
    }

    #[test]
    fn table_codes_map_to_protocol() {
        for code in [0xC050, 0xC056, 0xC058, 0xC200] {
            match error_from_code(code) {
                MelsecError::Protocol { code: c, .. } => assert_eq!(c, code),
                other => panic!("expected Protocol error for 0x{code:04X}, got {other:?}"),
            }
        }
    }

    #[test]
    fn unknown_code_is_generic_protocol_error() {
        assert_eq!(code_description(0x9999), None);
        match error_from_code(0x9999) {
            MelsecError::Protocol { code, description } => {
                assert_eq!(code, 0x9999);
                assert!(description.contains("unrecognized"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
