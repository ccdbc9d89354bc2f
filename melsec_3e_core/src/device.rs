use once_cell::sync::{Lazy, OnceCell};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::MelsecError;
use crate::plc_series::PLCSeries;
use crate::toml_helpers::extract_line_col_from_msg;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum DeviceType {
    Bit,
    Word,
    DoubleWord,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum NumberBase {
    Decimal,     // 10進数
    Hexadecimal, // 16進数
}

impl NumberBase {
    #[must_use]
    pub const fn radix(self) -> u32 {
        match self {
            Self::Decimal => 10,
            Self::Hexadecimal => 16,
        }
    }
}

// デバイス定義
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    pub symbol: String,          // デバイス記号 ("D", "TS", "LCN" など)
    pub category: DeviceType,    // ビット/ワード/ダブルワードデバイスか
    pub base: NumberBase,        // 表記が10進数or16進数
    pub code: u8,                // 3E バイナリフレームのデバイスコード
    pub description: String,     // 説明
    /// Which PLC series accept this device.
    pub supported_series: Vec<PLCSeries>,
}

impl Device {
    #[must_use]
    pub fn supports(&self, series: PLCSeries) -> bool {
        self.supported_series.contains(&series)
    }

    fn check_series(&self, series: PLCSeries) -> Result<(), MelsecError> {
        if self.supports(series) {
            Ok(())
        } else {
            Err(MelsecError::DeviceCode(format!(
                "device {sym} is not available on {series} series",
                sym = self.symbol
            )))
        }
    }

    /// Binary device code and numeric base, gated by PLC series.
    pub fn binary_code(&self, series: PLCSeries) -> Result<(u8, NumberBase), MelsecError> {
        self.check_series(series)?;
        Ok((self.code, self.base))
    }

    /// ASCII device code and numeric base, gated by PLC series.
    ///
    /// The code is the symbol left-padded with `*` to 2 characters on the
    /// classic families and to 4 characters on iQ-R, whose ASCII device
    /// fields are wider.
    pub fn ascii_code(&self, series: PLCSeries) -> Result<(String, NumberBase), MelsecError> {
        self.check_series(series)?;
        let width = if series.uses_extended_device() { 4 } else { 2 };
        let mut code = self.symbol.clone();
        while code.len() < width {
            code.push('*');
        }
        Ok((code, self.base))
    }
}

// COMPILED_DEVICES: devices embedded into the crate from `src/devices.toml`.
static COMPILED_DEVICES: OnceCell<Vec<Device>> = OnceCell::new();

fn devices() -> &'static [Device] {
    COMPILED_DEVICES
        .get_or_init(|| {
            // A parse failure here means the embedded table is corrupted.
            // Fall back to an empty table (every lookup then fails with
            // DeviceCode) instead of panicking in library code.
            match parse_devices_toml(include_str!("./devices.toml")) {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!("failed to parse embedded devices.toml: {e}");
                    Vec::new()
                }
            }
        })
        .as_slice()
}

/// Map from symbol string to Device reference for O(1) lookup.
static DEVICE_BY_SYMBOL: Lazy<HashMap<&'static str, &'static Device>> = Lazy::new(|| {
    let mut m = HashMap::new();
    for d in devices() {
        m.insert(d.symbol.as_str(), d);
    }
    m
});

/// Lookup a device by its symbol (e.g. "D", "ZR").
pub fn device_by_symbol(sym: &str) -> Option<&'static Device> {
    DEVICE_BY_SYMBOL.get(sym).copied()
}

/// デバイス記号からバイナリデバイスコードと基数を引く。シリーズ非対応や
/// 未知の記号は `DeviceCode` エラー。
pub fn binary_device_code(
    series: PLCSeries,
    symbol: &str,
) -> Result<(u8, NumberBase), MelsecError> {
    device_by_symbol(symbol)
        .ok_or_else(|| MelsecError::DeviceCode(format!("unknown device symbol: {symbol}")))?
        .binary_code(series)
}

/// ASCII 側デバイスコード。`binary_device_code` と同じ失敗契約。
pub fn ascii_device_code(
    series: PLCSeries,
    symbol: &str,
) -> Result<(String, NumberBase), MelsecError> {
    device_by_symbol(symbol)
        .ok_or_else(|| MelsecError::DeviceCode(format!("unknown device symbol: {symbol}")))?
        .ascii_code(series)
}

/// Parse a combined device string like "D1000", "W1FFF" or "X0x1A" into a
/// `&Device` and a numeric address.
///
/// Rules:
/// - Leading ASCII letters form the device symbol (e.g. "D", "TS", "LTN").
/// - A remainder starting with `0x`/`0X` is parsed as hex regardless of the
///   device's base; otherwise the device's declared base applies.
/// - Whitespace around the input is ignored. Letters are case-insensitive.
///
/// The wire form always re-renders the number in the device's declared base;
/// the `0x` override affects only how the literal is read.
pub fn parse_device_and_address(s: &str) -> Result<(&'static Device, u32), MelsecError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(MelsecError::DeviceCode("empty device string".to_string()));
    }
    let sym_len = s.chars().take_while(char::is_ascii_alphabetic).count();
    if sym_len == 0 {
        return Err(MelsecError::DeviceCode(format!(
            "invalid device string: {s}"
        )));
    }
    let symbol = s[..sym_len].to_uppercase();
    let num_part = s[sym_len..].trim();
    if num_part.is_empty() {
        return Err(MelsecError::DeviceCode(format!(
            "missing numeric address in device string: {s}"
        )));
    }

    let device = device_by_symbol(&symbol)
        .ok_or_else(|| MelsecError::DeviceCode(format!("unknown device symbol: {symbol}")))?;

    let addr_res = if let Some(hex) = num_part.strip_prefix("0x").or_else(|| num_part.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16)
    } else {
        u32::from_str_radix(num_part, device.base.radix())
    };
    let addr = addr_res.map_err(|_| {
        MelsecError::DeviceCode(format!(
            "invalid numeric address '{num_part}' for device {symbol}"
        ))
    })?;
    Ok((device, addr))
}

// Parse the devices TOML into Vec<Device>. Returns `MelsecError` on failure.
fn parse_devices_toml(s: &str) -> Result<Vec<Device>, MelsecError> {
    #[derive(Deserialize)]
    struct RawFile {
        #[serde(rename = "device")]
        devices: Vec<RawDevice>,
    }

    #[derive(Deserialize)]
    struct RawDevice {
        symbol: String,
        code: u32,
        category: DeviceType,
        base: NumberBase,
        description: String,
        series: Vec<PLCSeries>,
    }

    let rf: RawFile = toml::from_str(s).map_err(|e| {
        let msg = e.to_string();
        if let Some((line, col)) = extract_line_col_from_msg(&msg) {
            MelsecError::DeviceCode(format!("devices.toml parse error at {line}:{col}: {msg}"))
        } else {
            MelsecError::DeviceCode(format!("devices.toml parse error: {msg}"))
        }
    })?;

    let mut out: Vec<Device> = Vec::with_capacity(rf.devices.len());
    for d in rf.devices {
        let code = u8::try_from(d.code).map_err(|_| {
            MelsecError::DeviceCode(format!(
                "device code out of range for {sym}: {code}",
                sym = d.symbol,
                code = d.code
            ))
        })?;
        out.push(Device {
            symbol: d.symbol,
            category: d.category,
            base: d.base,
            code,
            description: d.description,
            supported_series: d.series,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_decimal_device() {
        let (dev, addr) = parse_device_and_address("D1000").expect("parse D1000");
        assert_eq!(dev.symbol, "D");
        assert_eq!(dev.code, 0xA8);
        assert_eq!(addr, 1000);
    }

    #[test]
    fn parse_hex_device() {
        let (dev, addr) = parse_device_and_address("W1FFF").expect("parse W1FFF");
        assert_eq!(dev.symbol, "W");
        assert_eq!(addr, 0x1FFF);
    }

    #[test]
    fn parse_hex_literal_override() {
        // X is hex-based anyway, but the 0x prefix must also work on a
        // decimal device and force hex interpretation.
        let (_, addr) = parse_device_and_address("X0x1A").expect("parse X0x1A");
        assert_eq!(addr, 0x1A);
        let (dev, addr) = parse_device_and_address("D0x10").expect("parse D0x10");
        assert_eq!(dev.symbol, "D");
        assert_eq!(addr, 0x10);
    }

    #[test]
    fn parse_lowercase_symbol() {
        let (dev, addr) = parse_device_and_address("zr100").expect("parse zr100");
        assert_eq!(dev.symbol, "ZR");
        assert_eq!(addr, 0x100, "ZR uses hex notation");
    }

    #[test]
    fn parse_invalid_inputs() {
        assert!(parse_device_and_address("").is_err());
        assert!(parse_device_and_address("1000").is_err());
        assert!(parse_device_and_address("D").is_err());
        assert!(parse_device_and_address("QZ99").is_err());
        assert!(parse_device_and_address("D12Z4").is_err());
    }

    #[test]
    fn long_device_symbols_resolve() {
        let (dev, addr) = parse_device_and_address("LSTS5").expect("parse LSTS5");
        assert_eq!(dev.symbol, "LSTS");
        assert_eq!(dev.category, DeviceType::DoubleWord);
        assert_eq!(addr, 5);
    }

    #[test]
    fn family_gating_long_devices() {
        for sym in [
            "LTS", "LTC", "LTN", "LSTS", "LSTC", "LSTN", "LCS", "LCC", "LCN", "LZ", "RD",
        ] {
            for series in [PLCSeries::Q, PLCSeries::L, PLCSeries::QnA, PLCSeries::IqL] {
                assert!(
                    matches!(
                        binary_device_code(series, sym),
                        Err(MelsecError::DeviceCode(_))
                    ),
                    "{sym} must be rejected on {series}"
                );
            }
            assert!(binary_device_code(PLCSeries::IqR, sym).is_ok());
        }
    }

    #[test]
    fn ascii_codes_are_padded() {
        let (code, _) = ascii_device_code(PLCSeries::Q, "D").unwrap();
        assert_eq!(code, "D*");
        let (code, _) = ascii_device_code(PLCSeries::Q, "ZR").unwrap();
        assert_eq!(code, "ZR");
        let (code, _) = ascii_device_code(PLCSeries::IqR, "D").unwrap();
        assert_eq!(code, "D***");
        let (code, _) = ascii_device_code(PLCSeries::IqR, "LSTS").unwrap();
        assert_eq!(code, "LSTS");
    }

    #[test]
    fn binary_codes_match_table() {
        for (sym, code) in [("D", 0xA8u8), ("ZR", 0xB0), ("X", 0x9C), ("SW", 0xB5)] {
            let (c, _) = binary_device_code(PLCSeries::Q, sym).unwrap();
            assert_eq!(c, code, "code for {sym}");
        }
        let (c, _) = binary_device_code(PLCSeries::IqR, "LTS").unwrap();
        assert_eq!(c, 0x51);
    }

    #[test]
    fn device_ref_symmetry() {
        // Formatting the address back in the device's base and re-parsing
        // must return the same (device, address) pair.
        for d in devices() {
            let addr = 0x2Au32;
            let literal = match d.base {
                NumberBase::Decimal => format!("{sym}{addr}", sym = d.symbol),
                NumberBase::Hexadecimal => format!("{sym}{addr:X}", sym = d.symbol),
            };
            let (parsed, n) = parse_device_and_address(&literal).expect("roundtrip parse");
            assert_eq!(parsed.symbol, d.symbol);
            assert_eq!(n, addr);
        }
    }
}
