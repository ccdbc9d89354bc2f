use serde::{Deserialize, Serialize};

use crate::error::MelsecError;

/// 接続先 PLC のシリーズ。対応デバイス・サブコマンド・応答ヘッダ長が変わる。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum PLCSeries {
    Q,
    L,
    QnA,
    #[serde(rename = "iQ-L")]
    IqL,
    #[serde(rename = "iQ-R")]
    IqR,
}

impl PLCSeries {
    /// Parse a PLC series from its catalog spelling ("Q", "L", "QnA", "iQ-L", "iQ-R").
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, MelsecError> {
        match s {
            "Q" | "q" => Ok(Self::Q),
            "L" | "l" => Ok(Self::L),
            "QnA" | "qna" => Ok(Self::QnA),
            "iQ-L" | "iq-l" => Ok(Self::IqL),
            "iQ-R" | "iq-r" => Ok(Self::IqR),
            _ => Err(MelsecError::PlcType),
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Q => "Q",
            Self::L => "L",
            Self::QnA => "QnA",
            Self::IqL => "iQ-L",
            Self::IqR => "iQ-R",
        }
    }

    /// iQ-R/iQ-L の応答は拡張ヘッダ 4 バイト (ASCII では 8 文字) 分だけ長い。
    #[must_use]
    pub const fn uses_extended_response(&self) -> bool {
        matches!(self, Self::IqR | Self::IqL)
    }

    /// iQ-R only: device references carry a 4-byte address and 2-byte code,
    /// and device commands use the 0x0002/0x0003 subcommand pair.
    #[must_use]
    pub const fn uses_extended_device(&self) -> bool {
        matches!(self, Self::IqR)
    }
}

impl std::str::FromStr for PLCSeries {
    type Err = MelsecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str(s)
    }
}

impl std::fmt::Display for PLCSeries {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
