//! MC 3E プロトコル定義モジュール
//!
//! 3E フレームで使う定数類とアクセス設定を提供します。
//! - サブヘッダ定義
//! - コマンド／サブコマンド定数
//! - アクセス経路 (`AccessRoute`) とアクセスオプション (`AccessOptions`)
//! - 通信コード (`CommType`) とリモート RUN のクリアモード
//!
//! NOTE: フレームの組立・解析は `frame`、値の変換は `codec` で実装されています。

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::MelsecError;

/// 3E フレーム要求サブヘッダ (応答は 0xD000)
pub const MC_SUBHEADER_3E: u16 = 0x5000;

/// 正常終了コード
pub const MC_END_OK: u16 = 0x0000;

// Device access commands
pub const CMD_BATCH_READ: u16 = 0x0401;
pub const CMD_BATCH_WRITE: u16 = 0x1401;
pub const CMD_RANDOM_READ: u16 = 0x0403;
pub const CMD_RANDOM_WRITE: u16 = 0x1402;

// Remote control commands
pub const CMD_REMOTE_RUN: u16 = 0x1001;
pub const CMD_REMOTE_STOP: u16 = 0x1002;
pub const CMD_REMOTE_PAUSE: u16 = 0x1003;
pub const CMD_REMOTE_LATCH_CLEAR: u16 = 0x1005;
pub const CMD_REMOTE_RESET: u16 = 0x1006;
pub const CMD_READ_CPU_MODEL: u16 = 0x0101;
pub const CMD_REMOTE_UNLOCK: u16 = 0x1630;
pub const CMD_REMOTE_LOCK: u16 = 0x1631;
pub const CMD_ECHO_TEST: u16 = 0x0619;

// Subcommands. Word/bit device access on iQ-R uses the extended pair.
pub const SUBCMD_WORD: u16 = 0x0000;
pub const SUBCMD_BIT: u16 = 0x0001;
pub const SUBCMD_WORD_EXT: u16 = 0x0002;
pub const SUBCMD_BIT_EXT: u16 = 0x0003;
pub const SUBCMD_NONE: u16 = 0x0000;

/// ワイヤ上の符号化方式。binary はワード 2 バイト、ascii は 16 進 4 文字。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CommType {
    #[default]
    Binary,
    Ascii,
}

impl CommType {
    /// Parse a communication type from "binary" / "ascii".
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, MelsecError> {
        match s {
            "binary" => Ok(Self::Binary),
            "ascii" => Ok(Self::Ascii),
            _ => Err(MelsecError::CommType),
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Binary => "binary",
            Self::Ascii => "ascii",
        }
    }

    /// Wire size of one word value, in bytes (binary) or characters (ASCII).
    #[must_use]
    pub const fn word_size(&self) -> usize {
        match self {
            Self::Binary => 2,
            Self::Ascii => 4,
        }
    }
}

impl std::str::FromStr for CommType {
    type Err = MelsecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str(s)
    }
}

/// アクセス経路: ネットワーク番号、PC 番号、要求先モジュール I/O 番号、局番号。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AccessRoute {
    pub network: u8,
    pub pc: u8,
    pub dest_moduleio: u16,
    pub dest_modulesta: u8,
}

impl AccessRoute {
    #[must_use]
    pub const fn with_network(mut self, network: u8) -> Self {
        self.network = network;
        self
    }
    #[must_use]
    pub const fn with_pc(mut self, pc: u8) -> Self {
        self.pc = pc;
        self
    }
    #[must_use]
    pub const fn with_dest_moduleio(mut self, dest_moduleio: u16) -> Self {
        self.dest_moduleio = dest_moduleio;
        self
    }
    #[must_use]
    pub const fn with_dest_modulesta(mut self, dest_modulesta: u8) -> Self {
        self.dest_modulesta = dest_modulesta;
        self
    }
}

impl Default for AccessRoute {
    fn default() -> Self {
        Self {
            network: 0x00,
            pc: 0xFF,
            dest_moduleio: 0x03FF,
            dest_modulesta: 0x00,
        }
    }
}

/// 監視タイマ既定値 (0.25 秒単位、4 = 1 秒)
pub const DEFAULT_MONITORING_TIMER: u16 = 4;

/// ソケットタイムアウト既定値。PLC 側のタイムアウト応答を受け取れるよう
/// 監視タイマより 1 秒長い。
pub const DEFAULT_SOCKET_TIMEOUT: Duration = Duration::from_secs(2);

/// Per-session access options applied to every request frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessOptions {
    pub subheader: u16,
    pub route: AccessRoute,
    /// PLC-side processing deadline in 250 ms units.
    pub monitoring_timer: u16,
    pub socket_timeout: Duration,
}

impl Default for AccessOptions {
    fn default() -> Self {
        Self {
            subheader: MC_SUBHEADER_3E,
            route: AccessRoute::default(),
            monitoring_timer: DEFAULT_MONITORING_TIMER,
            socket_timeout: DEFAULT_SOCKET_TIMEOUT,
        }
    }
}

/// Partial update for [`McClient::set_access_options`](crate::McClient::set_access_options).
/// Fields left as `None` keep their current value. `timer_sec` sets the wire
/// timer to `4 * timer_sec` and the socket timeout to `timer_sec + 1` seconds.
#[derive(Clone, Copy, Debug, Default)]
pub struct AccessOptionsPatch {
    pub commtype: Option<CommType>,
    pub network: Option<u8>,
    pub pc: Option<u8>,
    pub dest_moduleio: Option<u16>,
    pub dest_modulesta: Option<u8>,
    pub timer_sec: Option<u16>,
}

/// リモート RUN 時のデバイスクリア指定。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClearMode {
    /// Do not clear device memory.
    None,
    /// Clear everything except latch devices.
    ExceptLatch,
    /// Clear all device memory.
    All,
}

impl ClearMode {
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        match self {
            Self::None => 0x0000,
            Self::ExceptLatch => 0x0001,
            Self::All => 0x0002,
        }
    }
}
