use thiserror::Error;

#[derive(Error, Debug)]
pub enum MelsecError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("receive timeout")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("socket is not connected. Please use connect method")]
    NotConnected,

    #[error("device code error: {0}")]
    DeviceCode(String),

    #[error("communication type must be \"binary\" or \"ascii\"")]
    CommType,

    #[error("plctype must be \"Q\", \"L\", \"QnA\", \"iQ-L\" or \"iQ-R\"")]
    PlcType,

    /// PLC が 0 以外の終了コードを返した。
    #[error("MC protocol error 0x{code:04X}: {description}")]
    Protocol { code: u16, description: String },

    /// 対象モジュールが該当コマンド自体を受け付けない (終了コード 0xC059)。
    #[error("command not supported on target module (end code 0x{0:04X})")]
    UnsupportedCommand(u16),

    #[error("invalid value: {0}")]
    InvalidValue(String),
}

impl MelsecError {
    /// Raw PLC completion code when this error originated from one.
    #[must_use]
    pub const fn completion_code(&self) -> Option<u16> {
        match self {
            Self::Protocol { code, .. } | Self::UnsupportedCommand(code) => Some(*code),
            _ => None,
        }
    }
}
