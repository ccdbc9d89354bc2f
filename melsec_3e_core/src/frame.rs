//! 3E フレームの組立・解析
//!
//! 要求フレームは `McRequest` で組み立てます。長さフィールドは
//! 監視タイマ以降の末尾までのワイヤ上サイズ (binary はバイト数、ascii は
//! 文字数) です。応答フレームは `parse_response` で終了コードとデータ部に
//! 分解します。iQ-R/iQ-L の応答はサブヘッダ直後に 4 バイト (8 文字) の
//! 拡張ヘッダを持つため、各オフセットがその分だけ後ろへずれます。

use crate::codec::{self, Encoder};
use crate::error::MelsecError;
use crate::mc_define::{
    AccessOptions, AccessRoute, CommType, DEFAULT_MONITORING_TIMER, MC_SUBHEADER_3E,
};
use crate::plc_series::PLCSeries;

/// Builder for one 3E request frame.
pub struct McRequest {
    pub subheader: u16,
    pub route: AccessRoute,
    /// PLC-side deadline in 250 ms units.
    pub monitoring_timer: u16,
    pub command: u16,
    pub subcommand: u16,
    /// Wire-encoded body (already in the session's comm type).
    pub body: Vec<u8>,
}

impl McRequest {
    #[must_use]
    pub fn new(command: u16, subcommand: u16) -> Self {
        Self {
            subheader: MC_SUBHEADER_3E,
            route: AccessRoute::default(),
            monitoring_timer: DEFAULT_MONITORING_TIMER,
            command,
            subcommand,
            body: Vec::new(),
        }
    }

    #[must_use]
    pub const fn with_subheader(mut self, subheader: u16) -> Self {
        self.subheader = subheader;
        self
    }

    #[must_use]
    pub const fn with_route(mut self, route: AccessRoute) -> Self {
        self.route = route;
        self
    }

    #[must_use]
    pub const fn with_monitoring_timer(mut self, monitoring_timer: u16) -> Self {
        self.monitoring_timer = monitoring_timer;
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Apply subheader, route and timer from session options.
    #[must_use]
    pub const fn with_options(mut self, options: &AccessOptions) -> Self {
        self.subheader = options.subheader;
        self.route = options.route;
        self.monitoring_timer = options.monitoring_timer;
        self
    }

    /// Emit the request frame in the given comm type.
    pub fn encode(&self, comm: CommType) -> Result<Vec<u8>, MelsecError> {
        let mut out = Vec::with_capacity(32 + self.body.len());
        // サブヘッダのみビッグエンディアン
        match comm {
            CommType::Binary => out.extend_from_slice(&self.subheader.to_be_bytes()),
            CommType::Ascii => {
                out.extend_from_slice(format!("{sh:04X}", sh = self.subheader).as_bytes());
            }
        }

        let mut head = Encoder::new(comm);
        head.put_u8(self.route.network);
        head.put_u8(self.route.pc);
        head.put_u16(self.route.dest_moduleio);
        head.put_u8(self.route.dest_modulesta);

        let mut req = Encoder::new(comm);
        req.put_u16(self.command);
        req.put_u16(self.subcommand);
        req.put_raw(&self.body);
        let request_data = req.into_bytes();

        // length field covers timer + command + subcommand + body
        let data_len = u16::try_from(comm.word_size() + request_data.len()).map_err(|_| {
            MelsecError::InvalidValue("request data too large for the 3E length field".to_string())
        })?;
        head.put_u16(data_len);
        head.put_u16(self.monitoring_timer);

        out.extend_from_slice(&head.into_bytes());
        out.extend_from_slice(&request_data);
        Ok(out)
    }
}

/// Parsed 3E response: completion status and the payload after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct McResponse {
    pub status: u16,
    pub data: Vec<u8>,
}

impl McResponse {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status == 0
    }

    /// Dispatch a non-zero completion status through the code table.
    pub fn ensure_success(&self) -> Result<(), MelsecError> {
        if self.status == 0 {
            Ok(())
        } else {
            Err(crate::error_codes::error_from_code(self.status))
        }
    }
}

// 応答ヘッダ内の長さフィールド位置 (オフセット)。長さフィールドの直後が
// 終了コード。
const fn len_field_offset(comm: CommType, series: PLCSeries) -> usize {
    let extra = if series.uses_extended_response() { 4 } else { 0 };
    match comm {
        CommType::Binary => 7 + extra,
        CommType::Ascii => 14 + 2 * extra,
    }
}

/// Offset of the completion status field in a response frame.
#[must_use]
pub const fn status_index(comm: CommType, series: PLCSeries) -> usize {
    len_field_offset(comm, series) + comm.word_size()
}

/// Split a raw reply frame into completion status and data.
pub fn parse_response(
    comm: CommType,
    series: PLCSeries,
    raw: &[u8],
) -> Result<McResponse, MelsecError> {
    let si = status_index(comm, series);
    let ws = comm.word_size();
    if raw.len() < si + ws {
        return Err(MelsecError::Transport(format!(
            "response frame too short: {len} bytes",
            len = raw.len()
        )));
    }
    let status = codec::get_u16(comm, &raw[si..si + ws])?;
    Ok(McResponse {
        status,
        data: raw[si + ws..].to_vec(),
    })
}

/// Compute the total frame size once the length field is readable.
///
/// Returns `Ok(None)` while the buffer is still shorter than the length
/// field. Used by the transport read loop to know how many bytes remain.
pub fn expected_frame_len(
    comm: CommType,
    series: PLCSeries,
    buf: &[u8],
) -> Result<Option<usize>, MelsecError> {
    let off = len_field_offset(comm, series);
    let ws = comm.word_size();
    if buf.len() < off + ws {
        return Ok(None);
    }
    let data_len = codec::get_u16(comm, &buf[off..off + ws])? as usize;
    Ok(Some(off + ws + data_len))
}
