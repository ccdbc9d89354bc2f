//! 3E フレーム クライアント
//!
//! `McClient` は PLC シリーズ・通信コード・アクセスオプションと TCP 接続を
//! 保持し、高レベルのデバイス読み書き/リモート操作を提供します。各操作は
//! 1 要求 1 応答の同期往復で、`&mut self` を取るためセッション単位の
//! 直列化は型で保証されます。並列アクセスはセッションを分けてください。
//!
//! エラーは `MelsecError` を返します。エラー発生後のセッションは汚染扱い
//! とし、`close` してから接続し直すことを推奨します。

use crate::codec::{self, Encoder};
use crate::error::MelsecError;
use crate::frame::{parse_response, McRequest, McResponse};
use crate::mc_define::{
    AccessOptions, AccessOptionsPatch, ClearMode, CommType, CMD_BATCH_READ, CMD_BATCH_WRITE,
    CMD_ECHO_TEST, CMD_RANDOM_READ, CMD_RANDOM_WRITE, CMD_READ_CPU_MODEL, CMD_REMOTE_LATCH_CLEAR,
    CMD_REMOTE_LOCK, CMD_REMOTE_PAUSE, CMD_REMOTE_RESET, CMD_REMOTE_RUN, CMD_REMOTE_STOP,
    CMD_REMOTE_UNLOCK, SUBCMD_BIT, SUBCMD_BIT_EXT, SUBCMD_NONE, SUBCMD_WORD, SUBCMD_WORD_EXT,
};
use crate::plc_series::PLCSeries;
use crate::transport::TcpTransport;
use std::time::Duration;

// remote run/pause の動作モード
const MODE_NORMAL: u16 = 0x0001;
const MODE_FORCE: u16 = 0x0003;

const CPU_NAME_LEN: usize = 16;
const ECHO_MAX_LEN: usize = 960;

/// MELSEC 3E frame client session.
///
/// Created for one PLC series, connected with [`connect`](Self::connect), and
/// released with [`close`](Self::close). Dropping a connected client closes
/// the socket as well.
pub struct McClient {
    pub plc_series: PLCSeries,
    pub comm_type: CommType,
    pub options: AccessOptions,
    transport: Option<TcpTransport>,
}

impl McClient {
    /// Create a client for the given PLC series with default options
    /// (binary framing, direct-connection access route, 1 s monitoring
    /// timer, 2 s socket timeout).
    #[must_use]
    pub fn new(plc_series: PLCSeries) -> Self {
        Self {
            plc_series,
            comm_type: CommType::default(),
            options: AccessOptions::default(),
            transport: None,
        }
    }

    #[must_use]
    pub const fn with_comm_type(mut self, comm_type: CommType) -> Self {
        self.comm_type = comm_type;
        self
    }

    #[must_use]
    pub fn with_access_options(mut self, options: AccessOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.transport.is_some()
    }

    /// アクセスオプションの部分更新。`timer_sec` は監視タイマ (0.25 秒単位で
    /// `4 * timer_sec`) とソケットタイムアウト (`timer_sec + 1` 秒) を同時に
    /// 更新し、接続中なら即時反映する。
    pub fn set_access_options(&mut self, patch: AccessOptionsPatch) -> Result<(), MelsecError> {
        if let Some(commtype) = patch.commtype {
            self.comm_type = commtype;
        }
        if let Some(network) = patch.network {
            self.options.route.network = network;
        }
        if let Some(pc) = patch.pc {
            self.options.route.pc = pc;
        }
        if let Some(dest_moduleio) = patch.dest_moduleio {
            self.options.route.dest_moduleio = dest_moduleio;
        }
        if let Some(dest_modulesta) = patch.dest_modulesta {
            self.options.route.dest_modulesta = dest_modulesta;
        }
        if let Some(timer_sec) = patch.timer_sec {
            let timer = timer_sec.checked_mul(4).ok_or_else(|| {
                MelsecError::InvalidValue("timer_sec must be 0 <= timer_sec <= 16383".to_string())
            })?;
            self.options.monitoring_timer = timer;
            self.options.socket_timeout = Duration::from_secs(u64::from(timer_sec) + 1);
            if let Some(transport) = self.transport.as_ref() {
                transport.set_timeout(self.options.socket_timeout)?;
            }
        }
        Ok(())
    }

    /// Connect to the PLC. Any previous connection is closed first.
    pub fn connect(&mut self, host: &str, port: u16) -> Result<(), MelsecError> {
        self.close();
        let transport = TcpTransport::connect(host, port, self.options.socket_timeout)?;
        self.transport = Some(transport);
        Ok(())
    }

    /// Close the connection. Idempotent.
    pub fn close(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            transport.close();
        }
    }

    fn encoder(&self) -> Encoder {
        Encoder::new(self.comm_type)
    }

    // デバイスアクセス系サブコマンド。iQ-R のみ拡張ペアを使う。
    const fn device_subcommand(&self, bit_units: bool) -> u16 {
        match (self.plc_series.uses_extended_device(), bit_units) {
            (true, true) => SUBCMD_BIT_EXT,
            (true, false) => SUBCMD_WORD_EXT,
            (false, true) => SUBCMD_BIT,
            (false, false) => SUBCMD_WORD,
        }
    }

    fn build_payload(
        &self,
        command: u16,
        subcommand: u16,
        body: Vec<u8>,
    ) -> Result<Vec<u8>, MelsecError> {
        McRequest::new(command, subcommand)
            .with_options(&self.options)
            .with_body(body)
            .encode(self.comm_type)
    }

    // 1 往復。終了コード 0 以外はここでエラー化する。
    fn round_trip(
        &mut self,
        command: u16,
        subcommand: u16,
        body: Vec<u8>,
    ) -> Result<McResponse, MelsecError> {
        let payload = self.build_payload(command, subcommand, body)?;
        let comm = self.comm_type;
        let series = self.plc_series;
        let transport = self.transport.as_mut().ok_or(MelsecError::NotConnected)?;
        transport.send_all(&payload)?;
        let raw = transport.recv_frame(comm, series)?;
        let response = parse_response(comm, series, &raw)?;
        response.ensure_success()?;
        Ok(response)
    }

    fn check_data_len(&self, response: &McResponse, need: usize) -> Result<(), MelsecError> {
        if response.data.len() < need {
            return Err(MelsecError::Transport(format!(
                "response data too short: need {need} bytes, have {have}",
                have = response.data.len()
            )));
        }
        Ok(())
    }

    /// Batch read in word units (e.g. 16 registers from "D1000").
    /// Values are returned as signed 16-bit integers.
    pub fn batchread_wordunits(
        &mut self,
        headdevice: &str,
        readsize: u16,
    ) -> Result<Vec<i16>, MelsecError> {
        let mut enc = self.encoder();
        enc.put_device_ref(self.plc_series, headdevice)?;
        enc.put_u16(readsize);
        let subcommand = self.device_subcommand(false);
        let response = self.round_trip(CMD_BATCH_READ, subcommand, enc.into_bytes())?;

        let ws = self.comm_type.word_size();
        let count = usize::from(readsize);
        self.check_data_len(&response, count * ws)?;
        let mut values = Vec::with_capacity(count);
        for i in 0..count {
            values.push(codec::get_i16(
                self.comm_type,
                &response.data[i * ws..(i + 1) * ws],
            )?);
        }
        Ok(values)
    }

    /// Batch read in bit units (e.g. 20 points from "X10").
    pub fn batchread_bitunits(
        &mut self,
        headdevice: &str,
        readsize: u16,
    ) -> Result<Vec<bool>, MelsecError> {
        let mut enc = self.encoder();
        enc.put_device_ref(self.plc_series, headdevice)?;
        enc.put_u16(readsize);
        let subcommand = self.device_subcommand(true);
        let response = self.round_trip(CMD_BATCH_READ, subcommand, enc.into_bytes())?;
        codec::unpack_bits(self.comm_type, &response.data, usize::from(readsize))
    }

    /// Batch write in word units.
    pub fn batchwrite_wordunits(
        &mut self,
        headdevice: &str,
        values: &[i16],
    ) -> Result<(), MelsecError> {
        let write_size = u16::try_from(values.len()).map_err(|_| {
            MelsecError::InvalidValue("too many write values for one request".to_string())
        })?;
        let mut enc = self.encoder();
        enc.put_device_ref(self.plc_series, headdevice)?;
        enc.put_u16(write_size);
        for value in values {
            enc.put_i16(*value);
        }
        let subcommand = self.device_subcommand(false);
        self.round_trip(CMD_BATCH_WRITE, subcommand, enc.into_bytes())?;
        Ok(())
    }

    /// Batch write in bit units.
    pub fn batchwrite_bitunits(
        &mut self,
        headdevice: &str,
        values: &[bool],
    ) -> Result<(), MelsecError> {
        let write_size = u16::try_from(values.len()).map_err(|_| {
            MelsecError::InvalidValue("too many write values for one request".to_string())
        })?;
        let mut enc = self.encoder();
        enc.put_device_ref(self.plc_series, headdevice)?;
        enc.put_u16(write_size);
        enc.put_bits(values);
        let subcommand = self.device_subcommand(true);
        self.round_trip(CMD_BATCH_WRITE, subcommand, enc.into_bytes())?;
        Ok(())
    }

    /// Random read of scattered word and dword devices.
    ///
    /// Word values decode as signed 16-bit, dword values as signed 32-bit
    /// spanning two consecutive word cells, low word first. The PLC caps
    /// each list at 192 points and reports overflow with a completion code.
    pub fn randomread(
        &mut self,
        word_devices: &[&str],
        dword_devices: &[&str],
    ) -> Result<(Vec<i16>, Vec<i32>), MelsecError> {
        let word_count = u8::try_from(word_devices.len()).map_err(|_| {
            MelsecError::InvalidValue("too many word devices for one request".to_string())
        })?;
        let dword_count = u8::try_from(dword_devices.len()).map_err(|_| {
            MelsecError::InvalidValue("too many dword devices for one request".to_string())
        })?;

        let mut enc = self.encoder();
        enc.put_u8(word_count);
        enc.put_u8(dword_count);
        for device in word_devices {
            enc.put_device_ref(self.plc_series, device)?;
        }
        for device in dword_devices {
            enc.put_device_ref(self.plc_series, device)?;
        }
        let subcommand = self.device_subcommand(false);
        let response = self.round_trip(CMD_RANDOM_READ, subcommand, enc.into_bytes())?;

        let ws = self.comm_type.word_size();
        self.check_data_len(
            &response,
            word_devices.len() * ws + dword_devices.len() * ws * 2,
        )?;
        let mut idx = 0;
        let mut word_values = Vec::with_capacity(word_devices.len());
        for _ in word_devices {
            word_values.push(codec::get_i16(self.comm_type, &response.data[idx..idx + ws])?);
            idx += ws;
        }
        let mut dword_values = Vec::with_capacity(dword_devices.len());
        for _ in dword_devices {
            dword_values.push(codec::get_i32(
                self.comm_type,
                &response.data[idx..idx + ws * 2],
            )?);
            idx += ws * 2;
        }
        Ok((word_values, dword_values))
    }

    /// Random write of scattered word and dword devices.
    pub fn randomwrite(
        &mut self,
        word_devices: &[&str],
        word_values: &[i16],
        dword_devices: &[&str],
        dword_values: &[i32],
    ) -> Result<(), MelsecError> {
        if word_devices.len() != word_values.len() {
            return Err(MelsecError::InvalidValue(
                "word_devices and word_values must be same length".to_string(),
            ));
        }
        if dword_devices.len() != dword_values.len() {
            return Err(MelsecError::InvalidValue(
                "dword_devices and dword_values must be same length".to_string(),
            ));
        }
        let word_count = u8::try_from(word_devices.len()).map_err(|_| {
            MelsecError::InvalidValue("too many word devices for one request".to_string())
        })?;
        let dword_count = u8::try_from(dword_devices.len()).map_err(|_| {
            MelsecError::InvalidValue("too many dword devices for one request".to_string())
        })?;

        let mut enc = self.encoder();
        enc.put_u8(word_count);
        enc.put_u8(dword_count);
        for (device, value) in word_devices.iter().zip(word_values) {
            enc.put_device_ref(self.plc_series, device)?;
            enc.put_i16(*value);
        }
        for (device, value) in dword_devices.iter().zip(dword_values) {
            enc.put_device_ref(self.plc_series, device)?;
            enc.put_i32(*value);
        }
        let subcommand = self.device_subcommand(false);
        self.round_trip(CMD_RANDOM_WRITE, subcommand, enc.into_bytes())?;
        Ok(())
    }

    /// Random write of scattered bit devices.
    pub fn randomwrite_bitunits(
        &mut self,
        bit_devices: &[&str],
        values: &[bool],
    ) -> Result<(), MelsecError> {
        if bit_devices.len() != values.len() {
            return Err(MelsecError::InvalidValue(
                "bit_devices and values must be same length".to_string(),
            ));
        }
        let write_size = u8::try_from(bit_devices.len()).map_err(|_| {
            MelsecError::InvalidValue("too many bit devices for one request".to_string())
        })?;

        let mut enc = self.encoder();
        enc.put_u8(write_size);
        for (device, value) in bit_devices.iter().zip(values) {
            enc.put_device_ref(self.plc_series, device)?;
            // iQ-R requires 2-byte bit values
            if self.plc_series.uses_extended_device() {
                enc.put_u16(u16::from(*value));
            } else {
                enc.put_u8(u8::from(*value));
            }
        }
        let subcommand = self.device_subcommand(true);
        self.round_trip(CMD_RANDOM_WRITE, subcommand, enc.into_bytes())?;
        Ok(())
    }

    /// Remote RUN. `force_exec` overrides a remote state set by another
    /// device.
    pub fn remote_run(
        &mut self,
        clear_mode: ClearMode,
        force_exec: bool,
    ) -> Result<(), MelsecError> {
        let mut enc = self.encoder();
        enc.put_u16(if force_exec { MODE_FORCE } else { MODE_NORMAL });
        enc.put_u16(clear_mode.as_u16());
        self.round_trip(CMD_REMOTE_RUN, SUBCMD_NONE, enc.into_bytes())?;
        Ok(())
    }

    /// Remote STOP.
    pub fn remote_stop(&mut self) -> Result<(), MelsecError> {
        let mut enc = self.encoder();
        enc.put_u16(0x0001); // fixed value
        self.round_trip(CMD_REMOTE_STOP, SUBCMD_NONE, enc.into_bytes())?;
        Ok(())
    }

    /// Remote PAUSE.
    pub fn remote_pause(&mut self, force_exec: bool) -> Result<(), MelsecError> {
        let mut enc = self.encoder();
        enc.put_u16(if force_exec { MODE_FORCE } else { MODE_NORMAL });
        self.round_trip(CMD_REMOTE_PAUSE, SUBCMD_NONE, enc.into_bytes())?;
        Ok(())
    }

    /// ラッチクリア。PLC が STOP 状態のときのみ実行可能。
    pub fn remote_latchclear(&mut self) -> Result<(), MelsecError> {
        let mut enc = self.encoder();
        enc.put_u16(0x0001); // fixed value
        self.round_trip(CMD_REMOTE_LATCH_CLEAR, SUBCMD_NONE, enc.into_bytes())?;
        Ok(())
    }

    /// リモートリセット。送信後 PLC 側がリンクを切るため応答は読まず、
    /// こちらからも切断する。再接続は呼び出し側で行うこと。
    pub fn remote_reset(&mut self) -> Result<(), MelsecError> {
        let mut enc = self.encoder();
        enc.put_u16(0x0001); // fixed value
        let payload = self.build_payload(CMD_REMOTE_RESET, SUBCMD_NONE, enc.into_bytes())?;
        let transport = self.transport.as_mut().ok_or(MelsecError::NotConnected)?;
        transport.send_all(&payload)?;
        self.close();
        Ok(())
    }

    /// Read the CPU model. Returns the model name (padding spaces removed)
    /// and the 4-character type code.
    pub fn read_cputype(&mut self) -> Result<(String, String), MelsecError> {
        let response = self.round_trip(CMD_READ_CPU_MODEL, SUBCMD_NONE, Vec::new())?;

        let code_len = self.comm_type.word_size();
        self.check_data_len(&response, CPU_NAME_LEN + code_len)?;
        let name = std::str::from_utf8(&response.data[..CPU_NAME_LEN])
            .map_err(|_| MelsecError::Transport("CPU model name is not ASCII".to_string()))?
            .replace(' ', "");
        let code = match self.comm_type {
            CommType::Binary => {
                let raw = codec::get_u16(CommType::Binary, &response.data[CPU_NAME_LEN..])?;
                format!("{raw:04x}")
            }
            CommType::Ascii => {
                std::str::from_utf8(&response.data[CPU_NAME_LEN..CPU_NAME_LEN + code_len])
                    .map_err(|_| MelsecError::Transport("CPU type code is not ASCII".to_string()))?
                    .to_string()
            }
        };
        Ok((name, code))
    }

    fn check_password(&self, password: &str) -> Result<u16, MelsecError> {
        if !password.is_ascii() {
            return Err(MelsecError::InvalidValue(
                "password must be only ascii code".to_string(),
            ));
        }
        if self.plc_series.uses_extended_device() {
            if !(6..=32).contains(&password.len()) {
                return Err(MelsecError::InvalidValue(
                    "password length must be from 6 to 32".to_string(),
                ));
            }
        } else if password.len() != 4 {
            return Err(MelsecError::InvalidValue(
                "password length must be 4".to_string(),
            ));
        }
        Ok(password.len() as u16)
    }

    /// Unlock the remote password.
    pub fn remote_unlock(&mut self, password: &str) -> Result<(), MelsecError> {
        let len = self.check_password(password)?;
        let mut enc = self.encoder();
        enc.put_u16(len);
        enc.put_raw(password.as_bytes());
        self.round_trip(CMD_REMOTE_UNLOCK, SUBCMD_NONE, enc.into_bytes())?;
        Ok(())
    }

    /// Lock the remote password.
    pub fn remote_lock(&mut self, password: &str) -> Result<(), MelsecError> {
        let len = self.check_password(password)?;
        let mut enc = self.encoder();
        enc.put_u16(len);
        enc.put_raw(password.as_bytes());
        self.round_trip(CMD_REMOTE_LOCK, SUBCMD_NONE, enc.into_bytes())?;
        Ok(())
    }

    /// Echo test. `echo_data` must be 1 to 960 ASCII alphanumeric
    /// characters; returns the echoed length and data.
    pub fn echo_test(&mut self, echo_data: &str) -> Result<(u16, String), MelsecError> {
        if echo_data.is_empty() || echo_data.len() > ECHO_MAX_LEN {
            return Err(MelsecError::InvalidValue(
                "echo_data length must be from 1 to 960".to_string(),
            ));
        }
        if !echo_data.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(MelsecError::InvalidValue(
                "echo_data must be only alphabet or digit code".to_string(),
            ));
        }

        let mut enc = self.encoder();
        enc.put_u16(echo_data.len() as u16);
        enc.put_raw(echo_data.as_bytes());
        let response = self.round_trip(CMD_ECHO_TEST, SUBCMD_NONE, enc.into_bytes())?;

        let ws = self.comm_type.word_size();
        self.check_data_len(&response, ws)?;
        let answer_len = codec::get_u16(self.comm_type, &response.data[..ws])?;
        let answer = String::from_utf8(response.data[ws..].to_vec())
            .map_err(|_| MelsecError::Transport("echo response is not ASCII".to_string()))?;
        Ok((answer_len, answer))
    }
}

impl std::fmt::Debug for McClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McClient")
            .field("plc_series", &self.plc_series)
            .field("comm_type", &self.comm_type)
            .field("options", &self.options)
            .field("transport", &self.transport)
            .finish()
    }
}
