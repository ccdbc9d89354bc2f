#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::doc_markdown,
    clippy::too_long_first_doc_paragraph
)]

//! melsec_3e
//!
//! melsec_3e は三菱 PLC の MC プロトコル (3E フレーム) を TCP 経由で話す
//! クライアントライブラリです。
//!
//! 主な機能:
//! - デバイスメモリの一括/ランダム読み書き (ワード・ビット・ダブルワード)
//! - リモート操作 (RUN/STOP/PAUSE/RESET/ラッチクリア/パスワード/折返しテスト/CPU 形名読出し)
//! - binary / ascii 両データコード対応 (セッション単位で選択)
//! - Q / L / QnA / iQ-L / iQ-R の 5 シリーズに対応
//!
//! 使い方の簡単な例:
//! ```no_run
//! use melsec_3e::{McClient, PLCSeries};
//!
//! fn main() -> Result<(), melsec_3e::MelsecError> {
//!     let mut client = McClient::new(PLCSeries::Q);
//!     client.connect("192.168.1.10", 5007)?;
//!     let values = client.batchread_wordunits("D1000", 16)?;
//!     println!("D1000..D1015 = {values:?}");
//!     client.close();
//!     Ok(())
//! }
//! ```
//!
//! 1 セッション 1 接続・1 要求ずつの同期動作です。並列に PLC へアクセスする
//! 場合はセッション (ソケット) を分けてください。

pub mod codec;
pub mod device;
pub mod error;
pub mod error_codes;
pub mod frame;
pub mod mc_client;
pub mod mc_define;
pub mod plc_series;
pub mod toml_helpers;
pub mod transport;

pub use error::MelsecError;
pub use mc_client::McClient;
pub use mc_define::{AccessOptions, AccessOptionsPatch, AccessRoute, ClearMode, CommType};
pub use plc_series::PLCSeries;
