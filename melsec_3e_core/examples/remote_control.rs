//! リモート STOP → RUN の例。RUN 時にラッチデバイス以外をクリアする。
//!
//! cargo run --example remote_control -- 192.168.1.10 5007

use melsec_3e::{ClearMode, McClient, MelsecError, PLCSeries};

fn main() -> Result<(), MelsecError> {
    let mut args = std::env::args().skip(1);
    let host = args.next().unwrap_or_else(|| "192.168.1.10".to_string());
    let port = args
        .next()
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(5007);

    let mut client = McClient::new(PLCSeries::Q);
    client.connect(&host, port)?;

    client.remote_stop()?;
    println!("PLC stopped");

    client.remote_run(ClearMode::ExceptLatch, false)?;
    println!("PLC running");

    let (len, answer) = client.echo_test("ABCD0123")?;
    println!("echo: {len} bytes, {answer}");

    client.close();
    Ok(())
}
