//! D1000 から 16 ワード読み出す簡単な例。
//!
//! cargo run --example read_words -- 192.168.1.10 5007

use melsec_3e::{McClient, MelsecError, PLCSeries};

fn main() -> Result<(), MelsecError> {
    let mut args = std::env::args().skip(1);
    let host = args.next().unwrap_or_else(|| "192.168.1.10".to_string());
    let port = args
        .next()
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(5007);

    let mut client = McClient::new(PLCSeries::Q);
    client.connect(&host, port)?;

    let (name, code) = client.read_cputype()?;
    println!("CPU: {name} (code {code})");

    let values = client.batchread_wordunits("D1000", 16)?;
    for (i, v) in values.iter().enumerate() {
        println!("D{} = {v}", 1000 + i);
    }

    client.close();
    Ok(())
}
