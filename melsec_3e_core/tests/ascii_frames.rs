mod util;

use melsec_3e::{AccessOptionsPatch, CommType, McClient, MelsecError, PLCSeries};
use util::{ascii_reply, spawn_one_shot};

fn ascii_client() -> McClient {
    McClient::new(PLCSeries::Q).with_comm_type(CommType::Ascii)
}

#[test]
fn ascii_word_read_frame() {
    let (port, server) = spawn_one_shot(ascii_reply(0, "30D4"));

    let mut client = ascii_client();
    client.connect("127.0.0.1", port).expect("connect");
    let values = client.batchread_wordunits("D100", 1).expect("word read");
    assert_eq!(values, vec![12500]);

    let request = server.join().expect("server thread");
    assert_eq!(
        String::from_utf8(request).expect("ascii request"),
        "500000FF03FF000018000404010000D*0001000001"
    );
}

#[test]
fn ascii_bit_read_returns_character_stream() {
    let (port, server) = spawn_one_shot(ascii_reply(0, "101"));

    let mut client = ascii_client();
    client.connect("127.0.0.1", port).expect("connect");
    let bits = client.batchread_bitunits("X10", 3).expect("bit read");
    assert_eq!(bits, vec![true, false, true]);

    let request = server.join().expect("server thread");
    assert_eq!(
        String::from_utf8(request).expect("ascii request"),
        "500000FF03FF000018000404010001X*0000100003"
    );
}

#[test]
fn ascii_bit_write_one_char_per_bit() {
    let (port, server) = spawn_one_shot(ascii_reply(0, ""));

    let mut client = ascii_client();
    client.connect("127.0.0.1", port).expect("connect");
    client
        .batchwrite_bitunits("M0", &[true, false, true])
        .expect("bit write");

    let request = server.join().expect("server thread");
    assert_eq!(
        String::from_utf8(request).expect("ascii request"),
        "500000FF03FF00001B000414010001M*0000000003101"
    );
}

#[test]
fn ascii_status_errors_dispatch_like_binary() {
    let (port, server) = spawn_one_shot(ascii_reply(0xC050, ""));

    let mut client = ascii_client();
    client.connect("127.0.0.1", port).expect("connect");
    let err = client
        .batchread_wordunits("D0", 1)
        .expect_err("0xC050 must fail");
    assert_eq!(err.completion_code(), Some(0xC050));
    server.join().expect("server thread");
}

#[test]
fn comm_type_switch_via_access_options() {
    let (port, server) = spawn_one_shot(ascii_reply(0, "0001"));

    let mut client = McClient::new(PLCSeries::Q);
    client
        .set_access_options(AccessOptionsPatch {
            commtype: Some(CommType::Ascii),
            ..AccessOptionsPatch::default()
        })
        .expect("switch to ascii");
    client.connect("127.0.0.1", port).expect("connect");
    let values = client.batchread_wordunits("D0", 1).expect("word read");
    assert_eq!(values, vec![1]);
    server.join().expect("server thread");
}

#[test]
fn hex_notation_device_renders_hex_address() {
    let (port, server) = spawn_one_shot(ascii_reply(0, "0000"));

    let mut client = ascii_client();
    client.connect("127.0.0.1", port).expect("connect");
    client.batchread_wordunits("W0x1FFF", 1).expect("word read");

    let request = server.join().expect("server thread");
    let request = String::from_utf8(request).expect("ascii request");
    assert!(
        request.ends_with("W*001FFF0001"),
        "unexpected device field in {request}"
    );
}

#[test]
fn malformed_ascii_reply_is_transport_error() {
    // length field contains non-hex characters
    let (port, server) = spawn_one_shot(b"D00000FF03FF00ZZZZ0000".to_vec());

    let mut client = ascii_client();
    client.connect("127.0.0.1", port).expect("connect");
    assert!(matches!(
        client.batchread_wordunits("D0", 1),
        Err(MelsecError::Transport(_))
    ));
    server.join().expect("server thread");
}
