#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread::{self, JoinHandle};

/// One-shot mock PLC: accept a single connection, capture one request,
/// send the canned reply and return the captured request bytes.
pub fn spawn_one_shot(reply: Vec<u8>) -> (u16, JoinHandle<Vec<u8>>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock server");
    let port = listener.local_addr().expect("local addr").port();
    let handle = thread::spawn(move || {
        let (mut sock, _) = listener.accept().expect("accept");
        let mut buf = [0u8; 4096];
        let n = sock.read(&mut buf).expect("read request");
        if !reply.is_empty() {
            sock.write_all(&reply).expect("write reply");
        }
        buf[..n].to_vec()
    });
    (port, handle)
}

/// Classic binary 3E reply frame with the given completion status and data.
pub fn binary_reply(status: u16, data: &[u8]) -> Vec<u8> {
    let mut reply = vec![0xD0, 0x00, 0x00, 0xFF, 0xFF, 0x03, 0x00];
    let len = u16::try_from(2 + data.len()).expect("reply fits length field");
    reply.extend_from_slice(&len.to_le_bytes());
    reply.extend_from_slice(&status.to_le_bytes());
    reply.extend_from_slice(data);
    reply
}

/// Classic ASCII 3E reply frame.
pub fn ascii_reply(status: u16, data: &str) -> Vec<u8> {
    let mut reply = String::from("D00000FF03FF00");
    let len = 4 + data.len();
    reply.push_str(&format!("{len:04X}"));
    reply.push_str(&format!("{status:04X}"));
    reply.push_str(data);
    reply.into_bytes()
}
