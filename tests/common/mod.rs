//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use httpfromtcp::config::ServerConfig;
use httpfromtcp::http::{serve, Handler, ServerHandle};

/// Start `handler` on an ephemeral localhost port.
#[allow(dead_code)]
pub async fn start_server<H: Handler>(handler: H) -> ServerHandle {
    let mut config = ServerConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.http.read_buffer_size = 8;
    serve(&config, handler).await.unwrap()
}

/// Start a simple mock backend that returns a fixed response.
#[allow(dead_code)]
pub async fn start_mock_backend(response: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let mut scratch = [0u8; 1024];
                        let _ = socket.read(&mut scratch).await;
                        let response_str = format!(
                            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            response.len(),
                            response
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Send `pieces` with a pause between each, then read until the server closes.
#[allow(dead_code)]
pub async fn exchange(addr: SocketAddr, pieces: &[&str]) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    for piece in pieces {
        stream.write_all(piece.as_bytes()).await.unwrap();
        stream.flush().await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    let mut response = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut response))
        .await
        .expect("server should close the connection")
        .unwrap();
    response
}

/// Split a raw response into head and body at the first blank line.
#[allow(dead_code)]
pub fn split_head(response: &[u8]) -> (String, Vec<u8>) {
    let at = response
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("response has a header section");
    (
        String::from_utf8(response[..at + 4].to_vec()).unwrap(),
        response[at + 4..].to_vec(),
    )
}

/// Decode a chunked body; returns the payload and the raw trailer section.
#[allow(dead_code)]
pub fn decode_chunked(mut wire: &[u8]) -> (Vec<u8>, String) {
    let mut body = Vec::new();
    loop {
        let line_end = wire.windows(2).position(|w| w == b"\r\n").expect("chunk size line");
        let size_str = std::str::from_utf8(&wire[..line_end]).unwrap();
        let size = usize::from_str_radix(size_str, 16).unwrap();
        wire = &wire[line_end + 2..];
        if size == 0 {
            return (body, String::from_utf8(wire.to_vec()).unwrap());
        }
        body.extend_from_slice(&wire[..size]);
        assert_eq!(&wire[size..size + 2], b"\r\n");
        wire = &wire[size + 2..];
    }
}
