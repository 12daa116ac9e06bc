//! Integration tests for sumwire-client.
//!
//! Each test runs a scripted server on a local tokio listener and drives the
//! real client against it over TCP.

use std::time::Duration;

use sumwire_client::output::{write_report, OutputFormat};
use sumwire_client::{Client, SumwireError};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

const SAMPLE: &[u8] = b"junk...RES\x03\x0a\x14\x1e0\n";

/// What the scripted server does after sending its chunks.
#[derive(Clone, Copy)]
enum Then {
    /// Read the checksum line and answer with the reply.
    Reply(&'static [u8]),
    /// Close the connection.
    Close,
    /// Keep the connection open until the client hangs up.
    Linger,
}

/// Start a server that expects `HELLO\n`, sends `chunks` with a short pause
/// between them, then follows `then`. The handle yields the line the client
/// sent back, if any.
async fn serve(chunks: Vec<Vec<u8>>, then: Then) -> (u16, JoinHandle<Option<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let (read_half, mut write_half) = socket.into_split();
        let mut reader = BufReader::new(read_half);

        let mut hello = String::new();
        reader.read_line(&mut hello).await.unwrap();
        assert_eq!(hello, "HELLO\n");

        for chunk in chunks {
            write_half.write_all(&chunk).await.unwrap();
            write_half.flush().await.unwrap();
            tokio::time::sleep(Duration::from_millis(2)).await;
        }

        match then {
            Then::Reply(reply) => {
                let mut line = String::new();
                reader.read_line(&mut line).await.unwrap();
                write_half.write_all(reply).await.unwrap();
                Some(line)
            }
            Then::Close => None,
            Then::Linger => {
                let mut rest = Vec::new();
                let _ = reader.read_to_end(&mut rest).await;
                None
            }
        }
    });

    (port, handle)
}

fn client(port: u16, capacity: usize) -> Client {
    Client::builder()
        .host("127.0.0.1")
        .port(port)
        .capacity(capacity)
        .scan_timeout(Some(Duration::from_secs(5)))
        .io_timeout(Some(Duration::from_secs(5)))
        .build()
        .unwrap()
}

/// Full exchange with the reference frame.
#[tokio::test]
async fn test_end_to_end_exchange() {
    let (port, server) = serve(vec![SAMPLE.to_vec()], Then::Reply(b"OK 60\n")).await;

    let exchange = client(port, 4).run_async().await.unwrap();

    assert_eq!(exchange.checksum, 60);
    assert_eq!(exchange.payload_len, 3);
    assert_eq!(exchange.trailer, *b"0\n");
    assert_eq!(exchange.response, "OK 60");
    assert_eq!(server.await.unwrap().as_deref(), Some("SUM60\n"));
}

/// Results do not depend on how the server splits its writes.
#[tokio::test]
async fn test_split_writes_and_capacities() {
    for capacity in [1, 2, 3, 4, 7, 32] {
        for size in [1, 2, 5, 11] {
            let chunks = SAMPLE.chunks(size).map(<[u8]>::to_vec).collect();
            let (port, server) = serve(chunks, Then::Reply(b"ok\n")).await;

            let exchange = client(port, capacity).run_async().await.unwrap();

            assert_eq!(exchange.checksum, 60, "capacity {capacity} split {size}");
            assert_eq!(exchange.preamble_len, 7);
            assert_eq!(server.await.unwrap().as_deref(), Some("SUM60\n"));
        }
    }
}

/// Largest frame with every payload byte at 0xFF.
#[tokio::test]
async fn test_max_payload() {
    let mut data = b"preamble RES".to_vec();
    data.push(255);
    data.extend(std::iter::repeat(0xFF).take(255));
    data.extend_from_slice(b"0\n");
    let chunks = data.chunks(64).map(<[u8]>::to_vec).collect();
    let (port, server) = serve(chunks, Then::Reply(b"done\n")).await;

    let exchange = client(port, 4).run_async().await.unwrap();

    assert_eq!(exchange.payload_len, 255);
    assert_eq!(exchange.checksum, 65025);
    assert_eq!(server.await.unwrap().as_deref(), Some("SUM65025\n"));
}

/// Response content is surfaced as-is, whatever it says.
#[tokio::test]
async fn test_response_is_not_validated() {
    let (port, server) = serve(vec![SAMPLE.to_vec()], Then::Reply(b"WRONG\n")).await;

    let exchange = client(port, 4).run_async().await.unwrap();

    assert_eq!(exchange.response, "WRONG");
    server.await.unwrap();
}

#[tokio::test]
async fn test_marker_never_sent() {
    let (port, server) = serve(vec![b"nothing to see here".to_vec()], Then::Close).await;

    let err = client(port, 4).run_async().await.unwrap_err();

    assert!(matches!(err, SumwireError::MarkerNotFound { .. }), "{err}");
    server.await.unwrap();
}

#[tokio::test]
async fn test_truncated_frame() {
    let (port, server) = serve(vec![b"RES\x05\x01\x02".to_vec()], Then::Close).await;

    let err = client(port, 4).run_async().await.unwrap_err();

    assert!(matches!(err, SumwireError::ShortRead { .. }), "{err}");
    server.await.unwrap();
}

#[tokio::test]
async fn test_server_closes_before_reply() {
    let (port, server) = serve(vec![SAMPLE.to_vec()], Then::Close).await;

    let result = client(port, 4).run_async().await;

    // The server may close before or after the checksum line lands.
    assert!(
        matches!(
            result,
            Err(SumwireError::ConnectionClosed) | Err(SumwireError::Io(_))
        ),
        "{result:?}"
    );
    server.await.unwrap();
}

/// A silent server is cut off by the socket read timeout.
#[tokio::test]
async fn test_silent_server_times_out() {
    let (port, server) = serve(vec![b"still thinking".to_vec()], Then::Linger).await;
    let client = Client::builder()
        .host("127.0.0.1")
        .port(port)
        .scan_timeout(None)
        .io_timeout(Some(Duration::from_millis(200)))
        .build()
        .unwrap();

    let err = client.run_async().await.unwrap_err();

    assert!(matches!(err, SumwireError::Io(_)), "{err}");
    server.await.unwrap();
}

/// The scan deadline holds with no socket timeout at all.
#[tokio::test]
async fn test_scan_deadline_without_io_timeout() {
    let (port, server) = serve(vec![b"still thinking".to_vec()], Then::Linger).await;
    let client = Client::builder()
        .host("127.0.0.1")
        .port(port)
        .scan_timeout(Some(Duration::from_millis(200)))
        .io_timeout(None)
        .build()
        .unwrap();

    let started = std::time::Instant::now();
    let err = client.run_async().await.unwrap_err();

    assert!(err.to_string().contains("no marker within"), "{err}");
    assert!(started.elapsed() < Duration::from_secs(5));
    server.await.unwrap();
}

/// Preamble bound stops a server that never stops talking.
#[tokio::test]
async fn test_preamble_bound() {
    let chunks = vec![vec![b'x'; 512]; 4];
    let (port, server) = serve(chunks, Then::Linger).await;
    let client = Client::builder()
        .host("127.0.0.1")
        .port(port)
        .max_preamble(1000)
        .io_timeout(Some(Duration::from_secs(5)))
        .build()
        .unwrap();

    let err = client.run_async().await.unwrap_err();

    assert!(err.to_string().contains("preamble exceeds 1000 bytes"), "{err}");
    server.await.unwrap();
}

#[tokio::test]
async fn test_connection_refused() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let err = client(port, 4).run_async().await.unwrap_err();

    assert!(matches!(err, SumwireError::Connection { .. }), "{err}");
}

/// JSON report for a real exchange.
#[tokio::test]
async fn test_json_report() {
    let (port, server) = serve(vec![SAMPLE.to_vec()], Then::Reply(b"OK\n")).await;
    let exchange = client(port, 4).run_async().await.unwrap();
    server.await.unwrap();

    let mut out = Vec::new();
    write_report(&mut out, &exchange, OutputFormat::Json).unwrap();
    let value: serde_json::Value = serde_json::from_slice(&out).unwrap();

    assert_eq!(value["checksum"], 60);
    assert_eq!(value["preamble_len"], 7);
    assert_eq!(value["response"], "OK");
}
