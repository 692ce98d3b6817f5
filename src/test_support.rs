//! Shared helpers for exercising the client against a stub tank server.
use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio::time::{Duration, timeout};

use crate::transport::{Transport, TransportOptions};

pub(crate) const TEST_TIMEOUT: Duration = Duration::from_secs(5);

pub(crate) fn run_async_test<F>(future: F) -> Result<(), String>
where
    F: Future<Output = Result<(), String>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| format!("Failed to build runtime: {}", err))?;
    runtime.block_on(future)
}

pub(crate) fn test_transport() -> Result<Transport, String> {
    Transport::new(TransportOptions::default())
        .map_err(|err| format!("Failed to build transport: {}", err))
}

pub(crate) struct StubTank {
    pub(crate) addr: SocketAddr,
    pub(crate) requests: Arc<Mutex<Vec<String>>>,
    pub(crate) task: JoinHandle<Result<(), String>>,
}

/// Serves exactly `connections` requests, answering each with whatever the
/// handler returns for `(method, path-and-query)`. Every request line seen
/// is recorded for later assertions.
pub(crate) async fn spawn_stub_tank<H>(connections: usize, handler: H) -> Result<StubTank, String>
where
    H: Fn(&str, &str) -> (u16, String) + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .map_err(|err| format!("Failed to bind stub tank: {}", err))?;
    let addr = listener
        .local_addr()
        .map_err(|err| format!("Failed to read stub tank addr: {}", err))?;
    let requests = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&requests);

    let task = tokio::spawn(async move {
        for _ in 0..connections {
            let (mut stream, _) = timeout(TEST_TIMEOUT, listener.accept())
                .await
                .map_err(|_err| "stub tank accept timed out".to_owned())?
                .map_err(|err| format!("stub tank accept failed: {}", err))?;
            let (method, target) = read_request(&mut stream).await?;
            seen.lock()
                .map_err(|_err| "stub tank request log poisoned".to_owned())?
                .push(format!("{} {}", method, target));
            let (status, body) = handler(&method, &target);
            let response = format!(
                "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                status_text(status),
                body.len(),
                body
            );
            timeout(TEST_TIMEOUT, stream.write_all(response.as_bytes()))
                .await
                .map_err(|_err| "stub tank write timed out".to_owned())?
                .map_err(|err| format!("stub tank write failed: {}", err))?;
        }
        Ok(())
    });

    Ok(StubTank {
        addr,
        requests,
        task,
    })
}

pub(crate) async fn join_stub(task: JoinHandle<Result<(), String>>) -> Result<(), String> {
    match timeout(TEST_TIMEOUT, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(err)) => Err(format!("stub tank task failed: {}", err)),
        Err(_) => Err("stub tank task timed out".to_owned()),
    }
}

async fn read_request(stream: &mut TcpStream) -> Result<(String, String), String> {
    let mut buffer: Vec<u8> = Vec::with_capacity(1024);
    let mut chunk = [0_u8; 1024];
    let header_end = loop {
        let read = timeout(TEST_TIMEOUT, stream.read(&mut chunk))
            .await
            .map_err(|_err| "stub tank read timed out".to_owned())?
            .map_err(|err| format!("stub tank read failed: {}", err))?;
        if read == 0 {
            return Err("stub tank got an empty request".to_owned());
        }
        let prefix = chunk
            .get(..read)
            .ok_or_else(|| "stub tank read length out of range".to_owned())?;
        buffer.extend_from_slice(prefix);
        if let Some(pos) = buffer.windows(4).position(|window| window == b"\r\n\r\n") {
            break pos;
        }
    };

    let head = String::from_utf8_lossy(buffer.get(..header_end).unwrap_or_default()).into_owned();
    let mut content_length = 0_usize;
    for line in head.lines().skip(1) {
        if let Some((key, value)) = line.split_once(':') {
            if key.trim().eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().unwrap_or(0);
            }
        }
    }

    // Drain the body so the peer never sees a close mid-write.
    let mut body_len = buffer.len().saturating_sub(header_end.saturating_add(4));
    while body_len < content_length {
        let read = timeout(TEST_TIMEOUT, stream.read(&mut chunk))
            .await
            .map_err(|_err| "stub tank body read timed out".to_owned())?
            .map_err(|err| format!("stub tank body read failed: {}", err))?;
        if read == 0 {
            break;
        }
        body_len = body_len.saturating_add(read);
    }

    let request_line = head.lines().next().unwrap_or_default();
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_owned();
    let target = parts.next().unwrap_or_default().to_owned();
    Ok((method, target))
}

const fn status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "OK",
    }
}
