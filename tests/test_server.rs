use beacon::http::connection::ConnectionSettings;
use beacon::http::request::DocumentRoot;
use beacon::server::admission::MAX_CONNECTIONS;
use beacon::server::{Admission, Gate, Listener, Server, ServerHandle};
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::path::Path;
use std::time::{Duration, Instant};
use tempfile::tempdir;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

fn settings_for(root: &Path) -> ConnectionSettings {
    ConnectionSettings {
        root: DocumentRoot::new(root.to_str().unwrap(), "index.html"),
        ..ConnectionSettings::default()
    }
}

async fn start(root: &Path, admission: Admission) -> ServerHandle {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    Server::new(listener, settings_for(root))
        .with_admission(admission)
        .start()
        .unwrap()
}

async fn get(addr: SocketAddr, path: &str) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(format!("GET {} HTTP/1.1\r\nHost: test\r\n\r\n", path).as_bytes())
        .await
        .unwrap();

    let mut reply = Vec::new();
    stream.read_to_end(&mut reply).await.unwrap();
    reply
}

fn body_of(reply: &[u8]) -> &[u8] {
    let end = reply.windows(2).position(|w| w == b"\n\n").unwrap();
    &reply[end + 2..]
}

#[tokio::test]
async fn test_serves_over_tcp() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), b"<p>root</p>").unwrap();
    let server = start(dir.path(), Admission::Unbounded).await;

    let reply = get(server.local_addr(), "/").await;

    assert!(reply.starts_with(b"HTTP/1.1 200 OK\nContent-Type: text/html\nContent-Length: 11\n\n"));
    assert_eq!(body_of(&reply), b"<p>root</p>");

    let reply = get(server.local_addr(), "/missing").await;
    assert!(reply.starts_with(b"HTTP/1.1 404 Not Found\n"));

    server.stop().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_get_their_own_files() {
    let dir = tempdir().unwrap();
    for i in 0..50 {
        let content = format!("file-{i}:").repeat(500 + i);
        std::fs::write(dir.path().join(format!("f{i}.txt")), content).unwrap();
    }
    let server = start(dir.path(), Admission::Unbounded).await;
    let addr = server.local_addr();

    let clients: Vec<_> = (0..50)
        .map(|i| tokio::spawn(async move { (i, get(addr, &format!("/f{i}.txt")).await) }))
        .collect();

    for client in clients {
        let (i, reply) = client.await.unwrap();
        let expected = format!("file-{i}:").repeat(500 + i);
        let head = format!(
            "HTTP/1.1 200 OK\nContent-Type: text/plain\nContent-Length: {}\n\n",
            expected.len()
        );

        assert!(reply.starts_with(head.as_bytes()), "client {i}");
        assert_eq!(body_of(&reply), expected.as_bytes(), "client {i}");
    }

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_repeated_requests_all_close() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("a.txt"), b"a").unwrap();
    let server = start(dir.path(), Admission::Unbounded).await;

    for i in 0..200 {
        // read_to_end only returns once the server closed its side.
        let reply = match i % 3 {
            0 => get(server.local_addr(), "/a.txt").await,
            1 => get(server.local_addr(), "/b.txt").await,
            _ => {
                let mut stream = TcpStream::connect(server.local_addr()).await.unwrap();
                stream.write_all(b"HELLO\r\n\r\n").await.unwrap();
                let mut reply = Vec::new();
                stream.read_to_end(&mut reply).await.unwrap();
                reply
            }
        };
        assert!(!reply.is_empty());
    }

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_stop_closes_listener() {
    let dir = tempdir().unwrap();
    let server = start(dir.path(), Admission::Unbounded).await;
    let addr = server.local_addr();

    server.stop().await.unwrap();

    assert!(TcpStream::connect(addr).await.is_err());
}

#[tokio::test]
async fn test_bounded_admission_waits_for_a_free_slot() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("x.txt"), b"x").unwrap();
    let server = start(dir.path(), Admission::Bounded { max_connections: 1 }).await;
    let addr = server.local_addr();

    // Holds the only slot while it stays silent.
    let mut first = TcpStream::connect(addr).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let mut second = TcpStream::connect(addr).await.unwrap();
    second.write_all(b"GET /x.txt HTTP/1.1\r\n\r\n").await.unwrap();

    let mut buf = [0u8; 64];
    let early = tokio::time::timeout(Duration::from_millis(200), second.read(&mut buf)).await;
    assert!(early.is_err(), "second connection was served while the slot was taken");

    first.write_all(b"GET /x.txt HTTP/1.1\r\n\r\n").await.unwrap();
    let mut reply = Vec::new();
    first.read_to_end(&mut reply).await.unwrap();
    assert!(reply.starts_with(b"HTTP/1.1 200 OK\n"));

    let mut reply = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), second.read_to_end(&mut reply))
        .await
        .unwrap()
        .unwrap();
    assert!(reply.starts_with(b"HTTP/1.1 200 OK\n"));

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_rate_limited_admission_paces_accepts() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("x.txt"), b"x").unwrap();
    let server = start(dir.path(), Admission::RateLimited { per_second: 20 }).await;

    let started = Instant::now();
    for _ in 0..5 {
        let reply = get(server.local_addr(), "/x.txt").await;
        assert!(reply.starts_with(b"HTTP/1.1 200 OK\n"));
    }

    // Four intervals of 50ms separate five accepts.
    assert!(started.elapsed() >= Duration::from_millis(150));

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_bounded_gate_releases_on_drop() {
    let mut gate = Gate::new(Admission::Bounded { max_connections: 1 });

    let permit = gate.admit().await;
    assert_eq!(gate.available(), Some(0));
    assert!(
        tokio::time::timeout(Duration::from_millis(50), gate.admit())
            .await
            .is_err()
    );

    drop(permit);
    assert_eq!(gate.available(), Some(1));
    let _permit = tokio::time::timeout(Duration::from_millis(50), gate.admit())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_oversized_bound_is_clamped() {
    let mut gate = Gate::new(Admission::Bounded { max_connections: usize::MAX });

    assert_eq!(gate.available(), Some(MAX_CONNECTIONS));
    let _permit = gate.admit().await;
    assert_eq!(gate.available(), Some(MAX_CONNECTIONS - 1));
}

#[tokio::test]
async fn test_server_with_oversized_bound_keeps_serving() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("x.txt"), b"x").unwrap();
    let server = start(dir.path(), Admission::Bounded { max_connections: usize::MAX }).await;

    let reply = get(server.local_addr(), "/x.txt").await;
    assert!(reply.starts_with(b"HTTP/1.1 200 OK\n"));

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_unbounded_gate_never_waits() {
    let mut gate = Gate::new(Admission::Unbounded);

    let permits: Vec<_> = admit_many(&mut gate, 1000).await;
    assert_eq!(permits.len(), 1000);
    assert_eq!(gate.available(), None);
}

async fn admit_many(gate: &mut Gate, n: usize) -> Vec<beacon::server::admission::Permit> {
    let mut permits = Vec::with_capacity(n);
    for _ in 0..n {
        permits.push(gate.admit().await);
    }
    permits
}

/// Listener fed by a channel, so accept results can be scripted.
struct ScriptedListener {
    rx: mpsc::Receiver<io::Result<(DuplexStream, SocketAddr)>>,
}

impl Listener for ScriptedListener {
    type Io = DuplexStream;

    fn accept(&mut self) -> impl Future<Output = io::Result<(DuplexStream, SocketAddr)>> + Send {
        async move {
            match self.rx.recv().await {
                Some(accepted) => accepted,
                None => std::future::pending().await,
            }
        }
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        Ok(SocketAddr::from(([127, 0, 0, 1], 0)))
    }
}

#[tokio::test]
async fn test_accept_errors_do_not_stop_the_loop() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("ok.txt"), b"still up").unwrap();

    let (tx, rx) = mpsc::channel(8);
    let server = Server::new(ScriptedListener { rx }, settings_for(dir.path()))
        .start()
        .unwrap();
    let peer = SocketAddr::from(([10, 0, 0, 1], 4000));

    tx.send(Err(io::Error::other("too many open files"))).await.unwrap();
    tx.send(Err(io::Error::from(io::ErrorKind::ConnectionAborted)))
        .await
        .unwrap();

    let (mut client, socket) = tokio::io::duplex(4096);
    tx.send(Ok((socket, peer))).await.unwrap();

    client.write_all(b"GET /ok.txt HTTP/1.1\r\n\r\n").await.unwrap();
    let mut reply = Vec::new();
    client.read_to_end(&mut reply).await.unwrap();

    assert_eq!(body_of(&reply), b"still up");

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_run_until_returns_on_shutdown() {
    let dir = tempdir().unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let server = Server::new(listener, settings_for(dir.path()));

    tokio::time::timeout(
        Duration::from_secs(5),
        server.run_until(tokio::time::sleep(Duration::from_millis(20))),
    )
    .await
    .unwrap();
}
