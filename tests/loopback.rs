//! TLS loopback integration tests
//!
//! These tests run real OpenSSL sessions over socket pairs and TCP loopback:
//! - write/read round trips across several handshakes
//! - bulk copy through a session
//! - close-notify versus a dropped transport
//! - a corrupted record poisoning the session
//! - wait timeouts during the handshake

use nbtls::copy::{BufSource, ChunkSource};
use nbtls::tls::{OpenSslEngine, SessionState, TlsConfig, TlsSession, TlsVersion};
use nbtls::{Error, FaultKind, PollScheduler, SessionOps};
use std::io::{self, Cursor, IoSlice, Read, Write};
use std::net::{Shutdown, TcpListener, TcpStream};
use std::os::unix::net::UnixStream;
use std::thread;
use std::time::Duration;

type UnixSession = TlsSession<OpenSslEngine<UnixStream>>;

fn scheduler() -> PollScheduler {
    PollScheduler::with_timeout(Duration::from_secs(10))
}

fn server_config() -> TlsConfig {
    TlsConfig::server().unwrap().build().unwrap()
}

fn client_config() -> TlsConfig {
    TlsConfig::client()
        .unwrap()
        .servername("localhost")
        .build()
        .unwrap()
}

/// Handshake both ends of a socket pair; the server runs `server` on its thread
fn handshake_pair<F, T>(server: F) -> (UnixSession, thread::JoinHandle<T>)
where
    F: FnOnce(UnixSession) -> T + Send + 'static,
    T: Send + 'static,
{
    let (a, b) = UnixStream::pair().unwrap();
    let server_config = server_config();

    let handle = thread::spawn(move || {
        let session = server_config
            .session_with(b, scheduler())
            .unwrap()
            .accept()
            .unwrap();
        server(session)
    });

    let client = client_config()
        .session_with(a, scheduler())
        .unwrap()
        .connect()
        .unwrap();

    (client, handle)
}

#[test]
fn test_round_trip_over_several_handshakes() {
    for cycle in 0..3u8 {
        let (mut client, server) = handshake_pair(|mut session| {
            let mut buf = [0u8; 11];
            session.read_exact(&mut buf).unwrap();
            session.write_all(&buf).unwrap();

            // client's close-notify
            assert_eq!(session.read(&mut buf).unwrap(), 0);
            session.close().unwrap();
        });

        assert!(client.state().is_connected());

        let tag = [b'0' + cycle];
        let bufs = [
            IoSlice::new(b"hello"),
            IoSlice::new(&tag),
            IoSlice::new(b""),
            IoSlice::new(b"world"),
        ];
        assert_eq!(client.write_vectored(&bufs).unwrap(), 11);

        let mut echo = [0u8; 11];
        client.read_exact(&mut echo).unwrap();
        let mut expected = b"hello".to_vec();
        expected.push(b'0' + cycle);
        expected.extend_from_slice(b"world");
        assert_eq!(&echo[..], &expected[..]);

        client.shutdown(Shutdown::Write).unwrap();
        assert_eq!(*client.state(), SessionState::ShutdownClean);

        server.join().unwrap();
    }
}

#[test]
fn test_tcp_client_server() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let server_config = TlsConfig::server()
        .unwrap()
        .version(TlsVersion::Tls13)
        .unwrap()
        .build()
        .unwrap();

    let server = thread::spawn(move || {
        let (tcp, _) = listener.accept().unwrap();
        let mut session = server_config.accept(tcp).unwrap();

        let mut buf = [0u8; 5];
        session.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"Hello");
        session.write_all(b"World").unwrap();
        assert_eq!(session.read(&mut buf).unwrap(), 0);
        session.close().unwrap();
    });

    let tcp = TcpStream::connect(addr).unwrap();
    let mut client = client_config().connect(tcp).unwrap();

    let info = client.info();
    assert_eq!(info.version, "TLSv1.3");
    assert!(info.cipher.is_some());
    assert_eq!(info.peer().map(|c| c.subject.as_str()), Some("localhost"));
    assert_eq!(client.peer_certificate().unwrap().issuer, "localhost");

    client.write_all(b"Hello").unwrap();
    let mut buf = [0u8; 5];
    client.read_exact(&mut buf).unwrap();
    assert_eq!(&buf, b"World");

    client.shutdown(Shutdown::Write).unwrap();
    server.join().unwrap();
}

#[test]
fn test_copy_through_session() {
    let data: Vec<u8> = (0..256 * 1024).map(|i| (i % 251) as u8).collect();
    let expected = data.clone();

    let (mut client, server) = handshake_pair(move |mut session| {
        let mut received = Vec::new();
        session.read_to_end(&mut received).unwrap();
        session.close().unwrap();
        received
    });

    let n = client.copy_from(&mut BufSource::new(Cursor::new(data))).unwrap();
    assert_eq!(n, expected.len() as u64);

    let mut tail: ChunkSource = vec![&b"tail"[..]].into_iter().collect();
    assert_eq!(client.copy_from(&mut tail).unwrap(), 4);

    client.shutdown(Shutdown::Write).unwrap();
    let received = server.join().unwrap();

    assert_eq!(received.len(), expected.len() + 4);
    assert_eq!(&received[..expected.len()], &expected[..]);
    assert_eq!(&received[expected.len()..], b"tail");
}

#[test]
fn test_dropped_transport_reads_as_eof() {
    let (mut client, server) = handshake_pair(|session| {
        // dropped without close-notify
        drop(session);
    });
    server.join().unwrap();

    let mut buf = [0u8; 16];
    assert_eq!(client.read(&mut buf).unwrap(), 0);
    assert_eq!(*client.state(), SessionState::ShutdownClean);

    // no close-notify is attempted on the dead session
    client.close().unwrap();
}

#[test]
fn test_corrupt_record_poisons_session() {
    let (mut client, server) = handshake_pair(|mut session| {
        // an application-data record that cannot decrypt
        session
            .get_mut()
            .write_all(b"\x17\x03\x03\x00\x10garbage-garbage!")
            .unwrap();
        session
    });
    let _server = server.join().unwrap();

    let mut buf = [0u8; 16];
    let first = client.read(&mut buf).unwrap_err();
    let fault = first.fault().cloned().expect("fatal TLS fault");
    assert_eq!(fault.kind, FaultKind::Protocol);
    assert_eq!(*client.state(), SessionState::ShutdownError(fault.clone()));

    let again = client.read(&mut buf).unwrap_err();
    assert_eq!(again.fault(), Some(&fault));

    let write = client.write_all(b"more").unwrap_err();
    assert_eq!(write.kind(), io::ErrorKind::Other);

    let close = client.close().unwrap_err();
    assert_eq!(close.fault(), Some(&fault));
}

#[test]
fn test_plaintext_peer_fails_handshake() {
    let (a, mut b) = UnixStream::pair().unwrap();

    let peer = thread::spawn(move || {
        b.write_all(b"HTTP/1.1 400 Bad Request\r\n\r\n").unwrap();
        b
    });

    let result = client_config().session_with(a, scheduler()).unwrap().connect();
    let err = result.err().expect("handshake must fail");
    assert_eq!(err.fault().map(|f| f.kind), Some(FaultKind::Protocol));

    drop(peer.join().unwrap());
}

#[test]
fn test_handshake_wait_times_out() {
    let (a, _silent) = UnixStream::pair().unwrap();

    let result = client_config()
        .session_with(a, PollScheduler::with_timeout(Duration::from_millis(100)))
        .unwrap()
        .connect();

    match result.err() {
        Some(Error::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::TimedOut),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_plain_passthrough_before_handshake() {
    let (a, mut b) = UnixStream::pair().unwrap();
    let mut session = client_config().session_with(a, scheduler()).unwrap();
    assert_eq!(*session.state(), SessionState::Uninitialized);

    b.write_all(b"STARTTLS\r\n").unwrap();
    let mut line = [0u8; 10];
    session.read_exact(&mut line).unwrap();
    assert_eq!(&line, b"STARTTLS\r\n");

    SessionOps::write_vectored(&mut session, &[IoSlice::new(b"OK\r\n")]).unwrap();
    let mut reply = [0u8; 4];
    b.read_exact(&mut reply).unwrap();
    assert_eq!(&reply, b"OK\r\n");
}

#[test]
fn test_plain_read_before_handshake_times_out() {
    let (a, _silent) = UnixStream::pair().unwrap();
    let mut session = client_config()
        .session_with(a, PollScheduler::with_timeout(Duration::from_millis(100)))
        .unwrap();

    let mut buf = [0u8; 4];
    match session.read(&mut buf) {
        Err(Error::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::TimedOut),
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(*session.state(), SessionState::Uninitialized);
}

#[test]
fn test_reset_peer_poisons_with_syscall_fault() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let server_config = server_config();

    let server = thread::spawn(move || {
        let (tcp, _) = listener.accept().unwrap();
        let session = server_config.session_with(tcp, scheduler()).unwrap().accept().unwrap();
        // abortive close: RST instead of FIN
        socket2::SockRef::from(session.get_ref())
            .set_linger(Some(Duration::ZERO))
            .unwrap();
        drop(session);
    });

    let tcp = TcpStream::connect(addr).unwrap();
    let mut client = client_config().session_with(tcp, scheduler()).unwrap().connect().unwrap();
    server.join().unwrap();

    let mut buf = [0u8; 16];
    let err = client.read(&mut buf).unwrap_err();
    let fault = err.fault().cloned().expect("fatal TLS fault");
    assert_eq!(fault.kind, FaultKind::Syscall);
    assert_eq!(fault.io_kind, Some(io::ErrorKind::ConnectionReset));
    assert_eq!(*client.state(), SessionState::ShutdownError(fault));

    let converted = io::Error::from(err);
    assert_eq!(converted.kind(), io::ErrorKind::ConnectionReset);
}

#[test]
fn test_transport_reclaimed_after_clean_shutdown() {
    let (mut client, server) = handshake_pair(|mut session| {
        session.shutdown(Shutdown::Write).unwrap();

        let mut plain = session.into_inner().unwrap();
        plain.set_nonblocking(false).unwrap();
        plain.write_all(b"plain again").unwrap();

        // the client's close-notify arrives as raw bytes now
        let mut buf = [0u8; 64];
        assert!(plain.read(&mut buf).unwrap() > 0);
    });

    let mut buf = [0u8; 16];
    assert_eq!(client.read(&mut buf).unwrap(), 0);
    client.shutdown(Shutdown::Write).unwrap();

    let mut plain = client.into_inner().unwrap();
    plain.set_nonblocking(false).unwrap();
    server.join().unwrap();

    let mut rest = Vec::new();
    plain.read_to_end(&mut rest).unwrap();
    assert_eq!(rest, b"plain again");
}
