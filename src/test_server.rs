use crate::config::ServerConfig;
use crate::server::FtpServer;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn test_config() -> ServerConfig {
    ServerConfig {
        listen_port: 0,
        pasv_port: 0,
        settle_delay_ms: 0,
        ..ServerConfig::default()
    }
}

fn greet(port: u16) -> BufReader<TcpStream> {
    let stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
    stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    reader.read_line(&mut line).unwrap();
    assert!(line.starts_with("220 "), "{}", line);
    reader
}

fn send(reader: &mut BufReader<TcpStream>, line: &str) -> String {
    reader
        .get_mut()
        .write_all(format!("{}\r\n", line).as_bytes())
        .unwrap();
    let mut reply = String::new();
    reader.read_line(&mut reply).unwrap();
    reply
}

#[test]
fn test_stop_without_start() {
    let server = FtpServer::new(test_config());
    assert!(server.stop().is_ok());
    assert!(!server.is_enabled());
}

#[test]
fn test_start_stop_start_again() {
    let server = FtpServer::new(test_config());
    let lines = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&lines);
    server.register_screen_log_callback(Some(Arc::new(move |line: &str| {
        sink.lock().unwrap().push(line.to_string());
    })));

    server.start().unwrap();
    // A second start while running is a no-op.
    server.start().unwrap();
    let port = server.wait_until_listening(Duration::from_secs(5)).unwrap();
    assert!(server.is_enabled());
    let _client = greet(port);

    server.stop().unwrap();
    assert!(!server.is_enabled());
    assert_eq!(server.state(), 0);
    assert!(TcpStream::connect(("127.0.0.1", port)).is_err());

    server.start().unwrap();
    let port = server.wait_until_listening(Duration::from_secs(5)).unwrap();
    greet(port);
    server.stop().unwrap();

    let lines = lines.lock().unwrap();
    assert!(lines.iter().any(|line| line.contains("FTP server stopped")));
}

#[test]
fn test_credentials_change_applies_to_next_pass() {
    let server = FtpServer::new(test_config());
    server.start().unwrap();
    let port = server.wait_until_listening(Duration::from_secs(5)).unwrap();

    let mut reader = greet(port);

    server.set_credentials("bob", "hunter2");
    std::thread::sleep(Duration::from_millis(50));
    assert!(send(&mut reader, "USER bob").starts_with("331 "));
    assert!(send(&mut reader, "PASS hunter2").starts_with("230 "));
    assert!(send(&mut reader, "QUIT").starts_with("221 "));

    server.set_credentials("", "");
    std::thread::sleep(Duration::from_millis(50));
    let mut reader = greet(port);
    assert!(send(&mut reader, "USER ftp").starts_with("331 "));
    assert!(send(&mut reader, "PASS ftp123").starts_with("230 "));
    assert!(send(&mut reader, "QUIT").starts_with("221 "));

    server.stop().unwrap();
}
