use crate::config::ServerConfig;
use crate::constants::FTP_DATA_TIMEOUT_MS;
use crate::core_auth::Credentials;
use crate::core_log::ScreenLog;
use crate::core_network::pasv::parse_pasv_reply;
use crate::engine::Engine;
use crate::session::{ControlState, DataState};
use rand::Rng;
use std::fs;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

struct TempDir(PathBuf);

impl TempDir {
    fn new() -> Self {
        let name = format!("pocketftpd-engine-{}", rand::thread_rng().gen::<u64>());
        let path = std::env::temp_dir().join(name);
        fs::create_dir_all(&path).unwrap();
        TempDir(path)
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.0);
    }
}

/// Engine ticking on its own thread, the way the server task drives it.
struct Harness {
    port: u16,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<Engine>>,
    screen_lines: Arc<Mutex<Vec<String>>>,
}

impl Harness {
    fn start(internal: &TempDir, external: Option<&TempDir>, cmd_timeout_ms: u64) -> Self {
        Self::start_with(internal, external, cmd_timeout_ms, FTP_DATA_TIMEOUT_MS)
    }

    fn start_with(
        internal: &TempDir,
        external: Option<&TempDir>,
        cmd_timeout_ms: u64,
        data_timeout_ms: u64,
    ) -> Self {
        let config = ServerConfig {
            listen_port: 0,
            pasv_port: 0,
            internal_mount: internal.0.to_str().unwrap().to_string(),
            external_mount: match external {
                Some(dir) => dir.0.to_str().unwrap().to_string(),
                None => internal.0.join("no-sdcard").to_str().unwrap().to_string(),
            },
            cmd_timeout_ms,
            data_timeout_ms,
            settle_delay_ms: 0,
            ..ServerConfig::default()
        };

        let screen = Arc::new(ScreenLog::new());
        let screen_lines = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&screen_lines);
        screen.register(Some(Arc::new(move |line: &str| {
            sink.lock().unwrap().push(line.to_string());
        })));

        let mut engine =
            Engine::init(config, Credentials::new("alice", "secret"), screen).unwrap();
        assert!(engine.enable());
        assert!(engine.run(0).is_continue());
        assert!(engine.run(0).is_continue());
        assert_eq!(engine.state(), ControlState::Ready);
        let port = engine.control_port().unwrap();

        let stop = Arc::new(AtomicBool::new(false));
        let task_stop = Arc::clone(&stop);
        let handle = thread::spawn(move || {
            let mut last = Instant::now();
            while !task_stop.load(Ordering::SeqCst) {
                let elapsed = last.elapsed().as_millis() as u64;
                last += Duration::from_millis(elapsed);
                if engine.run(elapsed).is_break() {
                    break;
                }
                thread::sleep(Duration::from_millis(1));
            }
            engine
        });

        Harness {
            port,
            stop,
            handle: Some(handle),
            screen_lines,
        }
    }

    fn finish(mut self) -> Engine {
        self.stop.store(true, Ordering::SeqCst);
        self.handle.take().unwrap().join().unwrap()
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

struct Client {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

impl Client {
    fn connect(port: u16) -> Self {
        let stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(10)))
            .unwrap();
        let writer = stream.try_clone().unwrap();
        let mut client = Client {
            reader: BufReader::new(stream),
            writer,
        };
        assert!(client.reply().starts_with("220 "));
        client
    }

    fn reply(&mut self) -> String {
        let mut line = String::new();
        self.reader.read_line(&mut line).unwrap();
        line
    }

    fn cmd(&mut self, line: &str) -> String {
        self.writer
            .write_all(format!("{}\r\n", line).as_bytes())
            .unwrap();
        self.reply()
    }

    fn login(&mut self) {
        assert!(self.cmd("USER alice").starts_with("331 "));
        assert!(self.cmd("PASS secret").starts_with("230 "));
    }

    fn pasv(&mut self) -> TcpStream {
        let reply = self.cmd("PASV");
        assert!(reply.starts_with("227 "), "{}", reply);
        let (ip, port) = parse_pasv_reply(&reply).unwrap();
        let data = TcpStream::connect((ip, port)).unwrap();
        data.set_read_timeout(Some(Duration::from_secs(10))).unwrap();
        data
    }
}

#[test]
fn test_login_success_and_failure() {
    let internal = TempDir::new();
    let harness = Harness::start(&internal, None, 60_000);
    let mut client = Client::connect(harness.port);

    assert!(client.cmd("USER alice").starts_with("331 "));
    assert!(client.cmd("PASS wrong").starts_with("530 "));
    assert!(client.cmd("PASS secret").starts_with("230 "));
    assert!(client.cmd("PWD").starts_with("257 \"/\""));
    assert!(client.cmd("QUIT").starts_with("221 "));
    assert_eq!(client.reply(), "");

    let mut stranger = Client::connect(harness.port);
    assert!(stranger.cmd("USER mallory").starts_with("331 "));
    assert!(stranger.cmd("PASS secret").starts_with("530 "));
    assert!(stranger.cmd("QUIT").starts_with("221 "));

    let engine = harness.finish();
    assert!(engine.ctrl.is_none());
}

#[test]
fn test_commands_before_login_need_account() {
    let internal = TempDir::new();
    let harness = Harness::start(&internal, None, 60_000);
    let mut client = Client::connect(harness.port);

    assert!(client.cmd("PWD").starts_with("332 "));
    assert!(client.cmd("LIST").starts_with("332 "));
    assert!(client.cmd("FEAT").starts_with("502 "));
    client.login();
    assert!(client.cmd("XYZZY").starts_with("502 "));
}

#[test]
fn test_repeated_login_failures_are_delayed() {
    let internal = TempDir::new();
    let harness = Harness::start(&internal, None, 60_000);
    let mut client = Client::connect(harness.port);

    for _ in 0..3 {
        assert!(client.cmd("PASS nope").starts_with("530 "));
    }
    let started = Instant::now();
    assert!(client.cmd("PASS nope").starts_with("530 "));
    assert!(started.elapsed() >= Duration::from_millis(900));
}

#[test]
fn test_transfer_commands_need_pasv() {
    let internal = TempDir::new();
    fs::write(internal.0.join("a.txt"), b"abc").unwrap();
    let harness = Harness::start(&internal, None, 60_000);
    let mut client = Client::connect(harness.port);
    client.login();

    assert!(client.cmd("LIST").starts_with("425 "));
    assert!(client.cmd("RETR /data/a.txt").starts_with("425 "));
    assert!(client.cmd("STOR /data/b.txt").starts_with("425 "));
    assert!(!internal.0.join("b.txt").exists());
}

#[test]
fn test_retr_streams_whole_file() {
    let internal = TempDir::new();
    let content: Vec<u8> = (0..300_000u32).map(|i| (i % 251) as u8).collect();
    fs::write(internal.0.join("big.bin"), &content).unwrap();
    let harness = Harness::start(&internal, None, 60_000);
    let mut client = Client::connect(harness.port);
    client.login();

    let mut data = client.pasv();
    thread::sleep(Duration::from_millis(50));
    assert!(client.cmd("RETR /data/big.bin").starts_with("150 "));
    let mut received = Vec::new();
    data.read_to_end(&mut received).unwrap();
    assert!(client.reply().starts_with("226 "));
    assert_eq!(received, content);

    assert!(client.cmd("NOOP").starts_with("200 "));
    let engine = harness.finish();
    assert_eq!(engine.transferred(), content.len() as u64);
    assert_eq!(engine.state(), ControlState::Ready);
    assert_eq!(engine.substate(), DataState::Disconnected);
}

#[test]
fn test_stor_receives_upload() {
    let internal = TempDir::new();
    let harness = Harness::start(&internal, None, 60_000);
    let mut client = Client::connect(harness.port);
    client.login();

    let mut data = client.pasv();
    thread::sleep(Duration::from_millis(50));
    assert!(client.cmd("CWD /data").starts_with("250 "));
    assert!(client.cmd("STOR upload.txt").starts_with("150 "));
    data.write_all(b"uploaded over the data connection").unwrap();
    data.shutdown(Shutdown::Both).unwrap();
    drop(data);
    assert!(client.reply().starts_with("226 "));

    assert!(client.cmd("PWD").contains("\"/data\""));
    assert_eq!(
        fs::read(internal.0.join("upload.txt")).unwrap(),
        b"uploaded over the data connection"
    );
    drop(client);

    let lines = harness.screen_lines.lock().unwrap().clone();
    assert!(lines.iter().any(|line| line.contains("Upload")));
}

fn list_root(client: &mut Client, command: &str) -> String {
    let mut data = client.pasv();
    thread::sleep(Duration::from_millis(50));
    assert!(client.cmd(command).starts_with("150 "));
    let mut listing = String::new();
    data.read_to_string(&mut listing).unwrap();
    assert!(client.reply().starts_with("226 "));
    listing
}

#[test]
fn test_root_listing_with_one_mount() {
    let internal = TempDir::new();
    let harness = Harness::start(&internal, None, 60_000);
    let mut client = Client::connect(harness.port);
    client.login();

    assert_eq!(list_root(&mut client, "NLST /"), "data\r\n");
}

#[test]
fn test_root_listing_with_both_mounts() {
    let internal = TempDir::new();
    let external = TempDir::new();
    let harness = Harness::start(&internal, Some(&external), 60_000);
    let mut client = Client::connect(harness.port);
    client.login();

    let listing = list_root(&mut client, "LIST -la /");
    let lines: Vec<&str> = listing.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with(" data"));
    assert!(lines[1].ends_with(" sdcard"));
}

#[test]
fn test_rename_inside_and_outside_roots() {
    let internal = TempDir::new();
    fs::write(internal.0.join("old.txt"), b"x").unwrap();
    let harness = Harness::start(&internal, None, 60_000);
    let mut client = Client::connect(harness.port);
    client.login();

    assert!(client.cmd("RNTO /data/new.txt").starts_with("503 "));

    assert!(client.cmd("RNFR /data/old.txt").starts_with("350 "));
    assert!(client.cmd("RNTO /data/new.txt").starts_with("250 "));
    assert!(internal.0.join("new.txt").exists());
    assert!(!internal.0.join("old.txt").exists());

    assert!(client.cmd("RNFR /data/new.txt").starts_with("350 "));
    assert!(client.cmd("RNTO /data/../../escaped.txt").starts_with("550 "));
    assert!(internal.0.join("new.txt").exists());
    assert!(client.cmd("PWD").contains("\"/\""));
}

#[test]
fn test_idle_client_is_disconnected() {
    let internal = TempDir::new();
    let harness = Harness::start(&internal, None, 200);
    let mut client = Client::connect(harness.port);

    assert!(client.reply().starts_with("221 "));
    assert_eq!(client.reply(), "");

    // The listener is still there for the next client.
    let mut next = Client::connect(harness.port);
    assert!(next.cmd("QUIT").starts_with("221 "));
}

#[test]
fn test_cwd_navigation() {
    let internal = TempDir::new();
    fs::create_dir_all(internal.0.join("photos")).unwrap();
    let harness = Harness::start(&internal, None, 60_000);
    let mut client = Client::connect(harness.port);
    client.login();

    assert!(client.cmd("CWD /data/photos").starts_with("250 "));
    assert!(client.cmd("PWD").contains("\"/data/photos\""));
    assert!(client.cmd("CWD .").starts_with("250 "));
    assert!(client.cmd("CWD ..").starts_with("250 "));
    assert!(client.cmd("PWD").contains("\"/data\""));
    assert!(client.cmd("CWD missing").starts_with("550 "));
    assert!(client.cmd("PWD").contains("\"/data\""));
    assert!(client.cmd("CWD ../../etc").starts_with("550 "));
    assert!(client.cmd("CDUP").starts_with("250 "));
    assert!(client.cmd("PWD").contains("\"/\""));
    assert!(client.cmd("CWD ..").starts_with("250 "));
    assert!(client.cmd("PWD").contains("\"/\""));
}

#[test]
fn test_file_information_commands() {
    let internal = TempDir::new();
    fs::write(internal.0.join("five.txt"), b"12345").unwrap();
    let harness = Harness::start(&internal, None, 60_000);
    let mut client = Client::connect(harness.port);
    client.login();

    assert_eq!(client.cmd("SIZE /data/five.txt"), "213 5\r\n");
    assert!(client.cmd("SIZE /data/none.txt").starts_with("550 "));

    let mdtm = client.cmd("MDTM /data/five.txt");
    let stamp = mdtm.trim_end().strip_prefix("213 ").unwrap();
    assert_eq!(stamp.len(), 14);
    assert!(stamp.bytes().all(|b| b.is_ascii_digit()));
    assert!(client.cmd("MDTM /data/none.txt").starts_with("550 "));

    assert!(client.cmd("SYST").starts_with("215 UNIX Type: L8"));
    assert!(client.cmd("TYPE I").starts_with("200 "));
    assert!(client.cmd("AUTH TLS").starts_with("504 "));
    assert!(client.cmd("XPWD").starts_with("257 \"/\""));
}

#[test]
fn test_directory_and_delete_commands() {
    let internal = TempDir::new();
    fs::write(internal.0.join("gone.txt"), b"x").unwrap();
    let harness = Harness::start(&internal, None, 60_000);
    let mut client = Client::connect(harness.port);
    client.login();

    assert!(client.cmd("MKD /data/newdir").starts_with("250 "));
    assert!(internal.0.join("newdir").is_dir());
    assert!(client.cmd("MKD /data/newdir").starts_with("550 "));
    assert!(client.cmd("MKD /data").starts_with("550 "));

    assert!(client.cmd("RMD /data/newdir").starts_with("250 "));
    assert!(!internal.0.join("newdir").exists());
    assert!(client.cmd("RMD /data/..").starts_with("550 "));
    assert!(internal.0.exists());

    assert!(client.cmd("DELE /data/gone.txt").starts_with("250 "));
    assert!(!internal.0.join("gone.txt").exists());
    assert!(client.cmd("DELE /data/gone.txt").starts_with("550 "));
    assert!(client.cmd("DELE /data/../../etc/passwd").starts_with("550 "));
    assert!(client.cmd("PWD").contains("\"/\""));
}

#[test]
fn test_appe_extends_existing_file() {
    let internal = TempDir::new();
    fs::write(internal.0.join("log.txt"), b"hello ").unwrap();
    let harness = Harness::start(&internal, None, 60_000);
    let mut client = Client::connect(harness.port);
    client.login();

    let mut data = client.pasv();
    assert!(client.cmd("APPE /data/log.txt").starts_with("150 "));
    data.write_all(b"world").unwrap();
    data.shutdown(Shutdown::Both).unwrap();
    drop(data);
    assert!(client.reply().starts_with("226 "));
    assert_eq!(fs::read(internal.0.join("log.txt")).unwrap(), b"hello world");
}

#[test]
fn test_unused_passive_listener_times_out() {
    let internal = TempDir::new();
    let harness = Harness::start_with(&internal, None, 60_000, 300);
    let mut client = Client::connect(harness.port);
    client.login();

    let reply = client.cmd("PASV");
    assert!(reply.starts_with("227 "));
    thread::sleep(Duration::from_millis(600));
    assert!(client.cmd("NOOP").starts_with("200 "));
    assert!(client.cmd("LIST").starts_with("425 "));

    let engine = harness.finish();
    assert_eq!(engine.substate(), DataState::Disconnected);
    assert!(engine.listen_data.is_none());
}

#[test]
fn test_idle_data_connection_is_dropped() {
    let internal = TempDir::new();
    let harness = Harness::start_with(&internal, None, 60_000, 300);
    let mut client = Client::connect(harness.port);
    client.login();

    let mut data = client.pasv();
    let mut buf = [0u8; 16];
    assert_eq!(data.read(&mut buf).unwrap(), 0);
    assert!(client.cmd("NOOP").starts_with("200 "));
    assert!(client.cmd("RETR /data/anything").starts_with("425 "));

    let engine = harness.finish();
    assert_eq!(engine.substate(), DataState::Disconnected);
    assert!(engine.data.is_none());
}

#[test]
fn test_stalled_upload_is_aborted() {
    let internal = TempDir::new();
    let harness = Harness::start_with(&internal, None, 60_000, 300);
    let mut client = Client::connect(harness.port);
    client.login();

    let mut data = client.pasv();
    assert!(client.cmd("STOR /data/partial.bin").starts_with("150 "));
    data.write_all(b"first chunk").unwrap();
    assert!(client.reply().starts_with("426 "));
    let mut buf = [0u8; 16];
    assert_eq!(data.read(&mut buf).unwrap(), 0);

    assert!(client.cmd("NOOP").starts_with("200 "));
    assert_eq!(fs::read(internal.0.join("partial.bin")).unwrap(), b"first chunk");
    let engine = harness.finish();
    assert_eq!(engine.state(), ControlState::Ready);
    assert!(!engine.storage.is_open());
}
