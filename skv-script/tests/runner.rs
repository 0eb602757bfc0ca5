use std::fs::{self, File};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use skv_client::{ClientError, ClientResult, Connector, RespValue, Session, Transport};
use skv_script::{ScriptCache, ScriptError, ScriptRunner};

type Frames = Arc<Mutex<Vec<Vec<Vec<u8>>>>>;
type Responder = Arc<dyn Fn(&[Vec<u8>]) -> ClientResult<RespValue> + Send + Sync>;

/// Fake store: records every command frame and answers through `respond`.
struct FakeStore {
    frames: Frames,
    respond: Responder,
}

struct FakeTransport {
    frames: Frames,
    respond: Responder,
}

impl Transport for FakeTransport {
    fn exec(&mut self, args: &[&[u8]]) -> ClientResult<RespValue> {
        let frame: Vec<Vec<u8>> = args.iter().map(|arg| arg.to_vec()).collect();
        self.frames.lock().unwrap().push(frame.clone());
        (self.respond)(&frame)
    }
}

impl Connector for FakeStore {
    fn addr(&self) -> &str {
        "fake:6379"
    }

    fn connect(&self) -> ClientResult<Box<dyn Transport>> {
        Ok(Box::new(FakeTransport {
            frames: self.frames.clone(),
            respond: self.respond.clone(),
        }))
    }
}

fn session_with(
    respond: impl Fn(&[Vec<u8>]) -> ClientResult<RespValue> + Send + Sync + 'static,
) -> (Session, Frames) {
    let frames: Frames = Arc::new(Mutex::new(Vec::new()));
    let store = FakeStore {
        frames: frames.clone(),
        respond: Arc::new(respond),
    };
    let session = Session::open(0, Arc::new(store)).expect("open");
    (session, frames)
}

fn noscript() -> ClientResult<RespValue> {
    Ok(RespValue::Error(
        b"NOSCRIPT No matching script. Please use EVAL.".to_vec(),
    ))
}

fn runner_over(dir: &Path) -> ScriptRunner {
    ScriptRunner::new(Arc::new(ScriptCache::new(dir)))
}

const SIGNUP: &[u8] = b"local data = ARGV[1]\nreturn data\n";

#[test]
fn noscript_falls_back_to_source_once() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("Signup.lua"), SIGNUP).unwrap();
    let runner = runner_over(dir.path());
    let (mut session, frames) = session_with(|frame| match frame[0].as_slice() {
        b"EVALSHA" => noscript(),
        _ => Ok(RespValue::Bulk(Some(br#"{"ok":1}"#.to_vec()))),
    });

    let reply = runner
        .run(&mut session, "Signup.lua", &[b"0", b"{\"user\":\"a\"}", b"1700000000"])
        .expect("run");

    assert_eq!(reply, RespValue::Bulk(Some(br#"{"ok":1}"#.to_vec())));
    let frames = frames.lock().unwrap();
    assert_eq!(frames.len(), 2);
    let sha1 = runner.cache().cached("Signup.lua").unwrap().sha1().to_string();
    assert_eq!(frames[0][0], b"EVALSHA");
    assert_eq!(frames[0][1], sha1.as_bytes());
    assert_eq!(frames[1][0], b"EVAL");
    assert_eq!(frames[1][1], SIGNUP);
    for frame in frames.iter() {
        assert_eq!(&frame[2..], &[b"0".to_vec(), b"{\"user\":\"a\"}".to_vec(), b"1700000000".to_vec()]);
    }
}

#[test]
fn persistent_noscript_is_not_retried_twice() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("loop.lua"), b"return 1").unwrap();
    let runner = runner_over(dir.path());
    let (mut session, frames) = session_with(|_| noscript());

    let err = runner.run(&mut session, "loop.lua", &[b"0"]).unwrap_err();

    assert!(matches!(err, ScriptError::Store { ref message } if message.contains("NOSCRIPT")));
    assert_eq!(frames.lock().unwrap().len(), 2);
}

#[test]
fn other_store_errors_skip_the_fallback() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("bad.lua"), b"return redis.call('nope')").unwrap();
    let runner = runner_over(dir.path());
    let (mut session, frames) =
        session_with(|_| Ok(RespValue::Error(b"ERR Error running script".to_vec())));

    let err = runner.run(&mut session, "bad.lua", &[b"0"]).unwrap_err();

    assert!(matches!(err, ScriptError::Store { ref message } if message == "ERR Error running script"));
    assert_eq!(frames.lock().unwrap().len(), 1);
}

#[test]
fn cached_script_is_read_from_disk_once() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("get.lua"), b"return ARGV[1]").unwrap();
    let runner = runner_over(dir.path());
    let (mut session, frames) = session_with(|frame| Ok(RespValue::Bulk(Some(frame[2].clone()))));

    runner.run(&mut session, "get.lua", &[b"0", b"x"]).expect("first");
    runner.run(&mut session, "get.lua", &[b"0", b"y"]).expect("second");

    assert_eq!(runner.cache().load_count(), 1);
    let frames = frames.lock().unwrap();
    assert_eq!(frames.len(), 2);
    assert!(frames.iter().all(|frame| frame[0] == b"EVALSHA"));
    assert_eq!(frames[0][1], frames[1][1]);
}

#[test]
fn modified_script_is_reloaded_with_new_hash() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("count.lua");
    fs::write(&path, b"return 1").unwrap();
    let runner = runner_over(dir.path());
    let (mut session, frames) = session_with(|_| Ok(RespValue::Integer(1)));

    runner.run(&mut session, "count.lua", &[b"0"]).expect("first");
    let before = runner.cache().cached("count.lua").unwrap();

    fs::write(&path, b"return 2").unwrap();
    File::options()
        .write(true)
        .open(&path)
        .unwrap()
        .set_modified(SystemTime::now() + Duration::from_secs(5))
        .unwrap();
    runner.run(&mut session, "count.lua", &[b"0"]).expect("second");

    let after = runner.cache().cached("count.lua").unwrap();
    assert_eq!(runner.cache().load_count(), 2);
    assert_eq!(after.source(), b"return 2");
    assert_ne!(before.sha1(), after.sha1());
    let frames = frames.lock().unwrap();
    assert_eq!(frames[1][1], after.sha1().as_bytes());
}

#[test]
fn missing_script_sends_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let runner = runner_over(dir.path());
    let (mut session, frames) = session_with(|_| Ok(RespValue::Integer(1)));

    let err = runner.run(&mut session, "absent.lua", &[]).unwrap_err();

    assert!(matches!(err, ScriptError::Io { .. }));
    assert!(frames.lock().unwrap().is_empty());
}

#[test]
fn exhausted_transport_surfaces_as_client_error() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("ping.lua"), b"return 'pong'").unwrap();
    let runner = runner_over(dir.path());
    let (mut session, frames) = session_with(|_| Err(ClientError::Disconnected));

    let err = runner.run(&mut session, "ping.lua", &[b"0"]).unwrap_err();

    assert!(matches!(err, ScriptError::Client(ClientError::Disconnected)));
    assert_eq!(frames.lock().unwrap().len(), 3);
    assert_eq!(session.reconnects(), 3);
}
