use esp01_core::device::WifiMode;
use esp01_core::protocol::{
    extract, extract_all, extract_enum, Channel, Command, Mode, ProtocolError, RunnerConfig,
    Template, TransactionRunner, Value,
};
use pretty_assertions::assert_eq;
use std::collections::VecDeque;
use std::io;
use std::time::Duration;

/// Replies with a fixed byte string as soon as the frame is complete
struct ReplyChannel {
    reply: &'static [u8],
    pending: VecDeque<u8>,
}

impl ReplyChannel {
    fn new(reply: &'static [u8]) -> Self {
        Self {
            reply,
            pending: VecDeque::new(),
        }
    }
}

impl Channel for ReplyChannel {
    fn is_writable(&mut self) -> bool {
        true
    }

    fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        if byte == b'\n' {
            self.pending.extend(self.reply);
        }
        Ok(())
    }

    fn byte_ready_within(&mut self, _timeout: Duration) -> io::Result<bool> {
        Ok(!self.pending.is_empty())
    }

    fn read_byte(&mut self) -> io::Result<u8> {
        self.pending
            .pop_front()
            .ok_or_else(|| io::ErrorKind::UnexpectedEof.into())
    }
}

#[test]
fn test_cwmode_query_scenario() {
    let runner = TransactionRunner::new(RunnerConfig::default());
    let mut channel = ReplyChannel::new(b"\n+CWMODE:1\n\nOK\n");
    let command = Command::new("AT+CWMODE", Mode::Query, vec!["\n".to_string()]).unwrap();

    let outcome = runner.execute(&mut channel, &command, Duration::from_millis(1000));
    assert!(outcome.is_ok());

    let raw = outcome.into_result().unwrap();
    let values = extract(raw.body(), &Template::new("+CWMODE:").int()).unwrap();
    assert_eq!(values, vec![Value::Int(1)]);

    let mode: WifiMode = extract_enum(raw.body(), "+CWMODE:").unwrap();
    assert_eq!(mode, WifiMode::Station);
}

#[test]
fn test_extraction_is_idempotent() {
    let body = b"\n+CWSTATE:2,\"home\"\n".to_vec();
    let template = Template::new("+CWSTATE:").int().optional().quoted();
    let first = extract(&body, &template).unwrap();
    let second = extract(&body, &template).unwrap();
    assert_eq!(first, second);
    assert_eq!(body, b"\n+CWSTATE:2,\"home\"\n".to_vec());
}

#[test]
fn test_unknown_enum_code_is_malformed() {
    let result: Result<WifiMode, _> = extract_enum(b"+CWMODE:7\n", "+CWMODE:");
    assert!(matches!(result, Err(ProtocolError::MalformedResponse(_))));
}

#[test]
fn test_listing_across_lines() {
    let runner = TransactionRunner::new(RunnerConfig::default());
    let mut channel = ReplyChannel::new(
        b"\n+CWLAP:(3,\"home\",-52,\"aa:bb:cc:dd:ee:ff\",6)\n+CWLAP:(0,\"cafe\",-80,\"11:22:33:44:55:66\",11)\n\nOK\n",
    );
    let command = Command::new("AT+CWLAP", Mode::Execute, vec!["\n".to_string()]).unwrap();
    let raw = runner
        .execute(&mut channel, &command, Duration::from_millis(1000))
        .into_result()
        .unwrap();

    let template = Template::new("+CWLAP:").int().quoted().int().quoted().int();
    let rows = extract_all(raw.body(), &template).unwrap();

    assert_eq!(
        rows,
        vec![
            vec![
                Value::Int(3),
                Value::Str("home".into()),
                Value::Int(-52),
                Value::Str("aa:bb:cc:dd:ee:ff".into()),
                Value::Int(6),
            ],
            vec![
                Value::Int(0),
                Value::Str("cafe".into()),
                Value::Int(-80),
                Value::Str("11:22:33:44:55:66".into()),
                Value::Int(11),
            ],
        ]
    );
}

#[test]
fn test_missing_optional_is_undefined() {
    let template = Template::new("+CIPSTA:").quoted().optional().quoted().quoted();
    let values = extract(b"+CIPSTA:\"192.168.1.5\"\n", &template).unwrap();
    assert_eq!(values[0].as_str(), Some("192.168.1.5"));
    assert!(values[1].is_undefined());
    assert!(values[2].is_undefined());
}

#[test]
fn test_no_match_is_malformed() {
    let result = extract(b"busy p...\n", &Template::new("+CWMODE:").int());
    assert!(matches!(result, Err(ProtocolError::MalformedResponse(_))));
}
