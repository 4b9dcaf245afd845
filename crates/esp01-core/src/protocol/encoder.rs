//! Frame encoding
//!
//! Turns a [`Command`] into the exact bytes written to the module:
//!
//! ```text
//! label [mode-char] [param1] , [param2] ... <terminator>
//! ```
//!
//! The parameter list ends at the first parameter that carries a line
//! terminator. [`Command`] constructors enforce that one exists, so encoding
//! can only fail on length.

use serde::{Deserialize, Serialize};

use super::{LineEnding, ProtocolError, MAX_FRAME_LEN};

/// Parameter separator
pub const PARAM_SEPARATOR: u8 = b',';

fn is_terminator(byte: u8) -> bool {
    byte == b'\r' || byte == b'\n'
}

/// AT command mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Mode {
    /// Bare label (`AT`, `ATE0`)
    #[default]
    None,
    /// Query the current value (`AT+CWMODE?`)
    Query,
    /// Set a value (`AT+CWMODE=1`)
    Set,
    /// Run the command (`AT+RST`)
    Execute,
}

impl Mode {
    /// Character written after the label, if any
    pub fn mode_char(&self) -> Option<char> {
        match self {
            Mode::Query => Some('?'),
            Mode::Set => Some('='),
            Mode::None | Mode::Execute => None,
        }
    }
}

/// A command ready to be encoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    label: String,
    mode: Mode,
    parameters: Vec<String>,
}

impl Command {
    /// Create a command from its raw parts.
    ///
    /// The last parameter must end with a line terminator and no earlier
    /// parameter may contain one. Nothing but terminator bytes may follow
    /// the first terminator.
    pub fn new(
        label: impl Into<String>,
        mode: Mode,
        parameters: Vec<String>,
    ) -> Result<Self, ProtocolError> {
        let label = label.into();
        if label.is_empty() {
            return Err(ProtocolError::InvalidCommand("empty label".to_string()));
        }
        if label.bytes().any(is_terminator) {
            return Err(ProtocolError::InvalidCommand(format!(
                "label {:?} contains a line terminator",
                label
            )));
        }

        let terminated = parameters
            .iter()
            .position(|p| p.bytes().any(is_terminator));
        match terminated {
            None => {
                return Err(ProtocolError::InvalidCommand(format!(
                    "{}: no parameter carries a line terminator",
                    label
                )))
            }
            Some(idx) if idx + 1 != parameters.len() => {
                return Err(ProtocolError::InvalidCommand(format!(
                    "{}: parameters follow the terminated parameter {}",
                    label, idx
                )))
            }
            Some(idx) => {
                let last = parameters[idx].as_bytes();
                let trailing = last
                    .iter()
                    .skip_while(|&&b| !is_terminator(b))
                    .any(|&b| !is_terminator(b));
                if trailing {
                    return Err(ProtocolError::InvalidCommand(format!(
                        "{}: data after the line terminator in {:?}",
                        label, parameters[idx]
                    )));
                }
            }
        }

        Ok(Self {
            label,
            mode,
            parameters,
        })
    }

    /// Bare label with no mode character (`ATE0`)
    pub fn bare(label: impl Into<String>) -> Result<Self, ProtocolError> {
        Self::new(label, Mode::None, vec!["\n".to_string()])
    }

    /// Query command (`AT+CWMODE?`)
    pub fn query(label: impl Into<String>) -> Result<Self, ProtocolError> {
        Self::new(label, Mode::Query, vec!["\n".to_string()])
    }

    /// Execute command (`AT+RST`)
    pub fn execute(label: impl Into<String>) -> Result<Self, ProtocolError> {
        Self::new(label, Mode::Execute, vec!["\n".to_string()])
    }

    /// Set command; the terminator is appended to the last parameter
    pub fn set<I, S>(label: impl Into<String>, params: I) -> Result<Self, ProtocolError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut parameters: Vec<String> = params.into_iter().map(Into::into).collect();
        match parameters.last_mut() {
            Some(last) => last.push('\n'),
            None => parameters.push("\n".to_string()),
        }
        Self::new(label, Mode::Set, parameters)
    }

    /// Command label (`AT+CWMODE`)
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Mode character selector
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Raw parameters, the last one carrying the terminator
    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }
}

/// Wrap a string argument in quotes, escaping `"`, `,` and `\`
pub fn quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        if matches!(c, '"' | ',' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// Encoded bytes of one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    bytes: Vec<u8>,
}

impl Frame {
    /// Bytes exactly as written to the channel
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Frame length in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Never true for an encoded command
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The frame as it appears in a normalized receive buffer (no `\r`).
    /// Used to recognize the module echoing the command back.
    pub fn content(&self) -> Vec<u8> {
        self.bytes.iter().copied().filter(|&b| b != b'\r').collect()
    }
}

/// Bounded frame writer
struct FrameWriter {
    bytes: Vec<u8>,
    max_len: usize,
}

impl FrameWriter {
    fn push(&mut self, byte: u8) -> Result<(), ProtocolError> {
        self.bytes.push(byte);
        if self.bytes.len() > self.max_len {
            return Err(ProtocolError::CommandOverflow {
                limit: self.max_len,
            });
        }
        Ok(())
    }

    fn extend(&mut self, bytes: &[u8]) -> Result<(), ProtocolError> {
        bytes.iter().try_for_each(|&b| self.push(b))
    }
}

/// Encodes commands into frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameEncoder {
    max_len: usize,
    line_ending: LineEnding,
}

impl Default for FrameEncoder {
    fn default() -> Self {
        Self::new(MAX_FRAME_LEN, LineEnding::Lf)
    }
}

impl FrameEncoder {
    /// Encoder with a frame limit and line ending
    pub fn new(max_len: usize, line_ending: LineEnding) -> Self {
        Self {
            max_len,
            line_ending,
        }
    }

    /// Longest frame this encoder produces
    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Encode a command. Fails with `CommandOverflow` when the frame would
    /// exceed the configured maximum length.
    pub fn encode(&self, command: &Command) -> Result<Frame, ProtocolError> {
        let mut writer = FrameWriter {
            bytes: Vec::with_capacity(self.max_len.min(64)),
            max_len: self.max_len,
        };

        writer.extend(command.label.as_bytes())?;
        if let Some(c) = command.mode.mode_char() {
            writer.push(c as u8)?;
        }

        for (idx, param) in command.parameters.iter().enumerate() {
            let bytes = param.as_bytes();
            if idx > 0 && !bytes.first().copied().is_some_and(is_terminator) {
                writer.push(PARAM_SEPARATOR)?;
            }
            match bytes.iter().position(|&b| is_terminator(b)) {
                Some(end) => {
                    writer.extend(&bytes[..end])?;
                    writer.extend(self.line_ending.as_bytes())?;
                    break;
                }
                None => writer.extend(bytes)?,
            }
        }

        Ok(Frame {
            bytes: writer.bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_query_frame() {
        let cmd = Command::new("AT", Mode::Query, params(&["\n"])).unwrap();
        let frame = FrameEncoder::default().encode(&cmd).unwrap();
        assert_eq!(frame.as_bytes(), b"AT?\n");
    }

    #[test]
    fn test_set_frame_with_separators() {
        let cmd = Command::set("AT+CWJAP", [quoted("home"), quoted("secret")]).unwrap();
        let frame = FrameEncoder::default().encode(&cmd).unwrap();
        assert_eq!(frame.as_bytes(), b"AT+CWJAP=\"home\",\"secret\"\n");
    }

    #[test]
    fn test_separate_terminator_parameter() {
        let cmd = Command::new("AT+CWMODE", Mode::Set, params(&["1", "\r\n"])).unwrap();
        let frame = FrameEncoder::default().encode(&cmd).unwrap();
        assert_eq!(frame.as_bytes(), b"AT+CWMODE=1\n");
    }

    #[test]
    fn test_empty_middle_parameter_keeps_field() {
        let cmd = Command::new("AT+CWSAP", Mode::Set, params(&["\"a\"", "", "5\n"])).unwrap();
        let frame = FrameEncoder::default().encode(&cmd).unwrap();
        assert_eq!(frame.as_bytes(), b"AT+CWSAP=\"a\",,5\n");
    }

    #[test]
    fn test_crlf_line_ending() {
        let encoder = FrameEncoder::new(MAX_FRAME_LEN, LineEnding::CrLf);
        let frame = encoder.encode(&Command::execute("AT+RST").unwrap()).unwrap();
        assert_eq!(frame.as_bytes(), b"AT+RST\r\n");
        assert_eq!(frame.content(), b"AT+RST\n".to_vec());
    }

    #[test]
    fn test_overflow() {
        let encoder = FrameEncoder::new(8, LineEnding::Lf);
        let ok = encoder.encode(&Command::query("AT+GMR").unwrap()).unwrap();
        assert_eq!(ok.len(), 8);

        let err = encoder.encode(&Command::query("AT+CWMO").unwrap());
        assert!(matches!(
            err,
            Err(ProtocolError::CommandOverflow { limit: 8 })
        ));
    }

    #[test]
    fn test_rejects_missing_terminator() {
        let err = Command::new("AT", Mode::None, params(&["1"]));
        assert!(matches!(err, Err(ProtocolError::InvalidCommand(_))));
    }

    #[test]
    fn test_rejects_parameters_after_terminator() {
        let err = Command::new("AT", Mode::Set, params(&["1\n", "2"]));
        assert!(matches!(err, Err(ProtocolError::InvalidCommand(_))));
    }

    #[test]
    fn test_rejects_data_after_terminator() {
        let err = Command::new("AT+X", Mode::Set, params(&["x\ny\n"]));
        assert!(matches!(err, Err(ProtocolError::InvalidCommand(_))));
        assert!(Command::set("AT+CWJAP", ["\"a\nb\""]).is_err());
        assert!(Command::new("AT+X", Mode::Set, params(&["x\r\n"])).is_ok());
    }

    #[test]
    fn test_rejects_bad_label() {
        assert!(Command::bare("").is_err());
        assert!(Command::bare("AT\n").is_err());
    }

    #[test]
    fn test_quoted_escapes() {
        assert_eq!(quoted(r#"a,b"c\d"#), r#""a\,b\"c\\d""#);
    }
}
