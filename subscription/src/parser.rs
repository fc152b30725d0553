//! Parser for a single feed line.
//!
//! A line has the shape `type://password@host:port?query#name`. Structural
//! delimiters are matched on their first occurrence, scanning left to right,
//! so the query string and the name may themselves contain `:`, `@` or `?`.

use crate::descriptor::ServerDescriptor;
use std::collections::HashMap;
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

/// The part of a line being read when parsing stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    Protocol,
    Password,
    Server,
    Port,
    Query,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::Protocol => "protocol",
            Field::Password => "password",
            Field::Server => "server",
            Field::Port => "port",
            Field::Query => "query",
        };
        f.write_str(name)
    }
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum LineError {
    #[error("malformed line: missing '{delimiter}' after {field}")]
    MissingDelimiter { field: Field, delimiter: char },
    #[error("malformed line: invalid port {value:?}: {source}")]
    InvalidPort {
        value: String,
        #[source]
        source: ParseIntError,
    },
    #[error("malformed line: {0}")]
    InvalidQuery(#[from] QueryError),
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum QueryError {
    #[error("invalid URL escape {0:?}")]
    InvalidEscape(String),
    #[error("invalid semicolon separator in query")]
    Semicolon,
}

struct Cursor<'a> {
    rest: &'a str,
}

impl<'a> Cursor<'a> {
    fn new(line: &'a str) -> Self {
        Cursor { rest: line }
    }

    /// Returns everything before the next `delimiter` and moves past it.
    fn read_until(&mut self, field: Field, delimiter: char) -> Result<&'a str, LineError> {
        let (head, tail) = self
            .rest
            .split_once(delimiter)
            .ok_or(LineError::MissingDelimiter { field, delimiter })?;
        self.rest = tail;
        Ok(head)
    }

    fn remainder(self) -> &'a str {
        self.rest
    }
}

/// Parses one trimmed, non-empty feed line.
pub fn parse_line(line: &str) -> Result<ServerDescriptor, LineError> {
    let mut cursor = Cursor::new(line);

    let protocol_type = cursor.read_until(Field::Protocol, ':')?;

    let password = cursor.read_until(Field::Password, '@')?;
    let password = password.strip_prefix("//").unwrap_or(password);

    let server = cursor.read_until(Field::Server, ':')?;

    let port = cursor.read_until(Field::Port, '?')?;
    let port = port
        .parse::<i64>()
        .map_err(|source| LineError::InvalidPort {
            value: port.to_string(),
            source,
        })?;

    let query = parse_query(cursor.read_until(Field::Query, '#')?)?;
    let value = |key: &str| query.get(key).cloned().unwrap_or_default();

    // A name that fails to unescape is kept as written.
    let raw_name = cursor.remainder();
    let name = unescape(raw_name).unwrap_or_else(|_| raw_name.to_string());

    Ok(ServerDescriptor {
        name,
        protocol_type: protocol_type.to_string(),
        server: server.to_string(),
        port,
        password: password.to_string(),
        use_udp: true,
        sni: value("sni"),
        skip_cert_verify: query.get("allowInsecure").is_some_and(|v| v == "1"),
        network_type: value("type"),
    })
}

impl FromStr for ServerDescriptor {
    type Err = LineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_line(s)
    }
}

/// Parses `key=value` pairs joined by `&`. The first value of a repeated key wins.
fn parse_query(query: &str) -> Result<HashMap<String, String>, QueryError> {
    let mut values = HashMap::new();

    for pair in query.split('&').filter(|p| !p.is_empty()) {
        if pair.contains(';') {
            return Err(QueryError::Semicolon);
        }
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        values.entry(unescape(key)?).or_insert(unescape(value)?);
    }

    Ok(values)
}

/// Query-string unescaping: `+` is a space and every `%` must start a `%XX` escape.
///
/// Escaped bytes are not required to be UTF-8. Invalid sequences become U+FFFD.
fn unescape(s: &str) -> Result<String, QueryError> {
    let bytes = s.as_bytes();
    let mut i = 0;

    while let Some(offset) = bytes[i..].iter().position(|&b| b == b'%') {
        let start = i + offset;
        match bytes.get(start + 1..start + 3) {
            Some(hex) if hex.iter().all(u8::is_ascii_hexdigit) => i = start + 3,
            _ => {
                let end = bytes.len().min(start + 3);
                let escape = String::from_utf8_lossy(&bytes[start..end]).into_owned();
                return Err(QueryError::InvalidEscape(escape));
            }
        }
    }

    let spaced = s.replace('+', " ");
    let decoded = urlencoding::decode_binary(spaced.as_bytes());
    Ok(String::from_utf8_lossy(&decoded).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trojan_line() {
        let line = "trojan://secret@example.com:443?sni=a.com&type=tcp&allowInsecure=1#My%20Node";
        let server = parse_line(line).unwrap();

        assert_eq!(server.protocol_type(), "trojan");
        assert_eq!(server.password(), "secret");
        assert_eq!(server.server(), "example.com");
        assert_eq!(server.port(), 443);
        assert_eq!(server.sni(), "a.com");
        assert_eq!(server.network_type(), "tcp");
        assert!(server.skip_cert_verify());
        assert_eq!(server.name(), "My Node");
        assert!(server.use_udp());
    }

    #[test]
    fn test_from_str() {
        let server: ServerDescriptor = "trojan://pw@h:1?#n".parse().unwrap();
        assert_eq!(server.server(), "h");
        assert_eq!(server.port(), 1);
        assert_eq!(server.name(), "n");
    }

    #[test]
    fn test_optional_query_values() {
        let server = parse_line("trojan://pw@host:8443?allowInsecure=0#node").unwrap();
        assert_eq!(server.sni(), "");
        assert_eq!(server.network_type(), "");
        assert!(!server.skip_cert_verify());
        assert!(server.use_udp());

        // Only the literal "1" enables it.
        let server = parse_line("trojan://pw@host:8443?allowInsecure=true#node").unwrap();
        assert!(!server.skip_cert_verify());
    }

    #[test]
    fn test_password_without_slashes() {
        let server = parse_line("trojan:pw@host:1?#n").unwrap();
        assert_eq!(server.password(), "pw");
    }

    #[test]
    fn test_first_occurrence_delimiters() {
        // The name may contain structural characters once the prefix is consumed.
        let server = parse_line("trojan://pw@host:443?sni=a.com#a:b@c?d#e").unwrap();
        assert_eq!(server.name(), "a:b@c?d#e");
        assert_eq!(server.sni(), "a.com");

        // The password ends at the first '@', the server at the next ':'.
        let server = parse_line("trojan://p:w@h@host:443?#n").unwrap();
        assert_eq!(server.password(), "p:w");
        assert_eq!(server.server(), "h@host");
        assert_eq!(server.port(), 443);
    }

    #[test]
    fn test_name_and_sni_are_independent() {
        let server = parse_line("trojan://pw@host:443?sni=sni.example#name.example").unwrap();
        assert_eq!(server.sni(), "sni.example");
        assert_eq!(server.name(), "name.example");
    }

    #[test]
    fn test_missing_delimiters() {
        let cases = [
            ("trojan", Field::Protocol, ':'),
            ("trojan://secret", Field::Password, '@'),
            ("trojan://secret@example.com", Field::Server, ':'),
            ("trojan://secret@example.com:443", Field::Port, '?'),
            ("trojan://secret@example.com:443?sni=a.com", Field::Query, '#'),
        ];

        for (line, field, delimiter) in cases {
            assert_eq!(
                parse_line(line).unwrap_err(),
                LineError::MissingDelimiter { field, delimiter },
                "line: {line}"
            );
        }
    }

    #[test]
    fn test_invalid_port() {
        for port in ["abc", "", "44 3", "0x1bb"] {
            let line = format!("trojan://pw@host:{port}?#n");
            assert!(
                matches!(parse_line(&line), Err(LineError::InvalidPort { ref value, .. }) if value == port),
                "port: {port:?}"
            );
        }
    }

    #[test]
    fn test_port_range_not_enforced() {
        assert_eq!(parse_line("t://p@h:70000?#n").unwrap().port(), 70000);
        assert_eq!(parse_line("t://p@h:-1?#n").unwrap().port(), -1);
    }

    #[test]
    fn test_invalid_query() {
        assert_eq!(
            parse_line("trojan://pw@host:443?sni=%zz#n").unwrap_err(),
            LineError::InvalidQuery(QueryError::InvalidEscape("%zz".into()))
        );
        assert_eq!(
            parse_line("trojan://pw@host:443?sni=a;type=tcp#n").unwrap_err(),
            LineError::InvalidQuery(QueryError::Semicolon)
        );
    }

    #[test]
    fn test_non_utf8_query_value() {
        // GBK-encoded remarks must not reject the line.
        let server =
            parse_line("trojan://pw@host:443?sni=a.com&remarks=%C4%E3&type=ws#%C4%E3").unwrap();
        assert_eq!(server.sni(), "a.com");
        assert_eq!(server.network_type(), "ws");
        assert_eq!(server.name(), "\u{FFFD}\u{FFFD}");

        let server = parse_line("trojan://pw@host:443?sni=%ff#n").unwrap();
        assert_eq!(server.sni(), "\u{FFFD}");
    }

    #[test]
    fn test_query_decoding() {
        let server = parse_line("t://p@h:1?sni=a%2Eb+c&type=ws&type=grpc&&flag#n").unwrap();
        assert_eq!(server.sni(), "a.b c");
        assert_eq!(server.network_type(), "ws");
    }

    #[test]
    fn test_name_falls_back_to_raw() {
        let server = parse_line("trojan://pw@host:443?#100%").unwrap();
        assert_eq!(server.name(), "100%");

        let server = parse_line("trojan://pw@host:443?#Hong+Kong%2001").unwrap();
        assert_eq!(server.name(), "Hong Kong 01");
    }

    #[test]
    fn test_empty_name() {
        let server = parse_line("trojan://pw@host:443?sni=x#").unwrap();
        assert_eq!(server.name(), "");
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape("%E4%BD%A0%E5%A5%BD").unwrap(), "你好");
        assert_eq!(
            unescape("abc%4").unwrap_err(),
            QueryError::InvalidEscape("%4".into())
        );
        assert_eq!(unescape("%").unwrap_err(), QueryError::InvalidEscape("%".into()));
    }
}
