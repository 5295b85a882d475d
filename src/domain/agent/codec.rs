use bytes::{Buf, BufMut, BytesMut};
use std::io;
use tokio_util::codec::{Decoder, Encoder};

use crate::domain::agent::protocol::{AgentRequest, AgentResponse};

/// Codec for the agent wire protocol: JSON objects in both directions,
/// framed by complete-object boundaries rather than line ends, since agents
/// may pretty-print or batch. The decoder keeps whatever arrived so far and
/// yields one object as soon as its closing brace lands.
pub struct AgentCodec;

impl AgentCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AgentCodec {
    fn default() -> Self {
        Self::new()
    }
}

/// Byte offset one past the closing brace of the first complete top-level
/// JSON object, honouring strings and escapes. None while incomplete.
fn object_end(buf: &[u8]) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut seen_open = false;

    for (i, b) in buf.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if *b == b'\\' {
                escaped = true;
            } else if *b == b'"' {
                in_string = false;
            }
            continue;
        }

        match b {
            b'"' => in_string = true,
            b'{' => {
                depth += 1;
                seen_open = true;
            }
            b'}' => {
                depth = depth.saturating_sub(1);
                if seen_open && depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }

    None
}

impl Decoder for AgentCodec {
    type Item = AgentResponse;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // Drop inter-object noise (newlines, spaces) before framing.
        while let Some(first) = src.first() {
            if first.is_ascii_whitespace() {
                src.advance(1);
            } else {
                break;
            }
        }

        let Some(end) = object_end(src) else {
            return Ok(None);
        };

        let frame = src.split_to(end);
        let item = serde_json::from_slice(&frame).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        Ok(Some(item))
    }
}

impl Encoder<AgentRequest> for AgentCodec {
    type Error = io::Error;

    fn encode(&mut self, item: AgentRequest, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let bytes = serde_json::to_vec(&item).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        dst.reserve(bytes.len() + 1);
        dst.put_slice(&bytes);
        dst.put_u8(b'\n');

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(codec: &mut AgentCodec, buf: &mut BytesMut) -> Vec<AgentResponse> {
        let mut out = Vec::new();
        while let Ok(Some(resp)) = codec.decode(buf) {
            out.push(resp);
        }
        out
    }

    #[test]
    fn object_split_across_reads_is_buffered() {
        let mut codec = AgentCodec::new();
        let mut buf = BytesMut::new();

        buf.extend_from_slice(br#"{"ctype": "response", "rtype": "map_"#);
        assert!(codec.decode(&mut buf).unwrap().is_none(), "half an object must not decode");

        buf.extend_from_slice(br#"mac2phost", "state": 0}"#);
        let resp = codec.decode(&mut buf).unwrap().expect("completed object decodes");
        assert_eq!(resp.rtype, "map_mac2phost");
    }

    #[test]
    fn multiple_objects_in_one_read_all_decode() {
        let mut codec = AgentCodec::new();
        let mut buf = BytesMut::new();
        buf.extend_from_slice(b"{\"ctype\":\"response\",\"state\":0}\n{\"ctype\":\"response\",\"state\":1}");

        let out = decode_all(&mut codec, &mut buf);
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].state, 1);
    }

    #[test]
    fn braces_inside_strings_do_not_close_the_frame() {
        let mut codec = AgentCodec::new();
        let mut buf = BytesMut::new();
        buf.extend_from_slice(br#"{"ctype":"response","rdata":["weird } brace \" and {"],"state":0}"#);

        let resp = codec.decode(&mut buf).unwrap().expect("string braces must be ignored by the framer");
        assert_eq!(resp.rdata, vec!["weird } brace \" and {".to_string()]);
    }

    #[test]
    fn encode_appends_newline() {
        let mut codec = AgentCodec::new();
        let mut buf = BytesMut::new();
        codec.encode(AgentRequest::map_mac2phost(vec!["h1".to_string()]), &mut buf).unwrap();

        assert_eq!(buf.last(), Some(&b'\n'));
        let parsed: AgentRequest = serde_json::from_slice(&buf[..buf.len() - 1]).unwrap();
        assert_eq!(parsed.ctype, "action_list");
    }
}
