use serde::Serialize;

/// FCast v1 session opcodes used by this service.
pub const OPCODE_PLAY: u8 = 1;
pub const OPCODE_STOP: u8 = 4;

/// Container type announced for HLS playlists.
pub const HLS_CONTAINER: &str = "application/vnd.apple.mpegurl";

/// Body of a Play packet.
#[derive(Debug, Serialize)]
pub struct PlayMessage {
    pub container: String,
    pub url: String,
    pub time: u64,
}

impl PlayMessage {
    pub fn hls(url: &str) -> Self {
        Self {
            container: String::from(HLS_CONTAINER),
            url: url.to_string(),
            time: 0,
        }
    }
}

/// Frames one FCast packet: a 4-byte little-endian length covering the opcode
/// byte plus the body, then the opcode, then the JSON body (possibly empty).
pub fn encode_packet(opcode: u8, body: &[u8]) -> Vec<u8> {
    let length = (1 + body.len()) as u32;
    let mut packet = Vec::with_capacity(4 + 1 + body.len());
    packet.extend_from_slice(&length.to_le_bytes());
    packet.push(opcode);
    packet.extend_from_slice(body);
    packet
}

pub fn encode_play(message: &PlayMessage) -> Vec<u8> {
    let body = serde_json::to_vec(message).unwrap_or_default();
    encode_packet(OPCODE_PLAY, &body)
}

pub fn encode_stop() -> Vec<u8> {
    encode_packet(OPCODE_STOP, &[])
}
