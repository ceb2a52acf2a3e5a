//! Minimal WebM (Matroska/EBML) muxing for a single Opus audio track.
//!
//! Generates the container byte layout directly:
//! ```text
//! EBML header        DocType "webm"
//! Segment
//! ├── Info           TimestampScale 1ms, Duration
//! ├── Tracks
//! │   └── TrackEntry audio, codec A_OPUS, CodecPrivate = OpusHead
//! └── Cluster*       one per second of audio
//!     └── SimpleBlock*  [track vint][rel. timestamp i16 BE][flags][packet]
//! ```
//!
//! Every element size is known at finalize time because the session
//! buffers the encoded packets, so no unknown-size elements are emitted.

// Matroska element IDs (include their own length-marker bits).
const EBML: u32 = 0x1A45_DFA3;
const EBML_VERSION: u32 = 0x4286;
const EBML_READ_VERSION: u32 = 0x42F7;
const EBML_MAX_ID_LENGTH: u32 = 0x42F2;
const EBML_MAX_SIZE_LENGTH: u32 = 0x42F3;
const DOC_TYPE: u32 = 0x4282;
const DOC_TYPE_VERSION: u32 = 0x4287;
const DOC_TYPE_READ_VERSION: u32 = 0x4285;
const SEGMENT: u32 = 0x1853_8067;
const INFO: u32 = 0x1549_A966;
const TIMESTAMP_SCALE: u32 = 0x2A_D7B1;
const MUXING_APP: u32 = 0x4D80;
const WRITING_APP: u32 = 0x5741;
const DURATION: u32 = 0x4489;
const TRACKS: u32 = 0x1654_AE6B;
const TRACK_ENTRY: u32 = 0xAE;
const TRACK_NUMBER: u32 = 0xD7;
const TRACK_UID: u32 = 0x73C5;
const TRACK_TYPE: u32 = 0x83;
const FLAG_LACING: u32 = 0x9C;
const CODEC_ID: u32 = 0x86;
const CODEC_PRIVATE: u32 = 0x63A2;
const CODEC_DELAY: u32 = 0x56AA;
const SEEK_PRE_ROLL: u32 = 0x56BB;
const AUDIO: u32 = 0xE1;
const SAMPLING_FREQUENCY: u32 = 0xB5;
const CHANNELS: u32 = 0x9F;
const CLUSTER: u32 = 0x1F43_B675;
const CLUSTER_TIMESTAMP: u32 = 0xE7;
const SIMPLE_BLOCK: u32 = 0xA3;

const TRACK_TYPE_AUDIO: u64 = 2;
/// Single audio track; also the SimpleBlock track-number vint (`0x81`).
const AUDIO_TRACK_NUMBER: u64 = 1;
/// Opus always decodes at 48 kHz regardless of the capture rate.
const OPUS_OUTPUT_RATE: f64 = 48_000.0;
/// Matroska SeekPreRoll mandated for Opus, in nanoseconds.
const OPUS_SEEK_PRE_ROLL_NS: u64 = 80_000_000;
/// One cluster per second keeps relative block timestamps well inside i16.
const CLUSTER_SPAN_MS: u64 = 1_000;

const APP_NAME: &str = "scribe-capture";

/// Accumulates timestamped Opus packets and emits the finished WebM
/// container on [`WebmWriter::finish`].
#[derive(Debug)]
pub struct WebmWriter {
    channels: u16,
    pre_skip: u16,
    input_sample_rate: u32,
    blocks: Vec<(u64, Vec<u8>)>,
}

impl WebmWriter {
    /// `pre_skip` is the encoder lookahead in 48 kHz samples, carried in
    /// both `OpusHead` and the track's `CodecDelay`.
    pub fn new(channels: u16, pre_skip: u16, input_sample_rate: u32) -> Self {
        Self {
            channels,
            pre_skip,
            input_sample_rate,
            blocks: Vec::new(),
        }
    }

    /// Append one encoded Opus packet starting at `timestamp_ms`.
    ///
    /// Packets must arrive in timestamp order.
    pub fn add_block(&mut self, timestamp_ms: u64, packet: Vec<u8>) {
        self.blocks.push((timestamp_ms, packet));
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Assemble the complete container.
    pub fn finish(&self, duration_ms: f64) -> Vec<u8> {
        let mut segment = Vec::new();
        segment.extend_from_slice(&self.info_element(duration_ms));
        segment.extend_from_slice(&self.tracks_element());
        segment.extend_from_slice(&self.cluster_elements());

        let mut out = ebml_header();
        element(&mut out, SEGMENT, &segment);
        out
    }

    fn info_element(&self, duration_ms: f64) -> Vec<u8> {
        let mut info = Vec::new();
        uint_element(&mut info, TIMESTAMP_SCALE, 1_000_000); // 1 ms ticks
        float_element(&mut info, DURATION, duration_ms);
        string_element(&mut info, MUXING_APP, APP_NAME);
        string_element(&mut info, WRITING_APP, APP_NAME);

        let mut out = Vec::new();
        element(&mut out, INFO, &info);
        out
    }

    fn tracks_element(&self) -> Vec<u8> {
        let mut audio = Vec::new();
        float_element(&mut audio, SAMPLING_FREQUENCY, OPUS_OUTPUT_RATE);
        uint_element(&mut audio, CHANNELS, self.channels as u64);

        let codec_delay_ns =
            self.pre_skip as u64 * 1_000_000_000 / OPUS_OUTPUT_RATE as u64;

        let mut entry = Vec::new();
        uint_element(&mut entry, TRACK_NUMBER, AUDIO_TRACK_NUMBER);
        uint_element(&mut entry, TRACK_UID, 1);
        uint_element(&mut entry, TRACK_TYPE, TRACK_TYPE_AUDIO);
        uint_element(&mut entry, FLAG_LACING, 0);
        string_element(&mut entry, CODEC_ID, "A_OPUS");
        uint_element(&mut entry, CODEC_DELAY, codec_delay_ns);
        uint_element(&mut entry, SEEK_PRE_ROLL, OPUS_SEEK_PRE_ROLL_NS);
        element(&mut entry, CODEC_PRIVATE, &self.opus_head());
        element(&mut entry, AUDIO, &audio);

        let mut tracks = Vec::new();
        element(&mut tracks, TRACK_ENTRY, &entry);

        let mut out = Vec::new();
        element(&mut out, TRACKS, &tracks);
        out
    }

    fn cluster_elements(&self) -> Vec<u8> {
        let mut out = Vec::new();
        let mut cluster = Vec::new();
        let mut cluster_ts: Option<u64> = None;

        for (timestamp_ms, packet) in &self.blocks {
            let base = (timestamp_ms / CLUSTER_SPAN_MS) * CLUSTER_SPAN_MS;
            if cluster_ts != Some(base) {
                if cluster_ts.take().is_some() {
                    flush_cluster(&mut out, &mut cluster);
                }
                cluster_ts = Some(base);
                uint_element(&mut cluster, CLUSTER_TIMESTAMP, base);
            }

            let mut block = Vec::with_capacity(packet.len() + 4);
            block.push(0x80 | AUDIO_TRACK_NUMBER as u8);
            block.extend_from_slice(&((timestamp_ms - base) as i16).to_be_bytes());
            block.push(0x80); // keyframe flag; every Opus packet stands alone
            block.extend_from_slice(packet);
            element(&mut cluster, SIMPLE_BLOCK, &block);
        }

        if cluster_ts.is_some() {
            flush_cluster(&mut out, &mut cluster);
        }
        out
    }

    /// `OpusHead` identification header (RFC 7845 §5.1), 19 bytes:
    /// ```text
    /// [0-7]    "OpusHead"
    /// [8]      version = 1
    /// [9]      channel count
    /// [10-11]  pre-skip (LE, 48 kHz samples)
    /// [12-15]  input sample rate (LE, informational)
    /// [16-17]  output gain = 0
    /// [18]     mapping family = 0
    /// ```
    fn opus_head(&self) -> Vec<u8> {
        let mut head = Vec::with_capacity(19);
        head.extend_from_slice(b"OpusHead");
        head.push(1);
        head.push(self.channels as u8);
        head.extend_from_slice(&self.pre_skip.to_le_bytes());
        head.extend_from_slice(&self.input_sample_rate.to_le_bytes());
        head.extend_from_slice(&0i16.to_le_bytes());
        head.push(0);
        head
    }
}

fn flush_cluster(out: &mut Vec<u8>, cluster: &mut Vec<u8>) {
    element(out, CLUSTER, cluster);
    cluster.clear();
}

fn ebml_header() -> Vec<u8> {
    let mut header = Vec::new();
    uint_element(&mut header, EBML_VERSION, 1);
    uint_element(&mut header, EBML_READ_VERSION, 1);
    uint_element(&mut header, EBML_MAX_ID_LENGTH, 4);
    uint_element(&mut header, EBML_MAX_SIZE_LENGTH, 8);
    string_element(&mut header, DOC_TYPE, "webm");
    uint_element(&mut header, DOC_TYPE_VERSION, 4);
    uint_element(&mut header, DOC_TYPE_READ_VERSION, 2);

    let mut out = Vec::new();
    element(&mut out, EBML, &header);
    out
}

// --- EBML primitive writers ---

fn write_id(out: &mut Vec<u8>, id: u32) {
    let len = match id {
        0..=0xFF => 1,
        0x100..=0xFFFF => 2,
        0x1_0000..=0xFF_FFFF => 3,
        _ => 4,
    };
    for i in (0..len).rev() {
        out.push((id >> (8 * i)) as u8);
    }
}

/// Length-prefixed EBML size: the leading byte's marker bit encodes the
/// total width, the remaining bits carry the value big-endian.
fn write_size(out: &mut Vec<u8>, value: u64) {
    let mut len = 1usize;
    // The all-ones pattern is reserved for "unknown size", hence `- 1`.
    while len < 8 && value >= (1u64 << (7 * len)) - 1 {
        len += 1;
    }
    let encoded = (1u64 << (7 * len)) | value;
    for i in (0..len).rev() {
        out.push((encoded >> (8 * i)) as u8);
    }
}

fn element(out: &mut Vec<u8>, id: u32, payload: &[u8]) {
    write_id(out, id);
    write_size(out, payload.len() as u64);
    out.extend_from_slice(payload);
}

fn uint_element(out: &mut Vec<u8>, id: u32, value: u64) {
    let mut len = 1usize;
    while len < 8 && value >= 1u64 << (8 * len) {
        len += 1;
    }
    let mut payload = Vec::with_capacity(len);
    for i in (0..len).rev() {
        payload.push((value >> (8 * i)) as u8);
    }
    element(out, id, &payload);
}

fn float_element(out: &mut Vec<u8>, id: u32, value: f64) {
    element(out, id, &value.to_be_bytes());
}

fn string_element(out: &mut Vec<u8>, id: u32, value: &str) {
    element(out, id, value.as_bytes());
}

// --- Probing ---

/// Read the Segment/Info Duration (in timestamp-scale ticks, i.e. ms for
/// files this module writes) back out of a container.
///
/// Walks just enough EBML to find the element; returns `None` on any
/// structure this module would not have produced.
pub fn probe_duration_ms(bytes: &[u8]) -> Option<f64> {
    let mut pos = 0;
    while pos < bytes.len() {
        let (id, id_len) = read_id(bytes, pos)?;
        let (size, size_len) = read_size(bytes, pos + id_len)?;
        let body = pos + id_len + size_len;

        match id {
            SEGMENT | INFO => pos = body, // descend
            DURATION => {
                let payload = bytes.get(body..body + size as usize)?;
                return match payload.len() {
                    4 => Some(f32::from_be_bytes(payload.try_into().ok()?) as f64),
                    8 => Some(f64::from_be_bytes(payload.try_into().ok()?)),
                    _ => None,
                };
            }
            _ => pos = body + size as usize, // skip
        }
    }
    None
}

fn read_id(bytes: &[u8], pos: usize) -> Option<(u32, usize)> {
    let first = *bytes.get(pos)?;
    let len = id_width(first)?;
    let mut id: u32 = 0;
    for &b in bytes.get(pos..pos + len)? {
        id = (id << 8) | b as u32;
    }
    Some((id, len))
}

fn id_width(first: u8) -> Option<usize> {
    match first {
        b if b & 0x80 != 0 => Some(1),
        b if b & 0x40 != 0 => Some(2),
        b if b & 0x20 != 0 => Some(3),
        b if b & 0x10 != 0 => Some(4),
        _ => None,
    }
}

fn read_size(bytes: &[u8], pos: usize) -> Option<(u64, usize)> {
    let first = *bytes.get(pos)?;
    let len = first.leading_zeros() as usize + 1;
    if len > 8 {
        return None;
    }
    let mut size = (first & (0xFF >> len)) as u64;
    for &b in bytes.get(pos + 1..pos + len)? {
        size = (size << 8) | b as u64;
    }
    Some((size, len))
}
