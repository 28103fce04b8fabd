//! Wwise RIFF Vorbis to Ogg Vorbis rebuild.
//!
//! Wwise audio files use a modified Vorbis format:
//!
//! 1. **Stripped headers** - the identification and comment headers are
//!    omitted and the setup header is packed into a compact Wwise layout
//! 2. **External codebooks** - codebooks may be referenced by index into a
//!    [`CodebookLibrary`] instead of being embedded
//! 3. **Packet framing** - audio packets carry small Wwise headers instead of
//!    Ogg pages, and may use a modified first byte without the packet type bit
//!
//! [`WwiseVorbis`] parses the RIFF header and `vorb` block, and
//! [`WwiseVorbis::generate_ogg`] rebuilds a standard Ogg Vorbis stream in memory.
//!
//! # Example
//!
//! ```no_run
//! use wem::{CodebookLibrary, VorbisOptions, rebuild_ogg};
//!
//! # fn main() -> Result<(), wem::WemError> {
//! let wem_bytes = std::fs::read("audio.wem")?;
//! let codebooks = CodebookLibrary::from_file("packed_codebooks_aoTuV_603.bin")?;
//!
//! let ogg = rebuild_ogg(&wem_bytes, &codebooks, &VorbisOptions::default())?;
//! std::fs::write("audio.ogg", ogg)?;
//! # Ok(())
//! # }
//! ```

use crate::bit_reader::BitReader;
use crate::bit_writer::BitWriter;
use crate::error::{WemError, WemResult};
use crate::ogg_stream::{OggStream, PageEnd};
use crate::riff::{RiffExtensibleFormat, WWISE_FORMAT_VORBIS};
use crate::vorbis::codebook::CodebookLibrary;
use crate::vorbis::helpers::ilog;
use crate::vorbis::packet::Packet;
use crate::vorbis::setup::rebuild_setup;
use byteorder::{ByteOrder, LE};

const SERIAL: u32 = 0x8000_0001;
const VORBIS_BYTES: &[u8] = b"vorbis";
const VENDOR: &str = concat!(
    "converted from Audiokinetic Wwise by wem ",
    env!("CARGO_PKG_VERSION")
);

/// Trailing bytes of a 0x28 fmt chunk (KSDATAFORMAT subtype GUID tail).
const FMT_SIGNATURE: [u8; 16] = [
    1, 0, 0, 0, 0, 0, 0x10, 0, 0x80, 0, 0, 0xAA, 0, 0x38, 0x9b, 0x71,
];

/// `vorb` mod signals that mean standard (unmodified) packets.
const STANDARD_PACKET_SIGNALS: [u32; 4] = [0x4A, 0x4B, 0x69, 0x70];

/// Specifies how to handle Wwise modified Vorbis packet format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ForcePacketFormat {
    /// Automatically detect packet format from the file header.
    #[default]
    NoForce,
    /// Force interpretation as modified Wwise packets.
    ForceModPackets,
    /// Force interpretation as standard Vorbis packets.
    ForceNoModPackets,
}

/// Configuration options for Wwise to Ogg conversion.
///
/// # Example
///
/// ```
/// use wem::{ForcePacketFormat, VorbisOptions};
///
/// let options = VorbisOptions::default()
///     .with_inline_codebooks(true)
///     .with_force_packet_format(ForcePacketFormat::ForceModPackets);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VorbisOptions {
    /// Codebooks are stored packed inside the setup packet instead of being
    /// referenced from the library.
    pub inline_codebooks: bool,

    /// The setup packet is a complete standard Vorbis setup and is copied
    /// after its codebooks.
    pub full_setup: bool,

    /// How to handle Wwise modified packet format detection.
    pub force_packet_format: ForcePacketFormat,
}

impl VorbisOptions {
    /// Create new default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether codebooks are inline in the data.
    pub fn with_inline_codebooks(mut self, value: bool) -> Self {
        self.inline_codebooks = value;
        self
    }

    /// Set whether the setup packet contains full Vorbis setup.
    pub fn with_full_setup(mut self, value: bool) -> Self {
        self.full_setup = value;
        self
    }

    /// Set the packet format detection mode.
    pub fn with_force_packet_format(mut self, format: ForcePacketFormat) -> Self {
        self.force_packet_format = format;
        self
    }
}

/// Loop region from a `smpl` chunk, as an exclusive sample range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopPoints {
    pub start: u32,
    pub end: u32,
}

/// A parsed Wwise Vorbis stream, ready to be rebuilt.
#[derive(Debug, Clone)]
pub struct WwiseVorbis {
    pub channels: u16,
    pub sample_rate: u32,
    pub avg_bytes_per_second: u32,
    pub sample_count: u32,
    pub uid: u32,
    pub blocksize_0_pow: u8,
    pub blocksize_1_pow: u8,
    pub setup_packet_offset: u32,
    pub first_audio_packet_offset: u32,
    /// Packet headers are 2 bytes, without granule positions.
    pub no_granule: bool,
    /// Audio packets start with the mode number instead of the packet type bit.
    pub mod_packets: bool,
    pub loop_points: Option<LoopPoints>,
    data: Vec<u8>,
}

/// Rebuild a Wwise Vorbis file into a standalone Ogg Vorbis stream.
pub fn rebuild_ogg(
    wem: &[u8],
    codebooks: &CodebookLibrary,
    options: &VorbisOptions,
) -> WemResult<Vec<u8>> {
    WwiseVorbis::parse(wem, options.force_packet_format)?.generate_ogg(codebooks, options)
}

impl WwiseVorbis {
    /// Parse a complete Wwise Vorbis file.
    pub fn parse(wem: &[u8], force_packet_format: ForcePacketFormat) -> WemResult<Self> {
        Self::from_format(RiffExtensibleFormat::read(wem)?, force_packet_format)
    }

    /// Interpret an already parsed RIFF header as Wwise Vorbis.
    pub fn from_format(
        format: RiffExtensibleFormat,
        force_packet_format: ForcePacketFormat,
    ) -> WemResult<Self> {
        if format.format_tag != WWISE_FORMAT_VORBIS {
            return Err(WemError::unsupported_vorbis(format!(
                "format tag 0x{:04X}, expected 0xFFFF",
                format.format_tag
            )));
        }
        if format.channels == 0 {
            return Err(WemError::UnsupportedChannelCount { channels: 0 });
        }
        if format.block_align != 0 {
            return Err(WemError::parse("bad block align"));
        }
        if format.bits_per_sample != 0 {
            return Err(WemError::parse("expected 0 bps"));
        }

        let vorb: &[u8] = match format.chunk(b"vorb") {
            Some(chunk) => {
                if !matches!(format.fmt_size, 0x12 | 0x18 | 0x28) {
                    return Err(WemError::parse(format!(
                        "bad fmt size 0x{:X} alongside vorb chunk",
                        format.fmt_size
                    )));
                }
                if format.fmt_size == 0x28 && format.extension != FMT_SIGNATURE {
                    return Err(WemError::parse("expected signature in extra fmt"));
                }
                &chunk.data
            }
            None if format.fmt_size == 0x42 => &format.extension,
            None => return Err(WemError::parse("expected 0x42 fmt if vorb missing")),
        };

        let (no_granule, packet_offsets_at, uid_at) = match vorb.len() {
            0x2A => (true, 0x10, 0x24),
            0x32 | 0x34 => (false, 0x18, 0x2C),
            size @ (0x28 | 0x2C) => {
                return Err(WemError::unsupported_vorbis(format!(
                    "vorb size 0x{size:X} carries a header triad"
                )));
            }
            size => {
                return Err(WemError::unsupported_vorbis(format!("bad vorb size 0x{size:X}")));
            }
        };

        let sample_count = LE::read_u32(vorb);
        let mod_packets = match force_packet_format {
            ForcePacketFormat::ForceModPackets => true,
            ForcePacketFormat::ForceNoModPackets => false,
            ForcePacketFormat::NoForce => {
                no_granule && !STANDARD_PACKET_SIGNALS.contains(&LE::read_u32(&vorb[0x4..]))
            }
        };

        let blocksize_0_pow = vorb[uid_at + 4];
        let blocksize_1_pow = vorb[uid_at + 5];
        if !(6..=13).contains(&blocksize_0_pow)
            || !(6..=13).contains(&blocksize_1_pow)
            || blocksize_0_pow > blocksize_1_pow
        {
            return Err(WemError::unsupported_vorbis(format!(
                "block sizes 2^{blocksize_0_pow}/2^{blocksize_1_pow}"
            )));
        }

        let loop_points = match format.chunk(b"smpl") {
            Some(smpl) => parse_loop(&smpl.data, sample_count)?,
            None => None,
        };

        let uid = LE::read_u32(&vorb[uid_at..]);
        let setup_packet_offset = LE::read_u32(&vorb[packet_offsets_at..]);
        let first_audio_packet_offset = LE::read_u32(&vorb[packet_offsets_at + 4..]);

        tracing::debug!(
            channels = format.channels,
            sample_rate = format.sample_rate,
            sample_count,
            vorb_size = vorb.len(),
            no_granule,
            mod_packets,
            "parsed Wwise Vorbis header"
        );

        Ok(Self {
            channels: format.channels,
            sample_rate: format.sample_rate,
            avg_bytes_per_second: format.avg_bytes_per_sec,
            sample_count,
            uid,
            blocksize_0_pow,
            blocksize_1_pow,
            setup_packet_offset,
            first_audio_packet_offset,
            no_granule,
            mod_packets,
            loop_points,
            data: format.data,
        })
    }

    /// Generates a standard Ogg Vorbis stream from the parsed Wwise audio data.
    ///
    /// The output includes:
    ///
    /// 1. **Identification header** - Vorbis version, channels, sample rate, etc.
    /// 2. **Comment header** - Vendor string and loop points
    /// 3. **Setup header** - Codebooks, floor/residue/mapping configuration
    /// 4. **Audio packets** - One page each, with granule positions
    ///
    /// Nothing is returned unless the whole stream rebuilds.
    pub fn generate_ogg(
        &self,
        codebooks: &CodebookLibrary,
        options: &VorbisOptions,
    ) -> WemResult<Vec<u8>> {
        let mut ogg = OggStream::new(SERIAL);

        self.write_identification_packet(&mut ogg)?;
        self.write_comment_packet(&mut ogg)?;

        let has_audio = (self.first_audio_packet_offset as usize) < self.data.len();
        let setup_end = if has_audio {
            PageEnd::EndPage
        } else {
            PageEnd::EndStream
        };
        let mode_blockflag = self.write_setup_packet(&mut ogg, codebooks, options, setup_end)?;

        if has_audio {
            self.write_audio_packets(&mut ogg, &mode_blockflag)?;
        }

        tracing::debug!(packets = ogg.packets_written(), "rebuilt Ogg Vorbis stream");
        Ok(ogg.finish())
    }

    fn write_vorbis_packet_header(ogg: &mut OggStream, packet_type: u8) {
        ogg.write_bits(u32::from(packet_type), 8);
        ogg.packet_mut().write_bytes(VORBIS_BYTES);
    }

    fn write_identification_packet(&self, ogg: &mut OggStream) -> WemResult<()> {
        Self::write_vorbis_packet_header(ogg, 1);
        ogg.write_bits(0, 32); // version
        ogg.write_bits(u32::from(self.channels), 8);
        ogg.write_bits(self.sample_rate, 32);
        ogg.write_bits(0, 32); // bitrate_max
        ogg.write_bits(self.avg_bytes_per_second.saturating_mul(8), 32); // bitrate_nominal
        ogg.write_bits(0, 32); // bitrate_minimum
        ogg.write_bits(u32::from(self.blocksize_0_pow), 4);
        ogg.write_bits(u32::from(self.blocksize_1_pow), 4);
        ogg.write_bits(1, 1); // framing
        ogg.flush_packet(0, PageEnd::EndPage)
    }

    fn write_comment_packet(&self, ogg: &mut OggStream) -> WemResult<()> {
        Self::write_vorbis_packet_header(ogg, 3);

        let comments = match self.loop_points {
            Some(points) => vec![
                format!("LoopStart={}", points.start),
                format!("LoopEnd={}", points.end),
            ],
            None => Vec::new(),
        };

        ogg.write_bits(VENDOR.len() as u32, 32);
        ogg.packet_mut().write_bytes(VENDOR.as_bytes());
        ogg.write_bits(comments.len() as u32, 32);
        for comment in &comments {
            ogg.write_bits(comment.len() as u32, 32);
            ogg.packet_mut().write_bytes(comment.as_bytes());
        }

        ogg.write_bits(1, 1); // framing
        ogg.flush_packet(0, PageEnd::EndPage)
    }

    fn write_setup_packet(
        &self,
        ogg: &mut OggStream,
        codebooks: &CodebookLibrary,
        options: &VorbisOptions,
        end: PageEnd,
    ) -> WemResult<Vec<bool>> {
        let packet = Packet::read(
            &self.data,
            self.setup_packet_offset as usize,
            self.no_granule,
        )?;
        if packet.granule != 0 {
            return Err(WemError::parse("setup packet granule != 0"));
        }
        let mut reader = BitReader::new(packet.payload(&self.data)?);

        Self::write_vorbis_packet_header(ogg, 5);
        let mode_blockflag = rebuild_setup(
            &mut reader,
            ogg.packet_mut(),
            self.channels,
            codebooks,
            options,
        )?;

        // a wrong library or a misparsed layout leaves the setup partly read
        if reader.total_bits_read().div_ceil(8) != packet.size as u64 {
            return Err(WemError::parse(format!(
                "setup packet not read exactly: {} of {} bytes used",
                reader.total_bits_read().div_ceil(8),
                packet.size
            )));
        }
        if packet.next_offset() != self.first_audio_packet_offset as usize {
            return Err(WemError::parse(format!(
                "first audio packet at {} does not follow the setup packet ending at {}",
                self.first_audio_packet_offset,
                packet.next_offset()
            )));
        }

        ogg.flush_packet(0, end)?;

        Ok(mode_blockflag)
    }

    fn write_audio_packets(&self, ogg: &mut OggStream, mode_blockflag: &[bool]) -> WemResult<()> {
        let data = self.data.as_slice();
        let mode_bits = if mode_blockflag.len() > 1 {
            ilog(mode_blockflag.len() as u32 - 1)
        } else {
            0
        };
        let blocksize_0 = 1u64 << self.blocksize_0_pow;
        let blocksize_1 = 1u64 << self.blocksize_1_pow;

        let mut offset = self.first_audio_packet_offset as usize;
        let mut prev_blockflag = false;
        let mut prev_blocksize: Option<u64> = None;
        let mut granule_pos = 0u64;

        while offset < data.len() {
            let packet = Packet::read(data, offset, self.no_granule)?;
            let payload = packet.payload(data)?;
            let next_offset = packet.next_offset();
            let is_last = next_offset >= data.len();

            let granule = if self.no_granule {
                let long = self.packet_is_long(payload, mode_blockflag, mode_bits);
                let blocksize = if long { blocksize_1 } else { blocksize_0 };
                if let Some(prev) = prev_blocksize {
                    granule_pos += (prev + blocksize) / 4;
                }
                prev_blocksize = Some(blocksize);

                if is_last && self.sample_count > 0 {
                    u64::from(self.sample_count)
                } else {
                    granule_pos
                }
            } else if packet.granule == u32::MAX {
                1
            } else {
                u64::from(packet.granule)
            };

            let rebuilt = if self.mod_packets {
                let next_first_byte = Packet::read(data, next_offset, self.no_granule)
                    .ok()
                    .filter(|next| next.size > 0)
                    .and_then(|next| data.get(next.offset).copied());
                rebuild_modified_packet(
                    payload,
                    next_first_byte,
                    mode_blockflag,
                    mode_bits,
                    &mut prev_blockflag,
                )?
            } else {
                payload.to_vec()
            };

            let end = if is_last {
                PageEnd::EndStream
            } else {
                PageEnd::EndPage
            };
            ogg.write_packet(rebuilt, granule, end)?;

            offset = next_offset;
        }

        Ok(())
    }

    /// Whether the packet's mode selects the long block size.
    fn packet_is_long(&self, payload: &[u8], mode_blockflag: &[bool], mode_bits: u8) -> bool {
        let Some(&first) = payload.first() else {
            return false;
        };
        let mask = (1u32 << mode_bits) - 1;
        let mode = if self.mod_packets {
            u32::from(first) & mask
        } else {
            (u32::from(first) >> 1) & mask
        };
        mode_blockflag.get(mode as usize).copied().unwrap_or(false)
    }
}

/// Restore the packet type bit and the window flags a long block needs.
fn rebuild_modified_packet(
    payload: &[u8],
    next_first_byte: Option<u8>,
    mode_blockflag: &[bool],
    mode_bits: u8,
    prev_blockflag: &mut bool,
) -> WemResult<Vec<u8>> {
    if mode_blockflag.is_empty() {
        return Err(WemError::parse(
            "modified packets need the mode table of a rebuilt setup",
        ));
    }
    let Some((&first, rest)) = payload.split_first() else {
        return Ok(Vec::new());
    };

    let mask = (1u32 << mode_bits) - 1;
    let mode_number = u32::from(first) & mask;
    let remainder = u32::from(first) >> mode_bits;
    let long = *mode_blockflag
        .get(mode_number as usize)
        .ok_or_else(|| WemError::parse(format!("invalid mode number {mode_number}")))?;

    let mut out = BitWriter::new();
    out.write_bits(0, 1); // packet type: audio
    out.write_bits(mode_number, mode_bits);

    if long {
        let next_long = next_first_byte
            .map(|b| {
                mode_blockflag
                    .get((u32::from(b) & mask) as usize)
                    .copied()
                    .unwrap_or(false)
            })
            .unwrap_or(false);
        out.write_bits(u32::from(*prev_blockflag), 1);
        out.write_bits(u32::from(next_long), 1);
    }

    *prev_blockflag = long;
    out.write_bits(remainder, 8 - mode_bits);
    out.write_bytes(rest);

    Ok(out.into_inner())
}

fn parse_loop(smpl: &[u8], sample_count: u32) -> WemResult<Option<LoopPoints>> {
    let field = |at: usize| {
        smpl.get(at..at + 4)
            .map(LE::read_u32)
            .ok_or_else(|| WemError::parse("smpl chunk truncated"))
    };

    match field(0x1C)? {
        0 => return Ok(None),
        1 => {}
        count => return Err(WemError::parse(format!("expected one loop, found {count}"))),
    }

    let start = field(0x2C)?;
    let end = match field(0x30)? {
        0 => sample_count,
        end => end.saturating_add(1),
    };

    if start >= sample_count || end > sample_count || start > end {
        return Err(WemError::parse("loops out of range"));
    }

    Ok(Some(LoopPoints { start, end }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modified_long_packet_gets_window_flags() {
        // mode 1 (long) of two, next packet uses mode 0 (short)
        let out = rebuild_modified_packet(&[0x01, 0xAA], Some(0x00), &[false, true], 1, &mut false)
            .unwrap();
        assert_eq!(out, vec![0x02, 0x50, 0x05]);
    }

    #[test]
    fn test_modified_short_packet() {
        let mut prev = true;
        let out = rebuild_modified_packet(&[0x00, 0xBB], None, &[false, true], 1, &mut prev)
            .unwrap();
        assert_eq!(out, vec![0x00, 0x76, 0x01]);
        assert!(!prev);
    }

    #[test]
    fn test_modified_packet_needs_mode_table() {
        let result = rebuild_modified_packet(&[0x00], None, &[], 0, &mut false);
        assert!(matches!(result, Err(WemError::Parse { .. })));
    }

    #[test]
    fn test_loop_end_is_exclusive() {
        let mut smpl = vec![0u8; 60];
        smpl[0x1C..0x20].copy_from_slice(&1u32.to_le_bytes());
        smpl[0x2C..0x30].copy_from_slice(&100u32.to_le_bytes());
        smpl[0x30..0x34].copy_from_slice(&199u32.to_le_bytes());
        assert_eq!(
            parse_loop(&smpl, 1000).unwrap(),
            Some(LoopPoints {
                start: 100,
                end: 200
            })
        );

        smpl[0x30..0x34].copy_from_slice(&0u32.to_le_bytes());
        assert_eq!(parse_loop(&smpl, 1000).unwrap().map(|p| p.end), Some(1000));

        smpl[0x2C..0x30].copy_from_slice(&1000u32.to_le_bytes());
        assert!(parse_loop(&smpl, 1000).is_err());
    }

    #[test]
    fn test_options_builder() {
        let options = VorbisOptions::new()
            .with_inline_codebooks(true)
            .with_full_setup(true)
            .with_force_packet_format(ForcePacketFormat::ForceNoModPackets);
        assert!(options.inline_codebooks);
        assert!(options.full_setup);
        assert_eq!(
            options.force_packet_format,
            ForcePacketFormat::ForceNoModPackets
        );
    }
}
