use super::load_codebooks;
use anyhow::{Context, Result};
use clap::Subcommand;
use std::fs;
use std::path::{Path, PathBuf};
use wem::{ForcePacketFormat, VorbisOptions};

#[derive(Subcommand)]
pub enum WemCommands {
    /// Decode WEM to WAV/OGG
    Decode {
        /// Input WEM file
        input: PathBuf,
        /// Output file (optional, defaults to input with .wav/.ogg)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Path to packed codebooks library (for Vorbis)
        #[arg(short, long)]
        codebooks: Option<PathBuf>,
        /// Codebooks are stored inline in the setup packet (for Vorbis)
        #[arg(long)]
        inline_codebooks: bool,
        /// Setup packet is a full Vorbis setup (for Vorbis)
        #[arg(long)]
        full_setup: bool,
        /// Treat audio packets as modified Wwise packets
        #[arg(long, conflicts_with = "no_mod_packets")]
        mod_packets: bool,
        /// Treat audio packets as standard Vorbis packets
        #[arg(long)]
        no_mod_packets: bool,
    },
    /// Encode a PCM or IMA ADPCM WAV to WEM
    Encode {
        /// Input WAV file
        input: PathBuf,
        /// Output WEM file (optional, defaults to input with .wem)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

pub fn handle(cmd: WemCommands) -> Result<()> {
    match cmd {
        WemCommands::Decode {
            input,
            output,
            codebooks,
            inline_codebooks,
            full_setup,
            mod_packets,
            no_mod_packets,
        } => {
            let force_packet_format = if mod_packets {
                ForcePacketFormat::ForceModPackets
            } else if no_mod_packets {
                ForcePacketFormat::ForceNoModPackets
            } else {
                ForcePacketFormat::NoForce
            };
            let options = VorbisOptions::new()
                .with_inline_codebooks(inline_codebooks)
                .with_full_setup(full_setup)
                .with_force_packet_format(force_packet_format);
            wem_decode(&input, output, codebooks.as_deref(), &options)
        }
        WemCommands::Encode { input, output } => wem_encode(&input, output),
    }
}

fn wem_decode(
    input: &Path,
    output: Option<PathBuf>,
    codebooks: Option<&Path>,
    options: &VorbisOptions,
) -> Result<()> {
    let data = fs::read(input).with_context(|| format!("Failed to read {:?}", input))?;
    let codebooks = load_codebooks(codebooks)?;

    let converted = wem::to_standard(&data, &codebooks, options)
        .with_context(|| format!("Failed to decode {:?}", input))?;

    let output = output.unwrap_or_else(|| input.with_extension(converted.extension()));
    fs::write(&output, &converted.bytes)
        .with_context(|| format!("Failed to write {:?}", output))?;

    tracing::info!(
        format = ?converted.format,
        bytes = converted.bytes.len(),
        "Decoded {:?} -> {:?}",
        input,
        output
    );
    Ok(())
}

fn wem_encode(input: &Path, output: Option<PathBuf>) -> Result<()> {
    let data = fs::read(input).with_context(|| format!("Failed to read {:?}", input))?;
    let encoded =
        wem::to_wem(&data).with_context(|| format!("Failed to encode {:?}", input))?;

    let output = output.unwrap_or_else(|| input.with_extension("wem"));
    fs::write(&output, &encoded).with_context(|| format!("Failed to write {:?}", output))?;

    tracing::info!(bytes = encoded.len(), "Encoded {:?} -> {:?}", input, output);
    Ok(())
}
