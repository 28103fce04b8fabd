//! Setup header rebuild.
//!
//! Wwise setup packets drop the type fields and window/transform values that
//! standard Vorbis requires, and may reference codebooks by library index.
//! The rebuild reads the stripped fields and writes them back in full layout.

use crate::bit_reader::BitReader;
use crate::bit_writer::BitWriter;
use crate::error::{WemError, WemResult};
use crate::vorbis::codebook::CodebookLibrary;
use crate::vorbis::helpers::ilog;
use crate::vorbis::rebuilder::VorbisOptions;

/// Codebook index Wwise writes when a full, unstripped setup follows.
const FULL_SETUP_MARKER_ID: u32 = 0x342;
const FULL_SETUP_MARKER_BITS: u32 = 0x1590;

/// Rebuild the body of a setup packet (everything after the `\x05vorbis` tag).
///
/// Returns the block flag of each mode, or an empty table for a full setup,
/// which is copied without being parsed.
pub(crate) fn rebuild_setup(
    input: &mut BitReader<'_>,
    output: &mut BitWriter,
    channels: u16,
    codebooks: &CodebookLibrary,
    options: &VorbisOptions,
) -> WemResult<Vec<bool>> {
    let codebook_count_less1 = input.read_bits(8)?;
    let codebook_count = codebook_count_less1 + 1;
    output.write_bits(codebook_count_less1, 8);

    if options.inline_codebooks {
        for _ in 0..codebook_count {
            if options.full_setup {
                CodebookLibrary::copy(input, output)?;
            } else {
                CodebookLibrary::rebuild_from_reader(input, output)?;
            }
        }
    } else {
        for _ in 0..codebook_count {
            let codebook_id = input.read_bits(10)?;
            match codebooks.rebuild(codebook_id as usize, output) {
                Ok(()) => {}
                Err(WemError::InvalidCodebookId { .. }) => {
                    if codebook_id == FULL_SETUP_MARKER_ID
                        && input.read_bits(14)? == FULL_SETUP_MARKER_BITS
                    {
                        return Err(WemError::unsupported_vorbis(
                            "invalid codebook id 0x342, try --full-setup",
                        ));
                    }
                    return Err(WemError::invalid_codebook_id(codebook_id));
                }
                Err(e) => return Err(e),
            }
        }
    }

    // time domain transforms: one placeholder entry
    output.write_bits(0, 6);
    output.write_bits(0, 16);

    if options.full_setup {
        while input.remaining_bits() > 0 {
            output.write_bit(input.read_bit()?);
        }
        output.write_bits(1, 1);
        return Ok(Vec::new());
    }

    let floor_count_less1 = input.read_bits(6)?;
    let floor_count = floor_count_less1 + 1;
    output.write_bits(floor_count_less1, 6);
    for _ in 0..floor_count {
        // only floor type 1 is stored
        output.write_bits(1, 16);
        rebuild_floor(input, output, codebook_count)?;
    }

    let residue_count_less1 = input.read_bits(6)?;
    let residue_count = residue_count_less1 + 1;
    output.write_bits(residue_count_less1, 6);
    for _ in 0..residue_count {
        rebuild_residue(input, output, codebook_count)?;
    }

    let mapping_count_less1 = input.read_bits(6)?;
    let mapping_count = mapping_count_less1 + 1;
    output.write_bits(mapping_count_less1, 6);
    for _ in 0..mapping_count {
        rebuild_mapping(input, output, channels, floor_count, residue_count)?;
    }

    let mode_count_less1 = input.read_bits(6)?;
    let mode_count = mode_count_less1 + 1;
    output.write_bits(mode_count_less1, 6);

    let mut mode_blockflag = Vec::with_capacity(mode_count as usize);
    for _ in 0..mode_count {
        let block_flag = input.read_bits(1)?;
        output.write_bits(block_flag, 1);
        mode_blockflag.push(block_flag != 0);

        output.write_bits(0, 16); // windowtype
        output.write_bits(0, 16); // transformtype

        let mapping = input.read_bits(8)?;
        output.write_bits(mapping, 8);
        if mapping >= mapping_count {
            return Err(WemError::parse(format!(
                "mode mapping {mapping} out of {mapping_count}"
            )));
        }
    }

    output.write_bits(1, 1); // framing

    Ok(mode_blockflag)
}

fn rebuild_floor(
    input: &mut BitReader<'_>,
    output: &mut BitWriter,
    codebook_count: u32,
) -> WemResult<()> {
    let partitions = input.read_bits(5)?;
    output.write_bits(partitions, 5);

    let mut partition_classes = Vec::with_capacity(partitions as usize);
    for _ in 0..partitions {
        let class = input.read_bits(4)?;
        output.write_bits(class, 4);
        partition_classes.push(class);
    }

    // no partitions means no classes at all
    let class_count = partition_classes.iter().max().map_or(0, |&max| max + 1);
    let mut class_dimensions = Vec::with_capacity(class_count as usize);

    for _ in 0..class_count {
        let dimensions_less1 = input.read_bits(3)?;
        output.write_bits(dimensions_less1, 3);
        class_dimensions.push(dimensions_less1 + 1);

        let subclasses = input.read_bits(2)?;
        output.write_bits(subclasses, 2);

        if subclasses != 0 {
            let masterbook = input.read_bits(8)?;
            output.write_bits(masterbook, 8);
            if masterbook >= codebook_count {
                return Err(WemError::parse("invalid floor1 masterbook"));
            }
        }

        for _ in 0..(1u32 << subclasses) {
            let book_plus1 = input.read_bits(8)?;
            output.write_bits(book_plus1, 8);
            if book_plus1 > 0 && book_plus1 - 1 >= codebook_count {
                return Err(WemError::parse("invalid floor1 subclass book"));
            }
        }
    }

    let multiplier_less1 = input.read_bits(2)?;
    output.write_bits(multiplier_less1, 2);

    let rangebits = input.read_bits(4)? as u8;
    output.write_bits(u32::from(rangebits), 4);

    for &class in &partition_classes {
        for _ in 0..class_dimensions[class as usize] {
            let x = input.read_bits(rangebits)?;
            output.write_bits(x, rangebits);
        }
    }

    Ok(())
}

fn rebuild_residue(
    input: &mut BitReader<'_>,
    output: &mut BitWriter,
    codebook_count: u32,
) -> WemResult<()> {
    let residue_type = input.read_bits(2)?;
    output.write_bits(residue_type, 16);

    if residue_type > 2 {
        return Err(WemError::unsupported_vorbis(format!(
            "residue type {residue_type}"
        )));
    }

    let begin = input.read_bits(24)?;
    let end = input.read_bits(24)?;
    let partition_size_less1 = input.read_bits(24)?;
    let classifications_less1 = input.read_bits(6)?;
    let classbook = input.read_bits(8)?;

    output.write_bits(begin, 24);
    output.write_bits(end, 24);
    output.write_bits(partition_size_less1, 24);
    output.write_bits(classifications_less1, 6);
    output.write_bits(classbook, 8);

    if classbook >= codebook_count {
        return Err(WemError::parse("invalid residue classbook"));
    }

    let mut cascade = Vec::with_capacity(classifications_less1 as usize + 1);
    for _ in 0..=classifications_less1 {
        let low_bits = input.read_bits(3)?;
        output.write_bits(low_bits, 3);

        let bitflag = input.read_bits(1)?;
        output.write_bits(bitflag, 1);

        let high_bits = if bitflag != 0 {
            let high = input.read_bits(5)?;
            output.write_bits(high, 5);
            high
        } else {
            0
        };

        cascade.push(high_bits * 8 + low_bits);
    }

    for &bits in &cascade {
        for k in 0..8 {
            if bits & (1 << k) != 0 {
                let book = input.read_bits(8)?;
                output.write_bits(book, 8);
                if book >= codebook_count {
                    return Err(WemError::parse("invalid residue book"));
                }
            }
        }
    }

    Ok(())
}

fn rebuild_mapping(
    input: &mut BitReader<'_>,
    output: &mut BitWriter,
    channels: u16,
    floor_count: u32,
    residue_count: u32,
) -> WemResult<()> {
    output.write_bits(0, 16); // mapping type 0

    let submaps_flag = input.read_bits(1)?;
    output.write_bits(submaps_flag, 1);

    let submaps = if submaps_flag != 0 {
        let submaps_less1 = input.read_bits(4)?;
        output.write_bits(submaps_less1, 4);
        submaps_less1 + 1
    } else {
        1
    };

    let square_polar_flag = input.read_bits(1)?;
    output.write_bits(square_polar_flag, 1);

    if square_polar_flag != 0 {
        let coupling_steps_less1 = input.read_bits(8)?;
        output.write_bits(coupling_steps_less1, 8);

        let channels = u32::from(channels);
        let coupling_bits = ilog(channels.saturating_sub(1));

        for _ in 0..=coupling_steps_less1 {
            let magnitude = input.read_bits(coupling_bits)?;
            let angle = input.read_bits(coupling_bits)?;
            output.write_bits(magnitude, coupling_bits);
            output.write_bits(angle, coupling_bits);

            if angle == magnitude || magnitude >= channels || angle >= channels {
                return Err(WemError::parse("invalid coupling"));
            }
        }
    }

    let reserved = input.read_bits(2)?;
    output.write_bits(reserved, 2);
    if reserved != 0 {
        return Err(WemError::parse("mapping reserved field nonzero"));
    }

    if submaps > 1 {
        for _ in 0..channels {
            let mux = input.read_bits(4)?;
            output.write_bits(mux, 4);
            if mux >= submaps {
                return Err(WemError::parse("mapping_mux >= submaps"));
            }
        }
    }

    for _ in 0..submaps {
        let time_config = input.read_bits(8)?;
        output.write_bits(time_config, 8);

        let floor_number = input.read_bits(8)?;
        output.write_bits(floor_number, 8);
        if floor_number >= floor_count {
            return Err(WemError::parse("invalid floor mapping"));
        }

        let residue_number = input.read_bits(8)?;
        output.write_bits(residue_number, 8);
        if residue_number >= residue_count {
            return Err(WemError::parse("invalid residue mapping"));
        }
    }

    Ok(())
}
