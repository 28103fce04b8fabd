//! Integer helpers shared by the codebook and setup rebuilders.

/// Number of bits needed to represent `v`: 0 for 0, otherwise `floor(log2(v)) + 1`.
#[inline]
pub fn ilog(v: u32) -> u8 {
    (u32::BITS - v.leading_zeros()) as u8
}

/// Largest `vals` with `vals^dimensions <= entries`, i.e. the number of
/// multiplicands stored by a type 1 lookup table.
pub fn book_map_type1_quantvals(entries: u32, dimensions: u32) -> u32 {
    if entries == 0 || dimensions == 0 {
        return 0;
    }

    let fits = |vals: u32| {
        u64::from(vals)
            .checked_pow(dimensions)
            .is_some_and(|product| product <= u64::from(entries))
    };

    // start near the root, then settle on the exact boundary
    let bits = u32::from(ilog(entries));
    let mut vals = entries >> ((bits - 1) * (dimensions - 1) / dimensions);
    while vals > 1 && !fits(vals) {
        vals -= 1;
    }
    while fits(vals + 1) {
        vals += 1;
    }
    vals
}
