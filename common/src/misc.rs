// Lowest set bit of a field mask, so fields of any bit offset read as plain integers.
pub fn lobit(mask: u32) -> u32 {
    mask & mask.wrapping_neg()
}

pub fn field(word: u32, mask: u32) -> u32 {
    (word & mask) / lobit(mask)
}

pub fn insert_field(word: u32, mask: u32, val: u32) -> u32 {
    (word & !mask) | (val.wrapping_mul(lobit(mask)) & mask)
}

pub fn in_reg_block(pa: u32) -> bool {
    (crate::constants::REG_BLOCK_START..=crate::constants::REG_BLOCK_END).contains(&pa)
}
