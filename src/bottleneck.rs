/// Percentage of time the chef (CPU) is busy when the pantry (memory)
/// delivers `pantry_rate` ingredients per minute and the chef could work
/// through `chef_rate` steps per minute.
pub fn utilization(chef_rate: u32, pantry_rate: u32) -> u32 {
    if pantry_rate >= chef_rate {
        return 100;
    }
    (u64::from(pantry_rate) * 100 / u64::from(chef_rate)) as u32
}
