use crate::beacon_key::BeaconKey;
use crate::reading::RawReading;
use uuid::Uuid;

/// A stable proximity UUID for unit tests.
pub const TEST_UUID: Uuid = Uuid::from_u128(0xf782_6da6_4fa2_4e98_8024_bc5b_71e0_893e);

/// The key `TEST_UUID:1:minor`.
pub fn key(minor: u16) -> BeaconKey {
    BeaconKey::new(TEST_UUID, 1, minor)
}

/// Build a well-formed `RawReading` for `TEST_UUID:1:minor`.
///
/// Tests can override just the fields they care about.
pub fn reading(minor: u16, distance: f64) -> RawReading {
    RawReading {
        origin_id: TEST_UUID.to_string(),
        group_id: 1,
        sub_id: i32::from(minor),
        signal_strength: -70,
        reference_tx_power: -59,
        estimated_distance: distance,
    }
}
