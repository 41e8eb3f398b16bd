//! Stable service identifiers for core system services.

use crate::ServiceId;

const MEMFS_SERVICE_ID: u128 = 0x6e2d_41b0_93c5_4f1e_a7d2_58c4_0b9e_1f37u128;

/// Stable service ID for the in-memory namespace service.
///
/// Clients find the boot root through this id before any mount table
/// lookup is possible.
pub fn memfs_service_id() -> ServiceId {
    ServiceId::from_u128(MEMFS_SERVICE_ID)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memfs_service_id_stable() {
        assert_eq!(memfs_service_id(), ServiceId::from_u128(MEMFS_SERVICE_ID));
        assert_eq!(memfs_service_id(), memfs_service_id());
    }
}
