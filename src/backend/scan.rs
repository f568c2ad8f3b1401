//! Turns raw scan output into the list shown to the user.

use super::types::{NetworkDetails, NetworkRecord};

/// Deduplicate `raw` by SSID, keeping the strongest signal per SSID, and
/// order the result by signal strength, strongest first.
///
/// SSIDs compare as whole byte strings, so two names that differ only after
/// an embedded NUL stay separate networks.
///
/// Works on an index permutation so the raw records are never moved.
/// Ties keep the SSID order of the first pass, so equal input gives equal
/// output.
pub fn deduplicate(raw: &[NetworkDetails]) -> Vec<NetworkRecord> {
    if raw.is_empty() {
        return Vec::new();
    }

    // Group by SSID, strongest first within a group.
    let mut indices: Vec<usize> = (0..raw.len()).collect();
    indices.sort_by(|&a, &b| {
        raw[a]
            .ssid
            .as_bytes()
            .cmp(raw[b].ssid.as_bytes())
            .then(raw[b].signal.cmp(&raw[a].signal))
    });

    // Keep the head of every group.
    indices.dedup_by(|later, kept| raw[*later].ssid == raw[*kept].ssid);

    indices.sort_by(|&a, &b| raw[b].signal.cmp(&raw[a].signal));

    indices.into_iter().map(|i| NetworkRecord::from(&raw[i])).collect()
}
