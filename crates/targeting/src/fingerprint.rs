//! Stable content fingerprints used as validation cache keys.

use campaign_core::types::{AudienceSegment, Platform, TargetingRule};
use serde::Serialize;
use sha2::{Digest, Sha256};

#[derive(Serialize)]
struct FingerprintInput<'a> {
    platform: Platform,
    name: &'a str,
    description: &'a str,
    rules: &'a [TargetingRule],
    // JSON writes every non-finite float as null.
    weight_bits: Vec<u64>,
}

/// SHA-256 over everything validation reads. Segment id, reach and
/// metadata are excluded so equal content shares one cache entry.
pub fn segment_fingerprint(segment: &AudienceSegment) -> String {
    let input = FingerprintInput {
        platform: segment.platform,
        name: &segment.name,
        description: &segment.description,
        rules: &segment.targeting_rules,
        weight_bits: segment.targeting_rules.iter().map(|r| r.weight.to_bits()).collect(),
    };
    // Debug output stands in if serialization ever fails.
    let bytes = serde_json::to_vec(&input).unwrap_or_else(|_| format!("{:?}", segment.targeting_rules).into_bytes());
    hex::encode(Sha256::digest(&bytes))
}
