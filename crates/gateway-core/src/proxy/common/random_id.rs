// Random ID helpers.

/// Adjectives used by [`synthesize_project_id`]. Kept short and unambiguous,
/// mirroring the style of GCP's own auto-generated project ids.
const PROJECT_ID_ADJECTIVES: &[&str] = &[
    "swift", "quiet", "bold", "amber", "crimson", "brisk", "calm", "eager", "fleet", "gentle",
    "hardy", "ivory", "jolly", "keen", "lively", "mellow", "nimble", "opal", "plucky", "rapid",
];

/// Nouns used by [`synthesize_project_id`].
const PROJECT_ID_NOUNS: &[&str] = &[
    "falcon", "harbor", "meadow", "ember", "glacier", "canyon", "summit", "orchid", "lagoon",
    "thicket", "comet", "lantern", "ridge", "delta", "willow", "basin", "cove", "prairie",
    "boulder", "tundra",
];

/// Synthesize a readable `<adjective>-<noun>-<5hex>` project id.
///
/// Used when `loadCodeAssist` responds without a `cloudaicompanionProject`
/// field (the account has no provisioned project) so the caller still has a
/// stable-looking id to attach to the upstream envelope.
pub fn synthesize_project_id() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let adjective = PROJECT_ID_ADJECTIVES[rng.gen_range(0..PROJECT_ID_ADJECTIVES.len())];
    let noun = PROJECT_ID_NOUNS[rng.gen_range(0..PROJECT_ID_NOUNS.len())];
    let hex: String = (0..5).map(|_| format!("{:x}", rng.gen_range(0..16u8))).collect();
    format!("{adjective}-{noun}-{hex}")
}

pub fn generate_random_id() -> String {
    use rand::Rng;
    rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(16)
        .map(char::from)
        .collect()
}

/// Infer quota group from model name.
// NOTE: Deprecated. Use mappers::request_config::resolve_request_config instead.
#[deprecated(note = "Use mappers::request_config::resolve_request_config instead.")]
pub fn _deprecated_infer_quota_group(model: &str) -> String {
    gateway_types::ModelFamily::from_model_name(model).as_str().to_string()
}

#[cfg(test)]
mod tests {
    use super::{generate_random_id, synthesize_project_id};

    #[test]
    fn generate_random_id_has_expected_length() {
        let id = generate_random_id();
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn synthesize_project_id_matches_adjective_noun_hex_shape() {
        let id = synthesize_project_id();
        let parts: Vec<&str> = id.split('-').collect();
        assert_eq!(parts.len(), 3, "expected adjective-noun-hex, got {id}");
        assert_eq!(parts[2].len(), 5);
        assert!(parts[2].chars().all(|c| c.is_ascii_hexdigit()));
    }
}
