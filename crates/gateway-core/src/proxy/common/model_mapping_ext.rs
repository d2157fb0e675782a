//! Extended model mapping utilities
//!
//! Wraps upstream model_mapping with additional functionality:
//! - `resolve_model_route` returning (model, reason) tuple

use std::collections::HashMap;

/// Core model routing engine with routing reason tracking
/// Priority: custom user mapping > protocol-specific mapping > built-in defaults
///
/// `protocol_mapping` is the caller's protocol-specific table (e.g.
/// `ProxyConfig.model_mappings.openai` or `.anthropic`); pass an empty map
/// for protocols that don't have one configured.
///
/// # Returns
/// Tuple of (mapped_model, routing_reason)
pub fn resolve_model_route(
    original_model: &str,
    custom_mapping: &HashMap<String, String>,
) -> (String, String) {
    resolve_model_route_for_protocol(original_model, custom_mapping, &HashMap::new())
}

/// Same as [`resolve_model_route`] but also consults a protocol-specific
/// mapping table between the custom mapping and the built-in defaults.
pub fn resolve_model_route_for_protocol(
    original_model: &str,
    custom_mapping: &HashMap<String, String>,
    protocol_mapping: &HashMap<String, String>,
) -> (String, String) {
    // 1. Custom user mapping (highest priority)
    if let Some((target, reason)) = lookup_mapping(original_model, custom_mapping) {
        tracing::info!("[Router] Custom mapping: {} -> {} ({})", original_model, target, reason);
        return (target, reason);
    }

    // 2. Protocol-specific configured mapping
    if let Some((target, reason)) = lookup_mapping(original_model, protocol_mapping) {
        tracing::info!(
            "[Router] Protocol mapping: {} -> {} ({})",
            original_model, target, reason
        );
        return (target, format!("protocol:{reason}"));
    }

    // 3. System default mapping (from upstream)
    let result = super::model_mapping::map_claude_model_to_gemini(original_model);
    let reason = if result != original_model {
        tracing::info!("[Router] System default mapping: {} -> {}", original_model, result);
        "system".to_string()
    } else {
        "passthrough".to_string()
    };

    (result, reason)
}

/// Exact match, then wildcard match, against a single mapping table.
fn lookup_mapping(original_model: &str, mapping: &HashMap<String, String>) -> Option<(String, String)> {
    if let Some(target) = mapping.get(original_model) {
        return Some((target.clone(), "exact".to_string()));
    }

    for (pattern, target) in mapping.iter() {
        if pattern.contains('*') && wildcard_match(pattern, original_model) {
            return Some((target.clone(), format!("wildcard:{}", pattern)));
        }
    }

    None
}

/// Wildcard matching helper
/// Supports simple * wildcard matching
fn wildcard_match(pattern: &str, text: &str) -> bool {
    if let Some(star_pos) = pattern.find('*') {
        let prefix = &pattern[..star_pos];
        let suffix = &pattern[star_pos + 1..];
        text.starts_with(prefix) && text.ends_with(suffix)
    } else {
        pattern == text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_model_route_exact() {
        let mut mapping = HashMap::new();
        mapping.insert("test-model".to_string(), "mapped-model".to_string());
        
        let (model, reason) = resolve_model_route("test-model", &mapping);
        assert_eq!(model, "mapped-model");
        assert_eq!(reason, "exact");
    }

    #[test]
    fn test_resolve_model_route_wildcard() {
        let mut mapping = HashMap::new();
        mapping.insert("gpt-4*".to_string(), "gemini-2.5-pro".to_string());
        
        let (model, reason) = resolve_model_route("gpt-4-turbo", &mapping);
        assert_eq!(model, "gemini-2.5-pro");
        assert!(reason.starts_with("wildcard:"));
    }

    #[test]
    fn test_resolve_model_route_system_default() {
        let mapping = HashMap::new();

        let (model, reason) = resolve_model_route("claude-opus-4-5-20251101", &mapping);
        assert_eq!(model, "claude-opus-4-5-thinking");
        assert_eq!(reason, "system");
    }

    #[test]
    fn protocol_mapping_wins_over_built_in_default() {
        let custom = HashMap::new();
        let mut protocol = HashMap::new();
        protocol.insert("gpt-4o".to_string(), "gemini-2.5-pro".to_string());

        let (model, reason) = resolve_model_route_for_protocol("gpt-4o", &custom, &protocol);
        assert_eq!(model, "gemini-2.5-pro");
        assert!(reason.starts_with("protocol:"));
    }

    #[test]
    fn custom_mapping_wins_over_protocol_mapping() {
        let mut custom = HashMap::new();
        custom.insert("gpt-4o".to_string(), "from-custom".to_string());
        let mut protocol = HashMap::new();
        protocol.insert("gpt-4o".to_string(), "from-protocol".to_string());

        let (model, reason) = resolve_model_route_for_protocol("gpt-4o", &custom, &protocol);
        assert_eq!(model, "from-custom");
        assert_eq!(reason, "exact");
    }
}
