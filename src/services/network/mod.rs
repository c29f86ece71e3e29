//! `Microsoft.Network` resources.

pub mod p2s_vpn_gateway;
pub mod private_endpoint;

use crate::client::models::AddressSpace;

/// Prefixes as sent to the API; an empty list is omitted.
fn expand_address_space(prefixes: &[String]) -> Option<AddressSpace> {
    if prefixes.is_empty() {
        return None;
    }
    Some(AddressSpace {
        address_prefixes: Some(prefixes.to_vec()),
    })
}

/// Prefixes as stored in state; absent becomes empty.
fn flatten_address_space(space: Option<&AddressSpace>) -> Vec<String> {
    space
        .and_then(|s| s.address_prefixes.clone())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_space() {
        assert!(expand_address_space(&[]).is_none());
        let space = expand_address_space(&["101.3.0.0/16".to_string()]);
        assert_eq!(flatten_address_space(space.as_ref()), vec!["101.3.0.0/16"]);
        assert!(flatten_address_space(None).is_empty());
        assert!(flatten_address_space(Some(&AddressSpace::default())).is_empty());
    }
}
