//! Feature license snapshots, keyed by feature name.

use std::collections::BTreeMap;

use rigproto::values::parse_bool;
use serde::Serialize;

use super::{ok_string, set_attr, AttrOutcome};

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct FeatureLicense {
    pub enabled: bool,
    /// Expiry as reported by the radio, verbatim; absent for perpetual
    /// licenses.
    pub expires_at: Option<String>,
    /// Attributes this library does not model, verbatim.
    pub raw: BTreeMap<String, String>,
}

impl FeatureLicense {
    pub(crate) fn apply_attr(&mut self, key: &str, value: &str) -> AttrOutcome {
        match key {
            "enabled" => set_attr!(self.enabled, parse_bool(value)),
            "expires" => set_attr!(self.expires_at, ok_string(value).map(Some)),
            _ => {
                self.raw.insert(key.to_string(), value.to_string());
                AttrOutcome::Unknown
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enable_and_expiry() {
        let mut lic = FeatureLicense::default();
        lic.apply_attr("enabled", "1");
        lic.apply_attr("expires", "2027-01-31");
        assert!(lic.enabled);
        assert_eq!(lic.expires_at.as_deref(), Some("2027-01-31"));
    }
}
