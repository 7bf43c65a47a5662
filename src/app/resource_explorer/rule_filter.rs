use super::state::ResourceRecord;
use serde::{Deserialize, Serialize};

/// Exact-match filter over Security Group records.
///
/// Unset or blank criteria impose no constraint. `vpc_id` is matched against
/// the group; `protocol` and `port` must both hold for at least one rule of
/// the group. Non-Security-Group records never match a non-empty filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleFilter {
    pub vpc_id: Option<String>,
    pub protocol: Option<String>,
    pub port: Option<String>,
}

fn criterion(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl RuleFilter {
    pub fn is_empty(&self) -> bool {
        criterion(&self.vpc_id).is_none()
            && criterion(&self.protocol).is_none()
            && criterion(&self.port).is_none()
    }

    pub fn matches(&self, record: &ResourceRecord) -> bool {
        if self.is_empty() {
            return true;
        }

        let Some(group) = record.as_security_group() else {
            return false;
        };

        if let Some(vpc_id) = criterion(&self.vpc_id) {
            if group.vpc_id != vpc_id {
                return false;
            }
        }

        let protocol = criterion(&self.protocol);
        let port = criterion(&self.port);
        if protocol.is_none() && port.is_none() {
            return true;
        }

        group.rules.iter().any(|rule| {
            protocol.map_or(true, |p| rule.protocol.eq_ignore_ascii_case(p))
                && port.map_or(true, |p| rule.port == p)
        })
    }

    pub fn apply(&self, records: &[ResourceRecord]) -> Vec<ResourceRecord> {
        records.iter().filter(|r| self.matches(r)).cloned().collect()
    }
}
