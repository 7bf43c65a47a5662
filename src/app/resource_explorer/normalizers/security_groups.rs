use super::utils::*;
use super::*;
use anyhow::{bail, Result};
use serde_json::Value;

/// Normalizer for Security Groups.
///
/// Each group's rules are flattened into one sequence: inbound rules in
/// backend order, then outbound rules in backend order, each tagged with its
/// direction. Grouped rendering relies on this order being stable.
pub struct EC2SecurityGroupNormalizer;

impl EC2SecurityGroupNormalizer {
    fn normalize_group(&self, map_key: Option<&str>, raw: &Value, region: &str) -> ResourceRecord {
        let group_id = match first_field(raw, &["sg_id", "GroupId"]) {
            id if is_absent(&id) => map_key.unwrap_or(ABSENT).to_string(),
            id => id,
        };
        let group_name = first_field(raw, &["sg_name", "GroupName"]);
        let vpc_id = first_field(raw, &["vpc_id", "VpcId"]);
        let tags = extract_tags(raw);

        let group_region = match field(raw, "region") {
            r if is_absent(&r) => region.to_string(),
            r => r,
        };

        let display_name = if is_absent(&group_name) {
            group_id.clone()
        } else {
            group_name.clone()
        };

        let rules: Vec<SecurityGroupRule> = array(raw, "inbound_rules")
            .iter()
            .map(|r| normalize_rule(r, RuleDirection::Inbound))
            .chain(
                array(raw, "outbound_rules")
                    .iter()
                    .map(|r| normalize_rule(r, RuleDirection::Outbound)),
            )
            .collect();

        ResourceRecord {
            family: ResourceFamily::SecurityGroup,
            resource_type: "AWS::EC2::SecurityGroup".to_string(),
            resource_id: group_id,
            display_name,
            region: group_region,
            status: format!("{} rules", rules.len()),
            tags,
            detail: RecordDetail::SecurityGroup(SecurityGroupDetail {
                group_name,
                vpc_id,
                rules,
            }),
        }
    }
}

fn normalize_rule(raw: &Value, direction: RuleDirection) -> SecurityGroupRule {
    let protocol = match field(raw, "protocol") {
        p if is_absent(&p) || p == "-1" => "All".to_string(),
        p => p,
    };

    let port = match field(raw, "port") {
        p if is_absent(&p) => "All".to_string(),
        p => p,
    };

    // Older payloads name the peer `source` / `destination` instead of `cidr`
    let cidr = first_field(raw, &["cidr", "source", "destination"]);

    let instance_id = field(raw, "instance_id");
    let associated_instance = if is_absent(&instance_id) {
        None
    } else {
        Some(AssociatedInstance {
            id: instance_id,
            name: field(raw, "instance_name"),
            private_ip: field(raw, "private_ip"),
            public_ip: field(raw, "public_ip"),
        })
    };

    SecurityGroupRule {
        direction,
        protocol,
        port,
        cidr,
        associated_instance,
    }
}

impl ResourceNormalizer for EC2SecurityGroupNormalizer {
    type Output = Vec<ResourceRecord>;

    fn normalize(&self, raw_response: Value, region: &str) -> Result<Vec<ResourceRecord>> {
        match raw_response {
            Value::Object(groups) => Ok(groups
                .iter()
                .map(|(sg_id, group)| self.normalize_group(Some(sg_id), group, region))
                .collect()),
            Value::Array(groups) => Ok(groups
                .iter()
                .map(|group| self.normalize_group(None, group, region))
                .collect()),
            other => bail!(
                "expected a mapping of security groups, got {}",
                kind_of(&other)
            ),
        }
    }

    fn family(&self) -> ResourceFamily {
        ResourceFamily::SecurityGroup
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn rule(cidr: &str) -> Value {
        json!({"protocol": "tcp", "port": "443", "cidr": cidr})
    }

    #[test]
    fn test_inbound_rules_precede_outbound_rules() {
        let raw = json!({
            "sg-1": {
                "sg_id": "sg-1",
                "sg_name": "web",
                "vpc_id": "vpc-1",
                "region": "ap-northeast-2",
                "inbound_rules": [rule("a"), rule("b")],
                "outbound_rules": [rule("c")],
                "tags": []
            }
        });

        let records = EC2SecurityGroupNormalizer.normalize(raw, ABSENT).unwrap();
        let detail = records[0].as_security_group().unwrap();

        let order: Vec<(&str, RuleDirection)> = detail
            .rules
            .iter()
            .map(|r| (r.cidr.as_str(), r.direction))
            .collect();
        assert_eq!(
            order,
            vec![
                ("a", RuleDirection::Inbound),
                ("b", RuleDirection::Inbound),
                ("c", RuleDirection::Outbound),
            ]
        );
        assert_eq!(detail.inbound().count(), 2);
        assert_eq!(detail.outbound().count(), 1);
    }

    #[test]
    fn test_group_order_follows_payload() {
        let raw = json!({
            "sg-b": {"sg_id": "sg-b", "sg_name": "second"},
            "sg-a": {"sg_id": "sg-a", "sg_name": "first"}
        });
        let records = EC2SecurityGroupNormalizer.normalize(raw, ABSENT).unwrap();
        let ids: Vec<&str> = records.iter().map(|r| r.resource_id.as_str()).collect();
        assert_eq!(ids, vec!["sg-b", "sg-a"]);
    }

    #[test]
    fn test_rule_defaults_and_associated_instance() {
        let raw = json!([{
            "sg_id": "sg-9",
            "inbound_rules": [
                {"protocol": "-1", "cidr": "0.0.0.0/0"},
                {
                    "protocol": "tcp",
                    "port": 22,
                    "cidr": "10.0.0.0/8",
                    "instance_id": "i-1",
                    "instance_name": null,
                    "private_ip": "10.0.0.5",
                    "public_ip": null
                }
            ]
        }]);

        let records = EC2SecurityGroupNormalizer.normalize(raw, "us-east-1").unwrap();
        let record = &records[0];
        assert_eq!(record.region, "us-east-1");
        assert_eq!(record.display_name, "sg-9");
        assert!(record.tags.is_empty());

        let detail = record.as_security_group().unwrap();
        assert_eq!(detail.vpc_id, ABSENT);
        assert_eq!(detail.rules[0].protocol, "All");
        assert_eq!(detail.rules[0].port, "All");
        assert_eq!(detail.rules[0].associated_instance, None);

        assert_eq!(detail.rules[1].port, "22");
        assert_eq!(
            detail.rules[1].associated_instance,
            Some(AssociatedInstance {
                id: "i-1".into(),
                name: ABSENT.into(),
                private_ip: "10.0.0.5".into(),
                public_ip: ABSENT.into(),
            })
        );
    }

    #[test]
    fn test_map_key_used_when_group_id_missing() {
        let raw = json!({"sg-key": {"sg_name": "named"}});
        let records = EC2SecurityGroupNormalizer.normalize(raw, ABSENT).unwrap();
        assert_eq!(records[0].resource_id, "sg-key");
        assert_eq!(records[0].display_name, "named");
    }
}
