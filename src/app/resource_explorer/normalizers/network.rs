use super::utils::*;
use super::*;
use anyhow::{bail, Result};
use serde_json::Value;

/// Normalizer for the network topology payload `{vpcs, subnets, nat_gateways}`.
///
/// The three sequences are normalized independently; a missing sequence is
/// treated as empty.
pub struct NetworkTopologyNormalizer;

impl NetworkTopologyNormalizer {
    fn normalize_vpc(&self, raw: &Value, region: &str) -> ResourceRecord {
        let vpc_id = first_field(raw, &["vpc_id", "VpcId"]);
        let tags = extract_tags(raw);
        let display_name = extract_display_name(raw, &["name", "vpc"], &tags, &vpc_id);

        ResourceRecord {
            family: ResourceFamily::Network,
            resource_type: "AWS::EC2::VPC".to_string(),
            resource_id: vpc_id,
            display_name,
            region: region.to_string(),
            status: ABSENT.to_string(),
            tags,
            detail: RecordDetail::Vpc(VpcDetail {
                cidr_block: first_field(raw, &["cidr_block", "CidrBlock"]),
            }),
        }
    }

    fn normalize_subnet(&self, raw: &Value, region: &str) -> ResourceRecord {
        let subnet_id = first_field(raw, &["subnet_id", "SubnetId"]);
        let tags = extract_tags(raw);
        let display_name = extract_display_name(raw, &["subnet_name"], &tags, &subnet_id);

        ResourceRecord {
            family: ResourceFamily::Network,
            resource_type: "AWS::EC2::Subnet".to_string(),
            resource_id: subnet_id,
            display_name,
            region: region.to_string(),
            status: ABSENT.to_string(),
            tags,
            detail: RecordDetail::Subnet(SubnetDetail {
                vpc_id: first_field(raw, &["vpc_id", "VpcId"]),
                cidr_block: first_field(raw, &["cidr_block", "CidrBlock"]),
                availability_zone: first_field(raw, &["availability_zone", "AvailabilityZone"]),
                route_table: field(raw, "route_table"),
                available_ips: field(raw, "available_ips"),
            }),
        }
    }

    fn normalize_nat_gateway(&self, raw: &Value, region: &str) -> ResourceRecord {
        let nat_id = first_field(raw, &["nat_gateway_id", "NatGatewayId"]);
        let tags = extract_tags(raw);
        let display_name = extract_display_name(raw, &["nat_name"], &tags, &nat_id);

        ResourceRecord {
            family: ResourceFamily::Network,
            resource_type: "AWS::EC2::NatGateway".to_string(),
            resource_id: nat_id,
            display_name,
            region: region.to_string(),
            status: field(raw, "state"),
            tags,
            detail: RecordDetail::NatGateway(NatGatewayDetail {
                nat_arn: field(raw, "nat_arn"),
                vpc_id: field(raw, "vpc_id"),
                gateway_type: field(raw, "type"),
                elastic_ip: field(raw, "elastic_ip"),
                subnet_id: field(raw, "subnet_id"),
                private_ip: field(raw, "private_ip"),
                network_interface_id: field(raw, "network_interface_id"),
            }),
        }
    }
}

impl ResourceNormalizer for NetworkTopologyNormalizer {
    type Output = NetworkTopology;

    fn normalize(&self, raw_response: Value, region: &str) -> Result<NetworkTopology> {
        if !raw_response.is_object() {
            bail!(
                "expected a network topology object, got {}",
                kind_of(&raw_response)
            );
        }

        Ok(NetworkTopology {
            vpcs: array(&raw_response, "vpcs")
                .iter()
                .map(|v| self.normalize_vpc(v, region))
                .collect(),
            subnets: array(&raw_response, "subnets")
                .iter()
                .map(|s| self.normalize_subnet(s, region))
                .collect(),
            nat_gateways: array(&raw_response, "nat_gateways")
                .iter()
                .map(|n| self.normalize_nat_gateway(n, region))
                .collect(),
        })
    }

    fn family(&self) -> ResourceFamily {
        ResourceFamily::Network
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_topology() -> Value {
        json!({
            "vpcs": [
                {
                    "vpc": "main",
                    "name": "main",
                    "vpc_id": "vpc-1",
                    "cidr_block": "10.0.0.0/16",
                    "tags": [{"Key": "Name", "Value": "main"}]
                },
                {"vpc": "N/A", "name": "N/A", "vpc_id": "vpc-2", "cidr_block": "172.31.0.0/16", "tags": null}
            ],
            "subnets": [
                {
                    "subnet_name": "private-a",
                    "subnet_id": "subnet-1",
                    "cidr_block": "10.0.1.0/24",
                    "vpc_id": "vpc-1",
                    "availability_zone": "ap-northeast-2a",
                    "route_table": null,
                    "available_ips": 251,
                    "tags": [{"Key": "tier", "Value": "private"}]
                },
                {
                    "subnet_name": "default",
                    "subnet_id": "subnet-2",
                    "cidr_block": "172.31.0.0/20",
                    "vpc_id": "vpc-2",
                    "availability_zone": "ap-northeast-2b"
                }
            ],
            "nat_gateways": [
                {
                    "nat_name": "N/A",
                    "nat_gateway_id": "nat-1",
                    "nat_arn": null,
                    "vpc_id": "vpc-1",
                    "type": "public",
                    "elastic_ip": "3.3.3.3",
                    "subnet_id": "subnet-1",
                    "private_ip": "10.0.1.9",
                    "network_interface_id": "eni-1"
                }
            ]
        })
    }

    #[test]
    fn test_normalize_topology() {
        let topology = NetworkTopologyNormalizer
            .normalize(sample_topology(), "ap-northeast-2")
            .unwrap();

        assert_eq!(topology.vpcs.len(), 2);
        assert_eq!(topology.subnets.len(), 2);
        assert_eq!(topology.nat_gateways.len(), 1);

        assert_eq!(topology.vpcs[0].display_name, "main");
        assert_eq!(topology.vpcs[1].display_name, "vpc-2");
        assert!(topology.vpcs[1].tags.is_empty());

        let subnet = topology.subnets[0].as_subnet().unwrap();
        assert_eq!(subnet.route_table, ABSENT);
        assert_eq!(subnet.available_ips, "251");

        let nat = &topology.nat_gateways[0];
        assert_eq!(nat.display_name, "nat-1");
        match &nat.detail {
            RecordDetail::NatGateway(d) => {
                assert_eq!(d.nat_arn, ABSENT);
                assert_eq!(d.elastic_ip, "3.3.3.3");
            }
            other => panic!("unexpected detail {:?}", other),
        }
    }

    #[test]
    fn test_subnets_grouped_under_vpc() {
        let topology = NetworkTopologyNormalizer
            .normalize(sample_topology(), ABSENT)
            .unwrap();
        let ids: Vec<&str> = topology
            .subnets_in("vpc-1")
            .map(|s| s.resource_id.as_str())
            .collect();
        assert_eq!(ids, vec!["subnet-1"]);
    }

    #[test]
    fn test_missing_sequences_are_empty() {
        let topology = NetworkTopologyNormalizer
            .normalize(json!({"vpcs": []}), ABSENT)
            .unwrap();
        assert!(topology.is_empty());

        assert!(NetworkTopologyNormalizer
            .normalize(json!([]), ABSENT)
            .is_err());
    }
}
