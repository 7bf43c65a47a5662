use serde::{Deserialize, Serialize};
use std::fmt;

/// Marker substituted for any optional field the backend left out, sent as
/// `null`, sent empty, or reported as `"N/A"`. Renderers and filters compare
/// against this one value instead of branching on `Option`.
pub const ABSENT: &str = "-";

/// Returns true if a normalized field holds the absent marker
pub fn is_absent(value: &str) -> bool {
    value == ABSENT
}

/// Resource families the backend proxy can list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceFamily {
    Ec2,
    S3,
    SecurityGroup,
    Network,
}

impl ResourceFamily {
    pub fn all() -> [ResourceFamily; 4] {
        [
            ResourceFamily::Ec2,
            ResourceFamily::S3,
            ResourceFamily::SecurityGroup,
            ResourceFamily::Network,
        ]
    }

    /// Service prefix under the console origin
    pub fn base_path(&self) -> &'static str {
        match self {
            ResourceFamily::Ec2 => "/api/backend-ec2",
            ResourceFamily::S3 => "/api/backend-s3",
            ResourceFamily::SecurityGroup => "/api/security-groups",
            ResourceFamily::Network => "/api/backend-network",
        }
    }

    /// Listing endpoint. EC2 is addressed without the trailing slash, the
    /// other services are mounted as directories.
    pub fn list_path(&self) -> String {
        match self {
            ResourceFamily::Ec2 => self.base_path().to_string(),
            _ => format!("{}/", self.base_path()),
        }
    }

    pub fn health_path(&self) -> String {
        format!("{}/health", self.base_path())
    }

    pub fn label(&self) -> &'static str {
        match self {
            ResourceFamily::Ec2 => "EC2 Instances",
            ResourceFamily::S3 => "S3 Buckets",
            ResourceFamily::SecurityGroup => "Security Groups",
            ResourceFamily::Network => "Network",
        }
    }
}

impl fmt::Display for ResourceFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceFamily::Ec2 => "ec2",
            ResourceFamily::S3 => "s3",
            ResourceFamily::SecurityGroup => "security-groups",
            ResourceFamily::Network => "network",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for ResourceFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ec2" => Ok(ResourceFamily::Ec2),
            "s3" => Ok(ResourceFamily::S3),
            "security-groups" | "security_groups" | "sg" => Ok(ResourceFamily::SecurityGroup),
            "network" | "vpc" => Ok(ResourceFamily::Network),
            other => Err(format!("unknown resource family: {}", other)),
        }
    }
}

/// One fetch request, constructed per call and thrown away afterwards
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceQuery {
    pub family: ResourceFamily,
    pub region: Option<String>,
}

impl ResourceQuery {
    pub fn new(family: ResourceFamily) -> Self {
        Self {
            family,
            region: None,
        }
    }

    pub fn in_region(mut self, region: impl Into<String>) -> Self {
        let region = region.into();
        self.region = if region.trim().is_empty() {
            None
        } else {
            Some(region)
        };
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceTag {
    #[serde(alias = "Key")]
    pub key: String,
    #[serde(alias = "Value")]
    pub value: String,
}

impl ResourceTag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Anything carrying a tag sequence can be run through the tag filter
pub trait Tagged {
    fn tags(&self) -> &[ResourceTag];
}

/// Canonical, family-agnostic view of one AWS resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub family: ResourceFamily,
    pub resource_type: String, // AWS::EC2::Instance
    pub resource_id: String,
    pub display_name: String,
    pub region: String,
    pub status: String,
    /// Always present, empty when the resource has no tags
    pub tags: Vec<ResourceTag>,
    pub detail: RecordDetail,
}

impl ResourceRecord {
    pub fn tag_value(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|t| t.key == key)
            .map(|t| t.value.as_str())
    }

    pub fn as_ec2(&self) -> Option<&Ec2InstanceDetail> {
        match &self.detail {
            RecordDetail::Ec2Instance(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_s3(&self) -> Option<&S3BucketDetail> {
        match &self.detail {
            RecordDetail::S3Bucket(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_security_group(&self) -> Option<&SecurityGroupDetail> {
        match &self.detail {
            RecordDetail::SecurityGroup(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_subnet(&self) -> Option<&SubnetDetail> {
        match &self.detail {
            RecordDetail::Subnet(d) => Some(d),
            _ => None,
        }
    }
}

impl Tagged for ResourceRecord {
    fn tags(&self) -> &[ResourceTag] {
        &self.tags
    }
}

/// Family-specific fields of a [`ResourceRecord`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordDetail {
    Ec2Instance(Ec2InstanceDetail),
    S3Bucket(S3BucketDetail),
    SecurityGroup(SecurityGroupDetail),
    Vpc(VpcDetail),
    Subnet(SubnetDetail),
    NatGateway(NatGatewayDetail),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ec2InstanceDetail {
    pub instance_type: String,
    pub os: String,
    pub state: String,
    pub vpc_id: String,
    pub availability_zone: String,
    pub subnet_id: String,
    pub private_ip: String,
    pub public_ip: String,
    pub security_groups: Vec<SecurityGroupRef>,
    pub key_pair: String,
    pub ami_id: String,
    pub kms_key_id: String,
    pub root_volume: VolumeInfo,
    pub data_volumes: Vec<VolumeInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityGroupRef {
    pub group_id: String,
    pub group_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeInfo {
    pub volume_id: String,
    pub volume_type: String,
    pub size_gb: String,
    pub kms_key_id: String,
}

impl VolumeInfo {
    pub fn absent() -> Self {
        Self {
            volume_id: ABSENT.to_string(),
            volume_type: ABSENT.to_string(),
            size_gb: ABSENT.to_string(),
            kms_key_id: ABSENT.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct S3BucketDetail {
    pub static_website: bool,
    pub versioning_enabled: bool,
    pub mfa_delete: bool,
    pub lifecycle_rules: u64,
    pub replication_enabled: bool,
    pub copy_settings_enabled: bool,
    pub encrypted: bool,
    pub kms_key_id: String,
    pub block_public_access: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityGroupDetail {
    pub group_name: String,
    pub vpc_id: String,
    /// Inbound rules in backend order, followed by outbound rules in backend order
    pub rules: Vec<SecurityGroupRule>,
}

impl SecurityGroupDetail {
    pub fn inbound(&self) -> impl Iterator<Item = &SecurityGroupRule> {
        self.rules
            .iter()
            .filter(|r| r.direction == RuleDirection::Inbound)
    }

    pub fn outbound(&self) -> impl Iterator<Item = &SecurityGroupRule> {
        self.rules
            .iter()
            .filter(|r| r.direction == RuleDirection::Outbound)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleDirection {
    Inbound,
    Outbound,
}

impl fmt::Display for RuleDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleDirection::Inbound => f.write_str("Inbound"),
            RuleDirection::Outbound => f.write_str("Outbound"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityGroupRule {
    pub direction: RuleDirection,
    pub protocol: String,
    pub port: String,
    pub cidr: String,
    pub associated_instance: Option<AssociatedInstance>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociatedInstance {
    pub id: String,
    pub name: String,
    pub private_ip: String,
    pub public_ip: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VpcDetail {
    pub cidr_block: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubnetDetail {
    pub vpc_id: String,
    pub cidr_block: String,
    pub availability_zone: String,
    pub route_table: String,
    pub available_ips: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NatGatewayDetail {
    pub nat_arn: String,
    pub vpc_id: String,
    pub gateway_type: String,
    pub elastic_ip: String,
    pub subnet_id: String,
    pub private_ip: String,
    pub network_interface_id: String,
}

/// Result of a network fetch: three independent sequences
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkTopology {
    pub vpcs: Vec<ResourceRecord>,
    pub subnets: Vec<ResourceRecord>,
    pub nat_gateways: Vec<ResourceRecord>,
}

impl NetworkTopology {
    pub fn is_empty(&self) -> bool {
        self.vpcs.is_empty() && self.subnets.is_empty() && self.nat_gateways.is_empty()
    }

    /// Subnets belonging to a VPC, in backend order
    pub fn subnets_in<'a>(&'a self, vpc_id: &'a str) -> impl Iterator<Item = &'a ResourceRecord> {
        self.subnets
            .iter()
            .filter(move |s| s.as_subnet().map(|d| d.vpc_id == vpc_id).unwrap_or(false))
    }

    /// Flatten into one sequence: VPCs, then subnets, then NAT gateways
    pub fn into_records(self) -> Vec<ResourceRecord> {
        let mut records = self.vpcs;
        records.extend(self.subnets);
        records.extend(self.nat_gateways);
        records
    }
}
