use super::{utils::*, ResourceNormalizer};
use crate::app::resource_explorer::state::*;
use anyhow::{bail, Result};
use serde_json::Value;

pub struct EC2InstanceNormalizer;

impl EC2InstanceNormalizer {
    fn normalize_instance(&self, raw: &Value, region: &str) -> ResourceRecord {
        let instance_id = first_field(raw, &["instance_id", "InstanceId"]);
        let tags = extract_tags(raw);
        let display_name = extract_display_name(raw, &["name"], &tags, &instance_id);

        // The listing service reports the state as a plain string; raw
        // DescribeInstances output nests it under State.Name
        let state = match raw.get("state").or_else(|| raw.get("State")) {
            Some(nested @ Value::Object(_)) => field(nested, "Name"),
            _ => first_field(raw, &["state", "State"]),
        };

        let security_groups = array(raw, "security_groups")
            .iter()
            .map(|sg| SecurityGroupRef {
                group_id: first_field(sg, &["group_id", "GroupId"]),
                group_name: first_field(sg, &["group_name", "GroupName"]),
            })
            .collect();

        let root_volume = VolumeInfo {
            volume_id: field(raw, "root_volume_id"),
            volume_type: field(raw, "root_volume_type"),
            size_gb: field(raw, "root_volume_size"),
            kms_key_id: ABSENT.to_string(),
        };

        let data_volumes = array(raw, "data_volumes")
            .iter()
            .map(|v| VolumeInfo {
                volume_id: field(v, "volume_id"),
                volume_type: field(v, "type"),
                size_gb: field(v, "size_gb"),
                kms_key_id: field(v, "kms_key_id"),
            })
            .collect();

        ResourceRecord {
            family: ResourceFamily::Ec2,
            resource_type: "AWS::EC2::Instance".to_string(),
            resource_id: instance_id,
            display_name,
            region: region.to_string(),
            status: state.clone(),
            tags,
            detail: RecordDetail::Ec2Instance(Ec2InstanceDetail {
                instance_type: first_field(raw, &["instance_type", "type"]),
                os: field(raw, "os"),
                state,
                vpc_id: field(raw, "vpc_id"),
                availability_zone: field(raw, "az"),
                subnet_id: field(raw, "subnet_id"),
                private_ip: field(raw, "private_ip"),
                public_ip: field(raw, "public_ip"),
                security_groups,
                key_pair: field(raw, "key_pair"),
                ami_id: field(raw, "ami_id"),
                kms_key_id: field(raw, "kms_key_id"),
                root_volume,
                data_volumes,
            }),
        }
    }
}

impl ResourceNormalizer for EC2InstanceNormalizer {
    type Output = Vec<ResourceRecord>;

    fn normalize(&self, raw_response: Value, region: &str) -> Result<Vec<ResourceRecord>> {
        let Value::Array(instances) = raw_response else {
            bail!("expected a list of EC2 instances, got {}", kind_of(&raw_response));
        };

        Ok(instances
            .iter()
            .map(|inst| self.normalize_instance(inst, region))
            .collect())
    }

    fn family(&self) -> ResourceFamily {
        ResourceFamily::Ec2
    }
}
