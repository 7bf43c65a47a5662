//! CSV export of normalized records.

use super::state::ResourceRecord;

const SECURITY_GROUP_HEADER: [&str; 8] = [
    "sg_id",
    "name",
    "vpc_id",
    "region",
    "direction",
    "protocol",
    "port",
    "cidr",
];

const EC2_HEADER: [&str; 8] = [
    "instance_id",
    "name",
    "type",
    "state",
    "private_ip",
    "public_ip",
    "az",
    "security_groups",
];

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn write_row<S: AsRef<str>>(out: &mut String, fields: &[S]) {
    let line: Vec<String> = fields.iter().map(|f| escape(f.as_ref())).collect();
    out.push_str(&line.join(","));
    out.push('\n');
}

/// One row per rule, inbound rules before outbound rules within each group.
/// Records that are not Security Groups are skipped.
pub fn security_groups_csv(records: &[ResourceRecord]) -> String {
    let mut out = String::new();
    write_row(&mut out, &SECURITY_GROUP_HEADER);

    for record in records {
        let Some(group) = record.as_security_group() else {
            continue;
        };
        for rule in &group.rules {
            let direction = rule.direction.to_string().to_lowercase();
            write_row(
                &mut out,
                &[
                    record.resource_id.as_str(),
                    group.group_name.as_str(),
                    group.vpc_id.as_str(),
                    record.region.as_str(),
                    direction.as_str(),
                    rule.protocol.as_str(),
                    rule.port.as_str(),
                    rule.cidr.as_str(),
                ],
            );
        }
    }

    out
}

/// One row per instance. Records that are not EC2 instances are skipped.
pub fn ec2_csv(records: &[ResourceRecord]) -> String {
    let mut out = String::new();
    write_row(&mut out, &EC2_HEADER);

    for record in records {
        let Some(instance) = record.as_ec2() else {
            continue;
        };
        let security_groups = instance
            .security_groups
            .iter()
            .map(|sg| sg.group_name.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        write_row(
            &mut out,
            &[
                record.resource_id.as_str(),
                record.display_name.as_str(),
                instance.instance_type.as_str(),
                instance.state.as_str(),
                instance.private_ip.as_str(),
                instance.public_ip.as_str(),
                instance.availability_zone.as_str(),
                security_groups.as_str(),
            ],
        );
    }

    out
}
