use super::utils::*;
use super::*;
use anyhow::{bail, Result};
use serde_json::Value;

/// Normalizer for S3 Buckets
pub struct S3BucketNormalizer;

impl S3BucketNormalizer {
    fn normalize_bucket(&self, raw: &Value, region: &str) -> ResourceRecord {
        let bucket_name = first_field(raw, &["name", "Name", "BucketName"]);
        let tags = extract_tags(raw);

        // Bucket location wins over the query region
        let bucket_region = match field(raw, "region").as_str() {
            "Unknown" => ABSENT.to_string(),
            r if is_absent(r) => region.to_string(),
            r => r.to_string(),
        };

        let encrypted = flag(raw, "encrypted");

        ResourceRecord {
            family: ResourceFamily::S3,
            resource_type: "AWS::S3::Bucket".to_string(),
            resource_id: bucket_name.clone(),
            display_name: bucket_name,
            region: bucket_region,
            status: if encrypted { "encrypted" } else { "unencrypted" }.to_string(),
            tags,
            detail: RecordDetail::S3Bucket(S3BucketDetail {
                static_website: flag(raw, "static_website"),
                versioning_enabled: flag(raw, "versioning_enabled"),
                mfa_delete: flag(raw, "mfa_delete"),
                lifecycle_rules: count(raw, "lifecycle_rules"),
                replication_enabled: flag(raw, "replication_enabled"),
                copy_settings_enabled: flag(raw, "copy_settings_enabled"),
                encrypted,
                kms_key_id: field(raw, "kms_key_id"),
                block_public_access: flag(raw, "block_public_access"),
            }),
        }
    }
}

impl ResourceNormalizer for S3BucketNormalizer {
    type Output = Vec<ResourceRecord>;

    fn normalize(&self, raw_response: Value, region: &str) -> Result<Vec<ResourceRecord>> {
        let Value::Array(buckets) = raw_response else {
            bail!("expected a list of S3 buckets, got {}", kind_of(&raw_response));
        };

        Ok(buckets
            .iter()
            .map(|bucket| self.normalize_bucket(bucket, region))
            .collect())
    }

    fn family(&self) -> ResourceFamily {
        ResourceFamily::S3
    }
}
