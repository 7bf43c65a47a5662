//! Resource Client: one authenticated fetch per resource family.
//!
//! Every failure is translated into a [`ConsoleError`] here, before it
//! reaches a page:
//!
//! - no session                 -> `NoSession`, nothing is sent
//! - HTTP 401                   -> `on_unauthorized`, then `SessionExpired`
//! - no response from backend   -> `BackendUnreachable`, session kept
//! - anything else              -> `UnknownFetch` with the raw message
//!
//! Fetches of the same family are serialized; different families may run
//! concurrently.

use super::backend::BackendHealth;
use super::normalizers::{
    EC2InstanceNormalizer, EC2SecurityGroupNormalizer, NetworkTopologyNormalizer,
    ResourceNormalizer, S3BucketNormalizer,
};
use super::state::{NetworkTopology, ResourceFamily, ResourceQuery, ResourceRecord, ABSENT};
use super::transport_errors::TransportError;
use crate::app::errors::{ConsoleError, ConsoleResult};
use crate::app::session::SessionController;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub struct ResourceClient {
    controller: Arc<SessionController>,
    default_region: String,
    in_flight: HashMap<ResourceFamily, Mutex<()>>,
}

impl ResourceClient {
    /// `default_region` is used for EC2 queries that do not name a region
    pub fn new(controller: Arc<SessionController>, default_region: impl Into<String>) -> Self {
        let in_flight = ResourceFamily::all()
            .into_iter()
            .map(|family| (family, Mutex::new(())))
            .collect();

        Self {
            controller,
            default_region: default_region.into(),
            in_flight,
        }
    }

    pub fn controller(&self) -> &Arc<SessionController> {
        &self.controller
    }

    pub fn default_region(&self) -> &str {
        &self.default_region
    }

    pub async fn fetch_ec2(&self, region: &str) -> ConsoleResult<Vec<ResourceRecord>> {
        self.fetch_records(&ResourceQuery::new(ResourceFamily::Ec2).in_region(region))
            .await
    }

    pub async fn fetch_s3(&self) -> ConsoleResult<Vec<ResourceRecord>> {
        self.fetch_records(&ResourceQuery::new(ResourceFamily::S3))
            .await
    }

    pub async fn fetch_security_groups(&self) -> ConsoleResult<Vec<ResourceRecord>> {
        self.fetch_records(&ResourceQuery::new(ResourceFamily::SecurityGroup))
            .await
    }

    pub async fn fetch_network(&self) -> ConsoleResult<NetworkTopology> {
        let query = ResourceQuery::new(ResourceFamily::Network);
        let (raw, region) = self.fetch_raw(&query).await?;
        normalize(&NetworkTopologyNormalizer, raw, &region)
    }

    /// Fetch any family as one record sequence. Network topology is flattened
    /// into VPCs, then subnets, then NAT gateways.
    pub async fn fetch_records(&self, query: &ResourceQuery) -> ConsoleResult<Vec<ResourceRecord>> {
        let (raw, region) = self.fetch_raw(query).await?;
        match query.family {
            ResourceFamily::Ec2 => normalize(&EC2InstanceNormalizer, raw, &region),
            ResourceFamily::S3 => normalize(&S3BucketNormalizer, raw, &region),
            ResourceFamily::SecurityGroup => normalize(&EC2SecurityGroupNormalizer, raw, &region),
            ResourceFamily::Network => {
                let topology = normalize(&NetworkTopologyNormalizer, raw, &region)?;
                Ok(topology.into_records())
            }
        }
    }

    /// Unauthenticated health check of one backend service
    pub async fn probe(&self, family: ResourceFamily) -> ConsoleResult<BackendHealth> {
        let path = family.health_path();
        let raw = self
            .controller
            .backend()
            .get_json(&path, None, None)
            .await
            .map_err(|e| match e {
                TransportError::Unreachable { message } => {
                    ConsoleError::BackendUnreachable { message }
                }
                other => ConsoleError::UnknownFetch {
                    message: other.message(),
                },
            })?;

        serde_json::from_value(raw).map_err(|e| ConsoleError::UnknownFetch {
            message: format!("unexpected health response from {}: {}", path, e),
        })
    }

    /// Issue the authenticated GET for `query`, holding the family lock for
    /// the whole request. Returns the raw body and the region to stamp on
    /// records.
    async fn fetch_raw(&self, query: &ResourceQuery) -> ConsoleResult<(serde_json::Value, String)> {
        let family = query.family;
        let _guard = match self.in_flight.get(&family) {
            Some(lock) => Some(lock.lock().await),
            None => None,
        };

        // Read after acquiring the lock: a fetch queued behind a 401 must
        // see the cleared session.
        let Some(session_id) = self.controller.store().session_id() else {
            debug!(family = %family, "Fetch refused without a session");
            return Err(ConsoleError::NoSession);
        };

        let (region_param, region) = match family {
            ResourceFamily::Ec2 => {
                let region = query
                    .region
                    .clone()
                    .unwrap_or_else(|| self.default_region.clone());
                (Some(region.clone()), region)
            }
            _ => (None, query.region.clone().unwrap_or_else(|| ABSENT.to_string())),
        };

        let started = Instant::now();
        let result = self
            .controller
            .backend()
            .get_json(&family.list_path(), region_param.as_deref(), Some(&session_id))
            .await;

        match result {
            Ok(raw) => {
                info!(
                    family = %family,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Fetched {}",
                    family.label()
                );
                Ok((raw, region))
            }
            Err(TransportError::Unauthorized) => {
                self.controller.on_unauthorized(&session_id);
                Err(ConsoleError::SessionExpired)
            }
            Err(TransportError::Unreachable { message }) => {
                warn!(family = %family, "Backend unreachable: {}", message);
                Err(ConsoleError::BackendUnreachable { message })
            }
            Err(other) => {
                warn!(family = %family, kind = other.short_label(), "Fetch failed: {}", other.message());
                Err(ConsoleError::UnknownFetch {
                    message: other.message(),
                })
            }
        }
    }
}

fn normalize<N: ResourceNormalizer>(
    normalizer: &N,
    raw: serde_json::Value,
    region: &str,
) -> ConsoleResult<N::Output> {
    normalizer.normalize(raw, region).map_err(|e| {
        warn!(family = %normalizer.family(), "Unexpected payload: {:#}", e);
        ConsoleError::UnknownFetch {
            message: format!("{:#}", e),
        }
    })
}
