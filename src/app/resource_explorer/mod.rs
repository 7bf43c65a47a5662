//! Resource explorer: session-scoped fetch, normalization and filtering of
//! EC2 instances, Security Groups, S3 buckets and VPC network topology.

use crate::app::session::SessionController;
use std::sync::Arc;

pub mod backend;
pub mod export;
pub mod normalizers;
pub mod resource_client;
pub mod rule_filter;
pub mod state;
pub mod tag_filter;
pub mod transport_errors;
pub mod view;

pub use backend::{BackendClient, BackendHealth};
pub use normalizers::ResourceNormalizer;
pub use resource_client::ResourceClient;
pub use rule_filter::RuleFilter;
pub use state::{
    NetworkTopology, RecordDetail, ResourceFamily, ResourceQuery, ResourceRecord, ResourceTag,
    SecurityGroupRule, Tagged, ABSENT,
};
pub use tag_filter::FilterState;
pub use view::{ResourceView, ViewUpdate};

/// The four resource pages over one shared client.
///
/// Each page is a thin consumer: it asks the client for its family and
/// applies whatever comes back to its own view.
pub struct ResourceExplorer {
    client: ResourceClient,
    pub ec2: ResourceView<Vec<ResourceRecord>>,
    pub s3: ResourceView<Vec<ResourceRecord>>,
    pub security_groups: ResourceView<Vec<ResourceRecord>>,
    pub network: ResourceView<NetworkTopology>,
}

impl ResourceExplorer {
    pub fn new(controller: Arc<SessionController>, default_region: impl Into<String>) -> Self {
        Self {
            client: ResourceClient::new(controller, default_region),
            ec2: ResourceView::new(),
            s3: ResourceView::new(),
            security_groups: ResourceView::new(),
            network: ResourceView::new(),
        }
    }

    pub fn client(&self) -> &ResourceClient {
        &self.client
    }

    pub async fn refresh_ec2(&mut self, region: &str) -> ViewUpdate {
        let result = self.client.fetch_ec2(region).await;
        self.ec2.apply(result)
    }

    pub async fn refresh_s3(&mut self) -> ViewUpdate {
        let result = self.client.fetch_s3().await;
        self.s3.apply(result)
    }

    pub async fn refresh_security_groups(&mut self) -> ViewUpdate {
        let result = self.client.fetch_security_groups().await;
        self.security_groups.apply(result)
    }

    pub async fn refresh_network(&mut self) -> ViewUpdate {
        let result = self.client.fetch_network().await;
        self.network.apply(result)
    }
}
