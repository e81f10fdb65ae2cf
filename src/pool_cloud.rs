//! Cloud provider inquiries.
//!
//! Unique responsibility: answer network questions about the cluster's VPC
//! (subnet zones, private subnets, security groups, local zones).
//!
//! The HTTP implementation goes through the control plane's `/aws_inquiries`
//! endpoints with the same credentials, so no cloud SDK is needed.

use async_trait::async_trait;
use serde::Serialize;

use crate::pool_api::{ItemList, ObjectRef, SecurityGroup, Subnet, ZoneInfo};
use crate::pool_client::{ClientError, RestTransport};

/// Network inquiries needed while resolving pool placement.
#[async_trait]
pub trait CloudProvider: Send + Sync {
    /// Availability zone of a subnet.
    async fn subnet_availability_zone(&self, region: &str, subnet_id: &str) -> Result<String, ClientError>;

    /// Private subnets of the VPC that contains `subnet_id`.
    async fn vpc_private_subnets(&self, region: &str, subnet_id: &str) -> Result<Vec<Subnet>, ClientError>;

    /// Security groups of the VPC that contains `subnet_id`.
    async fn vpc_security_groups(&self, region: &str, subnet_id: &str) -> Result<Vec<SecurityGroup>, ClientError>;

    /// Whether `zone` is a local zone.
    async fn is_local_zone(&self, region: &str, zone: &str) -> Result<bool, ClientError>;
}

#[derive(Serialize)]
struct SubnetInquiry<'a> {
    region: ObjectRef,
    subnet_ids: &'a [String],
}

#[derive(Serialize)]
struct VpcInquiry<'a> {
    region: ObjectRef,
    subnet_id: &'a str,
}

#[derive(Serialize)]
struct ZoneInquiry<'a> {
    region: ObjectRef,
    availability_zones: &'a [String],
}

fn region_ref(region: &str) -> ObjectRef {
    ObjectRef { id: region.to_string() }
}

/// HTTP implementation of [`CloudProvider`].
#[derive(Clone)]
pub struct HttpCloudProvider {
    rest: RestTransport,
}

impl HttpCloudProvider {
    /// Create a cloud inquiry client over a transport.
    #[must_use]
    pub const fn new(rest: RestTransport) -> Self {
        Self { rest }
    }
}

#[async_trait]
impl CloudProvider for HttpCloudProvider {
    async fn subnet_availability_zone(&self, region: &str, subnet_id: &str) -> Result<String, ClientError> {
        let ids = [subnet_id.to_string()];
        let inquiry = SubnetInquiry {
            region: region_ref(region),
            subnet_ids: &ids,
        };
        let list: ItemList<Subnet> = self.rest.inquire("aws_inquiries/subnets", &inquiry).await?;
        list.items
            .into_iter()
            .find(|s| s.subnet_id == subnet_id)
            .map(|s| s.availability_zone)
            .ok_or_else(|| ClientError::NotFound(format!("subnet '{subnet_id}' was not found in region '{region}'")))
    }

    async fn vpc_private_subnets(&self, region: &str, subnet_id: &str) -> Result<Vec<Subnet>, ClientError> {
        let inquiry = VpcInquiry {
            region: region_ref(region),
            subnet_id,
        };
        let list: ItemList<Subnet> = self.rest.inquire("aws_inquiries/vpc_subnets", &inquiry).await?;
        Ok(list.items.into_iter().filter(|s| !s.public).collect())
    }

    async fn vpc_security_groups(&self, region: &str, subnet_id: &str) -> Result<Vec<SecurityGroup>, ClientError> {
        let inquiry = VpcInquiry {
            region: region_ref(region),
            subnet_id,
        };
        let list: ItemList<SecurityGroup> = self.rest.inquire("aws_inquiries/security_groups", &inquiry).await?;
        Ok(list.items)
    }

    async fn is_local_zone(&self, region: &str, zone: &str) -> Result<bool, ClientError> {
        let zones = [zone.to_string()];
        let inquiry = ZoneInquiry {
            region: region_ref(region),
            availability_zones: &zones,
        };
        let list: ItemList<ZoneInfo> = self.rest.inquire("aws_inquiries/availability_zones", &inquiry).await?;
        Ok(list.items.iter().any(|z| z.name == zone && z.is_local()))
    }
}
