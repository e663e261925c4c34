pub mod api;
pub mod config;
pub mod transformer;

use async_trait::async_trait;
use std::sync::Arc;
use team_provider::credentials::{ProviderConfigUsage, UsageTracker};
use team_provider::resource::{ManagedResource, ResourceKind, Team};
use tracing::{debug, info, warn};

use crate::connector::{
    AtProvider, ExternalClient, ExternalConnector, ExternalCreation, ExternalObservation,
    ExternalUpdate,
};
use crate::context::Context;
use crate::error::{Operation, ReconcileError};

use self::api::{ApiError, TeamsApi};
use self::config::ClientResolver;
use self::transformer::{is_up_to_date, remote_to_observation, team_to_request};

/// Connector for GitHub organization teams.
pub struct TeamConnector {
    resolver: Arc<dyn ClientResolver>,
    usage: Arc<dyn UsageTracker>,
}

impl TeamConnector {
    pub fn new(resolver: Arc<dyn ClientResolver>, usage: Arc<dyn UsageTracker>) -> Self {
        Self { resolver, usage }
    }
}

#[async_trait]
impl ExternalConnector for TeamConnector {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Team
    }

    async fn connect(
        &self,
        ctx: &Context,
        resource: &ManagedResource,
    ) -> Result<Box<dyn ExternalClient>, ReconcileError> {
        team_of(resource)?;
        ctx.check()?;

        self.usage
            .track(&ProviderConfigUsage::for_resource(resource))
            .map_err(ReconcileError::CredentialResolution)?;
        let service = self
            .resolver
            .resolve(resource.meta())
            .map_err(ReconcileError::CredentialResolution)?;

        Ok(Box::new(TeamExternal::new(service)))
    }
}

/// External client for one team, built fresh for every reconcile pass.
pub struct TeamExternal {
    service: Arc<dyn TeamsApi>,
}

impl TeamExternal {
    pub fn new(service: Arc<dyn TeamsApi>) -> Self {
        Self { service }
    }
}

fn team_of(resource: &ManagedResource) -> Result<&Team, ReconcileError> {
    resource
        .as_team()
        .ok_or_else(|| ReconcileError::wrong_kind(ResourceKind::Team, resource.kind()))
}

/// Organization and slug addressing the remote team.
struct Target<'a> {
    org: &'a str,
    slug: &'a str,
}

fn target(team: &Team) -> Result<Target<'_>, ReconcileError> {
    let slug = team.metadata.external_name().ok_or_else(|| {
        ReconcileError::InvalidResource(format!(
            "team {} has no external name",
            team.metadata.name
        ))
    })?;
    if team.spec.org.is_empty() {
        return Err(ReconcileError::InvalidResource(format!(
            "team {} has no org",
            team.metadata.name
        )));
    }
    Ok(Target {
        org: &team.spec.org,
        slug,
    })
}

fn remote_call(op: Operation) -> impl FnOnce(ApiError) -> ReconcileError {
    move |source| ReconcileError::RemoteCall { op, source }
}

#[async_trait]
impl ExternalClient for TeamExternal {
    async fn observe(
        &self,
        ctx: &Context,
        resource: &ManagedResource,
    ) -> Result<ExternalObservation, ReconcileError> {
        let team = team_of(resource)?;
        let t = target(team)?;

        let remote = match ctx.run(self.service.get_team_by_slug(t.org, t.slug)).await? {
            Ok(remote) => remote,
            Err(ApiError::NotFound) => {
                debug!(org = %t.org, team = %t.slug, "Team not found");
                return Ok(ExternalObservation::absent());
            }
            Err(e) => return Err(ReconcileError::RemoteLookup(e)),
        };

        let up_to_date = is_up_to_date(&team.spec, &remote);
        debug!(
            org = %t.org,
            team = %t.slug,
            up_to_date = up_to_date,
            "Observed team"
        );

        Ok(ExternalObservation {
            resource_exists: true,
            resource_up_to_date: up_to_date,
            at_provider: Some(AtProvider::Team(remote_to_observation(&remote))),
        })
    }

    async fn create(
        &self,
        ctx: &Context,
        resource: &ManagedResource,
    ) -> Result<ExternalCreation, ReconcileError> {
        let team = team_of(resource)?;
        let t = target(team)?;
        info!(org = %t.org, team = %t.slug, "Creating team");

        let request = team_to_request(t.slug, &team.spec);
        let created = ctx
            .run(self.service.create_team(t.org, &request))
            .await?
            .map_err(remote_call(Operation::Create))?;

        if created.slug != t.slug {
            warn!(
                org = %t.org,
                team = %t.slug,
                remote_slug = %created.slug,
                "GitHub assigned a slug that differs from the external name; lookups will not find it"
            );
        }

        Ok(ExternalCreation {
            remote_id: Some(created.id),
        })
    }

    async fn update(
        &self,
        ctx: &Context,
        resource: &ManagedResource,
    ) -> Result<ExternalUpdate, ReconcileError> {
        let team = team_of(resource)?;
        let t = target(team)?;
        info!(org = %t.org, team = %t.slug, "Updating team");

        let request = team_to_request(t.slug, &team.spec);
        let updated = ctx
            .run(self.service.edit_team_by_slug(t.org, t.slug, &request))
            .await?
            .map_err(remote_call(Operation::Update))?;

        Ok(ExternalUpdate {
            remote_id: Some(updated.id),
        })
    }

    async fn delete(&self, ctx: &Context, resource: &ManagedResource) -> Result<(), ReconcileError> {
        let team = team_of(resource)?;
        let t = target(team)?;
        info!(org = %t.org, team = %t.slug, "Deleting team");

        match ctx.run(self.service.delete_team_by_slug(t.org, t.slug)).await? {
            Ok(()) => Ok(()),
            Err(ApiError::NotFound) => {
                debug!(org = %t.org, team = %t.slug, "Team already absent");
                Ok(())
            }
            Err(e) => Err(remote_call(Operation::Delete)(e)),
        }
    }
}
