use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::{expires_at, ExchangeOutcome, TokenExchangeClient};
use crate::errors::{AppError, ExchangeStep, MissingResource};
use crate::models::{Organization, Platform, PlatformConnection, ProviderMetadata, TokenVariant};

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
}

#[derive(Deserialize)]
struct UserInfo {
    sub: Option<String>,
    name: Option<String>,
    given_name: Option<String>,
    family_name: Option<String>,
    email: Option<String>,
}

#[derive(Deserialize)]
struct OrganizationAcls {
    #[serde(default)]
    elements: Vec<OrganizationAcl>,
}

#[derive(Deserialize)]
struct OrganizationAcl {
    organization: String,
}

/// `urn:li:organization:2414183` → `2414183`.
fn organization_from_urn(urn: String) -> Organization {
    let id = urn.rsplit(':').next().unwrap_or_default().to_string();
    Organization { urn, id }
}

impl TokenExchangeClient {
    fn linkedin_api(&self, path: &str) -> String {
        format!(
            "{}{}",
            self.config.endpoints.linkedin_api_url.trim_end_matches('/'),
            path
        )
    }

    pub(super) async fn exchange_linkedin(
        &self,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<ExchangeOutcome, AppError> {
        let platform = Platform::ProfessionalNetwork;
        let (client_id, client_secret) = self.credentials(platform)?;
        let redirect_uri = self.config.redirect_uri(platform);

        let token: TokenResponse = self
            .send_json(
                platform,
                ExchangeStep::CodeExchange,
                self.http
                    .post(format!(
                        "{}/oauth/v2/accessToken",
                        self.config.endpoints.linkedin_oauth_url.trim_end_matches('/')
                    ))
                    .form(&[
                        ("grant_type", "authorization_code"),
                        ("code", code),
                        ("redirect_uri", redirect_uri.as_str()),
                        ("client_id", client_id),
                        ("client_secret", client_secret),
                    ]),
            )
            .await?;

        // Identity is required.
        let profile: UserInfo = self
            .send_json(
                platform,
                ExchangeStep::ProfileLookup,
                self.http
                    .get(self.linkedin_api("/v2/userinfo"))
                    .bearer_auth(&token.access_token),
            )
            .await?;
        let profile_id = profile
            .sub
            .filter(|s| !s.is_empty())
            .ok_or(MissingResource::NoProfileFound)?;
        let name = profile.name.unwrap_or_else(|| {
            [profile.given_name, profile.family_name]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" ")
        });

        // Organizations are optional; an error leaves the list empty.
        let organizations = match self.fetch_organizations(&token.access_token).await {
            Ok(orgs) => orgs,
            Err(e) => {
                tracing::warn!("organization lookup failed, connecting without organizations: {}", e);
                Vec::new()
            }
        };

        tracing::debug!(organizations = organizations.len(), "linkedin profile resolved");

        let primary = PlatformConnection {
            access_token: token.access_token,
            refresh_token: None,
            expires_at: expires_at(now, token.expires_in),
            token_variant: TokenVariant::LongLivedOpaque,
            provider_metadata: ProviderMetadata::ProfessionalNetwork {
                profile_id,
                name,
                email: profile.email,
                organizations,
            },
            connected_at: now,
        };

        Ok(ExchangeOutcome {
            primary,
            derived: None,
        })
    }

    async fn fetch_organizations(&self, access_token: &str) -> Result<Vec<Organization>, AppError> {
        let acls: OrganizationAcls = self
            .send_json(
                Platform::ProfessionalNetwork,
                ExchangeStep::OrganizationLookup,
                self.http
                    .get(self.linkedin_api("/v2/organizationAcls"))
                    .query(&[
                        ("q", "roleAssignee"),
                        ("role", "ADMINISTRATOR"),
                        ("state", "APPROVED"),
                    ])
                    .header("X-Restli-Protocol-Version", "2.0.0")
                    .bearer_auth(access_token),
            )
            .await?;

        Ok(acls
            .elements
            .into_iter()
            .map(|acl| organization_from_urn(acl.organization))
            .collect())
    }
}
