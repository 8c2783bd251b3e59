use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::{ExchangeOutcome, TokenExchangeClient};
use crate::errors::{AppError, ExchangeStep, MissingResource};
use crate::models::{
    LinkedPhotoAccount, Platform, PlatformConnection, ProviderMetadata, TokenVariant,
};
use crate::oauth::authorize::META_GRAPH_VERSION;

#[derive(Deserialize)]
struct AccessTokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct PageList {
    #[serde(default)]
    data: Vec<Page>,
}

#[derive(Deserialize)]
struct Page {
    id: String,
    name: String,
    access_token: String,
    instagram_business_account: Option<AccountRef>,
}

#[derive(Deserialize)]
struct AccountRef {
    id: String,
}

#[derive(Deserialize)]
struct PhotoAccount {
    id: String,
    username: String,
}

impl TokenExchangeClient {
    fn graph_url(&self, path: &str) -> String {
        format!(
            "{}/{}/{}",
            self.config.endpoints.meta_graph_url.trim_end_matches('/'),
            META_GRAPH_VERSION,
            path
        )
    }

    /// code → short-lived user token → long-lived user token → first page
    /// (never-expiring page token) → optional linked photo account.
    pub(super) async fn exchange_meta(
        &self,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<ExchangeOutcome, AppError> {
        let platform = Platform::Meta;
        let (client_id, client_secret) = self.credentials(platform)?;
        let redirect_uri = self.config.redirect_uri(platform);

        let short_lived: AccessTokenResponse = self
            .send_json(
                platform,
                ExchangeStep::CodeExchange,
                self.http.get(self.graph_url("oauth/access_token")).query(&[
                    ("client_id", client_id),
                    ("redirect_uri", redirect_uri.as_str()),
                    ("client_secret", client_secret),
                    ("code", code),
                ]),
            )
            .await?;

        let long_lived: AccessTokenResponse = self
            .send_json(
                platform,
                ExchangeStep::LongLivedToken,
                self.http.get(self.graph_url("oauth/access_token")).query(&[
                    ("grant_type", "fb_exchange_token"),
                    ("client_id", client_id),
                    ("client_secret", client_secret),
                    ("fb_exchange_token", short_lived.access_token.as_str()),
                ]),
            )
            .await?;

        let pages: PageList = self
            .send_json(
                platform,
                ExchangeStep::PageLookup,
                self.http.get(self.graph_url("me/accounts")).query(&[
                    ("fields", "id,name,access_token,instagram_business_account"),
                    ("access_token", long_lived.access_token.as_str()),
                ]),
            )
            .await?;

        let page_count = pages.data.len();
        // No page picker: the first page the Graph returns is the connected one.
        let page = pages
            .data
            .into_iter()
            .next()
            .ok_or(MissingResource::NoPageFound)?;
        if page_count > 1 {
            tracing::info!(
                page_id = %page.id,
                page_count,
                "account manages several pages, connecting the first"
            );
        }

        let linked = match &page.instagram_business_account {
            Some(account) => match self
                .fetch_photo_account(&account.id, &page.access_token)
                .await
            {
                Ok(found) => Some(found),
                Err(e) => {
                    // Best-effort: the page connection stands without it.
                    tracing::warn!(page_id = %page.id, "linked photo account lookup failed: {}", e);
                    None
                }
            },
            None => None,
        };

        let derived = linked.as_ref().map(|account| PlatformConnection {
            access_token: page.access_token.clone(),
            refresh_token: None,
            expires_at: None,
            token_variant: TokenVariant::NeverExpiringPage,
            provider_metadata: ProviderMetadata::MetaPhoto {
                account_id: account.id.clone(),
                username: account.username.clone(),
                page_id: page.id.clone(),
            },
            connected_at: now,
        });

        let primary = PlatformConnection {
            access_token: page.access_token,
            refresh_token: None,
            expires_at: None,
            token_variant: TokenVariant::NeverExpiringPage,
            provider_metadata: ProviderMetadata::Meta {
                page_id: page.id,
                page_name: page.name,
                linked_photo_account: linked,
            },
            connected_at: now,
        };

        Ok(ExchangeOutcome { primary, derived })
    }

    async fn fetch_photo_account(
        &self,
        account_id: &str,
        page_token: &str,
    ) -> Result<LinkedPhotoAccount, AppError> {
        let account: PhotoAccount = self
            .send_json(
                Platform::Meta,
                ExchangeStep::LinkedAccountLookup,
                self.http
                    .get(self.graph_url(account_id))
                    .query(&[("fields", "id,username"), ("access_token", page_token)]),
            )
            .await?;
        Ok(LinkedPhotoAccount {
            id: account.id,
            username: account.username,
        })
    }
}
