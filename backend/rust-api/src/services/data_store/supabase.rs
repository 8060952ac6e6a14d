use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::{de::DeserializeOwned, Serialize};
use url::Url;

use super::{DataStore, StoreResult};
use crate::config::SupabaseConfig;
use crate::error::BackendError;
use crate::metrics::track_store_operation;
use crate::models::{
    attempt::{AttemptPatch, AttemptRecord, NewAttempt},
    competition::{CompetitionSettings, CompetitionWindow},
    puzzle::Puzzle,
    user::{NewProfile, Profile},
};

const COMPETITION_SETTINGS: &str = "competition_settings";
const PUZZLES: &str = "puzzles";
const ATTEMPTS: &str = "user_puzzle_attempts";
const PROFILES: &str = "profiles";

/// PostgREST client authenticated with the service-role key.
///
/// Filters use PostgREST operator syntax (`column=eq.value`).
#[derive(Clone)]
pub struct SupabaseStore {
    http: Client,
    rest_url: Url,
    service_role_key: String,
}

impl SupabaseStore {
    pub fn new(config: &SupabaseConfig) -> Result<Self, BackendError> {
        let rest_url = Url::parse(&format!("{}/rest/v1/", config.url))
            .map_err(|e| BackendError::Unknown(format!("Invalid Supabase URL: {}", e)))?;

        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| BackendError::Unknown(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            rest_url,
            service_role_key: config.service_role_key.clone(),
        })
    }

    fn table_url(&self, table: &str, query: &[(&str, String)]) -> StoreResult<Url> {
        let mut url = self
            .rest_url
            .join(table)
            .map_err(|e| BackendError::Unknown(format!("Invalid table path {}: {}", table, e)))?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http
            .request(method, url)
            .header("apikey", &self.service_role_key)
            .bearer_auth(&self.service_role_key)
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> StoreResult<Vec<T>> {
        let url = self.table_url(table, query)?;
        let response = self.request(Method::GET, url).send().await?;
        if !response.status().is_success() {
            return Err(BackendError::from_response(response).await);
        }
        Ok(response.json::<Vec<T>>().await?)
    }

    async fn select_one<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> StoreResult<Option<T>> {
        let mut query = query.to_vec();
        query.push(("limit", "1".to_string()));
        Ok(self.select(table, &query).await?.into_iter().next())
    }

    async fn write<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        table: &str,
        query: &[(&str, String)],
        body: &B,
    ) -> StoreResult<T> {
        let url = self.table_url(table, query)?;
        let response = self
            .request(method, url)
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(BackendError::from_response(response).await);
        }

        // PostgREST answers writes with an array of affected rows
        let rows: Vec<T> = response.json().await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| BackendError::NotFound(format!("No {} row was affected", table)))
    }
}

fn eq(value: impl ToString) -> String {
    format!("eq.{}", value.to_string())
}

#[async_trait]
impl DataStore for SupabaseStore {
    async fn ping(&self) -> StoreResult<()> {
        track_store_operation("ping", PUZZLES, async {
            self.select::<serde_json::Value>(PUZZLES, &[("select", "id".into()), ("limit", "1".into())])
                .await
                .map(|_| ())
        })
        .await
    }

    async fn active_competition_window(&self) -> StoreResult<Option<CompetitionWindow>> {
        track_store_operation("select", COMPETITION_SETTINGS, async {
            let settings: Option<CompetitionSettings> = self
                .select_one(
                    COMPETITION_SETTINGS,
                    &[("select", "*".into()), ("is_active", eq(true))],
                )
                .await?;
            Ok(settings.map(CompetitionWindow::from))
        })
        .await
    }

    async fn list_active_puzzles(&self) -> StoreResult<Vec<Puzzle>> {
        track_store_operation("select", PUZZLES, async {
            self.select(
                PUZZLES,
                &[
                    ("select", "*".into()),
                    ("is_active", eq(true)),
                    ("order", "id.asc".into()),
                ],
            )
            .await
        })
        .await
    }

    async fn get_puzzle(&self, puzzle_id: i64) -> StoreResult<Option<Puzzle>> {
        track_store_operation("select_one", PUZZLES, async {
            self.select_one(
                PUZZLES,
                &[
                    ("select", "*".into()),
                    ("id", eq(puzzle_id)),
                    ("is_active", eq(true)),
                ],
            )
            .await
        })
        .await
    }

    async fn list_attempts(&self, user_id: &str) -> StoreResult<Vec<AttemptRecord>> {
        track_store_operation("select", ATTEMPTS, async {
            self.select(ATTEMPTS, &[("select", "*".into()), ("user_id", eq(user_id))])
                .await
        })
        .await
    }

    async fn find_attempt(
        &self,
        user_id: &str,
        puzzle_id: i64,
    ) -> StoreResult<Option<AttemptRecord>> {
        track_store_operation("select_one", ATTEMPTS, async {
            self.select_one(
                ATTEMPTS,
                &[
                    ("select", "*".into()),
                    ("user_id", eq(user_id)),
                    ("puzzle_id", eq(puzzle_id)),
                ],
            )
            .await
        })
        .await
    }

    async fn insert_attempt(&self, attempt: NewAttempt) -> StoreResult<AttemptRecord> {
        track_store_operation("insert", ATTEMPTS, async {
            self.write(Method::POST, ATTEMPTS, &[], &attempt).await
        })
        .await
    }

    async fn update_attempt(
        &self,
        attempt_id: i64,
        patch: AttemptPatch,
    ) -> StoreResult<AttemptRecord> {
        track_store_operation("update", ATTEMPTS, async {
            self.write(Method::PATCH, ATTEMPTS, &[("id", eq(attempt_id))], &patch)
                .await
        })
        .await
    }

    async fn get_profile(&self, user_id: &str) -> StoreResult<Option<Profile>> {
        track_store_operation("select_one", PROFILES, async {
            self.select_one(PROFILES, &[("select", "*".into()), ("id", eq(user_id))])
                .await
        })
        .await
    }

    async fn insert_profile(&self, profile: NewProfile) -> StoreResult<Profile> {
        track_store_operation("insert", PROFILES, async {
            self.write(Method::POST, PROFILES, &[], &profile).await
        })
        .await
    }

    async fn list_profiles(&self) -> StoreResult<Vec<Profile>> {
        track_store_operation("select", PROFILES, async {
            self.select(
                PROFILES,
                &[("select", "*".into()), ("order", "created_at.desc".into())],
            )
            .await
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SupabaseStore {
        SupabaseStore::new(&SupabaseConfig {
            url: "https://project.supabase.co".to_string(),
            anon_key: "anon".to_string(),
            service_role_key: "service".to_string(),
            request_timeout_seconds: 5,
        })
        .unwrap()
    }

    #[test]
    fn table_urls_use_postgrest_filters() {
        let url = store()
            .table_url(
                ATTEMPTS,
                &[("user_id", eq("abc")), ("puzzle_id", eq(3))],
            )
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://project.supabase.co/rest/v1/user_puzzle_attempts?user_id=eq.abc&puzzle_id=eq.3"
        );
    }

    #[test]
    fn filter_values_are_encoded() {
        let url = store()
            .table_url(PROFILES, &[("id", eq("a b&c"))])
            .unwrap();
        assert!(url.as_str().ends_with("profiles?id=eq.a+b%26c"));
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let result = SupabaseStore::new(&SupabaseConfig {
            url: "not a url".to_string(),
            anon_key: String::new(),
            service_role_key: String::new(),
            request_timeout_seconds: 5,
        });
        assert!(result.is_err());
    }
}
