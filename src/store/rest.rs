//! PostgREST (Supabase) backed store.

use super::{MarketResult, MarketStore, RechargeRecord, RewardTransaction, UserPosition};
use crate::error::{Error, Result};
use crate::market::{Market, MarketStatus};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Method, RequestBuilder, Response};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

const MARKETS: &str = "markets";
const POSITIONS: &str = "user_positions";
const BALANCES: &str = "user_balances";
const TRANSACTIONS: &str = "reward_transactions";
const RECHARGES: &str = "wallet_recharges";

#[derive(Debug, Deserialize)]
struct BalanceRow {
    balance: Decimal,
}

#[derive(Debug, Deserialize)]
struct RechargeRow {
    #[serde(default)]
    credited_amount: Option<Decimal>,
}

/// Store backed by a PostgREST endpoint.
pub struct RestStore {
    client: Client,
    base_url: String,
    api_key: String,
}

impl RestStore {
    pub fn new(base_url: &str, api_key: &str, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        self.client
            .request(method, self.table_url(table))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    fn upsert(&self, table: &str, on_conflict: &str) -> RequestBuilder {
        self.request(Method::POST, table)
            .query(&[("on_conflict", on_conflict)])
            .header("Prefer", "resolution=merge-duplicates")
    }

    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(Error::database(format!("{}: {}", status, body)))
        }
    }
}

#[async_trait]
impl MarketStore for RestStore {
    async fn latest_market(&self) -> Result<Option<Market>> {
        let response = self
            .request(Method::GET, MARKETS)
            .query(&[
                ("select", "id,question,created_at,status"),
                ("order", "id.desc"),
                ("limit", "1"),
            ])
            .send()
            .await?;
        let rows: Vec<Market> = Self::check(response).await?.json().await?;
        Ok(rows.into_iter().next())
    }

    async fn upsert_position(&self, position: &UserPosition) -> Result<()> {
        let response = self
            .upsert(POSITIONS, "market_id,user_address")
            .json(&[position])
            .send()
            .await?;
        Self::check(response).await?;
        debug!(
            "Stored position for {} on market {}",
            position.user_address, position.market_id
        );
        Ok(())
    }

    async fn record_result(&self, result: &MarketResult) -> Result<()> {
        let id_filter = format!("eq.{}", result.market_id);
        let response = self
            .request(Method::PATCH, MARKETS)
            .query(&[("id", id_filter.as_str())])
            .json(&json!({
                "yes_votes": result.yes_votes,
                "no_votes": result.no_votes,
                "winning_side": result.winning_side,
                "status": MarketStatus::Closed,
            }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn balance(&self, identity: &str) -> Result<Decimal> {
        let filter = format!("eq.{}", identity);
        let response = self
            .request(Method::GET, BALANCES)
            .query(&[("select", "balance"), ("user_address", filter.as_str())])
            .send()
            .await?;
        let rows: Vec<BalanceRow> = Self::check(response).await?.json().await?;
        Ok(rows.first().map(|r| r.balance).unwrap_or_default())
    }

    async fn set_balance(&self, identity: &str, balance: Decimal) -> Result<()> {
        let response = self
            .upsert(BALANCES, "user_address")
            .json(&[json!({
                "user_address": identity,
                "balance": balance,
                "updated_at": Utc::now(),
            })])
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn append_transaction(&self, transaction: &RewardTransaction) -> Result<()> {
        let response = self
            .request(Method::POST, TRANSACTIONS)
            .json(&[transaction])
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn credited_recharges(&self, identity: &str) -> Result<Decimal> {
        let filter = format!("eq.{}", identity);
        let response = self
            .request(Method::GET, RECHARGES)
            .query(&[("select", "credited_amount"), ("user_address", filter.as_str())])
            .send()
            .await?;
        let rows: Vec<RechargeRow> = Self::check(response).await?.json().await?;
        Ok(rows.iter().filter_map(|r| r.credited_amount).sum())
    }

    async fn insert_recharge(&self, record: &RechargeRecord) -> Result<()> {
        let response = self
            .request(Method::POST, RECHARGES)
            .json(&[record])
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}
