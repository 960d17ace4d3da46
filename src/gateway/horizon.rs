//! Horizon HTTP API client.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::Settings;
use crate::domain::{
    AccountId, AccountSnapshot, Asset, BalanceId, BalanceLine, ClaimableBalance, Network,
    TransactionSummary, parse_stroops,
};

use super::{GatewayError, GatewayResult, LedgerGateway, ResultCodes};

/// Async client for the Horizon query/submission API.
pub struct HorizonGateway {
    settings: Settings,
    client: reqwest::Client,
}

impl HorizonGateway {
    pub fn new(settings: Settings) -> GatewayResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.http_timeout)
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        Ok(Self { settings, client })
    }

    fn url(&self, network: Network, path: &str) -> String {
        format!("{}{}", self.settings.horizon_url(network), path)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, subject: &str) -> GatewayResult<T> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        debug!(url, status = %response.status(), "horizon query");

        match response.status() {
            status if status.is_success() => response
                .json()
                .await
                .map_err(|e| GatewayError::UnexpectedResponse(e.to_string())),
            StatusCode::NOT_FOUND => Err(GatewayError::NotFound(subject.to_string())),
            _ => Err(error_from_response(response).await),
        }
    }
}

#[async_trait]
impl LedgerGateway for HorizonGateway {
    async fn load_account(
        &self,
        network: Network,
        account: &AccountId,
    ) -> GatewayResult<AccountSnapshot> {
        let url = self.url(network, &format!("/accounts/{}", account));
        let raw: RawAccount = self
            .get_json(&url, &format!("account {}", account))
            .await?;
        raw.normalize(account)
    }

    async fn load_claimable_balance(
        &self,
        network: Network,
        balance_id: &BalanceId,
    ) -> GatewayResult<ClaimableBalance> {
        let url = self.url(network, &format!("/claimable_balances/{}", balance_id));
        let raw: RawClaimableBalance = self
            .get_json(&url, &format!("claimable balance {}", balance_id.short()))
            .await?;
        raw.normalize()
    }

    async fn list_claimable_balances(
        &self,
        network: Network,
        claimant: &AccountId,
        limit: u32,
    ) -> GatewayResult<Vec<ClaimableBalance>> {
        let url = self.url(
            network,
            &format!("/claimable_balances?claimant={}&limit={}", claimant, limit),
        );
        let page: Page<RawClaimableBalance> = self
            .get_json(&url, &format!("claimable balances for {}", claimant))
            .await?;
        page.into_records()
            .into_iter()
            .map(RawClaimableBalance::normalize)
            .collect()
    }

    async fn list_transactions(
        &self,
        network: Network,
        account: &AccountId,
        limit: u32,
    ) -> GatewayResult<Vec<TransactionSummary>> {
        let url = self.url(
            network,
            &format!("/accounts/{}/transactions?limit={}&order=desc", account, limit),
        );
        let page: Page<RawTransaction> = self
            .get_json(&url, &format!("account {}", account))
            .await?;
        Ok(page
            .into_records()
            .into_iter()
            .map(RawTransaction::normalize)
            .collect())
    }

    async fn submit(&self, network: Network, envelope_base64: &str) -> GatewayResult<String> {
        let url = self.url(network, "/transactions");
        let response = self
            .client
            .post(&url)
            .form(&[("tx", envelope_base64)])
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        debug!(url, status = %response.status(), "horizon submit");

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        #[derive(Deserialize)]
        struct Submitted {
            hash: String,
        }

        let submitted: Submitted = response
            .json()
            .await
            .map_err(|e| GatewayError::UnexpectedResponse(e.to_string()))?;
        Ok(submitted.hash)
    }
}

/// Map a non-success response to a gateway error. A problem document that
/// carries ledger result codes is a rejection; anything else is a transport failure.
async fn error_from_response(response: Response) -> GatewayError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();

    match serde_json::from_str::<Problem>(&body) {
        Ok(Problem {
            extras:
                Some(ProblemExtras {
                    result_codes: Some(codes),
                }),
            ..
        }) => GatewayError::Rejected(codes),
        Ok(problem) => GatewayError::Transport(format!(
            "HTTP {}: {}",
            status,
            problem
                .detail
                .or(problem.title)
                .unwrap_or_else(|| "no detail".to_string())
        )),
        Err(_) => GatewayError::Transport(format!("HTTP {}: {}", status, body)),
    }
}

#[derive(Debug, Deserialize)]
struct Problem {
    title: Option<String>,
    detail: Option<String>,
    extras: Option<ProblemExtras>,
}

#[derive(Debug, Deserialize)]
struct ProblemExtras {
    result_codes: Option<ResultCodes>,
}

/// A collection page. Records are usually under `_embedded.records`, some
/// deployments return a bare `records` array instead.
#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(rename = "_embedded")]
    embedded: Option<Embedded<T>>,
    records: Option<Vec<T>>,
}

#[derive(Debug, Deserialize)]
struct Embedded<T> {
    records: Vec<T>,
}

impl<T> Page<T> {
    fn into_records(self) -> Vec<T> {
        match (self.embedded, self.records) {
            (Some(embedded), _) => embedded.records,
            (None, Some(records)) => records,
            (None, None) => Vec::new(),
        }
    }
}

fn amount(raw: &str, field: &str) -> GatewayResult<i64> {
    parse_stroops(raw)
        .map_err(|e| GatewayError::UnexpectedResponse(format!("{} '{}': {}", field, raw, e)))
}

#[derive(Debug, Deserialize)]
struct RawAccount {
    sequence: String,
    #[serde(default)]
    balances: Vec<RawBalance>,
}

#[derive(Debug, Deserialize)]
struct RawBalance {
    balance: String,
    asset_type: String,
    asset_code: Option<String>,
    asset_issuer: Option<String>,
    limit: Option<String>,
}

impl RawAccount {
    fn normalize(self, account: &AccountId) -> GatewayResult<AccountSnapshot> {
        let sequence = self.sequence.parse().map_err(|_| {
            GatewayError::UnexpectedResponse(format!("sequence '{}'", self.sequence))
        })?;

        let mut balances = Vec::with_capacity(self.balances.len());
        for line in self.balances {
            let asset = match (line.asset_type.as_str(), &line.asset_code, &line.asset_issuer) {
                ("native", _, _) => Asset::Native,
                ("credit_alphanum4" | "credit_alphanum12", Some(code), Some(issuer)) => {
                    Asset::credit(code, issuer)
                        .map_err(|e| GatewayError::UnexpectedResponse(e.to_string()))?
                }
                // Liquidity pool shares are not trustlines this tool manages
                _ => continue,
            };
            balances.push(BalanceLine {
                asset,
                balance: amount(&line.balance, "balance")?,
                limit: line
                    .limit
                    .as_deref()
                    .map(|limit| amount(limit, "limit"))
                    .transpose()?,
            });
        }

        Ok(AccountSnapshot {
            account_id: account.clone(),
            sequence,
            balances,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawClaimableBalance {
    id: String,
    asset: String,
    amount: String,
    sponsor: Option<String>,
    #[serde(default, alias = "claimant_list")]
    claimants: Vec<RawClaimant>,
}

#[derive(Debug, Deserialize)]
struct RawClaimant {
    #[serde(alias = "account_id")]
    destination: String,
}

impl RawClaimableBalance {
    fn normalize(self) -> GatewayResult<ClaimableBalance> {
        let id = BalanceId::parse(&self.id)
            .map_err(|e| GatewayError::UnexpectedResponse(e.to_string()))?;
        let (asset, unrecognized_asset) = match Asset::parse(&self.asset) {
            Ok(asset) => (asset, None),
            Err(e) => {
                warn!(
                    balance = %id,
                    asset = %self.asset,
                    error = %e,
                    "unrecognized asset, treating as native"
                );
                (Asset::parse_lenient(&self.asset), Some(self.asset))
            }
        };
        Ok(ClaimableBalance {
            id,
            asset,
            amount: amount(&self.amount, "amount")?,
            sponsor: self.sponsor.and_then(|s| s.parse().ok()),
            claimants: self.claimants.into_iter().map(|c| c.destination).collect(),
            unrecognized_asset,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawTransaction {
    id: String,
    hash: String,
    created_at: DateTime<Utc>,
    source_account: String,
    operation_count: u32,
    successful: bool,
    memo: Option<String>,
}

impl RawTransaction {
    fn normalize(self) -> TransactionSummary {
        TransactionSummary {
            id: self.id,
            hash: self.hash,
            created_at: self.created_at,
            source_account: self.source_account,
            operation_count: self.operation_count,
            successful: self.successful,
            memo: self.memo.filter(|m| !m.is_empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ISSUER: &str = "GCFIRY65OQE7DFP5KLNS2PF2LVZMUZYJX4OZIEQ36N2IQANUB5XVYOJR";
    const BALANCE_ID: &str =
        "00000000da0d57da7d4850e7fc10d2a9d0ebc731f7afb40574c03395b17d49149b91f5be";

    #[test]
    fn test_page_reads_either_container() {
        let embedded: Page<RawClaimant> =
            serde_json::from_str(r#"{"_embedded":{"records":[{"destination":"a"}]}}"#).unwrap();
        assert_eq!(embedded.into_records().len(), 1);

        let bare: Page<RawClaimant> =
            serde_json::from_str(r#"{"records":[{"account_id":"a"},{"destination":"b"}]}"#)
                .unwrap();
        assert_eq!(bare.into_records().len(), 2);

        let empty: Page<RawClaimant> = serde_json::from_str("{}").unwrap();
        assert!(empty.into_records().is_empty());
    }

    #[test]
    fn test_account_normalization_skips_pool_shares() {
        let raw: RawAccount = serde_json::from_value(serde_json::json!({
            "sequence": "1234",
            "balances": [
                {"balance": "5.0000000", "limit": "1000.0000000", "asset_type": "credit_alphanum4",
                 "asset_code": "USD", "asset_issuer": ISSUER},
                {"balance": "1.0000000", "asset_type": "liquidity_pool_shares",
                 "liquidity_pool_id": "abcd"},
                {"balance": "20.5000000", "asset_type": "native"}
            ]
        }))
        .unwrap();
        let account: AccountId = ISSUER.parse().unwrap();
        let snapshot = raw.normalize(&account).unwrap();

        assert_eq!(snapshot.sequence, 1234);
        assert_eq!(snapshot.balances.len(), 2);
        assert_eq!(snapshot.balances[0].balance, 50_000_000);
        assert_eq!(snapshot.balances[0].limit, Some(10_000_000_000));
        assert_eq!(snapshot.balances[1].asset, Asset::Native);
    }

    #[test]
    fn test_claimable_balance_normalization() {
        let raw: RawClaimableBalance = serde_json::from_value(serde_json::json!({
            "id": BALANCE_ID,
            "asset": format!("USD:{}", ISSUER),
            "amount": "3.0000000",
            "sponsor": ISSUER,
            "claimants": [{"destination": ISSUER, "predicate": {"unconditional": true}}]
        }))
        .unwrap();
        let record = raw.normalize().unwrap();

        assert_eq!(record.amount, 30_000_000);
        assert_eq!(record.asset.code(), "USD");
        assert_eq!(record.sponsor.unwrap().as_str(), ISSUER);
        assert_eq!(record.claimants, vec![ISSUER.to_string()]);
    }

    #[test]
    fn test_malformed_record_asset_is_native() {
        let raw: RawClaimableBalance = serde_json::from_value(serde_json::json!({
            "id": BALANCE_ID,
            "asset": "???",
            "amount": "1.0000000"
        }))
        .unwrap();
        let record = raw.normalize().unwrap();
        assert!(record.asset.is_native());
        assert!(record.sponsor.is_none());
        assert!(record.claimants.is_empty());
    }
}
