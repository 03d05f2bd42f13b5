//! Swap aggregator client
//!
//! Two-step flow against the Odos router API: quote a single-input,
//! single-output swap, then assemble the quoted path into calldata for the
//! router. Quote and assembly failures are soft by design: the venue returns
//! `Ok(None)` for anything that just means "no swap this round" (bad status,
//! transport error, malformed payload) so the caller can skip the token and
//! move on. Only programming errors surface as `Err`.

use crate::throttle::Throttle;
use crate::{Error, Result};
use alloy::primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A priced swap path, valid for a short window
#[derive(Debug, Clone)]
pub struct SwapQuote {
    pub path_id: String,
    pub out_amount: U256,
    pub gas_estimate: u64,
    pub out_value_usd: f64,
}

/// Router calldata assembled from a quote
#[derive(Debug, Clone)]
pub struct AssembledSwap {
    /// Router contract to call and to grant the input allowance to
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
    /// Venue's gas estimate for the call, before any safety margin
    pub gas: u64,
}

/// A venue that prices and assembles swaps
#[async_trait]
pub trait SwapVenue: Send + Sync {
    /// Price `amount_in` of `token_in` against `token_out`.
    /// `None` means no usable quote this round.
    async fn quote(
        &self,
        trader: Address,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
    ) -> Result<Option<SwapQuote>>;

    /// Turn a quote into router calldata. `None` means the path expired or
    /// the venue declined; the caller skips the swap.
    async fn assemble(&self, quote: &SwapQuote, trader: Address) -> Result<Option<AssembledSwap>>;
}

// Wire format of the aggregator API

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QuoteRequest {
    chain_id: u64,
    input_tokens: Vec<TokenAmount>,
    output_tokens: Vec<TokenProportion>,
    user_addr: String,
    slippage_limit_percent: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenAmount {
    token_address: String,
    amount: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenProportion {
    token_address: String,
    proportion: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteResponse {
    path_id: String,
    out_amounts: Vec<String>,
    gas_estimate: f64,
    out_values: Vec<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AssembleRequest {
    user_addr: String,
    path_id: String,
    simulate: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssembleResponse {
    transaction: AssembledTx,
}

#[derive(Debug, Deserialize)]
struct AssembledTx {
    to: String,
    data: String,
    value: String,
    gas: u64,
}

impl TryFrom<QuoteResponse> for SwapQuote {
    type Error = Error;

    fn try_from(raw: QuoteResponse) -> Result<Self> {
        let out_amount = raw
            .out_amounts
            .first()
            .ok_or_else(|| Error::Aggregator("quote has no output amounts".to_string()))?;
        let out_amount = U256::from_str(out_amount)
            .map_err(|e| Error::Aggregator(format!("bad output amount: {}", e)))?;

        Ok(SwapQuote {
            path_id: raw.path_id,
            out_amount,
            gas_estimate: raw.gas_estimate as u64,
            out_value_usd: raw.out_values.first().copied().unwrap_or(0.0),
        })
    }
}

impl TryFrom<AssembledTx> for AssembledSwap {
    type Error = Error;

    fn try_from(raw: AssembledTx) -> Result<Self> {
        let to = Address::from_str(&raw.to)
            .map_err(|e| Error::Aggregator(format!("bad router address: {}", e)))?;
        let data = Bytes::from_str(&raw.data)
            .map_err(|e| Error::Aggregator(format!("bad calldata: {}", e)))?;
        let value = U256::from_str(&raw.value)
            .map_err(|e| Error::Aggregator(format!("bad call value: {}", e)))?;

        Ok(AssembledSwap {
            to,
            data,
            value,
            gas: raw.gas,
        })
    }
}

/// Odos smart order router
pub struct OdosApi {
    http: reqwest::Client,
    base_url: String,
    chain_id: u64,
    slippage_percent: f64,
    throttle: Throttle,
}

impl OdosApi {
    pub fn new(base_url: &str, chain_id: u64, slippage_percent: f64, throttle: Throttle) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            chain_id,
            slippage_percent,
            throttle,
        }
    }
}

#[async_trait]
impl SwapVenue for OdosApi {
    async fn quote(
        &self,
        trader: Address,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
    ) -> Result<Option<SwapQuote>> {
        let request = QuoteRequest {
            chain_id: self.chain_id,
            input_tokens: vec![TokenAmount {
                token_address: token_in.to_string(),
                amount: amount_in.to_string(),
            }],
            output_tokens: vec![TokenProportion {
                token_address: token_out.to_string(),
                proportion: 1.0,
            }],
            user_addr: trader.to_string(),
            slippage_limit_percent: self.slippage_percent,
        };

        self.throttle.acquire().await;
        let response = match self
            .http
            .post(format!("{}/quote/v2", self.base_url))
            .json(&request)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(%token_in, error = %e, "quote request failed");
                return Ok(None);
            }
        };

        if !response.status().is_success() {
            tracing::warn!(%token_in, status = %response.status(), "quote rejected");
            return Ok(None);
        }

        let raw: QuoteResponse = match response.json().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(%token_in, error = %e, "malformed quote response");
                return Ok(None);
            }
        };

        match SwapQuote::try_from(raw) {
            Ok(quote) => Ok(Some(quote)),
            Err(e) => {
                tracing::warn!(%token_in, error = %e, "unusable quote");
                Ok(None)
            }
        }
    }

    async fn assemble(&self, quote: &SwapQuote, trader: Address) -> Result<Option<AssembledSwap>> {
        let request = AssembleRequest {
            user_addr: trader.to_string(),
            path_id: quote.path_id.clone(),
            simulate: false,
        };

        self.throttle.acquire().await;
        let response = match self
            .http
            .post(format!("{}/assemble", self.base_url))
            .json(&request)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(path_id = %quote.path_id, error = %e, "assemble request failed");
                return Ok(None);
            }
        };

        if !response.status().is_success() {
            tracing::warn!(path_id = %quote.path_id, status = %response.status(), "assemble rejected");
            return Ok(None);
        }

        let raw: AssembleResponse = match response.json().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(path_id = %quote.path_id, error = %e, "malformed assemble response");
                return Ok(None);
            }
        };

        match AssembledSwap::try_from(raw.transaction) {
            Ok(assembled) => Ok(Some(assembled)),
            Err(e) => {
                tracing::warn!(path_id = %quote.path_id, error = %e, "unusable assembly");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    #[test]
    fn test_quote_response_conversion() {
        let json = r#"{
            "pathId": "abc123",
            "outAmounts": ["123456789"],
            "gasEstimate": 250000.7,
            "outValues": [123.45]
        }"#;
        let raw: QuoteResponse = serde_json::from_str(json).unwrap();
        let quote = SwapQuote::try_from(raw).unwrap();

        assert_eq!(quote.path_id, "abc123");
        assert_eq!(quote.out_amount, U256::from(123_456_789u64));
        assert_eq!(quote.gas_estimate, 250_000);
        assert!((quote.out_value_usd - 123.45).abs() < f64::EPSILON);
    }

    #[test]
    fn test_quote_without_outputs_is_rejected() {
        let raw = QuoteResponse {
            path_id: "x".to_string(),
            out_amounts: vec![],
            gas_estimate: 0.0,
            out_values: vec![],
        };
        assert!(matches!(
            SwapQuote::try_from(raw),
            Err(Error::Aggregator(_))
        ));
    }

    #[test]
    fn test_assemble_response_conversion() {
        let json = r#"{
            "transaction": {
                "to": "0xCf5540fFFCdC3d510B18bFcA6d2b9987b0772559",
                "data": "0xdeadbeef",
                "value": "0",
                "gas": 300000
            }
        }"#;
        let raw: AssembleResponse = serde_json::from_str(json).unwrap();
        let assembled = AssembledSwap::try_from(raw.transaction).unwrap();

        assert_eq!(
            assembled.to,
            address!("Cf5540fFFCdC3d510B18bFcA6d2b9987b0772559")
        );
        assert_eq!(assembled.data.as_ref(), &[0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(assembled.value, U256::ZERO);
        assert_eq!(assembled.gas, 300_000);
    }

    #[test]
    fn test_quote_request_wire_shape() {
        let request = QuoteRequest {
            chain_id: 8453,
            input_tokens: vec![TokenAmount {
                token_address: "0xA88594D404727625A9437C3f886C7643872296AE".to_string(),
                amount: "1000".to_string(),
            }],
            output_tokens: vec![TokenProportion {
                token_address: "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913".to_string(),
                proportion: 1.0,
            }],
            user_addr: "0x2000000000000000000000000000000000000002".to_string(),
            slippage_limit_percent: 1.0,
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["chainId"], 8453);
        assert_eq!(value["inputTokens"][0]["amount"], "1000");
        assert_eq!(value["outputTokens"][0]["proportion"], 1.0);
        assert_eq!(value["slippageLimitPercent"], 1.0);
    }
}
