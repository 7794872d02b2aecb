use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};
use log::{debug, trace};
use num_bigint::BigInt;
use piece_accessor::interfaces::{MinerNode, SectorStatusProvider};
use piece_accessor::types::{
    parse_address, seal_proof_from_code, Address, ChainEpoch, DealRef, PaddedBytesAmount, Piece,
    PieceCid, SectorNumber, SectorStatus,
};
use reqwest::{blocking::Client, Proxy};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};

use crate::api_info::ApiInfo;

/// An error object returned by the node.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, thiserror::Error)]
#[error("{method} failed with rpc error {code}: {message}")]
pub struct RpcError {
    #[serde(default)]
    pub method: String,
    pub code: i64,
    pub message: String,
}

#[derive(Serialize)]
struct Request<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize)]
struct Response<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

/// JSON-RPC client for the storage node's `Filecoin.*` API.
#[derive(Debug)]
pub struct MinerRpcClient {
    info: ApiInfo,
    client: Client,
    next_id: AtomicU64,
}

impl MinerRpcClient {
    pub fn new(info: ApiInfo) -> Result<Self> {
        let client = Client::builder()
            .proxy(Proxy::custom(move |url| env_proxy::for_url(url).to_url()))
            .build()
            .context("failed to build rpc client")?;

        Ok(MinerRpcClient {
            info,
            client,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn api_info(&self) -> &ApiInfo {
        &self.info
    }

    fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let request = Request {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };
        trace!("rpc call {} to {}", method, self.info.url);

        let mut builder = self.client.post(self.info.url.clone()).json(&request);
        if let Some(token) = &self.info.token {
            builder = builder.bearer_auth(token);
        }

        let resp = builder
            .send()
            .with_context(|| format!("{} request failed", method))?
            .error_for_status()
            .with_context(|| format!("{} rejected", method))?;
        let resp: Response<T> = resp
            .json()
            .with_context(|| format!("invalid {} response", method))?;

        if let Some(mut err) = resp.error {
            err.method = method.to_string();
            return Err(err.into());
        }
        resp.result
            .with_context(|| format!("{} returned no result", method))
    }
}

impl SectorStatusProvider for MinerRpcClient {
    fn sectors_status(&self, sector: SectorNumber) -> Result<SectorStatus> {
        let info: SectorInfoJson =
            self.call("Filecoin.SectorsStatus", json!([sector, false]))?;
        debug!(
            "sector {} has {} pieces, proof {}",
            sector,
            info.pieces.len(),
            info.seal_proof
        );
        info.into_status()
    }
}

impl MinerNode for MinerRpcClient {
    fn actor_address(&self) -> Result<Address> {
        let address: String = self.call("Filecoin.ActorAddress", json!([]))?;
        Ok(parse_address(&address)?)
    }
}

/// A CID in its IPLD JSON form, `{"/": "<cid>"}`.
#[derive(Debug, Deserialize)]
struct CidJson {
    #[serde(rename = "/")]
    cid: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PieceJson {
    piece: PieceDataJson,
    deal_info: Option<DealInfoJson>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PieceDataJson {
    size: u64,
    #[serde(rename = "PieceCID")]
    piece_cid: CidJson,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DealInfoJson {
    #[serde(rename = "DealID")]
    deal_id: u64,
    deal_schedule: DealScheduleJson,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DealScheduleJson {
    start_epoch: ChainEpoch,
    end_epoch: ChainEpoch,
}

/// The subset of the node's sector info the recovery needs.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SectorInfoJson {
    #[serde(rename = "SectorID")]
    sector_id: SectorNumber,
    #[serde(default, deserialize_with = "null_as_empty")]
    pieces: Vec<PieceJson>,
    seal_proof: i64,
    #[serde(default)]
    activation: ChainEpoch,
    #[serde(default)]
    expiration: ChainEpoch,
    #[serde(default, deserialize_with = "big_int_string")]
    deal_weight: BigInt,
    #[serde(default, deserialize_with = "big_int_string")]
    verified_deal_weight: BigInt,
    #[serde(default, deserialize_with = "big_int_string")]
    initial_pledge: BigInt,
    #[serde(default)]
    on_time: ChainEpoch,
    #[serde(default)]
    early: ChainEpoch,
}

impl SectorInfoJson {
    fn into_status(self) -> Result<SectorStatus> {
        let seal_proof = seal_proof_from_code(self.seal_proof)?;
        let pieces = self
            .pieces
            .into_iter()
            .map(|p| {
                let piece_cid: PieceCid = p.piece.piece_cid.cid.parse()?;
                Ok(Piece {
                    piece_cid,
                    size: PaddedBytesAmount(p.piece.size),
                    deal: p.deal_info.map(|d| DealRef {
                        deal_id: d.deal_id,
                        start_epoch: d.deal_schedule.start_epoch,
                        end_epoch: d.deal_schedule.end_epoch,
                    }),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut status = SectorStatus::new(self.sector_id, seal_proof, pieces);
        status.activation = self.activation;
        status.expiration = self.expiration;
        status.deal_weight = self.deal_weight;
        status.verified_deal_weight = self.verified_deal_weight;
        status.initial_pledge = self.initial_pledge;
        status.on_time = self.on_time;
        status.early = self.early;
        Ok(status)
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Token amounts and weights travel as decimal strings.
fn big_int_string<'de, D>(deserializer: D) -> std::result::Result<BigInt, D::Error>
where
    D: Deserializer<'de>,
{
    let s = Option::<String>::deserialize(deserializer)?;
    match s.as_deref() {
        None | Some("") => Ok(BigInt::default()),
        Some(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use piece_accessor::types::RegisteredSealProof;
    use pretty_assertions::assert_eq;

    #[test]
    fn decodes_sector_info() {
        let raw = json!({
            "SectorID": 7,
            "State": "Proving",
            "Pieces": [{
                "Piece": {
                    "Size": 2048,
                    "PieceCID": {"/": "baga6ea4seaqpbejbvomw3krehmpfre3he62xiz3exk45on46s5ixiunxqn2ocbq"}
                },
                "DealInfo": {
                    "DealID": 42,
                    "DealSchedule": {"StartEpoch": 10, "EndEpoch": 20}
                }
            }],
            "SealProof": 8,
            "Activation": 100,
            "Expiration": 200,
            "DealWeight": "123456789012345678901234567890",
            "VerifiedDealWeight": "0",
            "InitialPledge": "5",
            "OnTime": 0,
            "Early": 0
        });

        let info: SectorInfoJson = serde_json::from_value(raw).expect("valid sector info");
        let status = info.into_status().expect("known proof");

        assert_eq!(status.sector, 7);
        assert_eq!(status.seal_proof, RegisteredSealProof::StackedDRG32GiBV1P1);
        assert_eq!(status.pieces.len(), 1);
        assert_eq!(status.pieces[0].size, PaddedBytesAmount(2048));
        assert_eq!(
            status.pieces[0].deal,
            Some(DealRef {
                deal_id: 42,
                start_epoch: 10,
                end_epoch: 20
            })
        );
        assert_eq!(
            status.deal_weight.to_string(),
            "123456789012345678901234567890"
        );
        assert_eq!(status.initial_pledge, BigInt::from(5));
    }

    #[test]
    fn null_pieces_are_empty() {
        let raw = json!({"SectorID": 1, "Pieces": null, "SealProof": 5});
        let info: SectorInfoJson = serde_json::from_value(raw).expect("valid sector info");
        let status = info.into_status().expect("known proof");
        assert!(status.pieces.is_empty());
        assert_eq!(status.seal_proof, RegisteredSealProof::StackedDRG2KiBV1P1);
    }

    #[test]
    fn unknown_proof_is_rejected() {
        let raw = json!({"SectorID": 1, "SealProof": 99});
        let info: SectorInfoJson = serde_json::from_value(raw).expect("valid sector info");
        assert!(info.into_status().is_err());
    }
}
