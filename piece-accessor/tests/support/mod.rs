#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use num_bigint::BigInt;
use piece_accessor::interfaces::{
    MinerNode, PieceStore, SealingPipeline, SectorStatusProvider, StateOracle,
};
use piece_accessor::types::{
    parse_address, Address, DealInfo, OnChainSectorInfo, PaddedBytesAmount, Piece, PieceCid, PieceInfo,
    PieceStoreInfo, RegisteredSealProof, SectorExpiration, SectorNumber, SectorRef, SectorStatus,
    UnpaddedBytesAmount,
};
use rand::{Rng, SeedableRng};
use rand_xorshift::XorShiftRng;

pub const TEST_SEED: [u8; 16] = [
    0x59, 0x62, 0xbe, 0x5d, 0x76, 0x3d, 0x31, 0x8d, 0x17, 0xdb, 0x37, 0x32, 0x54, 0x06, 0xbc, 0xe5,
];

pub const PIECE_CIDS: [&str; 3] = [
    "baga6ea4seaqpbejbvomw3krehmpfre3he62xiz3exk45on46s5ixiunxqn2ocbq",
    "baga6ea4seaqmvf4bclfbxpok7lbddm42epoe3j4g574bi7cook4ya54fv7xeqoy",
    "baga6ea4seaqd4i7icyadswkkgoeu6zle4gytjc55piairvbmjlfxh3vo2woaahi",
];

pub const MINER: &str = "t01000";

pub fn piece_cid(i: usize) -> PieceCid {
    PIECE_CIDS[i].parse().expect("valid piece cid")
}

pub fn piece(i: usize) -> Piece {
    Piece {
        piece_cid: piece_cid(i),
        size: PaddedBytesAmount(1024),
        deal: None,
    }
}

pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut rng = XorShiftRng::from_seed(TEST_SEED);
    (0..len).map(|_| rng.gen()).collect()
}

/// Local sector state held in memory.
#[derive(Default)]
pub struct MemorySectors {
    pub sectors: HashMap<SectorNumber, SectorStatus>,
    pub address: Option<String>,
}

impl MemorySectors {
    pub fn with_sector(
        mut self,
        number: SectorNumber,
        proof: RegisteredSealProof,
        pieces: Vec<Piece>,
    ) -> Self {
        self.sectors
            .insert(number, SectorStatus::new(number, proof, pieces));
        self
    }

    pub fn with_address(mut self, address: &str) -> Self {
        self.address = Some(address.to_string());
        self
    }
}

impl SectorStatusProvider for MemorySectors {
    fn sectors_status(&self, sector: SectorNumber) -> Result<SectorStatus> {
        self.sectors
            .get(&sector)
            .cloned()
            .ok_or_else(|| anyhow!("sector {} not found", sector))
    }
}

impl MinerNode for MemorySectors {
    fn actor_address(&self) -> Result<Address> {
        let address = self
            .address
            .as_deref()
            .ok_or_else(|| anyhow!("node has no actor address"))?;
        Ok(parse_address(address)?)
    }
}

/// What the oracle answers for every sector.
pub enum OracleBehaviour {
    Unreachable,
    NotOnChain,
    Known {
        info: OnChainSectorInfo,
        expiration: Option<SectorExpiration>,
    },
}

pub struct StubOracle(pub OracleBehaviour);

impl StubOracle {
    pub fn unreachable() -> Arc<Self> {
        Arc::new(StubOracle(OracleBehaviour::Unreachable))
    }
}

pub fn on_chain_info() -> OnChainSectorInfo {
    OnChainSectorInfo {
        seal_proof: RegisteredSealProof::StackedDRG2KiBV1P1,
        activation: 100,
        expiration: 5000,
        deal_weight: BigInt::from(7),
        verified_deal_weight: BigInt::from(11),
        initial_pledge: BigInt::from(1_000_000),
    }
}

impl StateOracle for StubOracle {
    fn sector_info(
        &self,
        _miner: &Address,
        _sector: SectorNumber,
    ) -> Result<Option<OnChainSectorInfo>> {
        match &self.0 {
            OracleBehaviour::Unreachable => Err(anyhow!("chain node unreachable")),
            OracleBehaviour::NotOnChain => Ok(None),
            OracleBehaviour::Known { info, .. } => Ok(Some(info.clone())),
        }
    }

    fn sector_expiration(
        &self,
        _miner: &Address,
        _sector: SectorNumber,
    ) -> Result<SectorExpiration> {
        match &self.0 {
            OracleBehaviour::Known {
                expiration: Some(expiration),
                ..
            } => Ok(*expiration),
            _ => Err(anyhow!("expiration lookup failed")),
        }
    }
}

#[derive(Default)]
pub struct MemoryPieceStore {
    pub pieces: HashMap<PieceCid, PieceStoreInfo>,
}

impl MemoryPieceStore {
    pub fn with_deals(mut self, piece_cid: PieceCid, lengths: &[u64]) -> Self {
        let deals = lengths
            .iter()
            .enumerate()
            .map(|(i, &length)| DealInfo {
                deal_id: i as u64,
                sector: i as SectorNumber,
                offset: PaddedBytesAmount(0),
                length: PaddedBytesAmount(length),
            })
            .collect();
        self.pieces
            .insert(piece_cid, PieceStoreInfo { piece_cid, deals });
        self
    }
}

impl PieceStore for MemoryPieceStore {
    fn get_piece_info(&self, piece_cid: &PieceCid) -> Result<PieceStoreInfo> {
        self.pieces
            .get(piece_cid)
            .cloned()
            .ok_or_else(|| anyhow!("piece {} not indexed", piece_cid))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddPieceCall {
    pub root: PathBuf,
    pub sector: SectorRef,
    pub existing_piece_sizes: Vec<UnpaddedBytesAmount>,
    pub piece_size: UnpaddedBytesAmount,
    pub data: Vec<u8>,
}

/// Records every `add_piece` call and answers with a fixed commitment.
#[derive(Clone)]
pub struct RecordingSealer {
    pub root: PathBuf,
    pub calls: Arc<Mutex<Vec<AddPieceCall>>>,
    pub answer: PieceCid,
    pub fail: bool,
}

impl RecordingSealer {
    pub fn factory(
        calls: Arc<Mutex<Vec<AddPieceCall>>>,
        answer: PieceCid,
        fail: bool,
    ) -> impl Fn(&Path) -> Result<RecordingSealer> {
        move |root: &Path| {
            Ok(RecordingSealer {
                root: root.to_path_buf(),
                calls: Arc::clone(&calls),
                answer,
                fail,
            })
        }
    }
}

impl SealingPipeline for RecordingSealer {
    fn add_piece(
        &self,
        sector: &SectorRef,
        existing_piece_sizes: &[UnpaddedBytesAmount],
        piece_size: UnpaddedBytesAmount,
        source: &mut dyn Read,
    ) -> Result<PieceInfo> {
        let mut data = Vec::new();
        source.read_to_end(&mut data)?;

        self.calls.lock().expect("lock poisoned").push(AddPieceCall {
            root: self.root.clone(),
            sector: *sector,
            existing_piece_sizes: existing_piece_sizes.to_vec(),
            piece_size,
            data,
        });

        if self.fail {
            return Err(anyhow!("sealer rejected the piece"));
        }
        Ok(PieceInfo {
            piece_cid: self.answer,
            size: piece_size.into(),
        })
    }
}
