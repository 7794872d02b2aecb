use httpmock::prelude::*;
use piece_accessor::interfaces::{MinerNode, SectorStatusProvider};
use piece_accessor::types::{actor_id, RegisteredSealProof};
use piece_recovery::{ApiInfo, MinerRpcClient, RpcError};
use pretty_assertions::assert_eq;
use serde_json::json;

const PIECE_CID: &str = "baga6ea4seaqpbejbvomw3krehmpfre3he62xiz3exk45on46s5ixiunxqn2ocbq";

fn client(server: &MockServer) -> MinerRpcClient {
    let info: ApiInfo = format!("secret-token:{}", server.base_url())
        .parse()
        .expect("valid api info");
    MinerRpcClient::new(info).expect("client builds")
}

#[test]
fn sectors_status_is_fetched_local_only() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/rpc/v0")
            .header("authorization", "Bearer secret-token")
            .json_body_partial(r#"{"method": "Filecoin.SectorsStatus", "params": [7, false]}"#);
        then.status(200).json_body(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": {
                "SectorID": 7,
                "Pieces": [{"Piece": {"Size": 2048, "PieceCID": {"/": PIECE_CID}}, "DealInfo": null}],
                "SealProof": 5,
                "DealWeight": "0",
                "VerifiedDealWeight": "0",
                "InitialPledge": "0"
            }
        }));
    });

    let status = client(&server)
        .sectors_status(7)
        .expect("sector status");

    mock.assert();
    assert_eq!(status.sector, 7);
    assert_eq!(status.seal_proof, RegisteredSealProof::StackedDRG2KiBV1P1);
    assert_eq!(status.pieces[0].piece_cid.to_string(), PIECE_CID);
    assert_eq!(status.pieces[0].deal, None);
}

#[test]
fn actor_address_resolves_to_an_id() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST)
            .path("/rpc/v0")
            .json_body_partial(r#"{"method": "Filecoin.ActorAddress"}"#);
        then.status(200)
            .json_body(json!({"jsonrpc": "2.0", "id": 1, "result": "f01000"}));
    });

    let address = client(&server).actor_address().expect("actor address");
    assert_eq!(actor_id(&address).expect("id address"), 1000);
}

#[test]
fn rpc_errors_surface() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/rpc/v0");
        then.status(200).json_body(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": {"code": 1, "message": "sector not found"}
        }));
    });

    let err = client(&server)
        .sectors_status(9)
        .expect_err("rpc error");
    let rpc = err.downcast_ref::<RpcError>().expect("an rpc error");
    assert_eq!(rpc.method, "Filecoin.SectorsStatus");
    assert_eq!(rpc.message, "sector not found");
}

#[test]
fn http_failures_surface() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST);
        then.status(401);
    });

    assert!(client(&server).actor_address().is_err());
}
