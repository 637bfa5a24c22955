use crate::proto::abci::*;

pub fn echo(message: &str) -> Request {
    Request::echo(message)
}

pub fn info() -> Request {
    Request::info(RequestInfo::default())
}

pub fn check_tx(tx: &[u8]) -> Request {
    Request::check_tx(RequestCheckTx {
        tx: tx.to_vec(),
        r#type: CheckTxType::New as i32,
    })
}

/// `CheckTx` carrying a transaction type no ABCI version defines
pub fn check_tx_with_unknown_type() -> Request {
    Request::check_tx(RequestCheckTx {
        tx: b"tx".to_vec(),
        r#type: 7,
    })
}

pub fn finalize_block(height: i64, txs: &[&[u8]]) -> RequestFinalizeBlock {
    RequestFinalizeBlock {
        txs: txs.iter().map(|tx| tx.to_vec()).collect(),
        height,
        ..Default::default()
    }
}

pub fn prepare_proposal(max_tx_bytes: i64, txs: &[&[u8]]) -> RequestPrepareProposal {
    RequestPrepareProposal {
        max_tx_bytes,
        txs: txs.iter().map(|tx| tx.to_vec()).collect(),
        height: 1,
        ..Default::default()
    }
}

pub fn query(key: &[u8]) -> RequestQuery {
    RequestQuery {
        data: key.to_vec(),
        path: "/store".to_string(),
        ..Default::default()
    }
}

pub fn offer_snapshot(height: u64) -> RequestOfferSnapshot {
    RequestOfferSnapshot {
        snapshot: Some(Snapshot {
            height,
            format: 1,
            chunks: 1,
            hash: vec![1; 32],
            metadata: vec![],
        }),
        app_hash: vec![2; 32],
    }
}
