//! In-memory key/value store application (`key=value` transactions).
use std::collections::BTreeMap;

use crate::{types::*, Application, Result};

#[derive(Debug, Default)]
pub struct KvStore {
    committed: BTreeMap<Vec<u8>, Vec<u8>>,
    staged: Vec<(Vec<u8>, Vec<u8>)>,
    staged_height: i64,
    height: i64,
}

fn parse_tx(tx: &[u8]) -> Option<(Vec<u8>, Vec<u8>)> {
    let position = tx.iter().position(|byte| *byte == b'=')?;
    Some((tx[..position].to_vec(), tx[position + 1..].to_vec()))
}

impl Application for KvStore {
    fn info(&mut self, _request: InfoRequest) -> Result<InfoResponse> {
        Ok(InfoResponse {
            data: "kvstore".to_string(),
            last_block_height: self.height,
            ..Default::default()
        })
    }

    fn check_tx(&mut self, request: CheckTxRequest) -> Result<CheckTxResponse> {
        let code = match parse_tx(&request.tx) {
            Some(_) => code::OK,
            None => code::ENCODING,
        };

        Ok(CheckTxResponse {
            code,
            ..Default::default()
        })
    }

    fn finalize_block(&mut self, request: FinalizeBlockRequest) -> Result<FinalizeBlockResponse> {
        self.staged.clear();
        self.staged_height = request.height;

        let tx_results = request
            .txs
            .iter()
            .map(|tx| match parse_tx(tx) {
                Some(pair) => {
                    self.staged.push(pair);
                    ExecTxResult {
                        code: code::OK,
                        ..Default::default()
                    }
                }
                None => ExecTxResult {
                    code: code::ENCODING,
                    log: "transaction must be key=value".to_string(),
                    ..Default::default()
                },
            })
            .collect();

        Ok(FinalizeBlockResponse {
            tx_results,
            app_hash: ((self.committed.len() + self.staged.len()) as u64)
                .to_be_bytes()
                .to_vec(),
            ..Default::default()
        })
    }

    fn commit(&mut self, _request: CommitRequest) -> Result<CommitResponse> {
        self.committed.extend(self.staged.drain(..));
        self.height = self.staged_height;

        Ok(Default::default())
    }

    fn query(&mut self, request: QueryRequest) -> Result<QueryResponse> {
        let value = self.committed.get(&request.data).cloned();

        Ok(QueryResponse {
            code: code::OK,
            log: match value {
                Some(_) => "exists".to_string(),
                None => "does not exist".to_string(),
            },
            key: request.data,
            value: value.unwrap_or_default(),
            height: self.height,
            ..Default::default()
        })
    }
}
