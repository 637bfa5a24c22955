//! Applications misbehaving on purpose.
use std::{thread, time::Duration};

use crate::{types::*, Application, Error, Result};

/// Takes `delay` to finalize a block
#[derive(Debug)]
pub struct SlowApp {
    pub delay: Duration,
}

impl Application for SlowApp {
    fn finalize_block(&mut self, request: FinalizeBlockRequest) -> Result<FinalizeBlockResponse> {
        thread::sleep(self.delay);

        Ok(FinalizeBlockResponse {
            app_hash: request.height.to_be_bytes().to_vec(),
            ..Default::default()
        })
    }
}

/// Panics on `CheckTx(b"panic")` and fails on `CheckTx(b"fail")`
#[derive(Debug, Default)]
pub struct FaultyApp;

impl Application for FaultyApp {
    fn check_tx(&mut self, request: CheckTxRequest) -> Result<CheckTxResponse> {
        match request.tx.as_slice() {
            b"panic" => panic!("check_tx exploded"),
            b"fail" => Err(Error::application("check_tx failed")),
            _ => Ok(CheckTxResponse {
                code: code::OK,
                ..Default::default()
            }),
        }
    }
}
