use crate::{
    proto::abci::{request::Value, Request},
    Error, Result,
};

/// Checks a request before it is handed to a client
///
/// Rejects requests without a value, `CheckTx` with an empty transaction, block level requests with a non-positive
/// height and `PrepareProposal` with a non-positive `max_tx_bytes`. Rejected requests never reach the application.
pub fn validate(request: &Request) -> Result<()> {
    match request.value {
        None => Err(Error::UnknownRequest),
        Some(Value::CheckTx(ref request)) if request.tx.is_empty() => Err(Error::Validation(
            "CheckTx: empty transaction data".to_string(),
        )),
        Some(Value::FinalizeBlock(ref request)) => check_height("FinalizeBlock", request.height),
        Some(Value::ProcessProposal(ref request)) => {
            check_height("ProcessProposal", request.height)
        }
        Some(Value::ExtendVote(ref request)) => check_height("ExtendVote", request.height),
        Some(Value::VerifyVoteExtension(ref request)) => {
            check_height("VerifyVoteExtension", request.height)
        }
        Some(Value::PrepareProposal(ref request)) if request.max_tx_bytes <= 0 => {
            Err(Error::Validation(format!(
                "PrepareProposal: invalid max_tx_bytes: {}",
                request.max_tx_bytes
            )))
        }
        Some(_) => Ok(()),
    }
}

fn check_height(method: &str, height: i64) -> Result<()> {
    if height <= 0 {
        Err(Error::Validation(format!(
            "{}: invalid block height: {}",
            method, height
        )))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::abci::{
        RequestCheckTx, RequestExtendVote, RequestFinalizeBlock, RequestPrepareProposal,
        RequestProcessProposal, RequestQuery, RequestVerifyVoteExtension,
    };

    #[test]
    fn check_empty_tx_is_rejected() {
        let request = Request::check_tx(RequestCheckTx {
            tx: vec![],
            r#type: 0,
        });
        assert!(matches!(validate(&request), Err(Error::Validation(_))));

        let request = Request::check_tx(RequestCheckTx {
            tx: b"tx".to_vec(),
            r#type: 0,
        });
        assert!(validate(&request).is_ok());
    }

    #[test]
    fn check_heights_are_validated() {
        let requests = vec![
            Request::finalize_block(RequestFinalizeBlock {
                height: 0,
                ..Default::default()
            }),
            Request::process_proposal(RequestProcessProposal {
                height: -1,
                ..Default::default()
            }),
            Request::extend_vote(RequestExtendVote {
                height: 0,
                ..Default::default()
            }),
            Request::verify_vote_extension(RequestVerifyVoteExtension {
                height: 0,
                ..Default::default()
            }),
        ];

        for request in requests {
            assert!(matches!(validate(&request), Err(Error::Validation(_))));
        }

        let request = Request::finalize_block(RequestFinalizeBlock {
            height: 1,
            ..Default::default()
        });
        assert!(validate(&request).is_ok());
    }

    #[test]
    fn check_max_tx_bytes_is_validated() {
        let request = Request::prepare_proposal(RequestPrepareProposal {
            max_tx_bytes: 0,
            height: 1,
            ..Default::default()
        });
        assert!(matches!(validate(&request), Err(Error::Validation(_))));

        let request = Request::prepare_proposal(RequestPrepareProposal {
            max_tx_bytes: 1,
            ..Default::default()
        });
        assert!(validate(&request).is_ok());
    }

    #[test]
    fn check_other_requests_pass() {
        assert!(validate(&Request::flush()).is_ok());
        assert!(validate(&Request::echo("")).is_ok());
        assert!(validate(&Request::query(RequestQuery::default())).is_ok());
        assert!(matches!(
            validate(&Request::default()),
            Err(Error::UnknownRequest)
        ));
    }
}
