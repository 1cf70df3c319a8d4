//! Transfer Service - merge-then-transfer orchestration for one FT send
//!
//! Every invocation ends with exactly one payload on the callback bridge,
//! success or failure. Merges and the transfer broadcast real transactions,
//! so nothing is retried and the first failure ends the invocation.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::api::ft_manager::{FtManager, FtManagerFactory, SessionParams};
use crate::bridge::CallbackBridge;
use crate::models::{CallbackPayload, Credential, TransferRequest, TransferResult, MAX_RECEIVERS};
use crate::models::receiver::is_plausible_address;
use crate::services::consolidation::{ConsolidationMode, ConsolidationPolicy};
use crate::utils::errors::NO_PROGRESS_ERROR_CODE;
use crate::utils::{resolve_credential, TransferError};

pub struct TransferService {
    factory: Arc<dyn FtManagerFactory>,
    bridge: Arc<dyn CallbackBridge>,
    policy: ConsolidationPolicy,
    credential_key: Option<String>,
}

impl TransferService {
    pub fn new(
        factory: Arc<dyn FtManagerFactory>,
        bridge: Arc<dyn CallbackBridge>,
        policy: ConsolidationPolicy,
        credential_key: Option<String>,
    ) -> Self {
        Self {
            factory,
            bridge,
            policy,
            credential_key,
        }
    }

    /// Run one transfer and deliver its result through the bridge
    pub async fn execute(&self, request: TransferRequest) {
        let request_id = request.request_id.clone();
        let symbol = request.symbol.clone().unwrap_or_else(|| "tokens".to_string());

        let result = match self.run(request).await {
            Ok(txid) => TransferResult::success(txid),
            Err(e) => {
                match &e {
                    TransferError::Validation(_) => warn!("[{}] rejected: {}", request_id, e),
                    _ => error!("[{}] transfer FAILED: {} ({})", request_id, e, e.user_message(&symbol)),
                }
                TransferResult::from(&e)
            }
        };
        if let Some(txid) = result.transaction_id() {
            info!("[{}] transfer SUCCESS: {}", request_id, txid);
        }

        self.deliver(CallbackPayload::new(request_id, result));
    }

    /// Hand a payload to the bridge; used for results and for host-level rejections
    pub fn deliver(&self, payload: CallbackPayload) {
        match payload.to_json() {
            Ok(json) => self.bridge.deliver(json),
            Err(e) => error!(
                "[{}] {}",
                payload.request_id,
                TransferError::Bridge(format!("failed to serialize result: {}", e))
            ),
        }
    }

    async fn run(&self, request: TransferRequest) -> Result<String, TransferError> {
        validate_request(&request)?;

        let key = self.credential_key.as_deref();
        let purse = resolve_credential(&request.purse, key)?;
        let sender = resolve_credential(&request.sender_wif, key)?;

        let manager = self
            .factory
            .session(SessionParams {
                network: request.network,
                purse,
                feeb: request.feeb,
            })
            .map_err(|e| TransferError::Unavailable(e.to_string()))?;

        // utxo_count >= 0 after validation
        let utxo_count = request.utxo_count as u64;
        let target = self.policy.target_for(request.receivers.len());
        info!(
            "[{}] transfer start: {} receivers, {} utxos, target {} ({} merges estimated)",
            request.request_id,
            request.receivers.len(),
            utxo_count,
            target,
            self.policy.merges_needed(utxo_count, target)
        );

        if let Some(txid) = manager
            .merge_purse(self.policy.purse_max_unspents())
            .await
            .map_err(TransferError::consolidation)?
        {
            debug!("[{}] fee purse merged: {}", request.request_id, txid);
        }

        let merges = self
            .consolidate(manager.as_ref(), &request, &sender, utxo_count, target)
            .await?;
        if merges > 0 {
            debug!("[{}] consolidation done after {} merges", request.request_id, merges);
        }

        let receipt = manager
            .transfer(&request.codehash, &request.genesis, &request.receivers, &sender)
            .await
            .map_err(TransferError::transfer)?;

        Ok(receipt.txid)
    }

    /// Merge until the UTXO count is at or below `target`; returns the merges made
    async fn consolidate(
        &self,
        manager: &dyn FtManager,
        request: &TransferRequest,
        owner: &Credential,
        utxo_count: u64,
        target: u64,
    ) -> Result<u64, TransferError> {
        let mut remaining = match self.policy.mode() {
            ConsolidationMode::Estimate => utxo_count,
            ConsolidationMode::Requery => {
                let actual = manager
                    .utxo_count(&request.codehash, &request.genesis, owner)
                    .await
                    .map_err(TransferError::consolidation)?;
                if actual != utxo_count {
                    debug!("[{}] request said {} utxos, service reports {}", request.request_id, utxo_count, actual);
                }
                actual
            }
        };
        let mut merges = 0u64;

        while remaining > target {
            manager
                .merge(&request.codehash, &request.genesis, owner)
                .await
                .map_err(TransferError::consolidation)?;
            merges += 1;

            remaining = match self.policy.mode() {
                ConsolidationMode::Estimate => remaining.saturating_sub(self.policy.batch_size()),
                ConsolidationMode::Requery => {
                    let actual = manager
                        .utxo_count(&request.codehash, &request.genesis, owner)
                        .await
                        .map_err(TransferError::consolidation)?;
                    if actual >= remaining {
                        return Err(TransferError::Consolidation {
                            code: NO_PROGRESS_ERROR_CODE,
                            message: format!(
                                "merge {} left {} utxos (was {}), target {}",
                                merges, actual, remaining, target
                            ),
                        });
                    }
                    actual
                }
            };

            debug!("[{}] merge {} done, {} utxos remaining", request.request_id, merges, remaining);
        }

        Ok(merges)
    }
}

/// Reject requests that can never succeed before any transaction is broadcast
pub fn validate_request(request: &TransferRequest) -> Result<(), TransferError> {
    let invalid = |msg: String| -> Result<(), TransferError> { Err(TransferError::Validation(msg)) };

    if request.receivers.is_empty() {
        return invalid("receivers must not be empty".to_string());
    }
    if request.receivers.len() > MAX_RECEIVERS {
        return invalid(format!(
            "too many receivers: {} (max {})",
            request.receivers.len(),
            MAX_RECEIVERS
        ));
    }
    for (idx, receiver) in request.receivers.iter().enumerate() {
        if !is_plausible_address(&receiver.address) {
            return invalid(format!("receiver {}: invalid address `{}`", idx + 1, receiver.address));
        }
        if receiver.base_units().is_none() {
            return invalid(format!(
                "receiver {}: amount must be a positive integer, got `{}`",
                idx + 1,
                receiver.amount
            ));
        }
    }
    if request.utxo_count < 0 {
        return invalid(format!("utxoCount must not be negative, got {}", request.utxo_count));
    }
    if request.codehash.trim().is_empty() || request.genesis.trim().is_empty() {
        return invalid("codehash and genesis are required".to_string());
    }
    if request.purse.is_empty() || request.sender_wif.is_empty() {
        return invalid("purse and senderWif are required".to_string());
    }
    if !request.feeb.is_finite() || request.feeb <= 0.0 {
        return invalid(format!("feeb must be positive, got {}", request.feeb));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::api::ft_manager::{ApiError, TransferReceipt};
    use crate::bridge::ChannelBridge;
    use crate::models::{Network, Receiver};
    use crate::utils::encrypt_credential;
    use crate::utils::errors::{INTERNAL_ERROR_CODE, VALIDATION_ERROR_CODE};

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Session { network: Network, purse: String, feeb: f64 },
        MergePurse { max_unspents: u64 },
        Merge { owner: String },
        Transfer { receivers: usize, sender: String },
        UtxoCount,
    }

    /// Scripted FT service that records every call
    #[derive(Default)]
    struct MockState {
        calls: Vec<Call>,
        fail_merge_at: Option<usize>,
        transfer_error: Option<ApiError>,
        purse_merge_error: Option<ApiError>,
        requeried_counts: VecDeque<u64>,
    }

    #[derive(Clone, Default)]
    struct MockFt {
        state: Arc<Mutex<MockState>>,
    }

    impl MockFt {
        fn calls(&self) -> Vec<Call> {
            self.state.lock().unwrap().calls.clone()
        }

        fn merges(&self) -> usize {
            self.calls().iter().filter(|c| matches!(c, Call::Merge { .. })).count()
        }

        fn transfers(&self) -> usize {
            self.calls().iter().filter(|c| matches!(c, Call::Transfer { .. })).count()
        }
    }

    impl FtManagerFactory for MockFt {
        fn session(&self, params: SessionParams) -> Result<Box<dyn FtManager>, ApiError> {
            self.state.lock().unwrap().calls.push(Call::Session {
                network: params.network,
                purse: params.purse.expose().to_string(),
                feeb: params.feeb,
            });
            Ok(Box::new(self.clone()))
        }
    }

    #[async_trait]
    impl FtManager for MockFt {
        async fn merge_purse(&self, max_unspents: u64) -> Result<Option<String>, ApiError> {
            let mut state = self.state.lock().unwrap();
            state.calls.push(Call::MergePurse { max_unspents });
            match state.purse_merge_error.clone() {
                Some(err) => Err(err),
                None => Ok(Some("beefpurse".to_string())),
            }
        }

        async fn merge(&self, _codehash: &str, _genesis: &str, owner: &Credential) -> Result<(), ApiError> {
            let mut state = self.state.lock().unwrap();
            state.calls.push(Call::Merge { owner: owner.expose().to_string() });
            let attempt = state.calls.iter().filter(|c| matches!(c, Call::Merge { .. })).count();
            if state.fail_merge_at == Some(attempt) {
                return Err(ApiError::Rejected { code: -200, message: "Insufficient SPACE".to_string() });
            }
            Ok(())
        }

        async fn transfer(
            &self,
            _codehash: &str,
            _genesis: &str,
            receivers: &[Receiver],
            sender: &Credential,
        ) -> Result<TransferReceipt, ApiError> {
            let mut state = self.state.lock().unwrap();
            state.calls.push(Call::Transfer {
                receivers: receivers.len(),
                sender: sender.expose().to_string(),
            });
            match state.transfer_error.clone() {
                Some(err) => Err(err),
                None => Ok(TransferReceipt { txid: "f00dtx".to_string() }),
            }
        }

        async fn utxo_count(&self, _codehash: &str, _genesis: &str, _owner: &Credential) -> Result<u64, ApiError> {
            let mut state = self.state.lock().unwrap();
            state.calls.push(Call::UtxoCount);
            state
                .requeried_counts
                .pop_front()
                .ok_or_else(|| ApiError::RequestError("no count scripted".to_string()))
        }
    }

    struct Harness {
        ft: MockFt,
        service: TransferService,
        rx: tokio::sync::mpsc::UnboundedReceiver<String>,
    }

    fn harness_with(policy: ConsolidationPolicy, credential_key: Option<String>) -> Harness {
        let ft = MockFt::default();
        let (bridge, rx) = ChannelBridge::new();
        let service = TransferService::new(Arc::new(ft.clone()), Arc::new(bridge), policy, credential_key);
        Harness { ft, service, rx }
    }

    fn harness() -> Harness {
        harness_with(ConsolidationPolicy::default(), None)
    }

    fn request(receivers: usize, utxo_count: i64) -> TransferRequest {
        TransferRequest {
            request_id: "req-1".to_string(),
            network: Network::Mainnet,
            purse: Credential::new("Kpurse"),
            feeb: 0.5,
            codehash: "c0de".to_string(),
            genesis: "9e9e".to_string(),
            receivers: (0..receivers).map(|i| Receiver::new(format!("addr{}", i), 100)).collect(),
            sender_wif: Credential::new("Ksender"),
            utxo_count,
            symbol: Some("MC".to_string()),
        }
    }

    /// Drain the bridge, asserting exactly one payload was delivered
    fn single_payload(h: &mut Harness) -> CallbackPayload {
        let json = h.rx.try_recv().expect("no payload delivered");
        assert!(h.rx.try_recv().is_err(), "more than one payload delivered");
        serde_json::from_str(&json).expect("payload is not valid JSON")
    }

    #[tokio::test]
    async fn test_few_receivers_below_target_skips_merge() {
        let mut h = harness();
        h.service.execute(request(3, 15)).await;

        assert_eq!(h.ft.merges(), 0);
        assert_eq!(h.ft.transfers(), 1);
        let payload = single_payload(&mut h);
        assert_eq!(payload.request_id, "req-1");
        assert_eq!(payload.result, TransferResult::success("f00dtx"));
    }

    #[tokio::test]
    async fn test_medium_batch_merges_three_times() {
        let mut h = harness();
        h.service.execute(request(8, 50)).await;

        assert_eq!(h.ft.merges(), 3);
        assert_eq!(h.ft.transfers(), 1);
        assert!(matches!(h.ft.calls().last(), Some(Call::Transfer { receivers: 8, .. })));
        assert!(single_payload(&mut h).result.is_success());
    }

    #[tokio::test]
    async fn test_many_receivers_already_concentrated() {
        let mut h = harness();
        h.service.execute(request(20, 2)).await;

        assert_eq!(h.ft.merges(), 0);
        assert_eq!(h.ft.transfers(), 1);
        assert!(single_payload(&mut h).result.is_success());
    }

    #[tokio::test]
    async fn test_transfer_failure_is_reported_verbatim() {
        let mut h = harness();
        h.ft.state.lock().unwrap().transfer_error = Some(ApiError::Rejected {
            code: 7,
            message: "insufficient fee".to_string(),
        });
        h.service.execute(request(2, 0)).await;

        let payload = single_payload(&mut h);
        assert_eq!(payload.result, TransferResult::failure(7, "insufficient fee"));

        let value = serde_json::to_value(&payload).unwrap();
        assert!(value["result"].get("transactionId").is_none());
    }

    #[tokio::test]
    async fn test_merge_count_matches_formula() {
        let policy = ConsolidationPolicy::default();
        for (receivers, utxos) in [(1usize, 0i64), (1, 21), (5, 100), (6, 9), (12, 27), (12, 28), (13, 4), (40, 200)] {
            let h = harness();
            h.service.execute(request(receivers, utxos)).await;

            let target = policy.target_for(receivers);
            let expected = policy.merges_needed(utxos as u64, target);
            assert_eq!(h.ft.merges() as u64, expected, "receivers={} utxos={}", receivers, utxos);
            assert_eq!(h.ft.transfers(), 1);
        }
    }

    #[tokio::test]
    async fn test_merge_failure_short_circuits() {
        let mut h = harness();
        h.ft.state.lock().unwrap().fail_merge_at = Some(2);
        h.service.execute(request(13, 100)).await;

        // 100 -> target 3 would need 6 merges; the second one fails
        assert_eq!(h.ft.merges(), 2);
        assert_eq!(h.ft.transfers(), 0);
        assert_eq!(
            single_payload(&mut h).result,
            TransferResult::failure(-200, "Insufficient SPACE")
        );
    }

    #[tokio::test]
    async fn test_session_and_credentials_forwarded() {
        let h = harness();
        h.service.execute(request(1, 21)).await;

        assert_eq!(
            h.ft.calls(),
            vec![
                Call::Session { network: Network::Mainnet, purse: "Kpurse".to_string(), feeb: 0.5 },
                Call::MergePurse { max_unspents: 3 },
                Call::Merge { owner: "Ksender".to_string() },
                Call::Transfer { receivers: 1, sender: "Ksender".to_string() },
            ]
        );
    }

    #[tokio::test]
    async fn test_invalid_requests_make_no_external_calls() {
        let mut bad = Vec::new();
        bad.push(request(0, 5));
        bad.push(request(MAX_RECEIVERS + 1, 5));
        bad.push(request(2, -1));
        let mut zero_amount = request(2, 5);
        zero_amount.receivers[1].amount = "0".to_string();
        bad.push(zero_amount);
        let mut blank_address = request(2, 5);
        blank_address.receivers[0].address = String::new();
        bad.push(blank_address);
        let mut no_genesis = request(2, 5);
        no_genesis.genesis = " ".to_string();
        bad.push(no_genesis);
        let mut no_sender = request(2, 5);
        no_sender.sender_wif = Credential::new("");
        bad.push(no_sender);
        let mut zero_fee = request(2, 5);
        zero_fee.feeb = 0.0;
        bad.push(zero_fee);

        for req in bad {
            let mut h = harness();
            h.service.execute(req).await;

            assert!(h.ft.calls().is_empty());
            assert_eq!(single_payload(&mut h).result.code(), VALIDATION_ERROR_CODE);
        }
    }

    #[tokio::test]
    async fn test_encrypted_credentials_are_decrypted() {
        let key = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";
        let mut h = harness_with(ConsolidationPolicy::default(), Some(key.to_string()));

        let mut req = request(1, 0);
        req.purse = encrypt_credential("Kpurse", key).unwrap();
        req.sender_wif = encrypt_credential("Ksender", key).unwrap();
        h.service.execute(req).await;

        assert!(single_payload(&mut h).result.is_success());
        assert!(h.ft.calls().contains(&Call::Transfer { receivers: 1, sender: "Ksender".to_string() }));
    }

    #[tokio::test]
    async fn test_encrypted_credential_without_key_fails_before_calls() {
        let key = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";
        let mut h = harness();

        let mut req = request(1, 0);
        req.sender_wif = encrypt_credential("Ksender", key).unwrap();
        h.service.execute(req).await;

        assert!(h.ft.calls().is_empty());
        assert_eq!(single_payload(&mut h).result.code(), INTERNAL_ERROR_CODE);
    }

    #[tokio::test]
    async fn test_requery_mode_uses_actual_counts() {
        let policy = ConsolidationPolicy::new(
            ConsolidationPolicy::default_tiers(),
            ConsolidationPolicy::DEFAULT_BATCH_SIZE,
            ConsolidationMode::Requery,
        )
        .unwrap();
        let mut h = harness_with(policy, None);
        h.ft.state.lock().unwrap().requeried_counts = VecDeque::from(vec![50, 40, 12, 5]);
        h.service.execute(request(8, 50)).await;

        // estimate mode would stop after 3 merges too, but here the counts drive it
        assert_eq!(h.ft.merges(), 3);
        assert_eq!(h.ft.calls().iter().filter(|c| **c == Call::UtxoCount).count(), 4);
        assert!(single_payload(&mut h).result.is_success());
    }

    #[tokio::test]
    async fn test_requery_mode_stops_without_progress() {
        let policy = ConsolidationPolicy::new(
            ConsolidationPolicy::default_tiers(),
            ConsolidationPolicy::DEFAULT_BATCH_SIZE,
            ConsolidationMode::Requery,
        )
        .unwrap();
        let mut h = harness_with(policy, None);
        h.ft.state.lock().unwrap().requeried_counts = VecDeque::from(vec![50, 30, 30]);
        h.service.execute(request(8, 50)).await;

        assert_eq!(h.ft.merges(), 2);
        assert_eq!(h.ft.transfers(), 0);
        assert_eq!(single_payload(&mut h).result.code(), NO_PROGRESS_ERROR_CODE);
    }

    fn requery_policy() -> ConsolidationPolicy {
        ConsolidationPolicy::new(
            ConsolidationPolicy::default_tiers(),
            ConsolidationPolicy::DEFAULT_BATCH_SIZE,
            ConsolidationMode::Requery,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_requery_mode_starts_from_actual_count() {
        let mut h = harness_with(requery_policy(), None);
        // the request under-reports: 25 claimed, 60 held
        h.ft.state.lock().unwrap().requeried_counts = VecDeque::from(vec![60, 41, 22, 5]);
        h.service.execute(request(3, 25)).await;

        assert_eq!(h.ft.merges(), 3);
        assert_eq!(h.ft.transfers(), 1);
        assert_eq!(single_payload(&mut h).result, TransferResult::success("f00dtx"));
    }

    #[tokio::test]
    async fn test_requery_mode_skips_merges_when_over_reported() {
        let mut h = harness_with(requery_policy(), None);
        h.ft.state.lock().unwrap().requeried_counts = VecDeque::from(vec![3]);
        h.service.execute(request(13, 100)).await;

        assert_eq!(h.ft.merges(), 0);
        assert_eq!(h.ft.transfers(), 1);
        assert!(single_payload(&mut h).result.is_success());
    }

    #[tokio::test]
    async fn test_purse_merged_before_token_merges() {
        let h = harness_with(ConsolidationPolicy::default().with_purse_max_unspents(5), None);
        h.service.execute(request(8, 50)).await;

        let calls = h.ft.calls();
        assert_eq!(calls[1], Call::MergePurse { max_unspents: 5 });
        assert!(matches!(calls[2], Call::Merge { .. }));
        assert_eq!(calls.iter().filter(|c| matches!(c, Call::MergePurse { .. })).count(), 1);
    }

    #[tokio::test]
    async fn test_purse_merge_failure_skips_everything_else() {
        let mut h = harness();
        h.ft.state.lock().unwrap().purse_merge_error = Some(ApiError::Rejected {
            code: -200,
            message: "Insufficient SPACE".to_string(),
        });
        h.service.execute(request(8, 50)).await;

        assert_eq!(h.ft.merges(), 0);
        assert_eq!(h.ft.transfers(), 0);
        assert_eq!(
            single_payload(&mut h).result,
            TransferResult::failure(-200, "Insufficient SPACE")
        );
    }

    #[tokio::test]
    async fn test_concurrent_invocations_each_report_once() {
        let ft = MockFt::default();
        let (bridge, mut rx) = ChannelBridge::new();
        let service = Arc::new(TransferService::new(
            Arc::new(ft.clone()),
            Arc::new(bridge),
            ConsolidationPolicy::default(),
            None,
        ));

        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..5 {
            let service = service.clone();
            let mut req = request(1, 0);
            req.request_id = format!("req-{}", i);
            tasks.spawn(async move { service.execute(req).await });
        }
        while let Some(joined) = tasks.join_next().await {
            joined.unwrap();
        }
        drop(service);

        let mut ids = Vec::new();
        while let Some(json) = rx.recv().await {
            let payload: CallbackPayload = serde_json::from_str(&json).unwrap();
            ids.push(payload.request_id);
        }
        ids.sort();
        assert_eq!(ids, vec!["req-0", "req-1", "req-2", "req-3", "req-4"]);
        assert_eq!(ft.transfers(), 5);
    }
}
