//! `serve`: JSON-lines host loop
//!
//! stdin carries one transfer request per line, stdout carries one result
//! payload per line. Requests run concurrently; results come back in
//! completion order, correlated by `requestId`.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::api::ft_manager::FtApiClient;
use crate::bridge::ChannelBridge;
use crate::config::Config;
use crate::models::{CallbackPayload, TransferRequest, TransferResult};
use crate::services::transfer_service::TransferService;
use crate::utils::errors::VALIDATION_ERROR_CODE;

pub async fn execute(config: &Config) -> Result<(), String> {
    let client = FtApiClient::new(&config.ft_api).map_err(|e| e.to_string())?;
    let (bridge, mut rx) = ChannelBridge::new();
    let service = Arc::new(TransferService::new(
        Arc::new(client),
        Arc::new(bridge),
        config.policy.clone(),
        config.credential_key.clone(),
    ));

    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(payload) = rx.recv().await {
            let written = async {
                stdout.write_all(payload.as_bytes()).await?;
                stdout.write_all(b"\n").await?;
                stdout.flush().await
            };
            if let Err(e) = written.await {
                error!("Failed to write result payload: {}", e);
            }
        }
    });

    info!("Reading transfer requests from stdin ({})", config.ft_api.base_url);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut tasks = JoinSet::new();
    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| format!("Failed to read stdin: {}", e))?
    {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match parse_request_line(line) {
            Ok(request) => {
                let service = service.clone();
                tasks.spawn(async move { service.execute(request).await });
            }
            Err(payload) => service.deliver(payload),
        }
    }

    info!("stdin closed, waiting for {} transfers in flight", tasks.len());
    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            error!("Transfer task aborted: {}", e);
        }
    }

    // last bridge handle; the writer drains and exits once it is gone
    drop(service);
    writer
        .await
        .map_err(|e| format!("Result writer aborted: {}", e))
}

/// Decode one request line; a bad line becomes a failure payload for the host
///
/// Missing request ids are filled with a fresh UUID.
pub fn parse_request_line(line: &str) -> Result<TransferRequest, CallbackPayload> {
    match serde_json::from_str::<TransferRequest>(line) {
        Ok(mut request) => {
            if request.request_id.is_empty() {
                request.request_id = uuid::Uuid::new_v4().to_string();
            }
            Ok(request)
        }
        Err(e) => {
            let request_id = serde_json::from_str::<serde_json::Value>(line)
                .ok()
                .and_then(|v| v.get("requestId").and_then(|id| id.as_str()).map(str::to_string))
                .unwrap_or_default();
            warn!("Rejecting malformed request line (requestId `{}`): {}", request_id, e);

            Err(CallbackPayload::new(
                request_id,
                TransferResult::failure(VALIDATION_ERROR_CODE, format!("Invalid request: {}", e)),
            ))
        }
    }
}
