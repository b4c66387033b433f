use scan_sign::{
    constants::qr::{CMD_SIGN_TX, CRYPTO_SR25519, SUBSTRATE_ID},
    lifecycle::LifecycleOutcome,
    registry::DescribedDispatchError,
    ExchangeStatus, RequestId, ScanSignError,
};
use scan_sign_client::{
    client::check_outcome,
    config::{ConfigFile, DevChainConfig},
    dev_chain::{DevChain, DevOutcome, DEV_GENESIS_HASH},
    signer::{PayloadDisplay, QrDisplayPayload},
    Config, ScanSignClient, ScanSignClientError,
};
use std::{
    str::FromStr,
    sync::{Arc, Mutex},
    time::Duration,
};

const CONFIG: &str = r#"
    endpoint = "wss://kusama-rpc.polkadot.io"
    sender = "J7LbEaKaDuPwnNS9BT4xmscBn7GwzvCRwKbQuC82KdQRHxW"
    receiver = "HqfMqd2sod4pN5L1HfUD1h9VLiaKfekeGcesnSz7dKDXJdg"
    amount = 1000000000
"#;

#[derive(Default)]
struct RecordingDisplay {
    shown: Mutex<Vec<QrDisplayPayload>>,
    cleared: Mutex<usize>,
}

impl RecordingDisplay {
    fn shown_count(&self) -> usize {
        self.shown.lock().unwrap().len()
    }

    fn last_shown(&self) -> Option<QrDisplayPayload> {
        self.shown.lock().unwrap().last().cloned()
    }

    async fn wait_for_show(&self, count: usize) -> QrDisplayPayload {
        for _ in 0..200 {
            if self.shown_count() >= count {
                if let Some(shown) = self.last_shown() {
                    return shown;
                }
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("nothing was displayed");
    }
}

impl PayloadDisplay for RecordingDisplay {
    fn show(&self, payload: &QrDisplayPayload) -> scan_sign_client::Result<()> {
        self.shown.lock().unwrap().push(payload.clone());
        Ok(())
    }

    fn clear(&self) {
        *self.cleared.lock().unwrap() += 1;
    }
}

struct Harness {
    client: Arc<ScanSignClient>,
    chain: Arc<DevChain>,
    display: Arc<RecordingDisplay>,
}

fn harness(outcome: DevOutcome, signature_timeout: Option<&str>) -> Harness {
    let mut config_str = CONFIG.to_string();
    if let Some(timeout) = signature_timeout {
        config_str.push_str(&format!("signature_timeout = \"{timeout}\"\n"));
    }
    let mut config = Config::from_config_file(ConfigFile::from_str(&config_str).unwrap()).unwrap();
    config.dev_chain = DevChainConfig { outcome, nonce: 0 };

    let chain = Arc::new(DevChain::new(&config.dev_chain));
    let display = Arc::new(RecordingDisplay::default());
    let client = Arc::new(ScanSignClient::new(config, chain.clone(), display.clone()));
    Harness {
        client,
        chain,
        display,
    }
}

fn spawn_transfer(
    client: &Arc<ScanSignClient>,
) -> tokio::task::JoinHandle<scan_sign_client::Result<scan_sign::lifecycle::LifecycleReport>> {
    let client = Arc::clone(client);
    tokio::spawn(async move { client.submit_transfer().await })
}

#[tokio::test]
async fn scanned_signature_completes_transfer() {
    let Harness {
        client,
        chain,
        display,
    } = harness(DevOutcome::Success, None);

    let transfer = spawn_transfer(&client);
    let shown = display.wait_for_show(1).await;

    // The display gets the framed request for the configured sender.
    assert_eq!(shown.request.address, client.config().sender);
    assert_eq!(shown.request.genesis_hash, DEV_GENESIS_HASH);
    assert_eq!(shown.frames.len(), 1);
    let frame = &shown.frames[0];
    assert_eq!(&frame[5..8], &[SUBSTRATE_ID, CRYPTO_SR25519, CMD_SIGN_TX]);
    assert_eq!(&frame[8..40], client.config().sender.public_key());

    let signature = format!("0x{}", hex::encode([0xaa; 64]));
    client
        .scan_handle()
        .on_scan(RequestId::new(1), &signature)
        .await
        .unwrap();

    let report = transfer.await.unwrap().unwrap();
    assert_eq!(report.statuses, ["Ready", "Broadcast", "InBlock"]);
    assert!(report.outcome.is_success());
    check_outcome(&report.outcome).unwrap();

    assert_eq!(chain.released_subscriptions(), 1);
    assert_eq!(*display.cleared.lock().unwrap(), 1);
    assert_eq!(client.exchange().status().await, ExchangeStatus::Idle);
}

#[tokio::test]
async fn module_error_is_decoded() {
    let Harness {
        client,
        chain,
        display,
    } = harness(DevOutcome::ModuleError, None);

    let transfer = spawn_transfer(&client);
    let _ = display.wait_for_show(1).await;
    client
        .scan_handle()
        .on_scan(RequestId::default(), "0x01")
        .await
        .unwrap();

    let report = transfer.await.unwrap().unwrap();
    match &report.outcome {
        LifecycleOutcome::DispatchFailed {
            error: DescribedDispatchError::Module(meta),
            ..
        } => {
            assert_eq!(meta.section, "balances");
            assert_eq!(meta.name, "InsufficientBalance");
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert!(matches!(
        check_outcome(&report.outcome),
        Err(ScanSignClientError::Dispatch(_))
    ));
    assert_eq!(chain.released_subscriptions(), 1);
}

#[tokio::test]
async fn dropped_and_invalid_release_subscription() {
    for outcome in [DevOutcome::Dropped, DevOutcome::Invalid] {
        let Harness {
            client,
            chain,
            display,
        } = harness(outcome, None);

        let transfer = spawn_transfer(&client);
        let _ = display.wait_for_show(1).await;
        client
            .scan_handle()
            .on_scan(RequestId::default(), "0x01")
            .await
            .unwrap();

        let report = transfer.await.unwrap().unwrap();
        assert!(!report.outcome.is_success());
        assert!(matches!(report.outcome, LifecycleOutcome::Rejected(_)));
        assert_eq!(chain.released_subscriptions(), 1);
    }
}

#[tokio::test]
async fn second_transfer_while_waiting_is_rejected() {
    let Harness {
        client, display, ..
    } = harness(DevOutcome::Success, None);

    let first = spawn_transfer(&client);
    let _ = display.wait_for_show(1).await;

    let second = client.submit_transfer().await;
    assert!(matches!(
        second,
        Err(ScanSignClientError::ScanSign(ScanSignError::DoubleRequest))
    ));

    // The first transfer is still waiting and can be completed.
    client
        .scan_handle()
        .on_scan(RequestId::default(), "0x01")
        .await
        .unwrap();
    assert!(first.await.unwrap().unwrap().outcome.is_success());
    assert_eq!(display.shown_count(), 1);
}

#[tokio::test]
async fn unanswered_request_times_out() {
    let Harness {
        client,
        chain,
        display,
    } = harness(DevOutcome::Success, Some("50ms"));

    let result = spawn_transfer(&client).await.unwrap();
    assert!(matches!(
        result,
        Err(ScanSignClientError::ScanSign(ScanSignError::SignatureTimeout(_)))
    ));
    assert_eq!(display.shown_count(), 1);
    assert_eq!(chain.next_nonce(), 0);
    assert_eq!(client.exchange().status().await, ExchangeStatus::Idle);

    // A late scan finds nothing to resolve.
    let late = client
        .scan_handle()
        .on_scan(RequestId::default(), "0x01")
        .await;
    assert!(matches!(
        late,
        Err(ScanSignClientError::ScanSign(ScanSignError::UnexpectedSignature))
    ));
}

#[tokio::test]
async fn cancelled_request_fails_transfer() {
    let Harness {
        client, display, ..
    } = harness(DevOutcome::Success, None);

    let transfer = spawn_transfer(&client);
    let _ = display.wait_for_show(1).await;
    client.exchange().cancel().await.unwrap();

    assert!(matches!(
        transfer.await.unwrap(),
        Err(ScanSignClientError::ScanSign(ScanSignError::RequestCancelled))
    ));
    assert!(matches!(
        client.exchange().cancel().await,
        Err(ScanSignError::NothingPending)
    ));
}

#[tokio::test]
async fn abandoned_transfer_frees_exchange() {
    let Harness {
        client,
        chain,
        display,
    } = harness(DevOutcome::Success, None);

    let gave_up = tokio::time::timeout(Duration::from_millis(50), client.submit_transfer()).await;
    assert!(gave_up.is_err());
    assert_eq!(display.shown_count(), 1);
    assert_eq!(*display.cleared.lock().unwrap(), 1);
    assert_eq!(client.exchange().status().await, ExchangeStatus::Idle);
    assert_eq!(chain.next_nonce(), 0);

    let retry = spawn_transfer(&client);
    let _ = display.wait_for_show(2).await;
    client
        .scan_handle()
        .on_scan(RequestId::default(), "0x01")
        .await
        .unwrap();
    assert!(retry.await.unwrap().unwrap().outcome.is_success());
    assert_eq!(chain.next_nonce(), 1);
}
