// Pipeline tests against an in-memory ledger and signing agent

use async_trait::async_trait;
use base64::Engine;
use soroban_identity_core::codec;
use soroban_identity_core::{
    AccountSnapshot, BridgeConfig, BridgeError, IdentityLookup, IdentityRegistration, IdentityRegistryClient,
    LedgerRpc, Literal, RpcError, SendStatus, SendTransactionResponse, SigningAgent, SigningError, SimulateHostFunctionResult,
    SimulateResponse, Stage,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use stellar_xdr::curr::{
    AccountId, DecoratedSignature, HostFunction, InvokeContractArgs, Limits, OperationBody, PublicKey, ReadXdr,
    ScMap, ScMapEntry, ScVal, Signature, SignatureHint, TransactionEnvelope, Uint256, WriteXdr,
};

fn address(byte: u8) -> String {
    AccountId(PublicKey::PublicKeyTypeEd25519(Uint256([byte; 32]))).to_string()
}

fn b64(bytes: Vec<u8>) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// SorobanTransactionData with an empty footprint
fn transaction_data_xdr() -> String {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&0u32.to_be_bytes()); // ext v0
    bytes.extend_from_slice(&0u32.to_be_bytes()); // readOnly
    bytes.extend_from_slice(&0u32.to_be_bytes()); // readWrite
    bytes.extend_from_slice(&2_000_000u32.to_be_bytes()); // instructions
    bytes.extend_from_slice(&0u32.to_be_bytes()); // disk read bytes
    bytes.extend_from_slice(&512u32.to_be_bytes()); // write bytes
    bytes.extend_from_slice(&40_000i64.to_be_bytes()); // resource fee
    b64(bytes)
}

fn invocation(envelope: &TransactionEnvelope) -> InvokeContractArgs {
    let TransactionEnvelope::Tx(env) = envelope else {
        panic!("expected a v1 envelope");
    };
    match &env.tx.operations[0].body {
        OperationBody::InvokeHostFunction(op) => match &op.host_function {
            HostFunction::InvokeContract(args) => args.clone(),
            other => panic!("unexpected host function {:?}", other),
        },
        other => panic!("unexpected operation {:?}", other),
    }
}

fn write_simulation() -> SimulateResponse {
    SimulateResponse {
        transaction_data: Some(transaction_data_xdr()),
        min_resource_fee: Some("41000".to_string()),
        results: Some(vec![SimulateHostFunctionResult {
            auth: Some(vec![]),
            xdr: Some(b64(ScVal::Void.to_xdr(Limits::none()).unwrap())),
        }]),
        latest_ledger: 500,
        ..Default::default()
    }
}

fn read_simulation(retval: Option<String>) -> SimulateResponse {
    SimulateResponse {
        transaction_data: Some(transaction_data_xdr()),
        min_resource_fee: Some("100".to_string()),
        results: Some(vec![SimulateHostFunctionResult {
            auth: Some(vec![]),
            xdr: retval,
        }]),
        latest_ledger: 500,
        ..Default::default()
    }
}

fn identity_retval() -> String {
    let literal = Literal::Map(
        vec![
            ("country".to_string(), Literal::from("MX")),
            ("doc_hash".to_string(), Literal::from("1234567890")),
            ("doc_type".to_string(), Literal::from("selfie")),
            ("name".to_string(), Literal::from("Maria")),
            ("verified".to_string(), Literal::from("false")),
        ]
        .into_iter()
        .collect(),
    );
    codec::encode_base64(&literal).unwrap()
}

struct FakeLedger {
    account: Option<AccountSnapshot>,
    simulation: Result<SimulateResponse, RpcError>,
    submission: Result<SendTransactionResponse, RpcError>,
    simulated: Arc<Mutex<Vec<TransactionEnvelope>>>,
    submitted: Arc<Mutex<Vec<TransactionEnvelope>>>,
}

impl FakeLedger {
    fn new(source: &str, simulation: SimulateResponse) -> Self {
        Self {
            account: Some(AccountSnapshot {
                account_id: source.to_string(),
                sequence: 100,
            }),
            simulation: Ok(simulation),
            submission: Ok(SendTransactionResponse {
                status: SendStatus::Pending,
                hash: "e2b9f1c7".to_string(),
                latest_ledger: 501,
                error_result_xdr: None,
            }),
            simulated: Arc::default(),
            submitted: Arc::default(),
        }
    }
}

#[async_trait]
impl LedgerRpc for FakeLedger {
    async fn lookup_account(&self, account_id: &str) -> Result<AccountSnapshot, RpcError> {
        self.account
            .clone()
            .filter(|a| a.account_id == account_id)
            .ok_or_else(|| RpcError::NotFound(format!("Account {} does not exist", account_id)))
    }

    async fn simulate(&self, envelope: &TransactionEnvelope) -> Result<SimulateResponse, RpcError> {
        self.simulated.lock().unwrap().push(envelope.clone());
        self.simulation.clone()
    }

    async fn submit(&self, envelope: &TransactionEnvelope) -> Result<SendTransactionResponse, RpcError> {
        self.submitted.lock().unwrap().push(envelope.clone());
        self.submission.clone()
    }
}

/// Adds one signature to whatever it is given, or declines
struct FakeSigner {
    decline: Option<String>,
    calls: Arc<AtomicUsize>,
}

impl FakeSigner {
    fn approving() -> Self {
        Self {
            decline: None,
            calls: Arc::default(),
        }
    }

    fn declining(reason: &str) -> Self {
        Self {
            decline: Some(reason.to_string()),
            calls: Arc::default(),
        }
    }
}

#[async_trait]
impl SigningAgent for FakeSigner {
    async fn sign(&self, prepared_xdr: &str, network_passphrase: &str) -> Result<String, SigningError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(network_passphrase, "Test SDF Network ; September 2015");

        if let Some(reason) = &self.decline {
            return Err(SigningError::Declined(reason.clone()));
        }

        let bytes = base64::engine::general_purpose::STANDARD.decode(prepared_xdr).unwrap();
        let TransactionEnvelope::Tx(mut env) = TransactionEnvelope::from_xdr(bytes, Limits::none()).unwrap() else {
            panic!("expected a v1 envelope");
        };
        env.signatures = vec![DecoratedSignature {
            hint: SignatureHint([1, 2, 3, 4]),
            signature: Signature(vec![7u8; 64].try_into().unwrap()),
        }]
        .try_into()
        .unwrap();

        Ok(b64(TransactionEnvelope::Tx(env).to_xdr(Limits::none()).unwrap()))
    }
}

fn client(ledger: FakeLedger, signer: FakeSigner, source: &str) -> IdentityRegistryClient<FakeLedger, FakeSigner> {
    IdentityRegistryClient::new(&BridgeConfig::testnet(), ledger, signer, source).unwrap()
}

#[tokio::test]
async fn test_register_identity_submits_signed_invocation() {
    let source = address(1);
    let ledger = FakeLedger::new(&source, write_simulation());
    let simulated = ledger.simulated.clone();
    let submitted = ledger.submitted.clone();
    let signer = FakeSigner::approving();
    let sign_calls = signer.calls.clone();

    let registry = client(ledger, signer, &source);
    let registration = IdentityRegistration::new("Maria", "MX", "selfie", "1234567890");
    let receipt = registry.register_identity(&registration).await.unwrap();

    assert_eq!(receipt.status, SendStatus::Pending);
    assert_eq!(receipt.hash, "e2b9f1c7");
    assert_eq!(sign_calls.load(Ordering::SeqCst), 1);

    let simulated = simulated.lock().unwrap();
    assert_eq!(simulated.len(), 1);
    let call = invocation(&simulated[0]);
    assert_eq!(call.function_name.0.as_slice(), b"register_identity");
    assert_eq!(call.args.len(), 5);
    assert!(matches!(call.args[0], ScVal::Address(_)));
    let strings: Vec<Literal> = call.args[1..].iter().map(codec::decode).collect();
    assert_eq!(
        strings,
        vec![
            Literal::from("Maria"),
            Literal::from("MX"),
            Literal::from("selfie"),
            Literal::from("1234567890"),
        ]
    );

    let submitted = submitted.lock().unwrap();
    assert_eq!(submitted.len(), 1);
    let TransactionEnvelope::Tx(env) = &submitted[0] else {
        panic!("expected a v1 envelope");
    };
    assert_eq!(env.signatures.len(), 1);
    assert_eq!(env.tx.fee, 100 + 41_000);
    assert_eq!(env.tx.seq_num.0, 101);
}

#[tokio::test]
async fn test_register_rejected_by_simulation_never_reaches_signer() {
    let source = address(1);
    let ledger = FakeLedger::new(
        &source,
        SimulateResponse {
            error: Some("HostError: Error(Auth, InvalidAction)".to_string()),
            latest_ledger: 500,
            ..Default::default()
        },
    );
    let submitted = ledger.submitted.clone();
    let signer = FakeSigner::approving();
    let sign_calls = signer.calls.clone();

    let registry = client(ledger, signer, &source);
    let registration = IdentityRegistration::new("Maria", "MX", "selfie", "1234567890");
    let err = registry.register_identity(&registration).await.unwrap_err();

    assert_eq!(err.stage, Stage::Prepared);
    assert_eq!(
        err.error,
        BridgeError::SimulationRejected("HostError: Error(Auth, InvalidAction)".to_string())
    );
    assert!(!err.is_resubmittable());
    assert_eq!(sign_calls.load(Ordering::SeqCst), 0);
    assert!(submitted.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_source_account_fails_at_build() {
    let ledger = FakeLedger::new(&address(1), write_simulation());
    let simulated = ledger.simulated.clone();

    let registry = client(ledger, FakeSigner::approving(), &address(2));
    let err = registry.verify_identity(&address(3)).await.unwrap_err();

    assert_eq!(err.stage, Stage::Built);
    assert!(matches!(err.error, BridgeError::AccountLookupFailed(_)));
    assert!(simulated.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_declined_signature_is_reported_and_resubmittable() {
    let source = address(1);
    let ledger = FakeLedger::new(&source, write_simulation());
    let submitted = ledger.submitted.clone();

    let registry = client(ledger, FakeSigner::declining("User declined access"), &source);
    let err = registry.verify_identity(&address(4)).await.unwrap_err();

    assert_eq!(err.stage, Stage::Signed);
    assert!(matches!(&err.error, BridgeError::SigningRejected(msg) if msg.contains("User declined access")));
    assert!(err.is_resubmittable());
    assert!(submitted.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_network_rejection_fails_at_submission() {
    let source = address(1);
    let mut ledger = FakeLedger::new(&source, write_simulation());
    ledger.submission = Ok(SendTransactionResponse {
        status: SendStatus::Error,
        hash: "e2b9f1c7".to_string(),
        latest_ledger: 501,
        error_result_xdr: Some("AAAAAAAAAGT////7AAAAAA==".to_string()),
    });

    let registry = client(ledger, FakeSigner::approving(), &source);
    let err = registry.verify_identity(&address(4)).await.unwrap_err();

    assert_eq!(err.stage, Stage::Submitted);
    assert!(matches!(&err.error, BridgeError::SubmissionFailed { status, .. } if status == "ERROR"));
}

#[tokio::test]
async fn test_verify_identity_targets_user_from_source_account() {
    let source = address(1);
    let user = address(8);
    let ledger = FakeLedger::new(&source, write_simulation());
    let simulated = ledger.simulated.clone();

    let registry = client(ledger, FakeSigner::approving(), &source);
    registry.verify_identity(&user).await.unwrap();

    let simulated = simulated.lock().unwrap();
    let call = invocation(&simulated[0]);
    assert_eq!(call.function_name.0.as_slice(), b"verify_identity");
    assert_eq!(call.args.len(), 1);
    let ScVal::Address(target) = &call.args[0] else {
        panic!("expected an address argument");
    };
    assert_eq!(target.to_string(), user);
}

#[tokio::test]
async fn test_get_identity_decodes_record() {
    let source = address(1);
    let ledger = FakeLedger::new(&source, read_simulation(Some(identity_retval())));
    let submitted = ledger.submitted.clone();
    let signer = FakeSigner::approving();
    let sign_calls = signer.calls.clone();

    let registry = client(ledger, signer, &source);
    let lookup = registry.get_identity(&source).await.unwrap();

    let record = lookup.found().expect("identity should be found");
    assert_eq!(record.name.as_deref(), Some("Maria"));
    assert_eq!(record.country.as_deref(), Some("MX"));
    assert_eq!(record.doc_type.as_deref(), Some("selfie"));
    assert_eq!(record.doc_hash.as_deref(), Some("1234567890"));
    assert!(!record.verified);

    // reads never sign or submit
    assert_eq!(sign_calls.load(Ordering::SeqCst), 0);
    assert!(submitted.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_get_identity_simulation_error() {
    let source = address(1);
    let ledger = FakeLedger::new(
        &source,
        SimulateResponse {
            error: Some("HostError: Error(WasmVm, InvalidAction)".to_string()),
            ..Default::default()
        },
    );

    let registry = client(ledger, FakeSigner::approving(), &source);
    let err = registry.get_identity(&source).await.unwrap_err();

    assert_eq!(err.stage, Stage::Simulated);
    assert!(matches!(err.error, BridgeError::SimulationError(_)));
}

#[tokio::test]
async fn test_get_identity_without_retval_is_not_found() {
    let source = address(1);

    let registry = client(FakeLedger::new(&source, read_simulation(None)), FakeSigner::approving(), &source);
    assert_eq!(registry.get_identity(&source).await.unwrap(), IdentityLookup::NotFound);

    let void = b64(ScVal::Void.to_xdr(Limits::none()).unwrap());
    let registry = client(FakeLedger::new(&source, read_simulation(Some(void))), FakeSigner::approving(), &source);
    assert_eq!(registry.get_identity(&source).await.unwrap(), IdentityLookup::NotFound);
}

#[tokio::test]
async fn test_get_identity_keeps_fields_around_unreadable_entries() {
    let source = address(1);
    let symbol = |s: &str| ScVal::Symbol(stellar_xdr::curr::ScSymbol(s.try_into().unwrap()));
    let string = |s: &str| ScVal::String(stellar_xdr::curr::ScString(s.try_into().unwrap()));
    let nested_key = ScVal::Map(Some(ScMap(
        vec![ScMapEntry { key: symbol("a"), val: ScVal::U32(1) }].try_into().unwrap(),
    )));
    let entries: Vec<ScMapEntry> = vec![
        ScMapEntry { key: symbol("country"), val: ScVal::Void },
        ScMapEntry { key: nested_key, val: string("orphan") },
        ScMapEntry { key: symbol("name"), val: string("Maria") },
        ScMapEntry { key: symbol("verified"), val: string("true") },
    ];
    let retval = ScVal::Map(Some(ScMap(entries.try_into().unwrap())));
    let ledger = FakeLedger::new(&source, read_simulation(Some(b64(retval.to_xdr(Limits::none()).unwrap()))));

    let registry = client(ledger, FakeSigner::approving(), &source);
    let lookup = registry.get_identity(&source).await.unwrap();

    let record = lookup.found().unwrap();
    assert_eq!(record.name.as_deref(), Some("Maria"));
    assert_eq!(record.country, None);
    assert!(record.verified);
}

#[tokio::test]
async fn test_get_identity_unreadable_payload_fails_at_decode() {
    let source = address(1);
    let retval = b64(ScVal::U32(12).to_xdr(Limits::none()).unwrap());
    let registry = client(FakeLedger::new(&source, read_simulation(Some(retval))), FakeSigner::approving(), &source);

    let err = registry.get_identity(&source).await.unwrap_err();
    assert_eq!(err.stage, Stage::Decoded);
    assert!(matches!(err.error, BridgeError::DecodeUnsupportedVariant(_)));
}

#[tokio::test]
async fn test_concurrent_reads_are_independent() {
    let source = address(1);
    let ledger = FakeLedger::new(&source, read_simulation(Some(identity_retval())));
    let simulated = ledger.simulated.clone();
    let registry = client(ledger, FakeSigner::approving(), &source);

    let other = address(5);
    let (a, b) = tokio::join!(registry.get_identity(&source), registry.get_identity(&other));

    assert!(a.unwrap().found().is_some());
    assert!(b.unwrap().found().is_some());
    // no caching: each read simulates
    assert_eq!(simulated.lock().unwrap().len(), 2);
}
