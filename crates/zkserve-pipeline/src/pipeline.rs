//! Stage operation implementations.

use std::sync::Arc;

use chrono::Utc;

use zkserve_core::{ArtifactKind, ModelId, RequestArtifactKind, RequestId, StorageError, UserId};
use zkserve_engine::{
    CompiledContract, ContractCompiler, ProofRecord, ProofSummary, ProvingEngine,
    VisibilityConfig,
};
use zkserve_ledger::CreditLedger;
use zkserve_store::ArtifactStore;
use zkserve_tensor::{voice_input, FeatureExtractor, InputTensor};

use crate::error::PipelineError;
use crate::stage::{ModelManifest, ModelStage};

/// Owns all stage logic. Reads and writes the artifact store and the credit
/// ledger; callers (the orchestrator's workers) never touch either
/// directly.
///
/// Methods are blocking and expect the caller to hold the model's job lock,
/// which is what makes the check-then-write sequences inside each stage
/// race-free.
pub struct ProofPipeline {
    store: ArtifactStore,
    ledger: CreditLedger,
    engine: Arc<dyn ProvingEngine>,
    contracts: Arc<dyn ContractCompiler>,
    features: Arc<dyn FeatureExtractor>,
    visibility: VisibilityConfig,
}

impl ProofPipeline {
    /// Assemble a pipeline over its collaborators.
    pub fn new(
        store: ArtifactStore,
        ledger: CreditLedger,
        engine: Arc<dyn ProvingEngine>,
        contracts: Arc<dyn ContractCompiler>,
        features: Arc<dyn FeatureExtractor>,
    ) -> Self {
        Self {
            store,
            ledger,
            engine,
            contracts,
            features,
            visibility: VisibilityConfig::default(),
        }
    }

    /// The artifact store this pipeline writes to.
    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// The credit ledger gating proof generation.
    pub fn ledger(&self) -> &CreditLedger {
        &self.ledger
    }

    // -- Model lifecycle ----------------------------------------------------

    /// Load a model's manifest.
    ///
    /// # Errors
    ///
    /// [`PipelineError::ModelNotFound`] if the model was never registered.
    pub fn manifest(&self, model: &ModelId) -> Result<ModelManifest, PipelineError> {
        let bytes = match self.store.get(model, ArtifactKind::Manifest) {
            Ok(bytes) => bytes,
            Err(e) if e.is_not_found() => {
                return Err(PipelineError::ModelNotFound(model.clone()))
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&bytes).map_err(|e| {
            PipelineError::Storage(StorageError::Corrupt {
                path: self.store.artifact_path(model, ArtifactKind::Manifest),
                reason: e.to_string(),
            })
        })
    }

    /// Current pipeline stage of a model.
    pub fn stage(&self, model: &ModelId) -> Result<ModelStage, PipelineError> {
        Ok(self.manifest(model)?.stage)
    }

    /// Register a new model: create its namespace, record the uploaded
    /// blob, write the manifest at `Registered`, and seed the ledger.
    pub fn register(&self, model: &ModelId, blob: &[u8]) -> Result<(), PipelineError> {
        if self.store.model_exists(model) {
            return Err(PipelineError::ModelExists(model.clone()));
        }
        self.store.ensure_layout(model)?;
        self.store.put(model, ArtifactKind::ModelBlob, blob)?;
        self.save_manifest(&ModelManifest::new(model.clone()))?;
        self.ledger.init_model(model)?;
        tracing::info!(model = %model, "model registered");
        Ok(())
    }

    /// Compile the model's circuit: `Registered → CircuitCompiled`.
    ///
    /// Persists the compiled circuit and settings, fetches the SRS if this
    /// model does not have one yet, and only then advances the stage.
    pub fn compile(&self, model: &ModelId) -> Result<(), PipelineError> {
        let manifest = self.manifest(model)?;
        self.require_stage(&manifest, "compile", ModelStage::Registered)?;

        let blob = self.store.get(model, ArtifactKind::ModelBlob)?;
        let bundle = self
            .engine
            .compile(&blob, &self.visibility)
            .map_err(|e| PipelineError::engine("compile", e))?;
        self.store.put(model, ArtifactKind::CompiledCircuit, &bundle.circuit)?;
        self.store.put(model, ArtifactKind::Settings, &bundle.settings)?;

        // SRS is fetched at most once per model, keyed by existence.
        if !self.store.exists(model, ArtifactKind::Srs) {
            let srs = self
                .engine
                .fetch_srs(&bundle.settings)
                .map_err(|e| PipelineError::engine("fetch_srs", e))?;
            self.store.put(model, ArtifactKind::Srs, &srs)?;
        }

        self.advance(manifest, ModelStage::CircuitCompiled)?;
        tracing::info!(model = %model, "circuit compiled");
        Ok(())
    }

    /// Run cryptographic setup and emit the verifier:
    /// `CircuitCompiled → KeysReady`.
    pub fn setup(&self, model: &ModelId) -> Result<(), PipelineError> {
        let manifest = self.manifest(model)?;
        self.require_stage(&manifest, "setup", ModelStage::CircuitCompiled)?;

        let circuit = self.store.get(model, ArtifactKind::CompiledCircuit)?;
        let srs = self.store.get(model, ArtifactKind::Srs)?;
        let keys = self
            .engine
            .setup_keys(&circuit, &srs)
            .map_err(|e| PipelineError::engine("setup", e))?;
        self.store.put(model, ArtifactKind::ProvingKey, &keys.proving_key)?;
        self.store
            .put(model, ArtifactKind::VerificationKey, &keys.verification_key)?;

        let settings = self.store.get(model, ArtifactKind::Settings)?;
        let contract = self
            .engine
            .emit_verifier(&keys.verification_key, &settings, &srs)
            .map_err(|e| PipelineError::engine("emit_verifier", e))?;
        self.store
            .put(model, ArtifactKind::VerifierContract, contract.source.as_bytes())?;
        let abi = serde_json::to_vec(&contract.abi).map_err(|e| {
            PipelineError::Storage(StorageError::Corrupt {
                path: self.store.artifact_path(model, ArtifactKind::VerifierAbi),
                reason: e.to_string(),
            })
        })?;
        self.store.put(model, ArtifactKind::VerifierAbi, &abi)?;

        self.advance(manifest, ModelStage::KeysReady)?;
        tracing::info!(model = %model, "keys ready, verifier emitted");
        Ok(())
    }

    // -- Per-request sub-pipeline -------------------------------------------

    /// Record a submitted input under a fresh request uuid.
    pub fn upload_input(
        &self,
        model: &ModelId,
        input: &InputTensor,
    ) -> Result<RequestId, PipelineError> {
        // Existence check only; inputs may be uploaded at any stage.
        let _ = self.manifest(model)?;
        let request = RequestId::generate();
        let bytes = input.to_bytes()?;
        self.store
            .put_request(model, &request, RequestArtifactKind::Input, &bytes)?;
        tracing::debug!(model = %model, request = %request, "input recorded");
        Ok(request)
    }

    /// Generate the witness for a recorded input.
    ///
    /// Idempotent: the engine is deterministic, so re-running with the same
    /// input overwrites the witness with identical bytes.
    pub fn generate_witness(
        &self,
        model: &ModelId,
        request: &RequestId,
    ) -> Result<(), PipelineError> {
        let manifest = self.manifest(model)?;
        if manifest.stage < ModelStage::CircuitCompiled {
            return Err(PipelineError::WrongStage {
                model: model.clone(),
                operation: "generate_witness",
                required: ModelStage::CircuitCompiled,
                actual: manifest.stage,
            });
        }
        let input = match self.store.get_request(model, request, RequestArtifactKind::Input) {
            Ok(bytes) => bytes,
            Err(e) if e.is_not_found() => {
                return Err(PipelineError::MissingInput {
                    model: model.clone(),
                    request: *request,
                })
            }
            Err(e) => return Err(e.into()),
        };
        let circuit = self.store.get(model, ArtifactKind::CompiledCircuit)?;
        let witness = self
            .engine
            .generate_witness(&input, &circuit)
            .map_err(|e| PipelineError::engine("generate_witness", e))?;
        self.store
            .put_request(model, request, RequestArtifactKind::Witness, &witness)?;
        tracing::debug!(model = %model, request = %request, "witness generated");
        Ok(())
    }

    /// Generate a proof for a witnessed request, debiting the caller's
    /// credit account.
    ///
    /// Order matters: the witness requirement is checked and every artifact
    /// loaded *before* the debit, so a granted debit can only be followed
    /// by an actual engine attempt. An engine failure after the debit
    /// refunds it.
    pub fn prove(
        &self,
        user: &UserId,
        model: &ModelId,
        request: &RequestId,
    ) -> Result<ProofSummary, PipelineError> {
        let manifest = self.manifest(model)?;
        self.require_stage(&manifest, "prove", ModelStage::KeysReady)?;

        let witness = match self.store.get_request(model, request, RequestArtifactKind::Witness) {
            Ok(bytes) => bytes,
            Err(e) if e.is_not_found() => {
                return Err(PipelineError::MissingWitness {
                    model: model.clone(),
                    request: *request,
                })
            }
            Err(e) => return Err(e.into()),
        };
        let circuit = self.store.get(model, ArtifactKind::CompiledCircuit)?;
        let proving_key = self.store.get(model, ArtifactKind::ProvingKey)?;
        let srs = self.store.get(model, ArtifactKind::Srs)?;

        let account = self.ledger.check_and_debit(user, model)?;
        tracing::debug!(
            user = %user,
            model = %model,
            used = account.off_chain_requests,
            total = account.total_requests,
            "debit granted"
        );

        let record = match self.engine.generate_proof(&witness, &circuit, &proving_key, &srs) {
            Ok(record) => record,
            Err(e) => {
                // The attempt failed inside the engine; return the debit.
                if let Err(refund_err) = self.ledger.refund(user, model) {
                    tracing::error!(user = %user, model = %model, error = %refund_err, "refund failed");
                }
                return Err(PipelineError::engine("prove", e));
            }
        };

        let summary = record.summary().ok_or_else(|| {
            PipelineError::engine(
                "prove",
                zkserve_engine::EngineError::Prove("engine returned record with no outputs".into()),
            )
        })?;

        let bytes = serde_json::to_vec(&record).map_err(|e| {
            PipelineError::Storage(StorageError::Corrupt {
                path: self.store.request_path(model, request, RequestArtifactKind::Proof),
                reason: e.to_string(),
            })
        })?;
        self.store
            .put_request(model, request, RequestArtifactKind::Proof, &bytes)?;
        tracing::info!(model = %model, request = %request, user = %user, "proof generated");
        Ok(summary)
    }

    /// Verify a generated proof against a deployed verifier contract.
    pub fn verify(
        &self,
        model: &ModelId,
        request: &RequestId,
        contract_address: &str,
        rpc_url: &str,
    ) -> Result<bool, PipelineError> {
        let bytes = match self.store.get_request(model, request, RequestArtifactKind::Proof) {
            Ok(bytes) => bytes,
            Err(e) if e.is_not_found() => {
                return Err(PipelineError::MissingProof {
                    model: model.clone(),
                    request: *request,
                })
            }
            Err(e) => return Err(e.into()),
        };
        let record: ProofRecord = serde_json::from_slice(&bytes).map_err(|e| {
            PipelineError::Storage(StorageError::Corrupt {
                path: self.store.request_path(model, request, RequestArtifactKind::Proof),
                reason: e.to_string(),
            })
        })?;
        let verified = self
            .engine
            .verify_on_chain(contract_address, &record, rpc_url)
            .map_err(|e| PipelineError::engine("verify", e))?;
        tracing::info!(model = %model, request = %request, verified, "proof verified on chain");
        Ok(verified)
    }

    /// Compile the stored verifier source for download.
    pub fn verifier_bundle(&self, model: &ModelId) -> Result<CompiledContract, PipelineError> {
        let manifest = self.manifest(model)?;
        self.require_stage(&manifest, "verifier_bundle", ModelStage::KeysReady)?;

        let source = self.store.get(model, ArtifactKind::VerifierContract)?;
        let source = String::from_utf8(source).map_err(|e| {
            PipelineError::Storage(StorageError::Corrupt {
                path: self.store.artifact_path(model, ArtifactKind::VerifierContract),
                reason: e.to_string(),
            })
        })?;
        self.contracts
            .compile_verifier(&source)
            .map_err(|e| PipelineError::engine("compile_verifier", e))
    }

    /// Prepare a voice judging input from a raw audio clip.
    pub fn voice_input(&self, audio: &[u8], address: &str) -> Result<InputTensor, PipelineError> {
        Ok(voice_input(self.features.as_ref(), audio, address)?)
    }

    // -- Internals ----------------------------------------------------------

    fn require_stage(
        &self,
        manifest: &ModelManifest,
        operation: &'static str,
        required: ModelStage,
    ) -> Result<(), PipelineError> {
        if manifest.stage != required {
            return Err(PipelineError::WrongStage {
                model: manifest.model_id.clone(),
                operation,
                required,
                actual: manifest.stage,
            });
        }
        Ok(())
    }

    fn advance(&self, mut manifest: ModelManifest, to: ModelStage) -> Result<(), PipelineError> {
        if !manifest.stage.can_advance_to(to) {
            return Err(PipelineError::InvalidTransition {
                model: manifest.model_id.clone(),
                from: manifest.stage,
                to,
            });
        }
        manifest.stage = to;
        manifest.updated_at = Utc::now();
        self.save_manifest(&manifest)
    }

    fn save_manifest(&self, manifest: &ModelManifest) -> Result<(), PipelineError> {
        let bytes = serde_json::to_vec_pretty(manifest).map_err(|e| {
            PipelineError::Storage(StorageError::Corrupt {
                path: self
                    .store
                    .artifact_path(&manifest.model_id, ArtifactKind::Manifest),
                reason: e.to_string(),
            })
        })?;
        self.store
            .put(&manifest.model_id, ArtifactKind::Manifest, &bytes)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use zkserve_engine::{
        CompiledCircuitBundle, EngineError, KeyPair, MockContractCompiler, MockEngine,
        VerifierContract,
    };
    use zkserve_tensor::WindowedEnergy;

    fn pipeline_with_engine(
        dir: &TempDir,
        engine: Arc<dyn ProvingEngine>,
        quota: u64,
    ) -> ProofPipeline {
        let store = ArtifactStore::new(dir.path()).unwrap();
        let ledger = CreditLedger::with_default_quota(store.clone(), quota);
        ProofPipeline::new(
            store,
            ledger,
            engine,
            Arc::new(MockContractCompiler),
            Arc::new(WindowedEnergy::default()),
        )
    }

    fn pipeline(dir: &TempDir) -> ProofPipeline {
        pipeline_with_engine(dir, Arc::new(MockEngine), 10)
    }

    fn mid(s: &str) -> ModelId {
        ModelId::new(s).unwrap()
    }

    fn uid(s: &str) -> UserId {
        UserId::new(s).unwrap()
    }

    fn sample_input() -> InputTensor {
        InputTensor::from_bytes(br#"{"input_data": [[1], [0.1, 0.2]]}"#).unwrap()
    }

    /// Register + compile + setup, returning the model id.
    fn setup_model(p: &ProofPipeline, name: &str) -> ModelId {
        let model = mid(name);
        p.register(&model, b"onnx-bytes").unwrap();
        p.compile(&model).unwrap();
        p.setup(&model).unwrap();
        model
    }

    /// Engine that fails every operation; used to assert failed stages
    /// leave no state behind.
    struct BrokenEngine;

    impl ProvingEngine for BrokenEngine {
        fn compile(
            &self,
            _: &[u8],
            _: &VisibilityConfig,
        ) -> Result<CompiledCircuitBundle, EngineError> {
            Err(EngineError::Compile("engine offline".into()))
        }
        fn fetch_srs(&self, _: &[u8]) -> Result<Vec<u8>, EngineError> {
            Err(EngineError::Srs("engine offline".into()))
        }
        fn setup_keys(&self, _: &[u8], _: &[u8]) -> Result<KeyPair, EngineError> {
            Err(EngineError::Setup("engine offline".into()))
        }
        fn emit_verifier(
            &self,
            _: &[u8],
            _: &[u8],
            _: &[u8],
        ) -> Result<VerifierContract, EngineError> {
            Err(EngineError::Verifier("engine offline".into()))
        }
        fn generate_witness(&self, _: &[u8], _: &[u8]) -> Result<Vec<u8>, EngineError> {
            Err(EngineError::Witness("engine offline".into()))
        }
        fn generate_proof(
            &self,
            _: &[u8],
            _: &[u8],
            _: &[u8],
            _: &[u8],
        ) -> Result<ProofRecord, EngineError> {
            Err(EngineError::Prove("engine offline".into()))
        }
        fn verify_on_chain(
            &self,
            _: &str,
            _: &ProofRecord,
            _: &str,
        ) -> Result<bool, EngineError> {
            Err(EngineError::Verify("engine offline".into()))
        }
    }

    /// MockEngine with proof generation broken; everything up to prove works.
    struct ProveFailsEngine;

    impl ProvingEngine for ProveFailsEngine {
        fn compile(
            &self,
            model: &[u8],
            v: &VisibilityConfig,
        ) -> Result<CompiledCircuitBundle, EngineError> {
            MockEngine.compile(model, v)
        }
        fn fetch_srs(&self, settings: &[u8]) -> Result<Vec<u8>, EngineError> {
            MockEngine.fetch_srs(settings)
        }
        fn setup_keys(&self, c: &[u8], s: &[u8]) -> Result<KeyPair, EngineError> {
            MockEngine.setup_keys(c, s)
        }
        fn emit_verifier(
            &self,
            vk: &[u8],
            s: &[u8],
            srs: &[u8],
        ) -> Result<VerifierContract, EngineError> {
            MockEngine.emit_verifier(vk, s, srs)
        }
        fn generate_witness(&self, i: &[u8], c: &[u8]) -> Result<Vec<u8>, EngineError> {
            MockEngine.generate_witness(i, c)
        }
        fn generate_proof(
            &self,
            _: &[u8],
            _: &[u8],
            _: &[u8],
            _: &[u8],
        ) -> Result<ProofRecord, EngineError> {
            Err(EngineError::Prove("prover crashed".into()))
        }
        fn verify_on_chain(
            &self,
            a: &str,
            p: &ProofRecord,
            r: &str,
        ) -> Result<bool, EngineError> {
            MockEngine.verify_on_chain(a, p, r)
        }
    }

    // -- Model lifecycle ------------------------------------------------------

    #[test]
    fn full_lifecycle_reaches_keys_ready_with_all_artifacts() {
        let dir = TempDir::new().unwrap();
        let p = pipeline(&dir);
        let model = setup_model(&p, "m1");

        assert_eq!(p.stage(&model).unwrap(), ModelStage::KeysReady);
        for kind in [
            ArtifactKind::ModelBlob,
            ArtifactKind::CompiledCircuit,
            ArtifactKind::Settings,
            ArtifactKind::Srs,
            ArtifactKind::ProvingKey,
            ArtifactKind::VerificationKey,
            ArtifactKind::VerifierContract,
            ArtifactKind::VerifierAbi,
        ] {
            assert!(p.store().exists(&model, kind), "{kind} should exist");
        }
    }

    #[test]
    fn register_rejects_duplicate_model() {
        let dir = TempDir::new().unwrap();
        let p = pipeline(&dir);
        let model = mid("m1");
        p.register(&model, b"blob").unwrap();

        let err = p.register(&model, b"blob").unwrap_err();
        assert!(matches!(err, PipelineError::ModelExists(_)));
        // Still at Registered, not corrupted.
        assert_eq!(p.stage(&model).unwrap(), ModelStage::Registered);
    }

    #[test]
    fn setup_before_compile_is_rejected() {
        let dir = TempDir::new().unwrap();
        let p = pipeline(&dir);
        let model = mid("m1");
        p.register(&model, b"blob").unwrap();

        let err = p.setup(&model).unwrap_err();
        assert!(matches!(err, PipelineError::WrongStage { .. }));
        assert_eq!(p.stage(&model).unwrap(), ModelStage::Registered);
    }

    #[test]
    fn compile_twice_is_rejected_without_corruption() {
        let dir = TempDir::new().unwrap();
        let p = pipeline(&dir);
        let model = mid("m1");
        p.register(&model, b"blob").unwrap();
        p.compile(&model).unwrap();

        let circuit_before = p.store().get(&model, ArtifactKind::CompiledCircuit).unwrap();
        let err = p.compile(&model).unwrap_err();
        assert!(matches!(err, PipelineError::WrongStage { .. }));
        assert_eq!(p.stage(&model).unwrap(), ModelStage::CircuitCompiled);
        assert_eq!(
            p.store().get(&model, ArtifactKind::CompiledCircuit).unwrap(),
            circuit_before
        );
    }

    #[test]
    fn failed_compile_leaves_model_at_registered() {
        let dir = TempDir::new().unwrap();
        let p = pipeline_with_engine(&dir, Arc::new(BrokenEngine), 10);
        let model = mid("m1");
        p.register(&model, b"blob").unwrap();

        let err = p.compile(&model).unwrap_err();
        assert!(matches!(err, PipelineError::Engine { stage: "compile", .. }));
        assert_eq!(p.stage(&model).unwrap(), ModelStage::Registered);
        assert!(!p.store().exists(&model, ArtifactKind::CompiledCircuit));
    }

    #[test]
    fn srs_is_not_refetched_when_present() {
        let dir = TempDir::new().unwrap();
        let p = pipeline(&dir);
        let model = mid("m1");
        p.register(&model, b"blob").unwrap();
        // Pre-seeded SRS must survive compilation untouched.
        p.store().put(&model, ArtifactKind::Srs, b"pinned-srs").unwrap();

        p.compile(&model).unwrap();
        assert_eq!(p.store().get(&model, ArtifactKind::Srs).unwrap(), b"pinned-srs");
    }

    #[test]
    fn unknown_model_is_not_found() {
        let dir = TempDir::new().unwrap();
        let p = pipeline(&dir);
        let err = p.compile(&mid("ghost")).unwrap_err();
        assert!(matches!(err, PipelineError::ModelNotFound(_)));
    }

    // -- Per-request sub-pipeline ---------------------------------------------

    #[test]
    fn end_to_end_request_flow() {
        let dir = TempDir::new().unwrap();
        let p = pipeline(&dir);
        let model = setup_model(&p, "m1");
        let user = uid("0xABC");

        let request = p.upload_input(&model, &sample_input()).unwrap();
        p.generate_witness(&model, &request).unwrap();

        let summary = p.prove(&user, &model, &request).unwrap();
        assert!(!summary.proof_hex.is_empty());
        assert!(!summary.output_hex.is_empty());

        let account = p.ledger().balance(&user, &model).unwrap();
        assert_eq!(account.off_chain_requests, 1);

        let verified = p
            .verify(&model, &request, "0xC0FFEE", "http://localhost:8545")
            .unwrap();
        assert!(verified);
    }

    #[test]
    fn witness_before_compile_is_rejected() {
        let dir = TempDir::new().unwrap();
        let p = pipeline(&dir);
        let model = mid("m1");
        p.register(&model, b"blob").unwrap();
        let request = p.upload_input(&model, &sample_input()).unwrap();

        let err = p.generate_witness(&model, &request).unwrap_err();
        assert!(matches!(err, PipelineError::WrongStage { .. }));
    }

    #[test]
    fn witness_without_input_is_missing_input() {
        let dir = TempDir::new().unwrap();
        let p = pipeline(&dir);
        let model = setup_model(&p, "m1");

        let err = p.generate_witness(&model, &RequestId::generate()).unwrap_err();
        assert!(matches!(err, PipelineError::MissingInput { .. }));
    }

    #[test]
    fn witness_regeneration_is_byte_identical() {
        let dir = TempDir::new().unwrap();
        let p = pipeline(&dir);
        let model = setup_model(&p, "m1");
        let request = p.upload_input(&model, &sample_input()).unwrap();

        p.generate_witness(&model, &request).unwrap();
        let first = p
            .store()
            .get_request(&model, &request, RequestArtifactKind::Witness)
            .unwrap();

        p.generate_witness(&model, &request).unwrap();
        let second = p
            .store()
            .get_request(&model, &request, RequestArtifactKind::Witness)
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn prove_without_witness_does_not_touch_ledger() {
        let dir = TempDir::new().unwrap();
        let p = pipeline(&dir);
        let model = setup_model(&p, "m1");
        let user = uid("0xABC");
        let request = p.upload_input(&model, &sample_input()).unwrap();

        let err = p.prove(&user, &model, &request).unwrap_err();
        assert!(matches!(err, PipelineError::MissingWitness { .. }));
        assert_eq!(p.ledger().balance(&user, &model).unwrap().off_chain_requests, 0);
    }

    #[test]
    fn prove_past_quota_never_reaches_engine() {
        let dir = TempDir::new().unwrap();
        let p = pipeline_with_engine(&dir, Arc::new(MockEngine), 1);
        let model = setup_model(&p, "m1");
        let user = uid("0xABC");
        let request = p.upload_input(&model, &sample_input()).unwrap();
        p.generate_witness(&model, &request).unwrap();

        p.prove(&user, &model, &request).unwrap();
        let err = p.prove(&user, &model, &request).unwrap_err();
        assert!(err.is_quota_exceeded());

        // The rejected attempt is not billed.
        assert_eq!(p.ledger().balance(&user, &model).unwrap().off_chain_requests, 1);
    }

    #[test]
    fn engine_failure_refunds_the_debit() {
        let dir = TempDir::new().unwrap();
        let p = pipeline_with_engine(&dir, Arc::new(ProveFailsEngine), 5);
        let model = setup_model(&p, "m1");
        let user = uid("0xABC");
        let request = p.upload_input(&model, &sample_input()).unwrap();
        p.generate_witness(&model, &request).unwrap();

        let err = p.prove(&user, &model, &request).unwrap_err();
        assert!(matches!(err, PipelineError::Engine { stage: "prove", .. }));
        assert_eq!(p.ledger().balance(&user, &model).unwrap().off_chain_requests, 0);
        assert!(!p.store().request_exists(&model, &request, RequestArtifactKind::Proof));
    }

    #[test]
    fn verify_without_proof_is_missing_proof() {
        let dir = TempDir::new().unwrap();
        let p = pipeline(&dir);
        let model = setup_model(&p, "m1");

        let err = p
            .verify(&model, &RequestId::generate(), "0xC0FFEE", "http://x")
            .unwrap_err();
        assert!(matches!(err, PipelineError::MissingProof { .. }));
    }

    #[test]
    fn verifier_bundle_requires_keys_ready() {
        let dir = TempDir::new().unwrap();
        let p = pipeline(&dir);
        let model = mid("m1");
        p.register(&model, b"blob").unwrap();

        let err = p.verifier_bundle(&model).unwrap_err();
        assert!(matches!(err, PipelineError::WrongStage { .. }));
    }

    #[test]
    fn verifier_bundle_returns_abi_and_bytecode() {
        let dir = TempDir::new().unwrap();
        let p = pipeline(&dir);
        let model = setup_model(&p, "m1");

        let bundle = p.verifier_bundle(&model).unwrap();
        assert!(!bundle.bin.is_empty());
        assert_eq!(bundle.abi[0]["name"], "verifyProof");
    }

    #[test]
    fn voice_input_produces_recorded_shape() {
        let dir = TempDir::new().unwrap();
        let p = pipeline(&dir);
        let tensor = p.voice_input(&[9u8; 4096], "0xABC").unwrap();
        assert_eq!(tensor.input_data.len(), 2);
    }
}
