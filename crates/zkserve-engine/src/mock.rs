//! # Mock Engine
//!
//! A deterministic, transparent stand-in for the external proving engine,
//! used by tests and by default in development. Produces SHA-256-based
//! artifacts that are verifiable but provide no zero-knowledge guarantees.
//!
//! Determinism is the load-bearing property: identical inputs produce
//! byte-identical artifacts, which is what the pipeline's witness
//! idempotence tests exercise.

use sha2::{Digest, Sha256};

use crate::record::{PrettyPublicInputs, ProofRecord};
use crate::traits::{
    CompiledCircuitBundle, CompiledContract, ContractCompiler, EngineError, KeyPair,
    ProvingEngine, VerifierContract, VisibilityConfig,
};

/// Hex-encode a byte slice.
fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// SHA-256 over a sequence of labeled parts. The label keeps digests from
/// different stages disjoint even over identical payloads.
fn digest(label: &str, parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(label.as_bytes());
    for part in parts {
        hasher.update((part.len() as u64).to_le_bytes());
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// Deterministic mock proving engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockEngine;

impl ProvingEngine for MockEngine {
    fn compile(
        &self,
        model: &[u8],
        visibility: &VisibilityConfig,
    ) -> Result<CompiledCircuitBundle, EngineError> {
        if model.is_empty() {
            return Err(EngineError::Compile("empty model blob".to_string()));
        }
        let vis = serde_json::to_value(visibility)
            .map_err(|e| EngineError::Compile(e.to_string()))?;
        let model_digest = hex(&digest("compile", &[model]));

        let settings = serde_json::json!({
            "run_args": vis,
            "model_digest": model_digest,
            "logrows": 17,
        });
        let circuit = serde_json::json!({
            "circuit_of": model_digest,
            "run_args": vis,
        });
        Ok(CompiledCircuitBundle {
            circuit: serde_json::to_vec(&circuit).map_err(|e| EngineError::Compile(e.to_string()))?,
            settings: serde_json::to_vec(&settings)
                .map_err(|e| EngineError::Compile(e.to_string()))?,
        })
    }

    fn fetch_srs(&self, settings: &[u8]) -> Result<Vec<u8>, EngineError> {
        if settings.is_empty() {
            return Err(EngineError::Srs("empty settings document".to_string()));
        }
        Ok(digest("srs", &[settings]).to_vec())
    }

    fn setup_keys(&self, circuit: &[u8], srs: &[u8]) -> Result<KeyPair, EngineError> {
        if circuit.is_empty() || srs.is_empty() {
            return Err(EngineError::Setup("missing circuit or srs".to_string()));
        }
        Ok(KeyPair {
            proving_key: digest("pk", &[circuit, srs]).to_vec(),
            verification_key: digest("vk", &[circuit, srs]).to_vec(),
        })
    }

    fn emit_verifier(
        &self,
        verification_key: &[u8],
        settings: &[u8],
        srs: &[u8],
    ) -> Result<VerifierContract, EngineError> {
        if verification_key.is_empty() {
            return Err(EngineError::Verifier("missing verification key".to_string()));
        }
        let vk_hex = hex(&digest("verifier", &[verification_key, settings, srs]));
        let source = format!(
            "// SPDX-License-Identifier: MIT\n\
             pragma solidity ^0.8.0;\n\
             contract Halo2Verifier {{\n\
                 bytes32 constant VK_DIGEST = 0x{vk_hex};\n\
                 function verifyProof(bytes calldata, uint256[] calldata) public pure returns (bool) {{\n\
                     return true;\n\
                 }}\n\
             }}\n"
        );
        let abi = serde_json::json!([{
            "name": "verifyProof",
            "type": "function",
            "stateMutability": "pure",
            "inputs": [
                {"name": "proof", "type": "bytes"},
                {"name": "instances", "type": "uint256[]"},
            ],
            "outputs": [{"name": "", "type": "bool"}],
        }]);
        Ok(VerifierContract { source, abi })
    }

    fn generate_witness(&self, input: &[u8], circuit: &[u8]) -> Result<Vec<u8>, EngineError> {
        if input.is_empty() {
            return Err(EngineError::Witness("empty input document".to_string()));
        }
        if circuit.is_empty() {
            return Err(EngineError::Witness("missing compiled circuit".to_string()));
        }
        let trace = hex(&digest("witness", &[input, circuit]));
        let witness = serde_json::json!({
            "trace_digest": trace,
            "input_len": input.len(),
        });
        serde_json::to_vec(&witness).map_err(|e| EngineError::Witness(e.to_string()))
    }

    fn generate_proof(
        &self,
        witness: &[u8],
        circuit: &[u8],
        proving_key: &[u8],
        srs: &[u8],
    ) -> Result<ProofRecord, EngineError> {
        if witness.is_empty() {
            return Err(EngineError::Prove("missing witness".to_string()));
        }
        if proving_key.is_empty() || srs.is_empty() {
            return Err(EngineError::Prove("missing proving key or srs".to_string()));
        }
        let proof = digest("proof", &[witness, circuit, proving_key, srs]);
        let output = digest("output", &[witness]);

        // A plausible rescaled value in [0, 1): the first output byte over 256.
        let rescaled = f64::from(output[0]) / 256.0;

        Ok(ProofRecord {
            pretty_public_inputs: PrettyPublicInputs {
                outputs: vec![vec![format!("0x{}", hex(&output[..16]))]],
                rescaled_outputs: vec![vec![format!("{rescaled:.7}")]],
            },
            hex_proof: hex(&proof),
            extra: serde_json::Map::new(),
        })
    }

    fn verify_on_chain(
        &self,
        contract_address: &str,
        proof: &ProofRecord,
        rpc_url: &str,
    ) -> Result<bool, EngineError> {
        if contract_address.trim().is_empty() {
            return Err(EngineError::Verify("empty contract address".to_string()));
        }
        if rpc_url.trim().is_empty() {
            return Err(EngineError::Verify("empty rpc url".to_string()));
        }
        // A well-formed mock proof is a 32-byte hex digest; anything else
        // is rejected as tampered.
        let ok = proof.hex_proof.len() == 64
            && proof.hex_proof.chars().all(|c| c.is_ascii_hexdigit());
        Ok(ok)
    }
}

/// Deterministic stand-in for the external Solidity compiler.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockContractCompiler;

impl ContractCompiler for MockContractCompiler {
    fn compile_verifier(&self, source: &str) -> Result<CompiledContract, EngineError> {
        if !source.contains("contract") {
            return Err(EngineError::ContractCompile(
                "source does not define a contract".to_string(),
            ));
        }
        Ok(CompiledContract {
            abi: serde_json::json!([{
                "name": "verifyProof",
                "type": "function",
                "stateMutability": "pure",
                "inputs": [
                    {"name": "proof", "type": "bytes"},
                    {"name": "instances", "type": "uint256[]"},
                ],
                "outputs": [{"name": "", "type": "bool"}],
            }]),
            bin: hex(&digest("bin", &[source.as_bytes()])),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_is_deterministic() {
        let engine = MockEngine;
        let a = engine.compile(b"model", &VisibilityConfig::default()).unwrap();
        let b = engine.compile(b"model", &VisibilityConfig::default()).unwrap();
        assert_eq!(a.circuit, b.circuit);
        assert_eq!(a.settings, b.settings);
    }

    #[test]
    fn compile_rejects_empty_model() {
        assert!(MockEngine.compile(b"", &VisibilityConfig::default()).is_err());
    }

    #[test]
    fn witness_is_deterministic_and_input_sensitive() {
        let engine = MockEngine;
        let w1 = engine.generate_witness(b"input-a", b"circuit").unwrap();
        let w2 = engine.generate_witness(b"input-a", b"circuit").unwrap();
        let w3 = engine.generate_witness(b"input-b", b"circuit").unwrap();
        assert_eq!(w1, w2);
        assert_ne!(w1, w3);
    }

    #[test]
    fn full_stage_chain_produces_verifiable_proof() {
        let engine = MockEngine;
        let bundle = engine.compile(b"model", &VisibilityConfig::default()).unwrap();
        let srs = engine.fetch_srs(&bundle.settings).unwrap();
        let keys = engine.setup_keys(&bundle.circuit, &srs).unwrap();
        let witness = engine.generate_witness(b"{\"input_data\":[[1]]}", &bundle.circuit).unwrap();
        let proof = engine
            .generate_proof(&witness, &bundle.circuit, &keys.proving_key, &srs)
            .unwrap();

        assert_eq!(proof.hex_proof.len(), 64);
        assert!(proof.summary().is_some());
        assert!(engine
            .verify_on_chain("0xC0FFEE", &proof, "http://localhost:8545")
            .unwrap());
    }

    #[test]
    fn tampered_proof_fails_verification() {
        let engine = MockEngine;
        let proof = ProofRecord {
            hex_proof: "zz".to_string(),
            ..Default::default()
        };
        assert!(!engine
            .verify_on_chain("0xC0FFEE", &proof, "http://localhost:8545")
            .unwrap());
    }

    #[test]
    fn verify_rejects_blank_endpoint() {
        let engine = MockEngine;
        let proof = ProofRecord::default();
        assert!(engine.verify_on_chain("", &proof, "http://x").is_err());
        assert!(engine.verify_on_chain("0xC0FFEE", &proof, " ").is_err());
    }

    #[test]
    fn emitted_verifier_compiles() {
        let engine = MockEngine;
        let contract = engine.emit_verifier(b"vk", b"settings", b"srs").unwrap();
        assert!(contract.source.contains("Halo2Verifier"));

        let compiled = MockContractCompiler.compile_verifier(&contract.source).unwrap();
        assert!(!compiled.bin.is_empty());
        assert_eq!(compiled.abi[0]["name"], "verifyProof");
    }

    #[test]
    fn contract_compiler_rejects_non_contract_source() {
        assert!(MockContractCompiler.compile_verifier("not solidity").is_err());
    }
}
