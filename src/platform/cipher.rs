//! Signature and throttling deciphering for a single player script

use crate::config::CipherConfig;
use crate::error::CipherError;
use crate::platform::interpreter::Interpreter;
use crate::platform::plan::{PlanBuilder, SignaturePlan, ThrottlingProgram};
use crate::Result;
use tracing::debug;

/// Both recovered plans of one player script, ready to run.
///
/// Deciphering takes `&self` and allocates its own working sequence, so a
/// single `Cipher` (usually behind an `Arc`) serves concurrent requests.
#[derive(Debug, Clone)]
pub struct Cipher {
    signature: SignaturePlan,
    throttling: ThrottlingProgram,
    interpreter: Interpreter,
}

impl Cipher {
    /// Parse `js` with the default configuration
    pub fn from_script(js: &str) -> Result<Self> {
        Self::from_script_with_config(js, &CipherConfig::default())
    }

    /// Parse `js`, rejecting scripts above `config.max_script_bytes`.
    ///
    /// Both plans must be recovered; a script that yields only one of them
    /// is an error.
    pub fn from_script_with_config(js: &str, config: &CipherConfig) -> Result<Self> {
        if js.len() > config.max_script_bytes {
            return Err(CipherError::ScriptTooLarge {
                size: js.len(),
                limit: config.max_script_bytes,
            });
        }

        let builder = PlanBuilder::new()?;
        let signature = builder.build_signature_plan(js)?;
        let throttling = builder.build_throttling_plan(js)?;
        debug!(
            "Parsed player script: {} signature statements, {} throttling steps",
            signature.transforms.len(),
            throttling.plan.len()
        );

        Self::from_plans(signature, throttling)
    }

    /// Reassemble a cipher from previously built (e.g. deserialized) plans
    pub fn from_plans(signature: SignaturePlan, throttling: ThrottlingProgram) -> Result<Self> {
        Ok(Self {
            signature,
            throttling,
            interpreter: Interpreter::new()?,
        })
    }

    pub fn signature_plan(&self) -> &SignaturePlan {
        &self.signature
    }

    pub fn throttling_program(&self) -> &ThrottlingProgram {
        &self.throttling
    }

    /// Decipher the `s` value of a `signatureCipher`
    pub fn decipher_signature(&self, signature: &str) -> Result<String> {
        self.interpreter.decipher_signature(
            signature,
            &self.signature.transforms,
            &self.signature.map,
        )
    }

    /// Transform the `n` query parameter
    pub fn decipher_throttling(&self, n: &str) -> Result<String> {
        self.interpreter.decipher_throttling(n, &self.throttling)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::fixtures::{INDIRECT_PLAYER_JS, PLAYER_JS};
    use std::sync::Arc;
    use std::thread;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    #[test]
    fn test_decipher_from_script() -> anyhow::Result<()> {
        init_tracing();
        let cipher = Cipher::from_script(PLAYER_JS)?;

        assert_eq!(cipher.decipher_signature("0123456789")?, "476583012");
        assert_eq!(
            cipher.decipher_signature("ABCDEFGHIJKLMNOPQRSTUVWXYZabcdef")?,
            "edcbaZYXWVUTSRQPONMLKJIHGFEDABC"
        );
        assert_eq!(cipher.decipher_throttling("abcdefgh")?, "aegcdxhb-1186681367");
        assert_eq!(
            cipher.decipher_throttling("0123456789ab")?,
            "04a876523xb1-1186681367"
        );
        Ok(())
    }

    #[test]
    fn test_repeated_calls_are_independent() -> anyhow::Result<()> {
        let cipher = Cipher::from_script(PLAYER_JS)?;
        let first = cipher.decipher_throttling("abcdefgh")?;
        let second = cipher.decipher_throttling("abcdefgh")?;
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn test_requires_both_plans() {
        let err = Cipher::from_script(INDIRECT_PLAYER_JS).unwrap_err();
        assert!(matches!(err, CipherError::NoPatternMatched(_)));
        assert!(err.is_stale_script());
    }

    #[test]
    fn test_script_size_limit() {
        let config = CipherConfig::default().with_max_script_bytes(64);
        let err = Cipher::from_script_with_config(PLAYER_JS, &config).unwrap_err();
        match err {
            CipherError::ScriptTooLarge { size, limit } => {
                assert_eq!(size, PLAYER_JS.len());
                assert_eq!(limit, 64);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_plans_survive_serialization() -> anyhow::Result<()> {
        let cipher = Cipher::from_script(PLAYER_JS)?;
        let signature: SignaturePlan =
            serde_json::from_str(&serde_json::to_string(cipher.signature_plan())?)?;
        let throttling: ThrottlingProgram =
            serde_json::from_str(&serde_json::to_string(cipher.throttling_program())?)?;
        assert_eq!(&signature, cipher.signature_plan());

        let restored = Cipher::from_plans(signature, throttling)?;
        assert_eq!(restored.decipher_signature("0123456789")?, "476583012");
        assert_eq!(restored.decipher_throttling("abcdefgh")?, "aegcdxhb-1186681367");
        Ok(())
    }

    #[test]
    fn test_shared_across_threads() -> anyhow::Result<()> {
        let cipher = Arc::new(Cipher::from_script(PLAYER_JS)?);
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cipher = Arc::clone(&cipher);
                thread::spawn(move || cipher.decipher_throttling("abcdefgh"))
            })
            .collect();
        for handle in handles {
            let out = handle.join().map_err(|_| anyhow::anyhow!("worker panicked"))??;
            assert_eq!(out, "aegcdxhb-1186681367");
        }
        Ok(())
    }
}
