//! Session orchestrator implementation

use super::cipher::{confirmation_tag, decrypt, derive_session_key, encrypt};
use super::messages::{
    Hello, Receipt, Reply, Sealed, ABORT_INITIATOR_SIGNATURE, ABORT_KEY_MISMATCH,
    ABORT_PARAMETERS, ABORT_RESPONDER_SIGNATURE, ACK_TEXT,
};
use super::{Outcome, SessionConfig, SessionReport, SessionState, SessionSummary};
use crate::analysis::{analyze, SafetyReport};
use crate::keygen::{generate_keys, refresh_exponent, KeyGenConfig};
use crate::random::{RandomSource, SharedRandom};
use crate::sign::{sign, verify};
use crate::transport::{Frame, MemoryTransport, Transport};
use crate::{Error, KeyPair, Result, Role, INITIATOR_ID, RESPONDER_ID};
use num_bigint::BigUint;
use num_traits::{One, Zero};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Run one party's side of the exchange to completion.
///
/// Never fails outright: every error ends the session in `Failed` and is
/// returned inside the report together with the visited states. Session-scoped
/// key material is dropped when this returns.
///
/// # Arguments
/// * `config` - Session configuration (role, IDs, timeout)
/// * `credential` - Shared signing tuple; a fresh exponent is drawn from it
/// * `rng` - Injected randomness
/// * `transport` - Frame transport to the peer
#[instrument(skip_all, fields(party_id = config.party_id, role = %config.role))]
pub async fn run_session<T, R>(
    config: &SessionConfig,
    credential: &KeyPair,
    rng: &mut R,
    transport: &T,
) -> SessionReport
where
    T: Transport + ?Sized,
    R: RandomSource + ?Sized,
{
    info!(
        session_id = hex::encode(config.session_id),
        peer_id = config.peer_id,
        "Starting session"
    );

    let mut session = Session::new(config, transport);
    let result = match config.role {
        Role::Initiator => session.run_initiator(credential, rng).await,
        Role::Responder => session.run_responder(credential, rng).await,
    };

    let outcome = match result {
        Ok(summary) => {
            session.advance(SessionState::Success);
            info!("Session completed successfully");
            Outcome::Success(summary)
        }
        Err(e) => {
            session.advance(SessionState::Failed);
            warn!(reason = e.kind(), error = %e, "Session failed");
            Outcome::Failed(e)
        }
    };

    SessionReport {
        session_id: config.session_id,
        party_id: config.party_id,
        role: config.role,
        history: session.history,
        outcome,
    }
}

struct Session<'a, T: ?Sized> {
    config: &'a SessionConfig,
    transport: &'a T,
    history: Vec<SessionState>,
}

impl<'a, T: Transport + ?Sized> Session<'a, T> {
    fn new(config: &'a SessionConfig, transport: &'a T) -> Self {
        Self {
            config,
            transport,
            history: vec![SessionState::Idle],
        }
    }

    fn state(&self) -> SessionState {
        self.history.last().copied().unwrap_or(SessionState::Idle)
    }

    fn advance(&mut self, next: SessionState) {
        let current = self.state();
        debug_assert!(
            current.can_advance(next, self.config.role),
            "{current:?} -> {next:?}"
        );
        debug!(from = ?current, to = ?next, "State transition");
        self.history.push(next);
    }

    /// Check the credential and draw this session's exponent
    fn prepare_keys<R: RandomSource + ?Sized>(
        &mut self,
        credential: &KeyPair,
        rng: &mut R,
    ) -> Result<KeyPair> {
        analyze(&credential.public_key, &credential.private_key)
            .into_result(&credential.public_key, &credential.private_key)?;
        let keys = refresh_exponent(credential, rng)?;
        self.advance(SessionState::KeysGenerated);
        Ok(keys)
    }

    async fn send(&self, frame: Frame) -> Result<()> {
        debug!(to = self.config.peer_id, frame = %frame.to_wire(), "Sending frame");
        self.transport
            .send(&self.config.session_id, self.config.peer_id, &frame)
            .await
    }

    async fn receive(&self, step: &str) -> Result<Frame> {
        let frame = self
            .transport
            .receive(
                &self.config.session_id,
                self.config.party_id,
                self.config.receive_timeout,
            )
            .await
            .map_err(|e| match e {
                Error::Timeout(_) => Error::Timeout(format!("{step} from party {}", self.config.peer_id)),
                other => other,
            })?;
        debug!(step, frame = %frame.to_wire(), "Received frame");
        Ok(frame)
    }

    /// Tell the peer why the session ends; delivery failure is only logged
    async fn abort(&self, reason: &str) {
        if let Err(e) = self.send(Frame::Text(reason.to_string())).await {
            warn!(error = %e, "Abort notice not delivered");
        }
    }

    async fn run_initiator<R: RandomSource + ?Sized>(
        &mut self,
        credential: &KeyPair,
        rng: &mut R,
    ) -> Result<SessionSummary> {
        let keys = self.prepare_keys(credential, rng)?;
        let n = keys.modulus().clone();

        let plaintext = match &self.config.plaintext {
            Some(plaintext) => plaintext.clone(),
            None => rng.next_in_range(&BigUint::zero(), &(&n - BigUint::one())),
        };
        if plaintext >= n {
            return Err(Error::InvalidConfig(
                "Plaintext must be below the modulus".into(),
            ));
        }

        let signature = sign(&keys.public_value, &keys.private_key, &n)?;
        self.send(
            Hello {
                value: keys.public_value.clone(),
                signature,
                b: keys.private_key.b.clone(),
                n: n.clone(),
            }
            .into(),
        )
        .await?;
        self.advance(SessionState::ValueSent);

        let reply = Reply::try_from(self.receive("reply").await?)?;
        self.advance(SessionState::ValueReceived);

        if !verify(&reply.value, &reply.signature, &keys.private_key, &n) {
            warn!("Responder signature did not verify");
            self.abort(ABORT_RESPONDER_SIGNATURE).await;
            return Err(Error::InvalidSignature { value: reply.value });
        }
        self.advance(SessionState::Verified);

        let session_key = derive_session_key(&reply.value, &keys.private_key, &n);
        self.advance(SessionState::SessionKeyDerived);

        self.send(Frame::Text(ACK_TEXT.to_string())).await?;

        let ciphertext = encrypt(&plaintext, &keys.private_key.a, &session_key, &n)?;
        self.send(
            Sealed {
                ciphertext,
                key_tag: confirmation_tag(&session_key),
            }
            .into(),
        )
        .await?;

        let receipt = Receipt::try_from(self.receive("receipt").await?)?;
        self.advance(SessionState::MessageExchanged);

        if receipt.plaintext != plaintext {
            return Err(Error::DecryptionMismatch {
                expected: plaintext,
                actual: receipt.plaintext,
            });
        }

        Ok(SessionSummary {
            session_key,
            plaintext,
            public_value: keys.public_value,
            peer_value: reply.value,
        })
    }

    async fn run_responder<R: RandomSource + ?Sized>(
        &mut self,
        credential: &KeyPair,
        rng: &mut R,
    ) -> Result<SessionSummary> {
        let keys = self.prepare_keys(credential, rng)?;
        let n = keys.modulus().clone();

        let hello = Hello::try_from(self.receive("hello").await?)?;
        self.advance(SessionState::ValueReceived);

        if hello.n != n || hello.b != keys.private_key.b {
            self.abort(ABORT_PARAMETERS).await;
            return Err(Error::ParameterMismatch(format!(
                "peer announced N = {}, local N = {}",
                hello.n, n
            )));
        }

        if !verify(&hello.value, &hello.signature, &keys.private_key, &n) {
            warn!("Initiator signature did not verify");
            self.abort(ABORT_INITIATOR_SIGNATURE).await;
            return Err(Error::InvalidSignature { value: hello.value });
        }
        self.advance(SessionState::Verified);

        let signature = sign(&keys.public_value, &keys.private_key, &n)?;
        self.send(
            Reply {
                value: keys.public_value.clone(),
                signature,
            }
            .into(),
        )
        .await?;
        self.advance(SessionState::ValueSent);

        let session_key = derive_session_key(&hello.value, &keys.private_key, &n);
        self.advance(SessionState::SessionKeyDerived);

        match self.receive("acknowledgement").await? {
            Frame::Text(text) if text == ACK_TEXT => debug!("Initiator acknowledged"),
            Frame::Text(text) => return Err(Error::PeerAborted(text)),
            Frame::Integers(_) => {
                return Err(Error::UnexpectedMessage(
                    "acknowledgement: expected text".into(),
                ))
            }
        }

        let sealed = Sealed::try_from(self.receive("ciphertext").await?)?;
        if sealed.key_tag != confirmation_tag(&session_key) {
            self.abort(ABORT_KEY_MISMATCH).await;
            return Err(Error::SessionKeyMismatch);
        }

        let plaintext = decrypt(&sealed.ciphertext, &keys.private_key.a, &session_key, &n);
        self.send(
            Receipt {
                plaintext: plaintext.clone(),
            }
            .into(),
        )
        .await?;
        self.advance(SessionState::MessageExchanged);

        Ok(SessionSummary {
            session_key,
            plaintext,
            public_value: keys.public_value,
            peer_value: hello.value,
        })
    }
}

/// Configuration for an in-process run of both parties
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub keygen: KeyGenConfig,
    pub receive_timeout: Duration,
    pub plaintext: Option<BigUint>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            keygen: KeyGenConfig::default(),
            receive_timeout: Duration::from_secs(5),
            plaintext: None,
        }
    }
}

/// Result of [`simulate`]
#[derive(Debug, Clone)]
pub struct SimulationReport {
    pub modulus: BigUint,
    pub safety: SafetyReport,
    pub initiator: SessionReport,
    pub responder: SessionReport,
}

impl SimulationReport {
    pub fn is_success(&self) -> bool {
        self.initiator.is_success() && self.responder.is_success()
    }
}

/// Generate a credential, analyze it, and run both parties against each
/// other over an in-memory transport. The responder is provisioned with the
/// initiator's credential.
#[instrument(skip_all)]
pub async fn simulate(config: &SimulationConfig, rng: SharedRandom) -> Result<SimulationReport> {
    let mut keygen_rng = rng.clone();
    let keys = generate_keys(&config.keygen, &mut keygen_rng)?;

    let safety = analyze(&keys.public_key, &keys.private_key);
    safety
        .clone()
        .into_result(&keys.public_key, &keys.private_key)?;

    let transport = MemoryTransport::new();
    let mut initiator_config = SessionConfig::new(Role::Initiator, INITIATOR_ID, RESPONDER_ID)
        .with_timeout(config.receive_timeout);
    if let Some(plaintext) = &config.plaintext {
        initiator_config = initiator_config.with_plaintext(plaintext.clone());
    }
    let responder_config = SessionConfig::new(Role::Responder, RESPONDER_ID, INITIATOR_ID)
        .with_session_id(initiator_config.session_id)
        .with_timeout(config.receive_timeout);

    let mut initiator_rng = rng.clone();
    let mut responder_rng = rng;

    let (initiator, responder) = tokio::join!(
        run_session(&initiator_config, &keys, &mut initiator_rng, &transport),
        run_session(&responder_config, &keys, &mut responder_rng, &transport),
    );

    info!(
        initiator = ?initiator.state(),
        responder = ?responder.state(),
        "Simulation finished"
    );

    Ok(SimulationReport {
        modulus: keys.public_key.n.clone(),
        safety,
        initiator,
        responder,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::RngSource;
    use crate::{PrivateKey, PublicKey};
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn rng(seed: u64) -> RngSource<ChaCha20Rng> {
        RngSource::new(ChaCha20Rng::seed_from_u64(seed))
    }

    fn credential(seed: u64) -> KeyPair {
        generate_keys(&KeyGenConfig::default(), &mut rng(seed)).unwrap()
    }

    fn fixed_credential(a: u32, b: u32, r: u32) -> KeyPair {
        let n = BigUint::from(10007u32);
        let private_key = PrivateKey {
            a: BigUint::from(a),
            b: BigUint::from(b),
            r: BigUint::from(r),
            p: BigUint::one(),
        };
        let public_key =
            crate::keygen::derive_public_key(&n, &private_key.a, &private_key.b, &private_key.r)
                .unwrap();
        KeyPair {
            public_key,
            public_value: private_key.a.clone(),
            private_key,
        }
    }

    fn pair(timeout: Duration) -> (SessionConfig, SessionConfig) {
        let initiator = SessionConfig::new(Role::Initiator, 0, 1).with_timeout(timeout);
        let responder = SessionConfig::new(Role::Responder, 1, 0)
            .with_session_id(initiator.session_id)
            .with_timeout(timeout);
        (initiator, responder)
    }

    #[tokio::test]
    async fn test_full_session() {
        let keys = credential(1);
        let transport = MemoryTransport::new();
        let (alice, bob) = pair(Duration::from_secs(5));
        let alice = alice.with_plaintext(BigUint::from(424242u32));

        let (mut rng_a, mut rng_b) = (rng(2), rng(3));
        let (a, b) = tokio::join!(
            run_session(&alice, &keys, &mut rng_a, &transport),
            run_session(&bob, &keys, &mut rng_b, &transport),
        );

        assert!(a.is_success(), "{:?}", a.error());
        assert!(b.is_success(), "{:?}", b.error());
        assert_eq!(
            a.history,
            vec![
                SessionState::Idle,
                SessionState::KeysGenerated,
                SessionState::ValueSent,
                SessionState::ValueReceived,
                SessionState::Verified,
                SessionState::SessionKeyDerived,
                SessionState::MessageExchanged,
                SessionState::Success,
            ]
        );
        assert_eq!(b.state(), SessionState::Success);

        let (sa, sb) = (a.summary().unwrap(), b.summary().unwrap());
        assert_eq!(sa.session_key, sb.session_key);
        assert_eq!(sa.plaintext, BigUint::from(424242u32));
        assert_eq!(sb.plaintext, sa.plaintext);
        assert_eq!(sa.peer_value, sb.public_value);
        assert_ne!(sa.public_value, keys.public_value);
    }

    #[tokio::test]
    async fn test_simulation_agrees() {
        let shared = SharedRandom::new(rng(10));
        let report = simulate(&SimulationConfig::default(), shared).await.unwrap();

        assert!(report.safety.all_ok());
        assert!(report.is_success());
        assert_eq!(
            report.initiator.summary().unwrap().session_key,
            report.responder.summary().unwrap().session_key
        );
    }

    #[tokio::test]
    async fn test_simulation_with_fixed_modulus() {
        let config = SimulationConfig {
            keygen: KeyGenConfig::with_modulus(BigUint::from(10007u32)),
            plaintext: Some(BigUint::from(1234u32)),
            ..SimulationConfig::default()
        };
        let report = simulate(&config, SharedRandom::new(rng(11))).await.unwrap();
        assert!(report.is_success());
        assert_eq!(report.modulus, BigUint::from(10007u32));
        assert_eq!(
            report.responder.summary().unwrap().plaintext,
            BigUint::from(1234u32)
        );
    }

    #[tokio::test]
    async fn test_mismatched_credentials_fail_verification() {
        let transport = MemoryTransport::new();
        let (alice, bob) = pair(Duration::from_millis(500));

        // Same b and N, different r: the signatures cannot match
        let alice_keys = fixed_credential(3, 5, 7);
        let bob_keys = fixed_credential(3, 5, 8);

        let (mut rng_a, mut rng_b) = (rng(22), rng(23));
        let (a, b) = tokio::join!(
            run_session(&alice, &alice_keys, &mut rng_a, &transport),
            run_session(&bob, &bob_keys, &mut rng_b, &transport),
        );

        assert_eq!(b.failure_reason(), Some("InvalidSignature"));
        assert_eq!(
            b.history,
            vec![
                SessionState::Idle,
                SessionState::KeysGenerated,
                SessionState::ValueReceived,
                SessionState::Failed,
            ]
        );
        match a.error() {
            Some(Error::PeerAborted(text)) => assert_eq!(text, ABORT_INITIATOR_SIGNATURE),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_parameter_mismatch() {
        let transport = MemoryTransport::new();
        let (alice, bob) = pair(Duration::from_millis(500));

        let alice_keys = credential(30);
        let bob_keys = credential(31);

        let (mut rng_a, mut rng_b) = (rng(32), rng(33));
        let (a, b) = tokio::join!(
            run_session(&alice, &alice_keys, &mut rng_a, &transport),
            run_session(&bob, &bob_keys, &mut rng_b, &transport),
        );

        assert_eq!(b.failure_reason(), Some("ParameterMismatch"));
        assert_eq!(a.failure_reason(), Some("PeerAborted"));
    }

    #[tokio::test]
    async fn test_timeout_without_peer() {
        let transport = MemoryTransport::new();
        let (alice, _) = pair(Duration::from_millis(50));
        let report = run_session(&alice, &credential(40), &mut rng(41), &transport).await;

        assert_eq!(report.failure_reason(), Some("Timeout"));
        assert_eq!(
            report.history,
            vec![
                SessionState::Idle,
                SessionState::KeysGenerated,
                SessionState::ValueSent,
                SessionState::Failed,
            ]
        );
    }

    #[tokio::test]
    async fn test_unsafe_credential_rejected() {
        let transport = MemoryTransport::new();
        let (alice, _) = pair(Duration::from_millis(50));
        let unsafe_keys = KeyPair {
            public_key: PublicKey {
                m: BigUint::from(6u32),
                n: BigUint::from(10u32),
            },
            private_key: PrivateKey {
                a: BigUint::from(3u32),
                b: BigUint::from(3u32),
                r: BigUint::from(2u32),
                p: BigUint::from(1u32),
            },
            public_value: BigUint::from(3u32),
        };

        let report = run_session(&alice, &unsafe_keys, &mut rng(42), &transport).await;
        match report.error() {
            Some(Error::SafetyViolation { label, .. }) => assert_eq!(*label, "Factoring Attack"),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(report.history, vec![SessionState::Idle, SessionState::Failed]);
        assert_eq!(transport.pending(&alice.session_id, 1), 0);
    }

    #[tokio::test]
    async fn test_responder_detects_key_mismatch() {
        let keys = credential(50);
        let n = keys.modulus().clone();
        let transport = MemoryTransport::new();
        let (alice, bob) = pair(Duration::from_secs(2));

        let responder = async {
            let mut rng_b = rng(51);
            run_session(&bob, &keys, &mut rng_b, &transport).await
        };

        // Hand-driven initiator that sends a wrong confirmation tag
        let initiator = async {
            let own = refresh_exponent(&keys, &mut rng(52)).unwrap();
            let signature = sign(&own.public_value, &own.private_key, &n).unwrap();
            let hello = Hello {
                value: own.public_value.clone(),
                signature,
                b: own.private_key.b.clone(),
                n: n.clone(),
            };
            transport.send(&alice.session_id, 1, &hello.into()).await.unwrap();
            let reply = transport
                .receive(&alice.session_id, 0, Duration::from_secs(2))
                .await
                .unwrap();
            assert!(Reply::try_from(reply).is_ok());
            transport
                .send(&alice.session_id, 1, &Frame::Text(ACK_TEXT.into()))
                .await
                .unwrap();
            let sealed = Sealed {
                ciphertext: BigUint::from(5u32),
                key_tag: BigUint::from(1u32),
            };
            transport.send(&alice.session_id, 1, &sealed.into()).await.unwrap();
            transport
                .receive(&alice.session_id, 0, Duration::from_secs(2))
                .await
                .unwrap()
        };

        let (report, abort) = tokio::join!(responder, initiator);
        assert_eq!(report.failure_reason(), Some("SessionKeyMismatch"));
        assert_eq!(abort, Frame::Text(ABORT_KEY_MISMATCH.into()));
    }

    #[tokio::test]
    async fn test_initiator_detects_bad_receipt() {
        let keys = credential(60);
        let n = keys.modulus().clone();
        let transport = MemoryTransport::new();
        let (alice, _) = pair(Duration::from_secs(2));
        let alice = alice.with_plaintext(BigUint::from(77u32));

        let initiator = async {
            let mut rng_a = rng(61);
            run_session(&alice, &keys, &mut rng_a, &transport).await
        };

        // Hand-driven responder that echoes the wrong plaintext
        let responder = async {
            let own = refresh_exponent(&keys, &mut rng(62)).unwrap();
            let timeout = Duration::from_secs(2);
            let hello = transport.receive(&alice.session_id, 1, timeout).await.unwrap();
            assert!(Hello::try_from(hello).is_ok());
            let reply = Reply {
                value: own.public_value.clone(),
                signature: sign(&own.public_value, &own.private_key, &n).unwrap(),
            };
            transport.send(&alice.session_id, 0, &reply.into()).await.unwrap();
            let ack = transport.receive(&alice.session_id, 1, timeout).await.unwrap();
            assert_eq!(ack, Frame::Text(ACK_TEXT.into()));
            let _sealed = transport.receive(&alice.session_id, 1, timeout).await.unwrap();
            let receipt = Receipt {
                plaintext: BigUint::from(78u32),
            };
            transport.send(&alice.session_id, 0, &receipt.into()).await.unwrap();
        };

        let (report, ()) = tokio::join!(initiator, responder);
        match report.error() {
            Some(Error::DecryptionMismatch { expected, actual }) => {
                assert_eq!(*expected, BigUint::from(77u32));
                assert_eq!(*actual, BigUint::from(78u32));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(
            &report.history[report.history.len() - 2..],
            &[SessionState::MessageExchanged, SessionState::Failed]
        );
    }

    #[tokio::test]
    async fn test_plaintext_outside_modulus_rejected() {
        let keys = credential(70);
        let transport = MemoryTransport::new();
        let (alice, _) = pair(Duration::from_millis(50));
        let alice = alice.with_plaintext(keys.modulus().clone());

        let report = run_session(&alice, &keys, &mut rng(71), &transport).await;
        assert_eq!(report.failure_reason(), Some("InvalidConfig"));
        assert_eq!(transport.pending(&alice.session_id, 1), 0);
    }
}
