use std::collections::HashSet;
use std::sync::Arc;

use alloy::primitives::{Address, B256, U256};
use chrono::Utc;
use dashmap::DashMap;
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::coordinator::ChainGateway;
use crate::db::{Database, NewSplit, ParticipantRow, SignatureStatus, SplitRow};
use crate::eip712;
use crate::response::{
    AllowanceView, CreateSplitResponse, SettleResponse, SignatureView, SplitView, TokenView,
    TypedDataPayload,
};
use crate::{ApproveSplit, ChainSettings, SplitsError};

#[derive(Debug, Clone, Deserialize)]
pub struct LegRequest {
    pub participant: String,
    pub amount: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSplitRequest {
    pub payer: String,
    pub token: String,
    pub legs: Vec<LegRequest>,
    #[serde(default)]
    pub deadline: Option<String>,
    #[serde(default)]
    pub meta_hash: Option<String>,
    #[serde(default)]
    pub create_onchain: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproveIntentRequest {
    pub participant: String,
    #[serde(default)]
    pub deadline: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitSignatureRequest {
    pub participant: String,
    pub amount: String,
    pub salt: String,
    #[serde(default)]
    pub deadline: Option<String>,
    pub signature: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleRequest {
    /// When present, overrides the stored VALID set; every item must match
    /// its stored row byte-for-byte.
    #[serde(default)]
    pub items: Option<Vec<SettleItemRequest>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleItemRequest {
    pub participant: String,
    pub amount: String,
    #[serde(default)]
    pub deadline: Option<String>,
    pub salt: String,
    pub signature: String,
}

struct AssembledLeg {
    participant: Address,
    amount: U256,
    deadline: U256,
    salt: B256,
    signature: Vec<u8>,
    participant_id: i64,
    signature_id: i64,
}

/// The split state machine: create, issue intents, accept signatures,
/// settle. Owns every invariant; callers only see results.
pub struct SplitsEngine<G> {
    db: Database,
    gateway: G,
    settings: ChainSettings,
    /// Per-split mutex serializing settle attempts (prevents double
    /// submission of the same signature set).
    settle_locks: DashMap<i64, Arc<Mutex<()>>>,
}

impl<G> SplitsEngine<G> {
    pub fn new(db: Database, gateway: G, settings: ChainSettings) -> Self {
        Self {
            db,
            gateway,
            settings,
            settle_locks: DashMap::new(),
        }
    }

    pub fn settings(&self) -> &ChainSettings {
        &self.settings
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    fn settle_lock(&self, split_id: i64) -> Arc<Mutex<()>> {
        self.settle_locks
            .entry(split_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Load a split and enforce that it belongs to the configured chain and
    /// coordinator contract.
    fn load_split(&self, split_id: i64) -> Result<SplitRow, SplitsError> {
        let split = self
            .db
            .get_split(split_id)?
            .ok_or_else(|| SplitsError::NotFound(format!("split {split_id} not found")))?;

        let bound = split.contract.parse::<Address>().ok();
        if split.chain_id != self.settings.chain_id || bound != Some(self.settings.coordinator) {
            return Err(SplitsError::NotFound(format!(
                "split {split_id} is bound to a different chain or contract"
            )));
        }
        Ok(split)
    }

    /// The uint256 used inside ApproveSplit: the on-chain id once minted,
    /// the local row id before that. Signing and settlement must agree on
    /// this value or nothing verifies.
    fn signing_split_id(&self, split: &SplitRow) -> Result<U256, SplitsError> {
        match &split.split_id_onchain {
            Some(raw) => raw
                .parse::<U256>()
                .map_err(|_| SplitsError::Internal(format!("corrupt on-chain id: {raw}"))),
            None => Ok(U256::from(split.id as u64)),
        }
    }

    fn build_message(
        &self,
        split: &SplitRow,
        participant: Address,
        amount: U256,
        deadline: Option<i64>,
        salt: B256,
    ) -> Result<ApproveSplit, SplitsError> {
        Ok(ApproveSplit {
            participant,
            splitId: self.signing_split_id(split)?,
            token: parse_stored_address(&split.token)?,
            payer: parse_stored_address(&split.payer)?,
            amount,
            deadline: deadline_word(deadline),
            salt,
        })
    }
}

impl<G: ChainGateway> SplitsEngine<G> {
    pub async fn create_split(
        &self,
        req: CreateSplitRequest,
    ) -> Result<CreateSplitResponse, SplitsError> {
        let payer = parse_address("payer", &req.payer)?;
        let token = parse_address("token", &req.token)?;

        if req.legs.is_empty() {
            return Err(SplitsError::InvalidInput(
                "at least one leg is required".to_string(),
            ));
        }

        let mut legs: Vec<(Address, U256)> = Vec::with_capacity(req.legs.len());
        let mut seen = HashSet::new();
        for leg in &req.legs {
            let participant = parse_address("participant", &leg.participant)?;
            let amount = parse_amount(&leg.amount)?;
            if amount.is_zero() {
                return Err(SplitsError::InvalidInput(format!(
                    "leg amount must be positive for {participant}"
                )));
            }
            if !seen.insert(participant) {
                return Err(SplitsError::Conflict(format!(
                    "duplicate participant {participant}"
                )));
            }
            legs.push((participant, amount));
        }

        let mut total = U256::ZERO;
        for (_, amount) in &legs {
            total = total.checked_add(*amount).ok_or_else(|| {
                SplitsError::InvalidInput("total amount overflows uint256".to_string())
            })?;
        }

        let deadline = match req.deadline.as_deref() {
            Some(raw) => parse_deadline(raw)?,
            None => None,
        };
        let meta_hash = match req.meta_hash.as_deref() {
            Some(raw) => Some(parse_hex32("metaHash", raw)?),
            None => None,
        };

        let now = now_ts();
        let participants: Vec<(String, String)> = legs
            .iter()
            .map(|(p, a)| (format!("{p}"), format!("{a}")))
            .collect();

        let split_id = self.db.insert_split(
            &NewSplit {
                chain_id: self.settings.chain_id,
                contract: format!("{}", self.settings.coordinator),
                payer: format!("{payer}"),
                token: format!("{token}"),
                total_amount: format!("{total}"),
                deadline,
                meta_hash: meta_hash.map(|h| h.to_vec()),
                created_at: now,
            },
            &participants,
        )?;

        tracing::info!(
            split_id,
            payer = %payer,
            token = %token,
            total = %total,
            legs = legs.len(),
            "split created"
        );

        if !req.create_onchain {
            return Ok(CreateSplitResponse {
                id: split_id,
                tx_hash: None,
            });
        }

        let outcome = match self
            .gateway
            .create_split(
                payer,
                token,
                legs,
                deadline_word(deadline),
                meta_hash.unwrap_or(B256::ZERO),
            )
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                // Compensating delete scoped to the row inserted above.
                if let Err(del) = self.db.delete_split(split_id) {
                    tracing::error!(
                        split_id,
                        error = %del,
                        "failed to delete orphan split after chain error"
                    );
                }
                return Err(e);
            }
        };

        match outcome.split_id {
            Some(onchain_id) => {
                self.db
                    .set_split_onchain_id(split_id, &format!("{onchain_id}"), now_ts())?;
                tracing::info!(
                    split_id,
                    onchain_id = %onchain_id,
                    tx = %outcome.tx_hash,
                    "split minted on-chain"
                );
            }
            None => {
                tracing::warn!(
                    split_id,
                    tx = %outcome.tx_hash,
                    "SplitCreated event missing from receipt; split keeps local signing id until reconciled"
                );
            }
        }

        Ok(CreateSplitResponse {
            id: split_id,
            tx_hash: Some(outcome.tx_hash),
        })
    }

    /// Issue a fresh ApproveSplit intent for one participant: a new random
    /// salt, a PENDING signature row, and the typed data the wallet signs.
    pub async fn approve_intent(
        &self,
        split_id: i64,
        req: ApproveIntentRequest,
    ) -> Result<TypedDataPayload, SplitsError> {
        let split = self.load_split(split_id)?;
        if split.settled {
            return Err(SplitsError::Conflict(format!(
                "split {split_id} is already settled"
            )));
        }

        let participant = parse_address("participant", &req.participant)?;
        let leg = self
            .db
            .find_participant(split_id, &format!("{participant}"))?
            .ok_or_else(|| {
                SplitsError::NotFound(format!(
                    "participant {participant} is not part of split {split_id}"
                ))
            })?;

        let deadline = match req.deadline.as_deref() {
            Some(raw) => {
                let requested = parse_deadline(raw)?;
                if let Some(split_deadline) = split.deadline {
                    // A no-expiry request outlives any finite split deadline.
                    match requested {
                        Some(d) if d <= split_deadline => {}
                        _ => {
                            return Err(SplitsError::InvalidInput(
                                "requested deadline exceeds the split deadline".to_string(),
                            ))
                        }
                    }
                }
                requested
            }
            None => split.deadline,
        };

        let salt = eip712::random_salt();
        self.db.insert_signature(
            split_id,
            &leg.participant,
            &leg.amount,
            deadline,
            salt.as_slice(),
            now_ts(),
        )?;

        let amount = parse_stored_amount(&leg.amount)?;
        let message = self.build_message(&split, participant, amount, deadline, salt)?;

        tracing::debug!(split_id, participant = %participant, "approve intent issued");
        Ok(TypedDataPayload::new(&self.settings, &message))
    }

    /// Accept a participant's signature over a previously issued intent.
    /// The typed data is rebuilt from stored fields only; client-supplied
    /// values merely select the row and must match it.
    pub async fn submit_signature(
        &self,
        split_id: i64,
        req: SubmitSignatureRequest,
    ) -> Result<SignatureView, SplitsError> {
        let split = self.load_split(split_id)?;
        if split.settled {
            return Err(SplitsError::Conflict(format!(
                "split {split_id} is already settled"
            )));
        }

        let participant = parse_address("participant", &req.participant)?;
        let leg = self
            .db
            .find_participant(split_id, &format!("{participant}"))?
            .ok_or_else(|| {
                SplitsError::NotFound(format!(
                    "participant {participant} is not part of split {split_id}"
                ))
            })?;

        let amount = parse_amount(&req.amount)?;
        if format!("{amount}") != leg.amount {
            return Err(SplitsError::InvalidInput(format!(
                "amount {amount} does not match the leg amount {}",
                leg.amount
            )));
        }

        let salt = parse_hex32("salt", &req.salt)?;
        let row = self
            .db
            .find_signature_by_salt(split_id, &leg.participant, salt.as_slice())?
            .ok_or_else(|| {
                SplitsError::NotFound("no approve intent found for the given salt".to_string())
            })?;

        match row.status {
            SignatureStatus::UsedOnchain => {
                return Err(SplitsError::Conflict(
                    "signature was already used on-chain".to_string(),
                ))
            }
            SignatureStatus::Valid => {
                tracing::debug!(split_id, participant = %participant, "signature already valid");
                return Ok(SignatureView::from_row(&row));
            }
            SignatureStatus::Expired | SignatureStatus::Rejected => {
                return Err(SplitsError::Conflict(format!(
                    "intent is {}",
                    row.status.as_str()
                )))
            }
            SignatureStatus::Pending => {}
        }

        // A participant holds at most one VALID or USED_ONCHAIN row per
        // split; a re-issued intent cannot become a second accepted
        // signature. The partial unique index backs this check up under
        // concurrency.
        if self.db.has_active_signature(split_id, &leg.participant)? {
            return Err(SplitsError::Conflict(
                "participant already has an accepted signature for this split".to_string(),
            ));
        }

        if let Some(raw) = req.deadline.as_deref() {
            let requested = parse_deadline(raw)?;
            if requested != row.deadline {
                return Err(SplitsError::InvalidInput(
                    "deadline does not match the stored intent".to_string(),
                ));
            }
        }

        let signature_bytes = parse_signature_hex(&req.signature)?;

        let stored_amount = parse_stored_amount(&row.amount)?;
        let message = self.build_message(&split, participant, stored_amount, row.deadline, salt)?;
        let signer = eip712::verify(&self.settings, &message, &signature_bytes)?;
        if signer != participant {
            return Err(SplitsError::InvalidInput(format!(
                "signer {signer} differs from participant {participant}"
            )));
        }

        if let Some(deadline) = row.deadline {
            if deadline != 0 && now_ts() > deadline {
                self.db.mark_signature_terminal(
                    row.id,
                    SignatureStatus::Expired,
                    "expired before validation",
                    now_ts(),
                )?;
                return Err(SplitsError::InvalidInput("signature expired".to_string()));
            }
        }

        let updated = self
            .db
            .mark_signature_valid(row.id, leg.id, &signature_bytes, now_ts())?;
        if !updated {
            // A concurrent submit won the CAS; VALID means the work is done.
            let current = self
                .db
                .find_signature_by_salt(split_id, &leg.participant, salt.as_slice())?
                .ok_or_else(|| SplitsError::Internal("signature row vanished".to_string()))?;
            return match current.status {
                SignatureStatus::Valid => Ok(SignatureView::from_row(&current)),
                SignatureStatus::UsedOnchain => Err(SplitsError::Conflict(
                    "signature was already used on-chain".to_string(),
                )),
                _ => Err(SplitsError::Conflict(
                    "intent is no longer pending".to_string(),
                )),
            };
        }

        tracing::info!(split_id, participant = %participant, "signature accepted");

        let current = self
            .db
            .find_signature_by_salt(split_id, &leg.participant, salt.as_slice())?
            .ok_or_else(|| SplitsError::Internal("signature row vanished".to_string()))?;
        Ok(SignatureView::from_row(&current))
    }

    /// Consume every valid signature in a single settleSplit transaction and
    /// commit the post-state atomically.
    ///
    /// A request cancelled between transaction submission and receipt
    /// observation can leave `settled=false` with an executed transaction;
    /// a retry then reverts on-chain (salts consumed) and the split stays
    /// pending until reconciled out-of-band.
    pub async fn settle(
        &self,
        split_id: i64,
        req: SettleRequest,
    ) -> Result<SettleResponse, SplitsError> {
        let lock = self.settle_lock(split_id);
        let _guard = lock.lock().await;

        let split = self.load_split(split_id)?;
        if split.settled {
            return Err(SplitsError::Conflict(format!(
                "split {split_id} is already settled"
            )));
        }

        let participants = self.db.participants_for_split(split_id)?;
        let assembled = match req.items {
            Some(items) => self.assemble_explicit(split_id, &participants, &items)?,
            None => self.assemble_stored(split_id, &participants)?,
        };

        if assembled.len() != participants.len() {
            return Err(SplitsError::InvalidInput(format!(
                "signature count mismatch: {} signatures for {} participants",
                assembled.len(),
                participants.len()
            )));
        }

        let mut addrs = Vec::with_capacity(assembled.len());
        let mut amounts = Vec::with_capacity(assembled.len());
        let mut deadlines = Vec::with_capacity(assembled.len());
        let mut salts = Vec::with_capacity(assembled.len());
        let mut vs = Vec::with_capacity(assembled.len());
        let mut rs = Vec::with_capacity(assembled.len());
        let mut ss = Vec::with_capacity(assembled.len());
        for leg in &assembled {
            let (v, r, s) = split_signature(&leg.signature)?;
            addrs.push(leg.participant);
            amounts.push(leg.amount);
            deadlines.push(leg.deadline);
            salts.push(leg.salt);
            vs.push(v);
            rs.push(r);
            ss.push(s);
        }

        let onchain_id = self.signing_split_id(&split)?;
        let tx_hash = self
            .gateway
            .settle_split(onchain_id, addrs, amounts, deadlines, salts, vs, rs, ss)
            .await?;

        let rows: Vec<(i64, i64)> = assembled
            .iter()
            .map(|leg| (leg.participant_id, leg.signature_id))
            .collect();
        if !self.db.mark_settled(split_id, &rows, now_ts())? {
            // Raced with another settle; the flag is already set and stays set.
            tracing::warn!(split_id, "split was already marked settled");
        }

        tracing::info!(split_id, tx = %tx_hash, legs = assembled.len(), "split settled");
        Ok(SettleResponse { tx_hash })
    }

    fn assemble_stored(
        &self,
        split_id: i64,
        participants: &[ParticipantRow],
    ) -> Result<Vec<AssembledLeg>, SplitsError> {
        let mut assembled = Vec::new();
        for row in self.db.valid_signatures(split_id)? {
            let leg = participants
                .iter()
                .find(|p| p.participant == row.participant)
                .ok_or_else(|| {
                    SplitsError::Internal("signature row without matching participant".to_string())
                })?;
            assembled.push(AssembledLeg {
                participant: parse_stored_address(&leg.participant)?,
                amount: parse_stored_amount(&leg.amount)?,
                deadline: deadline_word(row.deadline),
                salt: B256::from_slice(&row.salt),
                signature: row.signature.clone(),
                participant_id: leg.id,
                signature_id: row.id,
            });
        }
        Ok(assembled)
    }

    fn assemble_explicit(
        &self,
        split_id: i64,
        participants: &[ParticipantRow],
        items: &[SettleItemRequest],
    ) -> Result<Vec<AssembledLeg>, SplitsError> {
        let mut assembled = Vec::new();
        let mut seen = HashSet::new();
        for item in items {
            let participant = parse_address("participant", &item.participant)?;
            let key = format!("{participant}");
            let leg = participants
                .iter()
                .find(|p| p.participant == key)
                .ok_or_else(|| {
                    SplitsError::NotFound(format!(
                        "participant {participant} is not part of split {split_id}"
                    ))
                })?;
            // Distinct items plus the count gate make the set exactly the
            // leg set; without this a doubled item could shadow a leg.
            if !seen.insert(leg.id) {
                return Err(SplitsError::InvalidInput(format!(
                    "duplicate participant {participant} in settle items"
                )));
            }

            let amount = parse_amount(&item.amount)?;
            if format!("{amount}") != leg.amount {
                return Err(SplitsError::InvalidInput(format!(
                    "amount {amount} does not match the leg amount {}",
                    leg.amount
                )));
            }

            let salt = parse_hex32("salt", &item.salt)?;
            let row = self
                .db
                .find_signature_by_salt(split_id, &key, salt.as_slice())?
                .ok_or_else(|| {
                    SplitsError::NotFound("no signature found for the given salt".to_string())
                })?;
            if row.status != SignatureStatus::Valid {
                return Err(SplitsError::InvalidInput(format!(
                    "signature for {participant} is {}, expected VALID",
                    row.status.as_str()
                )));
            }

            let item_deadline = match item.deadline.as_deref() {
                Some(raw) => parse_deadline(raw)?,
                None => None,
            };
            if item_deadline != row.deadline {
                return Err(SplitsError::InvalidInput(
                    "deadline does not match the stored signature".to_string(),
                ));
            }

            let signature = parse_signature_hex(&item.signature)?;
            if signature != row.signature {
                return Err(SplitsError::InvalidInput(
                    "signature bytes differ from the stored signature".to_string(),
                ));
            }

            assembled.push(AssembledLeg {
                participant,
                amount,
                deadline: deadline_word(row.deadline),
                salt,
                signature,
                participant_id: leg.id,
                signature_id: row.id,
            });
        }
        Ok(assembled)
    }

    /// ERC-20 allowance probe: how much `owner` has approved the coordinator
    /// to pull of `token`. Read-only, no persistence.
    pub async fn check_allowance(
        &self,
        token: &str,
        owner: &str,
    ) -> Result<AllowanceView, SplitsError> {
        let token = parse_address("token", token)?;
        let owner = parse_address("owner", owner)?;
        let spender = self.settings.coordinator;
        let allowance = self.gateway.erc20_allowance(token, owner, spender).await?;
        Ok(AllowanceView {
            token: format!("{token}"),
            owner: format!("{owner}"),
            spender: format!("{spender}"),
            allowance: format!("{allowance}"),
        })
    }

    pub async fn get_split(&self, split_id: i64) -> Result<SplitView, SplitsError> {
        let split = self.load_split(split_id)?;
        let participants = self.db.participants_for_split(split_id)?;
        let signatures = self.db.signatures_for_split(split_id)?;
        Ok(SplitView::from_rows(&split, &participants, &signatures))
    }

    pub async fn list_tokens(&self) -> Result<Vec<TokenView>, SplitsError> {
        Ok(self
            .db
            .list_tokens(self.settings.chain_id)?
            .into_iter()
            .map(TokenView::from_row)
            .collect())
    }
}

fn now_ts() -> i64 {
    Utc::now().timestamp()
}

fn parse_address(label: &str, raw: &str) -> Result<Address, SplitsError> {
    raw.trim()
        .parse()
        .map_err(|_| SplitsError::InvalidInput(format!("invalid {label} address: {raw}")))
}

fn parse_stored_address(raw: &str) -> Result<Address, SplitsError> {
    raw.parse()
        .map_err(|_| SplitsError::Internal(format!("corrupt stored address: {raw}")))
}

fn parse_amount(raw: &str) -> Result<U256, SplitsError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SplitsError::InvalidInput(format!(
            "invalid decimal amount: {raw}"
        )));
    }
    trimmed
        .parse()
        .map_err(|_| SplitsError::InvalidInput(format!("invalid decimal amount: {raw}")))
}

fn parse_stored_amount(raw: &str) -> Result<U256, SplitsError> {
    raw.parse()
        .map_err(|_| SplitsError::Internal(format!("corrupt stored amount: {raw}")))
}

/// Deadline strings: "0" means no expiry, a digit string is Unix seconds,
/// anything else must parse as RFC-3339.
fn parse_deadline(raw: &str) -> Result<Option<i64>, SplitsError> {
    let trimmed = raw.trim();
    if trimmed == "0" {
        return Ok(None);
    }
    if !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return trimmed
            .parse::<i64>()
            .map(Some)
            .map_err(|_| SplitsError::InvalidInput(format!("deadline out of range: {raw}")));
    }
    chrono::DateTime::parse_from_rfc3339(trimmed)
        .map(|dt| Some(dt.timestamp()))
        .map_err(|_| SplitsError::InvalidInput(format!("invalid deadline: {raw}")))
}

fn deadline_word(deadline: Option<i64>) -> U256 {
    U256::from(deadline.unwrap_or(0).max(0) as u64)
}

fn parse_hex32(label: &str, raw: &str) -> Result<B256, SplitsError> {
    raw.trim()
        .parse()
        .map_err(|_| SplitsError::InvalidInput(format!("invalid {label}: expected 32-byte hex")))
}

fn parse_signature_hex(raw: &str) -> Result<Vec<u8>, SplitsError> {
    let stripped = raw.trim().strip_prefix("0x").unwrap_or(raw.trim());
    let bytes = alloy::hex::decode(stripped)
        .map_err(|_| SplitsError::InvalidInput("invalid signature hex".to_string()))?;
    if bytes.len() != 65 {
        return Err(SplitsError::InvalidInput(format!(
            "signature must be 65 bytes, got {}",
            bytes.len()
        )));
    }
    Ok(bytes)
}

/// Split a 65-byte r||s||v signature into the (v, r, s) triple the contract
/// expects. v is normalized to 27/28.
fn split_signature(bytes: &[u8]) -> Result<(u8, B256, B256), SplitsError> {
    if bytes.len() != 65 {
        return Err(SplitsError::Internal(format!(
            "stored signature has {} bytes",
            bytes.len()
        )));
    }
    let r = B256::from_slice(&bytes[0..32]);
    let s = B256::from_slice(&bytes[32..64]);
    let v = if bytes[64] < 27 { bytes[64] + 27 } else { bytes[64] };
    Ok((v, r, s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_deadline_zero_means_no_expiry() {
        assert_eq!(parse_deadline("0").unwrap(), None);
    }

    #[test]
    fn test_parse_deadline_numeric_is_unix_seconds() {
        assert_eq!(parse_deadline("1700000000").unwrap(), Some(1_700_000_000));
        assert_eq!(parse_deadline(" 5 ").unwrap(), Some(5));
    }

    #[test]
    fn test_parse_deadline_iso8601() {
        assert_eq!(
            parse_deadline("2026-01-01T00:00:00Z").unwrap(),
            Some(1_767_225_600)
        );
        assert!(parse_deadline("tomorrow").is_err());
        assert!(parse_deadline("").is_err());
    }

    #[test]
    fn test_parse_amount_rejects_non_decimal() {
        assert!(parse_amount("0x10").is_err());
        assert!(parse_amount("-5").is_err());
        assert!(parse_amount("").is_err());
        assert_eq!(parse_amount("12500000").unwrap(), U256::from(12_500_000u64));
    }

    #[test]
    fn test_split_signature_normalizes_v() {
        let mut bytes = vec![0u8; 65];
        bytes[0] = 0x11;
        bytes[63] = 0x22;
        bytes[64] = 0; // parity form
        let (v, r, s) = split_signature(&bytes).unwrap();
        assert_eq!(v, 27);
        assert_eq!(r[0], 0x11);
        assert_eq!(s[31], 0x22);

        bytes[64] = 28;
        let (v, _, _) = split_signature(&bytes).unwrap();
        assert_eq!(v, 28);
    }

    #[test]
    fn test_parse_signature_hex_length() {
        let ok = format!("0x{}", alloy::hex::encode([0xab; 65]));
        assert_eq!(parse_signature_hex(&ok).unwrap().len(), 65);

        let short = format!("0x{}", alloy::hex::encode([0xab; 64]));
        assert!(parse_signature_hex(&short).is_err());
        assert!(parse_signature_hex("zz").is_err());
    }
}
