//! Interview state and the encrypted envelope.
//!
//! The state is the full snapshot exchanged with clients: the interview
//! config, the collected `data`, and bookkeeping. Every mutation produces a
//! new value. The envelope is `version u8 | part1 | part2` where part1 is
//! the zlib-compressed state minus `data` and part2 is the uncompressed
//! `{"data": …}`, the whole thing sealed with XSalsa20Poly1305 under a
//! random 24-byte nonce.

use std::collections::BTreeSet;
use std::io::{Read, Write};

use chrono::{DateTime, Duration, Utc};
use crypto_secretbox::aead::{Aead, AeadCore, KeyInit, OsRng};
use crypto_secretbox::{Key, Nonce, XSalsa20Poly1305};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};
use uuid::Uuid;

use crate::error::{InterviewError, Result};
use crate::interview::Interview;
use crate::locator::{Context, Locator};

/// The default amount of time in seconds an interview state is valid.
pub const DEFAULT_EXPIRATION_SECS: i64 = 1800;

const ENVELOPE_VERSION: u8 = 1;
const NONCE_LEN: usize = 24;
const LEN_PREFIX: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewState {
    /// The interview this state runs.
    pub interview: Interview,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_url: Option<String>,

    /// Unique ID for this submission.
    pub submission_id: String,

    /// When the interview expires.
    #[serde(with = "flexible_datetime")]
    pub expiration_date: DateTime<Utc>,

    #[serde(default)]
    pub complete: bool,

    /// Client-provided context; wins over `data` in the template context.
    #[serde(default)]
    pub context: Context,

    #[serde(default)]
    pub answered_question_ids: BTreeSet<String>,

    /// The currently outstanding question, if the last content was an ask.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_id: Option<String>,

    /// Collected interview data.
    #[serde(default)]
    pub data: Context,
}

impl InterviewState {
    pub fn new(interview: Interview) -> Self {
        Self {
            interview,
            target_url: None,
            submission_id: Uuid::new_v4().simple().to_string(),
            expiration_date: Utc::now() + Duration::seconds(DEFAULT_EXPIRATION_SECS),
            complete: false,
            context: Context::new(),
            answered_question_ids: BTreeSet::new(),
            question_id: None,
            data: Context::new(),
        }
    }

    pub fn with_target_url(mut self, target_url: Option<String>) -> Self {
        self.target_url = target_url;
        self
    }

    pub fn with_submission_id(mut self, submission_id: Option<String>) -> Self {
        if let Some(id) = submission_id {
            self.submission_id = id;
        }
        self
    }

    pub fn with_expiration_date(mut self, expiration_date: Option<DateTime<Utc>>) -> Self {
        if let Some(date) = expiration_date {
            self.expiration_date = date;
        }
        self
    }

    pub fn with_context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }

    pub fn with_data(mut self, data: Context) -> Self {
        self.data = data;
        self
    }

    /// The context for template evaluation: `data` merged with `context`,
    /// `context` winning on overlap.
    pub fn template_context(&self) -> Context {
        let mut merged = self.data.clone();
        for (key, value) in &self.context {
            merged.insert(key.clone(), value.clone());
        }
        merged
    }

    /// Mark a question as the outstanding one and record it as answered.
    pub fn set_question(mut self, question_id: String) -> Self {
        self.answered_question_ids.insert(question_id.clone());
        self.question_id = Some(question_id);
        self
    }

    /// Clear the outstanding question. The answered set is untouched.
    pub fn clear_question(mut self) -> Self {
        self.question_id = None;
        self
    }

    pub fn set_data(mut self, data: Context) -> Self {
        self.data = data;
        self
    }

    /// Write locator assignments into a copy of `data`.
    ///
    /// Collections are not automatically created; a missing parent is a
    /// configuration error.
    pub fn set_values(self, values: Vec<(Locator, Json)>) -> Result<Self> {
        let mut data = self.data.clone();
        for (locator, value) in values {
            locator.set(value, &mut data).map_err(|e| match e {
                InterviewError::Undefined(missing) => InterviewError::Misconfigured(format!(
                    "undefined variable {missing} when setting {locator}; \
                     collections are not automatically created"
                )),
                other => other,
            })?;
        }
        Ok(self.set_data(data))
    }

    pub fn set_complete(mut self) -> Self {
        self.complete = true;
        self
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiration_date
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Reject expired states.
    pub fn validate(&self) -> Result<()> {
        if self.is_expired() {
            Err(InterviewError::InvalidState(
                "interview state is expired".into(),
            ))
        } else {
            Ok(())
        }
    }

    // ─── Envelope ─────────────────────────────────────────────

    /// Encrypt this state into the opaque envelope.
    pub fn encrypt(&self, key: &[u8; 32]) -> Result<Vec<u8>> {
        let plain = self.encode()?;
        let cipher = XSalsa20Poly1305::new(Key::from_slice(key));
        let nonce = XSalsa20Poly1305::generate_nonce(&mut OsRng);
        let sealed = cipher
            .encrypt(&nonce, plain.as_slice())
            .map_err(|_| InterviewError::InvalidState("encryption failed".into()))?;
        let mut out = Vec::with_capacity(NONCE_LEN + sealed.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&sealed);
        Ok(out)
    }

    /// Decrypt an envelope.
    ///
    /// Does not check the expiration date; call [`validate`](Self::validate)
    /// afterwards.
    pub fn decrypt(encrypted: &[u8], key: &[u8; 32]) -> Result<Self> {
        if encrypted.len() < NONCE_LEN {
            return Err(invalid_state());
        }
        let (nonce, sealed) = encrypted.split_at(NONCE_LEN);
        let cipher = XSalsa20Poly1305::new(Key::from_slice(key));
        let plain = cipher
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| invalid_state())?;
        Self::decode(&plain)
    }

    fn encode(&self) -> Result<Vec<u8>> {
        let serialized = serde_json::to_value(self).map_err(|e| {
            InterviewError::Misconfigured(format!("state serialization failed: {e}"))
        })?;
        let Json::Object(mut head) = serialized else {
            return Err(InterviewError::Misconfigured(
                "state serialization failed".into(),
            ));
        };
        let data = head.remove("data").unwrap_or(Json::Object(Map::new()));
        let mut tail = Map::new();
        tail.insert("data".into(), data);

        let mut out = vec![ENVELOPE_VERSION];
        out.extend(encode_part(&Json::Object(head), true)?);
        out.extend(encode_part(&Json::Object(tail), false)?);
        Ok(out)
    }

    fn decode(plain: &[u8]) -> Result<Self> {
        let (&version, mut rest) = plain.split_first().ok_or_else(invalid_state)?;
        if version != ENVELOPE_VERSION {
            return Err(invalid_state());
        }

        let mut merged = Map::new();
        while !rest.is_empty() {
            let (consumed, part) = decode_part(rest)?;
            merged.extend(part);
            rest = &rest[consumed..];
        }

        serde_json::from_value(Json::Object(merged)).map_err(|_| invalid_state())
    }
}

fn invalid_state() -> InterviewError {
    InterviewError::InvalidState("interview state is not valid".into())
}

fn encode_part(value: &Json, compress: bool) -> Result<Vec<u8>> {
    let json = serde_json::to_vec(value)
        .map_err(|e| InterviewError::Misconfigured(format!("state serialization failed: {e}")))?;

    let (length, body) = if compress {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&json).map_err(|e| {
            InterviewError::Misconfigured(format!("state compression failed: {e}"))
        })?;
        let compressed = encoder.finish().map_err(|e| {
            InterviewError::Misconfigured(format!("state compression failed: {e}"))
        })?;
        (-(compressed.len() as i64), compressed)
    } else {
        (json.len() as i64, json)
    };

    let length = i32::try_from(length)
        .map_err(|_| InterviewError::Misconfigured("state too large".into()))?;

    let mut out = Vec::with_capacity(LEN_PREFIX + body.len());
    out.extend_from_slice(&length.to_le_bytes());
    out.extend_from_slice(&body);
    Ok(out)
}

fn decode_part(data: &[u8]) -> Result<(usize, Map<String, Json>)> {
    if data.len() < LEN_PREFIX {
        return Err(invalid_state());
    }
    let mut prefix = [0u8; LEN_PREFIX];
    prefix.copy_from_slice(&data[..LEN_PREFIX]);
    let raw_length = i32::from_le_bytes(prefix);

    let compressed = raw_length < 0;
    let length = raw_length.unsigned_abs() as usize;
    if data.len() < LEN_PREFIX + length {
        return Err(invalid_state());
    }
    let body = &data[LEN_PREFIX..LEN_PREFIX + length];

    let bytes = if compressed {
        let mut decompressed = Vec::new();
        ZlibDecoder::new(body)
            .read_to_end(&mut decompressed)
            .map_err(|_| invalid_state())?;
        decompressed
    } else {
        body.to_vec()
    };

    match serde_json::from_slice(&bytes) {
        Ok(Json::Object(map)) => Ok((LEN_PREFIX + length, map)),
        _ => Err(invalid_state()),
    }
}

/// RFC 3339 on the wire; accepts epoch seconds on input as well.
pub(crate) mod flexible_datetime {
    use chrono::{DateTime, TimeZone, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Seconds(i64),
            Fractional(f64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Seconds(secs) => Utc
                .timestamp_opt(secs, 0)
                .single()
                .ok_or_else(|| de::Error::custom(format!("invalid timestamp: {secs}"))),
            Raw::Fractional(secs) => Utc
                .timestamp_opt(secs as i64, ((secs.fract().abs()) * 1e9) as u32)
                .single()
                .ok_or_else(|| de::Error::custom(format!("invalid timestamp: {secs}"))),
            Raw::Text(text) => DateTime::parse_from_rfc3339(&text)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(de::Error::custom),
        }
    }
}
