use dkim_signer::{
    encode_base64, DkimHeaderValue, Ed25519Sha256Key, Message, RsaSha256Key,
    DKIM_SIGNATURE_NAME,
};
use ed25519_dalek::VerifyingKey;
use mail_auth::{
    common::{parse::TxtRecordParser, verify::DomainKey},
    AuthenticatedMessage, DkimResult, MessageAuthenticator, Parameters, ResolverCache, Txt,
};
use pkcs8::DecodePublicKey;
use std::{borrow::Borrow, collections::HashMap, fs, hash::Hash, sync::Mutex, time::Instant};

pub const RSA_KEY_FILE: &str = "tests/keys/rsa2048.pem";
pub const RSA_PUBLIC_KEY_FILE: &str = "tests/keys/rsa2048_pub.pem";
pub const ED25519_KEY_FILE: &str = "tests/keys/ed25519.pem";
pub const ED25519_PUBLIC_KEY_FILE: &str = "tests/keys/ed25519_pub.pem";

pub fn read_rsa_key() -> RsaSha256Key {
    let s = fs::read_to_string(RSA_KEY_FILE).unwrap();
    RsaSha256Key::from_pem(&s).unwrap()
}

pub fn read_ed25519_key() -> Ed25519Sha256Key {
    let s = fs::read_to_string(ED25519_KEY_FILE).unwrap();
    Ed25519Sha256Key::from_pkcs8_pem(&s).unwrap()
}

/// Reads the Base64 body of a PEM file, as found in configuration files.
pub fn read_pem_body(file_name: &str) -> String {
    let s = fs::read_to_string(file_name).unwrap();
    let mut lines: Vec<_> = s.lines().skip(1).collect();
    lines.pop();
    lines.join("")
}

pub fn make_message() -> Message {
    let mut message = Message::new();
    message.set_from("from@example.com", None).unwrap();
    message.add_to("to@example.com", None).unwrap();
    message.add_cc("cc@example.com", None).unwrap();
    message.set_subject("Subject Subject").unwrap();
    message
}

pub fn dkim_signature(message: &Message) -> DkimHeaderValue {
    let (name, value) = &message.headers().as_ref()[0];
    assert_eq!(*name, DKIM_SIGNATURE_NAME);
    value.as_str().parse().unwrap()
}

/// Selectors under which test keys are published for *example.com*.
pub const SELECTORS: [&str; 3] = ["202209", "sel", "ed"];

/// In-memory DNS: `_domainkey` TXT records served to the verifier.
pub struct KeyRecords(Mutex<HashMap<String, Txt>>);

impl KeyRecords {
    pub fn new() -> Self {
        Self(Mutex::new(HashMap::new()))
    }

    /// Publishes the key in the given file under all test selectors.
    pub fn for_key(public_key_file: &str) -> Self {
        let record = key_record(public_key_file);
        SELECTORS.iter().fold(Self::new(), |records, selector| {
            records.with_record(&format!("{selector}._domainkey.example.com."), &record)
        })
    }

    pub fn with_record(self, name: &str, record: &str) -> Self {
        let key = DomainKey::parse(record.as_bytes()).unwrap();
        self.insert(name.to_owned(), key.into(), Instant::now());
        self
    }
}

impl ResolverCache<String, Txt> for KeyRecords {
    fn get<Q>(&self, name: &Q) -> Option<Txt>
    where
        String: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.0.lock().unwrap().get(name).cloned()
    }

    fn remove<Q>(&self, name: &Q) -> Option<Txt>
    where
        String: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.0.lock().unwrap().remove(name)
    }

    fn insert(&self, key: String, value: Txt, _: Instant) {
        self.0.lock().unwrap().insert(key, value);
    }
}

/// Formats the DKIM key record for a public key PEM file.
///
/// Ed25519 keys are published as the raw 32-byte key, RSA keys as the
/// SubjectPublicKeyInfo DER.
pub fn key_record(public_key_file: &str) -> String {
    let pem = fs::read_to_string(public_key_file).unwrap();
    match VerifyingKey::from_public_key_pem(&pem) {
        Ok(key) => format!("v=DKIM1; k=ed25519; p={}", encode_base64(key.to_bytes())),
        Err(_) => format!("v=DKIM1; k=rsa; p={}", read_pem_body(public_key_file)),
    }
}

/// Verifies the DKIM signatures of a message in wire form with `mail-auth`.
///
/// The public key is looked up as `<selector>._domainkey.example.com` in
/// memory, no DNS queries are made.
pub async fn verify(wire: &str, public_key_file: &str) -> Result<(), String> {
    let records = KeyRecords::for_key(public_key_file);
    verify_with(&records, wire).await
}

pub async fn verify_with(records: &KeyRecords, wire: &str) -> Result<(), String> {
    let message = AuthenticatedMessage::parse(wire.as_bytes()).ok_or("unparsable message")?;

    let authenticator = MessageAuthenticator::new_cloudflare().map_err(|e| e.to_string())?;
    let outputs = authenticator
        .verify_dkim(Parameters::new(&message).with_txt_cache(records))
        .await;

    match outputs.first().map(|output| output.result()) {
        Some(DkimResult::Pass) => Ok(()),
        Some(result) => Err(format!("{result:?}")),
        None => Err("no DKIM-Signature header".into()),
    }
}
