pub mod common;

use dkim_signer::{
    header::LINE_WIDTH, mime::TransferEncoding, Message, MimeMessage, MimePart, SigningKey,
    Signer, SigningParams,
};

fn sign_to_wire<K: SigningKey>(signer: &Signer<K>, message: &Message) -> String {
    signer.sign_message(message).unwrap().to_string()
}

fn rsa_signer(headers: &[&str]) -> Signer<dkim_signer::RsaSha256Key> {
    let params = SigningParams::new("example.com", "202209", headers).unwrap();
    Signer::new(params, common::read_rsa_key())
}

#[tokio::test]
async fn verify_plain_text() {
    let _ = tracing_subscriber::fmt::try_init();

    let signer = rsa_signer(&["from", "to", "cc", "subject"]);
    let mut message = common::make_message();
    message.set_body("Dear you,\n\nhow is it going?\n\n-- \nme\n").unwrap();

    let wire = sign_to_wire(&signer, &message);

    assert_eq!(common::verify(&wire, common::RSA_PUBLIC_KEY_FILE).await, Ok(()));
}

#[tokio::test]
async fn verify_multipart() {
    let _ = tracing_subscriber::fmt::try_init();

    let signer = rsa_signer(&["from", "to", "subject", "mime-version", "content-type"]);

    let mut mime = MimeMessage::new();
    mime.add_part(MimePart::text("Hello world!\nSecond line\n"));
    mime.add_part(MimePart::html("<p>Grüße</p>"));
    mime.add_part(
        MimePart::new(vec![0, 159, 146, 150, 255], "application/octet-stream")
            .with_encoding(TransferEncoding::Base64)
            .with_filename("data.bin"),
    );

    let mut message = common::make_message();
    message.set_body(mime).unwrap();

    let wire = sign_to_wire(&signer, &message);

    assert!(wire.contains("\r\nContent-Type: multipart/mixed; boundary="));
    assert_eq!(common::verify(&wire, common::RSA_PUBLIC_KEY_FILE).await, Ok(()));
}

#[tokio::test]
async fn verify_long_and_encoded_subject() {
    let signer = rsa_signer(&["from", "subject"]);

    let mut message = common::make_message();
    message
        .set_subject(&"A rather long subject line that needs folding ".repeat(3))
        .unwrap();
    message.set_body("hi\n").unwrap();

    assert!(message.headers().get("Subject").unwrap().is_folded());

    let wire = sign_to_wire(&signer, &message);
    assert_eq!(common::verify(&wire, common::RSA_PUBLIC_KEY_FILE).await, Ok(()));

    message.set_subject("Grüße aus Zürich").unwrap();

    let wire = sign_to_wire(&signer, &message);
    assert!(wire.contains("Subject: =?UTF-8?Q?"));
    assert_eq!(common::verify(&wire, common::RSA_PUBLIC_KEY_FILE).await, Ok(()));
}

#[tokio::test]
async fn verify_trailing_blank_lines() {
    let signer = rsa_signer(&["from"]);

    let mut message = common::make_message();
    message.set_body("last line\r\n\r\n\r\n\n\n").unwrap();

    let wire = sign_to_wire(&signer, &message);

    assert!(wire.ends_with("\r\n\r\nlast line\r\n"));
    assert_eq!(common::verify(&wire, common::RSA_PUBLIC_KEY_FILE).await, Ok(()));
}

#[tokio::test]
async fn verify_ed25519() {
    let _ = tracing_subscriber::fmt::try_init();

    let params = SigningParams::with_default_headers("example.com", "ed").unwrap();
    let signer = Signer::new(params, common::read_ed25519_key());

    let mut message = common::make_message();
    message.set_body("Hello world!\n").unwrap();

    let wire = sign_to_wire(&signer, &message);

    assert_eq!(common::verify(&wire, common::ED25519_PUBLIC_KEY_FILE).await, Ok(()));
    assert!(common::verify(&wire, common::RSA_PUBLIC_KEY_FILE).await.is_err());
}

#[test]
fn signature_header_is_folded_for_transport() {
    let signer = rsa_signer(&["from", "to", "subject"]);

    let mut message = common::make_message();
    message.set_body("hi\n").unwrap();

    let wire = sign_to_wire(&signer, &message);

    let header: Vec<_> = wire
        .split("\r\n")
        .take_while(|line| line.starts_with("DKIM-Signature:") || line.starts_with(' '))
        .collect();

    assert!(header.len() > 1);
    assert!(header.iter().all(|line| line.len() <= LINE_WIDTH));
}

#[tokio::test]
async fn verify_detects_modification() {
    let signer = rsa_signer(&["from", "to", "subject"]);

    let mut message = common::make_message();
    message.set_body("Pay 10 dollars.\n").unwrap();

    let wire = sign_to_wire(&signer, &message);

    let tampered_body = wire.replace("Pay 10", "Pay 99");
    let result = common::verify(&tampered_body, common::RSA_PUBLIC_KEY_FILE).await;
    assert!(result.unwrap_err().contains("FailedBodyHashMatch"));

    let tampered_subject = wire.replace("Subject: Subject Subject", "Subject: Other");
    let result = common::verify(&tampered_subject, common::RSA_PUBLIC_KEY_FILE).await;
    assert!(result.unwrap_err().contains("FailedVerification"));

    // Cc is not signed
    let changed_cc = wire.replace("Cc: cc@example.com", "Cc: other@example.com");
    assert_eq!(common::verify(&changed_cc, common::RSA_PUBLIC_KEY_FILE).await, Ok(()));
}

#[tokio::test]
async fn verify_after_resigning() {
    let signer = rsa_signer(&["from", "subject"]);

    let mut message = common::make_message();
    message.set_body("hi\n").unwrap();

    let signed = signer.sign_message(&message).unwrap();
    let resigned = signer.sign_message(&signed).unwrap();

    assert_eq!(resigned.headers().get_all("dkim-signature").count(), 1);
    assert_eq!(
        common::verify(&resigned.to_string(), common::RSA_PUBLIC_KEY_FILE).await,
        Ok(())
    );
}

#[tokio::test]
async fn verify_trimmed_body() {
    let signer = rsa_signer(&["from", "to"]);

    let mut message = common::make_message();
    message.set_body("\r\n\r\n  Hello  \r\n  \r\n\t\r\n").unwrap();

    let wire = sign_to_wire(&signer, &message);

    assert!(wire.ends_with("\r\n\r\nHello\r\n"));
    assert_eq!(common::verify(&wire, common::RSA_PUBLIC_KEY_FILE).await, Ok(()));
}
