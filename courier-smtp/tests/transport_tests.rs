//! Integration tests for the SMTP transport against a mock server

mod support;

use base64::{Engine, engine::general_purpose::STANDARD};
use courier_common::{ContentKind, Message, Transport, TransportError};
use courier_smtp::{Encryption, SmtpConfig, SmtpTransport};
use pretty_assertions::assert_eq;
use support::mock_server::{MockSmtpServer, SmtpCommand};

fn config_for(server: &MockSmtpServer) -> SmtpConfig {
    let mut config = SmtpConfig::new("127.0.0.1", server.addr().port());
    config.timeout = 5;
    config
}

fn message(recipients: &[&str]) -> Message {
    let mut message = Message::new();
    message
        .from("sender@example.com", Some("Sender"))
        .subject("Test")
        .set_body("Hello\r\n.leading dot", ContentKind::Plain);
    for recipient in recipients {
        message.to(*recipient, None);
    }
    message
}

fn rcpts(commands: &[SmtpCommand]) -> Vec<String> {
    commands
        .iter()
        .filter_map(|command| match command {
            SmtpCommand::RcptTo(to) => Some(to.clone()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_successful_delivery() {
    let server = MockSmtpServer::builder().build().await.unwrap();
    let transport = SmtpTransport::new(config_for(&server));

    let failed = transport
        .send(&message(&["a@example.com", "b@example.com"]))
        .await
        .unwrap();

    assert!(failed.is_empty());
    assert!(transport.is_started());

    let commands = server.commands().await;
    assert_eq!(commands[0], SmtpCommand::Ehlo("localhost".to_string()));
    assert!(commands.contains(&SmtpCommand::MailFrom("sender@example.com".to_string())));
    assert_eq!(rcpts(&commands), vec!["a@example.com", "b@example.com"]);

    let content = commands
        .iter()
        .find_map(|command| match command {
            SmtpCommand::MessageContent(content) => Some(String::from_utf8_lossy(content).into_owned()),
            _ => None,
        })
        .unwrap();
    assert!(content.contains("Subject: Test\r\n"));
    assert!(content.contains("\r\n..leading dot"));

    server.shutdown();
}

#[tokio::test]
async fn test_partial_rejection_is_reported() {
    let server = MockSmtpServer::builder()
        .with_rcpt_response_for("nobody@example.com", 550, "User unknown")
        .build()
        .await
        .unwrap();
    let transport = SmtpTransport::new(config_for(&server));

    let failed = transport
        .send(&message(&["a@example.com", "nobody@example.com", "c@example.com"]))
        .await
        .unwrap();

    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].email(), "nobody@example.com");

    let commands = server.commands().await;
    assert!(commands.contains(&SmtpCommand::Data));
    assert!(!commands.contains(&SmtpCommand::Rset));

    server.shutdown();
}

#[tokio::test]
async fn test_all_rejected_resets_without_data() {
    let server = MockSmtpServer::builder()
        .with_rcpt_to_response(550, "No such user")
        .build()
        .await
        .unwrap();
    let transport = SmtpTransport::new(config_for(&server));

    let failed = transport
        .send(&message(&["a@example.com", "b@example.com"]))
        .await
        .unwrap();

    assert_eq!(failed.len(), 2);

    let commands = server.commands().await;
    assert!(commands.contains(&SmtpCommand::Rset));
    assert!(!commands.contains(&SmtpCommand::Data));

    server.shutdown();
}

#[tokio::test]
async fn test_rejected_sender_is_an_error() {
    let server = MockSmtpServer::builder()
        .with_mail_from_response(550, "Sender denied")
        .build()
        .await
        .unwrap();
    let transport = SmtpTransport::new(config_for(&server));

    let result = transport.send(&message(&["a@example.com"])).await;

    assert!(matches!(result, Err(TransportError::Rejected(_))));
    assert!(!transport.is_started());

    server.shutdown();
}

#[tokio::test]
async fn test_rejected_content_is_an_error() {
    let server = MockSmtpServer::builder()
        .with_data_end_response(554, "Spam detected")
        .build()
        .await
        .unwrap();
    let transport = SmtpTransport::new(config_for(&server));

    let result = transport.send(&message(&["a@example.com"])).await;
    assert!(matches!(result, Err(TransportError::Rejected(_))));

    server.shutdown();
}

#[tokio::test]
async fn test_connection_is_reused() {
    let server = MockSmtpServer::builder().build().await.unwrap();
    let transport = SmtpTransport::new(config_for(&server));

    transport.send(&message(&["a@example.com"])).await.unwrap();
    transport.send(&message(&["b@example.com"])).await.unwrap();

    assert_eq!(server.connection_count(), 1);

    let commands = server.commands().await;
    let ehlos = commands
        .iter()
        .filter(|command| matches!(command, SmtpCommand::Ehlo(_)))
        .count();
    assert_eq!(ehlos, 1);

    server.shutdown();
}

#[tokio::test]
async fn test_stop_forces_reconnect() {
    let server = MockSmtpServer::builder().build().await.unwrap();
    let transport = SmtpTransport::new(config_for(&server));

    transport.start().await.unwrap();
    transport.start().await.unwrap();
    assert!(transport.is_started());

    transport.stop().await.unwrap();
    assert!(!transport.is_started());
    transport.stop().await.unwrap();

    transport.send(&message(&["a@example.com"])).await.unwrap();

    assert_eq!(server.connection_count(), 2);
    assert!(server.commands().await.contains(&SmtpCommand::Quit));

    server.shutdown();
}

fn starttls_config(server: &MockSmtpServer) -> SmtpConfig {
    let mut config = config_for(server);
    config.encryption = Encryption::Tls;
    config
}

fn ehlos(commands: &[SmtpCommand]) -> usize {
    commands
        .iter()
        .filter(|command| matches!(command, SmtpCommand::Ehlo(_)))
        .count()
}

#[tokio::test]
async fn test_starttls_requires_advertised_extension() {
    let server = MockSmtpServer::builder().build().await.unwrap();
    let transport = SmtpTransport::new(starttls_config(&server));

    let err = transport.start().await.unwrap_err();
    assert!(matches!(&err, TransportError::Tls(reason) if reason.contains("advertise")));
    assert!(!transport.is_started());

    let commands = server.commands().await;
    assert!(!commands.contains(&SmtpCommand::StartTls));

    server.shutdown();
}

#[tokio::test]
async fn test_starttls_rejects_pipelined_reply() {
    let server = MockSmtpServer::builder()
        .with_ehlo_response(
            250,
            vec!["localhost".to_string(), "STARTTLS".to_string()],
        )
        .with_starttls_response(b"220 go\r\n250 injected\r\n".to_vec())
        .build()
        .await
        .unwrap();
    let transport = SmtpTransport::new(starttls_config(&server));

    let err = transport.start().await.unwrap_err();
    assert!(matches!(&err, TransportError::Tls(reason) if reason.contains("after the STARTTLS reply")));
    assert!(!transport.is_started());

    let commands = server.commands().await;
    assert!(commands.contains(&SmtpCommand::StartTls));
    assert_eq!(ehlos(&commands), 1);

    server.shutdown();
}

#[tokio::test]
async fn test_starttls_refused_by_server() {
    let server = MockSmtpServer::builder()
        .with_ehlo_response(
            250,
            vec!["localhost".to_string(), "STARTTLS".to_string()],
        )
        .build()
        .await
        .unwrap();
    let transport = SmtpTransport::new(starttls_config(&server));

    let err = transport.start().await.unwrap_err();
    assert!(matches!(&err, TransportError::Tls(reason) if reason.contains("rejected")));

    server.shutdown();
}

#[tokio::test]
async fn test_connection_refused() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let mut config = SmtpConfig::new("127.0.0.1", port);
    config.timeout = 5;
    let transport = SmtpTransport::new(config);

    let err = transport
        .send(&message(&["a@example.com"]))
        .await
        .unwrap_err();

    assert!(err.is_connect(), "unexpected error: {err}");
    assert!(!transport.is_started());
}

#[tokio::test]
async fn test_bad_greeting_is_connect_error() {
    let server = MockSmtpServer::builder()
        .with_greeting(554, "Go away")
        .build()
        .await
        .unwrap();
    let transport = SmtpTransport::new(config_for(&server));

    let err = transport.start().await.unwrap_err();
    assert!(err.is_connect());

    server.shutdown();
}

#[tokio::test]
async fn test_helo_fallback() {
    let server = MockSmtpServer::builder()
        .with_ehlo_response(502, vec!["Command not implemented".to_string()])
        .build()
        .await
        .unwrap();
    let transport = SmtpTransport::new(config_for(&server));

    transport.send(&message(&["a@example.com"])).await.unwrap();

    let commands = server.commands().await;
    assert!(commands.contains(&SmtpCommand::Helo("localhost".to_string())));

    server.shutdown();
}

#[tokio::test]
async fn test_auth_plain() {
    let server = MockSmtpServer::builder()
        .with_ehlo_response(
            250,
            vec!["localhost".to_string(), "AUTH PLAIN LOGIN".to_string()],
        )
        .build()
        .await
        .unwrap();

    let mut config = config_for(&server);
    config.username = Some("user".to_string());
    config.password = Some("pass".to_string());
    let transport = SmtpTransport::new(config);

    transport.send(&message(&["a@example.com"])).await.unwrap();

    let expected = format!("PLAIN {}", STANDARD.encode("\0user\0pass"));
    assert!(server.commands().await.contains(&SmtpCommand::Auth(expected)));

    server.shutdown();
}

#[tokio::test]
async fn test_auth_login() {
    let server = MockSmtpServer::builder()
        .with_ehlo_response(250, vec!["localhost".to_string(), "AUTH LOGIN".to_string()])
        .build()
        .await
        .unwrap();

    let mut config = config_for(&server);
    config.username = Some("user".to_string());
    config.password = Some("pass".to_string());
    let transport = SmtpTransport::new(config);

    transport.start().await.unwrap();

    let commands = server.commands().await;
    assert!(commands.contains(&SmtpCommand::Auth("LOGIN".to_string())));
    assert!(commands.contains(&SmtpCommand::AuthLine(STANDARD.encode("user"))));
    assert!(commands.contains(&SmtpCommand::AuthLine(STANDARD.encode("pass"))));

    server.shutdown();
}

#[tokio::test]
async fn test_auth_rejected() {
    let server = MockSmtpServer::builder()
        .with_ehlo_response(250, vec!["localhost".to_string(), "AUTH PLAIN".to_string()])
        .with_auth_response(535, "Authentication credentials invalid")
        .build()
        .await
        .unwrap();

    let mut config = config_for(&server);
    config.username = Some("user".to_string());
    config.password = Some("wrong".to_string());
    let transport = SmtpTransport::new(config);

    let err = transport.start().await.unwrap_err();
    assert!(matches!(err, TransportError::Authentication(_)));
    assert!(!transport.is_started());

    server.shutdown();
}

#[tokio::test]
async fn test_auth_not_advertised() {
    let server = MockSmtpServer::builder().build().await.unwrap();

    let mut config = config_for(&server);
    config.username = Some("user".to_string());
    config.password = Some("pass".to_string());
    let transport = SmtpTransport::new(config);

    let err = transport.start().await.unwrap_err();
    assert!(matches!(err, TransportError::Authentication(_)));

    server.shutdown();
}

#[tokio::test]
async fn test_missing_sender() {
    let server = MockSmtpServer::builder().build().await.unwrap();
    let transport = SmtpTransport::new(config_for(&server));

    let mut message = Message::new();
    message.to("a@example.com", None);

    let err = transport.send(&message).await.unwrap_err();
    assert!(matches!(err, TransportError::MissingSender));
    assert_eq!(server.connection_count(), 0);

    server.shutdown();
}
