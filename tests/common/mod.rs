//! Helpers compartilhados pelos testes de integração.
//!
//! Todo o estado roda sobre o armazenamento em memória, com relógio manual
//! e um mailer que grava as mensagens em vez de enviá-las.

#![allow(dead_code)]

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tokio::sync::{mpsc, Mutex};

use ecoleta_backend::{
    common::clock::ManualClock,
    config::{AppState, Config},
    db::Repositories,
    models::auth::RegisterUserPayload,
    services::notification::{DeliveryError, Mailer},
};

#[derive(Debug, Clone)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Grava cada e-mail num canal para o teste poder esperar pela entrega.
pub struct RecordingMailer {
    tx: mpsc::UnboundedSender<SentEmail>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), DeliveryError> {
        let _ = self.tx.send(SentEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            html: html_body.to_string(),
        });
        Ok(())
    }
}

/// Sempre recusa, mas avisa o teste de que houve tentativa.
pub struct FailingMailer {
    attempts: mpsc::UnboundedSender<String>,
}

#[async_trait]
impl Mailer for FailingMailer {
    async fn send(&self, to: &str, _subject: &str, _html_body: &str) -> Result<(), DeliveryError> {
        let _ = self.attempts.send(to.to_string());
        Err(DeliveryError::Rejected {
            status: 503,
            body: "provedor indisponível".into(),
        })
    }
}

pub struct Inbox {
    rx: Mutex<mpsc::UnboundedReceiver<SentEmail>>,
}

impl Inbox {
    /// Espera o próximo e-mail (o envio é disparado em background).
    pub async fn next(&self) -> SentEmail {
        let mut rx = self.rx.lock().await;
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("nenhum e-mail entregue a tempo")
            .expect("canal do mailer fechado")
    }

    /// Checagem imediata, sem ceder ao runtime.
    pub fn is_empty_now(&self) -> bool {
        match self.rx.try_lock() {
            Ok(mut rx) => rx.try_recv().is_err(),
            Err(_) => false,
        }
    }

    /// Garante que nada foi enviado dentro de uma pequena janela.
    pub async fn assert_empty(&self) {
        let mut rx = self.rx.lock().await;
        let waited = tokio::time::timeout(Duration::from_millis(200), rx.recv()).await;
        assert!(waited.is_err(), "e-mail inesperado: {:?}", waited);
    }
}

pub struct TestApp {
    pub state: AppState,
    pub clock: ManualClock,
    pub inbox: Inbox,
}

pub fn test_config() -> Config {
    Config {
        database_url: None,
        db_max_connections: 1,
        jwt_secret: "segredo-de-teste".into(),
        bind_addr: "127.0.0.1:0".into(),
        session_ttl_hours: 24,
        bcrypt_cost: 4,
        email_api_url: "http://localhost/emails".into(),
        email_api_key: None,
        email_from: "E-Coleta <teste@ecoleta.local>".into(),
        unsubscribe_url: "https://ecoleta.local/descadastrar".into(),
        secure_cookies: false,
    }
}

pub fn start_instant() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 1, 10, 12, 0, 0).unwrap()
}

pub fn spawn_app() -> TestApp {
    let (tx, rx) = mpsc::unbounded_channel();
    let clock = ManualClock::new(start_instant());
    let state = AppState::from_parts(
        test_config(),
        Repositories::in_memory(Arc::new(clock.clone())),
        Arc::new(RecordingMailer { tx }),
        Arc::new(clock.clone()),
    );
    TestApp {
        state,
        clock,
        inbox: Inbox { rx: Mutex::new(rx) },
    }
}

/// Estado cujo mailer sempre falha; devolve também o canal de tentativas.
pub fn spawn_app_with_failing_mailer() -> (TestApp, mpsc::UnboundedReceiver<String>) {
    let (attempts, attempts_rx) = mpsc::unbounded_channel();
    let (_unused_tx, rx) = mpsc::unbounded_channel();
    let clock = ManualClock::new(start_instant());
    let state = AppState::from_parts(
        test_config(),
        Repositories::in_memory(Arc::new(clock.clone())),
        Arc::new(FailingMailer { attempts }),
        Arc::new(clock.clone()),
    );
    let app = TestApp {
        state,
        clock,
        inbox: Inbox { rx: Mutex::new(rx) },
    };
    (app, attempts_rx)
}

pub fn ana() -> RegisterUserPayload {
    RegisterUserPayload {
        name: "Ana".into(),
        email: "ana@x.com".into(),
        password: "Secret1!".into(),
        phone: "11999999999".into(),
        tax_id: "12345678901".into(),
    }
}

pub fn user(name: &str, email: &str, tax_id: &str) -> RegisterUserPayload {
    RegisterUserPayload {
        name: name.into(),
        email: email.into(),
        password: "Secret1!".into(),
        phone: "11988887777".into(),
        tax_id: tax_id.into(),
    }
}

/// O único trecho de 6 dígitos seguidos no template é o código.
pub fn extract_code(html: &str) -> String {
    let chars: Vec<char> = html.chars().collect();
    for start in 0..chars.len() {
        let run: String = chars[start..]
            .iter()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        let preceded_by_digit = start > 0 && chars[start - 1].is_ascii_digit();
        if run.len() == 6 && !preceded_by_digit {
            return run;
        }
    }
    panic!("código não encontrado no e-mail:\n{}", html);
}
